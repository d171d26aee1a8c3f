use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub llm: LlmConfig,
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Temperature for the exploratory name-finding pass.
    #[serde(default = "default_find_temperature")]
    pub find_temperature: f32,
    /// Temperature for deterministic snippet extraction and categorization.
    #[serde(default = "default_extract_temperature")]
    pub extract_temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Markdown taxonomy document given to the categorizer prompt.
    #[serde(default = "default_taxonomy_path")]
    pub taxonomy_path: PathBuf,
    /// Ceiling on how much aggregated text is sent to the categorizer.
    #[serde(default = "default_max_categorize_chars")]
    pub max_categorize_chars: usize,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_timeout_secs() -> u64 {
    240
}
fn default_find_temperature() -> f32 {
    0.1
}
fn default_extract_temperature() -> f32 {
    0.0
}
fn default_top_p() -> f32 {
    0.9
}
fn default_taxonomy_path() -> PathBuf {
    PathBuf::from("config/taxonomy.md")
}
fn default_max_categorize_chars() -> usize {
    8000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,
    #[serde(default = "default_overlap_words")]
    pub overlap_words: usize,
}

fn default_chunk_words() -> usize {
    400
}
fn default_overlap_words() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("upload_folder")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_words == 0 {
        anyhow::bail!("chunking.chunk_words must be > 0");
    }
    if config.chunking.overlap_words >= config.chunking.chunk_words {
        anyhow::bail!("chunking.overlap_words must be < chunking.chunk_words");
    }

    // Validate LLM settings
    if config.llm.model.trim().is_empty() {
        anyhow::bail!("llm.model must be set");
    }
    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }
    if config.llm.max_categorize_chars == 0 {
        anyhow::bail!("llm.max_categorize_chars must be > 0");
    }

    Ok(config)
}
