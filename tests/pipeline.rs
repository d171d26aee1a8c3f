//! End-to-end workflow tests with a deterministic stub analyst.
//!
//! The stub "finds" a project name whenever the chunk text actually
//! contains it and echoes a fixed snippet per name, so assertions are
//! about the workflow (chunking, per-chunk dedup, append, categorize)
//! rather than model behavior.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use project_scout::config::{ChunkingConfig, Config, DbConfig, DiscoveryConfig, LlmConfig};
use project_scout::llm::ProjectAnalyst;
use project_scout::models::Categorization;
use project_scout::pipeline::{self, FileOutcome, StopFlag};
use project_scout::{db, migrate, store};

/// Analyst that reports the known names present in a chunk.
struct StubAnalyst {
    known_names: Vec<&'static str>,
    categorization: Categorization,
}

impl StubAnalyst {
    fn new() -> Self {
        Self {
            known_names: vec!["Project Alpha", "Project Beta"],
            categorization: Categorization {
                category: "Energy".to_string(),
                sub_category: "Gas Processing".to_string(),
                project_scope: "Brownfield".to_string(),
            },
        }
    }
}

#[async_trait]
impl ProjectAnalyst for StubAnalyst {
    async fn find_project_names(&self, chunk: &str) -> Result<Vec<String>> {
        Ok(self
            .known_names
            .iter()
            .filter(|name| chunk.contains(*name))
            .map(|name| name.to_string())
            .collect())
    }

    async fn extract_snippet(&self, chunk: &str, project_name: &str) -> Result<Option<String>> {
        if chunk.contains(project_name) {
            Ok(Some(format!("{} is discussed in this passage.", project_name)))
        } else {
            Ok(None)
        }
    }

    async fn categorize(&self, _project_text: &str) -> Categorization {
        self.categorization.clone()
    }
}

/// Analyst whose calls always fail at the transport level.
struct FailingAnalyst;

#[async_trait]
impl ProjectAnalyst for FailingAnalyst {
    async fn find_project_names(&self, _chunk: &str) -> Result<Vec<String>> {
        anyhow::bail!("connection refused")
    }

    async fn extract_snippet(&self, _chunk: &str, _name: &str) -> Result<Option<String>> {
        anyhow::bail!("connection refused")
    }

    async fn categorize(&self, _project_text: &str) -> Categorization {
        Categorization::uncategorized()
    }
}

fn test_config(db_path: PathBuf) -> Config {
    Config {
        db: DbConfig { path: db_path },
        llm: LlmConfig {
            base_url: "http://localhost:11434".to_string(),
            model: "stub".to_string(),
            timeout_secs: 5,
            find_temperature: 0.1,
            extract_temperature: 0.0,
            top_p: 0.9,
            taxonomy_path: PathBuf::from("config/taxonomy.md"),
            max_categorize_chars: 8000,
        },
        chunking: ChunkingConfig {
            chunk_words: 300,
            overlap_words: 50,
        },
        discovery: DiscoveryConfig::default(),
    }
}

async fn setup() -> (TempDir, Config, SqlitePool) {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path().join("scout.sqlite"));
    let pool = db::connect(&config.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    (tmp, config, pool)
}

fn no_stop() -> StopFlag {
    Arc::new(AtomicBool::new(false))
}

/// ~500 words; "Project Alpha" appears once (early), "Project Beta" twice
/// (early and late), so with 300-word chunks and 50-word overlap the two
/// Beta mentions land in different chunks.
fn sample_document() -> String {
    let mut words: Vec<String> = (0..500).map(|i| format!("filler{:03}", i)).collect();
    words[10] = "Project".to_string();
    words[11] = "Alpha".to_string();
    words[30] = "Project".to_string();
    words[31] = "Beta".to_string();
    words[450] = "Project".to_string();
    words[451] = "Beta".to_string();
    words.join(" ")
}

fn header_count(blob: &str) -> usize {
    blob.matches("--- Source:").count()
}

#[tokio::test]
async fn two_projects_split_across_chunks() {
    let (_tmp, config, pool) = setup().await;
    let analyst = StubAnalyst::new();

    let report = pipeline::process_document_text(
        &config,
        &pool,
        &analyst,
        "quarterly_review.pdf",
        &sample_document(),
        &no_stop(),
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, FileOutcome::Processed);
    assert_eq!(report.projects_touched, 2);
    assert_eq!(report.snippets_appended, 3);

    let names = store::get_all_project_names(&pool).await.unwrap();
    assert_eq!(names, vec!["Project Alpha", "Project Beta"]);

    // Alpha was mentioned in one chunk, Beta independently in two.
    let alpha = store::get_project_data(&pool, "Project Alpha").await.unwrap().unwrap();
    assert_eq!(header_count(&alpha), 1);
    assert!(alpha.contains("Project Alpha is discussed in this passage."));
    assert!(alpha.contains("quarterly_review.pdf"));

    let beta = store::get_project_data(&pool, "Project Beta").await.unwrap().unwrap();
    assert_eq!(header_count(&beta), 2);
}

#[tokio::test]
async fn touched_projects_are_categorized() {
    let (_tmp, config, pool) = setup().await;
    let analyst = StubAnalyst::new();

    pipeline::process_document_text(
        &config,
        &pool,
        &analyst,
        "review.pdf",
        &sample_document(),
        &no_stop(),
    )
    .await
    .unwrap();

    for name in ["Project Alpha", "Project Beta"] {
        let project = store::get_project(&pool, name).await.unwrap().unwrap();
        assert_eq!(project.category.as_deref(), Some("Energy"));
        assert_eq!(project.sub_category.as_deref(), Some("Gas Processing"));
        assert_eq!(project.project_scope.as_deref(), Some("Brownfield"));
    }
}

#[tokio::test]
async fn categorization_overwrites_prior_values_without_merging() {
    let (_tmp, config, pool) = setup().await;

    // Seed a project already classified with the failure sentinel.
    let id = store::append_to_project_data(&pool, "Project Beta", "seed text")
        .await
        .unwrap()
        .unwrap();
    store::update_project_categorization(&pool, id, &Categorization::uncategorized())
        .await
        .unwrap();

    let analyst = StubAnalyst::new();
    pipeline::process_document_text(
        &config,
        &pool,
        &analyst,
        "review.pdf",
        &sample_document(),
        &no_stop(),
    )
    .await
    .unwrap();

    let project = store::get_project(&pool, "Project Beta").await.unwrap().unwrap();
    assert_eq!(project.category.as_deref(), Some("Energy"));
    assert_eq!(project.sub_category.as_deref(), Some("Gas Processing"));
    assert_eq!(project.project_scope.as_deref(), Some("Brownfield"));
    // The seed text is still at the front of the blob: append-only.
    assert!(project.aggregated_data.starts_with("seed text"));
}

#[tokio::test]
async fn empty_text_creates_no_records() {
    let (_tmp, config, pool) = setup().await;
    let analyst = StubAnalyst::new();

    let report = pipeline::process_document_text(
        &config, &pool, &analyst, "empty.pdf", "   \n ", &no_stop(),
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, FileOutcome::NoContent);
    assert!(store::get_all_project_names(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_analyst_calls_skip_without_aborting() {
    let (_tmp, config, pool) = setup().await;

    let report = pipeline::process_document_text(
        &config,
        &pool,
        &FailingAnalyst,
        "review.pdf",
        &sample_document(),
        &no_stop(),
    )
    .await
    .unwrap();

    // Every chunk failed name finding; the file still completes.
    assert_eq!(report.outcome, FileOutcome::Processed);
    assert_eq!(report.snippets_appended, 0);
    assert!(store::get_all_project_names(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn stop_flag_halts_between_chunks() {
    let (_tmp, config, pool) = setup().await;
    let analyst = StubAnalyst::new();

    let stop: StopFlag = Arc::new(AtomicBool::new(false));
    stop.store(true, Ordering::Relaxed);

    let report = pipeline::process_document_text(
        &config,
        &pool,
        &analyst,
        "review.pdf",
        &sample_document(),
        &stop,
    )
    .await
    .unwrap();

    assert_eq!(report.snippets_appended, 0);
    assert!(store::get_all_project_names(&pool).await.unwrap().is_empty());
}
