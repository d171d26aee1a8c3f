//! Ollama client for the three extraction operations.
//!
//! All calls go to the local `/api/generate` endpoint with `format: "json"`
//! and `stream: false`; the endpoint answers `{"response": "<json string>"}`
//! and the inner string is parsed again per operation. Models sometimes wrap
//! that inner JSON in markdown code fences, so fences are stripped before
//! parsing.
//!
//! Per the skip-on-failure policy, name finding and snippet extraction
//! return `Err` on both transport failures (timeout, connection refused)
//! and output-shape failures (non-JSON, missing key); the pipeline logs the
//! reason and skips that unit of work. Categorization instead degrades to
//! the [`Categorization::uncategorized`] sentinel so a classification
//! hiccup never aborts a run.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::config::LlmConfig;
use crate::models::Categorization;

/// The LLM-backed analysis operations the pipeline depends on.
///
/// Kept as a trait so tests can substitute a deterministic stub for the
/// live model server.
#[async_trait]
pub trait ProjectAnalyst: Send + Sync {
    /// Proper-noun project names mentioned in `chunk`, deduplicated and trimmed.
    async fn find_project_names(&self, chunk: &str) -> Result<Vec<String>>;

    /// The verbatim passage of `chunk` discussing `project_name`, if the
    /// model can locate one.
    async fn extract_snippet(&self, chunk: &str, project_name: &str) -> Result<Option<String>>;

    /// Classify a project from its full aggregated text. Never fails;
    /// any error yields the uncategorized sentinel.
    async fn categorize(&self, project_text: &str) -> Categorization;
}

/// Client for an Ollama-compatible generation endpoint.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    find_temperature: f32,
    extract_temperature: f32,
    top_p: f32,
    taxonomy: String,
    max_categorize_chars: usize,
}

impl OllamaClient {
    /// Build a client from config. Loads the taxonomy document up front so
    /// a missing file surfaces at startup rather than mid-run.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let taxonomy = std::fs::read_to_string(&config.taxonomy_path).with_context(|| {
            format!(
                "Failed to read taxonomy document: {}",
                config.taxonomy_path.display()
            )
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            find_temperature: config.find_temperature,
            extract_temperature: config.extract_temperature,
            top_p: config.top_p,
            taxonomy,
            max_categorize_chars: config.max_categorize_chars,
        })
    }

    /// One generation call. Returns the inner `response` string.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
            "options": {"temperature": temperature, "top_p": self.top_p},
        });

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("generation request failed (is Ollama running at {}?): {}", self.base_url, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("generation endpoint returned {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("generation response missing 'response' field"))
    }

    /// List the models available on the server, sorted by name.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let json: serde_json::Value = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut names: Vec<String> = json
            .get("models")
            .and_then(|m| m.as_array())
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl ProjectAnalyst for OllamaClient {
    async fn find_project_names(&self, chunk: &str) -> Result<Vec<String>> {
        let prompt = format!(
            r#"You are an AI assistant for an engineering company. Your task is to identify and extract the names of specific engineering or construction projects from the text provided below.

INSTRUCTIONS:
- Scan the text for proper nouns that appear to be project names (e.g., "Kaybob South Gas Plant", "West Doe Battery").
- Do NOT extract generic terms like "the project" or "the facility" unless they are part of a specific name.
- Return your answer in JSON format with a single key "project_names", which contains a list of the names you found.
- If no project names are found, return an empty list: {{"project_names": []}}

TEXT TO ANALYZE:
---
{chunk}
---

JSON Response:
"#
        );
        let inner = self.generate(&prompt, self.find_temperature).await?;
        parse_project_names(&inner)
    }

    async fn extract_snippet(&self, chunk: &str, project_name: &str) -> Result<Option<String>> {
        let prompt = format!(
            r#"You are an AI assistant. Your task is to extract the verbatim text related to a specific project from the document chunk provided below.

INSTRUCTIONS:
- The project you are looking for is named: "{project_name}"
- Find the paragraph or section in the "DOCUMENT CHUNK" that discusses this project.
- Extract this text *exactly* as it appears in the document, without any modification, summarization, or added commentary.
- Respond in JSON format with a single key "snippet" containing the verbatim text you extracted.
- If you cannot find a relevant snippet for "{project_name}", return null for the snippet value.

DOCUMENT CHUNK:
---
{chunk}
---

JSON Response (only the snippet for "{project_name}"):
"#
        );
        let inner = self.generate(&prompt, self.extract_temperature).await?;
        parse_snippet(&inner)
    }

    async fn categorize(&self, project_text: &str) -> Categorization {
        let truncated = truncate_chars(project_text, self.max_categorize_chars);
        let prompt = format!(
            r#"You are an expert EPCM (Engineering, Procurement, and Construction Management) project classifier.
Your task is to analyze the provided project text and assign it a `category`, `sub_category`, and `project_scope` based *only* on the official schema provided below.

**OFFICIAL SCHEMA:**
{taxonomy}

**Instructions:**
1. Read the project text carefully.
2. Compare the text against the categories, sub-categories, and scopes in the official schema.
3. Choose the BEST and MOST SPECIFIC `category` and `sub_category` that fits the project description.
4. Determine the MOST ACCURATE `project_scope`.
5. If no sub-category is applicable for a chosen category, return an empty string for `sub_category`.
6. If the text is ambiguous or lacks information, make the best possible choice but do not invent new classifications.
7. Your output MUST be a JSON object with three keys: "category", "sub_category", and "project_scope".

**Project Text to Analyze:**
---
{truncated}
---

Based on the official schema, please classify this project.
"#,
            taxonomy = self.taxonomy,
            truncated = truncated,
        );

        match self.generate(&prompt, self.extract_temperature).await {
            Ok(inner) => parse_categorization(&inner).unwrap_or_else(|| {
                warn!("categorization response was not the expected JSON shape");
                Categorization::uncategorized()
            }),
            Err(e) => {
                warn!(error = %e, "categorization call failed");
                Categorization::uncategorized()
            }
        }
    }
}

/// Strip markdown code-block fences from a string intended to be JSON.
fn strip_json_fences(raw: &str) -> &str {
    raw.trim()
        .strip_prefix("```json")
        .or_else(|| raw.trim().strip_prefix("```"))
        .unwrap_or(raw.trim())
        .trim_end_matches("```")
        .trim()
}

/// Parse `{"project_names": [...]}`: trim, drop short/empty names,
/// deduplicate, sort.
fn parse_project_names(inner: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(strip_json_fences(inner))
        .map_err(|e| anyhow!("project-name response was not JSON: {}", e))?;
    let names = value
        .get("project_names")
        .and_then(|n| n.as_array())
        .ok_or_else(|| anyhow!("project-name response missing 'project_names' array"))?;

    let mut cleaned: Vec<String> = names
        .iter()
        .filter_map(|n| n.as_str())
        .map(|n| n.trim().to_string())
        .filter(|n| n.chars().count() > 3)
        .collect();
    cleaned.sort();
    cleaned.dedup();
    Ok(cleaned)
}

/// Parse `{"snippet": ...}`: null, missing, or non-string means absent.
fn parse_snippet(inner: &str) -> Result<Option<String>> {
    let value: serde_json::Value = serde_json::from_str(strip_json_fences(inner))
        .map_err(|e| anyhow!("snippet response was not JSON: {}", e))?;
    Ok(value
        .get("snippet")
        .and_then(|s| s.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Parse the three-field classification. `None` on any shape mismatch.
fn parse_categorization(inner: &str) -> Option<Categorization> {
    let value: serde_json::Value = serde_json::from_str(strip_json_fences(inner)).ok()?;
    Some(Categorization {
        category: value
            .get("category")
            .and_then(|v| v.as_str())
            .unwrap_or("Uncategorized")
            .to_string(),
        sub_category: value
            .get("sub_category")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        project_scope: value
            .get("project_scope")
            .and_then(|v| v.as_str())
            .unwrap_or("Unclassified")
            .to_string(),
    })
}

/// Truncate to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped_before_parsing() {
        let fenced = "```json\n{\"project_names\": [\"Kaybob South Gas Plant\"]}\n```";
        let names = parse_project_names(fenced).unwrap();
        assert_eq!(names, vec!["Kaybob South Gas Plant"]);

        assert_eq!(strip_json_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_json_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn non_json_name_response_is_an_error_not_a_panic() {
        let err = parse_project_names("I could not find any projects.").unwrap_err();
        assert!(err.to_string().contains("not JSON"));
    }

    #[test]
    fn missing_names_key_is_an_error() {
        assert!(parse_project_names("{\"projects\": []}").is_err());
    }

    #[test]
    fn names_are_trimmed_filtered_and_deduplicated() {
        let inner = r#"{"project_names": ["  West Doe Battery ", "West Doe Battery", "ab", "", "Zama Lake Expansion"]}"#;
        let names = parse_project_names(inner).unwrap();
        assert_eq!(names, vec!["West Doe Battery", "Zama Lake Expansion"]);
    }

    #[test]
    fn empty_name_list_is_ok() {
        assert!(parse_project_names("{\"project_names\": []}").unwrap().is_empty());
    }

    #[test]
    fn null_or_missing_snippet_is_absent() {
        assert_eq!(parse_snippet("{\"snippet\": null}").unwrap(), None);
        assert_eq!(parse_snippet("{}").unwrap(), None);
        assert_eq!(parse_snippet("{\"snippet\": \"   \"}").unwrap(), None);
        assert_eq!(
            parse_snippet("{\"snippet\": \" the verbatim text \"}").unwrap(),
            Some("the verbatim text".to_string())
        );
    }

    #[test]
    fn malformed_snippet_body_is_an_error() {
        assert!(parse_snippet("not json at all").is_err());
    }

    #[test]
    fn categorization_defaults_fill_missing_fields() {
        let cat = parse_categorization("{\"category\": \"Energy\"}").unwrap();
        assert_eq!(cat.category, "Energy");
        assert_eq!(cat.sub_category, "");
        assert_eq!(cat.project_scope, "Unclassified");

        assert!(parse_categorization("nope").is_none());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 4), "héll");
        assert_eq!(truncate_chars(text, 100), text);
    }
}
