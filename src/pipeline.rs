//! Processing workflow orchestration.
//!
//! Per file: extract text, chunk it, ask the analyst for project names in
//! each chunk, pull a verbatim snippet per name, and append each snippet
//! (with a source/timestamp header) to that project's aggregated data.
//! After all chunks, every project touched in the run is re-classified
//! from its full aggregated text.
//!
//! Nothing here retries. A failed analyst call skips its chunk or name; a
//! failed file skips that file; persistence errors abort the file and are
//! reported upward. Each unit of work is independent and best-effort.

use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::discover;
use crate::extract;
use crate::llm::ProjectAnalyst;
use crate::models::{FileRecord, ProcessedLog};
use crate::store;

/// Cooperative stop flag, checked between files and between chunks.
/// In-flight analyst calls are never aborted.
pub type StopFlag = Arc<AtomicBool>;

fn should_stop(stop: &StopFlag) -> bool {
    stop.load(Ordering::Relaxed)
}

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Snippets were appended and projects categorized.
    Processed,
    /// The file produced no usable text or no project mentions.
    NoContent,
    /// Extraction failed; the file was skipped.
    ParseFailed,
}

/// Counters for a folder run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_seen: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub snippets_appended: u64,
    pub projects_touched: usize,
}

/// Process every new or updated document under the configured root.
///
/// Loads the processed-files ledger, scans, runs the per-file workflow,
/// and records each file in the ledger on success. Per-file errors are
/// logged and do not stop the run.
pub async fn run_folder(
    config: &Config,
    pool: &SqlitePool,
    analyst: &dyn ProjectAnalyst,
    force: bool,
    limit: Option<usize>,
    stop: &StopFlag,
) -> Result<RunSummary> {
    let processed: ProcessedLog = store::load_processed_log(pool).await?;
    let mut records = discover::scan_documents(&config.discovery, &processed, force)?;
    if let Some(lim) = limit {
        records.truncate(lim);
    }

    let mut summary = RunSummary {
        files_seen: records.len(),
        ..Default::default()
    };

    for record in &records {
        if should_stop(stop) {
            warn!("Stop requested; halting folder run");
            break;
        }

        info!(file = %record.path.display(), status = record.status.as_str(), "Processing document");
        match process_file(config, pool, analyst, &record.path, stop).await {
            Ok(report) => {
                match report.outcome {
                    FileOutcome::Processed => summary.files_processed += 1,
                    FileOutcome::NoContent | FileOutcome::ParseFailed => {
                        summary.files_skipped += 1
                    }
                }
                summary.snippets_appended += report.snippets_appended;
                summary.projects_touched += report.projects_touched;

                // Parse failures stay out of the ledger so a fixed file is
                // picked up by the next scan.
                if report.outcome != FileOutcome::ParseFailed {
                    if let Err(e) = record_in_ledger(pool, record).await {
                        warn!(file = %record.path.display(), error = %e, "Failed to record ledger entry");
                    }
                }
            }
            Err(e) => {
                warn!(file = %record.path.display(), error = %e, "File aborted; continuing with next");
                summary.files_skipped += 1;
            }
        }
    }

    Ok(summary)
}

async fn record_in_ledger(pool: &SqlitePool, record: &FileRecord) -> Result<()> {
    let key = discover::ledger_key(&record.path);
    let mtime = discover::file_mtime(&record.path)?;
    let hash = discover::hash_file(&record.path)?;
    store::record_processed(pool, &key, mtime, &hash).await
}

/// Per-file report.
#[derive(Debug)]
pub struct FileReport {
    pub outcome: FileOutcome,
    pub snippets_appended: u64,
    pub projects_touched: usize,
}

/// Run the full workflow for one document on disk.
pub async fn process_file(
    config: &Config,
    pool: &SqlitePool,
    analyst: &dyn ProjectAnalyst,
    path: &Path,
    stop: &StopFlag,
) -> Result<FileReport> {
    let text = match extract::extract_file(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Extraction failed; skipping file");
            return Ok(FileReport {
                outcome: FileOutcome::ParseFailed,
                snippets_appended: 0,
                projects_touched: 0,
            });
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    process_document_text(config, pool, analyst, &file_name, &text, stop).await
}

/// Run the chunk/find/extract/append/categorize workflow over already
/// extracted text. Split out from [`process_file`] so callers (and tests)
/// can feed text directly.
pub async fn process_document_text(
    config: &Config,
    pool: &SqlitePool,
    analyst: &dyn ProjectAnalyst,
    file_name: &str,
    text: &str,
    stop: &StopFlag,
) -> Result<FileReport> {
    if text.trim().is_empty() {
        warn!(file = file_name, "No text content extracted; skipping file");
        return Ok(FileReport {
            outcome: FileOutcome::NoContent,
            snippets_appended: 0,
            projects_touched: 0,
        });
    }

    let chunks = chunk_text(
        text,
        config.chunking.chunk_words,
        config.chunking.overlap_words,
    );
    info!(file = file_name, chunks = chunks.len(), "Chunked document");

    // Projects touched in this run, mapped to their row ids for the
    // categorization pass.
    let mut touched: HashMap<String, i64> = HashMap::new();
    let mut snippets_appended = 0u64;

    for chunk in &chunks {
        if should_stop(stop) {
            warn!(file = file_name, "Stop requested; abandoning remaining chunks");
            break;
        }

        let names = match analyst.find_project_names(&chunk.text).await {
            Ok(names) => names,
            Err(e) => {
                warn!(file = file_name, chunk = chunk.index, error = %e, "Name finding failed; skipping chunk");
                continue;
            }
        };

        // Guard against duplicates within one chunk; a name reappearing in
        // a later chunk is extracted and appended again on purpose.
        let mut handled_in_chunk: HashSet<String> = HashSet::new();

        for name in names {
            let normalized = store::normalize_project_name(&name);
            if normalized.is_empty() || !handled_in_chunk.insert(normalized.clone()) {
                continue;
            }

            let snippet = match analyst.extract_snippet(&chunk.text, &normalized).await {
                Ok(Some(snippet)) => snippet,
                Ok(None) => {
                    info!(file = file_name, chunk = chunk.index, project = %normalized, "No snippet found for mention");
                    continue;
                }
                Err(e) => {
                    warn!(file = file_name, chunk = chunk.index, project = %normalized, error = %e, "Snippet extraction failed; skipping mention");
                    continue;
                }
            };

            let entry = format_snippet_entry(file_name, &snippet);
            if let Some(project_id) =
                store::append_to_project_data(pool, &normalized, &entry).await?
            {
                snippets_appended += 1;
                touched.insert(normalized.clone(), project_id);
                info!(file = file_name, chunk = chunk.index, project = %normalized, "Appended snippet");
            }
        }
    }

    // Classification pass over everything touched this run.
    for (name, project_id) in &touched {
        let Some(aggregated) = store::get_project_data(pool, name).await? else {
            warn!(project = %name, "Project vanished before categorization");
            continue;
        };
        let categorization = analyst.categorize(&aggregated).await;
        store::update_project_categorization(pool, *project_id, &categorization).await?;
        info!(
            project = %name,
            category = %categorization.category,
            scope = %categorization.project_scope,
            "Categorized project"
        );
    }

    Ok(FileReport {
        outcome: FileOutcome::Processed,
        snippets_appended,
        projects_touched: touched.len(),
    })
}

/// Header + snippet block appended to a project's aggregated data.
fn format_snippet_entry(file_name: &str, snippet: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    format!(
        "\n\n--- Source: {} | Extracted: {} ---\n{}",
        file_name, timestamp, snippet
    )
}
