//! Core data models used throughout Project Scout.
//!
//! These types represent the files, chunks, and projects that flow through
//! the discovery, extraction, and persistence pipeline.

use std::collections::HashMap;
use std::path::PathBuf;

/// Processing status assigned to a discovered file by comparing it against
/// the processed-files ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Never seen before.
    New,
    /// Seen before, but the file changed since (mtime or content hash).
    Updated,
    /// Seen before and unchanged. Excluded from scans unless forced.
    SkippedProcessed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::New => "new",
            FileStatus::Updated => "updated",
            FileStatus::SkippedProcessed => "skipped_processed",
        }
    }
}

/// A document found during folder discovery.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Lowercased extension including the dot, e.g. `".pdf"`.
    pub file_type: String,
    pub status: FileStatus,
}

/// One entry of the processed-files ledger.
#[derive(Debug, Clone)]
pub struct ProcessedEntry {
    /// File mtime (unix seconds) at the time it was processed.
    pub modified_at: i64,
    /// SHA-256 of the file bytes at the time it was processed.
    pub content_hash: String,
}

/// The processed-files ledger, keyed by canonical file path.
///
/// Passed explicitly into discovery so scans carry no hidden state; the
/// caller decides when to load it from and persist it to the database.
pub type ProcessedLog = HashMap<String, ProcessedEntry>;

/// A bounded slice of a document's text. Transient: exists only while one
/// document is being processed.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// A project row as stored in SQLite.
#[derive(Debug, Clone)]
pub struct Project {
    pub project_id: i64,
    pub project_name: String,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub project_scope: Option<String>,
    /// Append-only concatenation of every snippet ever extracted for this
    /// project, each prefixed with a source/timestamp header.
    pub aggregated_data: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// The three-field classification produced by the categorizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorization {
    pub category: String,
    pub sub_category: String,
    pub project_scope: String,
}

impl Categorization {
    /// Sentinel returned when classification fails for any reason.
    pub fn uncategorized() -> Self {
        Self {
            category: "Uncategorized".to_string(),
            sub_category: String::new(),
            project_scope: "Unclassified".to_string(),
        }
    }
}
