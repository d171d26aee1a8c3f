//! Folder discovery for supported engineering documents.
//!
//! Walks a root folder, keeps files whose extension is in the supported
//! set, and classifies each against the caller-supplied [`ProcessedLog`]
//! so unchanged files are skipped. The log is an explicit value with
//! caller-controlled lifetime; discovery itself holds no state between
//! calls.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::DiscoveryConfig;
use crate::extract::SUPPORTED_EXTENSIONS;
use crate::models::{FileRecord, FileStatus, ProcessedLog};

/// Scan `config.root` for supported documents.
///
/// Files whose ledger entry matches their current mtime and content hash
/// are omitted unless `force` is set; everything else comes back as
/// `New` or `Updated`, sorted by path for deterministic ordering.
pub fn scan_documents(
    config: &DiscoveryConfig,
    processed: &ProcessedLog,
    force: bool,
) -> Result<Vec<FileRecord>> {
    let root = &config.root;
    if !root.is_dir() {
        bail!("Discovery root does not exist: {}", root.display());
    }

    let exclude_set = build_globset(&config.exclude_globs)?;

    let mut records = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(file_type) = supported_extension(path) else {
            continue;
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative.to_string_lossy().as_ref()) {
            continue;
        }

        let status = classify(path, processed)?;
        if status == FileStatus::SkippedProcessed && !force {
            continue;
        }

        records.push(FileRecord {
            path: path.to_path_buf(),
            file_type,
            status,
        });
    }

    records.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(records)
}

/// Lowercased extension (with dot) if the file is a supported document type.
fn supported_extension(path: &Path) -> Option<String> {
    let ext = format!(".{}", path.extension()?.to_string_lossy().to_lowercase());
    SUPPORTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn classify(path: &Path, processed: &ProcessedLog) -> Result<FileStatus> {
    let key = ledger_key(path);
    let Some(entry) = processed.get(&key) else {
        return Ok(FileStatus::New);
    };

    if file_mtime(path)? == entry.modified_at && hash_file(path)? == entry.content_hash {
        Ok(FileStatus::SkippedProcessed)
    } else {
        Ok(FileStatus::Updated)
    }
}

/// Canonical ledger key for a path.
pub fn ledger_key(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

/// File mtime as unix seconds.
pub fn file_mtime(path: &Path) -> Result<i64> {
    let modified = std::fs::metadata(path)?
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    Ok(modified
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64)
}

/// SHA-256 of the file bytes, hex-encoded.
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessedEntry;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn discovery_config(root: &Path) -> DiscoveryConfig {
        DiscoveryConfig {
            root: root.to_path_buf(),
            exclude_globs: Vec::new(),
        }
    }

    #[test]
    fn finds_supported_extensions_case_insensitively() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("b.DOCX"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/c.pptx"), b"x").unwrap();

        let records = scan_documents(&discovery_config(tmp.path()), &HashMap::new(), false).unwrap();
        let types: Vec<&str> = records.iter().map(|r| r.file_type.as_str()).collect();
        assert_eq!(types, vec![".pdf", ".docx", ".pptx"]);
        assert!(records.iter().all(|r| r.status == FileStatus::New));
    }

    #[test]
    fn missing_root_is_an_error() {
        let cfg = discovery_config(Path::new("does/not/exist"));
        assert!(scan_documents(&cfg, &HashMap::new(), false).is_err());
    }

    #[test]
    fn unchanged_files_are_skipped_unless_forced() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("report.pdf");
        std::fs::write(&file, b"contents").unwrap();

        let mut log: ProcessedLog = HashMap::new();
        log.insert(
            ledger_key(&file),
            ProcessedEntry {
                modified_at: file_mtime(&file).unwrap(),
                content_hash: hash_file(&file).unwrap(),
            },
        );

        let cfg = discovery_config(tmp.path());
        assert!(scan_documents(&cfg, &log, false).unwrap().is_empty());

        let forced = scan_documents(&cfg, &log, true).unwrap();
        assert_eq!(forced.len(), 1);
        assert_eq!(forced[0].status, FileStatus::SkippedProcessed);
    }

    #[test]
    fn changed_content_marks_file_updated() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("report.pdf");
        std::fs::write(&file, b"v1").unwrap();

        let mut log: ProcessedLog = HashMap::new();
        log.insert(
            ledger_key(&file),
            ProcessedEntry {
                modified_at: file_mtime(&file).unwrap(),
                content_hash: "stale".to_string(),
            },
        );

        let records = scan_documents(&discovery_config(tmp.path()), &log, false).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, FileStatus::Updated);
    }

    #[test]
    fn exclude_globs_are_honored() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("archive")).unwrap();
        std::fs::write(tmp.path().join("keep.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("archive/old.pdf"), b"x").unwrap();

        let cfg = DiscoveryConfig {
            root: tmp.path().to_path_buf(),
            exclude_globs: vec!["archive/**".to_string()],
        };
        let records = scan_documents(&cfg, &HashMap::new(), false).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].path.ends_with("keep.pdf"));
    }
}
