//! Persistence operations on the projects table and the processed-files
//! ledger.
//!
//! Project identity is the normalized name and nothing else: trimmed,
//! internal whitespace collapsed, matched exactly. No fuzzy matching, no
//! alias resolution. The aggregated text is append-only; only the three
//! classification fields are ever overwritten.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::models::{Categorization, ProcessedEntry, ProcessedLog, Project};

/// Trim and collapse internal whitespace. The sole identity mechanism for
/// project rows.
pub fn normalize_project_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Append `text` to the named project's aggregated data, creating the row
/// if it does not exist. Returns the project id, or `None` when the name
/// normalizes to nothing.
pub async fn append_to_project_data(
    pool: &SqlitePool,
    project_name: &str,
    text: &str,
) -> Result<Option<i64>> {
    let normalized = normalize_project_name(project_name);
    if normalized.is_empty() {
        warn!("Attempted to append data to a project with an empty name");
        return Ok(None);
    }

    let now = chrono::Utc::now().timestamp();

    let existing_id: Option<i64> =
        sqlx::query_scalar("SELECT project_id FROM projects WHERE project_name = ?")
            .bind(&normalized)
            .fetch_optional(pool)
            .await?;

    let project_id = match existing_id {
        Some(id) => {
            sqlx::query(
                "UPDATE projects SET aggregated_data = aggregated_data || ?, updated_at = ? \
                 WHERE project_id = ?",
            )
            .bind(text)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await?;
            id
        }
        None => {
            let result = sqlx::query(
                "INSERT INTO projects (project_name, aggregated_data, created_at, updated_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&normalized)
            .bind(text)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await?;
            result.last_insert_rowid()
        }
    };

    Ok(Some(project_id))
}

/// Overwrite the three classification fields. Returns `false` (with a
/// logged warning) when the id does not exist.
pub async fn update_project_categorization(
    pool: &SqlitePool,
    project_id: i64,
    categorization: &Categorization,
) -> Result<bool> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        "UPDATE projects SET category = ?, sub_category = ?, project_scope = ?, updated_at = ? \
         WHERE project_id = ?",
    )
    .bind(&categorization.category)
    .bind(&categorization.sub_category)
    .bind(&categorization.project_scope)
    .bind(now)
    .bind(project_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        warn!(project_id, "No project with this id; categorization not applied");
        return Ok(false);
    }
    Ok(true)
}

/// The aggregated text for a project, looked up by normalized name.
pub async fn get_project_data(pool: &SqlitePool, project_name: &str) -> Result<Option<String>> {
    let normalized = normalize_project_name(project_name);
    let data: Option<String> =
        sqlx::query_scalar("SELECT aggregated_data FROM projects WHERE project_name = ?")
            .bind(&normalized)
            .fetch_optional(pool)
            .await?;
    Ok(data)
}

/// All project names, sorted.
pub async fn get_all_project_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let names: Vec<String> =
        sqlx::query_scalar("SELECT project_name FROM projects ORDER BY project_name")
            .fetch_all(pool)
            .await?;
    Ok(names)
}

/// Full project row by normalized name.
pub async fn get_project(pool: &SqlitePool, project_name: &str) -> Result<Option<Project>> {
    let normalized = normalize_project_name(project_name);
    let row = sqlx::query(
        "SELECT project_id, project_name, category, sub_category, project_scope, \
         aggregated_data, created_at, updated_at FROM projects WHERE project_name = ?",
    )
    .bind(&normalized)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Project {
        project_id: r.get("project_id"),
        project_name: r.get("project_name"),
        category: r.get("category"),
        sub_category: r.get("sub_category"),
        project_scope: r.get("project_scope"),
        aggregated_data: r.get("aggregated_data"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }))
}

/// Load the processed-files ledger into memory.
pub async fn load_processed_log(pool: &SqlitePool) -> Result<ProcessedLog> {
    let rows = sqlx::query("SELECT file_path, modified_at, content_hash FROM processed_files")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            (
                r.get::<String, _>("file_path"),
                ProcessedEntry {
                    modified_at: r.get("modified_at"),
                    content_hash: r.get("content_hash"),
                },
            )
        })
        .collect())
}

/// Record (or refresh) a ledger entry after a file has been processed.
pub async fn record_processed(
    pool: &SqlitePool,
    file_path: &str,
    modified_at: i64,
    content_hash: &str,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO processed_files (file_path, modified_at, content_hash, processed_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(file_path) DO UPDATE SET
            modified_at = excluded.modified_at,
            content_hash = excluded.content_hash,
            processed_at = excluded.processed_at
        "#,
    )
    .bind(file_path)
    .bind(modified_at)
    .bind(content_hash)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_trims_and_collapses_whitespace() {
        assert_eq!(
            normalize_project_name("  West Doe   Project  "),
            "West Doe Project"
        );
        assert_eq!(normalize_project_name("\tAlpha\n Beta "), "Alpha Beta");
        assert_eq!(normalize_project_name("   "), "");
    }
}
