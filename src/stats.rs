//! Database overview for `pscout stats`.
//!
//! A quick summary of what the pipeline has accumulated: project and
//! categorization counts, aggregated-text volume, and ledger size.

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

pub async fn run_stats(pool: &SqlitePool, db_path: &Path) -> Result<()> {
    let total_projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
        .fetch_one(pool)
        .await?;

    let categorized: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM projects WHERE category IS NOT NULL AND category != '' \
         AND category != 'Uncategorized'",
    )
    .fetch_one(pool)
    .await?;

    let aggregated_bytes: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(LENGTH(aggregated_data)), 0) FROM projects")
            .fetch_one(pool)
            .await?;

    let processed_files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processed_files")
        .fetch_one(pool)
        .await?;

    let db_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    println!("Project Scout — Database Stats");
    println!("==============================");
    println!();
    println!("  Database:        {}", db_path.display());
    println!("  Size:            {}", format_bytes(db_size));
    println!();
    println!("  Projects:        {}", total_projects);
    println!(
        "  Categorized:     {} / {} ({}%)",
        categorized,
        total_projects,
        if total_projects > 0 {
            (categorized * 100) / total_projects
        } else {
            0
        }
    );
    println!(
        "  Aggregated text: {}",
        format_bytes(aggregated_bytes.max(0) as u64)
    );
    println!("  Processed files: {}", processed_files);
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
