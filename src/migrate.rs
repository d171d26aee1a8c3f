use anyhow::Result;
use sqlx::SqlitePool;

/// Create all tables if they do not exist. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Single active schema: one projects table holding the append-only
    // aggregated text plus the three classification fields.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            project_id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_name TEXT NOT NULL UNIQUE,
            category TEXT,
            sub_category TEXT,
            project_scope TEXT,
            aggregated_data TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Processed-files ledger backing the discovery scan.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processed_files (
            file_path TEXT PRIMARY KEY,
            modified_at INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            processed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_projects_category ON projects(category)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Drop every table and recreate the schema. Destructive; the CLI guards
/// this behind an explicit confirmation flag.
pub async fn wipe_database(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS projects").execute(pool).await?;
    sqlx::query("DROP TABLE IF EXISTS processed_files")
        .execute(pool)
        .await?;
    run_migrations(pool).await
}
