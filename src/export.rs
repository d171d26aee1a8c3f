//! Export the projects table for downstream use.
//!
//! Produces either a pretty-printed JSON array or a CSV file of every
//! project row, written to a file path or stdout for piping.

use anyhow::{bail, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::path::Path;

#[derive(Serialize)]
struct ExportProject {
    project_id: i64,
    project_name: String,
    category: Option<String>,
    sub_category: Option<String>,
    project_scope: Option<String>,
    aggregated_data: String,
    created_at: i64,
    updated_at: i64,
}

/// Export all projects in the requested format (`json` or `csv`).
pub async fn run_export(pool: &SqlitePool, format: &str, output: Option<&Path>) -> Result<()> {
    let rows = sqlx::query(
        "SELECT project_id, project_name, category, sub_category, project_scope, \
         aggregated_data, created_at, updated_at FROM projects ORDER BY project_name",
    )
    .fetch_all(pool)
    .await?;

    let projects: Vec<ExportProject> = rows
        .iter()
        .map(|row| ExportProject {
            project_id: row.get("project_id"),
            project_name: row.get("project_name"),
            category: row.get("category"),
            sub_category: row.get("sub_category"),
            project_scope: row.get("project_scope"),
            aggregated_data: row.get("aggregated_data"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
        .collect();

    let count = projects.len();
    let rendered = match format {
        "json" => serde_json::to_string_pretty(&projects)?,
        "csv" => render_csv(&projects),
        other => bail!("Unknown export format: '{}'. Must be json or csv.", other),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &rendered)?;
            eprintln!("Exported {} projects to {}", count, path.display());
        }
        None => {
            println!("{}", rendered);
        }
    }

    Ok(())
}

fn render_csv(projects: &[ExportProject]) -> String {
    let mut out = String::from(
        "project_id,project_name,category,sub_category,project_scope,aggregated_data,created_at,updated_at\n",
    );
    for p in projects {
        let fields = [
            p.project_id.to_string(),
            p.project_name.clone(),
            p.category.clone().unwrap_or_default(),
            p.sub_category.clone().unwrap_or_default(),
            p.project_scope.clone().unwrap_or_default(),
            p.aggregated_data.clone(),
            p.created_at.to_string(),
            p.updated_at.to_string(),
        ];
        let escaped: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    out
}

/// RFC 4180 field quoting: wrap when the value contains a comma, quote, or
/// newline, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
