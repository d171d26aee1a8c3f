//! # Project Scout CLI (`pscout`)
//!
//! The `pscout` binary drives the document-intelligence pipeline: database
//! initialization, folder scans, single-file processing, project
//! inspection, re-categorization, export, and administrative utilities.
//!
//! ## Usage
//!
//! ```bash
//! pscout --config ./config/pscout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pscout init` | Create the SQLite database and run schema migrations |
//! | `pscout scan` | Process every new or updated document under the configured root |
//! | `pscout process <file>` | Run the pipeline on one document |
//! | `pscout projects list` | List all known projects |
//! | `pscout projects show <name>` | Print a project's aggregated data |
//! | `pscout categorize --all` | Re-run the classifier |
//! | `pscout export --format csv` | Dump the projects table |
//! | `pscout stats` | Database overview |
//! | `pscout models` | List models available on the Ollama server |
//! | `pscout wipe --yes` | Drop and recreate all tables |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use project_scout::llm::{OllamaClient, ProjectAnalyst};
use project_scout::pipeline::StopFlag;
use project_scout::{config, db, discover, export, migrate, pipeline, stats, store};

/// Project Scout — scan engineering documents, extract verbatim project
/// snippets with a local LLM, and aggregate them per project in SQLite.
#[derive(Parser)]
#[command(
    name = "pscout",
    about = "Project Scout — a local-first document-intelligence pipeline for engineering project records",
    version,
    long_about = "Project Scout scans a folder of engineering documents (PDF, DOCX, PPTX, XLSX), \
    uses a local Ollama model to identify project names and extract verbatim snippets about them, \
    and aggregates the snippets per project in SQLite with an LLM classification pass on top."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pscout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the projects and
    /// processed-files tables. Idempotent — running it again is safe.
    Init,

    /// Process every new or updated document under the configured root.
    ///
    /// Discovers supported files, skips those already in the
    /// processed-files ledger, and runs the extraction workflow on the
    /// rest. Ctrl-C stops cleanly between files/chunks.
    Scan {
        /// Reprocess all files regardless of the ledger.
        #[arg(long)]
        force: bool,

        /// Maximum number of files to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Show what would be processed without calling the model.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the pipeline on a single document.
    Process {
        /// Path to the document (.pdf, .docx, .pptx, .xlsx).
        file: PathBuf,
    },

    /// Inspect stored projects.
    Projects {
        #[command(subcommand)]
        action: ProjectsAction,
    },

    /// Re-run the classifier over stored projects.
    ///
    /// Fetches each project's aggregated data and overwrites its
    /// category, sub-category, and scope.
    Categorize {
        /// Project name (normalized-name match). Omit with --all.
        name: Option<String>,

        /// Re-categorize every project.
        #[arg(long)]
        all: bool,
    },

    /// Export the projects table.
    Export {
        /// Output format: json or csv.
        #[arg(long, default_value = "json")]
        format: String,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print a database overview.
    Stats,

    /// List models available on the Ollama server.
    Models,

    /// Drop and recreate all tables. Destructive.
    Wipe {
        /// Confirm the wipe; without this flag nothing happens.
        #[arg(long)]
        yes: bool,
    },
}

/// Project inspection subcommands.
#[derive(Subcommand)]
enum ProjectsAction {
    /// List all project names with their classification.
    List,
    /// Print one project's full aggregated data.
    Show {
        /// Project name (whitespace-normalized before lookup).
        name: String,
    },
}

/// Install a Ctrl-C handler that flips the pipeline stop flag.
fn install_stop_handler() -> StopFlag {
    let stop: StopFlag = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stop requested; finishing current unit of work...");
            flag.store(true, Ordering::Relaxed);
        }
    });
    stop
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Scan {
            force,
            limit,
            dry_run,
        } => {
            let pool = db::connect(&cfg.db.path).await?;
            if dry_run {
                let processed = store::load_processed_log(&pool).await?;
                let mut records = discover::scan_documents(&cfg.discovery, &processed, force)?;
                if let Some(lim) = limit {
                    records.truncate(lim);
                }
                println!("scan (dry-run)");
                println!("  files to process: {}", records.len());
                for record in &records {
                    println!(
                        "  {:<10} {}",
                        record.status.as_str(),
                        record.path.display()
                    );
                }
                pool.close().await;
                return Ok(());
            }

            let analyst = OllamaClient::new(&cfg.llm)?;
            let stop = install_stop_handler();
            let summary =
                pipeline::run_folder(&cfg, &pool, &analyst, force, limit, &stop).await?;
            println!("scan");
            println!("  files seen: {}", summary.files_seen);
            println!("  files processed: {}", summary.files_processed);
            println!("  files skipped: {}", summary.files_skipped);
            println!("  snippets appended: {}", summary.snippets_appended);
            println!("  projects touched: {}", summary.projects_touched);
            println!("ok");
            pool.close().await;
        }
        Commands::Process { file } => {
            let pool = db::connect(&cfg.db.path).await?;
            let analyst = OllamaClient::new(&cfg.llm)?;
            let stop = install_stop_handler();
            let report = pipeline::process_file(&cfg, &pool, &analyst, &file, &stop).await?;
            println!("process {}", file.display());
            println!("  outcome: {:?}", report.outcome);
            println!("  snippets appended: {}", report.snippets_appended);
            println!("  projects touched: {}", report.projects_touched);
            pool.close().await;
        }
        Commands::Projects { action } => {
            let pool = db::connect(&cfg.db.path).await?;
            match action {
                ProjectsAction::List => {
                    let names = store::get_all_project_names(&pool).await?;
                    if names.is_empty() {
                        println!("No projects stored.");
                    } else {
                        for name in &names {
                            if let Some(project) = store::get_project(&pool, name).await? {
                                println!(
                                    "{:<50} {} / {} / {}",
                                    project.project_name,
                                    project.category.as_deref().unwrap_or("-"),
                                    project.sub_category.as_deref().unwrap_or("-"),
                                    project.project_scope.as_deref().unwrap_or("-"),
                                );
                            }
                        }
                        println!("{} projects", names.len());
                    }
                }
                ProjectsAction::Show { name } => match store::get_project(&pool, &name).await? {
                    Some(project) => {
                        println!("Project:  {}", project.project_name);
                        println!(
                            "Category: {} / {} / {}",
                            project.category.as_deref().unwrap_or("-"),
                            project.sub_category.as_deref().unwrap_or("-"),
                            project.project_scope.as_deref().unwrap_or("-"),
                        );
                        println!();
                        println!("{}", project.aggregated_data);
                    }
                    None => {
                        anyhow::bail!("Project not found: {}", name);
                    }
                },
            }
            pool.close().await;
        }
        Commands::Categorize { name, all } => {
            if name.is_none() && !all {
                anyhow::bail!("Specify a project name or --all");
            }
            let pool = db::connect(&cfg.db.path).await?;
            let analyst = OllamaClient::new(&cfg.llm)?;

            let names = match name {
                Some(n) => vec![store::normalize_project_name(&n)],
                None => store::get_all_project_names(&pool).await?,
            };

            let mut updated = 0usize;
            for project_name in &names {
                let Some(project) = store::get_project(&pool, project_name).await? else {
                    anyhow::bail!("Project not found: {}", project_name);
                };
                let categorization = analyst.categorize(&project.aggregated_data).await;
                if store::update_project_categorization(&pool, project.project_id, &categorization)
                    .await?
                {
                    println!(
                        "{:<50} {} / {} / {}",
                        project.project_name,
                        categorization.category,
                        categorization.sub_category,
                        categorization.project_scope,
                    );
                    updated += 1;
                }
            }
            println!("{} projects categorized", updated);
            pool.close().await;
        }
        Commands::Export { format, output } => {
            let pool = db::connect(&cfg.db.path).await?;
            export::run_export(&pool, &format, output.as_deref()).await?;
            pool.close().await;
        }
        Commands::Stats => {
            let pool = db::connect(&cfg.db.path).await?;
            stats::run_stats(&pool, &cfg.db.path).await?;
            pool.close().await;
        }
        Commands::Models => {
            let client = OllamaClient::new(&cfg.llm)?;
            let models = client.list_models().await?;
            if models.is_empty() {
                println!("No models available.");
            } else {
                for model in models {
                    println!("{}", model);
                }
            }
        }
        Commands::Wipe { yes } => {
            if !yes {
                anyhow::bail!("Refusing to wipe without --yes");
            }
            let pool = db::connect(&cfg.db.path).await?;
            migrate::wipe_database(&pool).await?;
            pool.close().await;
            println!("Database wiped and schema recreated.");
        }
    }

    Ok(())
}
