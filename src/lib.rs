//! # Project Scout
//!
//! A local-first document-intelligence pipeline for engineering project
//! records.
//!
//! Project Scout scans a folder of engineering documents (PDF, DOCX, PPTX,
//! XLSX), asks a local LLM to spot project names and copy out the verbatim
//! passages discussing them, and accumulates those passages per project in
//! SQLite. A second LLM pass classifies each project against a taxonomy
//! document.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌──────────────────┐   ┌──────────┐
//! │ Discovery │──▶│ Extraction │──▶│ Chunk + Analyze   │──▶│  SQLite   │
//! │ walkdir   │   │ pdf/ooxml │   │ names → snippets  │   │ projects │
//! └───────────┘   └───────────┘   └────────┬─────────┘   └────┬─────┘
//!                                          │                  │
//!                                   ┌──────▼──────┐     ┌─────▼────┐
//!                                   │   Ollama     │     │   CLI    │
//!                                   │ /api/generate│     │ (pscout) │
//!                                   └─────────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pscout init                    # create database
//! pscout scan                    # process new/updated documents
//! pscout projects list           # see what was found
//! pscout export --format csv     # dump the projects table
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`discover`] | Folder scan with processed-state ledger |
//! | [`extract`] | PDF/OOXML text extraction |
//! | [`chunk`] | Word-window text chunking |
//! | [`llm`] | Ollama client and analyst trait |
//! | [`pipeline`] | Per-file and per-folder orchestration |
//! | [`store`] | Persistence operations |
//! | [`export`] | JSON/CSV export |
//! | [`stats`] | Database overview |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod discover;
pub mod export;
pub mod extract;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod stats;
pub mod store;
