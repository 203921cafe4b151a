//! # KB Ingest
//!
//! A knowledge-base file ingestion and summarization pipeline for AI agents.
//!
//! KB Ingest turns an uploaded file into a stored object, a persisted
//! knowledge-base entry, and a retrieval-oriented summary. Extraction is
//! best-effort across text, PDF and DOCX inputs; summarization tries an
//! ordered ladder of model candidates and degrades to a deterministic
//! lexical summarizer when every model fails, so ingestion never blocks on
//! the model layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────┐
//! │  Upload  │──▶│ Extractor │──▶│ Orchestrator │──▶│  SQLite   │
//! │  bytes   │   │ txt/pdf/  │   │ model ladder │   │  entries  │
//! └────┬─────┘   │ docx/bin  │   │ + fallback   │   └──────────┘
//!      │         └───────────┘   └─────────────┘
//!      ▼
//! ┌──────────┐
//! │    S3    │
//! │  object  │
//! └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`sniff`] | Statistical text/encoding detection |
//! | [`extract`] | Multi-format content extraction |
//! | [`chunk`] | Structural truncation to a token budget |
//! | [`transport`] | Model transport client |
//! | [`summarize`] | Summary orchestration over model candidates |
//! | [`fallback`] | Deterministic fallback summarizer |
//! | [`storage`] | Object storage upload and filename sanitization |
//! | [`pipeline`] | Ingest boundary |
//! | [`db`] | Database connection and inserts |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod extract;
pub mod fallback;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod sniff;
pub mod storage;
pub mod summarize;
pub mod transport;
