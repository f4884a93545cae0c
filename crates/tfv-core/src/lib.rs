//! tfv-core — Terraform log viewer core library.
//!
//! This crate exposes the pipeline layers as public modules, plus the shared
//! types used across all layers.
//!
//! # Architecture
//!
//! ```text
//! lines ──► Ingestor ──► Normalizer ──► Store ◄── SearchIndex (FTS5 mirror)
//!                          │                          │
//!     timestamp · severity · phase · payload          └── substring fallback
//! ```
//!
//! Every component takes its collaborators explicitly; there is no
//! process-wide state. File ingestion runs on the `tokio` blocking pool.

pub mod analysis;
pub mod config;
pub mod error;
pub mod ingestor;
pub mod normalizer;
pub mod search;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use ingestor::Ingestor;
pub use normalizer::Normalizer;
pub use search::{IndexState, LogQuery, SearchIndex};
pub use store::{Store, StoreStats};
pub use types::{
    IngestionStats, Level, NormalizedLogRecord, Page, Phase, PhaseCounts, RawLogEntry, StoredLog,
};
