//! tfv — Terraform log viewer
//!
//! Ingests Terraform's JSON log stream (`TF_LOG=json`), normalizes each line,
//! stores it in SQLite and serves ranked text search and filtered listings.
//! This crate re-exports the pipeline layers from `tfv-core` so that the
//! integration tests and benches import them from one place.
//!
//! # Architecture
//!
//! ```text
//! Ingestor ──► Normalizer ──► Store ──► SearchIndex
//!    │                          ▲
//!    └── analysis (dry run)     └── LogQuery filters
//! ```

pub use tfv_core::*;
