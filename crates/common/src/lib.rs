//! journalclub common library
//!
//! Shared code for the journalclub services including:
//! - Database models and the `PaperStore` persistence seam
//! - Engagement state transitions (vote / present / reserve)
//! - Error types and handling
//! - Configuration management
//! - Meeting schedule rules
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod engagement;
pub mod errors;
pub mod metrics;
pub mod schedule;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{IngestResult, Listing, MemoryStore, PaperDraft, PaperStore, Repository, UpsertOutcome};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
