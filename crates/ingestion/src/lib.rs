//! journalclub ingestion library
//!
//! Turns daily listing documents into persisted paper records:
//! - Listing parsing over an already-fetched document tree
//! - Author-name normalization and two-stage local-author matching
//! - Batch upsert and attribution against a `PaperStore`

pub mod authors;
pub mod ingest;
pub mod parser;

pub use authors::{match_local_authors, normalize_name, similarity, NameKeys, RosterMember};
pub use ingest::{attribute_listing, collect_drafts, ingest};
pub use parser::{parse_listing, ParsedListing};
