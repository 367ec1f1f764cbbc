//! Persistence collaborator interface
//!
//! The `PaperStore` trait is the dependency-injected seam between the core
//! logic and storage. Production code uses the SeaORM-backed `Repository`;
//! tests substitute the in-memory `MemoryStore`. Every method that mutates
//! a paper is a single read-validate-write transaction keyed by `paper_id`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::models::{Actor, ArticleKind, Attribution, PaperRecord, RosterEntry};
use crate::engagement::{VoteChange, VoteDirection};
use crate::errors::Result;

/// A paper parsed out of a listing, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperDraft {
    /// External identifier, e.g. an arXiv id
    pub paper_id: String,
    pub title: String,
    /// Ordered author-name strings; order is semantically significant
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub comments: String,
    pub primary_link: String,
    pub pdf_link: String,
    pub article_kind: ArticleKind,
    /// 1-based serial within the draft's section of the listing
    pub position_in_batch: i32,
}

/// What a single-draft upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    /// Existing row's mutable fields replaced; engagement state preserved
    Updated,
    /// Duplicate `paper_id` with overwrite disabled; not an error
    Skipped,
}

/// Outcome of ingesting one batch of drafts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub listing_date: NaiveDate,
    pub inserted: usize,
    pub updated: usize,
    /// Paper ids skipped as duplicates
    pub skipped: Vec<String>,
    /// Drafts whose transaction failed and was rolled back individually
    pub failed: usize,
}

impl IngestResult {
    pub fn new(listing_date: NaiveDate) -> Self {
        Self {
            listing_date,
            inserted: 0,
            updated: 0,
            skipped: Vec::new(),
            failed: 0,
        }
    }

    /// Papers that ended up persisted by this ingest pass
    pub fn ingested(&self) -> usize {
        self.inserted + self.updated
    }
}

/// A day's papers grouped for display, most engaged groups first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    pub listing_date: Option<NaiveDate>,
    pub local_papers: Vec<PaperRecord>,
    pub papers_with_presenters: Vec<PaperRecord>,
    pub papers_with_votes: Vec<PaperRecord>,
    pub reserved_papers: Vec<PaperRecord>,
    pub other_new_papers: Vec<PaperRecord>,
    pub cross_listed_papers: Vec<PaperRecord>,
}

/// Transactional paper storage keyed by external `paper_id`
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Fetch one paper by external id
    async fn find_paper(&self, paper_id: &str) -> Result<Option<PaperRecord>>;

    /// Insert a draft, or resolve a `paper_id` conflict per `overwrite`.
    ///
    /// With `overwrite` the existing row's mutable fields are replaced in
    /// the same transaction while attribution, voters, presenter, and
    /// reservation are preserved.
    async fn upsert_paper(
        &self,
        listing_date: NaiveDate,
        draft: &PaperDraft,
        overwrite: bool,
    ) -> Result<UpsertOutcome>;

    /// All papers ingested under a batch date, in batch order
    async fn papers_for_date(&self, listing_date: NaiveDate) -> Result<Vec<PaperRecord>>;

    /// Most recent batch date present in the store
    async fn latest_listing_date(&self) -> Result<Option<NaiveDate>>;

    /// Attach (or clear) the matcher's attribution for a paper
    async fn apply_attribution(
        &self,
        paper_id: &str,
        attribution: Option<Attribution>,
    ) -> Result<()>;

    /// Record an up or down vote for an actor
    async fn record_vote(
        &self,
        paper_id: &str,
        actor_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteChange>;

    /// Set or clear the presenter for a paper
    async fn record_presenter(&self, paper_id: &str, presenter: Option<Actor>) -> Result<()>;

    /// Set or clear the reservation for a paper
    async fn record_reservation(
        &self,
        paper_id: &str,
        reserver: Option<Actor>,
        reserved_until: Option<NaiveDate>,
    ) -> Result<()>;

    /// The grouped listing for a date, defaulting to the latest date
    async fn get_listing(&self, listing_date: Option<NaiveDate>) -> Result<Listing>;

    /// The current roster, for the matcher
    async fn load_roster(&self) -> Result<Vec<RosterEntry>>;

    /// Insert one roster entry; name conflicts resolve per `overwrite`
    async fn insert_roster_entry(
        &self,
        name: &str,
        email: &str,
        affiliation: Option<&str>,
        overwrite: bool,
    ) -> Result<UpsertOutcome>;
}
