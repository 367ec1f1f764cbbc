//! In-memory paper store
//!
//! A `PaperStore` backed by process memory. Used by tests and demos in
//! place of the SeaORM repository; it routes every mutation through the
//! same pure engagement transitions, so the invariants cannot diverge
//! between the two implementations.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::models::{
    Actor, ArticleKind, Attribution, AuthorList, PaperRecord, RosterEntry, VoterSet,
};
use crate::db::store::{Listing, PaperDraft, PaperStore, UpsertOutcome};
use crate::engagement::{self, VoteChange, VoteDirection};
use crate::errors::{AppError, Result};

#[derive(Default)]
struct MemoryInner {
    /// Keyed by external `paper_id`; the key set enforces uniqueness
    papers: BTreeMap<String, PaperRecord>,
    roster: BTreeMap<String, RosterEntry>,
    next_roster_id: i32,
}

/// In-memory `PaperStore` implementation
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_record(listing_date: NaiveDate, draft: &PaperDraft) -> PaperRecord {
        let now = chrono::Utc::now();
        PaperRecord {
            id: Uuid::new_v4(),
            paper_id: draft.paper_id.clone(),
            listing_date,
            position_in_batch: draft.position_in_batch,
            article_kind: draft.article_kind,
            title: draft.title.clone(),
            abstract_text: draft.abstract_text.clone(),
            comments: draft.comments.clone(),
            primary_link: draft.primary_link.clone(),
            pdf_link: draft.pdf_link.clone(),
            authors: AuthorList(draft.authors.clone()),
            attribution: None,
            vote_count: 0,
            voters: VoterSet::default(),
            presenter: None,
            reservation: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn replace_mutable_fields(row: &mut PaperRecord, listing_date: NaiveDate, draft: &PaperDraft) {
        row.listing_date = listing_date;
        row.position_in_batch = draft.position_in_batch;
        row.article_kind = draft.article_kind;
        row.title = draft.title.clone();
        row.abstract_text = draft.abstract_text.clone();
        row.comments = draft.comments.clone();
        row.primary_link = draft.primary_link.clone();
        row.pdf_link = draft.pdf_link.clone();
        row.authors = AuthorList(draft.authors.clone());
        row.updated_at = chrono::Utc::now().into();
    }
}

#[async_trait]
impl PaperStore for MemoryStore {
    async fn find_paper(&self, paper_id: &str) -> Result<Option<PaperRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.papers.get(paper_id).cloned())
    }

    async fn upsert_paper(
        &self,
        listing_date: NaiveDate,
        draft: &PaperDraft,
        overwrite: bool,
    ) -> Result<UpsertOutcome> {
        let mut inner = self.inner.lock().await;

        if let Some(row) = inner.papers.get_mut(&draft.paper_id) {
            if !overwrite {
                return Ok(UpsertOutcome::Skipped);
            }
            Self::replace_mutable_fields(row, listing_date, draft);
            return Ok(UpsertOutcome::Updated);
        }

        inner.papers.insert(
            draft.paper_id.clone(),
            Self::build_record(listing_date, draft),
        );
        Ok(UpsertOutcome::Inserted)
    }

    async fn papers_for_date(&self, listing_date: NaiveDate) -> Result<Vec<PaperRecord>> {
        let inner = self.inner.lock().await;
        let mut papers: Vec<_> = inner
            .papers
            .values()
            .filter(|p| p.listing_date == listing_date)
            .cloned()
            .collect();
        papers.sort_by_key(|p| p.position_in_batch);
        Ok(papers)
    }

    async fn latest_listing_date(&self) -> Result<Option<NaiveDate>> {
        let inner = self.inner.lock().await;
        Ok(inner.papers.values().map(|p| p.listing_date).max())
    }

    async fn apply_attribution(
        &self,
        paper_id: &str,
        attribution: Option<Attribution>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .papers
            .get_mut(paper_id)
            .ok_or_else(|| AppError::PaperNotFound {
                paper_id: paper_id.to_string(),
            })?;

        row.attribution = attribution;
        row.updated_at = chrono::Utc::now().into();
        Ok(())
    }

    async fn record_vote(
        &self,
        paper_id: &str,
        actor_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteChange> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .papers
            .get_mut(paper_id)
            .ok_or_else(|| AppError::PaperNotFound {
                paper_id: paper_id.to_string(),
            })?;

        let (next, change) = engagement::apply_vote(&row.voters, actor_id, direction);
        if change != VoteChange::NoOp {
            row.vote_count = next.len() as i32;
            row.voters = next;
            row.updated_at = chrono::Utc::now().into();
        }

        Ok(change)
    }

    async fn record_presenter(&self, paper_id: &str, presenter: Option<Actor>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .papers
            .get_mut(paper_id)
            .ok_or_else(|| AppError::PaperNotFound {
                paper_id: paper_id.to_string(),
            })?;

        row.presenter = engagement::next_presenter(&row.presenter, &row.reservation, presenter)?;
        row.updated_at = chrono::Utc::now().into();
        Ok(())
    }

    async fn record_reservation(
        &self,
        paper_id: &str,
        reserver: Option<Actor>,
        reserved_until: Option<NaiveDate>,
    ) -> Result<()> {
        let today = chrono::Utc::now().date_naive();
        let mut inner = self.inner.lock().await;
        let row = inner
            .papers
            .get_mut(paper_id)
            .ok_or_else(|| AppError::PaperNotFound {
                paper_id: paper_id.to_string(),
            })?;

        row.reservation = engagement::next_reservation(
            &row.reservation,
            &row.presenter,
            reserver,
            reserved_until,
            today,
        )?;
        row.updated_at = chrono::Utc::now().into();
        Ok(())
    }

    async fn get_listing(&self, listing_date: Option<NaiveDate>) -> Result<Listing> {
        let listing_date = match listing_date {
            Some(date) => Some(date),
            None => self.latest_listing_date().await?,
        };

        let Some(date) = listing_date else {
            return Ok(Listing::default());
        };

        let inner = self.inner.lock().await;
        let day: Vec<&PaperRecord> = inner
            .papers
            .values()
            .filter(|p| p.listing_date == date)
            .collect();

        let by_votes = |papers: &mut Vec<PaperRecord>| {
            papers.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
        };
        let by_position = |papers: &mut Vec<PaperRecord>| {
            papers.sort_by_key(|p| p.position_in_batch);
        };

        let mut local_papers: Vec<_> = day
            .iter()
            .filter(|p| p.is_local() && !p.is_reserved() && !p.has_presenter())
            .map(|p| (*p).clone())
            .collect();
        by_votes(&mut local_papers);

        let mut papers_with_presenters: Vec<_> = day
            .iter()
            .filter(|p| p.has_presenter() && !p.is_local() && !p.is_reserved())
            .map(|p| (*p).clone())
            .collect();
        by_votes(&mut papers_with_presenters);

        let mut papers_with_votes: Vec<_> = day
            .iter()
            .filter(|p| {
                p.vote_count > 0 && !p.has_presenter() && !p.is_local() && !p.is_reserved()
            })
            .map(|p| (*p).clone())
            .collect();
        by_votes(&mut papers_with_votes);

        let mut reserved_papers: Vec<_> = day
            .iter()
            .filter(|p| p.is_reserved())
            .map(|p| (*p).clone())
            .collect();
        by_votes(&mut reserved_papers);

        fn unengaged(p: &PaperRecord) -> bool {
            p.vote_count == 0 && !p.has_presenter() && !p.is_local() && !p.is_reserved()
        }

        let mut other_new_papers: Vec<_> = day
            .iter()
            .filter(|p| p.article_kind == ArticleKind::New && unengaged(p))
            .map(|p| (*p).clone())
            .collect();
        by_position(&mut other_new_papers);

        let mut cross_listed_papers: Vec<_> = day
            .iter()
            .filter(|p| p.article_kind == ArticleKind::CrossList && unengaged(p))
            .map(|p| (*p).clone())
            .collect();
        by_position(&mut cross_listed_papers);

        Ok(Listing {
            listing_date: Some(date),
            local_papers,
            papers_with_presenters,
            papers_with_votes,
            reserved_papers,
            other_new_papers,
            cross_listed_papers,
        })
    }

    async fn load_roster(&self) -> Result<Vec<RosterEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner.roster.values().cloned().collect())
    }

    async fn insert_roster_entry(
        &self,
        name: &str,
        email: &str,
        affiliation: Option<&str>,
        overwrite: bool,
    ) -> Result<UpsertOutcome> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner.roster.get_mut(name) {
            if !overwrite {
                return Ok(UpsertOutcome::Skipped);
            }
            existing.email = email.to_string();
            existing.affiliation = affiliation.map(str::to_string);
            return Ok(UpsertOutcome::Updated);
        }

        inner.next_roster_id += 1;
        let id = inner.next_roster_id;
        inner.roster.insert(
            name.to_string(),
            RosterEntry {
                id,
                name: name.to_string(),
                email: email.to_string(),
                affiliation: affiliation.map(str::to_string),
            },
        );
        Ok(UpsertOutcome::Inserted)
    }
}
