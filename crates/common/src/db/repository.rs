//! SeaORM-backed paper store
//!
//! Every mutating operation is a single serializable read-validate-write
//! transaction keyed by `paper_id`: vote, presenter, and reservation writes
//! are classic check-then-act sequences, and two concurrent reservation
//! attempts must not both observe "no reservation" and both commit.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IsolationLevel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::{
    Actor, ArticleKind, Attribution, ListingActiveModel, ListingColumn, ListingEntity,
    PaperRecord, RosterActiveModel, RosterColumn, RosterEntity, RosterEntry, VoterSet,
};
use crate::db::store::{Listing, PaperDraft, PaperStore, UpsertOutcome};
use crate::db::DbPool;
use crate::engagement::{self, VoteChange, VoteDirection};
use crate::errors::{AppError, Result};
use crate::metrics;

/// Repository for paper and roster data access
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    /// Begin a serializable transaction on the primary
    async fn serializable_txn(&self) -> Result<DatabaseTransaction> {
        self.pool
            .write()
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .map_err(Into::into)
    }

    async fn paper_in_txn(
        txn: &DatabaseTransaction,
        paper_id: &str,
    ) -> Result<Option<PaperRecord>> {
        ListingEntity::find()
            .filter(ListingColumn::PaperId.eq(paper_id))
            .one(txn)
            .await
            .map_err(Into::into)
    }

    /// Set the fields an overwrite may replace; engagement state stays
    fn set_mutable_fields(
        am: &mut ListingActiveModel,
        listing_date: NaiveDate,
        draft: &PaperDraft,
    ) {
        am.listing_date = Set(listing_date);
        am.position_in_batch = Set(draft.position_in_batch);
        am.article_kind = Set(draft.article_kind);
        am.title = Set(draft.title.clone());
        am.abstract_text = Set(draft.abstract_text.clone());
        am.comments = Set(draft.comments.clone());
        am.primary_link = Set(draft.primary_link.clone());
        am.pdf_link = Set(draft.pdf_link.clone());
        am.authors = Set(crate::db::models::AuthorList(draft.authors.clone()));
        am.updated_at = Set(chrono::Utc::now().into());
    }
}

#[async_trait]
impl PaperStore for Repository {
    async fn find_paper(&self, paper_id: &str) -> Result<Option<PaperRecord>> {
        ListingEntity::find()
            .filter(ListingColumn::PaperId.eq(paper_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn upsert_paper(
        &self,
        listing_date: NaiveDate,
        draft: &PaperDraft,
        overwrite: bool,
    ) -> Result<UpsertOutcome> {
        let txn = self.serializable_txn().await?;

        let existing = Self::paper_in_txn(&txn, &draft.paper_id).await?;

        match existing {
            None => {
                let now = chrono::Utc::now();
                let mut am = ListingActiveModel {
                    id: Set(Uuid::new_v4()),
                    paper_id: Set(draft.paper_id.clone()),
                    attribution: Set(None),
                    vote_count: Set(0),
                    voters: Set(VoterSet::default()),
                    presenter: Set(None),
                    reservation: Set(None),
                    created_at: Set(now.into()),
                    ..Default::default()
                };
                Self::set_mutable_fields(&mut am, listing_date, draft);

                am.insert(&txn).await?;
                txn.commit().await?;

                Ok(UpsertOutcome::Inserted)
            }
            Some(_) if !overwrite => {
                txn.rollback().await?;
                warn!(paper_id = %draft.paper_id, "Paper already exists, skipping");
                Ok(UpsertOutcome::Skipped)
            }
            Some(row) => {
                let mut am: ListingActiveModel = row.into();
                Self::set_mutable_fields(&mut am, listing_date, draft);

                am.update(&txn).await?;
                txn.commit().await?;

                warn!(paper_id = %draft.paper_id, "Updated existing listing for paper");
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    async fn papers_for_date(&self, listing_date: NaiveDate) -> Result<Vec<PaperRecord>> {
        ListingEntity::find()
            .filter(ListingColumn::ListingDate.eq(listing_date))
            .order_by_asc(ListingColumn::PositionInBatch)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn latest_listing_date(&self) -> Result<Option<NaiveDate>> {
        let latest = ListingEntity::find()
            .order_by_desc(ListingColumn::ListingDate)
            .one(self.read_conn())
            .await?;

        Ok(latest.map(|row| row.listing_date))
    }

    async fn apply_attribution(
        &self,
        paper_id: &str,
        attribution: Option<Attribution>,
    ) -> Result<()> {
        let txn = self.serializable_txn().await?;

        let Some(row) = Self::paper_in_txn(&txn, paper_id).await? else {
            txn.rollback().await?;
            return Err(AppError::PaperNotFound {
                paper_id: paper_id.to_string(),
            });
        };

        let mut am: ListingActiveModel = row.into();
        am.attribution = Set(attribution);
        am.updated_at = Set(chrono::Utc::now().into());
        am.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn record_vote(
        &self,
        paper_id: &str,
        actor_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteChange> {
        let txn = self.serializable_txn().await?;

        let Some(row) = Self::paper_in_txn(&txn, paper_id).await? else {
            txn.rollback().await?;
            return Err(AppError::PaperNotFound {
                paper_id: paper_id.to_string(),
            });
        };

        let (next, change) = engagement::apply_vote(&row.voters, actor_id, direction);

        if change == VoteChange::NoOp {
            txn.rollback().await?;
        } else {
            let mut am: ListingActiveModel = row.into();
            am.vote_count = Set(next.len() as i32);
            am.voters = Set(next);
            am.updated_at = Set(chrono::Utc::now().into());
            am.update(&txn).await?;
            txn.commit().await?;
        }

        info!(paper_id, actor_id, change = ?change, "Vote recorded");
        metrics::record_engagement("vote", change_label(change));

        Ok(change)
    }

    async fn record_presenter(&self, paper_id: &str, presenter: Option<Actor>) -> Result<()> {
        let txn = self.serializable_txn().await?;

        let Some(row) = Self::paper_in_txn(&txn, paper_id).await? else {
            txn.rollback().await?;
            return Err(AppError::PaperNotFound {
                paper_id: paper_id.to_string(),
            });
        };

        let next = match engagement::next_presenter(&row.presenter, &row.reservation, presenter) {
            Ok(next) => next,
            Err(e) => {
                txn.rollback().await?;
                metrics::record_engagement("presenter", "rejected");
                return Err(e);
            }
        };

        let cleared = next.is_none();
        let mut am: ListingActiveModel = row.into();
        am.presenter = Set(next);
        am.updated_at = Set(chrono::Utc::now().into());
        am.update(&txn).await?;

        txn.commit().await?;

        info!(paper_id, cleared, "Presenter recorded");
        metrics::record_engagement("presenter", if cleared { "cleared" } else { "set" });

        Ok(())
    }

    async fn record_reservation(
        &self,
        paper_id: &str,
        reserver: Option<Actor>,
        reserved_until: Option<NaiveDate>,
    ) -> Result<()> {
        let today = chrono::Utc::now().date_naive();
        let txn = self.serializable_txn().await?;

        let Some(row) = Self::paper_in_txn(&txn, paper_id).await? else {
            txn.rollback().await?;
            return Err(AppError::PaperNotFound {
                paper_id: paper_id.to_string(),
            });
        };

        let next = match engagement::next_reservation(
            &row.reservation,
            &row.presenter,
            reserver,
            reserved_until,
            today,
        ) {
            Ok(next) => next,
            Err(e) => {
                txn.rollback().await?;
                metrics::record_engagement("reservation", "rejected");
                return Err(e);
            }
        };

        let cleared = next.is_none();
        let mut am: ListingActiveModel = row.into();
        am.reservation = Set(next);
        am.updated_at = Set(chrono::Utc::now().into());
        am.update(&txn).await?;

        txn.commit().await?;

        info!(paper_id, cleared, "Reservation recorded");
        metrics::record_engagement("reservation", if cleared { "cleared" } else { "set" });

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

        let conn = self.read_conn();
        let for_date = || {
            ListingEntity::find().filter(ListingColumn::ListingDate.eq(date))
        };

        let local_papers = for_date()
            .filter(ListingColumn::Attribution.is_not_null())
            .filter(ListingColumn::Reservation.is_null())
            .filter(ListingColumn::Presenter.is_null())
            .order_by_desc(ListingColumn::VoteCount)
            .all(conn)
            .await?;

        let papers_with_presenters = for_date()
            .filter(ListingColumn::Presenter.is_not_null())
            .filter(ListingColumn::Attribution.is_null())
            .filter(ListingColumn::Reservation.is_null())
            .order_by_desc(ListingColumn::VoteCount)
            .all(conn)
            .await?;

        let papers_with_votes = for_date()
            .filter(ListingColumn::VoteCount.gt(0))
            .filter(ListingColumn::Presenter.is_null())
            .filter(ListingColumn::Attribution.is_null())
            .filter(ListingColumn::Reservation.is_null())
            .order_by_desc(ListingColumn::VoteCount)
            .all(conn)
            .await?;

        let reserved_papers = for_date()
            .filter(ListingColumn::Reservation.is_not_null())
            .order_by_desc(ListingColumn::VoteCount)
            .all(conn)
            .await?;

        let other_new_papers = for_date()
            .filter(ListingColumn::VoteCount.eq(0))
            .filter(ListingColumn::ArticleKind.eq(ArticleKind::New))
            .filter(ListingColumn::Presenter.is_null())
            .filter(ListingColumn::Attribution.is_null())
            .filter(ListingColumn::Reservation.is_null())
            .order_by_asc(ListingColumn::PositionInBatch)
            .all(conn)
            .await?;

        let cross_listed_papers = for_date()
            .filter(ListingColumn::VoteCount.eq(0))
            .filter(ListingColumn::ArticleKind.eq(ArticleKind::CrossList))
            .filter(ListingColumn::Presenter.is_null())
            .filter(ListingColumn::Attribution.is_null())
            .filter(ListingColumn::Reservation.is_null())
            .order_by_asc(ListingColumn::PositionInBatch)
            .all(conn)
            .await?;

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
        RosterEntity::find()
            .order_by_asc(RosterColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn insert_roster_entry(
        &self,
        name: &str,
        email: &str,
        affiliation: Option<&str>,
        overwrite: bool,
    ) -> Result<UpsertOutcome> {
        let txn = self.serializable_txn().await?;

        let existing = RosterEntity::find()
            .filter(RosterColumn::Name.eq(name))
            .one(&txn)
            .await?;

        match existing {
            None => {
                let am = RosterActiveModel {
                    name: Set(name.to_string()),
                    email: Set(email.to_string()),
                    affiliation: Set(affiliation.map(str::to_string)),
                    ..Default::default()
                };
                am.insert(&txn).await?;
                txn.commit().await?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(_) if !overwrite => {
                txn.rollback().await?;
                warn!(name, "Roster entry already exists, skipping");
                Ok(UpsertOutcome::Skipped)
            }
            Some(row) => {
                let mut am: RosterActiveModel = row.into();
                am.email = Set(email.to_string());
                am.affiliation = Set(affiliation.map(str::to_string));
                am.update(&txn).await?;
                txn.commit().await?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }
}

fn change_label(change: VoteChange) -> &'static str {
    match change {
        VoteChange::Added => "added",
        VoteChange::Removed => "removed",
        VoteChange::NoOp => "noop",
    }
}
