//! Paper listing entity
//!
//! One row per unique external identifier (`paper_id`). The engagement
//! fields (voters, presenter, reservation) and the attribution structure
//! live on the same row and are mutated in place over the paper's lifetime.

use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// External identifier, e.g. an arXiv id. Unique and immutable.
    #[sea_orm(column_type = "Text", unique)]
    pub paper_id: String,

    /// The batch date this paper was ingested under
    pub listing_date: Date,

    /// 1-based serial within the batch date, preserved from source order
    pub position_in_batch: i32,

    pub article_kind: ArticleKind,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub abstract_text: String,

    #[sea_orm(column_type = "Text")]
    pub comments: String,

    #[sea_orm(column_type = "Text")]
    pub primary_link: String,

    #[sea_orm(column_type = "Text")]
    pub pdf_link: String,

    /// Ordered author-name strings; order is semantically significant
    #[sea_orm(column_type = "JsonBinary")]
    pub authors: AuthorList,

    /// Absent until the local-author matcher has run
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub attribution: Option<Attribution>,

    /// Derived; must equal the voter set size at every committed state
    pub vote_count: i32,

    #[sea_orm(column_type = "JsonBinary")]
    pub voters: VoterSet,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub presenter: Option<Actor>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub reservation: Option<Reservation>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

/// Whether the paper arrived on the new list or as a cross-listing
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "article_kind")]
#[serde(rename_all = "snake_case")]
pub enum ArticleKind {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "cross_list")]
    CrossList,
}

/// Ordered list of author-name strings as parsed from the listing
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct AuthorList(pub Vec<String>);

impl AuthorList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Actor identifiers that currently have an up-vote recorded
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct VoterSet(pub BTreeSet<String>);

impl VoterSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, actor_id: &str) -> bool {
        self.0.contains(actor_id)
    }
}

/// An already-authenticated actor, as supplied by the identity collaborator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Actor {
    pub actor_id: String,
    pub display_name: String,
}

/// An active reservation; `reserved_until >= reserved_on` always holds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Reservation {
    pub actor_id: String,
    pub display_name: String,
    pub reserved_on: Date,
    pub reserved_until: Date,
}

/// Local relevance of a paper with at least one matched roster member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// A roster member appears early in the author list
    Primary,
    /// Roster members appear only deep in a large-collaboration author list
    Collab,
}

/// Result of the local-author matching pass over a paper's author list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Attribution {
    pub classification: Classification,

    /// 0-based positions in the author list matched to roster members
    pub local_author_positions: BTreeSet<usize>,

    /// Special-affiliation tags of the matched roster members
    pub special_affiliations: BTreeSet<String>,

    /// True when most matched members carry a special affiliation
    pub mark_other_affiliation: bool,
}

impl Model {
    /// Whether the matcher attributed this paper to the local roster
    pub fn is_local(&self) -> bool {
        self.attribution.is_some()
    }

    pub fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }

    pub fn has_presenter(&self) -> bool {
        self.presenter.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
