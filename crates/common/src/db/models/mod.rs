//! SeaORM entity models

mod listing;
mod roster;

pub use listing::{
    Entity as ListingEntity,
    Model as PaperRecord,
    ActiveModel as ListingActiveModel,
    Column as ListingColumn,
    Actor,
    ArticleKind,
    Attribution,
    AuthorList,
    Classification,
    Reservation,
    VoterSet,
};

pub use roster::{
    Entity as RosterEntity,
    Model as RosterEntry,
    ActiveModel as RosterActiveModel,
    Column as RosterColumn,
};
