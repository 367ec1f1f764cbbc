//! Engagement state transitions
//!
//! Pure decision logic for voting, presenting, and reserving. Each function
//! takes the currently committed field values and returns the values to
//! commit, or the conflict/validation error that rejects the request. The
//! storage implementations wrap these in a per-paper transaction and commit
//! exactly what is returned; shared state is never mutated in place.
//!
//! The meaningful composite states are Unengaged, Voted, Reserved, and
//! Presented. Reserved and Presented are mutually exclusive; Voted is
//! orthogonal to both.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::models::{Actor, Reservation, VoterSet};
use crate::errors::{AppError, Result};

/// Direction of a vote request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

impl FromStr for VoteDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            other => Err(AppError::Validation {
                message: format!("unrecognized vote direction: {}", other),
                field: Some("direction".into()),
            }),
        }
    }
}

/// What a vote request did to the voter set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChange {
    Added,
    Removed,
    /// The request was redundant; reported as success with no change
    NoOp,
}

/// Apply a vote to the current voter set.
///
/// Up-votes are idempotent: an actor already in the set is a no-op. A
/// down-vote only removes the actor's own prior up-vote; a down-vote from
/// an actor who never voted is a no-op.
pub fn apply_vote(
    voters: &VoterSet,
    actor_id: &str,
    direction: VoteDirection,
) -> (VoterSet, VoteChange) {
    let mut next = voters.clone();

    let change = match direction {
        VoteDirection::Up => {
            if next.0.insert(actor_id.to_string()) {
                VoteChange::Added
            } else {
                VoteChange::NoOp
            }
        }
        VoteDirection::Down => {
            if next.0.remove(actor_id) {
                VoteChange::Removed
            } else {
                VoteChange::NoOp
            }
        }
    };

    (next, change)
}

/// Decide the next presenter value.
///
/// At most one presenter per paper; a reserved paper cannot take a
/// presenter. Clearing always succeeds when no reservation is active, and
/// re-setting the same presenter is an idempotent no-op.
pub fn next_presenter(
    current: &Option<Actor>,
    reservation: &Option<Reservation>,
    requested: Option<Actor>,
) -> Result<Option<Actor>> {
    if reservation.is_some() {
        return Err(AppError::Conflict {
            message: "paper is reserved for a future meeting".into(),
        });
    }

    match (current, requested) {
        (_, None) => Ok(None),
        (Some(existing), Some(incoming)) if existing.actor_id != incoming.actor_id => {
            Err(AppError::Conflict {
                message: "paper already has a presenter".into(),
            })
        }
        (_, Some(incoming)) => Ok(Some(incoming)),
    }
}

/// Decide the next reservation value.
///
/// Only one reservation per paper, by any actor; a paper with an active
/// presenter cannot be reserved. Setting requires an expiry date no earlier
/// than `today`. Clearing always succeeds when no presenter is active.
pub fn next_reservation(
    current: &Option<Reservation>,
    presenter: &Option<Actor>,
    requested: Option<Actor>,
    reserved_until: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<Option<Reservation>> {
    if let Some(reserver) = &requested {
        let until = reserved_until.ok_or_else(|| AppError::MissingField {
            field: "reserved_until".into(),
        })?;

        if until < today {
            return Err(AppError::Validation {
                message: format!("reservation expiry {} is in the past", until),
                field: Some("reserved_until".into()),
            });
        }

        if presenter.is_some() {
            return Err(AppError::Conflict {
                message: "paper has an active presenter".into(),
            });
        }

        if current.is_some() {
            return Err(AppError::Conflict {
                message: "paper is already reserved".into(),
            });
        }

        Ok(Some(Reservation {
            actor_id: reserver.actor_id.clone(),
            display_name: reserver.display_name.clone(),
            reserved_on: today,
            reserved_until: until,
        }))
    } else {
        if presenter.is_some() {
            return Err(AppError::Conflict {
                message: "paper has an active presenter".into(),
            });
        }

        Ok(None)
    }
}
