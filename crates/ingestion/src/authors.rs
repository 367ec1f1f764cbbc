//! Author-name normalization and local-author matching
//!
//! Turns free-text author strings into comparison keys and matches them
//! against the roster with a two-stage fuzzy check. The first stage compares
//! first-initial + last-name keys under a strict threshold; the second
//! compares full-name keys under a looser one. Both must accept a position,
//! which is what keeps common surnames from producing false positives.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::debug;

use journalclub_common::config::MatcherConfig;
use journalclub_common::db::models::{Attribution, Classification, RosterEntry};

// Affiliation patterns, applied in order. Together they turn
// "author1 (1, 2 & 3), author2 (1 and 3), ((1) inst1, (2) inst2, (3) inst3)"
// into "author1, author2".
fn affil_enumeration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([0-9, &and]+\)").unwrap())
}

fn affil_parenthetical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^)]*\)").unwrap())
}

fn affil_dangling_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\w+|\s+\)").unwrap())
}

/// Collapse internal whitespace runs to single spaces
pub(crate) fn squeeze(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a raw author string into individual names, dropping affiliations.
///
/// Handles the usual listing shapes: `author (affil, ...)`,
/// `author (1) ... ((1) affil, ...)`, `author (1, 2) ...`,
/// `author (1 & 2) ...`, and `author (1 and 2) ...`.
pub fn strip_affiliations(author_str: &str) -> Vec<String> {
    let initial = author_str.replacen("Authors:", "", 1).replace('\n', " ");
    let prelim = affil_enumeration_re().replace_all(&initial, ",");
    let intermed = affil_parenthetical_re().replace_all(&prelim, ",");
    let cleaned = affil_dangling_re().replace_all(&intermed, ",");

    cleaned
        .split(',')
        .map(|name| squeeze(name.trim()))
        .filter(|name| name.len() > 1)
        .collect()
}

/// Normalized comparison keys for one person's name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameKeys {
    /// All name tokens joined with no separator
    pub full_name_key: String,
    /// First character of the first token plus the last token
    pub first_initial_last_name_key: String,
}

/// Canonicalize a raw name into both comparison keys.
///
/// Pure and deterministic: two spellings that differ only in case,
/// punctuation, or internal spacing normalize identically.
pub fn normalize_name(raw: &str) -> NameKeys {
    let lowered = raw.to_lowercase().replacen("authors:", "", 1);
    let depunctuated = lowered.replace('.', "");
    let tokens: Vec<&str> = depunctuated.split_whitespace().collect();

    let full_name_key = tokens.concat();
    let first_initial_last_name_key = match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => {
            let mut key = String::new();
            key.extend(first.chars().take(1));
            key.push_str(last);
            key
        }
        _ => String::new(),
    };

    NameKeys {
        full_name_key,
        first_initial_last_name_key,
    }
}

/// Keys for a paper-side author string, with any parenthesized affiliation
/// markers the splitter left behind removed first
fn author_keys(raw: &str) -> NameKeys {
    let stripped = affil_parenthetical_re().replace_all(raw, " ");
    normalize_name(&stripped)
}

/// A roster entry with its derived comparison keys
#[derive(Debug, Clone)]
pub struct RosterMember {
    pub name: String,
    pub affiliation: Option<String>,
    pub keys: NameKeys,
}

impl RosterMember {
    pub fn from_entry(entry: &RosterEntry) -> Self {
        Self {
            name: entry.name.clone(),
            affiliation: entry.affiliation.clone(),
            keys: normalize_name(&entry.name),
        }
    }
}

/// Normalized full-string similarity on a 0-100 scale.
///
/// Any metric of this family is substitutable; the matcher thresholds are
/// calibrated against normalized similarity, not raw edit distance.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Match a paper's ordered author list against the roster.
///
/// Returns `None` when no position passes both stages; the paper is then
/// not locally attributed.
pub fn match_local_authors(
    roster: &[RosterMember],
    authors: &[String],
    config: &MatcherConfig,
) -> Option<Attribution> {
    if roster.is_empty() || authors.is_empty() {
        return None;
    }

    let mut local_author_positions = BTreeSet::new();
    let mut special_affiliations = BTreeSet::new();

    for (position, author) in authors.iter().enumerate() {
        let keys = author_keys(author);
        if keys.full_name_key.is_empty() {
            continue;
        }

        // Stage A: strict first-initial + last-name gate
        let best_initial = roster
            .iter()
            .map(|m| {
                similarity(
                    &keys.first_initial_last_name_key,
                    &m.keys.first_initial_last_name_key,
                )
            })
            .fold(0.0_f64, f64::max);

        if best_initial < config.firstname_threshold {
            continue;
        }

        // Stage B: looser full-name confirmation, identifying the member
        let mut best_member: Option<(&RosterMember, f64)> = None;
        for member in roster {
            let score = similarity(&keys.full_name_key, &member.keys.full_name_key);
            if best_member.map_or(true, |(_, best)| score > best) {
                best_member = Some((member, score));
            }
        }

        let Some((member, score)) = best_member else {
            continue;
        };
        if score < config.fullname_threshold {
            continue;
        }

        debug!(
            author = %author,
            member = %member.name,
            initial_score = best_initial,
            full_score = score,
            "Matched local author"
        );

        local_author_positions.insert(position);
        if let Some(affiliation) = &member.affiliation {
            if !affiliation.is_empty() {
                special_affiliations.insert(affiliation.clone());
            }
        }
    }

    if local_author_positions.is_empty() {
        return None;
    }

    let classification = if local_author_positions
        .iter()
        .any(|&p| p < config.primary_position_cutoff)
    {
        Classification::Primary
    } else {
        // a local person this deep in a large-collaboration author list is
        // unlikely to be the one presenting
        Classification::Collab
    };

    let mark_other_affiliation = special_affiliations.len() as f64
        / local_author_positions.len() as f64
        > config.affiliation_majority;

    Some(Attribution {
        classification,
        local_author_positions,
        special_affiliations,
        mark_other_affiliation,
    })
}
