//! Batch ingest and attribution
//!
//! Persists a parsed listing draft-by-draft and runs the local-author
//! matcher over a day's papers. Each draft is one store transaction; a
//! failing draft is logged and counted, never allowed to abort the batch.

use chrono::NaiveDate;
use tracing::{error, info, warn};

use journalclub_common::config::{ListingConfig, MatcherConfig};
use journalclub_common::db::models::Classification;
use journalclub_common::db::{IngestResult, PaperDraft, PaperStore, UpsertOutcome};
use journalclub_common::errors::Result;
use journalclub_common::metrics;

use crate::authors::{match_local_authors, RosterMember};
use crate::parser::ParsedListing;

/// Flatten a parsed listing into drafts ready for persistence, resolving
/// relative links against the configured base URL
pub fn collect_drafts(parsed: &ParsedListing, config: &ListingConfig) -> Vec<PaperDraft> {
    metrics::record_malformed_entries(parsed.skipped_entries);

    parsed
        .new_papers
        .iter()
        .chain(parsed.cross_lists.iter())
        .map(|draft| absolutize(draft, config))
        .collect()
}

fn absolutize(draft: &PaperDraft, config: &ListingConfig) -> PaperDraft {
    let resolve = |link: &str| {
        if link.starts_with('/') {
            format!("{}{}", config.base_url, link)
        } else {
            link.to_string()
        }
    };

    PaperDraft {
        primary_link: resolve(&draft.primary_link),
        pdf_link: resolve(&draft.pdf_link),
        ..draft.clone()
    }
}

/// Ingest a batch of drafts under one listing date.
///
/// Duplicate `paper_id`s are skipped (or updated when `overwrite` is set)
/// and reported in the result; a draft whose transaction fails is rolled
/// back individually and the batch continues.
pub async fn ingest<S>(
    store: &S,
    listing_date: NaiveDate,
    drafts: &[PaperDraft],
    overwrite: bool,
) -> Result<IngestResult>
where
    S: PaperStore + ?Sized,
{
    info!(%listing_date, drafts = drafts.len(), overwrite, "Ingesting listing batch");

    let timer = metrics::IngestMetrics::start("listing");
    let mut result = IngestResult::new(listing_date);

    for draft in drafts {
        match store.upsert_paper(listing_date, draft, overwrite).await {
            Ok(UpsertOutcome::Inserted) => result.inserted += 1,
            Ok(UpsertOutcome::Updated) => result.updated += 1,
            Ok(UpsertOutcome::Skipped) => result.skipped.push(draft.paper_id.clone()),
            Err(e) => {
                error!(paper_id = %draft.paper_id, error = %e, "Draft upsert failed, continuing");
                result.failed += 1;
            }
        }
    }

    timer.finish(result.ingested(), result.skipped.len());

    info!(
        %listing_date,
        inserted = result.inserted,
        updated = result.updated,
        skipped = result.skipped.len(),
        failed = result.failed,
        "Listing batch ingested"
    );

    Ok(result)
}

/// Run the local-author matcher over every paper of a listing date and
/// persist the resulting attributions. Returns the number of papers
/// attributed.
pub async fn attribute_listing<S>(
    store: &S,
    listing_date: NaiveDate,
    config: &MatcherConfig,
) -> Result<usize>
where
    S: PaperStore + ?Sized,
{
    let roster = store.load_roster().await?;
    if roster.is_empty() {
        warn!("No roster entries defined, skipping attribution");
        return Ok(0);
    }

    let members: Vec<RosterMember> = roster.iter().map(RosterMember::from_entry).collect();
    let papers = store.papers_for_date(listing_date).await?;

    let mut attributed = 0;
    for paper in &papers {
        let Some(attribution) = match_local_authors(&members, &paper.authors.0, config) else {
            continue;
        };

        info!(
            paper_id = %paper.paper_id,
            positions = attribution.local_author_positions.len(),
            classification = ?attribution.classification,
            "Attributed paper to local roster"
        );
        metrics::record_local_paper(match attribution.classification {
            Classification::Primary => "primary",
            Classification::Collab => "collab",
        });

        store
            .apply_attribution(&paper.paper_id, Some(attribution))
            .await?;
        attributed += 1;
    }

    info!(%listing_date, attributed, total = papers.len(), "Attribution pass complete");

    Ok(attributed)
}
