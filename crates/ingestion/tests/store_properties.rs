//! End-to-end properties of ingest, attribution, and engagement against the
//! in-memory store.

use chrono::NaiveDate;
use scraper::Html;

use journalclub_common::config::{ListingConfig, MatcherConfig};
use journalclub_common::db::models::{Actor, ArticleKind};
use journalclub_common::db::{MemoryStore, PaperDraft, PaperStore};
use journalclub_common::engagement::{VoteChange, VoteDirection};
use journalclub_common::errors::AppError;
use journalclub_ingestion::{attribute_listing, collect_drafts, ingest, parse_listing};

fn batch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
}

fn actor(id: &str) -> Actor {
    Actor {
        actor_id: id.to_string(),
        display_name: format!("Person {}", id),
    }
}

fn draft(paper_id: &str, position: i32, authors: &[&str]) -> PaperDraft {
    PaperDraft {
        paper_id: paper_id.to_string(),
        title: format!("Paper {}", paper_id),
        authors: authors.iter().map(|s| s.to_string()).collect(),
        abstract_text: "An abstract.".to_string(),
        comments: String::new(),
        primary_link: format!("https://arxiv.org/abs/{}", paper_id),
        pdf_link: format!("https://arxiv.org/pdf/{}", paper_id),
        article_kind: ArticleKind::New,
        position_in_batch: position,
    }
}

async fn seeded_store(drafts: &[PaperDraft]) -> MemoryStore {
    let store = MemoryStore::new();
    let result = ingest(&store, batch_date(), drafts, false).await.unwrap();
    assert_eq!(result.inserted, drafts.len());
    store
}

#[tokio::test]
async fn duplicate_ids_within_a_batch_are_skipped() {
    let store = MemoryStore::new();
    let drafts = vec![
        draft("2408.00001", 1, &["Jane Smith"]),
        draft("2408.00001", 2, &["Jane Smith"]),
        draft("2408.00002", 3, &["John Doe"]),
    ];

    let result = ingest(&store, batch_date(), &drafts, false).await.unwrap();

    assert_eq!(result.inserted, 2);
    assert_eq!(result.skipped, vec!["2408.00001".to_string()]);
    assert_eq!(result.failed, 0);

    let papers = store.papers_for_date(batch_date()).await.unwrap();
    assert_eq!(papers.len(), 2);
}

#[tokio::test]
async fn reingest_preserves_engagement_and_reports_skips() {
    let drafts = vec![
        draft("2408.00001", 1, &["Jane Smith"]),
        draft("2408.00002", 2, &["John Doe"]),
    ];
    let store = seeded_store(&drafts).await;

    store
        .record_vote("2408.00001", "tok-1", VoteDirection::Up)
        .await
        .unwrap();
    store
        .record_presenter("2408.00002", Some(actor("p")))
        .await
        .unwrap();

    let result = ingest(&store, batch_date(), &drafts, false).await.unwrap();
    assert_eq!(result.inserted, 0);
    assert_eq!(result.skipped.len(), 2);

    let voted = store.find_paper("2408.00001").await.unwrap().unwrap();
    assert_eq!(voted.vote_count, 1);
    assert!(voted.voters.contains("tok-1"));

    let presented = store.find_paper("2408.00002").await.unwrap().unwrap();
    assert!(presented.has_presenter());
}

#[tokio::test]
async fn overwrite_replaces_fields_but_keeps_votes() {
    let store = seeded_store(&[draft("2408.00001", 1, &["Jane Smith"])]).await;
    store
        .record_vote("2408.00001", "tok-1", VoteDirection::Up)
        .await
        .unwrap();

    let mut updated = draft("2408.00001", 4, &["Jane Smith", "New Coauthor"]);
    updated.title = "Revised Title".to_string();

    let result = ingest(&store, batch_date(), &[updated], true).await.unwrap();
    assert_eq!(result.updated, 1);

    let paper = store.find_paper("2408.00001").await.unwrap().unwrap();
    assert_eq!(paper.title, "Revised Title");
    assert_eq!(paper.position_in_batch, 4);
    assert_eq!(paper.authors.len(), 2);
    assert_eq!(paper.vote_count, 1);
    assert!(paper.voters.contains("tok-1"));
}

#[tokio::test]
async fn vote_count_always_matches_voter_set() {
    let store = seeded_store(&[draft("2408.00001", 1, &["Jane Smith"])]).await;

    let ops = [
        ("tok-1", VoteDirection::Up),
        ("tok-2", VoteDirection::Up),
        ("tok-1", VoteDirection::Up),
        ("tok-3", VoteDirection::Down),
        ("tok-2", VoteDirection::Down),
    ];

    for (actor_id, direction) in ops {
        store
            .record_vote("2408.00001", actor_id, direction)
            .await
            .unwrap();
        let paper = store.find_paper("2408.00001").await.unwrap().unwrap();
        assert_eq!(paper.vote_count as usize, paper.voters.len());
    }

    let paper = store.find_paper("2408.00001").await.unwrap().unwrap();
    assert_eq!(paper.vote_count, 1);
    assert!(paper.voters.contains("tok-1"));
}

#[tokio::test]
async fn double_upvote_is_a_noop_success() {
    let store = seeded_store(&[draft("2408.00001", 1, &["Jane Smith"])]).await;

    let first = store
        .record_vote("2408.00001", "tok-1", VoteDirection::Up)
        .await
        .unwrap();
    let second = store
        .record_vote("2408.00001", "tok-1", VoteDirection::Up)
        .await
        .unwrap();

    assert_eq!(first, VoteChange::Added);
    assert_eq!(second, VoteChange::NoOp);

    let paper = store.find_paper("2408.00001").await.unwrap().unwrap();
    assert_eq!(paper.vote_count, 1);
}

#[tokio::test]
async fn downvote_without_upvote_changes_nothing() {
    let store = seeded_store(&[draft("2408.00001", 1, &["Jane Smith"])]).await;

    let change = store
        .record_vote("2408.00001", "tok-1", VoteDirection::Down)
        .await
        .unwrap();
    assert_eq!(change, VoteChange::NoOp);

    let paper = store.find_paper("2408.00001").await.unwrap().unwrap();
    assert_eq!(paper.vote_count, 0);
    assert!(paper.voters.is_empty());
}

#[tokio::test]
async fn presenter_and_reservation_are_mutually_exclusive() {
    let store = seeded_store(&[draft("2408.00001", 1, &["Jane Smith"])]).await;
    let until = chrono::Utc::now().date_naive();

    store
        .record_presenter("2408.00001", Some(actor("p")))
        .await
        .unwrap();

    let err = store
        .record_reservation("2408.00001", Some(actor("r")), Some(until))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));

    // clearing the presenter frees the paper for a reservation
    store.record_presenter("2408.00001", None).await.unwrap();
    store
        .record_reservation("2408.00001", Some(actor("r")), Some(until))
        .await
        .unwrap();

    let err = store
        .record_presenter("2408.00001", Some(actor("p")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));

    let paper = store.find_paper("2408.00001").await.unwrap().unwrap();
    assert!(paper.is_reserved() && !paper.has_presenter());
}

#[tokio::test]
async fn past_reservation_expiry_is_rejected_without_side_effects() {
    let store = seeded_store(&[draft("2408.00001", 1, &["Jane Smith"])]).await;
    let yesterday = chrono::Utc::now().date_naive().pred_opt().unwrap();

    let err = store
        .record_reservation("2408.00001", Some(actor("r")), Some(yesterday))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let paper = store.find_paper("2408.00001").await.unwrap().unwrap();
    assert!(!paper.is_reserved());
}

#[tokio::test]
async fn operations_on_unknown_papers_are_not_found() {
    let store = MemoryStore::new();

    let err = store
        .record_vote("2408.99999", "tok-1", VoteDirection::Up)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaperNotFound { .. }));

    let err = store.record_presenter("2408.99999", None).await.unwrap_err();
    assert!(matches!(err, AppError::PaperNotFound { .. }));

    let err = store
        .record_reservation("2408.99999", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaperNotFound { .. }));
}

#[tokio::test]
async fn parsed_listing_flows_into_grouped_output() {
    let html = r#"<html><body>
        <dl>
          <dt>
            <a name="item1">[1]</a>
            <a href="/abs/2408.00001" title="Abstract">arXiv:2408.00001</a>
            <a href="/pdf/2408.00001" title="Download PDF">[pdf]</a>
          </dt>
          <dd><div class="meta">
            <div class="list-title"><span class="descriptor">Title:</span> A Local Paper</div>
            <div class="list-authors"><span class="descriptor">Authors:</span> Jane Smith, Alice Wonder</div>
            <p class="mathjax">An abstract.</p>
          </div></dd>
          <dt>
            <a name="item2">[2]</a>
            <a href="/abs/2408.00002" title="Abstract">arXiv:2408.00002</a>
            <a href="/pdf/2408.00002" title="Download PDF">[pdf]</a>
          </dt>
          <dd><div class="meta">
            <div class="list-title"><span class="descriptor">Title:</span> An Unrelated Paper</div>
            <div class="list-authors"><span class="descriptor">Authors:</span> Bob Builder</div>
            <p class="mathjax">Another abstract.</p>
          </div></dd>
        </dl>
        <dl>
          <dt>
            <a name="item3">[3]</a>
            <a href="/abs/2408.00003" title="Abstract">arXiv:2408.00003</a> (cross-list from hep-ex) [<a href="/pdf/2408.00003">pdf</a>, other]
          </dt>
          <dd><div class="meta">
            <div class="list-title"><span class="descriptor">Title:</span> A Crossed Paper</div>
            <div class="list-authors"><span class="descriptor">Authors:</span> C. Writer</div>
            <p class="mathjax">Crossed abstract.</p>
          </div></dd>
        </dl>
        <dl></dl>
    </body></html>"#;

    let listing_config = ListingConfig::default();
    let parsed = parse_listing(&Html::parse_document(html), &listing_config);
    assert_eq!(parsed.new_papers.len(), 2);
    assert_eq!(parsed.cross_lists.len(), 1);

    let drafts = collect_drafts(&parsed, &listing_config);
    assert!(drafts
        .iter()
        .all(|d| d.primary_link.starts_with("https://arxiv.org/abs/")));

    let store = MemoryStore::new();
    ingest(&store, batch_date(), &drafts, false).await.unwrap();

    store
        .insert_roster_entry("Jane A. Smith", "jane@example.edu", None, false)
        .await
        .unwrap();

    let attributed = attribute_listing(&store, batch_date(), &MatcherConfig::default())
        .await
        .unwrap();
    assert_eq!(attributed, 1);

    store
        .record_vote("arXiv:2408.00002", "tok-1", VoteDirection::Up)
        .await
        .unwrap();

    let listing = store.get_listing(None).await.unwrap();
    assert_eq!(listing.listing_date, Some(batch_date()));
    assert_eq!(listing.local_papers.len(), 1);
    assert_eq!(listing.local_papers[0].paper_id, "arXiv:2408.00001");
    assert_eq!(listing.papers_with_votes.len(), 1);
    assert_eq!(listing.cross_listed_papers.len(), 1);
    assert!(listing.other_new_papers.is_empty());
    assert!(listing.reserved_papers.is_empty());
}
