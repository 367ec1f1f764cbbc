//! Listing parser
//!
//! Turns an already-parsed listing document into ordered new-paper and
//! cross-listed-paper drafts. The document fetch itself is a collaborator
//! concern; this module never performs network I/O.
//!
//! Parsing is tolerant by design: a malformed entry is skipped and counted,
//! a missing optional field becomes an empty string, and a document with an
//! unexpected section structure degrades to its first section. Only the
//! batch as a whole is meaningful, never one entry.

use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use tracing::warn;

use journalclub_common::config::ListingConfig;
use journalclub_common::db::models::ArticleKind;
use journalclub_common::db::PaperDraft;
use journalclub_common::errors::{AppError, Result};

use crate::authors::{squeeze, strip_affiliations};

/// Result of parsing one listing document
#[derive(Debug, Clone, Default)]
pub struct ParsedListing {
    /// New papers, in source order
    pub new_papers: Vec<PaperDraft>,
    /// Cross-listed papers, in source order
    pub cross_lists: Vec<PaperDraft>,
    /// Hash over the leading new-paper ids; `None` for an empty batch.
    /// Lets a caller detect an unchanged re-fetch without comparing fields.
    pub fingerprint: Option<String>,
    /// Entries dropped as unparseable
    pub skipped_entries: usize,
}

impl ParsedListing {
    /// Whether the document produced no papers at all (empty-batch condition)
    pub fn is_empty(&self) -> bool {
        self.new_papers.is_empty() && self.cross_lists.is_empty()
    }
}

struct Selectors {
    section: Selector,
    entry_links: Selector,
    entry_meta: Selector,
    title: Selector,
    authors: Selector,
    comments: Selector,
    abstract_text: Selector,
    anchor: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            section: Selector::parse("dl").unwrap(),
            entry_links: Selector::parse("dt").unwrap(),
            entry_meta: Selector::parse("div.meta").unwrap(),
            title: Selector::parse("div.list-title").unwrap(),
            authors: Selector::parse("div.list-authors").unwrap(),
            comments: Selector::parse("div.list-comments").unwrap(),
            abstract_text: Selector::parse("p").unwrap(),
            anchor: Selector::parse("a").unwrap(),
        }
    }
}

/// Parse a listing document into new-paper and cross-list drafts.
///
/// The expected structure is three sections (new, cross-lists,
/// replacements); replacements are discarded. Any other section count falls
/// back to treating the first section as the new list, which is the only
/// part guaranteed to be present.
pub fn parse_listing(document: &Html, config: &ListingConfig) -> ParsedListing {
    let selectors = Selectors::new();

    let sections: Vec<ElementRef> = document.select(&selectors.section).collect();

    let (new_section, cross_section) = match sections.len() {
        0 => {
            warn!("Listing document has no sections, reporting an empty batch");
            return ParsedListing::default();
        }
        3 => (sections[0], Some(sections[1])),
        n => {
            if n != 1 {
                warn!(sections = n, "Unexpected section structure, keeping only the first");
            }
            (sections[0], None)
        }
    };

    let mut listing = ParsedListing::default();

    parse_section(
        new_section,
        ArticleKind::New,
        &selectors,
        config,
        &mut listing.new_papers,
        &mut listing.skipped_entries,
    );

    if let Some(cross_section) = cross_section {
        parse_section(
            cross_section,
            ArticleKind::CrossList,
            &selectors,
            config,
            &mut listing.cross_lists,
            &mut listing.skipped_entries,
        );
    }

    listing.fingerprint = fingerprint(&listing.new_papers, config.fingerprint_width);

    listing
}

fn parse_section(
    section: ElementRef,
    kind: ArticleKind,
    selectors: &Selectors,
    config: &ListingConfig,
    drafts: &mut Vec<PaperDraft>,
    skipped: &mut usize,
) {
    let links: Vec<ElementRef> = section.select(&selectors.entry_links).collect();
    let metas: Vec<ElementRef> = section.select(&selectors.entry_meta).collect();

    for (index, (link, meta)) in links.iter().zip(metas.iter()).enumerate() {
        match parse_entry(*link, *meta, kind, index as i32 + 1, selectors, config) {
            Ok(draft) => drafts.push(draft),
            Err(e) => {
                warn!(position = index + 1, error = %e, "Skipping malformed listing entry");
                *skipped += 1;
            }
        }
    }
}

fn parse_entry(
    link: ElementRef,
    meta: ElementRef,
    kind: ArticleKind,
    position_in_batch: i32,
    selectors: &Selectors,
    config: &ListingConfig,
) -> Result<PaperDraft> {
    let title_el = meta
        .select(&selectors.title)
        .next()
        .ok_or_else(|| malformed("entry has no title block"))?;
    let mut title = strip_label(&element_text(title_el), "Title:");

    let authors_el = meta
        .select(&selectors.authors)
        .next()
        .ok_or_else(|| malformed("entry has no author block"))?;
    let authors = strip_affiliations(&strip_label(&element_text(authors_el), "Authors:"));

    // the first anchor is the entry's index marker; the next two carry the
    // abstract-page link (with the external id as text) and the PDF link
    let anchors: Vec<ElementRef> = link.select(&selectors.anchor).collect();
    let abs_anchor = anchors
        .get(1)
        .ok_or_else(|| malformed("entry has no abstract link"))?;
    let pdf_anchor = anchors
        .get(2)
        .ok_or_else(|| malformed("entry has no pdf link"))?;

    let primary_link = anchor_href(*abs_anchor)?;
    let pdf_link = anchor_href(*pdf_anchor)?;
    let paper_id = squeeze(&element_text(*abs_anchor));
    if paper_id.is_empty() {
        return Err(malformed("entry has an empty external id"));
    }

    let abstract_text = meta
        .select(&selectors.abstract_text)
        .next()
        .map(|p| squeeze(&element_text(p)))
        .unwrap_or_default();

    let comments = meta
        .select(&selectors.comments)
        .next()
        .map(|div| comment_text(div, config))
        .unwrap_or_default();

    if kind == ArticleKind::CrossList {
        title = annotate_cross_list(&element_text(link), &title);
    }

    Ok(PaperDraft {
        paper_id,
        title,
        authors,
        abstract_text,
        comments,
        primary_link,
        pdf_link,
        article_kind: kind,
        position_in_batch,
    })
}

fn malformed(message: &str) -> AppError {
    AppError::MalformedEntry {
        message: message.to_string(),
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>()
}

fn anchor_href(anchor: ElementRef) -> Result<String> {
    anchor
        .value()
        .attr("href")
        .map(str::to_string)
        .ok_or_else(|| malformed("entry link has no href"))
}

fn strip_label(text: &str, label: &str) -> String {
    squeeze(&text.replacen(label, "", 1))
}

/// Comment markup with the descriptor label dropped and internal relative
/// `/abs/...` links rewritten to absolute ones
fn comment_text(div: ElementRef, config: &ListingConfig) -> String {
    let html = div.inner_html();
    let html = match html.split_once("</span>") {
        Some((head, tail)) if head.contains("Comments:") => tail.to_string(),
        _ => html,
    };

    let comments = squeeze(html.replace('\n', " ").trim());

    if comments.contains("href=\"/abs") {
        comments.replace("href=\"/abs", &format!("href=\"{}/abs", config.base_url))
    } else {
        comments
    }
}

/// Prefix a cross-listed title with its originating category.
///
/// The category sits in the entry's raw text between the `cross-list`
/// marker and the `[pdf` link block. Absence of either marker is expected,
/// not exceptional; the generic prefix is used instead.
fn annotate_cross_list(link_text: &str, title: &str) -> String {
    let category = link_text.find("cross-list").and_then(|start| {
        let end = link_text.find("[pdf")?;
        link_text.get(start..end.checked_sub(2)?)
    });

    match category {
        Some(category) => format!("[{}] {}", category.trim(), title),
        None => format!("[cross-list] {}", title),
    }
}

fn fingerprint(new_papers: &[PaperDraft], width: usize) -> Option<String> {
    if new_papers.is_empty() {
        return None;
    }

    let leading_ids = new_papers
        .iter()
        .take(width)
        .map(|p| p.paper_id.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let mut hasher = Sha256::new();
    hasher.update(leading_ids.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, title: &str, authors: &str, extra_meta: &str) -> String {
        format!(
            r#"<dt>
                 <a name="item">[1]</a>
                 <a href="/abs/{id}" title="Abstract">arXiv:{id}</a>
                 <a href="/pdf/{id}" title="Download PDF">[pdf]</a>
               </dt>
               <dd><div class="meta">
                 <div class="list-title"><span class="descriptor">Title:</span> {title}</div>
                 <div class="list-authors"><span class="descriptor">Authors:</span> {authors}</div>
                 {extra_meta}
                 <p class="mathjax">An abstract about {title}.</p>
               </div></dd>"#
        )
    }

    fn cross_entry(id: &str, title: &str, category: &str) -> String {
        format!(
            r#"<dt>
                 <a name="item">[4]</a>
                 <a href="/abs/{id}" title="Abstract">arXiv:{id}</a> (cross-list from {category}) [<a href="/pdf/{id}" title="Download PDF">pdf</a>, other]
               </dt>
               <dd><div class="meta">
                 <div class="list-title"><span class="descriptor">Title:</span> {title}</div>
                 <div class="list-authors"><span class="descriptor">Authors:</span> C. Writer</div>
                 <p class="mathjax">A cross-listed abstract.</p>
               </div></dd>"#
        )
    }

    fn three_section_doc() -> Html {
        let comments = r#"<div class="list-comments"><span class="descriptor">Comments:</span>
            12 pages, companion to <a href="/abs/2408.00002">this paper</a></div>"#;
        let html = format!(
            "<html><body>\
             <dl>{}{}</dl>\
             <dl>{}</dl>\
             <dl>{}</dl>\
             </body></html>",
            entry("2408.00001", "First Result", "Jane Smith, John Doe", comments),
            entry("2408.00002", "Second Result", "A. Person (1), B. Other (2), ((1) X, (2) Y)", ""),
            cross_entry("2408.00003", "Crossed Result", "hep-ex"),
            entry("2408.00004", "Replaced Result", "D. Replacer", ""),
        );
        Html::parse_document(&html)
    }

    #[test]
    fn test_parse_three_sections() {
        let listing = parse_listing(&three_section_doc(), &ListingConfig::default());

        assert_eq!(listing.new_papers.len(), 2);
        assert_eq!(listing.cross_lists.len(), 1);
        assert_eq!(listing.skipped_entries, 0);

        let first = &listing.new_papers[0];
        assert_eq!(first.paper_id, "arXiv:2408.00001");
        assert_eq!(first.title, "First Result");
        assert_eq!(first.authors, vec!["Jane Smith", "John Doe"]);
        assert_eq!(first.primary_link, "/abs/2408.00001");
        assert_eq!(first.pdf_link, "/pdf/2408.00001");
        assert_eq!(first.position_in_batch, 1);
        assert_eq!(first.article_kind, ArticleKind::New);
        assert!(first.abstract_text.starts_with("An abstract"));

        // replacements section is discarded
        assert!(listing
            .new_papers
            .iter()
            .all(|p| p.paper_id != "arXiv:2408.00004"));
    }

    #[test]
    fn test_affiliations_stripped_from_authors() {
        let listing = parse_listing(&three_section_doc(), &ListingConfig::default());
        assert_eq!(listing.new_papers[1].authors, vec!["A. Person", "B. Other"]);
    }

    #[test]
    fn test_comment_links_rewritten() {
        let listing = parse_listing(&three_section_doc(), &ListingConfig::default());
        let comments = &listing.new_papers[0].comments;
        assert!(comments.starts_with("12 pages"));
        assert!(comments.contains("href=\"https://arxiv.org/abs/2408.00002\""));
        assert!(!comments.contains("href=\"/abs"));
    }

    #[test]
    fn test_missing_comments_default_to_empty() {
        let listing = parse_listing(&three_section_doc(), &ListingConfig::default());
        assert_eq!(listing.new_papers[1].comments, "");
    }

    #[test]
    fn test_cross_list_title_annotated_with_category() {
        let listing = parse_listing(&three_section_doc(), &ListingConfig::default());
        let cross = &listing.cross_lists[0];
        assert_eq!(cross.article_kind, ArticleKind::CrossList);
        assert_eq!(cross.title, "[cross-list from hep-ex] Crossed Result");
    }

    #[test]
    fn test_cross_list_without_marker_gets_generic_annotation() {
        let html = format!(
            "<html><body><dl>{}</dl><dl>{}</dl><dl></dl></body></html>",
            entry("2408.00001", "First Result", "Jane Smith", ""),
            entry("2408.00005", "Unmarked Cross", "E. Writer", ""),
        );
        let listing = parse_listing(&Html::parse_document(&html), &ListingConfig::default());
        assert_eq!(listing.cross_lists[0].title, "[cross-list] Unmarked Cross");
    }

    #[test]
    fn test_two_section_doc_falls_back_to_new_only() {
        let html = format!(
            "<html><body><dl>{}</dl><dl>{}</dl></body></html>",
            entry("2408.00001", "First Result", "Jane Smith", ""),
            cross_entry("2408.00003", "Crossed Result", "hep-ex"),
        );
        let listing = parse_listing(&Html::parse_document(&html), &ListingConfig::default());

        assert_eq!(listing.new_papers.len(), 1);
        assert!(listing.cross_lists.is_empty());
    }

    #[test]
    fn test_malformed_entry_skipped_batch_continues() {
        let broken = r#"<dt><a name="item">[2]</a></dt>
            <dd><div class="meta">
              <div class="list-title">Title: Broken</div>
              <div class="list-authors">Authors: N. Obody</div>
            </div></dd>"#;
        let html = format!(
            "<html><body><dl>{}{}</dl></body></html>",
            entry("2408.00001", "First Result", "Jane Smith", ""),
            broken,
        );
        let listing = parse_listing(&Html::parse_document(&html), &ListingConfig::default());

        assert_eq!(listing.new_papers.len(), 1);
        assert_eq!(listing.skipped_entries, 1);
    }

    #[test]
    fn test_empty_document_is_empty_batch() {
        let listing = parse_listing(
            &Html::parse_document("<html><body></body></html>"),
            &ListingConfig::default(),
        );
        assert!(listing.is_empty());
        assert!(listing.fingerprint.is_none());
    }

    #[test]
    fn test_fingerprint_tracks_leading_ids() {
        let config = ListingConfig::default();
        let a = parse_listing(&three_section_doc(), &config);
        let b = parse_listing(&three_section_doc(), &config);
        assert_eq!(a.fingerprint, b.fingerprint);
        assert!(a.fingerprint.is_some());

        let html = format!(
            "<html><body><dl>{}</dl></body></html>",
            entry("2408.09999", "Different", "Jane Smith", ""),
        );
        let c = parse_listing(&Html::parse_document(&html), &config);
        assert_ne!(a.fingerprint, c.fingerprint);
    }
}
