//! Pure record extraction: raw articles in, dataset rows out.
//!
//! Everything in this module is side-effect free. HTML stripping, text
//! assembly, and the per-dataset extraction rules live here so they can be
//! tested with literal fixtures and reused by both dataset strategies.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

use crate::ledger::Ledger;
use crate::models::{Article, ContentBlock, ImageCaptionRecord, SummaryRecord};

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip HTML markup down to plain text.
///
/// Text nodes are trimmed, inner whitespace runs are collapsed to single
/// spaces, and the non-empty pieces are joined with single spaces.
///
/// ```ignore
/// assert_eq!(html_to_text("<p>Hi there</p>"), "Hi there");
/// ```
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .filter_map(|node| {
            let piece = WHITESPACE_RUNS.replace_all(node.trim(), " ");
            (!piece.is_empty()).then(|| piece.into_owned())
        })
        .join(" ")
}

/// Concatenate the plain text of every `Text` block in an article.
///
/// Blocks are joined with a single space and the result is trimmed. Blocks
/// of any other type are skipped.
pub fn article_text(article: &Article) -> String {
    let text = article
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { html } => Some(html_to_text(html)),
            _ => None,
        })
        .join(" ");
    text.trim().to_string()
}

/// Build the summary record for one article.
///
/// Runs once per unseen article UUID; the caller is responsible for
/// consulting the ledger first.
pub fn summary_record(article: &Article, page: u64) -> SummaryRecord {
    SummaryRecord {
        page,
        canonical: article.canonical.clone(),
        uuid: article.uuid.clone(),
        text_content: article_text(article),
        summary: article.summary.clone(),
    }
}

/// Extract image-caption records from one article.
///
/// Emits one record per `Image` block with a non-null caption whose image
/// UUID has not been seen, marking each UUID seen immediately so a repeat
/// later in the same article (or a later page) is skipped. Caption-less
/// images and non-image blocks are skipped, not errors.
pub fn image_records(article: &Article, page: u64, ledger: &mut Ledger) -> Vec<ImageCaptionRecord> {
    let mut records = Vec::new();
    for block in &article.content {
        let ContentBlock::Image {
            image_uuid,
            caption,
            image,
        } = block
        else {
            continue;
        };
        let Some(caption) = caption else {
            continue;
        };
        if ledger.contains(image_uuid) {
            continue;
        }
        ledger.add(image_uuid);
        records.push(ImageCaptionRecord {
            page,
            canonical: article.canonical.clone(),
            uuid: image_uuid.clone(),
            download_url: image.download_url.clone(),
            name: image.name.clone(),
            caption: caption.clone(),
        });
    }
    records
}
