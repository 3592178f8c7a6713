//! Data models for TV2 Nord articles and the persisted dataset records.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`ArticlePage`]: one page of the articles API response (`{data, meta}`)
//! - [`Article`]: a raw article as returned by the API
//! - [`ContentBlock`]: one typed fragment of an article body (text, image, ...)
//! - [`SummaryRecord`] / [`ImageCaptionRecord`]: the rows appended to the
//!   JSON-lines dataset files
//!
//! # Forward compatibility
//!
//! The API adds new content block types over time. [`ContentBlock`] carries a
//! catch-all variant so unrecognized block types deserialize cleanly and are
//! skipped during extraction instead of failing the page.

use serde::{Deserialize, Serialize};

/// One page of the articles API response.
///
/// The API wraps articles in `{"data": [...], "meta": {"total": N}}`. An
/// empty `data` array means the previous page was the last one with content.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticlePage {
    /// Articles on this page, in server-side order.
    pub data: Vec<Article>,
    /// Collection-level metadata.
    pub meta: PageMeta,
}

/// Collection metadata attached to every page response.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageMeta {
    /// Total number of articles known to the API.
    pub total: u64,
}

/// A raw article as fetched from the API.
///
/// Immutable once fetched; only the fields the pipeline consumes are
/// deserialized, everything else in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    /// Unique article identifier.
    pub uuid: String,
    /// Canonical URL of the published article.
    pub canonical: String,
    /// Editorial summary. Not every payload carries one, so it defaults to
    /// empty rather than failing deserialization.
    #[serde(default)]
    pub summary: String,
    /// Ordered body fragments.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// One typed fragment of an article body.
///
/// Serialized by the API as `{"type": "...", "content": {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum ContentBlock {
    /// An HTML text fragment.
    Text {
        /// Raw HTML markup for this fragment.
        html: String,
    },
    /// An inline image with optional caption.
    Image {
        /// Unique identifier of the image itself (not the article).
        image_uuid: String,
        /// Editorial caption; absent for decorative images.
        caption: Option<String>,
        /// The downloadable asset.
        image: ImageAsset,
    },
    /// Any block type this build does not know about (video, embeds, ...).
    #[serde(other)]
    Unsupported,
}

/// The downloadable asset behind an image block.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageAsset {
    /// Direct URL to the image binary.
    pub download_url: String,
    /// Original file name as uploaded.
    pub name: String,
}

/// One row of the summarisation dataset.
///
/// `page` records which API page the article was extracted from; it is what
/// makes the dataset resumable. `uuid` is the article UUID and is the
/// deduplication key for this dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// API page the article was processed on.
    pub page: u64,
    /// Canonical URL of the article.
    pub canonical: String,
    /// Article UUID (dedup key).
    pub uuid: String,
    /// Plain-text article body, HTML stripped.
    pub text_content: String,
    /// Editorial summary paired with the body.
    pub summary: String,
}

/// One row of the image-caption dataset.
///
/// `uuid` is the *image* UUID, not the article's: a single article can yield
/// several image records, each deduplicated independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCaptionRecord {
    /// API page the parent article was processed on.
    pub page: u64,
    /// Canonical URL of the parent article.
    pub canonical: String,
    /// Image UUID (dedup key).
    pub uuid: String,
    /// Direct URL to the image binary.
    pub download_url: String,
    /// Original image file name.
    pub name: String,
    /// Editorial caption.
    pub caption: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_page_deserialization() {
        let json = r#"{
            "data": [
                {
                    "uuid": "123",
                    "canonical": "https://x/a",
                    "summary": "S",
                    "content": [
                        {"type": "Text", "content": {"html": "<p>Hi there</p>"}}
                    ]
                }
            ],
            "meta": {"total": 80892}
        }"#;

        let page: ArticlePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.meta.total, 80892);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].uuid, "123");
        assert_eq!(page.data[0].summary, "S");
    }

    #[test]
    fn test_article_without_summary_defaults_to_empty() {
        let json = r#"{"uuid": "1", "canonical": "https://x/a", "content": []}"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.summary, "");
        assert!(article.content.is_empty());
    }

    #[test]
    fn test_image_block_deserialization() {
        let json = r#"{
            "type": "Image",
            "content": {
                "image_uuid": "456",
                "caption": "A cap",
                "image": {"download_url": "https://x/i.jpg", "name": "n.jpg"}
            }
        }"#;

        let block: ContentBlock = serde_json::from_str(json).unwrap();
        match block {
            ContentBlock::Image {
                image_uuid,
                caption,
                image,
            } => {
                assert_eq!(image_uuid, "456");
                assert_eq!(caption.as_deref(), Some("A cap"));
                assert_eq!(image.download_url, "https://x/i.jpg");
                assert_eq!(image.name, "n.jpg");
            }
            other => panic!("expected image block, got {other:?}"),
        }
    }

    #[test]
    fn test_null_caption_deserializes_as_none() {
        let json = r#"{
            "type": "Image",
            "content": {
                "image_uuid": "456",
                "caption": null,
                "image": {"download_url": "https://x/i.jpg", "name": "n.jpg"}
            }
        }"#;

        let block: ContentBlock = serde_json::from_str(json).unwrap();
        match block {
            ContentBlock::Image { caption, .. } => assert!(caption.is_none()),
            other => panic!("expected image block, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_block_type_is_tolerated() {
        let json = r#"{"type": "Video", "content": {"stream_url": "https://x/v.m3u8"}}"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        assert!(matches!(block, ContentBlock::Unsupported));
    }

    #[test]
    fn test_summary_record_field_order() {
        let record = SummaryRecord {
            page: 1,
            canonical: "https://x/a".to_string(),
            uuid: "123".to_string(),
            text_content: "Hi there".to_string(),
            summary: "S".to_string(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"page":1,"canonical":"https://x/a","uuid":"123","text_content":"Hi there","summary":"S"}"#
        );
    }

    #[test]
    fn test_image_caption_record_round_trip() {
        let record = ImageCaptionRecord {
            page: 7,
            canonical: "https://x/a".to_string(),
            uuid: "456".to_string(),
            download_url: "https://x/i.jpg".to_string(),
            name: "n.jpg".to_string(),
            caption: "A cap".to_string(),
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: ImageCaptionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
