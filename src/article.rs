// src/article.rs
//! Article records: the raw item handed over by the fetch layer and the classified article
//! that flows through clustering.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::leaning::{Leaning, LeaningTable};

/// Normalized news item as produced by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub url: String,
    pub title: String,
    pub source: String,
    /// ISO-8601 timestamp string, kept verbatim.
    pub published_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_to_image: Option<String>,
}

/// A news item with its assigned leaning label.
///
/// Deserializing re-parses `publishedAt`, so a round-tripped article clusters like the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ArticleRecord")]
pub struct Article {
    pub url: String,
    pub title: String,
    pub source: String,
    pub published_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_to_image: Option<String>,
    #[serde(rename = "bias")]
    pub leaning: Leaning,
    /// Parsed `published_at`; `None` when the string is not a recognizable timestamp.
    #[serde(skip)]
    pub published: Option<DateTime<Utc>>,
}

/// Wire shape of `Article` (everything but the parsed timestamp).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleRecord {
    url: String,
    title: String,
    source: String,
    published_at: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url_to_image: Option<String>,
    #[serde(rename = "bias")]
    leaning: Leaning,
}

impl From<ArticleRecord> for Article {
    fn from(r: ArticleRecord) -> Self {
        let published = parse_timestamp(&r.published_at);
        Self {
            url: r.url,
            title: r.title,
            source: r.source,
            published_at: r.published_at,
            description: r.description,
            url_to_image: r.url_to_image,
            leaning: r.leaning,
            published,
        }
    }
}

impl Article {
    /// Classify an item against `table` and parse its timestamp.
    pub fn classify(item: NewsItem, table: &LeaningTable) -> Self {
        let leaning = table.classify(&item.source);
        let published = parse_timestamp(&item.published_at);
        Self {
            url: item.url,
            title: item.title,
            source: item.source,
            published_at: item.published_at,
            description: item.description,
            url_to_image: item.url_to_image,
            leaning,
            published,
        }
    }

    /// Description if present and non-blank, else the title.
    pub fn summary(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => &self.title,
        }
    }
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts RFC 3339 (with offset or `Z`), ISO-8601 variants without seconds or with
/// basic/hour-only offsets (`+0300`, `-03`), offset-less date-times (read as UTC)
/// and bare dates (midnight UTC). Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // %#z: `Z`, `+03`, `+0300` or `+03:00`
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
