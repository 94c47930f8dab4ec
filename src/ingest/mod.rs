// src/ingest/mod.rs
//! Turns raw search-API records into `NewsItem`s: URL dedup, junk filtering, title and
//! description cleanup. Fetching itself lives behind `SourceProvider`.

pub mod providers;
pub mod types;

use crate::article::NewsItem;
use crate::ingest::types::{RawArticle, SourceProvider};
use metrics::{counter, describe_counter};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::HashMap;

/// Placeholder title the search API uses for retracted articles.
pub const REMOVED_TITLE: &str = "[Removed]";

/// One-time metrics registration (so series show up once a recorder is installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_raw_total", "Raw articles returned by providers.");
        describe_counter!("ingest_kept_total", "Articles kept after normalization.");
        describe_counter!(
            "ingest_filtered_total",
            "Articles dropped for missing title/source or removed content."
        );
        describe_counter!("ingest_dedup_total", "Articles collapsed by URL.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
    });
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Normalize text: decode entities, strip tags, fold typographic quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();
    let stripped = RE_TAGS.replace_all(&decoded, " ");
    let quoted = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    RE_WS.replace_all(&quoted, " ").trim().to_string()
}

/// Headline without the " - Outlet" suffix the search API appends.
pub fn clean_title(title: &str) -> String {
    let head = title.split(" - ").next().unwrap_or(title);
    normalize_text(head)
}

/// Counters from one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounts {
    pub raw: usize,
    pub dedup: usize,
    pub filtered: usize,
    pub kept: usize,
}

/// Dedup by URL, drop junk, clean fields.
///
/// Dedup keeps the first occurrence's position and the last occurrence's content.
pub fn normalize_articles(raw: Vec<RawArticle>) -> (Vec<NewsItem>, IngestCounts) {
    let mut counts = IngestCounts {
        raw: raw.len(),
        ..Default::default()
    };

    let mut slot_by_url: HashMap<String, usize> = HashMap::with_capacity(raw.len());
    let mut unique: Vec<RawArticle> = Vec::with_capacity(raw.len());
    for art in raw {
        match slot_by_url.get(&art.url) {
            Some(&i) => {
                unique[i] = art;
                counts.dedup += 1;
            }
            None => {
                slot_by_url.insert(art.url.clone(), unique.len());
                unique.push(art);
            }
        }
    }

    let mut kept = Vec::with_capacity(unique.len());
    for art in unique {
        let title = art.title.as_deref().map(str::trim).unwrap_or_default();
        let source = art.source.name.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || source.is_empty() || title == REMOVED_TITLE {
            counts.filtered += 1;
            continue;
        }
        let title = clean_title(title);
        if title.is_empty() {
            counts.filtered += 1;
            continue;
        }

        kept.push(NewsItem {
            url: art.url,
            title,
            source: source.to_string(),
            published_at: art.published_at,
            description: art
                .description
                .as_deref()
                .map(normalize_text)
                .filter(|d| !d.is_empty()),
            url_to_image: art.url_to_image.filter(|u| !u.trim().is_empty()),
        });
    }

    counts.kept = kept.len();
    (kept, counts)
}

/// Fetch from every provider, tolerate individual failures, then normalize the union.
pub async fn run_once(providers: &[Box<dyn SourceProvider>]) -> (Vec<NewsItem>, IngestCounts) {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for p in providers {
        match p.fetch_articles().await {
            Ok(mut v) => {
                tracing::debug!(
                    target: "ingest",
                    provider = p.name(),
                    fetched = v.len(),
                    "provider fetched"
                );
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    let (items, counts) = normalize_articles(raw);

    // Telemetry
    counter!("ingest_raw_total").increment(counts.raw as u64);
    counter!("ingest_kept_total").increment(counts.kept as u64);
    counter!("ingest_filtered_total").increment(counts.filtered as u64);
    counter!("ingest_dedup_total").increment(counts.dedup as u64);

    tracing::info!(
        target: "ingest",
        raw = counts.raw,
        kept = counts.kept,
        filtered = counts.filtered,
        dedup = counts.dedup,
        "ingest run"
    );

    (items, counts)
}
