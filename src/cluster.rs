// src/cluster.rs
//! # Clustering Engine
//! Greedy, first-fit grouping of classified articles into event clusters.
//!
//! Scan order is part of the contract: articles are processed newest first and each one
//! is offered to existing clusters oldest first. The first cluster that accepts it wins;
//! there is no best-match search. Acceptance requires the article to be within the time
//! window of the cluster's anchor and either a strong headline similarity, or a moderate
//! similarity corroborated by a shared entity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::analyze::HeadlineSignals;
use crate::article::{parse_timestamp, Article};
use crate::blindspot::BlindspotSide;
use crate::debug::{dev_log_assignment, Placement};
use crate::leaning::LeaningCounts;
use crate::locality::LocalityRule;

fn default_time_window_hours() -> u32 {
    72
}
fn default_strong_similarity() -> f64 {
    0.20
}
fn default_weak_similarity() -> f64 {
    0.08
}

/// Tunable clustering thresholds (`[clustering]` in `config/nexus.toml`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Max distance (exclusive) between an article and a cluster's anchor.
    #[serde(default = "default_time_window_hours")]
    pub time_window_hours: u32,
    /// Similarity above which a headline joins on text alone.
    #[serde(default = "default_strong_similarity")]
    pub strong_similarity: f64,
    /// Similarity above which a headline joins if it also shares an entity.
    #[serde(default = "default_weak_similarity")]
    pub weak_similarity: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            time_window_hours: default_time_window_hours(),
            strong_similarity: default_strong_similarity(),
            weak_similarity: default_weak_similarity(),
        }
    }
}

impl ClusterParams {
    /// Replace invalid values with defaults and keep `weak <= strong`.
    pub fn sanitized(mut self) -> Self {
        fn valid(x: f64) -> bool {
            x.is_finite() && (0.0..=1.0).contains(&x)
        }
        if !valid(self.strong_similarity) {
            self.strong_similarity = default_strong_similarity();
        }
        if !valid(self.weak_similarity) {
            self.weak_similarity = default_weak_similarity();
        }
        if self.weak_similarity > self.strong_similarity {
            std::mem::swap(&mut self.weak_similarity, &mut self.strong_similarity);
        }
        if self.time_window_hours == 0 {
            self.time_window_hours = default_time_window_hours();
        }
        self
    }

    pub fn window(&self) -> Duration {
        Duration::hours(i64::from(self.time_window_hours))
    }

    /// `Some(corroborated)` if the pair qualifies; `corroborated` marks the entity-backed path.
    pub fn accepts(&self, similarity: f64, shared_entity: bool) -> Option<bool> {
        if similarity > self.strong_similarity {
            Some(false)
        } else if similarity > self.weak_similarity && shared_entity {
            Some(true)
        } else {
            None
        }
    }
}

/// A group of articles reporting the same event.
///
/// Deserializing rebuilds the anchor from `firstPublishedAt` and the representative from the
/// first member whose headline and summary match, so a decoded cluster keeps absorbing correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ClusterRecord")]
pub struct Cluster {
    pub id: String,
    pub main_title: String,
    pub summary: String,
    /// Members in discovery order.
    pub items: Vec<Article>,
    pub bias_distribution: LeaningCounts,
    /// Raw timestamp of the article that opened the cluster.
    pub first_published_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blindspot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blindspot_side: Option<BlindspotSide>,
    #[serde(skip)]
    anchor: Option<DateTime<Utc>>,
    #[serde(skip)]
    representative_url: String,
}

/// Wire shape of `Cluster`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterRecord {
    id: String,
    main_title: String,
    summary: String,
    items: Vec<Article>,
    bias_distribution: LeaningCounts,
    first_published_at: String,
    #[serde(default)]
    blindspot: Option<bool>,
    #[serde(default)]
    blindspot_side: Option<BlindspotSide>,
}

impl From<ClusterRecord> for Cluster {
    fn from(r: ClusterRecord) -> Self {
        let anchor = parse_timestamp(&r.first_published_at);
        let representative_url = r
            .items
            .iter()
            .find(|a| a.title == r.main_title && a.summary() == r.summary)
            .or_else(|| r.items.first())
            .map(|a| a.url.clone())
            .unwrap_or_default();
        Self {
            id: r.id,
            main_title: r.main_title,
            summary: r.summary,
            items: r.items,
            bias_distribution: r.bias_distribution,
            first_published_at: r.first_published_at,
            blindspot: r.blindspot,
            blindspot_side: r.blindspot_side,
            anchor,
            representative_url,
        }
    }
}

impl Cluster {
    /// Open a cluster with `article` as its only member and representative.
    pub fn open(article: Article) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            main_title: article.title.clone(),
            summary: article.summary().to_string(),
            bias_distribution: LeaningCounts::single(article.leaning),
            first_published_at: article.published_at.clone(),
            blindspot: None,
            blindspot_side: None,
            anchor: article.published,
            representative_url: article.url.clone(),
            items: vec![article],
        }
    }

    /// Append `article`, count its leaning and apply the locality rule.
    /// Returns `true` if the representative headline was replaced.
    pub fn absorb(&mut self, article: Article, locality: &LocalityRule) -> bool {
        self.bias_distribution.increment(article.leaning);
        let swap = locality.prefers(&article.url, &self.representative_url);
        if swap {
            self.main_title = article.title.clone();
            self.summary = article.summary().to_string();
            self.representative_url = article.url.clone();
        }
        self.items.push(article);
        swap
    }

    /// Parsed anchor timestamp; `None` if the opening article's timestamp did not parse.
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    pub fn member_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_blindspot(&self) -> bool {
        self.blindspot == Some(true)
    }

    /// Strictly inside the window; unparseable timestamps never qualify.
    fn within_window(&self, published: Option<DateTime<Utc>>, window: Duration) -> bool {
        match (self.anchor, published) {
            (Some(anchor), Some(at)) => {
                let gap = if at >= anchor { at - anchor } else { anchor - at };
                gap < window
            }
            _ => false,
        }
    }
}

/// Newest first; articles without a parseable timestamp go last, input order kept on ties.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| match (a.published, b.published) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Group `articles` into clusters. Every input article lands in exactly one cluster.
pub fn cluster_articles(
    mut articles: Vec<Article>,
    params: &ClusterParams,
    locality: &LocalityRule,
) -> Vec<Cluster> {
    sort_newest_first(&mut articles);
    let window = params.window();

    let mut clusters: Vec<Cluster> = Vec::new();
    // Signals of each cluster's current representative headline, parallel to `clusters`.
    let mut reps: Vec<HeadlineSignals> = Vec::new();

    for article in articles {
        let incoming = HeadlineSignals::of(&article.title);
        let mut best_similarity = 0.0f64;
        let mut hit: Option<(usize, bool, f64)> = None;

        for (idx, (cluster, rep)) in clusters.iter().zip(&reps).enumerate() {
            if !cluster.within_window(article.published, window) {
                continue;
            }
            let similarity = incoming.similarity(rep);
            best_similarity = best_similarity.max(similarity);
            if let Some(corroborated) =
                params.accepts(similarity, incoming.shares_entity(rep))
            {
                hit = Some((idx, corroborated, similarity));
                break;
            }
        }

        match hit {
            Some((idx, corroborated, similarity)) => {
                debug!(target: "nexus", cluster = idx, similarity, corroborated, "article joined");
                dev_log_assignment(
                    &article.title,
                    Placement::Joined {
                        cluster: idx,
                        corroborated,
                    },
                    similarity,
                );
                if clusters[idx].absorb(article, locality) {
                    debug!(target: "nexus", cluster = idx, "representative replaced by national outlet");
                    reps[idx] = incoming;
                }
            }
            None => {
                debug!(
                    target: "nexus",
                    cluster = clusters.len(),
                    best_similarity,
                    "article opened cluster"
                );
                dev_log_assignment(
                    &article.title,
                    Placement::Opened {
                        cluster: clusters.len(),
                    },
                    best_similarity,
                );
                clusters.push(Cluster::open(article));
                reps.push(incoming);
            }
        }
    }

    debug!(target: "nexus", clusters = clusters.len(), "clustering finished");
    clusters
}
