// src/lib.rs
// Public library surface for the demo binary and integration tests.

pub mod article;
pub mod blindspot;
pub mod cluster;
pub mod config;
pub mod diversity;
pub mod engine;
pub mod leaning;
pub mod locality;

// Headline signals: entity extraction + token similarity
pub mod analyze;

// Fetch-side normalization and the deep-analysis seam (async)
pub mod analyst;
pub mod ingest;

pub(crate) mod debug;

// ---- Re-exports for stable public API ----
pub use crate::article::{Article, NewsItem};
pub use crate::blindspot::BlindspotSide;
pub use crate::cluster::Cluster;
pub use crate::config::NexusConfig;
pub use crate::engine::{PipelineRun, RunStats, StoryEngine};
pub use crate::leaning::{classify_source, Leaning, LeaningCounts, LeaningTable};

/// Cluster a batch of news items with the built-in leaning table and default parameters.
///
/// Classify, cluster, flag blindspots, then apply the diversity filter.
pub fn cluster(items: Vec<NewsItem>) -> Vec<Cluster> {
    StoryEngine::default().run(items)
}
