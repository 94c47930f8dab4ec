// src/diversity.rs
//! Display filter: drop clusters with too little coverage, but never return an empty list
//! for a non-empty input. When nothing passes, the unfiltered list is returned instead.

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;

fn default_min_members() -> usize {
    2
}
fn default_min_distinct_leanings() -> usize {
    1
}

/// `[diversity]` section of `config/nexus.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiversityParams {
    /// Minimum member articles per cluster.
    #[serde(default = "default_min_members")]
    pub min_members: usize,
    /// Minimum number of distinct leaning labels per cluster (1 = no constraint).
    #[serde(default = "default_min_distinct_leanings")]
    pub min_distinct_leanings: usize,
}

impl Default for DiversityParams {
    fn default() -> Self {
        Self {
            min_members: default_min_members(),
            min_distinct_leanings: default_min_distinct_leanings(),
        }
    }
}

impl DiversityParams {
    pub fn passes(&self, cluster: &Cluster) -> bool {
        cluster.member_count() >= self.min_members
            && cluster.bias_distribution.distinct() >= self.min_distinct_leanings
    }
}

/// Result of the diversity pass.
#[derive(Debug)]
pub struct DiversityOutcome {
    pub clusters: Vec<Cluster>,
    /// True if filtering would have removed everything and the input was kept.
    pub fell_back: bool,
}

pub fn apply_diversity_filter(clusters: Vec<Cluster>, params: &DiversityParams) -> DiversityOutcome {
    if clusters.iter().any(|c| params.passes(c)) {
        let kept = clusters.into_iter().filter(|c| params.passes(c)).collect();
        return DiversityOutcome {
            clusters: kept,
            fell_back: false,
        };
    }

    let fell_back = !clusters.is_empty();
    if fell_back {
        tracing::warn!(
            target: "nexus",
            clusters = clusters.len(),
            min_members = params.min_members,
            "no cluster passed the diversity filter, returning unfiltered list"
        );
    }
    DiversityOutcome {
        clusters,
        fell_back,
    }
}
