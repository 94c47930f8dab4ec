// src/blindspot.rs
//! Blindspot detection over finished clusters.
//!
//! Left block = left + center-left, right block = right + center-right; center counts for
//! neither. A cluster covered by exactly one block is a blindspot for the other one.

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::leaning::LeaningCounts;

/// The political block that did not cover a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlindspotSide {
    Left,
    Right,
}

/// Side that is blind to a story with these counts, if any.
pub fn blind_side(counts: &LeaningCounts) -> Option<BlindspotSide> {
    match (counts.left_block(), counts.right_block()) {
        (l, 0) if l > 0 => Some(BlindspotSide::Right),
        (0, r) if r > 0 => Some(BlindspotSide::Left),
        _ => None,
    }
}

/// Annotate every cluster in place from its final counts. Returns the number flagged.
pub fn detect_blindspots(clusters: &mut [Cluster]) -> usize {
    let mut flagged = 0;
    for cluster in clusters.iter_mut() {
        match blind_side(&cluster.bias_distribution) {
            Some(side) => {
                cluster.blindspot = Some(true);
                cluster.blindspot_side = Some(side);
                flagged += 1;
            }
            None => {
                cluster.blindspot = None;
                cluster.blindspot_side = None;
            }
        }
    }
    flagged
}
