// src/analyze/mod.rs
//! Lightweight headline signals used by clustering: entity candidates and token-set similarity.

pub mod entities;
pub mod similarity;

use std::collections::HashSet;

pub use crate::analyze::entities::{extract_entities, shares_entity};
pub use crate::analyze::similarity::{jaccard, jaccard_similarity, significant_tokens};

/// Precomputed signals for one headline, so a candidate is tokenized once per comparison pass.
#[derive(Debug, Clone, Default)]
pub struct HeadlineSignals {
    pub tokens: HashSet<String>,
    pub entities: HashSet<String>,
}

impl HeadlineSignals {
    pub fn of(headline: &str) -> Self {
        Self {
            tokens: significant_tokens(headline),
            entities: extract_entities(headline),
        }
    }

    /// Jaccard similarity of the token sets.
    pub fn similarity(&self, other: &HeadlineSignals) -> f64 {
        jaccard(&self.tokens, &other.tokens)
    }

    /// At least one shared entity.
    pub fn shares_entity(&self, other: &HeadlineSignals) -> bool {
        shares_entity(&self.entities, &other.entities)
    }
}
