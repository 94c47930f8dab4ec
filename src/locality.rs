// src/locality.rs
//! Locality preference for a cluster's human-facing headline.
//!
//! A cluster's representative is replaced by a later-discovered member when the current
//! representative is not from a national outlet and the newcomer is. "National" is decided
//! by the URL host's domain suffix, configured via `[locality] national_suffixes`.

use serde::{Deserialize, Serialize};
use url::Url;

fn default_national_suffixes() -> Vec<String> {
    vec!["cl".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalityRule {
    /// Host suffixes considered national (e.g. "cl" matches `www.latercera.cl`).
    /// Empty disables representative swaps.
    #[serde(default = "default_national_suffixes")]
    pub national_suffixes: Vec<String>,
}

impl Default for LocalityRule {
    fn default() -> Self {
        Self {
            national_suffixes: default_national_suffixes(),
        }
    }
}

impl LocalityRule {
    /// Rule that never prefers any outlet.
    pub fn disabled() -> Self {
        Self {
            national_suffixes: Vec::new(),
        }
    }

    /// True if `url`'s host ends in one of the configured suffixes (label-aligned).
    pub fn is_national(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()))
        else {
            return false;
        };

        self.national_suffixes.iter().any(|raw| {
            let suffix = raw.trim().trim_start_matches('.').to_ascii_lowercase();
            !suffix.is_empty() && (host == suffix || host.ends_with(&format!(".{suffix}")))
        })
    }

    /// Whether a member at `candidate_url` should replace the representative at `current_url`.
    pub fn prefers(&self, candidate_url: &str, current_url: &str) -> bool {
        !self.is_national(current_url) && self.is_national(candidate_url)
    }
}
