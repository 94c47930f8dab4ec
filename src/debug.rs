// src/debug.rs
//! Dev-only tracing of clustering decisions.
//!
//! Enabled when `NEXUS_DEV_LOG=1` AND the build is a dev environment
//! (debug assertions, or `NEXUS_ENV` in {local, development, dev}).
//! Headlines are never logged raw; only a short SHA-256 prefix identifies them.

use tracing::info;

pub const ENV_DEV_LOG: &str = "NEXUS_DEV_LOG";
pub const ENV_NEXUS_ENV: &str = "NEXUS_ENV";

pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var(ENV_NEXUS_ENV)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// First 6 bytes of SHA-256 as hex.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Where an article ended up during clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    Joined { cluster: usize, corroborated: bool },
    Opened { cluster: usize },
}

pub(crate) fn dev_log_assignment(headline: &str, placement: Placement, similarity: f64) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(headline);
    match placement {
        Placement::Joined {
            cluster,
            corroborated,
        } => info!(
            target: "nexus",
            %id, cluster, corroborated, similarity,
            "article joined cluster"
        ),
        Placement::Opened { cluster } => info!(
            target: "nexus",
            %id, cluster, best_similarity = similarity,
            "article opened cluster"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("Senado aprueba reforma");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("Senado aprueba reforma"));
        assert_ne!(a, anon_hash("Senado rechaza reforma"));
    }

    #[serial_test::serial]
    #[test]
    fn dev_log_requires_flag() {
        std::env::remove_var(ENV_DEV_LOG);
        assert!(!dev_logging_enabled());
        std::env::set_var(ENV_DEV_LOG, "1");
        // tests run with debug assertions
        assert_eq!(dev_logging_enabled(), cfg!(debug_assertions));
        std::env::remove_var(ENV_DEV_LOG);
    }
}
