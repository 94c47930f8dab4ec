// src/config/mod.rs
//! Runtime configuration.
//!
//! `NexusConfig` comes from TOML: `$NEXUS_CONFIG_PATH`, else `config/nexus.toml`.
//! A missing file means built-in defaults; a malformed one is an error.
//! `NEXUS_STRONG_SIMILARITY` / `NEXUS_WEAK_SIMILARITY` override the thresholds (clamped to [0,1]).

pub mod analyst;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::cluster::ClusterParams;
use crate::diversity::DiversityParams;
use crate::locality::LocalityRule;

pub const DEFAULT_NEXUS_CONFIG_PATH: &str = "config/nexus.toml";
pub const ENV_NEXUS_CONFIG_PATH: &str = "NEXUS_CONFIG_PATH";
pub const ENV_STRONG_SIMILARITY: &str = "NEXUS_STRONG_SIMILARITY";
pub const ENV_WEAK_SIMILARITY: &str = "NEXUS_WEAK_SIMILARITY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NexusConfig {
    #[serde(default)]
    pub clustering: ClusterParams,
    #[serde(default)]
    pub locality: LocalityRule,
    #[serde(default)]
    pub diversity: DiversityParams,
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

impl NexusConfig {
    /// Resolve path from env or default, load, then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_NEXUS_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_NEXUS_CONFIG_PATH));

        let mut cfg = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading nexus config from {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("parsing nexus config at {}", path.display()))?
        } else {
            tracing::debug!(target: "nexus", path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        if let Some(t) = parse_threshold_env(std::env::var(ENV_STRONG_SIMILARITY).ok()) {
            cfg.clustering.strong_similarity = t;
        }
        if let Some(t) = parse_threshold_env(std::env::var(ENV_WEAK_SIMILARITY).ok()) {
            cfg.clustering.weak_similarity = t;
        }
        cfg.clustering = cfg.clustering.sanitized();

        Ok(cfg)
    }

    /// Parse from a TOML string. Missing sections/fields take defaults.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut cfg: NexusConfig = toml::from_str(toml_str)?;
        cfg.clustering = cfg.clustering.sanitized();
        if cfg.diversity.min_distinct_leanings == 0 {
            cfg.diversity.min_distinct_leanings = 1;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_defaults() {
        let cfg = NexusConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, NexusConfig::default());
        assert_eq!(cfg.clustering.time_window_hours, 72);
        assert!((cfg.clustering.strong_similarity - 0.20).abs() < 1e-12);
        assert!((cfg.clustering.weak_similarity - 0.08).abs() < 1e-12);
        assert_eq!(cfg.locality.national_suffixes, vec!["cl".to_string()]);
        assert_eq!(cfg.diversity.min_members, 2);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = NexusConfig::from_toml_str(
            r#"
[clustering]
time_window_hours = 48

[locality]
national_suffixes = ["com.ar"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.clustering.time_window_hours, 48);
        assert!((cfg.clustering.strong_similarity - 0.20).abs() < 1e-12);
        assert_eq!(cfg.locality.national_suffixes, vec!["com.ar".to_string()]);
        assert_eq!(cfg.diversity, DiversityParams::default());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(NexusConfig::from_toml_str("[clustering]\ntime_window_hours = \"soon\"").is_err());
    }

    #[test]
    fn threshold_env_parsing() {
        assert_eq!(parse_threshold_env(Some(" 0.3 ".into())), Some(0.3));
        assert_eq!(parse_threshold_env(Some("7".into())), Some(1.0));
        assert_eq!(parse_threshold_env(Some("-1".into())), Some(0.0));
        assert_eq!(parse_threshold_env(Some("NaN".into())), None);
        assert_eq!(parse_threshold_env(Some("abc".into())), None);
        assert_eq!(parse_threshold_env(None), None);
    }
}
