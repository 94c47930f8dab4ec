// src/config/analyst.rs
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ANALYST_CONFIG_PATH: &str = "config/analyst.json";
pub const ENV_ANALYST_CONFIG_PATH: &str = "NEXUS_ANALYST_CONFIG_PATH";
pub const ENV_GEMINI_API_KEY: &str = "GOOGLE_GENERATIVE_AI_API_KEY";

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_daily_limit() -> u32 {
    20
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "gemini" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Max real provider calls per day; cache hits are free.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// "ENV" means: read from GOOGLE_GENERATIVE_AI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            daily_limit: default_daily_limit(),
            api_key: default_api_key(),
        }
    }
}

impl AnalystConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: AnalystConfig = serde_json::from_str(data)?;

        // Normalize provider
        cfg.provider = cfg.provider.trim().to_lowercase();

        // Resolve api key if "ENV" (only needed for a live provider)
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "gemini" if cfg.enabled => env::var(ENV_GEMINI_API_KEY)
                    .map_err(|_| anyhow::anyhow!("Missing {ENV_GEMINI_API_KEY} env var"))?,
                "gemini" | "mock" => String::new(),
                other => anyhow::bail!("Unsupported analyst provider in config: {other}"),
            };
        }

        if cfg.daily_limit == 0 {
            cfg.daily_limit = default_daily_limit();
        }

        Ok(cfg)
    }

    /// Load using `$NEXUS_ANALYST_CONFIG_PATH`, else `config/analyst.json`.
    /// A missing file yields a disabled default config.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = env::var(ENV_ANALYST_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ANALYST_CONFIG_PATH));
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(&path)
    }
}
