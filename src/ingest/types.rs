// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Article record as returned by the news search API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    #[serde(default)]
    pub source: RawSource,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub url_to_image: Option<String>,
    pub published_at: String, // ISO-8601
    #[serde(default)]
    pub content: Option<String>,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>>;
    fn name(&self) -> &'static str;
}
