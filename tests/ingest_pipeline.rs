// tests/ingest_pipeline.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use news_nexus::ingest::types::{RawArticle, RawSource, SourceProvider};
use news_nexus::StoryEngine;

fn raw(url: &str, title: &str, source: &str, at: &str) -> RawArticle {
    RawArticle {
        source: RawSource {
            id: None,
            name: Some(source.to_string()),
        },
        author: None,
        title: Some(title.to_string()),
        description: Some("<p>Detalle&nbsp;de la &ldquo;nota&rdquo;</p>".to_string()),
        url: url.to_string(),
        url_to_image: None,
        published_at: at.to_string(),
        content: None,
    }
}

struct MockProvider;

#[async_trait]
impl SourceProvider for MockProvider {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>> {
        Ok(vec![
            raw(
                "https://www.emol.com/1",
                "Senado aprueba reforma de pensiones - Emol",
                "Emol",
                "2025-05-01T10:00:00Z",
            ),
            raw(
                "https://www.elmostrador.cl/2",
                "Senado aprueba reforma de pensiones - El Mostrador",
                "El Mostrador",
                "2025-05-01T11:00:00Z",
            ),
            raw(
                "https://www.emol.com/1",
                "Senado aprueba reforma de pensiones - Emol",
                "Emol",
                "2025-05-01T10:00:00Z",
            ),
            raw("https://x.test/removed", "[Removed]", "Emol", "2025-05-01T10:00:00Z"),
        ])
    }
    fn name(&self) -> &'static str {
        "MockProvider"
    }
}

struct BrokenProvider;

#[async_trait]
impl SourceProvider for BrokenProvider {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>> {
        bail!("upstream returned 500")
    }
    fn name(&self) -> &'static str {
        "BrokenProvider"
    }
}

#[tokio::test]
async fn pipeline_survives_a_failing_provider() {
    let providers: Vec<Box<dyn SourceProvider>> =
        vec![Box::new(BrokenProvider), Box::new(MockProvider)];
    let (items, counts) = news_nexus::ingest::run_once(&providers).await;

    assert_eq!(counts.raw, 4);
    assert_eq!(counts.dedup, 1);
    assert_eq!(counts.filtered, 1);
    assert_eq!(counts.kept, 2);

    assert_eq!(items[0].title, "Senado aprueba reforma de pensiones");
    assert_eq!(items[0].description.as_deref(), Some(r#"Detalle de la "nota""#));
}

#[tokio::test]
async fn ingested_items_cluster_across_outlets() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(MockProvider)];
    let (items, _) = news_nexus::ingest::run_once(&providers).await;

    let clusters = StoryEngine::default().run(items);
    assert_eq!(clusters.len(), 1);
    let c = &clusters[0];
    assert_eq!(c.member_count(), 2);
    assert!(!c.is_blindspot());
    assert_eq!(c.summary, r#"Detalle de la "nota""#);
}

#[test]
fn raw_articles_parse_from_search_api_json() {
    let json = r#"[{
        "source": {"id": null, "name": "La Tercera"},
        "author": "Redacción",
        "title": "Cámara despacha proyecto - La Tercera",
        "description": null,
        "url": "https://www.latercera.com/x",
        "urlToImage": "https://img.latercera.com/x.jpg",
        "publishedAt": "2025-05-01T10:00:00Z",
        "content": "..."
    }]"#;
    let parsed: Vec<RawArticle> = serde_json::from_str(json).unwrap();
    let (items, counts) = news_nexus::ingest::normalize_articles(parsed);
    assert_eq!(counts.kept, 1);
    assert_eq!(items[0].title, "Cámara despacha proyecto");
    assert_eq!(items[0].url_to_image.as_deref(), Some("https://img.latercera.com/x.jpg"));
    assert!(items[0].description.is_none());
}
