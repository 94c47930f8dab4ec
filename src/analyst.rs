//! Deep-analysis collaborator: hands one cluster's articles to a language model and returns
//! its JSON report. Provider abstraction + in-memory cache + daily call limit.
//!
//! Nothing here fails loudly. A missing key, a network error or an unparseable answer all
//! end up as `None` with a `warn!` on target `analyst`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::article::Article;
use crate::config::analyst::AnalystConfig;

pub const ENV_ANALYST_MODE: &str = "NEXUS_ANALYST_MODE";

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Provider's JSON answer. Only guaranteed to be a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisReport(pub serde_json::Value);

impl AnalysisReport {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

/// Trait object used by callers (demo bin, tests).
pub trait ClusterAnalyst: Send + Sync {
    /// Analyze one cluster's member articles.
    fn analyze<'a>(
        &'a self,
        articles: &'a [Article],
    ) -> Pin<Box<dyn Future<Output = Option<AnalysisReport>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynAnalyst = Arc<dyn ClusterAnalyst>;

/// Parse a model answer into a report.
///
/// Models like to wrap JSON in Markdown fences even when told not to, so those are removed first.
pub fn parse_report(text: &str) -> anyhow::Result<AnalysisReport> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        bail!("empty analysis response");
    }
    let value: serde_json::Value =
        serde_json::from_str(cleaned).context("analysis response is not valid JSON")?;
    if !value.is_object() {
        bail!("analysis response is not a JSON object");
    }
    Ok(AnalysisReport(value))
}

/// One block per article: outlet with its leaning, headline, summary.
pub fn build_digest(articles: &[Article]) -> String {
    let mut out = String::new();
    for (i, a) in articles.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let _ = write!(
            out,
            "- Fuente: {} ({})\n  Titular: {}\n  Resumen: {}",
            a.source,
            a.leaning,
            a.title,
            a.summary()
        );
    }
    out
}

/// Full model prompt for one cluster.
pub fn build_prompt(articles: &[Article]) -> String {
    format!(
        "Actúa como analista de medios experto en el ecosistema informativo chileno.\n\
         Recibes artículos de distintas fuentes sobre un mismo evento. Para cada artículo \
         identifica su enfoque (framing), lo que omite (puntos ciegos) y un adjetivo que defina \
         su tono, en el MISMO orden de entrada.\n\n\
         Responde únicamente con un objeto JSON con las claves \"resumen_ejecutivo\", \
         \"auditoria_lineal\" (una entrada por artículo) y \"kpis\" \
         (\"polarizacion\" 1-10, \"diversidad\" ALTA|MEDIA|BAJA). Sin bloques Markdown.\n\n\
         Artículos:\n{}",
        build_digest(articles)
    )
}

/// Factory: build an analyst according to config and environment.
///
/// * `NEXUS_ANALYST_MODE=mock` gives a deterministic mock behind the cache.
/// * Else `enabled == false` gives a disabled analyst.
/// * Else `gemini` builds the live provider wrapped with caching + daily limit.
pub fn build_analyst_from_config(config: &AnalystConfig) -> DynAnalyst {
    let mock_mode = std::env::var(ENV_ANALYST_MODE)
        .map(|v| v.eq_ignore_ascii_case("mock"))
        .unwrap_or(false);
    if mock_mode || (config.enabled && config.provider == "mock") {
        return Arc::new(CachingAnalyst::new(MockProvider::default(), config.daily_limit));
    }

    if !config.enabled {
        return Arc::new(DisabledAnalyst);
    }

    match config.provider.as_str() {
        "gemini" => match GeminiProvider::new(&config.api_key, &config.model) {
            Ok(p) => Arc::new(CachingAnalyst::new(p, config.daily_limit)),
            Err(e) => {
                warn!(target: "analyst", error = ?e, "gemini provider unavailable, analysis disabled");
                Arc::new(DisabledAnalyst)
            }
        },
        other => {
            warn!(target: "analyst", provider = other, "unknown analyst provider, analysis disabled");
            Arc::new(DisabledAnalyst)
        }
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: turns a prompt into raw model text.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// Google Gemini via the `generateContent` REST endpoint.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: &str) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            bail!("empty gemini api key");
        }
        let http = reqwest::Client::builder()
            .user_agent("news-nexus/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building http client")?;
        Ok(Self {
            http,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
        })
    }
}

impl Provider for GeminiProvider {
    fn fetch<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Part<'a> {
                text: &'a str,
            }
            #[derive(Serialize)]
            struct Content<'a> {
                parts: Vec<Part<'a>>,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                contents: Vec<Content<'a>>,
            }
            #[derive(Deserialize)]
            struct Resp {
                #[serde(default)]
                candidates: Vec<Candidate>,
            }
            #[derive(Deserialize)]
            struct Candidate {
                content: RespContent,
            }
            #[derive(Deserialize)]
            struct RespContent {
                #[serde(default)]
                parts: Vec<RespPart>,
            }
            #[derive(Deserialize)]
            struct RespPart {
                #[serde(default)]
                text: String,
            }

            let req = Req {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };
            let url = format!("{GEMINI_ENDPOINT}/{}:generateContent", self.model);

            let resp = self
                .http
                .post(url)
                .query(&[("key", self.api_key.as_str())])
                .json(&req)
                .send()
                .await
                .context("gemini request")?;

            let status = resp.status();
            if !status.is_success() {
                bail!("gemini returned HTTP {status}");
            }
            let body: Resp = resp.json().await.context("decoding gemini response")?;
            body.candidates
                .into_iter()
                .next()
                .and_then(|c| c.content.parts.into_iter().next())
                .map(|p| p.text)
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| anyhow!("gemini response has no text"))
        })
    }
    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Returns `None` always; used when analysis is disabled.
pub struct DisabledAnalyst;

impl ClusterAnalyst for DisabledAnalyst {
    fn analyze<'a>(
        &'a self,
        _articles: &'a [Article],
    ) -> Pin<Box<dyn Future<Output = Option<AnalysisReport>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed-answer provider for tests and local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: serde_json::Value,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            fixed: serde_json::json!({
                "resumen_ejecutivo": "Cobertura simulada (mock).",
                "auditoria_lineal": [],
                "kpis": { "polarizacion": 5.0, "diversidad": "MEDIA" }
            }),
        }
    }
}

impl Provider for MockProvider {
    fn fetch<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        let out = format!("```json\n{}\n```", self.fixed);
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching wrapper (in-memory cache + daily limit)
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct DailyCounter {
    day: NaiveDate,
    count: u32,
}

impl DailyCounter {
    fn today() -> Self {
        Self {
            day: Utc::now().date_naive(),
            count: 0,
        }
    }
}

/// Only real provider calls count against the limit; cache hits are free.
pub struct CachingAnalyst<P: Provider> {
    inner: P,
    daily_limit_max: u32,
    cache: Mutex<HashMap<String, AnalysisReport>>,
    counter: Mutex<DailyCounter>,
}

impl<P: Provider> CachingAnalyst<P> {
    pub fn new(inner: P, daily_limit_max: u32) -> Self {
        Self {
            inner,
            daily_limit_max,
            cache: Mutex::new(HashMap::new()),
            counter: Mutex::new(DailyCounter::today()),
        }
    }

    /// Real calls made today.
    pub fn calls_today(&self) -> u32 {
        let g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        if g.day == Utc::now().date_naive() {
            g.count
        } else {
            0
        }
    }

    async fn analyze_impl(&self, articles: &[Article]) -> Option<AnalysisReport> {
        if articles.is_empty() {
            return None;
        }

        let key = cache_key(articles);
        {
            let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(hit) = cache.get(&key) {
                debug!(target: "analyst", provider = self.inner.name(), "cache hit");
                return Some(hit.clone());
            }
        }

        {
            let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
            let today = Utc::now().date_naive();
            if g.day != today {
                *g = DailyCounter::today();
            }
            if g.count >= self.daily_limit_max {
                warn!(
                    target: "analyst",
                    provider = self.inner.name(),
                    limit = self.daily_limit_max,
                    "daily analysis limit reached"
                );
                return None;
            }
        }

        let prompt = build_prompt(articles);
        let text = match self.inner.fetch(&prompt).await {
            Ok(t) => t,
            Err(e) => {
                warn!(target: "analyst", provider = self.inner.name(), error = ?e, "analysis call failed");
                return None;
            }
        };

        // The call happened, so it counts even if the answer turns out unusable.
        {
            let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
            g.count = g.count.saturating_add(1);
        }

        match parse_report(&text) {
            Ok(report) => {
                let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
                cache.insert(key, report.clone());
                Some(report)
            }
            Err(e) => {
                warn!(target: "analyst", provider = self.inner.name(), error = ?e, "unusable analysis response");
                None
            }
        }
    }
}

impl<P: Provider> ClusterAnalyst for CachingAnalyst<P> {
    fn analyze<'a>(
        &'a self,
        articles: &'a [Article],
    ) -> Pin<Box<dyn Future<Output = Option<AnalysisReport>> + Send + 'a>> {
        Box::pin(self.analyze_impl(articles))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

/// SHA-256 over the member URLs, in order.
fn cache_key(articles: &[Article]) -> String {
    let mut hasher = Sha256::new();
    for a in articles {
        hasher.update(a.url.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::NewsItem;
    use crate::leaning::LeaningTable;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn art(url: &str, title: &str, source: &str, desc: Option<&str>) -> Article {
        Article::classify(
            NewsItem {
                url: url.into(),
                title: title.into(),
                source: source.into(),
                published_at: "2025-05-01T10:00:00Z".into(),
                description: desc.map(String::from),
                url_to_image: None,
            },
            &LeaningTable::default_seed(),
        )
    }

    /// Counts calls and answers with whatever `reply` holds.
    struct CountingProvider {
        calls: Arc<AtomicU32>,
        reply: String,
    }

    impl Provider for CountingProvider {
        fn fetch<'a>(
            &'a self,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let out = self.reply.clone();
            Box::pin(async move { Ok(out) })
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn parse_strips_fences() {
        let r = parse_report("```json\n{\"resumen_ejecutivo\": \"x\"}\n```").unwrap();
        assert_eq!(r.get("resumen_ejecutivo").and_then(|v| v.as_str()), Some("x"));
    }

    #[test]
    fn parse_rejects_non_objects_and_garbage() {
        assert!(parse_report("[1, 2]").is_err());
        assert!(parse_report("not json").is_err());
        assert!(parse_report("```json\n```").is_err());
    }

    #[test]
    fn digest_lists_every_article() {
        let arts = vec![
            art("https://a.cl/1", "Senado aprueba reforma", "Emol", Some("Detalle del proyecto")),
            art("https://b.cl/2", "Reforma pasa al Senado", "El Mostrador", None),
        ];
        let d = build_digest(&arts);
        assert!(d.contains("- Fuente: Emol (right)\n  Titular: Senado aprueba reforma\n  Resumen: Detalle del proyecto"));
        assert!(d.contains("- Fuente: El Mostrador (left)"));
        // missing description falls back to the headline
        assert!(d.contains("Resumen: Reforma pasa al Senado"));
        assert_eq!(d.matches("- Fuente:").count(), 2);
    }

    #[test]
    fn cache_key_depends_on_urls_only() {
        let a = vec![art("https://a.cl/1", "Uno", "Emol", None)];
        let b = vec![art("https://a.cl/1", "Otro titular", "T13", None)];
        let c = vec![art("https://a.cl/2", "Uno", "Emol", None)];
        assert_eq!(cache_key(&a), cache_key(&b));
        assert_ne!(cache_key(&a), cache_key(&c));
        assert_eq!(cache_key(&a).len(), 64);
    }

    #[tokio::test]
    async fn cache_hits_do_not_call_provider() {
        let calls = Arc::new(AtomicU32::new(0));
        let analyst = CachingAnalyst::new(
            CountingProvider {
                calls: calls.clone(),
                reply: r#"{"ok": true}"#.into(),
            },
            5,
        );
        let arts = vec![art("https://a.cl/1", "Uno", "Emol", None)];
        assert!(analyst.analyze(&arts).await.is_some());
        assert!(analyst.analyze(&arts).await.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(analyst.calls_today(), 1);
    }

    #[tokio::test]
    async fn daily_limit_blocks_fresh_calls() {
        let calls = Arc::new(AtomicU32::new(0));
        let analyst = CachingAnalyst::new(
            CountingProvider {
                calls: calls.clone(),
                reply: r#"{"ok": true}"#.into(),
            },
            1,
        );
        let first = vec![art("https://a.cl/1", "Uno", "Emol", None)];
        let second = vec![art("https://a.cl/2", "Dos", "Emol", None)];
        assert!(analyst.analyze(&first).await.is_some());
        assert!(analyst.analyze(&second).await.is_none());
        // cached entry still served past the limit
        assert!(analyst.analyze(&first).await.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unusable_answer_is_none_and_not_cached() {
        let calls = Arc::new(AtomicU32::new(0));
        let analyst = CachingAnalyst::new(
            CountingProvider {
                calls: calls.clone(),
                reply: "lo siento, no puedo".into(),
            },
            5,
        );
        let arts = vec![art("https://a.cl/1", "Uno", "Emol", None)];
        assert!(analyst.analyze(&arts).await.is_none());
        assert!(analyst.analyze(&arts).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_cluster_is_none() {
        let analyst = CachingAnalyst::new(MockProvider::default(), 5);
        assert!(analyst.analyze(&[]).await.is_none());
    }

    #[tokio::test]
    async fn disabled_returns_none() {
        let arts = vec![art("https://a.cl/1", "Uno", "Emol", None)];
        assert!(DisabledAnalyst.analyze(&arts).await.is_none());
        assert_eq!(DisabledAnalyst.provider_name(), "disabled");
    }

    #[test]
    fn gemini_requires_key() {
        assert!(GeminiProvider::new("  ", "gemini-2.0-flash").is_err());
    }
}
