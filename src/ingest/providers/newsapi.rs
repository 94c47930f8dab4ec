// src/ingest/providers/newsapi.rs
//! NewsAPI.org provider with balanced fetching: the left-leaning and the right/center
//! domain sets of a scope are queried separately and concatenated, so both sides are
//! represented before clustering. A scope that returns nothing (and has no query) falls
//! back to that scope's top headlines.

use std::{fmt, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::ingest::types::{RawArticle, SourceProvider};

pub const NEWS_API_BASE: &str = "https://newsapi.org/v2";
pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";

const PAGE_SIZE: u32 = 50;

const CHILE_LEFT: &[&str] = &[
    "elmostrador.cl",
    "eldesconcierto.cl",
    "theclinic.cl",
    "elciudadano.com",
    "laizquierdadiario.cl",
    "cooperativa.cl",
    "cnnchile.com",
    "radio.uchile.cl",
    "interferencia.cl",
];
const CHILE_RIGHT_CENTER: &[&str] = &[
    "latercera.com",
    "biobiochile.cl",
    "emol.com",
    "24horas.cl",
    "t13.cl",
    "radioagricultura.cl",
    "adnradio.cl",
    "meganoticias.cl",
];
const INTL_LEFT: &[&str] = &["elpais.com", "rt.com", "pagina12.com.ar", "eldiario.es"];
const INTL_RIGHT_CENTER: &[&str] = &[
    "infobae.com",
    "clarin.com",
    "lanacion.com.ar",
    "elmundo.es",
    "lavanguardia.com",
    "abc.es",
    "cnn.com",
    "bbc.com",
    "dw.com",
];
const ANGLO_LEFT: &[&str] = &[
    "nytimes.com",
    "cnn.com",
    "theguardian.com",
    "washingtonpost.com",
    "aljazeera.com",
    "msnbc.com",
];
const ANGLO_RIGHT_CENTER: &[&str] = &[
    "foxnews.com",
    "bbc.co.uk",
    "reuters.com",
    "apnews.com",
    "usatoday.com",
    "bloomberg.com",
    "wsj.com",
    "nypost.com",
];

/// Which outlet universe to fetch from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchScope {
    /// Chilean outlets.
    #[default]
    #[serde(alias = "nacional")]
    National,
    /// Spanish-language international outlets.
    #[serde(alias = "internacional")]
    International,
    /// English-language outlets.
    Anglo,
}

impl FetchScope {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchScope::National => "national",
            FetchScope::International => "international",
            FetchScope::Anglo => "anglo",
        }
    }

    pub fn left_domains(self) -> &'static [&'static str] {
        match self {
            FetchScope::National => CHILE_LEFT,
            FetchScope::International => INTL_LEFT,
            FetchScope::Anglo => ANGLO_LEFT,
        }
    }

    pub fn right_center_domains(self) -> &'static [&'static str] {
        match self {
            FetchScope::National => CHILE_RIGHT_CENTER,
            FetchScope::International => INTL_RIGHT_CENTER,
            FetchScope::Anglo => ANGLO_RIGHT_CENTER,
        }
    }

    pub fn language(self) -> &'static str {
        match self {
            FetchScope::Anglo => "en",
            _ => "es",
        }
    }

    /// Query for the `top-headlines` fallback.
    pub fn fallback_params(self) -> Vec<(&'static str, String)> {
        match self {
            FetchScope::National => vec![("country", "cl".into()), ("pageSize", "40".into())],
            FetchScope::International => {
                vec![("language", "es".into()), ("pageSize", "60".into())]
            }
            FetchScope::Anglo => vec![("language", "en".into()), ("pageSize", "60".into())],
        }
    }
}

impl fmt::Display for FetchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "national" | "nacional" => Ok(FetchScope::National),
            "international" | "internacional" => Ok(FetchScope::International),
            "anglo" => Ok(FetchScope::Anglo),
            other => bail!("unknown fetch scope {other:?}"),
        }
    }
}

/// How far back the `everything` search reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Any,
    Hour,
    Day,
}

impl TimeRange {
    /// Lower bound relative to `now`; `None` for no bound.
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Any => None,
            TimeRange::Hour => Some(now - chrono::Duration::hours(1)),
            TimeRange::Day => Some(now - chrono::Duration::days(1)),
        }
    }
}

impl FromStr for TimeRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(TimeRange::Any),
            "hour" => Ok(TimeRange::Hour),
            "day" => Ok(TimeRange::Day),
            other => bail!("unknown time range {other:?}"),
        }
    }
}

/// Query for one `everything` request over a domain set.
pub fn everything_params(
    domains: &[&str],
    language: &str,
    query: Option<&str>,
    from: Option<DateTime<Utc>>,
) -> Vec<(&'static str, String)> {
    let mut params = Vec::with_capacity(6);
    if let Some(q) = query {
        params.push(("q", q.to_string()));
    }
    params.push(("domains", domains.join(",")));
    params.push(("language", language.to_string()));
    params.push(("sortBy", "publishedAt".to_string()));
    params.push(("pageSize", PAGE_SIZE.to_string()));
    if let Some(from) = from {
        params.push(("from", from.to_rfc3339_opts(SecondsFormat::Millis, true)));
    }
    params
}

/// Top headlines are only worth asking for when a plain (unfiltered) fetch came back empty.
pub fn needs_fallback(total: usize, query: Option<&str>) -> bool {
    total == 0 && query.is_none()
}

/// Decode a NewsAPI response body. Individual malformed articles are skipped.
pub fn parse_response(body: &str) -> Result<Vec<RawArticle>> {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(default)]
        status: String,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        articles: Vec<serde_json::Value>,
    }

    let env: Envelope = serde_json::from_str(body).context("decoding newsapi response")?;
    if env.status == "error" {
        return Err(anyhow!(
            "newsapi error {}: {}",
            env.code.as_deref().unwrap_or("unknown"),
            env.message.as_deref().unwrap_or("no message")
        ));
    }
    Ok(env
        .articles
        .into_iter()
        .filter_map(|a| serde_json::from_value::<RawArticle>(a).ok())
        .collect())
}

/// Balanced NewsAPI fetch for one scope.
pub struct NewsApiProvider {
    http: reqwest::Client,
    api_key: String,
    scope: FetchScope,
    query: Option<String>,
    time_range: TimeRange,
}

impl NewsApiProvider {
    pub fn new(api_key: &str, scope: FetchScope) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("empty newsapi key");
        }
        let http = reqwest::Client::builder()
            .user_agent("news-nexus/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building http client")?;
        Ok(Self {
            http,
            api_key: api_key.trim().to_string(),
            scope,
            query: None,
            time_range: TimeRange::Any,
        })
    }

    /// Key from `NEWS_API_KEY`.
    pub fn from_env(scope: FetchScope) -> Result<Self> {
        let key = std::env::var(ENV_NEWS_API_KEY)
            .with_context(|| format!("{ENV_NEWS_API_KEY} is not set"))?;
        Self::new(&key, scope)
    }

    /// Restrict to a free-text query; blank clears it.
    pub fn with_query(mut self, q: &str) -> Self {
        let q = q.trim();
        self.query = (!q.is_empty()).then(|| q.to_string());
        self
    }

    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    pub fn scope(&self) -> FetchScope {
        self.scope
    }

    async fn get(&self, endpoint: &str, params: &[(&'static str, String)]) -> Result<Vec<RawArticle>> {
        let resp = self
            .http
            .get(format!("{NEWS_API_BASE}/{endpoint}"))
            .header("X-Api-Key", &self.api_key)
            .query(params)
            .send()
            .await
            .with_context(|| format!("newsapi {endpoint} request"))?;
        let status = resp.status();
        let body = resp.text().await.context("reading newsapi body")?;
        if !status.is_success() {
            // error bodies carry a code and message; prefer those over the bare status
            return Err(parse_response(&body)
                .err()
                .unwrap_or_else(|| anyhow!("newsapi returned HTTP {status}")));
        }
        parse_response(&body)
    }

    /// One side of the balanced fetch. Failures are logged and yield nothing.
    async fn fetch_side(
        &self,
        side: &'static str,
        domains: &[&str],
        from: Option<DateTime<Utc>>,
    ) -> Vec<RawArticle> {
        let params = everything_params(
            domains,
            self.scope.language(),
            self.query.as_deref(),
            from,
        );
        match self.get("everything", &params).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    error = ?e,
                    scope = self.scope.as_str(),
                    side,
                    "newsapi side fetch failed"
                );
                counter!("ingest_provider_errors_total").increment(1);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SourceProvider for NewsApiProvider {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>> {
        let from = self.time_range.since(Utc::now());
        let (left, right) = tokio::join!(
            self.fetch_side("left", self.scope.left_domains(), from),
            self.fetch_side("right_center", self.scope.right_center_domains(), from),
        );
        tracing::info!(
            target: "ingest",
            scope = self.scope.as_str(),
            left = left.len(),
            right_center = right.len(),
            "balanced fetch"
        );

        let mut out = left;
        out.extend(right);

        if needs_fallback(out.len(), self.query.as_deref()) {
            tracing::info!(target: "ingest", scope = self.scope.as_str(), "empty balanced fetch, trying top headlines");
            out = self
                .get("top-headlines", &self.scope.fallback_params())
                .await?;
        }

        counter!("newsapi_articles_total", "scope" => self.scope.as_str())
            .increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn scope_accepts_spanish_names() {
        assert_eq!("nacional".parse::<FetchScope>().unwrap(), FetchScope::National);
        assert_eq!(" Internacional ".parse::<FetchScope>().unwrap(), FetchScope::International);
        assert_eq!("anglo".parse::<FetchScope>().unwrap(), FetchScope::Anglo);
        assert!("regional".parse::<FetchScope>().is_err());

        let s: FetchScope = serde_json::from_str(r#""internacional""#).unwrap();
        assert_eq!(s, FetchScope::International);
        assert_eq!(serde_json::to_string(&FetchScope::National).unwrap(), r#""national""#);
    }

    #[test]
    fn scopes_split_domains_by_side() {
        for scope in [FetchScope::National, FetchScope::International, FetchScope::Anglo] {
            assert!(!scope.left_domains().is_empty());
            assert!(!scope.right_center_domains().is_empty());
            for d in scope.left_domains() {
                assert!(!scope.right_center_domains().contains(d), "{scope}: {d}");
            }
        }
        assert!(FetchScope::National.left_domains().contains(&"elmostrador.cl"));
        assert!(FetchScope::National.right_center_domains().contains(&"latercera.com"));
        assert_eq!(FetchScope::Anglo.language(), "en");
        assert_eq!(FetchScope::National.language(), "es");
    }

    #[test]
    fn everything_params_join_domains_and_optional_fields() {
        let p = everything_params(&["a.cl", "b.cl"], "es", None, None);
        assert_eq!(param(&p, "domains"), Some("a.cl,b.cl"));
        assert_eq!(param(&p, "language"), Some("es"));
        assert_eq!(param(&p, "sortBy"), Some("publishedAt"));
        assert_eq!(param(&p, "pageSize"), Some("50"));
        assert_eq!(param(&p, "q"), None);
        assert_eq!(param(&p, "from"), None);

        let now = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let from = TimeRange::Hour.since(now);
        let p = everything_params(&["a.cl"], "es", Some("reforma"), from);
        assert_eq!(param(&p, "q"), Some("reforma"));
        assert_eq!(param(&p, "from"), Some("2025-05-01T11:00:00.000Z"));
    }

    #[test]
    fn time_range_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap();
        assert_eq!(TimeRange::Any.since(now), None);
        assert_eq!(
            TimeRange::Day.since(now),
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!("".parse::<TimeRange>().unwrap(), TimeRange::Any);
        assert_eq!("DAY".parse::<TimeRange>().unwrap(), TimeRange::Day);
    }

    #[test]
    fn fallback_only_for_empty_unfiltered_fetch() {
        assert!(needs_fallback(0, None));
        assert!(!needs_fallback(0, Some("sismo")));
        assert!(!needs_fallback(3, None));

        let p = FetchScope::National.fallback_params();
        assert_eq!(param(&p, "country"), Some("cl"));
        assert_eq!(param(&p, "pageSize"), Some("40"));
        let p = FetchScope::Anglo.fallback_params();
        assert_eq!(param(&p, "language"), Some("en"));
        assert_eq!(param(&p, "pageSize"), Some("60"));
    }

    #[test]
    fn parse_response_skips_malformed_articles() {
        let body = r#"{
          "status": "ok",
          "totalResults": 3,
          "articles": [
            {"source": {"id": null, "name": "La Tercera"}, "title": "Senado aprueba reforma - La Tercera",
             "url": "https://www.latercera.com/a", "publishedAt": "2025-05-01T10:00:00Z"},
            {"source": {"name": "Emol"}, "title": "sin url", "publishedAt": "2025-05-01T10:00:00Z"},
            {"source": {"name": "El Mostrador"}, "title": "Reforma en el Senado",
             "url": "https://www.elmostrador.cl/b", "publishedAt": "2025-05-01T11:00:00Z",
             "urlToImage": "https://img/b.jpg"}
          ]
        }"#;
        let arts = parse_response(body).unwrap();
        assert_eq!(arts.len(), 2);
        assert_eq!(arts[0].source.name.as_deref(), Some("La Tercera"));
        assert_eq!(arts[1].url_to_image.as_deref(), Some("https://img/b.jpg"));
    }

    #[test]
    fn parse_response_surfaces_api_errors() {
        let body = r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#;
        let err = parse_response(body).unwrap_err().to_string();
        assert!(err.contains("apiKeyInvalid"), "{err}");
        assert!(err.contains("invalid"), "{err}");
        assert!(parse_response("<html>").is_err());
    }

    #[test]
    fn provider_requires_key_and_trims_query() {
        assert!(NewsApiProvider::new("  ", FetchScope::National).is_err());
        let p = NewsApiProvider::new("k", FetchScope::Anglo)
            .unwrap()
            .with_query("   ")
            .with_time_range(TimeRange::Day);
        assert_eq!(p.query, None);
        assert_eq!(p.time_range, TimeRange::Day);
        assert_eq!(p.scope(), FetchScope::Anglo);
        assert_eq!(p.name(), "newsapi");

        let p = p.with_query(" sismo ");
        assert_eq!(p.query.as_deref(), Some("sismo"));
    }
}
