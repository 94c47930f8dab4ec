//! # Story Engine
//! Pure, synchronous pipeline: classify → cluster → detect blindspots → diversity filter.
//! No I/O; one invocation owns its clusters and shares only the read-only leaning table.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::article::{Article, NewsItem};
use crate::blindspot::detect_blindspots;
use crate::cluster::{cluster_articles, Cluster};
use crate::config::NexusConfig;
use crate::diversity::apply_diversity_filter;
use crate::leaning::{default_table, LeaningTable};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("nexus_articles_total", "Articles classified by the engine.");
        describe_counter!("nexus_clusters_total", "Clusters formed before filtering.");
        describe_counter!("nexus_blindspots_total", "Clusters flagged as blindspots.");
        describe_counter!(
            "nexus_diversity_fallback_total",
            "Runs where the diversity filter returned the unfiltered list."
        );
    });
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub articles: usize,
    pub clusters: usize,
    pub blindspots: usize,
    pub kept: usize,
    pub fell_back: bool,
}

#[derive(Debug)]
pub struct PipelineRun {
    pub clusters: Vec<Cluster>,
    pub stats: RunStats,
}

#[derive(Debug, Clone)]
pub struct StoryEngine<'a> {
    table: &'a LeaningTable,
    config: NexusConfig,
}

impl StoryEngine<'static> {
    /// Engine over the built-in leaning table.
    pub fn new(config: NexusConfig) -> Self {
        Self {
            table: default_table(),
            config,
        }
    }
}

impl Default for StoryEngine<'static> {
    fn default() -> Self {
        Self::new(NexusConfig::default())
    }
}

impl<'a> StoryEngine<'a> {
    /// Engine over a caller-provided table (e.g. loaded from JSON).
    pub fn with_table(table: &'a LeaningTable, config: NexusConfig) -> Self {
        Self { table, config }
    }

    pub fn config(&self) -> &NexusConfig {
        &self.config
    }

    /// Attach a leaning label to every item.
    pub fn classify(&self, items: Vec<NewsItem>) -> Vec<Article> {
        items
            .into_iter()
            .map(|it| Article::classify(it, self.table))
            .collect()
    }

    /// Full pipeline; returns display-ready clusters.
    pub fn run(&self, items: Vec<NewsItem>) -> Vec<Cluster> {
        self.run_with_stats(items).clusters
    }

    /// Full pipeline with run counters.
    pub fn run_with_stats(&self, items: Vec<NewsItem>) -> PipelineRun {
        ensure_metrics_described();
        let articles = self.classify(items);
        let n_articles = articles.len();

        let mut clusters =
            cluster_articles(articles, &self.config.clustering, &self.config.locality);
        let n_clusters = clusters.len();

        let blindspots = detect_blindspots(&mut clusters);
        let outcome = apply_diversity_filter(clusters, &self.config.diversity);

        let stats = RunStats {
            articles: n_articles,
            clusters: n_clusters,
            blindspots,
            kept: outcome.clusters.len(),
            fell_back: outcome.fell_back,
        };

        // Telemetry
        counter!("nexus_articles_total").increment(n_articles as u64);
        counter!("nexus_clusters_total").increment(n_clusters as u64);
        counter!("nexus_blindspots_total").increment(blindspots as u64);
        if outcome.fell_back {
            counter!("nexus_diversity_fallback_total").increment(1);
        }

        info!(
            target: "nexus",
            articles = stats.articles,
            clusters = stats.clusters,
            blindspots = stats.blindspots,
            kept = stats.kept,
            fell_back = stats.fell_back,
            "pipeline run"
        );

        PipelineRun {
            clusters: outcome.clusters,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blindspot::BlindspotSide;
    use crate::leaning::Leaning;

    fn item(url: &str, title: &str, source: &str, at: &str) -> NewsItem {
        NewsItem {
            url: url.into(),
            title: title.into(),
            source: source.into(),
            published_at: at.into(),
            description: None,
            url_to_image: None,
        }
    }

    #[test]
    fn empty_in_empty_out() {
        let run = StoryEngine::default().run_with_stats(Vec::new());
        assert!(run.clusters.is_empty());
        assert_eq!(run.stats, RunStats::default());
    }

    #[test]
    fn stats_reflect_each_stage() {
        let items = vec![
            item("https://a.cl/1", "Senado aprueba reforma de pensiones", "Emol", "2025-05-01T10:00:00Z"),
            item("https://b.cl/2", "Senado aprueba reforma de pensiones", "La Tercera", "2025-05-01T11:00:00Z"),
            item("https://c.cl/3", "Lluvias en Valdivia dejan damnificados", "El Mostrador", "2025-05-01T11:00:00Z"),
        ];
        let run = StoryEngine::default().run_with_stats(items);
        assert_eq!(run.stats.articles, 3);
        assert_eq!(run.stats.clusters, 2);
        assert_eq!(run.stats.blindspots, 2);
        assert_eq!(run.stats.kept, 1);
        assert!(!run.stats.fell_back);

        let c = &run.clusters[0];
        assert_eq!(c.blindspot_side, Some(BlindspotSide::Left));
        assert_eq!(c.bias_distribution.get(Leaning::Right), 1);
        assert_eq!(c.bias_distribution.get(Leaning::CenterRight), 1);
    }

    #[test]
    fn custom_table_is_used() {
        let mut table = LeaningTable::default_seed();
        table.outlets.insert("Diario Local".into(), Leaning::Left);
        let engine = StoryEngine::with_table(&table, NexusConfig::default());
        let out = engine.classify(vec![item("https://d.cl", "x", "Diario Local", "2025-05-01")]);
        assert_eq!(out[0].leaning, Leaning::Left);
    }
}
