//! Demo: cluster a JSON array of news items and print the display-ready clusters.
//!
//! Usage: `cluster_demo [items.json | --fetch <scope> [--q <query>]] [--analyze]`
//! (reads stdin when neither a path nor `--fetch` is given; `--fetch` needs `NEWS_API_KEY`).

use std::io::Read;

use anyhow::Context;
use news_nexus::analyst::{build_analyst_from_config, ClusterAnalyst};
use news_nexus::config::analyst::AnalystConfig;
use news_nexus::ingest::providers::newsapi::{FetchScope, NewsApiProvider};
use news_nexus::ingest::{run_once, types::SourceProvider};
use news_nexus::{NewsItem, NexusConfig, StoryEngine};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nexus=info,ingest=info,analyst=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();

    let mut analyze = false;
    let mut path = None;
    let mut scope: Option<FetchScope> = None;
    let mut query = String::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--analyze" => analyze = true,
            "--fetch" => {
                let s = args.next().context("--fetch needs a scope")?;
                scope = Some(s.parse()?);
            }
            "--q" => query = args.next().context("--q needs a query")?,
            _ => path = Some(arg),
        }
    }

    let items: Vec<NewsItem> = match scope {
        Some(scope) => {
            let provider = NewsApiProvider::from_env(scope)?.with_query(&query);
            let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(provider)];
            run_once(&providers).await.0
        }
        None => {
            let raw = match &path {
                Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {p}"))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading stdin")?;
                    buf
                }
            };
            serde_json::from_str(&raw).context("input must be a JSON array of news items")?
        }
    };

    let engine = StoryEngine::new(NexusConfig::load()?);
    let run = engine.run_with_stats(items);
    println!("{}", serde_json::to_string_pretty(&run.clusters)?);

    if analyze {
        let cfg = AnalystConfig::load_default()?;
        let analyst = build_analyst_from_config(&cfg);
        match run.clusters.first() {
            Some(c) => match analyst.analyze(&c.items).await {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => eprintln!("no analysis ({})", analyst.provider_name()),
            },
            None => eprintln!("nothing to analyze"),
        }
    }

    Ok(())
}
