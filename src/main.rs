//! nfratings - ratings badges for streaming title pages
//!
//! Looks up IMDb and Rotten Tomatoes ratings for a title, or runs the
//! detection pipeline over a saved page snapshot.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nfratings::cache::{FileStore, MemoryStore, RatingsCache};
use nfratings::cli::{default_log_filter, Cli, Commands};
use nfratings::config::Config;
use nfratings::data::{OmdbClient, RatingsFetcher};
use nfratings::page::badge::build_badge;
use nfratings::page::title::sanitize;
use nfratings::page::{Document, Page};
use nfratings::{ChangeDetector, PipelineOutcome};

/// Opens the persisted cache, falling back to memory when no cache dir exists
fn open_cache(config: &Config) -> RatingsCache {
    match FileStore::new() {
        Some(store) => RatingsCache::load(store, config),
        None => {
            warn!("no cache directory available, ratings will not persist");
            RatingsCache::load(MemoryStore::new(), config)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(cli.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("nfratings loaded");

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::default();
    let fetcher = RatingsFetcher::new(OmdbClient::new(&config), open_cache(&config));

    match cli.command {
        Commands::Lookup { title } => {
            let title = sanitize(&title);
            match fetcher.fetch(&title).await {
                Some(record) => {
                    let badge = build_badge(&record.imdb(), record.rotten_tomatoes());
                    println!("{}", badge.text_content());
                }
                None => {
                    eprintln!("No ratings available for '{}'", title);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Render { page, output } => {
            let page = Page::new(Document::from_file(&page)?);
            let detector = ChangeDetector::new(page.clone(), fetcher, &config)?;

            match detector.evaluate() {
                None => println!("No title found on page"),
                Some(run) => match run.await? {
                    PipelineOutcome::Rendered => {
                        println!("{}", detector.badge_text().unwrap_or_default());
                    }
                    PipelineOutcome::NoRatings => println!("No ratings available"),
                    PipelineOutcome::NoAnchor => println!("Metadata container not found on page"),
                    PipelineOutcome::Stale => println!("Page changed before ratings arrived"),
                },
            }

            if let Some(output) = output {
                let json = page.with(|doc| serde_json::to_string_pretty(doc.body()))?;
                fs::write(output, json)?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
