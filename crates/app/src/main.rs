//! rebrowse entry point.
//!
//! Runs the list/detail flow headlessly: searches, prints the results,
//! warms the image cache and optionally opens one record's detail screen.
//! Logging goes to stderr so stdout carries only program output.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rebrowse_app::{AppCoordinator, Coordinator, NavigationSurface, Screen, Services};
use rebrowse_client::{CacheConfig, FetchCache, FetchClient, FetchConfig, GithubClient, GithubConfig};
use rebrowse_core::AppConfig;

/// Search GitHub repositories and browse the results.
#[derive(Debug, Parser)]
#[command(name = "rebrowse", version)]
struct Cli {
    /// Search query, e.g. "rust language:rust".
    query: String,

    /// Open the detail screen of the result at this index.
    #[arg(long)]
    open: Option<usize>,

    /// Number of leading rows whose images are prefetched.
    #[arg(long, default_value_t = 10)]
    prefetch: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;

    let transport = FetchClient::new(FetchConfig::from(&config))?;
    let images = FetchCache::new(Arc::new(transport), CacheConfig::from(&config));
    let query = GithubClient::new(GithubConfig::from(&config))?;

    let surface = NavigationSurface::new();
    let app = AppCoordinator::new(surface.clone(), Services { query: Arc::new(query), images: images.clone() });
    app.start();

    let list = app.list_controller().context("list screen was not presented")?;

    list.search(&cli.query).await;
    let state = list.state();
    if let Some(e) = &state.input_error {
        bail!("{e}; enter some search text");
    }
    if let Some(e) = &state.query_error {
        bail!("search failed: {e}");
    }

    println!("{}", serde_json::to_string_pretty(&state.records)?);

    let issued = list.prefetch(0..cli.prefetch);
    tracing::info!(issued, "prefetching row images");

    if let Some(index) = cli.open {
        if !list.select(index) {
            bail!("no result at index {index} ({} results)", state.records.len());
        }

        let Some(Screen::Detail(detail)) = surface.top().map(|entry| entry.screen) else {
            bail!("detail screen was not presented");
        };

        let loaded = detail.loaded().await;
        println!("{}", loaded.full_name_text);
        if !loaded.description_text.is_empty() {
            println!("{}", loaded.description_text);
        }
        for line in [
            &loaded.language_text,
            &loaded.stars_text,
            &loaded.watchers_text,
            &loaded.forks_text,
            &loaded.issues_text,
        ] {
            if !line.is_empty() {
                println!("  {line}");
            }
        }
        match (&loaded.image, &loaded.image_error) {
            (Some(bytes), _) => println!("  avatar: {} bytes", bytes.len()),
            (None, Some(e)) => println!("  avatar unavailable: {e}"),
            (None, None) => {}
        }

        detail.dismiss();
    }

    tracing::info!(stats = ?images.stats(), cached = images.len(), "done");

    Ok(())
}
