//! # Paperboy
//!
//! Turns New Zealand Parliament Hansard transcripts into plain-language,
//! news-style articles.
//!
//! ## Features
//!
//! - Discovers whole-day and per-hour Hansard transcripts for a date range
//! - Extracts speeches, headings and topics from both the current and the
//!   older transcript page layouts
//! - Rewrites each sitting day as a structured JSON article through one of
//!   several LLM providers (awful_aj, Gemini, OpenAI, Anthropic, xAI,
//!   OpenRouter), publishing the raw extraction when no LLM succeeds
//! - Maintains `index.json` and `sitemap.xml` for the static frontend
//!
//! ## Usage
//!
//! ```sh
//! paperboy scrape 2025-08-18 2025-08-22 --provider google
//! paperboy summarize
//! paperboy sitemap --base-url https://paperboy.nz
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Indexing**: Find transcript URLs for each sitting date
//! 2. **Fetching**: Download each page (headless browser, then direct HTTP)
//! 3. **Extraction**: Parse speeches and topics into a `ParsedArticle`
//! 4. **Processing**: Send the day's pages to an LLM (one date at a time)
//! 5. **Output**: Write raw and processed JSON, then refresh the index

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod errors;
mod extract;
mod models;
mod outputs;
mod pipeline;
mod prompt;
mod providers;
mod scrapers;
mod utils;

use cli::{Cli, Command};
use config::Settings;
use outputs::{indexes, sitemap};
use pipeline::{LlmMode, llm_mode, scrape_range, summarize_raw};
use providers::ProviderRegistry;
use scrapers::fetcher::Fetcher;
use utils::{ensure_writable_dir, parse_date};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("paperboy starting up");

    let args = Cli::parse();
    debug!(command = ?args.command, "Parsed CLI arguments");

    let settings = Settings::load(args.config.as_deref().map(Path::new))?.apply_cli(&args);

    if let Err(e) = run(&args.command, &settings).await {
        error!(error = %e, "Command failed");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

async fn run(command: &Command, settings: &Settings) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Scrape { start, end, no_llm } => {
            let (start, end) = (parse_date(start)?, parse_date(end)?);
            prepare_dirs(settings).await?;
            let fetcher = Fetcher::from_settings(settings)?;

            let registry = if *no_llm {
                ProviderRegistry::default()
            } else {
                ProviderRegistry::resolve_all(settings).await?
            };
            let llm = llm_mode(registry.get(&settings.default_provider), *no_llm);
            scrape_range(settings, &fetcher, start, end, &llm).await?;
        }
        Command::Summarize { file } => {
            let registry = ProviderRegistry::resolve_all(settings).await?;
            let client = registry.get(&settings.default_provider)?;
            ensure_writable_dir(&settings.output_dir).await?;
            summarize_raw(settings, file.as_deref(), client).await?;
        }
        Command::Both { start, end } => {
            let (start, end) = (parse_date(start)?, parse_date(end)?);
            let registry = ProviderRegistry::resolve_all(settings).await?;
            let client = registry.get(&settings.default_provider)?;
            prepare_dirs(settings).await?;
            let fetcher = Fetcher::from_settings(settings)?;

            let raw_only: LlmMode<'_> = LlmMode::Disabled;
            scrape_range(settings, &fetcher, start, end, &raw_only).await?;
            summarize_raw(settings, None, client).await?;
        }
        Command::Index => {
            let files = indexes::update_news_index(&settings.output_dir).await?;
            info!(count = files.len(), "Index refreshed");
        }
        Command::Sitemap { base_url } => {
            let base_url = base_url.as_deref().unwrap_or(&settings.site_base_url);
            sitemap::generate_sitemap(
                &settings.output_dir,
                base_url,
                &settings.sitemap_path,
                Utc::now().date_naive(),
            )
            .await?;
        }
    }
    Ok(())
}

/// Fail fast, before any network work, if either output directory is unusable.
async fn prepare_dirs(settings: &Settings) -> Result<(), Box<dyn Error>> {
    for dir in [&settings.output_dir, &settings.raw_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }
    Ok(())
}
