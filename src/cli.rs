//! Command-line interface definitions for Paperboy.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Global options can be provided via command-line flags or environment
//! variables and override the settings file.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Paperboy application.
///
/// # Examples
///
/// ```sh
/// # Scrape a week of sittings and summarize them with Gemini
/// paperboy scrape 2025-08-18 2025-08-22 --provider google
///
/// # Extract only, no LLM call
/// paperboy scrape 2025-08-19 2025-08-19 --no-llm
///
/// # Summarize one previously scraped raw file
/// paperboy summarize 20250819.json --provider openai
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "PAPERBOY_CONFIG")]
    pub config: Option<String>,

    /// Output directory for processed articles and index.json
    #[arg(short, long, global = true, env = "PAPERBOY_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Output directory for raw extraction files
    #[arg(short, long, global = true, env = "PAPERBOY_RAW_DIR")]
    pub raw_dir: Option<String>,

    /// AI provider: awful, google, openai, anthropic, xai (grok), openrouter
    #[arg(short = 'p', long = "provider", global = true, env = "DEFAULT_AI_PROVIDER")]
    pub default_provider: Option<String>,

    /// Headless browser content endpoint (Browserless-compatible)
    #[arg(long, global = true, env = "BROWSERLESS_URL")]
    pub browserless_url: Option<String>,

    /// Token for the headless browser endpoint
    #[arg(long, global = true, env = "BROWSERLESS_TOKEN", hide_env_values = true)]
    pub browserless_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Fetch and extract transcripts for a date range, then summarize each date
    Scrape {
        /// First sitting date, YYYY-MM-DD
        start: String,
        /// Last sitting date, YYYY-MM-DD
        end: String,
        /// Only write raw extraction output; skip the LLM
        #[arg(long)]
        no_llm: bool,
    },
    /// Summarize raw extraction files into news articles
    Summarize {
        /// A single raw file name (e.g. 20250819.json); all files when omitted
        file: Option<String>,
    },
    /// Scrape without the LLM, then summarize every raw file
    Both {
        start: String,
        end: String,
    },
    /// Rebuild index.json from the output directory
    Index,
    /// Write sitemap.xml from index.json
    Sitemap {
        /// Public site root, overriding the settings file
        #[arg(long)]
        base_url: Option<String>,
    },
}
