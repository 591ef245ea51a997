//! Transcript discovery and retrieval.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Indexing**: Discover transcript URLs for a date range from the
//!    Hansard debates listing ([`hansard::index_dates`])
//! 2. **Fetching**: Download each page and extract it
//!    ([`hansard::fetch_transcripts`])
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`hansard`] | Listing parsing, URL shapes, per-date fetch + extract |
//! | [`fetcher`] | Headless-browser fetch with direct HTTP fallback |
//!
//! Failed fetches are logged and skipped; processing moves on to the next
//! page or date.

pub mod fetcher;
pub mod hansard;
