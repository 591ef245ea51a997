//! New Zealand Parliament Hansard scraper.
//!
//! Transcripts are published in two URL shapes:
//!
//! - `.../combined/HansD_{YYYYMMDD}_{YYYYMMDD}`: a whole sitting day
//! - `.../combined/HansDeb_{YYYYMMDD}_{YYYYMMDD}_{HH}`: one sitting hour
//!
//! The debates listing page, filtered to a date range, links to whichever
//! exist. When the listing has nothing for a date, the canonical whole-day
//! URL is tried directly.

use crate::extract::extract;
use crate::models::ParsedArticle;
use crate::scrapers::fetcher::Fetcher;
use crate::utils::{compact_date, expand_compact_date};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static HANS_D: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"HansD_(\d{8})_(\d{8})").expect("static regex"));
static HANS_DEB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"HansDeb_(\d{8})_(\d{8})").expect("static regex"));
static HOUR_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(\d{2})$").expect("static regex"));

/// Transcript links discovered for one sitting date.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DateLinks {
    /// Whole-day transcript, preferred when present.
    pub hans_d: Option<String>,
    /// Per-hour transcripts in listing order.
    pub hans_deb: Vec<String>,
}

/// One page to fetch for a date.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptLink {
    pub url: String,
    /// `HH` of a per-hour page.
    pub hour: Option<String>,
}

impl TranscriptLink {
    fn new(url: String) -> Self {
        let hour = HOUR_SUFFIX
            .captures(url.trim_end_matches('/'))
            .map(|c| c[1].to_string());
        Self { url, hour }
    }
}

/// The debates listing URL filtered to `start..=end`.
pub fn listing_url(base_url: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}/en/pb/hansard-debates/rhr/?criteria.Timeframe=range&criteria.DateFrom={}&criteria.DateTo={}",
        base_url.trim_end_matches('/'),
        start,
        end
    )
}

/// The canonical whole-day transcript URL for `date`.
pub fn day_url(base_url: &str, date: NaiveDate) -> String {
    let d = compact_date(date);
    format!(
        "{}/en/pb/hansard-debates/rhr/combined/HansD_{d}_{d}",
        base_url.trim_end_matches('/')
    )
}

/// Group the transcript links of a listing page by sitting date.
///
/// Relative hrefs are resolved against `base_url`; hrefs that cannot be
/// resolved, or whose date segment is not a real date, are ignored.
pub fn parse_listing(html: &str, base_url: &str) -> Result<BTreeMap<NaiveDate, DateLinks>, Box<dyn Error>> {
    let base = Url::parse(base_url)?;
    let document = Html::parse_document(html);
    let mut dates: BTreeMap<NaiveDate, DateLinks> = BTreeMap::new();

    for element in document.select(&LINKS) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let (captures, whole_day) = if let Some(c) = HANS_DEB.captures(href) {
            (c, false)
        } else if let Some(c) = HANS_D.captures(href) {
            (c, true)
        } else {
            continue;
        };
        let Some(date) = expand_compact_date(&captures[1]) else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };

        let entry = dates.entry(date).or_default();
        if whole_day {
            entry.hans_d = Some(resolved.to_string());
        } else if !entry.hans_deb.contains(&resolved.to_string()) {
            entry.hans_deb.push(resolved.to_string());
        }
    }

    Ok(dates)
}

/// Pages to fetch for `date`: the whole-day link, else the hourly links, else
/// the canonical whole-day URL.
pub fn links_for(
    date: NaiveDate,
    index: &BTreeMap<NaiveDate, DateLinks>,
    base_url: &str,
) -> Vec<TranscriptLink> {
    match index.get(&date) {
        Some(DateLinks { hans_d: Some(url), .. }) => vec![TranscriptLink::new(url.clone())],
        Some(DateLinks { hans_deb, .. }) if !hans_deb.is_empty() => {
            hans_deb.iter().cloned().map(TranscriptLink::new).collect()
        }
        _ => vec![TranscriptLink::new(day_url(base_url, date))],
    }
}

/// Fetch the listing page for `start..=end` and index its transcript links.
///
/// A failed listing fetch is not fatal: callers fall back to canonical URLs.
#[instrument(level = "info", skip(fetcher, base_url))]
pub async fn index_dates(
    fetcher: &Fetcher,
    base_url: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<NaiveDate, DateLinks> {
    let url = listing_url(base_url, start, end);
    info!(%url, "Checking Hansard listing");

    let html = match fetcher.fetch(&url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, "Listing fetch failed; using canonical transcript URLs");
            return BTreeMap::new();
        }
    };

    match parse_listing(&html, base_url) {
        Ok(index) => {
            info!(dates = index.len(), "Indexed Hansard transcript links");
            debug!(?index, "Hansard links");
            index
        }
        Err(e) => {
            error!(error = %e, "Could not parse listing page");
            BTreeMap::new()
        }
    }
}

/// Fetch and extract every page for one date, in order.
///
/// Failed fetches and pages with no recognisable content are logged and
/// skipped without failing the date.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn fetch_transcripts(
    fetcher: &Fetcher,
    date: NaiveDate,
    links: &[TranscriptLink],
) -> Vec<ParsedArticle> {
    let date_str = date.to_string();
    let mut articles = Vec::new();

    for link in links {
        match fetcher.fetch(&link.url).await {
            Ok(html) => {
                let article = extract(&html, &date_str, link.hour.as_deref());
                if article.is_empty() {
                    info!(url = %link.url, "No content found on transcript page");
                    continue;
                }
                info!(
                    url = %link.url,
                    items = article.content.len(),
                    topics = article.topic_summaries.len(),
                    strategy = ?article.strategy,
                    "Fetched transcript"
                );
                articles.push(article);
            }
            Err(e) if e.is_not_found() => {
                info!(url = %link.url, error = %e, "Skipped missing transcript");
            }
            Err(e) => {
                error!(url = %link.url, error = %e, "Transcript fetch failed");
            }
        }
    }

    articles
}
