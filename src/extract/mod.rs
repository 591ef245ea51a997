//! Hansard transcript extraction.
//!
//! Turns a raw transcript page into a [`ParsedArticle`]:
//!
//! 1. Try each [`strategy::STRATEGIES`] entry in order until one yields items
//! 2. Group the items into topics with [`segment::segment`]
//! 3. Derive headline, summary, conclusion, tags and `fullContent`
//!
//! Extraction never fails. A page neither strategy recognises yields an
//! article with no content, which callers treat as "nothing published".

pub mod segment;
pub mod strategy;

use crate::models::{ContentItem, ParsedArticle, StrategyId};
use crate::utils::{collapse_whitespace, truncate_chars};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

pub use segment::segment;

const SUMMARY_MIN_CHARS: usize = 50;
const SUMMARY_MAX_CHARS: usize = 200;
const CONCLUSION_MIN_CHARS: usize = 20;
const CONCLUSION_WINDOW: usize = 3;

static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("static selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("static selector"));
static KEYWORDS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="keywords"]"#).expect("static selector"));

/// Parse one transcript page.
///
/// # Arguments
///
/// * `html` - The raw page HTML
/// * `date` - The sitting date, `YYYY-MM-DD`
/// * `hour_suffix` - The `HH` of a per-hour page, used only in the synthesized headline
pub fn extract(html: &str, date: &str, hour_suffix: Option<&str>) -> ParsedArticle {
    let document = Html::parse_document(html);
    let (strategy, content) = extract_items(&document);
    debug!(
        items = content.len(),
        strategy = ?strategy,
        "Extracted transcript items"
    );

    ParsedArticle {
        headline: headline(&document, date, hour_suffix),
        publication_date: date.to_string(),
        summary: summary(&content),
        topic_summaries: segment(&content),
        conclusion: conclusion(&content),
        tags: keywords(&document),
        full_content: full_content(&content),
        content,
        strategy,
    }
}

fn extract_items(document: &Html) -> (Option<StrategyId>, Vec<ContentItem>) {
    for strategy in strategy::STRATEGIES.iter() {
        let items = strategy.extract_items(document);
        if !items.is_empty() {
            return (Some(strategy.id), items);
        }
        debug!(strategy = %strategy.id, "Strategy matched no paragraphs");
    }
    (None, Vec::new())
}

/// First non-empty of `<h1>`, `<title>`, then `Hansard Debate {date}[ {hh}]`.
fn headline(document: &Html, date: &str, hour_suffix: Option<&str>) -> String {
    [&*H1, &*TITLE]
        .into_iter()
        .filter_map(|sel| document.select(sel).next())
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| match hour_suffix {
            Some(hh) => format!("Hansard Debate {date} {hh}"),
            None => format!("Hansard Debate {date}"),
        })
}

fn summary(content: &[ContentItem]) -> String {
    content
        .iter()
        .find(|item| item.text.chars().count() > SUMMARY_MIN_CHARS)
        .map(|item| format!("{}...", truncate_chars(&item.text, SUMMARY_MAX_CHARS)))
        .unwrap_or_default()
}

fn conclusion(content: &[ContentItem]) -> String {
    let window = &content[content.len().saturating_sub(CONCLUSION_WINDOW)..];
    window
        .iter()
        .find(|item| item.text.chars().count() > CONCLUSION_MIN_CHARS)
        .map(|item| item.text.clone())
        .unwrap_or_default()
}

fn keywords(document: &Html) -> Vec<String> {
    document
        .select(&KEYWORDS)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| {
            content
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn full_content(content: &[ContentItem]) -> String {
    content.iter().map(ContentItem::line).collect::<Vec<_>>().join("\n\n")
}
