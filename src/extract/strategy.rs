//! Selector strategies for the two generations of Hansard markup.
//!
//! Hansard pages have been published with two different structures over the
//! years. Rather than forking the extraction code, each structure is described
//! by a [`SelectorStrategy`] value: which paragraphs to visit and which class
//! fragments mark speeches and headings. [`STRATEGIES`] lists them in the order
//! they are tried.

use crate::models::{ContentItem, StrategyId};
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Non-heading items at or below this many characters are dropped as noise.
pub const MIN_ITEM_CHARS: usize = 10;

static STRONG: Lazy<Selector> = Lazy::new(|| Selector::parse("strong").expect("static selector"));
static TIME_ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[name*="time_"]"#).expect("static selector"));

/// Strategies in the order they are tried; the first to yield items wins.
pub static STRATEGIES: Lazy<Vec<SelectorStrategy>> = Lazy::new(|| {
    vec![
        SelectorStrategy::new(
            StrategyId::Modern,
            "ul.hansard__level li div.body-text div.section p",
            &["Speech", "Question", "Answer"],
            &["Debate", "Subject"],
        ),
        SelectorStrategy::new(
            StrategyId::Legacy,
            "p.Speech, p.Interjection, p.ContinueSpeech, p.SubsQuestion, p.SubsAnswer, p.SupQuestion, p.SupAnswer",
            &["Speech", "Interjection", "Question", "Answer"],
            &[],
        ),
    ]
});

/// How to find and classify transcript paragraphs for one markup generation.
#[derive(Debug)]
pub struct SelectorStrategy {
    pub id: StrategyId,
    paragraphs: Selector,
    /// Class fragments marking a paragraph that opens with a bold speaker name.
    speech_classes: &'static [&'static str],
    /// Class fragments marking a debate or subject heading.
    heading_classes: &'static [&'static str],
}

/// How a single paragraph was classified.
#[derive(Debug, PartialEq)]
enum Paragraph {
    Speech {
        speaker: String,
        text: String,
        timestamp: Option<String>,
    },
    Heading(String),
    General(String),
}

impl SelectorStrategy {
    fn new(
        id: StrategyId,
        paragraphs: &'static str,
        speech_classes: &'static [&'static str],
        heading_classes: &'static [&'static str],
    ) -> Self {
        Self {
            id,
            paragraphs: Selector::parse(paragraphs).expect("static selector"),
            speech_classes,
            heading_classes,
        }
    }

    /// Collect every recognised paragraph in document order.
    pub fn extract_items(&self, document: &Html) -> Vec<ContentItem> {
        document
            .select(&self.paragraphs)
            .filter_map(|p| self.item_for(p))
            .collect()
    }

    fn item_for(&self, p: ElementRef<'_>) -> Option<ContentItem> {
        let class = p.value().attr("class").unwrap_or("").trim();
        let kind = if class.is_empty() { "general" } else { class }.to_string();

        match self.classify(p, class)? {
            Paragraph::Speech { speaker, text, timestamp } => {
                (text.chars().count() > MIN_ITEM_CHARS).then(|| ContentItem {
                    speaker,
                    text,
                    kind,
                    is_heading: false,
                    timestamp,
                })
            }
            Paragraph::Heading(text) => Some(ContentItem {
                speaker: String::new(),
                text,
                kind,
                is_heading: true,
                timestamp: None,
            }),
            Paragraph::General(text) => {
                (text.chars().count() > MIN_ITEM_CHARS).then(|| ContentItem {
                    speaker: String::new(),
                    text,
                    kind,
                    is_heading: false,
                    timestamp: None,
                })
            }
        }
    }

    fn classify(&self, p: ElementRef<'_>, class: &str) -> Option<Paragraph> {
        let text = collapse_whitespace(&p.text().collect::<String>());
        if text.is_empty() {
            return None;
        }

        let speech_like = self.speech_classes.iter().any(|c| class.contains(c));
        if speech_like {
            if let Some(bold) = p.select(&STRONG).next() {
                let bold = collapse_whitespace(&bold.text().collect::<String>());
                let speaker = bold.trim_end_matches(':').trim_end().to_string();
                if !speaker.is_empty() {
                    let timestamp = p
                        .select(&TIME_ANCHOR)
                        .next()
                        .and_then(|a| a.value().attr("name"))
                        .map(str::to_string);
                    return Some(Paragraph::Speech {
                        speaker,
                        text: strip_speaker(&text, &bold),
                        timestamp,
                    });
                }
            }
        }

        if self.heading_classes.iter().any(|c| class.contains(c)) {
            return Some(Paragraph::Heading(text));
        }

        Some(Paragraph::General(text))
    }
}

/// Remove the bold speaker name and one following colon from the front of `text`.
fn strip_speaker(text: &str, bold: &str) -> String {
    let rest = text.replacen(bold, "", 1);
    let rest = rest.trim();
    rest.strip_prefix(':').unwrap_or(rest).trim_start().to_string()
}
