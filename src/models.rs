//! Data models for parsed Hansard transcripts and the articles written from them.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ContentItem`]: one paragraph of transcript text (speech, heading or general)
//! - [`TopicSegment`]: a run of items grouped under one debate heading
//! - [`ParsedArticle`]: the complete extraction result for one transcript page
//! - [`NewsArticle`]: the journalist-style article produced by the LLM
//!
//! The extraction models serialize with camelCase keys because the frontend and
//! the raw JSON files share that format. [`NewsArticle`] and its children use
//! camelCase field names directly to match the JSON schema given to the LLM,
//! hence the `#[allow(non_snake_case)]` attributes.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which selector strategy produced the items of a [`ParsedArticle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyId {
    /// Section-nested markup (`ul.hansard__level ... div.section p`).
    Modern,
    /// Paragraph-class markup (`p.Speech`, `p.SubsQuestion`, ...).
    Legacy,
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyId::Modern => f.write_str("modern"),
            StrategyId::Legacy => f.write_str("legacy"),
        }
    }
}

/// One paragraph-level unit of parsed transcript text.
///
/// An empty `speaker` means non-speech content such as a heading or a
/// procedural note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub speaker: String,
    pub text: String,
    /// The source paragraph's class attribute, or `general`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub is_heading: bool,
    /// Raw `time_...` anchor name, when the paragraph carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ContentItem {
    /// Render as a `speaker: text` line. Headings render with an empty speaker.
    pub fn line(&self) -> String {
        format!("{}: {}", self.speaker, self.text)
    }
}

/// A contiguous run of items grouped under one heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSegment {
    pub topic: String,
    pub content: String,
    /// Always empty after extraction; the LLM fills tags in later.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The complete extraction result for one transcript page.
///
/// Built once per fetched page by [`crate::extract::extract`] and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedArticle {
    pub headline: String,
    /// `YYYY-MM-DD`.
    pub publication_date: String,
    pub summary: String,
    pub topic_summaries: Vec<TopicSegment>,
    pub conclusion: String,
    pub tags: Vec<String>,
    pub content: Vec<ContentItem>,
    /// Every item as `speaker: text`, blank-line separated. Sent to the LLM verbatim.
    pub full_content: String,
    /// The strategy whose selectors matched, `None` if neither did.
    #[serde(default)]
    pub strategy: Option<StrategyId>,
}

impl ParsedArticle {
    /// A page with no recognised paragraphs; treated as "no articles for this date".
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// The on-disk shape of a raw extraction file: either one page or several.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawTranscriptFile {
    Many(Vec<ParsedArticle>),
    Single(Box<ParsedArticle>),
}

/// A quoted line from one side of a debate exchange.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KeyExchange {
    /// "Full Name (Party)".
    pub speaker: String,
    pub quote: String,
}

/// One significant event of the sitting day, as written by the LLM.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopicSummary {
    /// Headline-style title for the event.
    pub topic: String,
    /// One sentence on why a reader should care; newer prompts ask for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whyItMatters: Option<String>,
    /// Neutral synthesis of the discussion.
    pub content: String,
    /// Omitted by the LLM for procedural items with no notable exchange.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyExchanges: Vec<KeyExchange>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The LLM-generated, journalist-style article consumed by the frontend.
///
/// Only a JSON parse is attempted against this shape; no further validation
/// is done on the content.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsArticle {
    pub headline: String,
    #[serde(default)]
    pub publicationDate: String,
    pub summary: String,
    #[serde(default)]
    pub topicSummaries: Vec<TopicSummary>,
    #[serde(default)]
    pub conclusion: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewsArticle {
    /// Fill gaps the model tends to leave and drop repeated tags.
    pub fn normalize(mut self, date: &str) -> Self {
        if self.publicationDate.trim().is_empty() {
            self.publicationDate = date.to_string();
        }
        self.tags = self.tags.into_iter().unique().collect();
        for topic in &mut self.topicSummaries {
            topic.tags = std::mem::take(&mut topic.tags).into_iter().unique().collect();
        }
        self
    }
}
