//! Prompt construction for the article-writing LLM call.
//!
//! The system part fixes the journalist role and the exact JSON shape of a
//! [`crate::models::NewsArticle`]. The user part carries the extracted
//! transcript: raw `fullContent`, the speeches, and the heuristic summary and
//! topics, which the model is told to treat as hints only.

use crate::models::ParsedArticle;
use std::fmt::Write;

/// A system/user prompt pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Both parts as one text, for backends without a system role.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

const SYSTEM_TEMPLATE: &str = r#"You are a political journalist writing for a general New Zealand audience, committed to strict neutrality. Turn the parliamentary transcript below into a concise summary of the sitting day's key activity, returned as a single valid JSON object.

Return only the JSON object. No explanation and no markdown outside it.

{
  "headline": "A factual, compelling headline for the day's most important event.",
  "publicationDate": "{date}",
  "summary": "A 2-4 sentence introduction framing the day's key events and tensions.",
  "topicSummaries": [
    {
      "topic": "Headline-style title for a significant event (e.g. '$59B Supply Bill Passes Third Reading').",
      "whyItMatters": "One sentence on the real-world impact of this event for an ordinary reader.",
      "content": "A neutral paragraph: what the bill or issue is, who spoke for and against, their core arguments, and the outcome or next step.",
      "keyExchanges": [
        { "speaker": "Full Name (Party)", "quote": "Verbatim quote from the first speaker." },
        { "speaker": "Full Name (Party)", "quote": "Verbatim reply from the second speaker." }
      ],
      "tags": ["2-4", "topic", "keywords"]
    }
  ],
  "conclusion": "One sentence on the day's overall outcome or the main unresolved tension.",
  "tags": ["day-level", "keywords"]
}

## Choosing topics
Find every distinct, significant item of business; do not miss bills or debates. Rank topics by news value:
1. Issues with direct public impact: household costs, housing, health, public services, pay disputes.
2. Major policy announcements and the final passage of significant bills (a third reading outweighs a first reading).
3. Sharp political conflict: ideological divides, clashes between senior figures, sustained opposition attacks.
4. Routine business: procedural announcements, committee reports. Include only if genuinely significant, and last.

Read Question Time closely. Ministers often announce policy there, and it shows the opposition's main line of attack.

## Writing rules
- topic: concise and headline-style; put key figures in the title; no prefixes such as "Debate on:".
- content: attribute every claim to a speaker or party and explain parliamentary jargon in plain English.
- keyExchanges: the single most revealing back-and-forth, quoted verbatim. Omit the array when a topic has none.
- Use only information present in the transcript. The initial summary and detected topics are hints; base the article on your own reading of the full text."#;

/// Build the prompt for one sitting day from its extracted pages.
pub fn build_prompt(articles: &[ParsedArticle], date: &str) -> Prompt {
    let system = SYSTEM_TEMPLATE.replace("{date}", date);

    let mut user = String::new();
    let _ = writeln!(user, "## PARLIAMENTARY PROCEEDINGS DATA\n");
    let _ = writeln!(user, "**Date:** {date}");
    let _ = writeln!(user, "**Source:** New Zealand Parliament Hansard");

    for (i, article) in articles.iter().enumerate() {
        if articles.len() > 1 {
            let _ = write!(user, "\n## Transcript page {} of {}: {}\n", i + 1, articles.len(), article.headline);
        }
        write_article(&mut user, article);
    }

    let _ = write!(
        user,
        "\nAnalyze this parliamentary data and write the news article following the structure and rules above."
    );

    Prompt { system, user }
}

fn write_article(out: &mut String, article: &ParsedArticle) {
    let _ = writeln!(out, "\n### Raw Content:");
    let _ = writeln!(out, "{}", or_placeholder(&article.full_content, "No content available"));

    let speeches = article
        .content
        .iter()
        .filter(|item| !item.is_heading)
        .map(|item| format!("**{}:** {}", item.speaker, item.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    let _ = writeln!(out, "\n### Extracted Speeches:");
    let _ = writeln!(out, "{}", or_placeholder(&speeches, "No speeches extracted"));

    let _ = writeln!(out, "\n### Initial Summary:");
    let _ = writeln!(out, "{}", or_placeholder(&article.summary, "No summary available"));

    let topics = article
        .topic_summaries
        .iter()
        .map(|t| format!("- {}: {}", t.topic, t.content))
        .collect::<Vec<_>>()
        .join("\n");
    let _ = writeln!(out, "\n### Detected Topics:");
    let _ = writeln!(out, "{}", or_placeholder(&topics, "No topics detected"));
}

fn or_placeholder<'a>(s: &'a str, placeholder: &'a str) -> &'a str {
    if s.trim().is_empty() { placeholder } else { s }
}
