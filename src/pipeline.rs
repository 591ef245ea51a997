//! Sequential batch processing.
//!
//! Dates and files are handled strictly one after another: a sitting day is
//! fetched, extracted, persisted and (optionally) summarized before the next
//! one starts. A failure on one date is logged and counted; it never stops the
//! batch.

use crate::api::{AskAsync, LlmBackend, write_article};
use crate::config::Settings;
use crate::errors::LlmError;
use crate::models::{NewsArticle, ParsedArticle, RawTranscriptFile};
use crate::outputs::indexes::update_news_index;
use crate::outputs::json::{list_json_files, read_raw, write_json};
use crate::scrapers::fetcher::Fetcher;
use crate::scrapers::hansard::{fetch_transcripts, index_dates, links_for};
use crate::utils::{compact_date, date_range, expand_compact_date};
use chrono::NaiveDate;
use std::error::Error;
use std::path::Path;
use tracing::{error, info, instrument, warn};

/// What to do with extracted transcripts once the raw file is written.
#[derive(Debug)]
pub enum LlmMode<'a, C = LlmBackend> {
    /// Raw output only (`--no-llm`).
    Disabled,
    /// No provider could be resolved; the raw pages become the processed output.
    Unavailable,
    Enabled(&'a C),
}

/// How one date or file ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An LLM article was written.
    Summarized,
    /// The raw pages were written in place of an article.
    Fallback,
    /// Raw output only.
    RawOnly,
    /// Nothing to process.
    Skipped,
}

/// Per-batch tallies, logged when the batch finishes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub summarized: usize,
    pub fallback: usize,
    pub raw_only: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, result: &Result<Outcome, Box<dyn Error>>) {
        match result {
            Ok(Outcome::Summarized) => self.summarized += 1,
            Ok(Outcome::Fallback) => self.fallback += 1,
            Ok(Outcome::RawOnly) => self.raw_only += 1,
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Output file name for a sitting date: `20250819.json`.
pub fn date_filename(date: NaiveDate) -> String {
    format!("{}.json", compact_date(date))
}

/// Scrape every date in `start..=end` and refresh the news index.
///
/// # Errors
///
/// Only argument errors (`start` after `end`) and index refresh failures are
/// returned; per-date failures are logged and counted in the report.
#[instrument(level = "info", skip(settings, fetcher, llm))]
pub async fn scrape_range<C>(
    settings: &Settings,
    fetcher: &Fetcher,
    start: NaiveDate,
    end: NaiveDate,
    llm: &LlmMode<'_, C>,
) -> Result<BatchReport, Box<dyn Error>>
where
    C: AskAsync<Response = String>,
{
    let dates = date_range(start, end)?;
    let index = index_dates(fetcher, &settings.hansard_base_url, start, end).await;

    let mut report = BatchReport::default();
    for date in dates {
        let links = links_for(date, &index, &settings.hansard_base_url);
        let articles = fetch_transcripts(fetcher, date, &links).await;
        let result = process_date(settings, date, articles, llm).await;
        if let Err(e) = &result {
            error!(%date, error = %e, "Failed to process date");
        }
        report.record(&result);
    }

    update_news_index(&settings.output_dir).await?;
    info!(?report, "Scrape complete");
    Ok(report)
}

/// Persist one date's extracted pages and summarize them.
///
/// The raw array is always written first, so an LLM failure never loses the
/// extraction.
#[instrument(level = "info", skip(settings, articles, llm), fields(pages = articles.len()))]
pub async fn process_date<C>(
    settings: &Settings,
    date: NaiveDate,
    articles: Vec<ParsedArticle>,
    llm: &LlmMode<'_, C>,
) -> Result<Outcome, Box<dyn Error>>
where
    C: AskAsync<Response = String>,
{
    if articles.is_empty() {
        info!("No transcripts found for date");
        return Ok(Outcome::Skipped);
    }

    let filename = date_filename(date);
    write_json(&settings.raw_dir, &filename, &articles).await?;

    let client = match llm {
        LlmMode::Disabled => return Ok(Outcome::RawOnly),
        LlmMode::Unavailable => {
            warn!("No AI provider available; writing raw extraction as output");
            write_json(&settings.output_dir, &filename, &articles).await?;
            return Ok(Outcome::Fallback);
        }
        LlmMode::Enabled(client) => *client,
    };

    match write_article(client, &articles, &date.to_string()).await {
        Ok(article) => {
            write_json(&settings.output_dir, &filename, &article).await?;
            info!(headline = %article.headline, "Wrote news article");
            Ok(Outcome::Summarized)
        }
        Err(e) => {
            warn!(error = %e, "AI processing failed; writing raw extraction as output");
            write_json(&settings.output_dir, &filename, &articles).await?;
            Ok(Outcome::Fallback)
        }
    }
}

/// Summarize one raw extraction file into `{output_dir}/{same name}`.
#[instrument(level = "info", skip(settings, path, client), fields(path = %path.display()))]
pub async fn summarize_file<C>(
    settings: &Settings,
    path: &Path,
    client: &C,
) -> Result<Outcome, Box<dyn Error>>
where
    C: AskAsync<Response = String>,
{
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("not a file path: {}", path.display()))?;
    let file_date = filename
        .strip_suffix(".json")
        .and_then(expand_compact_date)
        .map(|d| d.to_string());

    match read_raw(path).await? {
        RawTranscriptFile::Single(article) => {
            if article.full_content.trim().is_empty() {
                warn!("Raw file has no content; skipping");
                return Ok(Outcome::Skipped);
            }
            let date = file_date.unwrap_or_else(|| article.publication_date.clone());
            let news = write_article(client, std::slice::from_ref(&*article), &date).await?;
            write_json(&settings.output_dir, &filename, &news).await?;
            Ok(Outcome::Summarized)
        }
        RawTranscriptFile::Many(articles) => {
            let mut written: Vec<NewsArticle> = Vec::new();
            for (i, article) in articles.iter().enumerate() {
                if article.full_content.trim().is_empty() {
                    info!(index = i, "Skipping page with no content");
                    continue;
                }
                let date = file_date
                    .clone()
                    .unwrap_or_else(|| article.publication_date.clone());
                match write_article(client, std::slice::from_ref(article), &date).await {
                    Ok(news) => written.push(news),
                    Err(e) => warn!(index = i, error = %e, "Failed to summarize page; dropping it"),
                }
            }

            if written.is_empty() {
                warn!(pages = articles.len(), "No page could be summarized; nothing written");
                return Ok(Outcome::Skipped);
            }
            info!(written = written.len(), pages = articles.len(), "Summarized raw file");
            write_json(&settings.output_dir, &filename, &written).await?;
            Ok(Outcome::Summarized)
        }
    }
}

/// Summarize `file` from the raw directory, or every raw file when `None`,
/// then refresh the news index.
#[instrument(level = "info", skip(settings, client))]
pub async fn summarize_raw<C>(
    settings: &Settings,
    file: Option<&str>,
    client: &C,
) -> Result<BatchReport, Box<dyn Error>>
where
    C: AskAsync<Response = String>,
{
    let files = match file {
        Some(name) => vec![name.to_string()],
        None => list_json_files(&settings.raw_dir).await?,
    };
    if files.is_empty() {
        warn!(raw_dir = %settings.raw_dir, "No raw files to summarize");
    }

    let mut report = BatchReport::default();
    for name in files {
        let path = Path::new(&settings.raw_dir).join(&name);
        let result = summarize_file(settings, &path, client).await;
        if let Err(e) = &result {
            error!(file = %name, error = %e, "Failed to summarize file");
        }
        report.record(&result);
    }

    update_news_index(&settings.output_dir).await?;
    info!(?report, "Summarize complete");
    Ok(report)
}

/// Resolve the LLM mode for a scrape from a registry lookup.
pub fn llm_mode<'a>(lookup: Result<&'a LlmBackend, LlmError>, no_llm: bool) -> LlmMode<'a> {
    if no_llm {
        return LlmMode::Disabled;
    }
    match lookup {
        Ok(backend) => {
            info!(provider = backend.provider(), "Using AI provider");
            LlmMode::Enabled(backend)
        }
        Err(e) => {
            warn!(error = %e, "AI provider unavailable; raw extraction will be published");
            LlmMode::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentItem;
    use crate::prompt::Prompt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE: &str = r#"{"headline": "Supply Bill Passes", "publicationDate": "", "summary": "Money was voted.", "topicSummaries": [], "conclusion": "Done.", "tags": ["budget", "budget"]}"#;

    /// Replies with canned text; fails on the calls listed in `fail_on`.
    struct Scripted {
        reply: &'static str,
        fail_on: Vec<usize>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(reply: &'static str, fail_on: Vec<usize>) -> Self {
            Self {
                reply,
                fail_on,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl AskAsync for Scripted {
        type Response = String;

        async fn ask(&self, _prompt: &Prompt) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&n) {
                return Err(LlmError::Api {
                    provider: "scripted",
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(self.reply.to_string())
        }
    }

    fn settings(name: &str) -> (Settings, std::path::PathBuf) {
        let root = std::env::temp_dir().join(format!("paperboy_pipeline_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let settings = Settings {
            output_dir: root.join("news").to_string_lossy().into_owned(),
            raw_dir: root.join("news/raw").to_string_lossy().into_owned(),
            ..Settings::default()
        };
        (settings, root)
    }

    fn page(text: &str) -> ParsedArticle {
        let item = ContentItem {
            speaker: "Hon NICOLA WILLIS".to_string(),
            text: text.to_string(),
            kind: "Speech".to_string(),
            is_heading: false,
            timestamp: None,
        };
        ParsedArticle {
            headline: "Hansard Debate".to_string(),
            publication_date: "2025-08-19".to_string(),
            full_content: item.line(),
            content: vec![item],
            ..ParsedArticle::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn read(path: impl AsRef<Path>) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_date_filename() {
        assert_eq!(date_filename(date("2025-08-19")), "20250819.json");
    }

    #[tokio::test]
    async fn test_process_date_summarizes() {
        let (settings, root) = settings("ok");
        let client = Scripted::new(ARTICLE, vec![]);
        let outcome = process_date(&settings, date("2025-08-19"), vec![page("I move the bill.")], &LlmMode::Enabled(&client))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Summarized);

        let raw = read(Path::new(&settings.raw_dir).join("20250819.json"));
        assert_eq!(raw.as_array().unwrap().len(), 1);
        let news = read(Path::new(&settings.output_dir).join("20250819.json"));
        assert_eq!(news["headline"], "Supply Bill Passes");
        assert_eq!(news["publicationDate"], "2025-08-19");
        assert_eq!(news["tags"], serde_json::json!(["budget"]));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_process_date_falls_back_on_llm_failure() {
        let (settings, root) = settings("fallback");
        let client = Scripted::new(ARTICLE, vec![0]);
        let outcome = process_date(&settings, date("2025-08-19"), vec![page("I move the bill.")], &LlmMode::Enabled(&client))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Fallback);

        let output = read(Path::new(&settings.output_dir).join("20250819.json"));
        let raw = read(Path::new(&settings.raw_dir).join("20250819.json"));
        assert_eq!(output, raw);
        assert_eq!(output[0]["fullContent"], "Hon NICOLA WILLIS: I move the bill.");
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_process_date_without_provider_or_llm() {
        let (settings, root) = settings("modes");
        let none: LlmMode<'_, Scripted> = LlmMode::Unavailable;
        let outcome = process_date(&settings, date("2025-08-19"), vec![page("words words")], &none)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Fallback);
        assert!(Path::new(&settings.output_dir).join("20250819.json").exists());

        let disabled: LlmMode<'_, Scripted> = LlmMode::Disabled;
        let outcome = process_date(&settings, date("2025-08-20"), vec![page("words words")], &disabled)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::RawOnly);
        assert!(Path::new(&settings.raw_dir).join("20250820.json").exists());
        assert!(!Path::new(&settings.output_dir).join("20250820.json").exists());
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_process_date_with_no_transcripts_writes_nothing() {
        let (settings, root) = settings("empty");
        let client = Scripted::new(ARTICLE, vec![]);
        let outcome = process_date(&settings, date("2025-08-23"), vec![], &LlmMode::Enabled(&client))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped);
        assert!(!Path::new(&settings.raw_dir).exists());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_summarize_array_drops_failed_and_empty_pages() {
        let (settings, root) = settings("array");
        let mut blank = page("");
        blank.full_content = String::new();
        write_json(&settings.raw_dir, "20250820.json", &vec![page("first page"), blank, page("third page")])
            .await
            .unwrap();

        // Second call (the third page) fails.
        let client = Scripted::new(ARTICLE, vec![1]);
        let report = summarize_raw(&settings, None, &client).await.unwrap();
        assert_eq!(report.summarized, 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);

        let news = read(Path::new(&settings.output_dir).join("20250820.json"));
        let news = news.as_array().unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(news[0]["publicationDate"], "2025-08-20");

        let index = read(Path::new(&settings.output_dir).join("index.json"));
        assert_eq!(index, serde_json::json!(["20250820.json"]));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_summarize_array_all_failed_writes_nothing() {
        let (settings, root) = settings("allfail");
        write_json(&settings.raw_dir, "20250821.json", &vec![page("only page")])
            .await
            .unwrap();
        let client = Scripted::new(ARTICLE, vec![0]);
        let outcome = summarize_file(&settings, &Path::new(&settings.raw_dir).join("20250821.json"), &client)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped);
        assert!(!Path::new(&settings.output_dir).join("20250821.json").exists());
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_summarize_single_object() {
        let (settings, root) = settings("single");
        write_json(&settings.raw_dir, "20250819.json", &page("single page"))
            .await
            .unwrap();
        let client = Scripted::new(ARTICLE, vec![]);
        let report = summarize_raw(&settings, Some("20250819.json"), &client).await.unwrap();
        assert_eq!(report.summarized, 1);
        let news = read(Path::new(&settings.output_dir).join("20250819.json"));
        assert_eq!(news["headline"], "Supply Bill Passes");
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_summarize_single_llm_failure_is_counted() {
        let (settings, root) = settings("singlefail");
        write_json(&settings.raw_dir, "20250819.json", &page("single page"))
            .await
            .unwrap();
        let client = Scripted::new("not json at all", vec![]);
        let report = summarize_raw(&settings, None, &client).await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(!Path::new(&settings.output_dir).join("20250819.json").exists());
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_llm_mode_selection() {
        let unknown = Err(LlmError::UnknownProvider("nope".to_string()));
        assert!(matches!(llm_mode(unknown, false), LlmMode::Unavailable));
        let unknown = Err(LlmError::UnknownProvider("nope".to_string()));
        assert!(matches!(llm_mode(unknown, true), LlmMode::Disabled));
    }

    #[tokio::test]
    async fn test_scrape_range_end_to_end() {
        let site = MockServer::start().await;
        let listing = r#"<html><body>
            <a href="/en/pb/hansard-debates/rhr/combined/HansD_20250819_20250819">Tuesday</a>
            <a href="/en/pb/hansard-debates/rhr/combined/HansD_20250820_20250820">Wednesday</a>
            </body></html>"#;
        let speech = r#"<html><body><p class="Speech"><strong>Hon NICOLA WILLIS</strong>: I move that the Supply Bill be now read a third time.</p></body></html>"#;

        for (route, body) in [
            ("/en/pb/hansard-debates/rhr/", listing),
            ("/en/pb/hansard-debates/rhr/combined/HansD_20250819_20250819", speech),
            (
                "/en/pb/hansard-debates/rhr/combined/HansD_20250820_20250820",
                "<html><body><p>No transcript yet.</p></body></html>",
            ),
        ] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&site)
                .await;
        }
        // 2025-08-21 has no listing entry; its canonical URL is unmatched and 404s.

        let (mut settings, root) = settings("scrape");
        settings.hansard_base_url = site.uri();
        let fetcher = Fetcher::from_settings(&settings).unwrap();
        let client = Scripted::new(ARTICLE, vec![]);

        let report = scrape_range(
            &settings,
            &fetcher,
            date("2025-08-19"),
            date("2025-08-21"),
            &LlmMode::Enabled(&client),
        )
        .await
        .unwrap();

        assert_eq!(report.summarized, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        assert!(!Path::new(&settings.raw_dir).join("20250820.json").exists());
        assert!(!Path::new(&settings.output_dir).join("20250820.json").exists());
        let index = read(Path::new(&settings.output_dir).join("index.json"));
        assert_eq!(index, serde_json::json!(["20250819.json"]));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_scrape_range_rejects_reversed_dates() {
        let (settings, root) = settings("reversed");
        let fetcher = Fetcher::from_settings(&settings).unwrap();
        let disabled: LlmMode<'_, Scripted> = LlmMode::Disabled;
        assert!(
            scrape_range(&settings, &fetcher, date("2025-08-20"), date("2025-08-19"), &disabled)
                .await
                .is_err()
        );
        let _ = std::fs::remove_dir_all(root);
    }
}
