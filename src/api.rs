//! LLM API interaction.
//!
//! This module turns a [`Prompt`] into a [`NewsArticle`] through one of
//! several hosted or local language models.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`AwfulClient`]: Wraps the `awful_aj` library's `ask` function (any
//!   OpenAI-compatible local server configured through `awful_aj`)
//! - [`GeminiClient`], [`OpenAiClient`], [`AnthropicClient`]: direct HTTP
//!   clients for hosted providers
//! - [`LlmBackend`]: one enum over all of them, so the provider registry can
//!   hold any backend without boxing
//!
//! There is no retry: a failed call surfaces as an [`LlmError`] and the caller
//! persists the raw extraction instead.

use crate::errors::LlmError;
use crate::models::{NewsArticle, ParsedArticle};
use crate::prompt::{Prompt, build_prompt};
use crate::utils::{looks_truncated, truncate_for_log};
use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a model and return its reply. The trait is
/// used with static dispatch only.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send the prompt to the LLM and receive a response.
    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, LlmError>;
}

/// Sampling parameters shared by every hosted client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// `awful_aj` client: config carries the endpoint and model, the template
/// carries the chat framing.
#[derive(Debug)]
pub struct AwfulClient {
    pub config: AwfulJadeConfig,
    pub template: ChatTemplate,
}

impl AskAsync for AwfulClient {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, LlmError> {
        let t0 = Instant::now();
        let res = ask(&self.config, prompt.combined(), &self.template, None, None).await;
        let dt = t0.elapsed();

        res.map_err(|e| {
            warn!(elapsed_ms = dt.as_millis(), error = %e, "API call failed");
            LlmError::Transport {
                provider: "awful",
                message: e.to_string(),
            }
        })
    }
}

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    pub client: Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub sampling: Sampling,
}

impl GeminiClient {
    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn body(&self, prompt: &Prompt) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": prompt.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
            "generationConfig": {
                "temperature": self.sampling.temperature,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": self.sampling.max_output_tokens,
            }
        })
    }
}

impl AskAsync for GeminiClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, LlmError> {
        let request = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.body(prompt));
        let value = send_json("google", request).await?;
        gemini_text(&value).ok_or(LlmError::UnexpectedShape("google"))
    }
}

/// Chat-completions client for OpenAI and the OpenAI-compatible hosted APIs
/// (xAI, OpenRouter).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    pub provider: &'static str,
    pub client: Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub sampling: Sampling,
}

impl OpenAiClient {
    fn body(&self, prompt: &Prompt) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "temperature": self.sampling.temperature,
            "max_tokens": self.sampling.max_output_tokens,
        })
    }
}

impl AskAsync for OpenAiClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(provider = self.provider, model = %self.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.body(prompt));
        let value = send_json(self.provider, request).await?;
        chat_completion_text(&value).ok_or(LlmError::UnexpectedShape(self.provider))
    }
}

/// Anthropic Messages API client.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    pub client: Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub sampling: Sampling,
}

impl AnthropicClient {
    fn body(&self, prompt: &Prompt) -> Value {
        json!({
            "model": self.model,
            "system": prompt.system,
            "messages": [{ "role": "user", "content": prompt.user }],
            "temperature": self.sampling.temperature,
            "max_tokens": self.sampling.max_output_tokens.min(ANTHROPIC_MAX_TOKENS),
        })
    }
}

impl AskAsync for AnthropicClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, LlmError> {
        let url = format!("{}/messages", self.base_url.trim_end_matches('/'));
        let request = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.body(prompt));
        let value = send_json("anthropic", request).await?;
        anthropic_text(&value).ok_or(LlmError::UnexpectedShape("anthropic"))
    }
}

/// Any configured backend.
#[derive(Debug)]
pub enum LlmBackend {
    Awful(Box<AwfulClient>),
    Gemini(GeminiClient),
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
}

impl LlmBackend {
    pub fn provider(&self) -> &'static str {
        match self {
            LlmBackend::Awful(_) => "awful",
            LlmBackend::Gemini(_) => "google",
            LlmBackend::OpenAi(c) => c.provider,
            LlmBackend::Anthropic(_) => "anthropic",
        }
    }
}

impl AskAsync for LlmBackend {
    type Response = String;

    async fn ask(&self, prompt: &Prompt) -> Result<Self::Response, LlmError> {
        match self {
            LlmBackend::Awful(c) => c.ask(prompt).await,
            LlmBackend::Gemini(c) => c.ask(prompt).await,
            LlmBackend::OpenAi(c) => c.ask(prompt).await,
            LlmBackend::Anthropic(c) => c.ask(prompt).await,
        }
    }
}

async fn send_json(provider: &'static str, request: reqwest::RequestBuilder) -> Result<Value, LlmError> {
    // The request URL may carry credentials; keep it out of the message.
    let transport = |e: reqwest::Error| LlmError::Transport {
        provider,
        message: e.without_url().to_string(),
    };
    let resp = request.send().await.map_err(transport)?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            provider,
            status: status.as_u16(),
            body: truncate_for_log(&body, 500),
        });
    }
    resp.json::<Value>().await.map_err(transport)
}

fn gemini_text(value: &Value) -> Option<String> {
    let parts = value.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts.iter().filter_map(|p| p.get("text")?.as_str()).collect();
    (!text.is_empty()).then_some(text)
}

fn chat_completion_text(value: &Value) -> Option<String> {
    value
        .pointer("/choices/0/message/content")?
        .as_str()
        .map(str::to_string)
}

fn anthropic_text(value: &Value) -> Option<String> {
    let blocks = value.get("content")?.as_array()?;
    let text: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text")?.as_str())
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Remove a surrounding markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    {
        Some(rest) => {
            let rest = rest.trim_end();
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Parse a model reply into a [`NewsArticle`].
///
/// Code fences are stripped; if the reply still isn't a bare object, the span
/// from the first `{` to the last `}` is tried.
pub fn parse_news_article(reply: &str) -> Result<NewsArticle, LlmError> {
    let body = strip_code_fences(reply);
    let json = if body.starts_with('{') {
        body
    } else {
        match (body.find('{'), body.rfind('}')) {
            (Some(start), Some(end)) if start < end => &body[start..=end],
            _ => return Err(LlmError::NoJson),
        }
    };
    Ok(serde_json::from_str(json)?)
}

/// Ask `client` to write the article for one sitting day.
///
/// # Errors
///
/// Returns the [`LlmError`] from the call itself or from parsing its reply.
#[instrument(level = "info", skip_all, fields(%date, pages = articles.len()))]
pub async fn write_article<C>(
    client: &C,
    articles: &[ParsedArticle],
    date: &str,
) -> Result<NewsArticle, LlmError>
where
    C: AskAsync<Response = String>,
{
    let t0 = Instant::now();
    let prompt = build_prompt(articles, date);
    let reply = match client.ask(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "LLM call failed");
            return Err(e);
        }
    };

    match parse_news_article(&reply) {
        Ok(article) => {
            info!(
                elapsed_ms = t0.elapsed().as_millis(),
                topics = article.topicSummaries.len(),
                "LLM article parsed"
            );
            Ok(article.normalize(date))
        }
        Err(e) => {
            let truncated = matches!(&e, LlmError::Parse(pe) if looks_truncated(pe));
            warn!(
                error = %e,
                truncated,
                response_preview = %truncate_for_log(&reply, 300),
                "Model returned non-conforming JSON"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE_JSON: &str = r#"{
        "headline": "Fast-track Bill Clears First Hurdle",
        "publicationDate": "2025-08-19",
        "summary": "Parliament debated infrastructure.",
        "topicSummaries": [
            {
                "topic": "Fast-track Amendment Passes First Reading",
                "content": "The Government's bill passed.",
                "keyExchanges": [
                    {"speaker": "Chris Bishop (National)", "quote": "We need to build."},
                    {"speaker": "Rachel Brooking (Labour)", "quote": "Not like this."}
                ],
                "tags": ["infrastructure", "RMA"]
            }
        ],
        "conclusion": "The fight over consenting continues."
    }"#;

    struct Canned(Result<String, ()>);

    impl AskAsync for Canned {
        type Response = String;

        async fn ask(&self, _prompt: &Prompt) -> Result<String, LlmError> {
            self.0.clone().map_err(|_| LlmError::Transport {
                provider: "canned",
                message: "connection refused".to_string(),
            })
        }
    }

    fn sampling() -> Sampling {
        Sampling {
            temperature: 0.3,
            max_output_tokens: 8192,
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "be neutral".to_string(),
            user: "transcript".to_string(),
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_fenced_article() {
        let reply = format!("```json\n{ARTICLE_JSON}\n```");
        let article = parse_news_article(&reply).unwrap();
        assert_eq!(article.headline, "Fast-track Bill Clears First Hurdle");
        assert_eq!(article.topicSummaries[0].keyExchanges.len(), 2);
    }

    #[test]
    fn test_parse_article_with_chatter() {
        let reply = format!("Here is the article you asked for:\n{ARTICLE_JSON}\nHope this helps!");
        assert!(parse_news_article(&reply).is_ok());
    }

    #[test]
    fn test_parse_errors_are_distinct() {
        assert!(matches!(parse_news_article("I cannot help with that."), Err(LlmError::NoJson)));
        assert!(matches!(parse_news_article("{\"headline\": "), Err(LlmError::Parse(_))));
        assert!(matches!(parse_news_article("{\"summary\": \"x\"}"), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_gemini_request_and_response() {
        let client = GeminiClient {
            client: Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: "g-key".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            sampling: sampling(),
        };
        assert_eq!(
            client.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
        let body = client.body(&prompt());
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be neutral");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "transcript");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);

        let reply = json!({"candidates": [{"content": {"parts": [{"text": "{\"a\""}, {"text": ":1}"}]}}]});
        assert_eq!(gemini_text(&reply).as_deref(), Some("{\"a\":1}"));
        assert_eq!(gemini_text(&json!({"candidates": []})), None);
    }

    #[test]
    fn test_openai_request_and_response() {
        let client = OpenAiClient {
            provider: "openrouter",
            client: Client::new(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: "key".to_string(),
            model: "anthropic/claude-3-haiku".to_string(),
            sampling: sampling(),
        };
        let body = client.body(&prompt());
        assert_eq!(body["model"], "anthropic/claude-3-haiku");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "transcript");

        let reply = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        assert_eq!(chat_completion_text(&reply).as_deref(), Some("hi"));
        assert_eq!(chat_completion_text(&json!({"error": "x"})), None);
    }

    #[test]
    fn test_anthropic_request_and_response() {
        let client = AnthropicClient {
            client: Client::new(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_key: "key".to_string(),
            model: "claude-3-sonnet-20240229".to_string(),
            sampling: sampling(),
        };
        let body = client.body(&prompt());
        assert_eq!(body["system"], "be neutral");
        assert_eq!(body["max_tokens"], 4096);

        let reply = json!({"content": [{"type": "text", "text": "a"}, {"type": "tool_use"}, {"type": "text", "text": "b"}]});
        assert_eq!(anthropic_text(&reply).as_deref(), Some("ab"));
    }

    #[tokio::test]
    async fn test_write_article_success_normalizes() {
        let client = Canned(Ok(ARTICLE_JSON.replace("\"2025-08-19\"", "\"\"")));
        let article = write_article(&client, &[], "2025-08-19").await.unwrap();
        assert_eq!(article.publicationDate, "2025-08-19");
    }

    #[tokio::test]
    async fn test_write_article_propagates_failures() {
        let failing = Canned(Err(()));
        assert!(matches!(
            write_article(&failing, &[], "2025-08-19").await,
            Err(LlmError::Transport { .. })
        ));

        let chatty = Canned(Ok("Sorry, no.".to_string()));
        assert!(matches!(
            write_article(&chatty, &[], "2025-08-19").await,
            Err(LlmError::NoJson)
        ));
    }

    fn gemini(base_url: &str, api_key: &str) -> GeminiClient {
        GeminiClient {
            client: Client::new(),
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            sampling: sampling(),
        }
    }

    #[tokio::test]
    async fn test_gemini_sends_key_as_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-exp:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"candidates": [{"content": {"parts": [{"text": "hello"}]}}]}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = gemini(&format!("{}/v1beta", server.uri()), "g-key");
        assert_eq!(client.ask(&prompt()).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_transport_error_omits_credentials() {
        let client = gemini("http://127.0.0.1:1/v1beta", "SUPERSECRETKEY");
        let err = client.ask(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::Transport { provider: "google", .. }));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));
        assert!(!format!("{err:?}").contains("SUPERSECRETKEY"));
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer or-key"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = OpenAiClient {
            provider: "openrouter",
            client: Client::new(),
            base_url: format!("{}/v1", server.uri()),
            api_key: "or-key".to_string(),
            model: "anthropic/claude-3-haiku".to_string(),
            sampling: sampling(),
        };
        match client.ask(&prompt()).await {
            Err(LlmError::Api { provider, status, body }) => {
                assert_eq!(provider, "openrouter");
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }
}
