//! Typed failures for the two stages that can go wrong in ways the pipeline
//! must tell apart: fetching a transcript and asking an LLM to rewrite it.
//!
//! Extraction never fails; an unrecognised page simply yields no items.

use thiserror::Error;

/// A transcript page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered, but not with a 2xx status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request never completed (DNS, TLS, timeout, ...).
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// The server answered 2xx with an empty body.
    #[error("empty response body from {url}")]
    EmptyBody { url: String },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }
}

/// The LLM stage failed; callers fall back to persisting raw extraction output.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("unknown AI provider: {0}")]
    UnknownProvider(String),

    #[error("AI provider {provider} is unavailable: {reason}")]
    Unavailable { provider: String, reason: String },

    #[error("{provider} API returned HTTP {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("request to {provider} failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("unexpected response structure from {0}")]
    UnexpectedShape(&'static str),

    #[error("no JSON object found in model response")]
    NoJson,

    #[error("model response is not a valid article: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let missing = FetchError::Status {
            url: "https://example.com".to_string(),
            status: 404,
        };
        let broken = FetchError::Status {
            url: "https://example.com".to_string(),
            status: 500,
        };
        assert!(missing.is_not_found());
        assert!(!broken.is_not_found());
    }

    #[test]
    fn test_unavailable_message_names_provider() {
        let e = LlmError::Unavailable {
            provider: "openai".to_string(),
            reason: "OPENAI_API_KEY is not set".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "AI provider openai is unavailable: OPENAI_API_KEY is not set"
        );
    }
}
