//! AI provider registry.
//!
//! Every known provider is resolved once, at start-up, into either a ready
//! [`LlmBackend`] or a typed [`Capability::Unavailable`] carrying the reason
//! (missing API key, missing `awful_aj` config, ...). Callers ask the registry
//! by name and never see a half-configured client.

use crate::api::{
    ANTHROPIC_BASE_URL, AnthropicClient, AwfulClient, GEMINI_BASE_URL, GeminiClient, LlmBackend,
    OpenAiClient, Sampling,
};
use crate::config::Settings;
use crate::errors::LlmError;
use awful_aj::{config, config_dir, template};
use reqwest::Client;
use std::collections::BTreeMap;
use std::error::Error;
use tracing::{debug, info, instrument};

/// Provider names, in the order they are listed to users.
pub const PROVIDERS: [&str; 6] = ["awful", "google", "openai", "anthropic", "xai", "openrouter"];

/// Whether a provider can be used in this process.
#[derive(Debug)]
pub enum Capability {
    Available(LlmBackend),
    Unavailable { reason: String },
}

/// Provider name to capability, built by [`ProviderRegistry::resolve_all`].
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Capability>,
}

/// Map a user-supplied provider name onto its registry key.
pub fn canonical_name(name: &str) -> Result<&'static str, LlmError> {
    let lower = name.trim().to_ascii_lowercase();
    let lower = match lower.as_str() {
        "grok" => "xai",
        "gemini" => "google",
        other => other,
    };
    PROVIDERS
        .iter()
        .copied()
        .find(|p| *p == lower)
        .ok_or_else(|| LlmError::UnknownProvider(name.to_string()))
}

struct HostedSpec {
    name: &'static str,
    key_vars: &'static [&'static str],
    model_var: &'static str,
    default_model: &'static str,
    base_url: &'static str,
}

const HOSTED: [HostedSpec; 5] = [
    HostedSpec {
        name: "google",
        key_vars: &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        model_var: "GEMINI_MODEL",
        default_model: "gemini-2.0-flash-exp",
        base_url: GEMINI_BASE_URL,
    },
    HostedSpec {
        name: "openai",
        key_vars: &["OPENAI_API_KEY"],
        model_var: "OPENAI_MODEL",
        default_model: "gpt-3.5-turbo",
        base_url: "https://api.openai.com/v1",
    },
    HostedSpec {
        name: "anthropic",
        key_vars: &["ANTHROPIC_API_KEY"],
        model_var: "ANTHROPIC_MODEL",
        default_model: "claude-3-sonnet-20240229",
        base_url: ANTHROPIC_BASE_URL,
    },
    HostedSpec {
        name: "xai",
        key_vars: &["XAI_API_KEY"],
        model_var: "XAI_MODEL",
        default_model: "grok-beta",
        base_url: "https://api.x.ai/v1",
    },
    HostedSpec {
        name: "openrouter",
        key_vars: &["OPENROUTER_API_KEY"],
        model_var: "OPENROUTER_MODEL",
        default_model: "anthropic/claude-3-haiku",
        base_url: "https://openrouter.ai/api/v1",
    },
];

impl ProviderRegistry {
    /// Resolve every provider from the process environment and settings.
    ///
    /// # Errors
    ///
    /// Returns an error only if the shared HTTP client cannot be built; an
    /// unusable provider is recorded as [`Capability::Unavailable`].
    #[instrument(level = "info", skip_all)]
    pub async fn resolve_all(settings: &Settings) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().build()?;
        let mut registry = Self::resolve_hosted(settings, &client, |var| std::env::var(var).ok());
        registry
            .providers
            .insert("awful", resolve_awful(settings).await);

        for (name, capability) in &registry.providers {
            match capability {
                Capability::Available(_) => info!(provider = name, "AI provider available"),
                Capability::Unavailable { reason } => {
                    debug!(provider = name, %reason, "AI provider unavailable")
                }
            }
        }
        info!(available = ?registry.available(), "Resolved AI providers");
        Ok(registry)
    }

    /// Resolve the hosted (API key) providers through `env`.
    pub fn resolve_hosted<F>(settings: &Settings, client: &Client, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |var: &str| env(var).filter(|v| !v.trim().is_empty());
        let sampling = Sampling {
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        };

        let providers = HOSTED
            .iter()
            .map(|spec| {
                let Some(api_key) = spec.key_vars.iter().find_map(|var| lookup(var)) else {
                    let reason = format!("{} not set", spec.key_vars.join(" or "));
                    return (spec.name, Capability::Unavailable { reason });
                };
                let model = lookup(spec.model_var).unwrap_or_else(|| spec.default_model.to_string());
                let client = client.clone();
                let base_url = spec.base_url.to_string();

                let backend = match spec.name {
                    "google" => LlmBackend::Gemini(GeminiClient {
                        client,
                        base_url,
                        api_key,
                        model,
                        sampling,
                    }),
                    "anthropic" => LlmBackend::Anthropic(AnthropicClient {
                        client,
                        base_url,
                        api_key,
                        model,
                        sampling,
                    }),
                    provider => LlmBackend::OpenAi(OpenAiClient {
                        provider,
                        client,
                        base_url,
                        api_key,
                        model,
                        sampling,
                    }),
                };
                (spec.name, Capability::Available(backend))
            })
            .collect();

        Self { providers }
    }

    /// The backend registered under `name`.
    pub fn get(&self, name: &str) -> Result<&LlmBackend, LlmError> {
        let key = canonical_name(name)?;
        match self.providers.get(key) {
            Some(Capability::Available(backend)) => Ok(backend),
            Some(Capability::Unavailable { reason }) => Err(LlmError::Unavailable {
                provider: key.to_string(),
                reason: reason.clone(),
            }),
            None => Err(LlmError::Unavailable {
                provider: key.to_string(),
                reason: "not resolved".to_string(),
            }),
        }
    }

    /// Names of the providers that can be used.
    pub fn available(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|(_, c)| matches!(c, Capability::Available(_)))
            .map(|(name, _)| *name)
            .collect()
    }
}

async fn resolve_awful(settings: &Settings) -> Capability {
    let config_path = match &settings.awful_config {
        Some(path) => path.clone(),
        None => match config_dir() {
            Ok(dir) => dir.join("config.yaml").to_string_lossy().into_owned(),
            Err(e) => {
                return Capability::Unavailable {
                    reason: format!("no awful_aj config dir: {e}"),
                };
            }
        },
    };

    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            return Capability::Unavailable {
                reason: format!("loading {config_path}: {e}"),
            };
        }
    };
    let template = match template::load_template(&settings.awful_template).await {
        Ok(template) => template,
        Err(e) => {
            return Capability::Unavailable {
                reason: format!("loading template {}: {e}", settings.awful_template),
            };
        }
    };

    info!(%config_path, template = %settings.awful_template, "Loaded awful_aj configuration");
    Capability::Available(LlmBackend::Awful(Box::new(AwfulClient { config, template })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn registry(vars: &[(&str, &str)]) -> ProviderRegistry {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProviderRegistry::resolve_hosted(&Settings::default(), &Client::new(), |var| {
            env.get(var).cloned()
        })
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(canonical_name("Google").unwrap(), "google");
        assert_eq!(canonical_name("GROK").unwrap(), "xai");
        assert_eq!(canonical_name(" openrouter ").unwrap(), "openrouter");
        assert!(matches!(
            canonical_name("mistral"),
            Err(LlmError::UnknownProvider(name)) if name == "mistral"
        ));
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let reg = registry(&[]);
        assert!(reg.available().is_empty());
        match reg.get("openai") {
            Err(LlmError::Unavailable { provider, reason }) => {
                assert_eq!(provider, "openai");
                assert!(reason.contains("OPENAI_API_KEY"));
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_key_is_unavailable() {
        let reg = registry(&[("ANTHROPIC_API_KEY", "  ")]);
        assert!(reg.get("anthropic").is_err());
    }

    #[test]
    fn test_google_accepts_either_key_and_model_override() {
        let reg = registry(&[("GOOGLE_API_KEY", "g-key"), ("GEMINI_MODEL", "gemini-1.5-pro")]);
        match reg.get("gemini").unwrap() {
            LlmBackend::Gemini(c) => {
                assert_eq!(c.api_key, "g-key");
                assert_eq!(c.model, "gemini-1.5-pro");
                assert_eq!(c.sampling.max_output_tokens, 8192);
            }
            other => panic!("expected gemini, got {other:?}"),
        }
    }

    #[test]
    fn test_grok_resolves_to_xai_client() {
        let reg = registry(&[("XAI_API_KEY", "x-key")]);
        let backend = reg.get("grok").unwrap();
        assert_eq!(backend.provider(), "xai");
        match backend {
            LlmBackend::OpenAi(c) => {
                assert_eq!(c.base_url, "https://api.x.ai/v1");
                assert_eq!(c.model, "grok-beta");
            }
            other => panic!("expected openai-compatible, got {other:?}"),
        }
    }

    #[test]
    fn test_available_lists_configured_providers() {
        let reg = registry(&[
            ("OPENROUTER_API_KEY", "o"),
            ("ANTHROPIC_API_KEY", "a"),
        ]);
        assert_eq!(reg.available(), vec!["anthropic", "openrouter"]);
        assert_eq!(reg.get("anthropic").unwrap().provider(), "anthropic");
    }

    #[test]
    fn test_awful_is_unavailable_until_resolved() {
        let reg = registry(&[]);
        assert!(matches!(reg.get("awful"), Err(LlmError::Unavailable { .. })));
    }
}
