//! Text-generation client
//!
//! `GenerationClient` is the pipeline's view of the language model: one call
//! for the archival description, one for the keyword list. The actual
//! transport sits behind the `TextGenerator` trait so tests and offline runs
//! can swap in `FakeGenerator`.
//!
//! Failures of the call itself are hard errors and are never retried here.
//! Keyword responses that are not usable JSON degrade instead of failing.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Sampling temperature for both calls (favors determinism)
pub const GENERATION_TEMPERATURE: f32 = 0.2;

/// Output cap for the description call
pub const DESCRIPTION_MAX_TOKENS: u32 = 500;

/// Output cap for the keyword call
pub const KEYWORD_MAX_TOKENS: u32 = 150;

/// Keyword list returned when the response is JSON but not a list
pub const NO_DATA_SENTINEL: &str = "Sin datos";

/// Generation service errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid API key")]
    Unauthorized,

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// A single generation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Provider seam: sends one request, returns the raw text response
#[async_trait]
pub trait TextGenerator: Send + Sync + fmt::Debug {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Model name, for logging
    fn model_name(&self) -> &str;
}

/// Outcome of parsing a keyword response
///
/// The three branches are distinct on purpose: a JSON value that is not a
/// list gives the sentinel, text that is not JSON at all gives nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordOutcome {
    /// Response was a JSON array
    Parsed(Vec<String>),
    /// Response was valid JSON but not an array
    NotAList,
    /// Response was not JSON
    Unparseable,
}

impl KeywordOutcome {
    /// Classify a raw keyword response
    pub fn parse(response: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(response.trim()) {
            Ok(serde_json::Value::Array(items)) => KeywordOutcome::Parsed(
                items
                    .into_iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Ok(_) => KeywordOutcome::NotAList,
            Err(_) => KeywordOutcome::Unparseable,
        }
    }

    /// True unless the response was a proper list
    pub fn is_degraded(&self) -> bool {
        !matches!(self, KeywordOutcome::Parsed(_))
    }

    /// Keywords to record
    pub fn into_keywords(self) -> Vec<String> {
        match self {
            KeywordOutcome::Parsed(keywords) => keywords,
            KeywordOutcome::NotAList => vec![NO_DATA_SENTINEL.to_string()],
            KeywordOutcome::Unparseable => Vec::new(),
        }
    }
}

/// Description and keyword generation on top of a `TextGenerator`
#[derive(Debug, Clone)]
pub struct GenerationClient {
    generator: Arc<dyn TextGenerator>,
}

impl GenerationClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Generate the archival description (trimmed)
    pub async fn generate_description(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationError> {
        let request = GenerationRequest {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            max_tokens: DESCRIPTION_MAX_TOKENS,
            temperature: GENERATION_TEMPERATURE,
        };

        debug!(
            model = self.generator.model_name(),
            prompt_len = user_prompt.len(),
            "Requesting description"
        );
        let text = self.generator.generate(&request).await?;
        let description = text.trim().to_string();

        info!(
            model = self.generator.model_name(),
            chars = description.chars().count(),
            "Description generated"
        );
        Ok(description)
    }

    /// Generate the keyword list
    ///
    /// Transport failures are errors; unusable responses are reported
    /// through `KeywordOutcome`.
    pub async fn generate_keywords(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<KeywordOutcome, GenerationError> {
        let request = GenerationRequest {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            max_tokens: KEYWORD_MAX_TOKENS,
            temperature: GENERATION_TEMPERATURE,
        };

        debug!(model = self.generator.model_name(), "Requesting keywords");
        let text = self.generator.generate(&request).await?;
        let outcome = KeywordOutcome::parse(&text);

        match &outcome {
            KeywordOutcome::Parsed(keywords) => {
                info!(count = keywords.len(), "Keywords generated");
            }
            KeywordOutcome::NotAList => {
                warn!(response = %text.trim(), "Keyword response is JSON but not a list");
            }
            KeywordOutcome::Unparseable => {
                warn!(response = %text.trim(), "Keyword response is not JSON");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fake_generator::FakeGenerator;

    #[test]
    fn test_parse_json_list() {
        assert_eq!(
            KeywordOutcome::parse(r#"["a","b"]"#).into_keywords(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_parse_json_string_gives_sentinel() {
        let outcome = KeywordOutcome::parse(r#""just a string""#);
        assert_eq!(outcome, KeywordOutcome::NotAList);
        assert_eq!(outcome.into_keywords(), vec![NO_DATA_SENTINEL]);
    }

    #[test]
    fn test_parse_json_object_gives_sentinel() {
        assert_eq!(
            KeywordOutcome::parse(r#"{"keywords": ["a"]}"#),
            KeywordOutcome::NotAList
        );
    }

    #[test]
    fn test_parse_not_json_gives_empty() {
        let outcome = KeywordOutcome::parse("not json");
        assert_eq!(outcome, KeywordOutcome::Unparseable);
        assert!(outcome.is_degraded());
        assert!(outcome.into_keywords().is_empty());
    }

    #[test]
    fn test_parse_code_fenced_json_is_unparseable() {
        assert_eq!(
            KeywordOutcome::parse("```json\n[\"a\"]\n```"),
            KeywordOutcome::Unparseable
        );
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        assert_eq!(
            KeywordOutcome::parse("  [\"Lima\"]\n"),
            KeywordOutcome::Parsed(vec!["Lima".to_string()])
        );
    }

    #[tokio::test]
    async fn test_description_request_parameters() {
        let fake = Arc::new(FakeGenerator::new().with_default_response("  Vista.  "));
        let client = GenerationClient::new(fake.clone());

        let description = client.generate_description("sys", "user").await.unwrap();
        assert_eq!(description, "Vista.");

        let requests = fake.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_prompt, "sys");
        assert_eq!(requests[0].max_tokens, DESCRIPTION_MAX_TOKENS);
        assert_eq!(requests[0].temperature, GENERATION_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_keyword_request_parameters() {
        let fake = Arc::new(FakeGenerator::new().with_default_response(r#"["Lima"]"#));
        let client = GenerationClient::new(fake.clone());

        let outcome = client.generate_keywords("sys", "user").await.unwrap();
        assert_eq!(outcome, KeywordOutcome::Parsed(vec!["Lima".to_string()]));
        assert_eq!(fake.requests()[0].max_tokens, KEYWORD_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let client = GenerationClient::new(Arc::new(FakeGenerator::new()));
        let result = client.generate_description("sys", "user").await;
        assert!(matches!(result, Err(GenerationError::RequestFailed(_))));
    }
}
