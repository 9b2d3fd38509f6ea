//! Fake text generator for testing and offline runs.
//!
//! Returns deterministic responses based on prompt matching, so the
//! pipeline can run without network access or API costs.

use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use super::generation_client::{GenerationError, GenerationRequest, TextGenerator};

#[derive(Debug, Clone)]
enum FakeReply {
    Text(String),
    Fail(String),
}

/// A fake generator for testing.
///
/// Responses are matched by checking if the user prompt contains a
/// registered substring (case-insensitive), in registration order. If
/// nothing matches, the default response is returned, or a transport
/// error when there is none. Every request is recorded.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    replies: RwLock<Vec<(String, FakeReply)>>,
    default_response: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    /// Create a FakeGenerator with no registered responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `response` to prompts containing `prompt_contains`.
    pub fn with_response(self, prompt_contains: &str, response: &str) -> Self {
        self.push(prompt_contains, FakeReply::Text(response.to_string()));
        self
    }

    /// Fail with a transport error on prompts containing `prompt_contains`.
    pub fn with_failure(self, prompt_contains: &str, message: &str) -> Self {
        self.push(prompt_contains, FakeReply::Fail(message.to_string()));
        self
    }

    /// Set the response used when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Canned archival responses for offline runs.
    ///
    /// The keyword pattern is registered first since keyword prompts embed
    /// the generated description.
    pub fn with_archive_responses() -> Self {
        Self::new()
            .with_response(
                "Descripción de la imagen:",
                r#"["fotografía histórica", "Lima", "Colección Elejalde"]"#,
            )
            .with_response(
                "Título:",
                "Fotografía en blanco y negro de un espacio urbano de Lima. \
                 Se distinguen edificaciones de época republicana y transeúntes.",
            )
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn push(&self, pattern: &str, reply: FakeReply) {
        let mut replies = self
            .replies
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        replies.push((pattern.to_lowercase(), reply));
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let prompt_lower = request.user_prompt.to_lowercase();
        let replies = self
            .replies
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // First matching pattern wins
        for (pattern, reply) in replies.iter() {
            if prompt_lower.contains(pattern) {
                return match reply {
                    FakeReply::Text(text) => Ok(text.clone()),
                    FakeReply::Fail(message) => {
                        Err(GenerationError::RequestFailed(message.clone()))
                    }
                };
            }
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(GenerationError::RequestFailed(format!(
                "FakeGenerator: no response configured for prompt (first 100 chars): {}",
                request.user_prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
