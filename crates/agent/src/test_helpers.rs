//! Shared test helpers for agent tests.

use bertrand_core::error::ProviderError;
use bertrand_core::message::Message;
use bertrand_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next result in the queue and records
/// the prompt it was given. Panics if more calls are made than scripted.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers once with plain content.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_response(text, None))])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// The user prompt of every call so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = prompts.len();

        if call >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                call,
                responses.len()
            );
        }

        prompts.push(
            request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        );
        responses[call].clone()
    }
}

/// A response with answer content and an optional separate reasoning trace.
pub fn make_response(content: &str, reasoning: Option<&str>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(content),
        reasoning: reasoning.map(String::from),
        finish_reason: Some("stop".into()),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}
