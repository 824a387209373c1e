//! Mock translator for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::translator::{TranslationError, Translator};

/// Mock implementation of the Translator trait.
///
/// Successful calls return the prompt prefixed with `[译] `. Failures can be
/// injected for the next N calls or for every call.
#[derive(Debug, Default)]
pub struct MockTranslator {
    /// Prompts received, in order.
    prompts: Arc<RwLock<Vec<String>>>,
    /// Remaining calls that fail with a transient error.
    fail_remaining: Arc<RwLock<u32>>,
    /// Fail every call.
    always_fail: bool,
    /// Failures are non-transient.
    permanent: bool,
    /// Simulated latency per call.
    delay: Option<Duration>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a transient HTTP error.
    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Every call fails with a non-transient API error.
    pub fn always_failing_permanently() -> Self {
        Self {
            always_fail: true,
            permanent: true,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next `n` calls.
    pub async fn fail_next(&self, n: u32) {
        *self.fail_remaining.write().await = n;
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.read().await.len()
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.read().await.clone()
    }

    fn failure(&self) -> TranslationError {
        if self.permanent {
            TranslationError::Api {
                status: 400,
                message: "mock rejected the request".to_string(),
            }
        } else {
            TranslationError::Http("mock connection reset".to_string())
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn translate(&self, prompt: &str) -> Result<String, TranslationError> {
        self.prompts.write().await.push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.always_fail {
            return Err(self.failure());
        }

        let mut remaining = self.fail_remaining.write().await;
        if *remaining > 0 {
            *remaining -= 1;
            return Err(self.failure());
        }

        Ok(format!("[译] {}", prompt))
    }
}
