//! Machine translation of article titles and abstracts.
//!
//! [`Translator`] is one provider call. [`TranslationService`] wraps a
//! translator with a [`RetryPolicy`] and never fails: once the attempts are
//! spent it hands back the [`TRANSLATION_FAILED`](crate::article::TRANSLATION_FAILED)
//! sentinel so the surrounding record can still be stored.

mod openai;
mod retry;
mod service;

pub use openai::OpenAiTranslator;
pub use retry::{Retryable, RetryOn, RetryOutcome, RetryPolicy};
pub use service::{TranslationField, TranslationService};

use std::time::Duration;

use async_trait::async_trait;

/// Error type for translation calls.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Provider returned an empty translation")]
    EmptyResponse,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl Retryable for TranslationError {
    fn is_transient(&self) -> bool {
        match self {
            TranslationError::Http(_)
            | TranslationError::Json(_)
            | TranslationError::EmptyResponse
            | TranslationError::Timeout(_) => true,
            TranslationError::Api { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            TranslationError::NotConfigured(_) => false,
        }
    }
}

/// A single free-text-in, free-text-out completion call.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Provider name (e.g. "openai").
    fn provider(&self) -> &str;

    /// Model identifier sent with every request.
    fn model(&self) -> &str;

    /// Send the prompt and return the completion text.
    async fn translate(&self, prompt: &str) -> Result<String, TranslationError>;
}
