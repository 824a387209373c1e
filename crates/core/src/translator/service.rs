//! Retry-wrapped translation of article fields.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::{RetryPolicy, Translator};
use crate::article::{Article, EnrichedArticle, TRANSLATION_FAILED};
use crate::config::{default_summary_prompt, default_title_prompt, TranslatorConfig};
use crate::metrics::{TRANSLATION_ATTEMPTS, TRANSLATION_FALLBACKS};

/// Which article field is being translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationField {
    Title,
    Summary,
}

impl TranslationField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationField::Title => "title",
            TranslationField::Summary => "summary",
        }
    }
}

/// Translates article fields under a retry budget, degrading to the
/// failure sentinel instead of erroring.
pub struct TranslationService {
    translator: Arc<dyn Translator>,
    policy: RetryPolicy,
    title_prompt: String,
    summary_prompt: String,
}

impl TranslationService {
    pub fn new(translator: Arc<dyn Translator>, policy: RetryPolicy) -> Self {
        Self {
            translator,
            policy,
            title_prompt: default_title_prompt(),
            summary_prompt: default_summary_prompt(),
        }
    }

    /// Policy and prompts from the `[translator]` section.
    pub fn from_config(translator: Arc<dyn Translator>, config: &TranslatorConfig) -> Self {
        Self::new(
            translator,
            RetryPolicy::new(config.max_attempts, config.retry_on),
        )
        .with_prompts(config.title_prompt.clone(), config.summary_prompt.clone())
    }

    pub fn with_prompts(mut self, title_prompt: String, summary_prompt: String) -> Self {
        self.title_prompt = title_prompt;
        self.summary_prompt = summary_prompt;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    fn prompt_for(&self, field: TranslationField, text: &str) -> String {
        let template = match field {
            TranslationField::Title => &self.title_prompt,
            TranslationField::Summary => &self.summary_prompt,
        };
        template.replace("{text}", text)
    }

    /// Translate one field. Never fails: exhaustion yields [`TRANSLATION_FAILED`].
    ///
    /// Empty source text is returned as-is without calling the provider.
    pub async fn translate(&self, field: TranslationField, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let prompt = self.prompt_for(field, text);
        let label = format!("Translating {}", field.as_str());
        let outcome = self
            .policy
            .run(&label, |_| {
                let prompt = prompt.as_str();
                async move {
                    let result = self.translator.translate(prompt).await;
                    let status = if result.is_ok() { "success" } else { "failure" };
                    TRANSLATION_ATTEMPTS.with_label_values(&[status]).inc();
                    result
                }
            })
            .await;

        match outcome.result {
            Ok(translated) => {
                debug!(
                    field = field.as_str(),
                    attempts = outcome.attempts,
                    "Translation succeeded"
                );
                translated
            }
            Err(e) => {
                warn!(
                    field = field.as_str(),
                    attempts = outcome.attempts,
                    "Giving up on translation, storing placeholder: {}",
                    e
                );
                TRANSLATION_FALLBACKS
                    .with_label_values(&[field.as_str()])
                    .inc();
                TRANSLATION_FAILED.to_string()
            }
        }
    }

    /// Translate title then abstract, independently.
    pub async fn enrich(&self, article: Article) -> EnrichedArticle {
        let cn_title = self.translate(TranslationField::Title, &article.title).await;
        let cn_summary = self
            .translate(TranslationField::Summary, &article.summary)
            .await;
        article.enrich(cn_title, cn_summary)
    }
}
