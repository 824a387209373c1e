use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::translator::RetryOn;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication for the operator HTTP surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared secret, required when `method = "api_key"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Relational store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// How long a connection waits on a locked database before failing.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("harvester.db")
}

fn default_busy_timeout() -> u64 {
    5000
}

/// Article catalog (arXiv) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Atom query endpoint.
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
    /// Upper bound on candidates fetched per category per pass.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Entries requested per HTTP call.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Delay between consecutive page requests (arXiv asks for ~3s).
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
    /// Request timeout in seconds.
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u32,
    /// Category to destination table bindings, processed in order.
    #[serde(default)]
    pub categories: Vec<CategoryMapping>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            max_results: default_max_results(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay(),
            timeout_secs: default_catalog_timeout(),
            categories: Vec::new(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://export.arxiv.org/api/query".to_string()
}

fn default_max_results() -> u32 {
    500
}

fn default_page_size() -> u32 {
    100
}

fn default_page_delay() -> u64 {
    3000
}

fn default_catalog_timeout() -> u32 {
    60
}

/// One category drives one independent pass into one table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryMapping {
    /// Subject tag (e.g. `cs.AI`) or a full catalog query (e.g. `cat:cs.AI`).
    pub category: String,
    /// Destination table name.
    pub table: String,
}

impl CategoryMapping {
    pub fn new(category: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            table: table.into(),
        }
    }

    /// Catalog search query for this category.
    ///
    /// A bare subject tag is expanded to `cat:<tag>`; anything already
    /// carrying a field prefix is passed through.
    pub fn query(&self) -> String {
        let category = self.category.trim();
        if category.contains(':') {
            category.to_string()
        } else {
            format!("cat:{}", category)
        }
    }
}

/// Translation provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslatorProvider {
    /// OpenAI chat completions (or any compatible endpoint via `api_base`).
    #[default]
    OpenAi,
}

/// Translation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub provider: TranslatorProvider,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Optional per-request timeout. Unset means the HTTP client default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u32>,
    /// Attempts per field before the failure sentinel is stored.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub retry_on: RetryOn,
    /// Prompt for titles; `{text}` is replaced with the source title.
    #[serde(default = "default_title_prompt")]
    pub title_prompt: String,
    /// Prompt for abstracts; `{text}` is replaced with the source abstract.
    #[serde(default = "default_summary_prompt")]
    pub summary_prompt: String,
}

fn default_model() -> String {
    "gpt-3.5-turbo-0125".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_max_attempts() -> u32 {
    3
}

pub(crate) fn default_title_prompt() -> String {
    "请帮我翻译这个文献标题：{text}".to_string()
}

pub(crate) fn default_summary_prompt() -> String {
    "请帮我翻译这个文献摘要：{text}".to_string()
}

/// Recurring run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Nominal interval between full passes.
    #[serde(default = "default_frequency_hours")]
    pub frequency_hours: u32,
    /// How often the scheduler checks whether a run is due.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Run one full pass immediately at startup.
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            frequency_hours: default_frequency_hours(),
            poll_interval_secs: default_poll_interval(),
            run_on_start: default_run_on_start(),
        }
    }
}

fn default_frequency_hours() -> u32 {
    24
}

fn default_poll_interval() -> u64 {
    60
}

fn default_run_on_start() -> bool {
    true
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub translator: SanitizedTranslatorConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: AuthMethod,
    pub api_key_configured: bool,
}

/// Translator config with the provider key hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTranslatorConfig {
    pub provider: TranslatorProvider,
    pub model: String,
    pub api_base: String,
    pub api_key_configured: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_attempts: u32,
    pub retry_on: RetryOn,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let translator = &config.translator;
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method,
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            catalog: config.catalog.clone(),
            translator: SanitizedTranslatorConfig {
                provider: translator.provider,
                model: translator.model.clone(),
                api_base: translator.api_base.clone(),
                api_key_configured: !translator.api_key.is_empty(),
                temperature: translator.temperature,
                max_tokens: translator.max_tokens,
                max_attempts: translator.max_attempts,
                retry_on: translator.retry_on,
            },
            schedule: config.schedule.clone(),
        }
    }
}
