use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::{types::Config, AuthMethod, ConfigError};

static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("valid table pattern"));

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - API key auth carries a key
/// - At least one category mapping, each with a usable table name
/// - Non-zero fetch sizes, attempts and intervals
/// - Prompt templates contain `{text}`
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_ref().map_or(true, |k| k.is_empty())
    {
        return Err(invalid("auth.api_key must be set when auth.method = \"api_key\""));
    }

    let catalog = &config.catalog;
    if catalog.categories.is_empty() {
        return Err(invalid("catalog.categories must list at least one category"));
    }
    if catalog.max_results == 0 {
        return Err(invalid("catalog.max_results cannot be 0"));
    }
    if catalog.page_size == 0 {
        return Err(invalid("catalog.page_size cannot be 0"));
    }

    let mut seen = HashSet::new();
    for mapping in &catalog.categories {
        if mapping.category.trim().is_empty() {
            return Err(invalid("catalog.categories entries need a category"));
        }
        if !is_valid_table_name(&mapping.table) {
            return Err(invalid(format!(
                "catalog table '{}' is not a valid SQL identifier",
                mapping.table
            )));
        }
        if !seen.insert((mapping.query(), mapping.table.as_str())) {
            return Err(invalid(format!(
                "category '{}' is mapped to table '{}' more than once",
                mapping.category, mapping.table
            )));
        }
    }

    let translator = &config.translator;
    if translator.max_attempts == 0 {
        return Err(invalid("translator.max_attempts cannot be 0"));
    }
    if !translator.title_prompt.contains("{text}") {
        return Err(invalid("translator.title_prompt must contain {text}"));
    }
    if !translator.summary_prompt.contains("{text}") {
        return Err(invalid("translator.summary_prompt must contain {text}"));
    }

    if config.schedule.frequency_hours == 0 {
        return Err(invalid("schedule.frequency_hours cannot be 0"));
    }
    if config.schedule.poll_interval_secs == 0 {
        return Err(invalid("schedule.poll_interval_secs cannot be 0"));
    }

    Ok(())
}
