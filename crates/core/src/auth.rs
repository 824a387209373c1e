//! Static shared-secret guard for the operator HTTP surface.

use thiserror::Error;

use crate::config::{AuthConfig, AuthMethod};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid API key")]
    InvalidCredentials,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Checks requests against the configured API key, if any.
///
/// Accepts the key in either:
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
#[derive(Debug, Clone)]
pub struct ApiKeyGuard {
    expected_key: Option<String>,
}

impl ApiKeyGuard {
    /// A guard that lets every request through.
    pub fn open() -> Self {
        Self { expected_key: None }
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            expected_key: Some(api_key.into()),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        match config.method {
            AuthMethod::None => Ok(Self::open()),
            AuthMethod::ApiKey => {
                let api_key = config
                    .api_key
                    .clone()
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        AuthError::ConfigurationError(
                            "api_key must be set when using api_key auth method".to_string(),
                        )
                    })?;
                Ok(Self::new(api_key))
            }
        }
    }

    pub fn method(&self) -> AuthMethod {
        if self.expected_key.is_some() {
            AuthMethod::ApiKey
        } else {
            AuthMethod::None
        }
    }

    /// Validate the raw `Authorization` and `X-API-Key` header values.
    pub fn check(
        &self,
        authorization: Option<&str>,
        x_api_key: Option<&str>,
    ) -> Result<(), AuthError> {
        let Some(expected) = &self.expected_key else {
            return Ok(());
        };

        let provided = authorization
            .and_then(|h| {
                h.strip_prefix("Bearer ")
                    .or_else(|| h.strip_prefix("bearer "))
            })
            .or(x_api_key)
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(provided.trim().as_bytes(), expected.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
