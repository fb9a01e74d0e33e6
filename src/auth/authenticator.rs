//! Authenticator implementation

use super::types::AuthConfig;
use crate::error::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;

/// Authenticator applies a fixed `Authorization` header to HTTP requests
#[derive(Debug, Clone)]
pub struct Authenticator {
    config: AuthConfig,
    header_value: Option<String>,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Result<Self> {
        config.validate()?;
        let header_value = match &config {
            AuthConfig::None => None,
            AuthConfig::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                Some(format!("Basic {encoded}"))
            }
            AuthConfig::Bearer { token } => Some(format!("Bearer {token}")),
        };
        Ok(Self {
            config,
            header_value,
        })
    }

    /// The `Authorization` header value, if any
    pub fn header_value(&self) -> Option<&str> {
        self.header_value.as_deref()
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.header_value {
            Some(value) => req.header(AUTHORIZATION, value),
            None => req,
        }
    }

    /// Get the auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
