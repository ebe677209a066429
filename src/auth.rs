//! Token acquisition for authenticated backend calls.
//!
//! The provider is injected into the API client rather than read from
//! global state, so tests and alternative credential sources can swap it.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current bearer token, or `None` for unauthenticated calls.
    async fn token(&self) -> Result<Option<String>>;
}

/// Reads the token from an environment variable on every call, so a token
/// refreshed out-of-band is picked up without restarting.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        EnvTokenProvider { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn token(&self) -> Result<Option<String>> {
        Ok(std::env::var(&self.var).ok().filter(|t| !t.is_empty()))
    }
}

/// Fixed token, for tests and scripted use.
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        StaticTokenProvider {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        StaticTokenProvider { token: None }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_its_token() {
        let provider = StaticTokenProvider::new("tok-123");
        assert_eq!(provider.token().await.unwrap(), Some("tok-123".to_string()));
    }

    #[tokio::test]
    async fn anonymous_provider_returns_none() {
        let provider = StaticTokenProvider::anonymous();
        assert_eq!(provider.token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn env_provider_reads_variable() {
        std::env::set_var("SIRPI_TEST_TOKEN_VAR", "from-env");
        let provider = EnvTokenProvider::new("SIRPI_TEST_TOKEN_VAR");
        assert_eq!(
            provider.token().await.unwrap(),
            Some("from-env".to_string())
        );
        std::env::remove_var("SIRPI_TEST_TOKEN_VAR");
    }

    #[tokio::test]
    async fn env_provider_treats_missing_as_none() {
        let provider = EnvTokenProvider::new("SIRPI_TEST_TOKEN_MISSING");
        assert_eq!(provider.token().await.unwrap(), None);
    }
}
