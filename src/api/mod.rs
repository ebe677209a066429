//! REST client for the backend API.
//!
//! Thin typed wrappers over the backend's endpoints. Streaming endpoints are
//! consumed separately (`crate::stream`); this module only builds their URLs
//! and shares the HTTP connection pool.

pub mod cloud;
pub mod deployment;
pub mod projects;
pub mod pull_requests;
pub mod workflow;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::TokenProvider;

pub use projects::{CloudProvider, Project};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    prefix: String,
    token: Arc<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        prefix: impl Into<String>,
        token: Arc<dyn TokenProvider>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        ApiClient {
            http: reqwest::Client::new(),
            base_url,
            prefix: prefix.into(),
            token,
        }
    }

    /// The underlying HTTP client, shared with SSE connections so they reuse
    /// the same pool and TLS setup.
    pub fn http(&self) -> reqwest::Client {
        self.http.clone()
    }

    /// Absolute URL for an API path (prefix included).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    /// Current bearer token for endpoints consumed outside this client
    /// (stream connections attach it themselves).
    pub async fn bearer(&self) -> Result<Option<String>> {
        self.token.token().await
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder> {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header("Content-Type", "application/json");
        if let Some(token) = self.token.token().await? {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    pub(crate) async fn get(&self, path: &str) -> Result<reqwest::Response> {
        self.request(reqwest::Method::GET, path)
            .await?
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))
    }

    pub(crate) async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        self.request(reqwest::Method::POST, path)
            .await?
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))
    }

    pub(crate) async fn post_empty(&self, path: &str) -> Result<reqwest::Response> {
        self.request(reqwest::Method::POST, path)
            .await?
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))
    }

    pub(crate) async fn patch<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        self.request(reqwest::Method::PATCH, path)
            .await?
            .json(body)
            .send()
            .await
            .with_context(|| format!("PATCH {path} failed"))
    }
}

/// Read a JSON body, failing with status context on non-2xx responses.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        bail!("{what} failed with status {status}");
    }
    response
        .json::<T>()
        .await
        .with_context(|| format!("failed to parse {what} response"))
}
