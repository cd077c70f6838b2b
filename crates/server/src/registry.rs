//! Upstream registry API client.
//!
//! The collector only ever asks the registry to forget a manifest by digest, so
//! that the registry's own blob GC can later reclaim what the manifest referenced.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use rgc_core::config::RegistryConfig;

/// Registry client errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registry returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("invalid registry URL: {0}")]
    InvalidUrl(String),
}

/// Manifest invalidation against the registry HTTP API.
#[async_trait]
pub trait RegistryApi: Send + Sync + 'static {
    /// Delete the manifest `reference` (e.g. `sha256:...`) of repository `image`.
    ///
    /// A manifest the registry no longer knows counts as deleted.
    async fn delete_manifest(&self, image: &str, reference: &str) -> Result<(), RegistryError>;
}

/// Registry v2 API client over reqwest.
#[derive(Clone)]
pub struct HttpRegistryClient {
    http: reqwest::Client,
    base_url: Url,
    username: Option<String>,
    token: Option<String>,
}

impl std::fmt::Debug for HttpRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistryClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpRegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let base_url = Url::parse(config.url.trim())
            .map_err(|e| RegistryError::InvalidUrl(format!("{}: {e}", config.url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                config.url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url,
            username: config.username.clone().filter(|u| !u.is_empty()),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn manifest_url(&self, image: &str, reference: &str) -> Result<Url, RegistryError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let raw = format!("{base}/v2/{image}/manifests/{reference}");
        Url::parse(&raw).map_err(|e| RegistryError::InvalidUrl(format!("{raw}: {e}")))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.username, &self.token) {
            (Some(user), token) => req.basic_auth(user, token.as_ref()),
            (None, Some(token)) => req.bearer_auth(token),
            (None, None) => req,
        }
    }
}

#[async_trait]
impl RegistryApi for HttpRegistryClient {
    async fn delete_manifest(&self, image: &str, reference: &str) -> Result<(), RegistryError> {
        let url = self.manifest_url(image, reference)?;
        let response = self.authorize(self.http.delete(url.clone())).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(image = %image, reference = %reference, "manifest already gone from registry");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        })
    }
}
