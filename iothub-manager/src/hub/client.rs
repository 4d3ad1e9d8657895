//! HTTP client for the hub service API

use std::sync::Arc;
use std::time::Duration;

use http::{header, Method, StatusCode};
use reqwest::{Client, RequestBuilder, Response, Url};
use tracing::{debug, error};

use crate::authn::token_mngr::TokenManagerExt;
use crate::errors::ManagerError;

/// Service API version sent with every request
pub const DEFAULT_API_VERSION: &str = "2021-04-12";

/// HTTP client options
#[derive(Debug, Clone)]
pub struct HubClientOptions {
    pub api_version: String,
    pub request_timeout: Duration,
}

impl Default for HubClientOptions {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the hub registry
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_version: String,
    tokens: Arc<dyn TokenManagerExt>,
}

impl HttpClient {
    /// Create a client for `https://{host_name}`
    pub fn new(
        host_name: &str,
        tokens: Arc<dyn TokenManagerExt>,
        options: HubClientOptions,
    ) -> Result<Self, ManagerError> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: format!("https://{}", host_name.trim_end_matches('/')),
            api_version: options.api_version,
            tokens,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Build the URL for a path below the base URL, segments are escaped
    pub(crate) fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ManagerError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ManagerError::ConfigError(format!("Invalid hub URL {}: {}", self.base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| ManagerError::ConfigError(format!("Invalid hub URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("api-version", &self.api_version);
        }

        Ok(url)
    }

    /// Start an authorized request
    pub(crate) async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, ManagerError> {
        let token = self.tokens.get_token().await?;
        debug!("{} {}", method, url.path());

        Ok(self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, token.as_str()))
    }

    /// Send a request and map error statuses onto domain errors
    pub(crate) async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, ManagerError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Hub request failed ({}): {} - {}", context, status, body);

        Err(match status {
            StatusCode::NOT_FOUND => ManagerError::NotFound(context.to_string()),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                ManagerError::DeploymentAlreadyExists(context.to_string())
            }
            _ => ManagerError::ExternalService(format!("{}: {} - {}", context, status, body)),
        })
    }
}
