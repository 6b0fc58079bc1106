//! Per-backend HTTP client.
//!
//! Each configured instance gets one `BackendClient` sharing the process-wide
//! reqwest connection pool. Every operation issues a GET against a fixed path
//! under the backend's base URL with `Accept: application/json`, so the
//! mergers have a single decoder path regardless of what encoding the proxy's
//! own caller asked for.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracefed_config::BackendConfig;
use tracefed_types::BackendResponse;
use tracing::debug;
use url::Url;

/// Tenant identifier header understood by multi-tenant backends.
pub const TENANT_HEADER: &str = "X-Scope-OrgID";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("backend {name}: invalid endpoint {endpoint:?}: {message}")]
    InvalidEndpoint {
        name: String,
        endpoint: String,
        message: String,
    },

    #[error("backend {name}: invalid extra header {header:?}")]
    InvalidHeader { name: String, header: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP client for one configured backend instance.
#[derive(Debug, Clone)]
pub struct BackendClient {
    name: String,
    base_url: Url,
    tenant_id: Option<String>,
    timeout: Duration,
    extra_headers: HeaderMap,
    http: reqwest::Client,
}

impl BackendClient {
    /// Build a client from a backend descriptor. The per-instance timeout
    /// inherits `query_timeout` when absent or zero.
    pub fn new(
        http: reqwest::Client,
        config: &BackendConfig,
        query_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let name = config.display_name().to_string();
        let base_url = Url::parse(&config.endpoint).map_err(|e| FetchError::InvalidEndpoint {
            name: name.clone(),
            endpoint: config.endpoint.clone(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidEndpoint {
                name,
                endpoint: config.endpoint.clone(),
                message: "endpoint cannot serve as a base URL".into(),
            });
        }

        let mut extra_headers = HeaderMap::new();
        if let Some(headers) = &config.headers {
            for (key, value) in headers {
                let header_name =
                    HeaderName::try_from(key.as_str()).map_err(|_| FetchError::InvalidHeader {
                        name: name.clone(),
                        header: key.clone(),
                    })?;
                let header_value =
                    HeaderValue::try_from(value.as_str()).map_err(|_| FetchError::InvalidHeader {
                        name: name.clone(),
                        header: key.clone(),
                    })?;
                extra_headers.insert(header_name, header_value);
            }
        }

        Ok(BackendClient {
            name,
            base_url,
            tenant_id: config.tenant_id.clone(),
            timeout: config.effective_timeout(query_timeout),
            extra_headers,
            http,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch a trace by identifier, v1 shape (trace document).
    pub async fn trace_by_id(
        &self,
        deadline: Instant,
        trace_id: &str,
        raw_query: &str,
    ) -> BackendResponse {
        self.get(deadline, &["api", "traces", trace_id], raw_query)
            .await
    }

    /// Fetch a trace by identifier, v2 shape (`{trace, metrics}` wrapper).
    pub async fn trace_by_id_v2(
        &self,
        deadline: Instant,
        trace_id: &str,
        raw_query: &str,
    ) -> BackendResponse {
        self.get(deadline, &["api", "v2", "traces", trace_id], raw_query)
            .await
    }

    /// Search; the query string is forwarded verbatim.
    pub async fn search(&self, deadline: Instant, raw_query: &str) -> BackendResponse {
        self.get(deadline, &["api", "search"], raw_query).await
    }

    pub async fn search_tags(&self, deadline: Instant, raw_query: &str) -> BackendResponse {
        self.get(deadline, &["api", "search", "tags"], raw_query)
            .await
    }

    pub async fn search_tags_v2(&self, deadline: Instant, raw_query: &str) -> BackendResponse {
        self.get(deadline, &["api", "v2", "search", "tags"], raw_query)
            .await
    }

    pub async fn search_tag_values(
        &self,
        deadline: Instant,
        tag_name: &str,
        raw_query: &str,
    ) -> BackendResponse {
        self.get(deadline, &["api", "search", "tag", tag_name, "values"], raw_query)
            .await
    }

    pub async fn search_tag_values_v2(
        &self,
        deadline: Instant,
        tag_name: &str,
        raw_query: &str,
    ) -> BackendResponse {
        self.get(
            deadline,
            &["api", "v2", "search", "tag", tag_name, "values"],
            raw_query,
        )
        .await
    }

    fn endpoint_url(&self, segments: &[&str], raw_query: &str) -> Result<Url, String> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| "endpoint cannot serve as a base URL".to_string())?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        if !raw_query.is_empty() {
            url.set_query(Some(raw_query));
        }
        Ok(url)
    }

    async fn get(&self, deadline: Instant, segments: &[&str], raw_query: &str) -> BackendResponse {
        let url = match self.endpoint_url(segments, raw_query) {
            Ok(url) => url,
            Err(message) => return BackendResponse::transport_error(&self.name, message),
        };

        // Effective timeout is the tighter of the per-instance timeout and
        // whatever remains of the caller deadline.
        let remaining = deadline.saturating_duration_since(Instant::now());
        let timeout = self.timeout.min(remaining);
        if timeout.is_zero() {
            return BackendResponse::transport_error(&self.name, "deadline exceeded");
        }

        let mut request = self
            .http
            .get(url.clone())
            .timeout(timeout)
            .header(ACCEPT, "application/json")
            .headers(self.extra_headers.clone());
        if let Some(tenant) = &self.tenant_id {
            request = request.header(TENANT_HEADER, tenant);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    Ok(body) => {
                        debug!(
                            backend = %self.name,
                            %url,
                            status = status.as_u16(),
                            bytes = body.len(),
                            "backend request completed"
                        );
                        BackendResponse::completed(&self.name, status, body)
                    }
                    Err(e) => {
                        debug!(backend = %self.name, %url, error = %e, "body read failed");
                        BackendResponse::transport_error(
                            &self.name,
                            format!("body read failed: {e}"),
                        )
                    }
                }
            }
            Err(e) => {
                let message = if e.is_timeout() {
                    "deadline exceeded".to_string()
                } else {
                    e.to_string()
                };
                debug!(backend = %self.name, %url, error = %message, "backend request failed");
                BackendResponse::transport_error(&self.name, message)
            }
        }
    }
}

/// Build one client per configured instance over a shared connection pool.
pub fn build_clients(
    instances: &[BackendConfig],
    query_timeout: Duration,
) -> Result<Vec<std::sync::Arc<BackendClient>>, FetchError> {
    let http = reqwest::Client::builder().gzip(true).build()?;
    instances
        .iter()
        .map(|config| BackendClient::new(http.clone(), config, query_timeout).map(std::sync::Arc::new))
        .collect()
}
