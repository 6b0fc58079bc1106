//! Shared application state: configuration plus one client per backend.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracefed_config::ProxyConfig;
use tracefed_fetch::client::build_clients;
use tracefed_fetch::{BackendClient, FetchError};
use tracefed_merge::JsonDecoder;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub backends: Arc<Vec<Arc<BackendClient>>>,
    pub decoder: JsonDecoder,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self, FetchError> {
        let backends = build_clients(&config.instances, config.query_timeout)?;
        Ok(AppState {
            config: Arc::new(config),
            backends: Arc::new(backends),
            decoder: JsonDecoder,
        })
    }

    /// Caller deadline for a request arriving now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.config.query_timeout
    }

    pub fn max_concurrent(&self) -> usize {
        self.config.max_concurrent_queries
    }

    pub fn max_trace_bytes(&self) -> usize {
        self.config.max_bytes_per_trace
    }

    pub fn query_timeout(&self) -> Duration {
        self.config.query_timeout
    }
}
