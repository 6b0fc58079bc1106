//! Configuration loading, validation, and env expansion for the TraceFed
//! proxy.
//!
//! The config file is YAML. Every key except `instances` has a default;
//! `instances` must name at least one backend. Durations are humantime
//! strings (`"30s"`, `"1m30s"`) or plain integer seconds.

mod expand;

pub use expand::expand_env_vars;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 3200;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 20;
pub const DEFAULT_MAX_BYTES_PER_TRACE: usize = 50 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}

/// Top-level proxy configuration, read-only after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    pub http_listen_address: String,
    pub http_listen_port: u16,

    /// Backend trace stores to fan queries out to. Required, non-empty.
    pub instances: Vec<BackendConfig>,

    /// Caller deadline applied to every incoming query.
    #[serde(with = "duration_str")]
    pub query_timeout: Duration,

    /// Width of the per-request dispatch semaphore.
    pub max_concurrent_queries: usize,

    /// Assembly-state size cap for trace-by-id merging.
    pub max_bytes_per_trace: usize,

    /// Advisory: recorded in provenance, does not change status codes.
    pub allow_partial_responses: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            http_listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            http_listen_port: DEFAULT_LISTEN_PORT,
            instances: Vec::new(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            max_bytes_per_trace: DEFAULT_MAX_BYTES_PER_TRACE,
            allow_partial_responses: true,
        }
    }
}

/// One backend trace store, immutable after startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Friendly name used in logs and provenance; the endpoint stands in
    /// when absent.
    pub name: Option<String>,

    /// Base URL of the backend's HTTP API.
    pub endpoint: String,

    /// Tenant identifier forwarded as the X-Scope-OrgID header.
    pub tenant_id: Option<String>,

    /// Per-instance timeout; absent or zero inherits `query_timeout`.
    #[serde(with = "opt_duration_str")]
    pub timeout: Option<Duration>,

    /// Additional headers attached to every request to this backend.
    pub headers: Option<BTreeMap<String, String>>,
}

impl BackendConfig {
    /// The name reported in logs and provenance.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => &self.endpoint,
        }
    }

    /// Per-instance timeout with inheritance from the global query timeout.
    pub fn effective_timeout(&self, query_timeout: Duration) -> Duration {
        match self.timeout {
            Some(t) if !t.is_zero() => t,
            _ => query_timeout,
        }
    }
}

impl ProxyConfig {
    /// Load and validate a config file. `expand_env` substitutes
    /// `${VAR}` / `${VAR:default}` references before parsing.
    pub fn load(path: impl AsRef<Path>, expand_env: bool) -> Result<ProxyConfig, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw, expand_env)
    }

    pub fn from_yaml(raw: &str, expand_env: bool) -> Result<ProxyConfig, ConfigError> {
        let raw = if expand_env {
            expand_env_vars(raw)
        } else {
            raw.to_string()
        };
        let config: ProxyConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instances.is_empty() {
            return Err(ConfigError::invalid(
                "at least one backend instance must be configured",
            ));
        }
        for (i, instance) in self.instances.iter().enumerate() {
            if instance.endpoint.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "instances[{i}]: endpoint is required"
                )));
            }
            let url = Url::parse(&instance.endpoint).map_err(|e| {
                ConfigError::invalid(format!(
                    "instances[{i}]: invalid endpoint {:?}: {e}",
                    instance.endpoint
                ))
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::invalid(format!(
                    "instances[{i}]: endpoint scheme must be http or https, got {:?}",
                    url.scheme()
                )));
            }
        }
        if self.query_timeout.is_zero() {
            return Err(ConfigError::invalid("query_timeout must be non-zero"));
        }
        if self.max_concurrent_queries == 0 {
            return Err(ConfigError::invalid(
                "max_concurrent_queries must be at least 1",
            ));
        }
        if self.max_bytes_per_trace == 0 {
            return Err(ConfigError::invalid("max_bytes_per_trace must be non-zero"));
        }
        Ok(())
    }

    /// A documented example config, printed by `-config.example`.
    pub fn example_yaml() -> &'static str {
        EXAMPLE_CONFIG
    }
}

const EXAMPLE_CONFIG: &str = r#"# TraceFed proxy configuration
http_listen_address: 0.0.0.0
http_listen_port: 3200

# Caller deadline applied to each incoming query.
query_timeout: 30s

# Concurrent backend requests per incoming query.
max_concurrent_queries: 20

# Cap on the assembled trace size.
max_bytes_per_trace: 52428800

allow_partial_responses: true

instances:
  - name: prod-us
    endpoint: http://tempo-us.example.com:3200
    tenant_id: team-observability
    timeout: 10s
    headers:
      X-Environment: prod
  - name: prod-eu
    endpoint: http://tempo-eu.example.com:3200
"#;

/// Humantime duration strings ("30s"), with plain integers read as seconds.
mod duration_str {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*v).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }

    pub(super) struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a duration string like \"30s\" or a number of seconds")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must not be negative"))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            humantime::parse_duration(v)
                .map_err(|e| E::custom(format!("invalid duration {v:?}: {e}")))
        }
    }
}

mod opt_duration_str {
    use super::duration_str::DurationVisitor;
    use serde::de::Deserializer;
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        v: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        deserializer.deserialize_option(OptVisitor)
    }

    struct OptVisitor;

    impl<'de> serde::de::Visitor<'de> for OptVisitor {
        type Value = Option<Duration>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("an optional duration")
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(DurationVisitor).map(Some)
        }
    }
}
