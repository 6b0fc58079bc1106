//! Liveness and status endpoints.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

pub async fn ready() -> &'static str {
    "ready\n"
}

pub async fn echo() -> &'static str {
    "echo\n"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: String,
    pub revision: String,
    pub build_date: String,
}

impl BuildInfo {
    pub fn collect() -> Self {
        let revision = std::env::var("GIT_SHA")
            .or_else(|_| std::env::var("GITHUB_SHA"))
            .unwrap_or_else(|_| "unknown".to_string());
        let build_date =
            std::env::var("BUILD_TIMESTAMP").unwrap_or_else(|_| chrono::Utc::now().to_rfc3339());
        BuildInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            revision,
            build_date,
        }
    }
}

pub async fn buildinfo() -> Json<BuildInfo> {
    Json(BuildInfo::collect())
}

/// One configured backend as reported by `/api/status/instances`. Extra
/// header values are never echoed, only their names.
#[derive(Debug, Serialize)]
pub struct InstanceInfo {
    pub name: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub timeout: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
}

pub async fn instances(State(state): State<AppState>) -> Json<Vec<InstanceInfo>> {
    let listing = state
        .config
        .instances
        .iter()
        .map(|instance| InstanceInfo {
            name: instance.display_name().to_string(),
            endpoint: instance.endpoint.clone(),
            tenant_id: instance.tenant_id.clone(),
            timeout: humantime::format_duration(
                instance.effective_timeout(state.query_timeout()),
            )
            .to_string(),
            headers: instance
                .headers
                .as_ref()
                .map(|headers| headers.keys().cloned().collect())
                .unwrap_or_default(),
        })
        .collect();
    Json(listing)
}
