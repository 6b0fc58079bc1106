//! Search handler: the query string is forwarded to every backend verbatim.

use crate::encode::proto_or_json;
use crate::handlers::log_query;
use crate::state::AppState;
use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::response::Response;
use tracefed_fetch::fan_out;
use tracefed_merge::merge_search;

pub async fn search(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let deadline = state.deadline();
    let raw_query = query.unwrap_or_default();

    let responses = fan_out(
        &state.backends,
        state.max_concurrent(),
        deadline,
        move |client, deadline| {
            let raw_query = raw_query.clone();
            async move { client.search(deadline, &raw_query).await }
        },
    )
    .await;

    let (merged, provenance) = merge_search(&responses, &state.decoder);
    log_query(&state, "search", &provenance, merged.traces.len());
    proto_or_json(&headers, &merged)
}
