//! Tag name and tag value handlers, flat and scope-partitioned.

use crate::encode::proto_or_json;
use crate::handlers::log_query;
use crate::state::AppState;
use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::response::Response;
use tracefed_fetch::fan_out;
use tracefed_merge::{
    merge_tag_names, merge_tag_names_v2, merge_tag_values, merge_tag_values_v2,
};

pub async fn tag_names(
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
            async move { client.search_tags(deadline, &raw_query).await }
        },
    )
    .await;

    let (merged, provenance) = merge_tag_names(&responses, &state.decoder);
    log_query(&state, "search_tags", &provenance, merged.tag_names.len());
    proto_or_json(&headers, &merged)
}

pub async fn tag_names_v2(
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
            async move { client.search_tags_v2(deadline, &raw_query).await }
        },
    )
    .await;

    let (merged, provenance) = merge_tag_names_v2(&responses, &state.decoder);
    log_query(&state, "search_tags_v2", &provenance, merged.scopes.len());
    proto_or_json(&headers, &merged)
}

pub async fn tag_values(
    State(state): State<AppState>,
    Path(tag_name): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let deadline = state.deadline();
    let raw_query = query.unwrap_or_default();

    let responses = fan_out(&state.backends, state.max_concurrent(), deadline, {
        let tag_name = tag_name.clone();
        move |client, deadline| {
            let tag_name = tag_name.clone();
            let raw_query = raw_query.clone();
            async move {
                client
                    .search_tag_values(deadline, &tag_name, &raw_query)
                    .await
            }
        }
    })
    .await;

    let (merged, provenance) = merge_tag_values(&responses, &state.decoder);
    log_query(&state, "search_tag_values", &provenance, merged.tag_values.len());
    proto_or_json(&headers, &merged)
}

pub async fn tag_values_v2(
    State(state): State<AppState>,
    Path(tag_name): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let deadline = state.deadline();
    let raw_query = query.unwrap_or_default();

    let responses = fan_out(&state.backends, state.max_concurrent(), deadline, {
        let tag_name = tag_name.clone();
        move |client, deadline| {
            let tag_name = tag_name.clone();
            let raw_query = raw_query.clone();
            async move {
                client
                    .search_tag_values_v2(deadline, &tag_name, &raw_query)
                    .await
            }
        }
    })
    .await;

    let (merged, provenance) = merge_tag_values_v2(&responses, &state.decoder);
    log_query(&state, "search_tag_values_v2", &provenance, merged.tag_values.len());
    proto_or_json(&headers, &merged)
}
