//! Trace-by-id handlers, v1 and v2.
//!
//! v1 is bit-compatible with a single-backend deployment: an assembled trace
//! or a plain 404, with partiality visible only in the logs. v2 always
//! answers 200 and carries completeness in-band.

use crate::encode::proto_or_json;
use crate::handlers::log_query;
use crate::state::AppState;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracefed_fetch::fan_out;
use tracefed_merge::{merge_trace_v1, merge_trace_v2};
use tracefed_types::{PartialStatus, Trace, TraceByIdResponse, TraceByIdResponseV2};

pub async fn trace_by_id(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let deadline = state.deadline();
    let raw_query = query.unwrap_or_default();

    let responses = fan_out(&state.backends, state.max_concurrent(), deadline, {
        let trace_id = trace_id.clone();
        move |client, deadline| {
            let trace_id = trace_id.clone();
            let raw_query = raw_query.clone();
            async move { client.trace_by_id(deadline, &trace_id, &raw_query).await }
        }
    })
    .await;

    let combined = merge_trace_v1(&responses, &state.decoder, state.max_trace_bytes());
    log_query(&state, "trace_by_id", &combined.provenance, combined.provenance.total_spans);

    match combined.trace {
        Some(trace) => {
            let response = TraceByIdResponse {
                trace: Some(trace),
                metrics: combined.metrics,
            };
            proto_or_json(&headers, &response)
        }
        // Indistinguishable from "trace does not exist", matching the
        // single-backend API.
        None => (StatusCode::NOT_FOUND, "trace not found").into_response(),
    }
}

pub async fn trace_by_id_v2(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let deadline = state.deadline();
    let raw_query = query.unwrap_or_default();

    let responses = fan_out(&state.backends, state.max_concurrent(), deadline, {
        let trace_id = trace_id.clone();
        move |client, deadline| {
            let trace_id = trace_id.clone();
            let raw_query = raw_query.clone();
            async move { client.trace_by_id_v2(deadline, &trace_id, &raw_query).await }
        }
    })
    .await;

    let combined = merge_trace_v2(&responses, &state.decoder, state.max_trace_bytes());
    log_query(
        &state,
        "trace_by_id_v2",
        &combined.provenance,
        combined.provenance.total_spans,
    );

    let status = if combined.provenance.partial {
        PartialStatus::Partial
    } else {
        PartialStatus::Complete
    };
    let response = TraceByIdResponseV2 {
        trace: combined.trace.or_else(|| Some(Trace::default())),
        metrics: combined.metrics,
        status: status as i32,
        message: combined.provenance.status_message(),
    };
    proto_or_json(&headers, &response)
}
