//! Route handlers: one thin adapter per exposed path.

pub mod search;
pub mod status;
pub mod tags;
pub mod traces;

use crate::state::AppState;
use tracefed_merge::Provenance;

/// One info record per query with the provenance counters; per-backend
/// outcomes are logged at debug level by the fetch and merge layers.
pub(crate) fn log_query(state: &AppState, kind: &str, provenance: &Provenance, result_size: usize) {
    tracing::info!(
        query = kind,
        queried = provenance.queried,
        responded = provenance.responded,
        with_content = provenance.with_content,
        not_found = provenance.not_found,
        failed = provenance.failed,
        partial = provenance.partial,
        total_spans = provenance.total_spans,
        result_size,
        "query merged"
    );
    for error in &provenance.errors {
        tracing::debug!(query = kind, backend_error = %error, "backend error");
    }
    // allow_partial_responses is advisory; a partial answer still goes out,
    // but the operator asked to hear about it.
    if provenance.partial && !state.config.allow_partial_responses {
        tracing::warn!(
            query = kind,
            failed = provenance.failed,
            "assembled a partial response while allow_partial_responses is disabled"
        );
    }
}
