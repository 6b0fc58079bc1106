//! Single-trace assembly across backends.
//!
//! Spans are deduplicated by identity (the span identifier bytes plus the
//! kind byte), with the first complete record winning; duplicates across
//! backends are expected to be semantically identical. Two spans sharing an
//! identifier but differing in kind (paired client/server spans in some
//! instrumentations) are distinct and both kept. Assembly stops per trace
//! once the configured byte budget would be exceeded; later, smaller
//! contributions may still fit.

use crate::classify::{classify_envelopes, Ingested};
use crate::decode::ResponseDecoder;
use crate::provenance::Provenance;
use prost::Message;
use std::collections::HashSet;
use tracefed_types::{
    BackendResponse, ResourceSpans, ScopeSpans, Span, Trace, TraceByIdMetrics,
};

/// Output of the trace merger: the assembled trace (absent when no backend
/// had content) plus provenance.
#[derive(Debug, Clone)]
pub struct CombinedTrace {
    pub trace: Option<Trace>,
    pub metrics: Option<TraceByIdMetrics>,
    pub provenance: Provenance,
}

/// Merge v1 responses (a bare trace document per backend).
pub fn merge_trace_v1(
    responses: &[BackendResponse],
    decoder: &dyn ResponseDecoder,
    max_bytes: usize,
) -> CombinedTrace {
    let mut assembler = Assembler::new(max_bytes);
    let mut provenance = Provenance::default();

    classify_envelopes(responses, &mut provenance, |_, body| {
        let trace = decoder.trace(body)?;
        Ok(assembler.consume(trace))
    });

    assembler.finish(provenance, None)
}

/// Merge v2 responses (`{trace, metrics}` wrapper per backend). Scan metrics
/// are summed across responded backends.
pub fn merge_trace_v2(
    responses: &[BackendResponse],
    decoder: &dyn ResponseDecoder,
    max_bytes: usize,
) -> CombinedTrace {
    let mut assembler = Assembler::new(max_bytes);
    let mut provenance = Provenance::default();
    let mut inspected_bytes = 0u64;
    let mut saw_metrics = false;

    classify_envelopes(responses, &mut provenance, |_, body| {
        let wrapper = decoder.trace_v2(body)?;
        if let Some(metrics) = &wrapper.metrics {
            inspected_bytes += metrics.inspected_bytes;
            saw_metrics = true;
        }
        match wrapper.trace {
            Some(trace) => Ok(assembler.consume(trace)),
            None => Ok(Ingested::Empty),
        }
    });

    let metrics = saw_metrics.then_some(TraceByIdMetrics { inspected_bytes });
    assembler.finish(provenance, metrics)
}

/// Assembly state: deduplicated spans in their resource/scope structure plus
/// a running byte estimate.
struct Assembler {
    seen: HashSet<Vec<u8>>,
    batches: Vec<ResourceSpans>,
    size: usize,
    max_bytes: usize,
    span_count: usize,
}

impl Assembler {
    fn new(max_bytes: usize) -> Self {
        Assembler {
            seen: HashSet::new(),
            batches: Vec::new(),
            size: 0,
            max_bytes,
            span_count: 0,
        }
    }

    /// Ingest one decoded trace. Returns whether the document had any
    /// resource groups at all; a zero-group document is a not-found answer.
    fn consume(&mut self, trace: Trace) -> Ingested {
        if trace.is_empty() {
            return Ingested::Empty;
        }
        for batch in trace.batches {
            if !self.consume_batch(batch) {
                // Byte budget reached: drop the remainder of this trace.
                break;
            }
        }
        Ingested::Content
    }

    /// Returns false once the byte budget stops this trace's ingestion.
    fn consume_batch(&mut self, batch: ResourceSpans) -> bool {
        let mut kept = ResourceSpans {
            resource: batch.resource,
            scope_spans: Vec::new(),
            schema_url: batch.schema_url,
        };
        let mut within_budget = true;

        'scopes: for scope_group in batch.scope_spans {
            let mut kept_group = ScopeSpans {
                scope: scope_group.scope,
                spans: Vec::new(),
                schema_url: scope_group.schema_url,
            };
            for span in scope_group.spans {
                let key = span_identity(&span);
                if self.seen.contains(&key) {
                    continue;
                }
                let cost = span.encoded_len();
                if self.size + cost > self.max_bytes {
                    within_budget = false;
                    if !kept_group.spans.is_empty() {
                        kept.scope_spans.push(kept_group);
                    }
                    break 'scopes;
                }
                self.seen.insert(key);
                self.size += cost;
                self.span_count += 1;
                kept_group.spans.push(span);
            }
            if !kept_group.spans.is_empty() {
                kept.scope_spans.push(kept_group);
            }
        }

        if !kept.scope_spans.is_empty() {
            self.batches.push(kept);
        }
        within_budget
    }

    fn finish(mut self, mut provenance: Provenance, metrics: Option<TraceByIdMetrics>) -> CombinedTrace {
        for batch in &mut self.batches {
            for scope_group in &mut batch.scope_spans {
                scope_group
                    .spans
                    .sort_by(|a, b| span_order(a).cmp(&span_order(b)));
            }
        }
        // Stable output: resource groups ordered by their earliest span.
        self.batches.sort_by_key(earliest_span);

        provenance.total_spans = self.span_count;
        let trace = if self.batches.is_empty() {
            None
        } else {
            Some(Trace {
                batches: self.batches,
            })
        };
        CombinedTrace {
            trace,
            metrics,
            provenance,
        }
    }
}

/// Composite dedup key: span identifier bytes followed by the kind byte.
fn span_identity(span: &Span) -> Vec<u8> {
    let mut key = Vec::with_capacity(span.span_id.len() + 1);
    key.extend_from_slice(&span.span_id);
    key.push(span.kind as u8);
    key
}

fn span_order(span: &Span) -> (u64, Vec<u8>) {
    (span.start_time_unix_nano, span.span_id.clone())
}

fn earliest_span(batch: &ResourceSpans) -> (u64, Vec<u8>) {
    batch
        .scope_spans
        .iter()
        .flat_map(|ss| &ss.spans)
        .map(span_order)
        .min()
        .unwrap_or((u64::MAX, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::JsonDecoder;
    use bytes::Bytes;
    use http::StatusCode;
    use tracefed_types::trace::single_span_trace;
    use tracefed_types::SpanKind;

    const MAX_BYTES: usize = 50 * 1024 * 1024;

    fn span(id: u8, kind: SpanKind, start: u64) -> Span {
        Span {
            trace_id: vec![0xAB; 16],
            span_id: vec![0, 0, 0, 0, 0, 0, 0, id],
            name: format!("span-{id}"),
            kind: kind as i32,
            start_time_unix_nano: start,
            end_time_unix_nano: start + 1_000_000_000,
            ..Default::default()
        }
    }

    fn ok_trace(backend: &str, trace: &Trace) -> BackendResponse {
        BackendResponse::completed(
            backend,
            StatusCode::OK,
            Bytes::from(serde_json::to_vec(trace).unwrap()),
        )
    }

    fn not_found(backend: &str) -> BackendResponse {
        BackendResponse::completed(backend, StatusCode::NOT_FOUND, Bytes::new())
    }

    #[test]
    fn one_backend_has_trace_other_reports_not_found() {
        let trace = single_span_trace("api", span(1, SpanKind::Server, 1_000_000_000));
        let responses = vec![ok_trace("a", &trace), not_found("b")];

        let combined = merge_trace_v1(&responses, &JsonDecoder, MAX_BYTES);
        let merged = combined.trace.expect("trace present");
        assert_eq!(merged.batches.len(), 1);
        assert_eq!(merged.span_count(), 1);

        let prov = combined.provenance;
        assert_eq!(prov.queried, 2);
        assert_eq!(prov.responded, 2);
        assert_eq!(prov.with_content, 1);
        assert_eq!(prov.not_found, 1);
        assert_eq!(prov.failed, 0);
        assert_eq!(prov.total_spans, 1);
        assert!(!prov.partial);
    }

    #[test]
    fn duplicate_span_across_backends_kept_once() {
        let trace = single_span_trace("api", span(1, SpanKind::Server, 1_000_000_000));
        let responses = vec![ok_trace("a", &trace), ok_trace("b", &trace)];

        let combined = merge_trace_v1(&responses, &JsonDecoder, MAX_BYTES);
        let merged = combined.trace.expect("trace present");
        assert_eq!(merged.span_count(), 1);
        assert_eq!(combined.provenance.with_content, 2);
        assert_eq!(combined.provenance.total_spans, 1);
    }

    #[test]
    fn same_span_id_different_kind_both_kept() {
        let client_side = single_span_trace("caller", span(1, SpanKind::Client, 1_000_000_000));
        let server_side = single_span_trace("callee", span(1, SpanKind::Server, 1_100_000_000));
        let responses = vec![ok_trace("a", &client_side), ok_trace("b", &server_side)];

        let combined = merge_trace_v1(&responses, &JsonDecoder, MAX_BYTES);
        assert_eq!(combined.trace.unwrap().span_count(), 2);
    }

    #[test]
    fn disjoint_spans_sorted_by_start_time() {
        let early = single_span_trace("service-b", span(2, SpanKind::Server, 1_500_000_000));
        let late = single_span_trace("service-a", span(1, SpanKind::Server, 2_000_000_000));
        let responses = vec![ok_trace("a", &late), ok_trace("b", &early)];

        let combined = merge_trace_v1(&responses, &JsonDecoder, MAX_BYTES);
        let merged = combined.trace.expect("trace present");
        assert_eq!(merged.batches.len(), 2);
        assert_eq!(combined.provenance.total_spans, 2);

        // resource groups ordered by earliest span start
        let first_span = &merged.batches[0].scope_spans[0].spans[0];
        assert_eq!(first_span.start_time_unix_nano, 1_500_000_000);
    }

    #[test]
    fn tie_on_start_time_breaks_by_span_id() {
        let mut trace = single_span_trace("api", span(2, SpanKind::Server, 1_000_000_000));
        trace.batches[0].scope_spans[0]
            .spans
            .push(span(1, SpanKind::Server, 1_000_000_000));
        let responses = vec![ok_trace("a", &trace)];

        let combined = merge_trace_v1(&responses, &JsonDecoder, MAX_BYTES);
        let merged = combined.trace.unwrap();
        let spans = &merged.batches[0].scope_spans[0].spans;
        assert_eq!(spans[0].span_id[7], 1);
        assert_eq!(spans[1].span_id[7], 2);
    }

    #[test]
    fn byte_budget_stops_ingestion_without_error() {
        let mut big = single_span_trace("api", span(1, SpanKind::Server, 1_000_000_000));
        for i in 2..=20 {
            big.batches[0].scope_spans[0]
                .spans
                .push(span(i, SpanKind::Server, 1_000_000_000 + i as u64));
        }
        let single_cost = big.batches[0].scope_spans[0].spans[0].encoded_len();
        // room for roughly three spans
        let budget = single_cost * 3 + single_cost / 2;

        let responses = vec![ok_trace("a", &big)];
        let combined = merge_trace_v1(&responses, &JsonDecoder, budget);
        let merged = combined.trace.expect("partial assembly still emitted");
        assert!(merged.span_count() >= 1);
        assert!(merged.span_count() < 20);
        assert!(!combined.provenance.partial, "cap is not a failure");
    }

    #[test]
    fn later_backend_still_contributes_after_cap_hit() {
        // wide spans from the first backend exhaust the budget; a narrow span
        // from the second still fits in the remainder
        let wide = |id: u8, start: u64| Span {
            name: format!("{:A<200}", format!("wide-{id}-")),
            ..span(id, SpanKind::Server, start)
        };
        let mut big = single_span_trace("api", wide(1, 1_000_000_000));
        for i in 2..=10 {
            big.batches[0].scope_spans[0]
                .spans
                .push(wide(i, 1_000_000_000 + i as u64));
        }
        let mut narrow = span(99, SpanKind::Server, 900_000_000);
        narrow.name = "s".into();
        let small = single_span_trace("api", narrow);

        let cost = big.batches[0].scope_spans[0].spans[0].encoded_len();
        let budget = cost * 5 + cost / 2;
        let responses = vec![ok_trace("a", &big), ok_trace("b", &small)];

        let combined = merge_trace_v1(&responses, &JsonDecoder, budget);
        let merged = combined.trace.unwrap();
        let has_late_contribution = merged
            .batches
            .iter()
            .flat_map(|b| &b.scope_spans)
            .flat_map(|ss| &ss.spans)
            .any(|s| s.span_id[7] == 99);
        assert!(has_late_contribution);
    }

    #[test]
    fn empty_document_counts_as_not_found() {
        let responses = vec![ok_trace("a", &Trace::default()), not_found("b")];
        let combined = merge_trace_v1(&responses, &JsonDecoder, MAX_BYTES);
        assert!(combined.trace.is_none());
        assert_eq!(combined.provenance.not_found, 2);
        assert_eq!(combined.provenance.with_content, 0);
        assert!(!combined.provenance.partial);
    }

    #[test]
    fn malformed_body_fails_that_backend_only() {
        let trace = single_span_trace("api", span(1, SpanKind::Server, 1_000_000_000));
        let responses = vec![
            BackendResponse::completed("bad", StatusCode::OK, Bytes::from_static(b"{not json")),
            ok_trace("good", &trace),
        ];

        let combined = merge_trace_v1(&responses, &JsonDecoder, MAX_BYTES);
        assert_eq!(combined.trace.unwrap().span_count(), 1);
        let prov = combined.provenance;
        assert!(prov.partial);
        assert_eq!(prov.failed, 1);
        assert_eq!(prov.with_content, 1);
        assert!(prov.errors[0].starts_with("bad: "));
    }

    #[test]
    fn v2_wrapper_unwrapped_and_metrics_summed() {
        let trace = single_span_trace("api", span(1, SpanKind::Server, 1_000_000_000));
        let wrapper = |inspected: u64| {
            serde_json::json!({
                "trace": serde_json::to_value(&trace).unwrap(),
                "metrics": {"inspectedBytes": inspected.to_string()},
            })
        };
        let responses = vec![
            BackendResponse::completed(
                "a",
                StatusCode::OK,
                Bytes::from(serde_json::to_vec(&wrapper(100)).unwrap()),
            ),
            BackendResponse::completed(
                "b",
                StatusCode::OK,
                Bytes::from(serde_json::to_vec(&wrapper(50)).unwrap()),
            ),
        ];

        let combined = merge_trace_v2(&responses, &JsonDecoder, MAX_BYTES);
        assert_eq!(combined.trace.unwrap().span_count(), 1);
        assert_eq!(combined.metrics.unwrap().inspected_bytes, 150);
    }

    #[test]
    fn v2_missing_trace_is_not_found() {
        let responses = vec![BackendResponse::completed(
            "a",
            StatusCode::OK,
            Bytes::from_static(b"{}"),
        )];
        let combined = merge_trace_v2(&responses, &JsonDecoder, MAX_BYTES);
        assert!(combined.trace.is_none());
        assert_eq!(combined.provenance.not_found, 1);
    }

    #[test]
    fn merge_is_idempotent_over_its_own_output() {
        let a = single_span_trace("service-a", span(1, SpanKind::Server, 2_000_000_000));
        let b = single_span_trace("service-b", span(2, SpanKind::Client, 1_000_000_000));
        let first = merge_trace_v1(
            &[ok_trace("a", &a), ok_trace("b", &b)],
            &JsonDecoder,
            MAX_BYTES,
        );
        let merged = first.trace.unwrap();

        let second = merge_trace_v1(&[ok_trace("all", &merged)], &JsonDecoder, MAX_BYTES);
        assert_eq!(second.trace.unwrap(), merged);
    }
}
