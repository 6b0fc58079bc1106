//! Search-result merging: summary reconciliation, metric summation, and
//! recency ordering.

use crate::classify::{classify_envelopes, Ingested};
use crate::decode::ResponseDecoder;
use crate::provenance::Provenance;
use std::collections::HashMap;
use tracefed_types::{BackendResponse, SearchMetrics, SearchResponse, TraceSearchMetadata};

/// Merge search responses from all backends.
///
/// An empty result list from a backend is a legitimate answer, not a miss.
pub fn merge_search(
    responses: &[BackendResponse],
    decoder: &dyn ResponseDecoder,
) -> (SearchResponse, Provenance) {
    let mut provenance = Provenance::default();
    let mut by_trace_id: HashMap<String, TraceSearchMetadata> = HashMap::new();
    let mut metrics = SearchMetrics::default();
    let mut saw_metrics = false;

    classify_envelopes(responses, &mut provenance, |_, body| {
        let response = decoder.search(body)?;
        if let Some(backend_metrics) = &response.metrics {
            metrics.accumulate(backend_metrics);
            saw_metrics = true;
        }
        for summary in response.traces {
            let summary = normalized(summary);
            match by_trace_id.remove(&summary.trace_id) {
                Some(existing) => {
                    let merged = reconcile(existing, summary);
                    by_trace_id.insert(merged.trace_id.clone(), merged);
                }
                None => {
                    by_trace_id.insert(summary.trace_id.clone(), summary);
                }
            }
        }
        Ok(Ingested::Content)
    });

    let mut traces: Vec<TraceSearchMetadata> = by_trace_id
        .into_values()
        .map(|mut summary| {
            summary.span_set = summary.span_sets.first().cloned();
            summary
        })
        .collect();
    // most recent first, ties by trace id for a stable order
    traces.sort_by(|a, b| {
        b.start_time_unix_nano
            .cmp(&a.start_time_unix_nano)
            .then_with(|| a.trace_id.cmp(&b.trace_id))
    });

    provenance.total_spans = traces.len();
    let response = SearchResponse {
        traces,
        metrics: saw_metrics.then_some(metrics),
    };
    (response, provenance)
}

/// Older backends populate only the deprecated single span-set; lift it into
/// the list so reconciliation has one shape to work with.
fn normalized(mut summary: TraceSearchMetadata) -> TraceSearchMetadata {
    if summary.span_sets.is_empty() {
        if let Some(span_set) = summary.span_set.take() {
            summary.span_sets.push(span_set);
        }
    }
    summary
}

/// Combine two summaries for the same trace. Field rules:
/// first non-empty wins for names, minimum non-zero start, maximum non-zero
/// duration, per-service maxima for span/error counts, span-sets unioned by
/// key in input order.
fn reconcile(
    mut existing: TraceSearchMetadata,
    incoming: TraceSearchMetadata,
) -> TraceSearchMetadata {
    if existing.trace_id.is_empty() {
        existing.trace_id = incoming.trace_id;
    }
    if existing.root_service_name.is_empty() {
        existing.root_service_name = incoming.root_service_name;
    }
    if existing.root_trace_name.is_empty() {
        existing.root_trace_name = incoming.root_trace_name;
    }

    // zero start / duration means "unknown", never a candidate
    if incoming.start_time_unix_nano != 0
        && (existing.start_time_unix_nano == 0
            || incoming.start_time_unix_nano < existing.start_time_unix_nano)
    {
        existing.start_time_unix_nano = incoming.start_time_unix_nano;
    }
    if incoming.duration_ms > existing.duration_ms {
        existing.duration_ms = incoming.duration_ms;
    }

    // Max, not sum: each backend reports what it saw for this trace, and the
    // largest observation is the least-lossy estimate of the true count.
    for (service, stats) in incoming.service_stats {
        let entry = existing.service_stats.entry(service).or_default();
        entry.span_count = entry.span_count.max(stats.span_count);
        entry.error_count = entry.error_count.max(stats.error_count);
    }

    let mut seen_keys: std::collections::HashSet<String> =
        existing.span_sets.iter().map(|ss| ss.key()).collect();
    for span_set in incoming.span_sets {
        if seen_keys.insert(span_set.key()) {
            existing.span_sets.push(span_set);
        }
    }

    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::JsonDecoder;
    use bytes::Bytes;
    use http::StatusCode;
    use tracefed_types::{ServiceStats, SpanSet, SpanStub};

    fn summary(trace_id: &str, start: u64, duration_ms: u32) -> TraceSearchMetadata {
        TraceSearchMetadata {
            trace_id: trace_id.into(),
            root_service_name: "api".into(),
            root_trace_name: "GET /".into(),
            start_time_unix_nano: start,
            duration_ms,
            ..Default::default()
        }
    }

    fn ok_search(backend: &str, response: &SearchResponse) -> BackendResponse {
        BackendResponse::completed(
            backend,
            StatusCode::OK,
            Bytes::from(serde_json::to_vec(response).unwrap()),
        )
    }

    fn response_with(traces: Vec<TraceSearchMetadata>, inspected_traces: u64) -> SearchResponse {
        SearchResponse {
            traces,
            metrics: Some(SearchMetrics {
                inspected_traces,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn duplicate_summary_reconciled_and_metrics_summed() {
        let a = response_with(vec![summary("01", 1_000_000_000, 100)], 50);
        let b = response_with(vec![summary("01", 1_000_000_000, 150)], 75);

        let (merged, prov) = merge_search(&[ok_search("a", &a), ok_search("b", &b)], &JsonDecoder);

        assert_eq!(merged.traces.len(), 1);
        assert_eq!(merged.traces[0].duration_ms, 150);
        assert_eq!(merged.metrics.unwrap().inspected_traces, 125);
        assert_eq!(prov.with_content, 2);
        assert!(!prov.partial);
    }

    #[test]
    fn earliest_non_zero_start_wins() {
        let a = response_with(vec![summary("01", 2_000_000_000, 100)], 0);
        let b = response_with(vec![summary("01", 1_000_000_000, 100)], 0);
        let c = response_with(vec![summary("01", 0, 100)], 0);

        let (merged, _) = merge_search(
            &[ok_search("a", &a), ok_search("b", &b), ok_search("c", &c)],
            &JsonDecoder,
        );
        assert_eq!(merged.traces[0].start_time_unix_nano, 1_000_000_000);
    }

    #[test]
    fn distinct_summaries_ordered_most_recent_first() {
        let a = response_with(vec![summary("01", 2_000_000_000, 10)], 0);
        let b = response_with(vec![summary("02", 1_000_000_000, 10)], 0);

        let (merged, _) = merge_search(&[ok_search("b", &b), ok_search("a", &a)], &JsonDecoder);
        let ids: Vec<_> = merged.traces.iter().map(|t| t.trace_id.as_str()).collect();
        assert_eq!(ids, vec!["01", "02"]);
    }

    #[test]
    fn start_time_ties_break_by_trace_id() {
        let a = response_with(vec![summary("0b", 1_000_000_000, 10)], 0);
        let b = response_with(vec![summary("0a", 1_000_000_000, 10)], 0);

        let (merged, _) = merge_search(&[ok_search("a", &a), ok_search("b", &b)], &JsonDecoder);
        let ids: Vec<_> = merged.traces.iter().map(|t| t.trace_id.as_str()).collect();
        assert_eq!(ids, vec!["0a", "0b"]);
    }

    #[test]
    fn first_non_empty_names_win() {
        let mut anonymous = summary("01", 1_000_000_000, 10);
        anonymous.root_service_name = String::new();
        anonymous.root_trace_name = String::new();
        let named = summary("01", 1_000_000_000, 10);

        let (merged, _) = merge_search(
            &[
                ok_search("a", &response_with(vec![anonymous], 0)),
                ok_search("b", &response_with(vec![named], 0)),
            ],
            &JsonDecoder,
        );
        assert_eq!(merged.traces[0].root_service_name, "api");
        assert_eq!(merged.traces[0].root_trace_name, "GET /");
    }

    #[test]
    fn service_stats_take_per_service_maxima() {
        let mut a = summary("01", 1, 1);
        a.service_stats.insert(
            "api".into(),
            ServiceStats {
                span_count: 10,
                error_count: 0,
            },
        );
        let mut b = summary("01", 1, 1);
        b.service_stats.insert(
            "api".into(),
            ServiceStats {
                span_count: 7,
                error_count: 3,
            },
        );
        b.service_stats.insert(
            "db".into(),
            ServiceStats {
                span_count: 2,
                error_count: 0,
            },
        );

        let (merged, _) = merge_search(
            &[
                ok_search("a", &response_with(vec![a], 0)),
                ok_search("b", &response_with(vec![b], 0)),
            ],
            &JsonDecoder,
        );
        let stats = &merged.traces[0].service_stats;
        assert_eq!(stats["api"].span_count, 10);
        assert_eq!(stats["api"].error_count, 3);
        assert_eq!(stats["db"].span_count, 2);
    }

    #[test]
    fn span_sets_union_by_key_and_fill_deprecated_field() {
        let set = |span_id: &str, matched: u32| SpanSet {
            spans: if span_id.is_empty() {
                vec![]
            } else {
                vec![SpanStub {
                    span_id: span_id.into(),
                    ..Default::default()
                }]
            },
            matched,
        };

        let mut a = summary("01", 1, 1);
        a.span_sets = vec![set("aa", 1), set("", 4)];
        let mut b = summary("01", 1, 1);
        b.span_sets = vec![set("aa", 1), set("bb", 2)];

        let (merged, _) = merge_search(
            &[
                ok_search("a", &response_with(vec![a], 0)),
                ok_search("b", &response_with(vec![b], 0)),
            ],
            &JsonDecoder,
        );
        let result = &merged.traces[0];
        let keys: Vec<_> = result.span_sets.iter().map(|ss| ss.key()).collect();
        assert_eq!(keys, vec!["aa", "matched:4", "bb"]);
        assert_eq!(result.span_set.as_ref().unwrap().key(), "aa");
    }

    #[test]
    fn deprecated_single_span_set_on_input_is_lifted() {
        let mut legacy = summary("01", 1, 1);
        legacy.span_set = Some(SpanSet {
            spans: vec![SpanStub {
                span_id: "cc".into(),
                ..Default::default()
            }],
            matched: 1,
        });

        let (merged, _) = merge_search(
            &[ok_search("a", &response_with(vec![legacy], 0))],
            &JsonDecoder,
        );
        assert_eq!(merged.traces[0].span_sets.len(), 1);
        assert_eq!(merged.traces[0].span_sets[0].key(), "cc");
    }

    #[test]
    fn empty_result_list_is_a_response_not_a_miss() {
        let empty = SearchResponse::default();
        let (merged, prov) = merge_search(&[ok_search("a", &empty)], &JsonDecoder);
        assert!(merged.traces.is_empty());
        assert_eq!(prov.responded, 1);
        assert_eq!(prov.with_content, 1);
        assert_eq!(prov.failed, 0);
    }

    #[test]
    fn failed_backend_marks_partial_but_results_survive() {
        let a = response_with(vec![summary("01", 1_000_000_000, 10)], 5);
        let responses = vec![
            ok_search("a", &a),
            BackendResponse::transport_error("b", "connection reset"),
        ];
        let (merged, prov) = merge_search(&responses, &JsonDecoder);
        assert_eq!(merged.traces.len(), 1);
        assert!(prov.partial);
        assert_eq!(prov.failed, 1);
    }
}
