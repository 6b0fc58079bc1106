//! Search result model: trace summaries, span-sets, and scan metrics.

use crate::serde_util::{self, u64_string};
use crate::trace::KeyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub traces: Vec<TraceSearchMetadata>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SearchMetrics>,
}

/// One trace summary in a search result.
///
/// Identifiers here are hex strings on the wire, unlike the byte fields of
/// the trace model.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceSearchMetadata {
    #[prost(string, tag = "1")]
    #[serde(rename = "traceID", alias = "traceId", skip_serializing_if = "String::is_empty")]
    pub trace_id: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub root_service_name: String,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub root_trace_name: String,
    #[prost(uint64, tag = "4")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub start_time_unix_nano: u64,
    #[prost(uint32, tag = "5")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub duration_ms: u32,
    /// Deprecated single span-set, kept for older clients; mirrors the first
    /// element of `span_sets`.
    #[prost(message, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_set: Option<SpanSet>,
    #[prost(message, repeated, tag = "7")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub span_sets: Vec<SpanSet>,
    #[prost(btree_map = "string, message", tag = "8")]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub service_stats: BTreeMap<String, ServiceStats>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceStats {
    #[prost(uint32, tag = "1")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub span_count: u32,
    #[prost(uint32, tag = "2")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub error_count: u32,
}

/// Spans matched by the query for one trace.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanSet {
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<SpanStub>,
    #[prost(uint32, tag = "2")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub matched: u32,
}

impl SpanSet {
    /// Dedup key: first stub's identifier, else the matched count. This only
    /// deduplicates exact-copy span-sets across backends.
    pub fn key(&self) -> String {
        match self.spans.first() {
            Some(stub) if !stub.span_id.is_empty() => stub.span_id.clone(),
            _ => format!("matched:{}", self.matched),
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpanStub {
    #[prost(string, tag = "1")]
    #[serde(rename = "spanID", alias = "spanId", skip_serializing_if = "String::is_empty")]
    pub span_id: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[prost(uint64, tag = "3")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub start_time_unix_nano: u64,
    #[prost(uint64, tag = "4")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub duration_nanos: u64,
    #[prost(message, repeated, tag = "5")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

/// Scan-cost counters reported alongside search and tag results. Merged by
/// element-wise summation.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchMetrics {
    #[prost(uint64, tag = "1")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub inspected_traces: u64,
    #[prost(uint64, tag = "2")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub inspected_bytes: u64,
    #[prost(uint64, tag = "3")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub inspected_spans: u64,
    #[prost(uint32, tag = "4")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub total_blocks: u32,
    #[prost(uint32, tag = "5")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub completed_jobs: u32,
    #[prost(uint32, tag = "6")]
    #[serde(skip_serializing_if = "serde_util::is_zero_u32")]
    pub total_jobs: u32,
    #[prost(uint64, tag = "7")]
    #[serde(with = "u64_string", skip_serializing_if = "serde_util::is_zero_u64")]
    pub total_block_bytes: u64,
}

impl SearchMetrics {
    /// Element-wise accumulation across backends.
    pub fn accumulate(&mut self, other: &SearchMetrics) {
        self.inspected_traces += other.inspected_traces;
        self.inspected_bytes += other.inspected_bytes;
        self.inspected_spans += other.inspected_spans;
        self.total_blocks += other.total_blocks;
        self.completed_jobs += other.completed_jobs;
        self.total_jobs += other.total_jobs;
        self.total_block_bytes += other.total_block_bytes;
    }
}
