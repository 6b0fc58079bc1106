//! # TraceFed Types
//!
//! Shared wire types for the TraceFed federation proxy. This crate holds the
//! parsed-trace model (OTLP-shaped resource/scope/span groups), the search
//! result model, and the tag query models, used across the fetch, merge, and
//! API crates.
//!
//! Every message derives both `prost::Message` (field numbers follow the
//! public OTLP / trace-store protos, so binary output is compatible with
//! native clients) and `serde` with a protobuf-JSON mapping. The JSON side is
//! deliberately lenient on decode: 64-bit integers are accepted as strings or
//! numbers, span/trace identifiers as base64 or hex, and enums as names or
//! numbers, because federated backends span deployment generations that
//! marshal differently. Output is always the jsonpb form (base64 identifiers,
//! stringified 64-bit integers, enum names).
//!
//! ## Organization
//!
//! - `trace`: trace-by-id model (resource groups, scope groups, spans)
//! - `search`: search result summaries and scan metrics
//! - `tags`: tag name / tag value responses, flat and scoped
//! - `envelope`: the per-backend response envelope shared by fetch and merge
//! - `serde_util`: the lenient protobuf-JSON field adapters

pub mod envelope;
pub mod search;
pub mod serde_util;
pub mod tags;
pub mod trace;

pub use envelope::BackendResponse;
pub use search::{
    SearchMetrics, SearchResponse, ServiceStats, SpanSet, SpanStub, TraceSearchMetadata,
};
pub use tags::{
    SearchTagValuesResponse, SearchTagValuesV2Response, SearchTagsResponse, SearchTagsV2Response,
    SearchTagsV2Scope, TagValue,
};
pub use trace::{
    AnyValue, ArrayValue, InstrumentationScope, KeyValue, KeyValueList, PartialStatus, Resource,
    ResourceSpans, ScopeSpans, Span, SpanEvent, SpanKind, SpanLink, SpanStatus, StatusCode, Trace,
    TraceByIdMetrics, TraceByIdResponse, TraceByIdResponseV2,
};
