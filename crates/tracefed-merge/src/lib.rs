//! # TraceFed Merge
//!
//! The merge engine: pure functions from a per-backend envelope list to one
//! semantically-correct answer plus provenance. Four families:
//!
//! - [`trace`]: single-trace assembly with span-identity deduplication and a
//!   size cap
//! - [`search`]: search-result merging with summary reconciliation and
//!   metric summation
//! - [`tags`]: set-union mergers for tag names and tag values
//!
//! Mergers consume envelopes sequentially after the fan-out has completed,
//! so they hold no locks and are deterministic in the envelope input order.
//! Wire decoding goes through the [`decode::ResponseDecoder`] seam; the
//! algorithms only ever see the parsed shapes.

pub mod classify;
pub mod decode;
pub mod provenance;
pub mod search;
pub mod tags;
pub mod trace;

pub use classify::{classify_envelopes, Ingested};
pub use decode::{DecodeError, JsonDecoder, ResponseDecoder};
pub use provenance::Provenance;
pub use search::merge_search;
pub use tags::{merge_tag_names, merge_tag_names_v2, merge_tag_values, merge_tag_values_v2};
pub use trace::{merge_trace_v1, merge_trace_v2, CombinedTrace};
