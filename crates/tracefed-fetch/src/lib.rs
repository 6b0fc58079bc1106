//! # TraceFed Fetch
//!
//! The outbound half of the proxy: one [`BackendClient`] per configured
//! trace-store instance, and the [`fan_out`] dispatcher that runs a
//! per-backend operation against all of them in parallel under a concurrency
//! bound and a caller deadline.
//!
//! Neither layer interprets response bodies or status codes; both produce
//! [`BackendResponse`] envelopes and leave classification to the mergers.

pub mod client;
pub mod dispatch;

pub use client::{BackendClient, FetchError, TENANT_HEADER};
pub use dispatch::fan_out;
pub use tracefed_types::BackendResponse;
