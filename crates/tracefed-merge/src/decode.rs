//! The injected decoder seam.
//!
//! Mergers are written against the parsed shapes in `tracefed-types`, not
//! against any wire format. The proxy always asks backends for JSON, so
//! [`JsonDecoder`] is the production implementation; tests substitute their
//! own to drive decode-failure paths.

use thiserror::Error;
use tracefed_types::{
    SearchResponse, SearchTagValuesResponse, SearchTagValuesV2Response, SearchTagsResponse,
    SearchTagsV2Response, Trace, TraceByIdResponse,
};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed body: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}

pub trait ResponseDecoder: Send + Sync {
    fn trace(&self, body: &[u8]) -> Result<Trace, DecodeError>;
    fn trace_v2(&self, body: &[u8]) -> Result<TraceByIdResponse, DecodeError>;
    fn search(&self, body: &[u8]) -> Result<SearchResponse, DecodeError>;
    fn tag_names(&self, body: &[u8]) -> Result<SearchTagsResponse, DecodeError>;
    fn tag_names_v2(&self, body: &[u8]) -> Result<SearchTagsV2Response, DecodeError>;
    fn tag_values(&self, body: &[u8]) -> Result<SearchTagValuesResponse, DecodeError>;
    fn tag_values_v2(&self, body: &[u8]) -> Result<SearchTagValuesV2Response, DecodeError>;
}

/// Decoder for the JSON the proxy requests from every backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl ResponseDecoder for JsonDecoder {
    fn trace(&self, body: &[u8]) -> Result<Trace, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn trace_v2(&self, body: &[u8]) -> Result<TraceByIdResponse, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn search(&self, body: &[u8]) -> Result<SearchResponse, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn tag_names(&self, body: &[u8]) -> Result<SearchTagsResponse, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn tag_names_v2(&self, body: &[u8]) -> Result<SearchTagsV2Response, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn tag_values(&self, body: &[u8]) -> Result<SearchTagValuesResponse, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn tag_values_v2(&self, body: &[u8]) -> Result<SearchTagValuesV2Response, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }
}
