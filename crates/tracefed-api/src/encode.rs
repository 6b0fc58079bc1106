//! Response encoding: binary protobuf when the caller asks for it, the
//! protobuf-compatible JSON form otherwise.

use crate::errors::ApiError;
use axum::http::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub const PROTOBUF_MEDIA_TYPE: &str = "application/protobuf";
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Whether the request's Accept header names the binary protobuf media type.
pub fn wants_protobuf(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(|accept| accept.contains(PROTOBUF_MEDIA_TYPE))
        .unwrap_or(false)
}

/// Encode a merged response per the Accept header. A marshalling failure is
/// the one condition that surfaces as a 500.
pub fn proto_or_json<T>(headers: &HeaderMap, value: &T) -> Response
where
    T: prost::Message + Serialize,
{
    if wants_protobuf(headers) {
        let body = value.encode_to_vec();
        ([(CONTENT_TYPE, PROTOBUF_MEDIA_TYPE)], body).into_response()
    } else {
        match serde_json::to_vec(value) {
            Ok(body) => ([(CONTENT_TYPE, JSON_MEDIA_TYPE)], body).into_response(),
            Err(e) => ApiError::encoding(e.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn accept_header_selects_protobuf() {
        let mut headers = HeaderMap::new();
        assert!(!wants_protobuf(&headers));

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!wants_protobuf(&headers));

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/protobuf, application/json"),
        );
        assert!(wants_protobuf(&headers));
    }

    #[test]
    fn json_is_the_default_encoding() {
        let headers = HeaderMap::new();
        let value = tracefed_types::SearchTagsResponse {
            tag_names: vec!["service.name".into()],
            metrics: None,
        };
        let response = proto_or_json(&headers, &value);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            JSON_MEDIA_TYPE
        );
    }

    #[test]
    fn protobuf_body_decodes_back() {
        use prost::Message;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(PROTOBUF_MEDIA_TYPE));
        let value = tracefed_types::SearchTagsResponse {
            tag_names: vec!["http.method".into(), "service.name".into()],
            metrics: None,
        };
        let encoded = value.encode_to_vec();
        let decoded = tracefed_types::SearchTagsResponse::decode(encoded.as_slice()).unwrap();
        assert_eq!(decoded, value);
    }
}
