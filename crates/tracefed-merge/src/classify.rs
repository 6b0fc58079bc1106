//! Shared envelope classification.
//!
//! Every merger walks the envelope list the same way; only the ingestion of
//! a successful body differs. Transport errors and non-2xx statuses become
//! `failed`, 404 becomes `not_found`, and a 2xx body is handed to the
//! merger's ingest closure, which reports whether it contained content.

use crate::decode::DecodeError;
use crate::provenance::Provenance;
use http::StatusCode;
use tracefed_types::BackendResponse;
use tracing::debug;

/// What an ingested 2xx body amounted to.
pub enum Ingested {
    Content,
    /// A well-formed body with nothing in it, e.g. a trace document with
    /// zero resource groups.
    Empty,
}

pub fn classify_envelopes<F>(
    responses: &[BackendResponse],
    provenance: &mut Provenance,
    mut ingest: F,
) where
    F: FnMut(&str, &[u8]) -> Result<Ingested, DecodeError>,
{
    for response in responses {
        provenance.queried += 1;

        if let Some(error) = &response.error {
            debug!(backend = %response.backend, %error, "backend failed");
            provenance.record_failure(&response.backend, error);
            continue;
        }
        let status = match response.status {
            Some(status) => status,
            // Envelope invariant violated; treat as a failed backend rather
            // than taking the whole merge down.
            None => {
                provenance.record_failure(&response.backend, "envelope carried no status");
                continue;
            }
        };

        if status == StatusCode::NOT_FOUND {
            debug!(backend = %response.backend, "backend reported not found");
            provenance.record_not_found();
            continue;
        }
        if !status.is_success() {
            debug!(backend = %response.backend, status = status.as_u16(), "unexpected status");
            provenance.record_failure(&response.backend, format!("unexpected status {status}"));
            continue;
        }

        match ingest(&response.backend, &response.body) {
            Ok(Ingested::Content) => {
                debug!(backend = %response.backend, "backend contributed content");
                provenance.record_content();
            }
            Ok(Ingested::Empty) => {
                debug!(backend = %response.backend, "backend responded empty");
                provenance.record_not_found();
            }
            Err(e) => {
                debug!(backend = %response.backend, error = %e, "backend body failed to decode");
                provenance.record_failure(&response.backend, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn ok(backend: &str, body: &'static [u8]) -> BackendResponse {
        BackendResponse::completed(backend, StatusCode::OK, Bytes::from_static(body))
    }

    #[test]
    fn classification_covers_every_envelope_shape() {
        let responses = vec![
            ok("content", b"x"),
            ok("empty", b""),
            BackendResponse::completed("missing", StatusCode::NOT_FOUND, Bytes::new()),
            BackendResponse::completed("erroring", StatusCode::BAD_GATEWAY, Bytes::new()),
            BackendResponse::transport_error("dead", "connection refused"),
            ok("garbled", b"not json"),
        ];

        let mut prov = Provenance::default();
        classify_envelopes(&responses, &mut prov, |_, body| match body {
            b"x" => Ok(Ingested::Content),
            b"" => Ok(Ingested::Empty),
            _ => Err(DecodeError::Malformed("bad".into())),
        });

        assert_eq!(prov.queried, 6);
        assert_eq!(prov.with_content, 1);
        assert_eq!(prov.not_found, 2);
        assert_eq!(prov.failed, 3);
        assert_eq!(prov.responded, 3);
        assert!(prov.partial);
        assert_eq!(prov.queried, prov.responded + prov.failed);
    }

    #[test]
    fn clean_run_is_not_partial() {
        let responses = vec![ok("a", b"x"), ok("b", b"x")];
        let mut prov = Provenance::default();
        classify_envelopes(&responses, &mut prov, |_, _| Ok(Ingested::Content));
        assert!(!prov.partial);
        assert!(prov.errors.is_empty());
    }
}
