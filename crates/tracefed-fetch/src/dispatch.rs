//! Fan-out dispatcher: run one operation against every backend in parallel.
//!
//! Contract: the returned envelope list is in the same positional order as
//! the backend list, the operation is invoked exactly once per backend, and
//! the dispatcher itself never fails. Concurrency is bounded by a counting
//! semaphore; the caller deadline cancels still-executing tasks, which then
//! contribute a deadline-exceeded envelope.

use crate::client::BackendClient;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};
use tracefed_types::BackendResponse;
use tracing::debug;

pub async fn fan_out<Op, Fut>(
    backends: &[Arc<BackendClient>],
    max_concurrent: usize,
    deadline: Instant,
    op: Op,
) -> Vec<BackendResponse>
where
    Op: Fn(Arc<BackendClient>, Instant) -> Fut,
    Fut: Future<Output = BackendResponse> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

    let tasks: Vec<_> = backends
        .iter()
        .map(|client| {
            let semaphore = semaphore.clone();
            let name = client.name().to_string();
            let operation = op(Arc::clone(client), deadline);

            tokio::spawn(async move {
                let _permit = match timeout_at(deadline, semaphore.acquire_owned()).await {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_)) => {
                        // The semaphore is never closed while tasks hold it.
                        return BackendResponse::transport_error(&name, "dispatcher shut down");
                    }
                    Err(_) => {
                        debug!(backend = %name, "deadline exceeded waiting for dispatch slot");
                        return BackendResponse::transport_error(&name, "deadline exceeded");
                    }
                };
                match timeout_at(deadline, operation).await {
                    Ok(response) => response,
                    Err(_) => {
                        debug!(backend = %name, "deadline exceeded, request cancelled");
                        BackendResponse::transport_error(&name, "deadline exceeded")
                    }
                }
            })
        })
        .collect();

    // join_all preserves input order, so envelopes line up positionally with
    // the backend list; completion order does not matter.
    let joined = futures::future::join_all(tasks).await;

    let mut responses = Vec::with_capacity(backends.len());
    for (client, result) in backends.iter().zip(joined) {
        let response = match result {
            Ok(response) => response,
            Err(e) => BackendResponse::transport_error(
                client.name(),
                format!("dispatch task failed: {e}"),
            ),
        };
        responses.push(response);
    }
    responses
}
