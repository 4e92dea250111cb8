//! StreamCollector - turning server-streaming RPCs into in-memory collections
//!
//! Every listing command reads a server stream to completion before rendering
//! anything. The rules are the same for all of them:
//! - Clean end of stream is success; the collection holds every item received,
//! exactly once.
//! - Any error from the stream discards what was received so far and surfaces as
//! `ClientError::Stream`, tagged with the listing operation.
//! - The shared cancellation token is observed between items, so an interrupt
//! stops a drain even while the server is silent.
//! - The response stream is released before the result is returned, whatever
//! the outcome.

// Local crates
use crate::helpers::errors::{ClientError, ClientResult};

// External crates
use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use tracing::instrument;

/// Read `stream` until it ends cleanly, fails, or `cancel` fires.
#[instrument(
    name = "backupctl_collector::drain",
    target = "collector::collector",
    skip(stream, cancel),
    level = "debug"
)]
pub async fn drain<S, T>(
    operation: &'static str,
    mut stream: S,
    cancel: &CancellationToken,
) -> ClientResult<Vec<T>>
where
    S: Stream<Item = Result<T, Status>> + Unpin,
{
    let mut items = Vec::new();

    let outcome = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!(received = items.len(), "Stream drain cancelled");
                break Err(ClientError::Cancelled { operation });
            }

            next = stream.next() => match next {
                Some(Ok(item)) => items.push(item),
                Some(Err(source)) => {
                    tracing::debug!(
                        received = items.len(),
                        code = ?source.code(),
                        "Stream terminated with an error, discarding partial result"
                    );
                    break Err(ClientError::Stream { operation, source });
                }
                None => break Ok(()),
            }
        }
    };

    drop(stream);

    outcome?;
    tracing::debug!(received = items.len(), "Stream drained");
    Ok(items)
}

/// Collect in server emission order.
pub async fn collect_sequence<S, T>(
    operation: &'static str,
    stream: S,
    cancel: &CancellationToken,
) -> ClientResult<Vec<T>>
where
    S: Stream<Item = Result<T, Status>> + Unpin,
{
    drain(operation, stream, cancel).await
}

/// Collect, then stable-sort ascending by `key`.
pub async fn collect_sorted_by<S, T, K, F>(
    operation: &'static str,
    stream: S,
    cancel: &CancellationToken,
    key: F,
) -> ClientResult<Vec<T>>
where
    S: Stream<Item = Result<T, Status>> + Unpin,
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut items = drain(operation, stream, cancel).await?;
    items.sort_by(|a, b| key(a).cmp(&key(b)));
    Ok(items)
}

/// Collect into a key -> value map. When the server repeats a key, the item it
/// sent last wins.
pub async fn collect_map<S, T, K, V, F>(
    operation: &'static str,
    stream: S,
    cancel: &CancellationToken,
    entry: F,
) -> ClientResult<BTreeMap<K, V>>
where
    S: Stream<Item = Result<T, Status>> + Unpin,
    K: Ord,
    F: FnMut(T) -> (K, V),
{
    let items = drain(operation, stream, cancel).await?;
    Ok(items.into_iter().map(entry).collect())
}
