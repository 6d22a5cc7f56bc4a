//! Backpressure stage
//!
//! Applied exactly once per session, at the point where an
//! unbounded-rate producer (the event source, sampled or not, or an
//! externally supplied trigger stream) meets the rate-limited consumer
//! driving the cursor. A forwarder task owns the upstream, and with
//! it the native watch handle, so dropping the downstream stream
//! tears the whole producer side down. Each forwarder watches for the
//! downstream closing and exits without waiting for another event.

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream, WatchStream};
use tracing::trace;

use crate::event::ChangeEvent;

/// What happens to notifications while the consumer cannot keep pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backpressure {
    /// Queue without bound until the consumer catches up.
    #[default]
    Buffer,
    /// Discard new notifications while the consumer is behind.
    Drop,
    /// Keep only the most recent notification.
    Latest,
}

/// Interpose `policy` between `upstream` and the caller.
///
/// Spawns the session's forwarder task; must be called within a tokio
/// runtime. The task exits when the upstream completes or the returned
/// stream is dropped.
pub(crate) fn with_policy<S>(policy: Backpressure, upstream: S) -> BoxStream<'static, ChangeEvent>
where
    S: Stream<Item = ChangeEvent> + Send + 'static,
{
    match policy {
        Backpressure::Buffer => {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(async move {
                let mut upstream = Box::pin(upstream);
                loop {
                    tokio::select! {
                        event = upstream.next() => match event {
                            Some(event) => {
                                if tx.send(event).is_err() {
                                    break;
                                }
                            }
                            None => break,
                        },
                        _ = tx.closed() => break,
                    }
                }
            });
            UnboundedReceiverStream::new(rx).boxed()
        }
        Backpressure::Drop => {
            // capacity 1: one notification may be in flight, the rest
            // of a backlog is discarded
            let (tx, rx) = mpsc::channel(1);
            tokio::spawn(async move {
                let mut upstream = Box::pin(upstream);
                loop {
                    tokio::select! {
                        event = upstream.next() => match event {
                            Some(event) => match tx.try_send(event) {
                                Ok(()) => {}
                                Err(mpsc::error::TrySendError::Full(event)) => {
                                    trace!(?event, "consumer behind, notification dropped");
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => break,
                            },
                            None => break,
                        },
                        _ = tx.closed() => break,
                    }
                }
            });
            ReceiverStream::new(rx).boxed()
        }
        Backpressure::Latest => {
            let (tx, rx) = watch::channel(None);
            tokio::spawn(async move {
                let mut upstream = Box::pin(upstream);
                loop {
                    tokio::select! {
                        event = upstream.next() => match event {
                            Some(event) => {
                                if tx.send(Some(event)).is_err() {
                                    break;
                                }
                            }
                            None => break,
                        },
                        _ = tx.closed() => break,
                    }
                }
            });
            WatchStream::from_changes(rx)
                .filter_map(|slot| async move { slot })
                .boxed()
        }
    }
}
