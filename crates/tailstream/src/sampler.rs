//! Burst debouncing
//!
//! A file under heavy write activity can generate hundreds of modify
//! notifications per second; reading the file once per notification
//! would defeat the chunk-batching purpose of tailing. This stage
//! partitions the stream by class: create/delete/external triggers
//! pass through untouched (delaying a create risks reading stale
//! content at a stale offset), while modify/overflow bursts are
//! reduced to at most one representative per sample window. Relative
//! order within each class is preserved; the classes are merged, not
//! re-sorted.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::time::{Interval, MissedTickBehavior};

use crate::event::ChangeEvent;

/// Debounce burst-class events on `stream` to one representative (the
/// most recent) per `window`.
///
/// Must be called within a tokio runtime.
pub(crate) fn sample<S>(stream: S, window: Duration) -> Sampled<S>
where
    S: Stream<Item = ChangeEvent> + Unpin,
{
    let mut interval = tokio::time::interval(window);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    Sampled {
        inner: stream,
        interval,
        pending: None,
        done: false,
    }
}

/// Stream adapter produced by [`sample`].
pub(crate) struct Sampled<S> {
    inner: S,
    interval: Interval,
    /// Most recent burst-class event awaiting its window tick.
    pending: Option<ChangeEvent>,
    done: bool,
}

impl<S> Stream for Sampled<S>
where
    S: Stream<Item = ChangeEvent> + Unpin,
{
    type Item = ChangeEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChangeEvent>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(this.pending.take());
        }

        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(event)) => {
                    if event.is_burst_class() {
                        if this.pending.is_none() {
                            // window opens at the first burst event
                            this.interval.reset();
                        }
                        this.pending = Some(event);
                    } else {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(None) => {
                    // flush the pending representative so a final
                    // modify is not silently lost
                    this.done = true;
                    return Poll::Ready(this.pending.take());
                }
                Poll::Pending => break,
            }
        }

        if this.pending.is_some() && this.interval.poll_tick(cx).is_ready() {
            return Poll::Ready(this.pending.take());
        }
        Poll::Pending
    }
}
