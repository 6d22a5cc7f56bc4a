//! Native change-event source
//!
//! Wraps a `notify` watcher for a single target path:
//! - non-directory (or absent) target: watch the parent directory and
//!   filter notifications to the target by absolute-path equality;
//!   overflow notifications always pass (they carry no path context)
//! - directory target: watch it directly, deliver everything
//!
//! The watcher handle is owned by the returned stream and is dropped
//! (deregistered, its backend thread shut down) on every exit path:
//! completion, error, or the consumer dropping the stream early. A
//! handle closed concurrently with an in-flight poll surfaces as
//! end-of-stream, not an error.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use notify::{PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace, warn};

use crate::config::{DeliveryMode, WatchConfig};
use crate::error::TailError;
use crate::event::{ChangeEvent, ChangeKind, EventKinds};

/// A stream of [`ChangeEvent`]s for one watched path.
///
/// Dropping it releases the native watch handle.
pub struct EventStream {
    rx: UnboundedReceiverStream<ChangeEvent>,
    _guard: WatcherGuard,
}

/// Keeps the native watcher alive for the lifetime of one subscription.
enum WatcherGuard {
    /// Non-blocking delivery: a scan on a fixed interval.
    Poll(PollWatcher),
    /// Blocking delivery: the platform backend blocks on its own
    /// dedicated thread, so a stalled wait cannot starve the runtime.
    Native(RecommendedWatcher),
}

impl Stream for EventStream {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChangeEvent>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

/// Start a new watch subscription for `path`.
///
/// Each call acquires a fresh native handle; restart after any failure
/// means calling this again.
pub(crate) fn events(path: &Path, config: &WatchConfig) -> Result<EventStream, TailError> {
    let (root, target) = resolve_watch_root(path)?;
    let (tx, rx) = mpsc::unbounded_channel();
    let kinds = config.kinds;

    let guard = match config.mode {
        DeliveryMode::NonBlocking => {
            let native_config = config
                .watcher_config
                .clone()
                .with_poll_interval(config.poll_interval);
            let target = target.clone();
            let mut watcher = PollWatcher::new(
                move |res| forward(&tx, target.as_deref(), kinds, res),
                native_config,
            )?;
            watcher.watch(&root, RecursiveMode::NonRecursive)?;
            WatcherGuard::Poll(watcher)
        }
        DeliveryMode::Blocking => {
            let target = target.clone();
            let mut watcher = RecommendedWatcher::new(
                move |res| forward(&tx, target.as_deref(), kinds, res),
                config.watcher_config.clone(),
            )?;
            watcher.watch(&root, RecursiveMode::NonRecursive)?;
            WatcherGuard::Native(watcher)
        }
    };

    debug!(root = %root.display(), target = ?target, "watch registered");
    Ok(EventStream {
        rx: UnboundedReceiverStream::new(rx),
        _guard: guard,
    })
}

/// Runs on the watcher's own thread: classify, filter, hand off to the
/// session's channel. A send failure means the consumer is gone and is
/// ignored; the guard drop that follows tears the watcher down.
fn forward(
    tx: &mpsc::UnboundedSender<ChangeEvent>,
    target: Option<&Path>,
    kinds: EventKinds,
    res: notify::Result<notify::Event>,
) {
    match res {
        Ok(native) => {
            let Some(event) = ChangeEvent::from_native(&native) else {
                return;
            };
            if !is_relevant(&event, target) {
                trace!(?event, "unrelated event discarded");
                return;
            }
            if !kinds.contains(event.kind) {
                return;
            }
            let _ = tx.send(event);
        }
        Err(err) => warn!(error = %err, "watch backend error"),
    }
}

/// Relevance test for events arriving from a parent-directory watch.
/// `target == None` means the watched path is itself a directory and
/// everything passes.
fn is_relevant(event: &ChangeEvent, target: Option<&Path>) -> bool {
    match target {
        None => true,
        Some(target) => {
            event.kind == ChangeKind::Overflow || event.paths.iter().any(|p| p == target)
        }
    }
}

/// Resolve the directory to register with the native mechanism.
///
/// Returns the watch root plus, for a non-directory target, the
/// absolute path events are filtered against.
fn resolve_watch_root(path: &Path) -> Result<(PathBuf, Option<PathBuf>), TailError> {
    if path.is_dir() {
        let root = canonical(path)?;
        return Ok((root, None));
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let root = canonical(&parent)?;
    let name = path.file_name().ok_or_else(|| {
        TailError::WatchUnavailable(notify::Error::generic("path has no file name"))
    })?;
    let target = root.join(name);
    Ok((root, Some(target)))
}

fn canonical(path: &Path) -> Result<PathBuf, TailError> {
    path.canonicalize()
        .map_err(|e| TailError::WatchUnavailable(notify::Error::io(e).add_path(path.to_path_buf())))
}
