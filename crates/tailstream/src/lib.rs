//! Async tailing of growing files
//!
//! This crate turns a raw, possibly noisy stream of file-change
//! notifications into a correctly-ordered, incrementally-read stream
//! of new file content:
//! - Byte-chunk and text-line tailing of a single append-only file
//! - Native change notifications (polling or blocking delivery) or
//!   any externally supplied trigger stream
//! - Time-window debouncing of modify/overflow bursts
//! - Buffer/drop/latest backpressure policies
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use futures::StreamExt;
//! use tailstream::{tail_lines, TailConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tailstream::TailError> {
//!     let mut lines = Box::pin(tail_lines(Path::new("app.log"), TailConfig::default())?);
//!     while let Some(line) = lines.next().await {
//!         println!("{}", line?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Sessions never retry internally: a deleted file or a read error is
//! fatal to the stream, and resuming (usually from the last known
//! position) is the caller's decision.

mod config;
mod cursor;
mod error;
mod event;
mod lines;
mod pipeline;
mod sampler;
mod source;

use std::path::Path;

use bytes::Bytes;
use futures::Stream;

// Re-exported so callers can populate `watcher_config` and match on
// native error details without a separate notify dependency.
pub use notify;

pub use config::{DeliveryMode, TailConfig, WatchConfig};
pub use error::TailError;
pub use event::{ChangeEvent, ChangeKind, EventKinds};
pub use pipeline::Backpressure;
pub use source::EventStream;

/// Tail `path`, emitting newly appended content as byte chunks of at
/// most `config.chunk_size` bytes.
///
/// Builds the full native pipeline: change-event source, burst
/// sampler, backpressure stage, cursor. Must be called within a tokio
/// runtime; registration failures surface immediately as
/// [`TailError::WatchUnavailable`].
pub fn tail_bytes(
    path: &Path,
    config: TailConfig,
) -> Result<impl Stream<Item = Result<Bytes, TailError>> + Send + 'static, TailError> {
    config.validate()?;
    let events = source::events(path, &config.watch_config())?;
    let sampled = sampler::sample(events, config.sample_window());
    let triggers = pipeline::with_policy(config.backpressure, sampled);
    Ok(cursor::chunks(
        path.to_path_buf(),
        triggers,
        config.start_position,
        config.chunk_size,
    ))
}

/// Tail `path`, driven by an externally supplied trigger stream
/// instead of native notifications.
///
/// The source and sampler stages are bypassed entirely; only the
/// backpressure stage and the cursor run. Any stream will do: map a
/// timer to [`ChangeEvent::trigger`] for interval-driven tailing, or
/// inject [`ChangeKind::Created`]/[`ChangeKind::Removed`] events to
/// drive the create/delete semantics by hand.
pub fn tail_bytes_with(
    path: &Path,
    config: TailConfig,
    events: impl Stream<Item = ChangeEvent> + Send + 'static,
) -> Result<impl Stream<Item = Result<Bytes, TailError>> + Send + 'static, TailError> {
    config.validate()?;
    let triggers = pipeline::with_policy(config.backpressure, events);
    Ok(cursor::chunks(
        path.to_path_buf(),
        triggers,
        config.start_position,
        config.chunk_size,
    ))
}

/// Tail `path` as text, emitting complete lines decoded with
/// `config.encoding` and split on `\n`.
pub fn tail_lines(
    path: &Path,
    config: TailConfig,
) -> Result<impl Stream<Item = Result<String, TailError>> + Send + 'static, TailError> {
    let encoding = config.encoding;
    let chunks = tail_bytes(path, config)?;
    Ok(lines::decode_lines(chunks, encoding))
}

/// Line-tailing counterpart of [`tail_bytes_with`].
pub fn tail_lines_with(
    path: &Path,
    config: TailConfig,
    events: impl Stream<Item = ChangeEvent> + Send + 'static,
) -> Result<impl Stream<Item = Result<String, TailError>> + Send + 'static, TailError> {
    let encoding = config.encoding;
    let chunks = tail_bytes_with(path, config, events)?;
    Ok(lines::decode_lines(chunks, encoding))
}

/// Observe raw change notifications for `path` with no cursor
/// attached, for callers driving their own file-reading logic.
///
/// Dropping the stream releases the native watch handle.
pub fn watch(path: &Path, config: WatchConfig) -> Result<EventStream, TailError> {
    config.validate()?;
    source::events(path, &config)
}
