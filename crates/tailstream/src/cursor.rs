//! The tail cursor
//!
//! Converts a trigger stream into reads of new file content. One
//! cursor owns one `TailState`; triggers are consumed strictly one at
//! a time, so the position has a single writer by construction.
//!
//! Per trigger:
//! - create: reset the position to 0 (a new file at the same path is
//!   assumed to start fresh), then fall through to the length check
//! - delete: fail the session with [`TailError::FileDeleted`]
//! - anything else: compare the current file length to the position;
//!   if the file has not grown, emit nothing (spurious and duplicate
//!   triggers are silent), otherwise open, seek, drain to end-of-file
//!   in chunks, and close before awaiting the next trigger
//!
//! The design assumes the native mechanism never coalesces a
//! create/delete pair for the watched path into a bare overflow
//! notification; an overflow only ever prompts a catch-up read.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, trace};

use crate::error::TailError;
use crate::event::{ChangeEvent, ChangeKind};

/// Offset state owned by one running cursor.
struct TailState<S> {
    triggers: Pin<Box<S>>,
    path: PathBuf,
    chunk_size: usize,
    /// Next byte offset to read from. Never decremented except by the
    /// create reset.
    position: u64,
    /// Open handle while draining one read operation. Closed before
    /// the next trigger is awaited.
    reading: Option<File>,
    failed: bool,
}

/// Turn `triggers` into a stream of newly appended chunks of `path`.
///
/// The stream ends when the trigger stream ends; it fails permanently
/// on a delete notification or a read error.
pub(crate) fn chunks<S>(
    path: PathBuf,
    triggers: S,
    start_position: u64,
    chunk_size: usize,
) -> impl Stream<Item = Result<Bytes, TailError>> + Send
where
    S: Stream<Item = ChangeEvent> + Send + 'static,
{
    let state = TailState {
        triggers: Box::pin(triggers),
        path,
        chunk_size,
        position: start_position,
        reading: None,
        failed: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        if state.failed {
            return None;
        }
        loop {
            // drain the read operation in progress, one chunk at a time
            if let Some(file) = state.reading.as_mut() {
                let mut buf = vec![0u8; state.chunk_size];
                match file.read(&mut buf).await {
                    Ok(0) => {
                        state.reading = None;
                        trace!(path = %state.path.display(), position = state.position, "caught up");
                    }
                    Ok(n) => {
                        buf.truncate(n);
                        state.position += n as u64;
                        return Some((Ok(Bytes::from(buf)), state));
                    }
                    Err(err) => {
                        state.failed = true;
                        state.reading = None;
                        return Some((Err(TailError::Read(err)), state));
                    }
                }
                continue;
            }

            let event = state.triggers.next().await?;
            match event.kind {
                ChangeKind::Created => {
                    debug!(path = %state.path.display(), "file created, resetting position");
                    state.position = 0;
                }
                ChangeKind::Removed => {
                    state.failed = true;
                    return Some((Err(TailError::FileDeleted), state));
                }
                ChangeKind::Modified | ChangeKind::Overflow | ChangeKind::Trigger => {}
            }

            // a missing file reads as length 0 and is silently skipped
            let length = match tokio::fs::metadata(&state.path).await {
                Ok(meta) => meta.len(),
                Err(_) => 0,
            };
            if length <= state.position {
                trace!(
                    path = %state.path.display(),
                    position = state.position,
                    length,
                    "no growth, trigger ignored"
                );
                continue;
            }

            match open_at(&state.path, state.position).await {
                Ok(file) => state.reading = Some(file),
                Err(err) => {
                    state.failed = true;
                    return Some((Err(err), state));
                }
            }
        }
    })
}

async fn open_at(path: &Path, position: u64) -> Result<File, TailError> {
    let mut file = File::open(path).await?;
    file.seek(SeekFrom::Start(position)).await?;
    Ok(file)
}
