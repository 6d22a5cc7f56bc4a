//! Session configuration
//!
//! Plain configuration records, one per entry point. Validation
//! happens exactly once, when an entry point is called, never in
//! scattered setters.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};

use crate::error::TailError;
use crate::event::EventKinds;
use crate::pipeline::Backpressure;

/// How change notifications are retrieved from the native mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Poll the filesystem on a fixed interval.
    #[default]
    NonBlocking,
    /// Block on the platform's native notification facility, on a
    /// thread isolated from the async runtime.
    Blocking,
}

pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub(crate) const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Configuration for [`tail_bytes`](crate::tail_bytes) and
/// [`tail_lines`](crate::tail_lines).
#[derive(Debug, Clone)]
pub struct TailConfig {
    /// Byte offset to start tailing from.
    pub start_position: u64,
    /// Maximum bytes per emitted chunk; also the read buffer size.
    pub chunk_size: usize,
    /// Poll cadence for [`DeliveryMode::NonBlocking`].
    pub poll_interval: Duration,
    /// Debounce window for modify/overflow bursts. `None` derives
    /// `2 * poll_interval`, guaranteeing at least one poll per window.
    pub sample_window: Option<Duration>,
    pub mode: DeliveryMode,
    /// What to do with notifications while the consumer is behind.
    pub backpressure: Backpressure,
    /// Charset used by the line-tailing entry point.
    pub encoding: &'static Encoding,
    /// Opaque hints passed through to the native watch registration.
    pub watcher_config: notify::Config,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            start_position: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            sample_window: None,
            mode: DeliveryMode::default(),
            backpressure: Backpressure::default(),
            encoding: UTF_8,
            watcher_config: notify::Config::default(),
        }
    }
}

impl TailConfig {
    pub(crate) fn validate(&self) -> Result<(), TailError> {
        if self.chunk_size == 0 {
            return Err(TailError::Config("chunk_size must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(TailError::Config("poll_interval must be nonzero".into()));
        }
        if self.sample_window.is_some_and(|w| w.is_zero()) {
            return Err(TailError::Config("sample_window must be nonzero".into()));
        }
        Ok(())
    }

    pub(crate) fn sample_window(&self) -> Duration {
        self.sample_window.unwrap_or(self.poll_interval * 2)
    }

    pub(crate) fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            mode: self.mode,
            poll_interval: self.poll_interval,
            kinds: EventKinds::all(),
            watcher_config: self.watcher_config.clone(),
        }
    }
}

/// Configuration for [`watch`](crate::watch).
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub mode: DeliveryMode,
    /// Poll cadence for [`DeliveryMode::NonBlocking`].
    pub poll_interval: Duration,
    /// Notification kinds to deliver.
    pub kinds: EventKinds,
    /// Opaque hints passed through to the native watch registration.
    pub watcher_config: notify::Config,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            kinds: EventKinds::all(),
            watcher_config: notify::Config::default(),
        }
    }
}

impl WatchConfig {
    pub(crate) fn validate(&self) -> Result<(), TailError> {
        if self.poll_interval.is_zero() {
            return Err(TailError::Config("poll_interval must be nonzero".into()));
        }
        Ok(())
    }
}
