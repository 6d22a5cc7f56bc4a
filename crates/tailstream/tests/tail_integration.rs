//! End-to-end tests for the tailing pipeline, driven by synthetic
//! trigger streams and, where timing allows, by the real watcher.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tailstream::{
    tail_bytes, tail_bytes_with, tail_lines_with, watch, Backpressure, ChangeEvent, ChangeKind,
    TailConfig, TailError, WatchConfig,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;

const LONG: Duration = Duration::from_secs(10);

fn append(path: &Path, bytes: &[u8]) {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    f.write_all(bytes).unwrap();
}

fn temp_log() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    (dir, path)
}

#[tokio::test]
async fn lines_arrive_in_append_order() {
    let (_dir, path) = temp_log();
    let (tx, rx) = mpsc::unbounded_channel();

    let lines = Box::pin(
        tail_lines_with(
            &path,
            TailConfig::default(),
            UnboundedReceiverStream::new(rx),
        )
        .unwrap(),
    );

    append(&path, b"a\n");
    tx.send(ChangeEvent::trigger()).unwrap();
    append(&path, b"b\n");
    tx.send(ChangeEvent::trigger()).unwrap();
    drop(tx);

    let got: Vec<_> = lines.map(|l| l.unwrap()).collect().await;
    assert_eq!(got, vec!["a", "b"]);
}

#[tokio::test]
async fn chunks_reassemble_to_the_appended_bytes() {
    let (_dir, path) = temp_log();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut chunks = Box::pin(
        tail_bytes_with(
            &path,
            TailConfig {
                chunk_size: 3,
                ..Default::default()
            },
            UnboundedReceiverStream::new(rx),
        )
        .unwrap(),
    );

    append(&path, b"0123456789");
    tx.send(ChangeEvent::trigger()).unwrap();
    drop(tx);

    let mut all = Vec::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.unwrap();
        assert!(chunk.len() <= 3);
        all.extend_from_slice(&chunk);
    }
    assert_eq!(all, b"0123456789");
}

#[tokio::test]
async fn delete_event_fails_the_stream() {
    let (_dir, path) = temp_log();
    append(&path, b"content\n");
    let (tx, rx) = mpsc::unbounded_channel();

    let mut chunks = Box::pin(
        tail_bytes_with(
            &path,
            TailConfig::default(),
            UnboundedReceiverStream::new(rx),
        )
        .unwrap(),
    );

    tx.send(ChangeEvent {
        kind: ChangeKind::Removed,
        paths: vec![path.clone()],
    })
    .unwrap();
    assert!(matches!(
        chunks.next().await,
        Some(Err(TailError::FileDeleted))
    ));
    assert!(chunks.next().await.is_none());
}

#[tokio::test]
async fn drop_policy_discards_backlog_while_consumer_is_behind() {
    let (_dir, path) = temp_log();
    append(&path, b"x");

    // the consumer never polls while all five triggers arrive
    let triggers = futures::stream::iter((0..5).map(|_| ChangeEvent::trigger()));
    let chunks = tail_bytes_with(
        &path,
        TailConfig {
            backpressure: Backpressure::Drop,
            ..Default::default()
        },
        triggers,
    )
    .unwrap();

    // one trigger was in flight; it produces the single read. The
    // dropped backlog would have been silent anyway (no growth), so
    // the observable effect is simply a complete, short stream.
    let got: Vec<_> = chunks.collect().await;
    assert_eq!(got.len(), 1);
    assert_eq!(&got[0].as_ref().unwrap()[..], b"x");
}

#[tokio::test]
async fn buffer_policy_delivers_every_trigger() {
    let (_dir, path) = temp_log();
    append(&path, b"x");

    let triggers = futures::stream::iter((0..5).map(|_| ChangeEvent::trigger()));
    let chunks = tail_bytes_with(
        &path,
        TailConfig {
            backpressure: Backpressure::Buffer,
            ..Default::default()
        },
        triggers,
    )
    .unwrap();

    // five buffered triggers, one growth: exactly one chunk, and the
    // four no-growth triggers are processed silently
    let got: Vec<_> = chunks.collect().await;
    assert_eq!(got.len(), 1);
}

#[tokio::test]
async fn tail_streams_can_move_to_spawned_tasks() {
    let (_dir, path) = temp_log();
    append(&path, b"a\n");
    let (tx, rx) = mpsc::unbounded_channel();

    let lines = tail_lines_with(
        &path,
        TailConfig::default(),
        UnboundedReceiverStream::new(rx),
    )
    .unwrap();
    tx.send(ChangeEvent::trigger()).unwrap();
    drop(tx);

    // spawning requires the stream to outlive the borrow of `path`
    let handle =
        tokio::spawn(async move { Box::pin(lines).map(|l| l.unwrap()).collect::<Vec<_>>().await });
    assert_eq!(handle.await.unwrap(), vec!["a"]);
}

#[tokio::test]
async fn cancelling_a_tail_releases_its_trigger_stream() {
    let (_dir, path) = temp_log();
    let (dropped_tx, dropped_rx) = tokio::sync::oneshot::channel::<()>();
    let triggers = futures::stream::poll_fn(move |_| {
        let _held = &dropped_tx;
        std::task::Poll::<Option<ChangeEvent>>::Pending
    });

    let chunks = tail_bytes_with(&path, TailConfig::default(), triggers).unwrap();
    drop(chunks);

    // the trigger stream stays quiet; cancellation alone must be
    // enough for the session to let go of it
    timeout(LONG, dropped_rx)
        .await
        .expect("trigger stream still held after cancellation")
        .unwrap_err();
}

#[tokio::test]
async fn invalid_config_is_rejected_up_front() {
    let (_dir, path) = temp_log();
    let err = tail_bytes(
        &path,
        TailConfig {
            chunk_size: 0,
            ..Default::default()
        },
    )
    .err()
    .unwrap();
    assert!(matches!(err, TailError::Config(_)));
}

#[tokio::test]
async fn watch_reports_native_modifications() {
    let (_dir, path) = temp_log();
    append(&path, b"seed\n");

    let config = WatchConfig {
        poll_interval: Duration::from_millis(50),
        watcher_config: notify_contents_config(),
        ..Default::default()
    };
    let mut events = watch(&path, config).unwrap();

    append(&path, b"more\n");
    let event = timeout(LONG, events.next()).await.unwrap().unwrap();
    assert!(matches!(
        event.kind,
        ChangeKind::Modified | ChangeKind::Created
    ));
}

#[tokio::test]
async fn tail_bytes_picks_up_native_appends() {
    let (_dir, path) = temp_log();
    append(&path, b"");

    let config = TailConfig {
        poll_interval: Duration::from_millis(50),
        watcher_config: notify_contents_config(),
        ..Default::default()
    };
    let mut chunks = Box::pin(tail_bytes(&path, config).unwrap());

    append(&path, b"hello\n");
    let chunk = timeout(LONG, chunks.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(&chunk[..], b"hello\n");
}

#[tokio::test]
async fn watch_on_missing_root_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope").join("app.log");
    assert!(matches!(
        watch(&path, WatchConfig::default()),
        Err(TailError::WatchUnavailable(_))
    ));
}

/// Compare file contents on each poll so appends within the mtime
/// granularity of the filesystem are still detected.
fn notify_contents_config() -> tailstream::notify::Config {
    tailstream::notify::Config::default().with_compare_contents(true)
}
