// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The simplest streaming sink wrapper: entries collect in an unbounded
//! list and a single lazily-spawned drainer hands the whole list to the
//! streamer. No back-pressure; use only for fast or local sinks.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::emitter::{emergent, LogEmitter};
use crate::errors::StreamError;
use crate::proto::LogEntry;

/// Streams collected log entries in one call.
#[async_trait]
pub trait LogStreamer: Send + Sync + 'static {
    async fn stream_entries(&self, entries: Vec<LogEntry>) -> Result<(), StreamError>;
}

/// Emits collected logs through a [`LogStreamer`].
#[derive(Clone)]
pub struct StreamEmitter {
    inner: Arc<Inner>,
}

struct Inner {
    streamer: Arc<dyn LogStreamer>,
    notify: Notify,
    workers: AtomicI32,
    entries: Mutex<Vec<LogEntry>>,
    runtime: tokio::runtime::Handle,
    cancel: CancellationToken,
}

impl StreamEmitter {
    /// Must be created inside a Tokio runtime; the drainer task is spawned
    /// onto it on first enqueue.
    pub fn new(streamer: Arc<dyn LogStreamer>) -> Self {
        StreamEmitter {
            inner: Arc::new(Inner {
                streamer,
                notify: Notify::new(),
                workers: AtomicI32::new(0),
                entries: Mutex::new(Vec::new()),
                runtime: tokio::runtime::Handle::current(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Stops the drainer at its next waiting point. Buffered entries are
    /// not flushed.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}

impl LogEmitter for StreamEmitter {
    fn emit_log_entry(&self, entry: &LogEntry) {
        if self.inner.workers.load(Ordering::SeqCst) == 0 {
            let inner = Arc::clone(&self.inner);
            self.inner.runtime.spawn(run_worker(inner));
        }
        {
            #[allow(clippy::expect_used)]
            let mut entries = self.inner.entries.lock().expect("lock poisoned");
            entries.push(entry.clone());
        }
        // Capacity-1 wakeup. A notification arriving while the drainer is
        // mid-cycle coalesces with the pending one; the drainer re-checks
        // the list every iteration, so nothing is stranded.
        self.inner.notify.notify_one();
    }
}

struct WorkerGate<'a>(&'a AtomicI32);

impl Drop for WorkerGate<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn run_worker(inner: Arc<Inner>) {
    let _gate = WorkerGate(&inner.workers);
    if inner.workers.fetch_add(1, Ordering::SeqCst) + 1 > 1 {
        // Another drainer is already running.
        return;
    }
    loop {
        inner.emit_entries().await;
        tokio::select! {
            _ = inner.cancel.cancelled() => return,
            _ = inner.notify.notified() => {}
        }
    }
}

impl Inner {
    async fn emit_entries(&self) {
        let entries = {
            #[allow(clippy::expect_used)]
            let mut list = self.entries.lock().expect("lock poisoned");
            std::mem::take(&mut *list)
        };
        if entries.is_empty() {
            return;
        }
        if let Err(err) = self.streamer.stream_entries(entries).await {
            emergent().error(&err).print_err("StreamLogEntries: ");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingStreamer {
        batches: Mutex<Vec<Vec<LogEntry>>>,
    }

    #[async_trait]
    impl LogStreamer for RecordingStreamer {
        async fn stream_entries(&self, entries: Vec<LogEntry>) -> Result<(), StreamError> {
            self.batches.lock().unwrap().push(entries);
            Ok(())
        }
    }

    fn entry(nano_ts: i64) -> LogEntry {
        LogEntry {
            nano_ts,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_drains_whole_list_in_order() {
        let streamer = Arc::new(RecordingStreamer::default());
        let emitter = StreamEmitter::new(streamer.clone());
        // Hold the worker gate so the drain below is deterministic.
        emitter.inner.workers.fetch_add(1, Ordering::SeqCst);

        for ts in 1..=5 {
            emitter.emit_log_entry(&entry(ts));
        }
        emitter.inner.emit_entries().await;

        let batches = streamer.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let order: Vec<i64> = batches[0].iter().map(|e| e.nano_ts).collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5]);
        assert!(emitter.inner.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_drain_is_noop() {
        let streamer = Arc::new(RecordingStreamer::default());
        let emitter = StreamEmitter::new(streamer.clone());
        emitter.inner.emit_entries().await;
        assert!(streamer.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_background_drainer_picks_up_entries() {
        let streamer = Arc::new(RecordingStreamer::default());
        let emitter = StreamEmitter::new(streamer.clone());
        emitter.emit_log_entry(&entry(7));

        for _ in 0..100 {
            if !streamer.batches.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let batches = streamer.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].nano_ts, 7);
        emitter.shutdown();
    }
}
