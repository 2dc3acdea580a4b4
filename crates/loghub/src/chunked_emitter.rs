// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded buffering with chunked, acknowledged delivery.
//!
//! Entries accumulate in a byte-capped FIFO. A single background drainer
//! cuts chunks of up to `chunk_size` encoded bytes and streams them; the
//! streamer answers with the last received timestamp, and everything after
//! that point is requeued at the head of the buffer so it is retried before
//! any newer entry. When the buffer would exceed `max_buffer` bytes the
//! oldest records are dropped and the loss is reported to the emergent
//! logger. Delivery is at-least-once; there is no durability across
//! restarts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::emitter::{emergent, LogEmitter};
use crate::errors::StreamError;
use crate::proto::LogEntry;

const DEFAULT_COLLECT_PERIOD: Duration = Duration::from_secs(1);

/// General information about one outgoing chunk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Sum of encoded sizes of the entries in the chunk.
    pub total_size: usize,
    pub num_entries: usize,
    pub first_nano_ts: i64,
    pub last_nano_ts: i64,
}

/// Opens per-chunk streams.
#[async_trait]
pub trait ChunkedStreamer: Send + Sync + 'static {
    async fn start_stream(&self, info: ChunkInfo) -> Result<Box<dyn ChunkStream>, StreamError>;
}

/// Streams the entries of a single chunk one by one.
#[async_trait]
pub trait ChunkStream: Send {
    /// Streams a single entry. After an error no more entries are sent;
    /// `stream_end` is still called to learn the last received timestamp.
    async fn stream_entry(&mut self, entry: &LogEntry) -> Result<(), StreamError>;

    /// Completes the chunk. The returned timestamp decides which records
    /// were durably received, regardless of the accompanying result.
    async fn stream_end(&mut self) -> (i64, Result<(), StreamError>);
}

/// Configuration for a [`ChunkedEmitter`].
pub struct ChunkedEmitterConfig {
    pub streamer: Arc<dyn ChunkedStreamer>,
    /// Byte cap on buffered records; oldest are dropped beyond it.
    pub max_buffer: usize,
    /// Byte cap per outgoing chunk.
    pub chunk_size: usize,
    /// Maximum time between chunk attempts while the buffer is non-empty.
    pub collect_period: Duration,
}

impl ChunkedEmitterConfig {
    pub fn new(streamer: Arc<dyn ChunkedStreamer>, max_buffer: usize, chunk_size: usize) -> Self {
        ChunkedEmitterConfig {
            streamer,
            max_buffer,
            chunk_size,
            collect_period: DEFAULT_COLLECT_PERIOD,
        }
    }
}

struct Record {
    entry: LogEntry,
    size: usize,
}

#[derive(Default)]
struct Buffer {
    records: VecDeque<Record>,
    total_size: usize,
}

/// Emits logs in chunks while capping buffered bytes.
#[derive(Clone)]
pub struct ChunkedEmitter {
    inner: Arc<Inner>,
}

struct Inner {
    streamer: Arc<dyn ChunkedStreamer>,
    max_buffer: usize,
    chunk_size: usize,
    collect_period: Duration,
    notify: Notify,
    workers: AtomicI32,
    buffer: Mutex<Buffer>,
    runtime: tokio::runtime::Handle,
    cancel: CancellationToken,
}

impl ChunkedEmitter {
    /// Must be created inside a Tokio runtime; the drainer task is spawned
    /// onto it on first enqueue.
    pub fn new(config: ChunkedEmitterConfig) -> Self {
        ChunkedEmitter {
            inner: Arc::new(Inner {
                streamer: config.streamer,
                max_buffer: config.max_buffer,
                chunk_size: config.chunk_size,
                collect_period: config.collect_period,
                notify: Notify::new(),
                workers: AtomicI32::new(0),
                buffer: Mutex::new(Buffer::default()),
                runtime: tokio::runtime::Handle::current(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Unwinds the drainer at its next waiting point and abandons any
    /// in-flight chunk attempt. No flush is performed.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}

impl LogEmitter for ChunkedEmitter {
    fn emit_log_entry(&self, entry: &LogEntry) {
        if self.inner.workers.load(Ordering::SeqCst) == 0 {
            let inner = Arc::clone(&self.inner);
            self.inner.runtime.spawn(run_worker(inner));
        }
        let record = Record {
            size: entry.encoded_len(),
            entry: entry.clone(),
        };
        let mut lost_size = 0;
        {
            #[allow(clippy::expect_used)]
            let mut buffer = self.inner.buffer.lock().expect("lock poisoned");
            buffer.total_size += record.size;
            buffer.records.push_back(record);
            while buffer.total_size > self.inner.max_buffer {
                match buffer.records.pop_front() {
                    Some(oldest) => {
                        buffer.total_size -= oldest.size;
                        lost_size += oldest.size;
                    }
                    None => break,
                }
            }
        }
        if lost_size > 0 {
            let msg = format!("Overrun {lost_size} bytes of records");
            emergent().error(&msg).print(msg);
        }
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
        // Exactly one drainer at a time; a racing spawn exits immediately.
        return;
    }
    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => return,
            _ = inner.emit_chunks() => {}
        }
        tokio::select! {
            _ = inner.cancel.cancelled() => return,
            _ = inner.notify.notified() => {}
            _ = tokio::time::sleep(inner.collect_period) => {}
        }
    }
}

impl Inner {
    /// Cuts one chunk from the buffer head, streams it, and requeues
    /// whatever the streamer did not acknowledge.
    async fn emit_chunks(&self) {
        let (mut chunk, info) = self.fetch_chunk();
        if info.num_entries == 0 {
            return;
        }

        let mut last_received_ts = 0i64;
        match self.streamer.start_stream(info).await {
            Err(err) => {
                emergent().error(&err).print_err("StartStreamChunk: ");
            }
            Ok(mut stream) => {
                for record in &chunk {
                    if let Err(err) = stream.stream_entry(&record.entry).await {
                        emergent()
                            .error(&err)
                            .print_err(&format!("StreamEntry({}): ", record.entry.nano_ts));
                        break;
                    }
                }
                let (ts, result) = stream.stream_end().await;
                last_received_ts = ts;
                if let Err(err) = result {
                    emergent().error(&err).print_err("StreamEnd: ");
                }
            }
        }

        // Discard durably received records.
        while let Some(front) = chunk.front() {
            if front.entry.nano_ts > last_received_ts {
                break;
            }
            chunk.pop_front();
        }
        if chunk.is_empty() {
            return;
        }

        // Not everything was received: requeue the rest at the head of the
        // buffer, dropping oldest if the total would exceed the cap.
        let (returned_size, lost_size) = {
            #[allow(clippy::expect_used)]
            let mut buffer = self.buffer.lock().expect("lock poisoned");
            let mut total = chunk.iter().map(|r| r.size).sum::<usize>() + buffer.total_size;
            let mut lost = 0;
            while total > self.max_buffer {
                match chunk.pop_front() {
                    Some(oldest) => {
                        total -= oldest.size;
                        lost += oldest.size;
                    }
                    None => break,
                }
            }
            let returned = chunk.iter().map(|r| r.size).sum::<usize>();
            for record in chunk.into_iter().rev() {
                buffer.records.push_front(record);
            }
            buffer.total_size += returned;
            (returned, lost)
        };
        let msg = format!("Returned {returned_size} bytes, discarded {lost_size} bytes");
        emergent().error(&msg).print(msg);
    }

    /// Detaches a prefix of the buffer not exceeding `chunk_size` encoded
    /// bytes; new arrivals keep appending behind the detach point.
    fn fetch_chunk(&self) -> (VecDeque<Record>, ChunkInfo) {
        let mut chunk = VecDeque::new();
        let mut info = ChunkInfo::default();
        #[allow(clippy::expect_used)]
        let mut buffer = self.buffer.lock().expect("lock poisoned");
        loop {
            let fits = match buffer.records.front() {
                Some(front) => info.total_size + front.size <= self.chunk_size,
                None => false,
            };
            if !fits {
                break;
            }
            let Some(record) = buffer.records.pop_front() else {
                break;
            };
            buffer.total_size -= record.size;
            info.total_size += record.size;
            info.num_entries += 1;
            if info.num_entries == 1 {
                info.first_nano_ts = record.entry.nano_ts;
            }
            info.last_nano_ts = record.entry.nano_ts;
            chunk.push_back(record);
        }
        (chunk, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    /// Scripted streamer: each element of `script` is how many entries the
    /// next chunk stream accepts before erroring. The acknowledged
    /// timestamp is always the last accepted entry's. An empty script makes
    /// `start_stream` fail.
    struct ScriptedStreamer {
        script: Mutex<Vec<usize>>,
        received: Arc<Mutex<Vec<i64>>>,
        hold_end: Mutex<Option<oneshot::Receiver<()>>>,
        start_errors: AtomicI32,
    }

    impl ScriptedStreamer {
        fn accepting(script: Vec<usize>) -> Arc<Self> {
            Arc::new(ScriptedStreamer {
                script: Mutex::new(script),
                received: Arc::new(Mutex::new(Vec::new())),
                hold_end: Mutex::new(None),
                start_errors: AtomicI32::new(0),
            })
        }

        fn received(&self) -> Vec<i64> {
            self.received.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChunkedStreamer for ScriptedStreamer {
        async fn start_stream(
            &self,
            _info: ChunkInfo,
        ) -> Result<Box<dyn ChunkStream>, StreamError> {
            let accept = {
                let mut script = self.script.lock().unwrap();
                if script.is_empty() {
                    self.start_errors.fetch_add(1, Ordering::SeqCst);
                    return Err(StreamError::Unreachable("no script".to_string()));
                }
                script.remove(0)
            };
            Ok(Box::new(ScriptedStream {
                received: Arc::clone(&self.received),
                hold_end: self.hold_end.lock().unwrap().take(),
                accept,
                seen: Vec::new(),
                last: 0,
            }))
        }
    }

    struct ScriptedStream {
        received: Arc<Mutex<Vec<i64>>>,
        hold_end: Option<oneshot::Receiver<()>>,
        accept: usize,
        seen: Vec<i64>,
        last: i64,
    }

    #[async_trait]
    impl ChunkStream for ScriptedStream {
        async fn stream_entry(&mut self, entry: &LogEntry) -> Result<(), StreamError> {
            if self.seen.len() >= self.accept {
                return Err(StreamError::Closed);
            }
            self.seen.push(entry.nano_ts);
            self.last = entry.nano_ts;
            Ok(())
        }

        async fn stream_end(&mut self) -> (i64, Result<(), StreamError>) {
            if let Some(gate) = self.hold_end.take() {
                let _ = gate.await;
            }
            self.received.lock().unwrap().extend(self.seen.iter().copied());
            (self.last, Ok(()))
        }
    }

    fn entry(nano_ts: i64) -> LogEntry {
        LogEntry {
            nano_ts,
            message: "mmmmmmmmmmmmmmmmmmmm".to_string(),
            ..Default::default()
        }
    }

    fn emitter_with(
        streamer: Arc<ScriptedStreamer>,
        max_buffer: usize,
        chunk_size: usize,
    ) -> ChunkedEmitter {
        let emitter = ChunkedEmitter::new(ChunkedEmitterConfig::new(
            streamer,
            max_buffer,
            chunk_size,
        ));
        // Hold the worker gate so tests drive emit_chunks deterministically.
        emitter.inner.workers.fetch_add(1, Ordering::SeqCst);
        emitter
    }

    fn buffered_ts(emitter: &ChunkedEmitter) -> Vec<i64> {
        let buffer = emitter.inner.buffer.lock().unwrap();
        buffer.records.iter().map(|r| r.entry.nano_ts).collect()
    }

    #[tokio::test]
    async fn test_full_chunk_acknowledged_empties_buffer() {
        let streamer = ScriptedStreamer::accepting(vec![10]);
        let size = entry(1).encoded_len();
        let emitter = emitter_with(streamer.clone(), 100 * size, 10 * size);

        for ts in 1..=10 {
            emitter.emit_log_entry(&entry(ts));
        }
        emitter.inner.emit_chunks().await;

        assert_eq!(streamer.received(), (1..=10).collect::<Vec<i64>>());
        assert!(buffered_ts(&emitter).is_empty());
        assert_eq!(emitter.inner.buffer.lock().unwrap().total_size, 0);
    }

    #[tokio::test]
    async fn test_partial_failure_requeues_unacknowledged_suffix() {
        let streamer = ScriptedStreamer::accepting(vec![4, 6]);
        let size = entry(1).encoded_len();
        let emitter = emitter_with(streamer.clone(), 100 * size, 10 * size);

        for ts in 1..=10 {
            emitter.emit_log_entry(&entry(ts));
        }
        emitter.inner.emit_chunks().await;

        // Entries 5..=10 went back to the head of the buffer.
        assert_eq!(buffered_ts(&emitter), (5..=10).collect::<Vec<i64>>());
        assert_eq!(emitter.inner.buffer.lock().unwrap().total_size, 6 * size);

        emitter.inner.emit_chunks().await;
        assert_eq!(streamer.received(), (1..=10).collect::<Vec<i64>>());
        assert!(buffered_ts(&emitter).is_empty());
    }

    #[tokio::test]
    async fn test_retry_precedes_new_arrivals() {
        let streamer = ScriptedStreamer::accepting(vec![2, 8]);
        let size = entry(1).encoded_len();
        let emitter = emitter_with(streamer.clone(), 100 * size, 10 * size);

        for ts in 1..=5 {
            emitter.emit_log_entry(&entry(ts));
        }
        emitter.inner.emit_chunks().await;
        // 3..=5 requeued; newer entries enqueue behind them.
        for ts in 6..=8 {
            emitter.emit_log_entry(&entry(ts));
        }
        assert_eq!(buffered_ts(&emitter), vec![3, 4, 5, 6, 7, 8]);

        emitter.inner.emit_chunks().await;
        assert_eq!(streamer.received(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest() {
        let streamer = ScriptedStreamer::accepting(vec![]);
        let size = entry(1).encoded_len();
        let emitter = emitter_with(streamer, 5 * size, 3 * size);

        for ts in 1..=10 {
            emitter.emit_log_entry(&entry(ts));
        }

        assert_eq!(buffered_ts(&emitter), vec![6, 7, 8, 9, 10]);
        let buffer = emitter.inner.buffer.lock().unwrap();
        assert!(buffer.total_size <= 5 * size);
    }

    #[tokio::test]
    async fn test_buffer_never_exceeds_cap_plus_one_entry() {
        let streamer = ScriptedStreamer::accepting(vec![]);
        let size = entry(1).encoded_len();
        let cap = 4 * size + size / 2;
        let emitter = emitter_with(streamer, cap, 2 * size);

        for ts in 1..=20 {
            emitter.emit_log_entry(&entry(ts));
            let total = emitter.inner.buffer.lock().unwrap().total_size;
            assert!(
                total <= cap + size,
                "total {total} exceeds cap {cap} + entry {size}"
            );
        }
    }

    #[tokio::test]
    async fn test_requeue_drops_oldest_when_buffer_refilled() {
        let streamer = ScriptedStreamer::accepting(vec![0]);
        let (release, gate) = oneshot::channel();
        *streamer.hold_end.lock().unwrap() = Some(gate);
        let size = entry(1).encoded_len();
        let emitter = emitter_with(streamer.clone(), 6 * size, 4 * size);

        for ts in 1..=6 {
            emitter.emit_log_entry(&entry(ts));
        }
        let inner = Arc::clone(&emitter.inner);
        let drain = tokio::spawn(async move { inner.emit_chunks().await });

        // Let the drainer cut the chunk (1..=4) and park in stream_end,
        // then refill the buffer to capacity behind its back.
        tokio::time::sleep(Duration::from_millis(20)).await;
        for ts in 7..=10 {
            emitter.emit_log_entry(&entry(ts));
        }
        assert_eq!(buffered_ts(&emitter), vec![5, 6, 7, 8, 9, 10]);
        release.send(()).unwrap();
        drain.await.unwrap();

        // Nothing was acknowledged, but the buffer is full: the whole
        // returned prefix is discarded rather than exceeding the cap.
        assert_eq!(buffered_ts(&emitter), vec![5, 6, 7, 8, 9, 10]);
        assert!(emitter.inner.buffer.lock().unwrap().total_size <= 6 * size);
    }

    #[tokio::test]
    async fn test_start_stream_error_requeues_everything() {
        let streamer = ScriptedStreamer::accepting(vec![]);
        let size = entry(1).encoded_len();
        let emitter = emitter_with(streamer.clone(), 100 * size, 10 * size);

        for ts in 1..=3 {
            emitter.emit_log_entry(&entry(ts));
        }
        emitter.inner.emit_chunks().await;
        assert_eq!(streamer.start_errors.load(Ordering::SeqCst), 1);
        assert_eq!(buffered_ts(&emitter), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_chunk_cutting_respects_chunk_size() {
        let streamer = ScriptedStreamer::accepting(vec![3, 3, 3]);
        let size = entry(1).encoded_len();
        let emitter = emitter_with(streamer.clone(), 100 * size, 3 * size);

        for ts in 1..=7 {
            emitter.emit_log_entry(&entry(ts));
        }
        emitter.inner.emit_chunks().await;
        assert_eq!(streamer.received(), vec![1, 2, 3]);
        emitter.inner.emit_chunks().await;
        assert_eq!(streamer.received(), vec![1, 2, 3, 4, 5, 6]);
        emitter.inner.emit_chunks().await;
        assert_eq!(streamer.received(), vec![1, 2, 3, 4, 5, 6, 7]);
        assert!(buffered_ts(&emitter).is_empty());
    }

    #[tokio::test]
    async fn test_chunk_info_describes_cut() {
        let streamer = ScriptedStreamer::accepting(vec![]);
        let size = entry(1).encoded_len();
        let emitter = emitter_with(streamer, 100 * size, 3 * size);
        for ts in 5..=9 {
            emitter.emit_log_entry(&entry(ts));
        }
        let (chunk, info) = emitter.inner.fetch_chunk();
        assert_eq!(chunk.len(), 3);
        assert_eq!(info.num_entries, 3);
        assert_eq!(info.total_size, 3 * size);
        assert_eq!(info.first_nano_ts, 5);
        assert_eq!(info.last_nano_ts, 7);
    }
}
