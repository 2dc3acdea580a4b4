// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! gRPC streaming client for the ingress service.
//!
//! Two delivery contracts are offered over the same connection:
//! [`LogStreamer`] sends whole batches over a single lazily-opened stream
//! that reopens on the next send after any receive error, and
//! [`ChunkedStreamer`] opens one stream per chunk, tracking the server's
//! last-received acknowledgement for the chunked emitter's requeue logic.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, Endpoint};
use tonic::Request;

use crate::chunked_emitter::{ChunkInfo, ChunkStream, ChunkedStreamer};
use crate::errors::StreamError;
use crate::proto::ingress_service_client::IngressServiceClient;
use crate::proto::{IngressBatch, LogEntry};
use crate::stream_emitter::LogStreamer;

/// Metadata key carrying the client name on every ingress stream.
pub const METADATA_KEY_CLIENT_NAME: &str = "logs-client";

const SEND_CHANNEL_CAPACITY: usize = 16;

struct PersistentStream {
    tx: mpsc::Sender<IngressBatch>,
    generation: u64,
}

/// Streams logs to a remote ingress server.
pub struct RemoteStreamer {
    channel: Channel,
    client_name: MetadataValue<Ascii>,
    generation: AtomicU64,
    stream: Arc<tokio::sync::Mutex<Option<PersistentStream>>>,
}

impl RemoteStreamer {
    /// Creates a streamer for `addr` ("host:port", or a full URI). The
    /// connection is established lazily on first use.
    pub fn connect(client_name: &str, addr: &str) -> Result<Self, StreamError> {
        let uri = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        };
        let endpoint = Endpoint::from_shared(uri)
            .map_err(|err| StreamError::Unreachable(err.to_string()))?;
        let client_name = client_name
            .parse::<MetadataValue<Ascii>>()
            .map_err(|_| StreamError::InvalidClientName(client_name.to_string()))?;
        Ok(RemoteStreamer {
            channel: endpoint.connect_lazy(),
            client_name,
            generation: AtomicU64::new(0),
            stream: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    fn client(&self) -> IngressServiceClient<Channel> {
        IngressServiceClient::new(self.channel.clone())
    }

    async fn open_stream(
        &self,
    ) -> Result<
        (
            mpsc::Sender<IngressBatch>,
            tonic::Streaming<crate::proto::IngressEvent>,
        ),
        StreamError,
    > {
        let (tx, rx) = mpsc::channel(SEND_CHANNEL_CAPACITY);
        let mut request = Request::new(ReceiverStream::new(rx));
        request
            .metadata_mut()
            .insert(METADATA_KEY_CLIENT_NAME, self.client_name.clone());
        let response = self.client().ingress_stream(request).await?;
        Ok((tx, response.into_inner()))
    }

    /// Returns the sender of the shared stream, opening it when necessary.
    /// A background reader drains acknowledgements; on any receive error it
    /// clears the shared stream so the next send reopens a fresh one.
    async fn ensure_stream(&self) -> Result<mpsc::Sender<IngressBatch>, StreamError> {
        let mut slot = self.stream.lock().await;
        if let Some(stream) = slot.as_ref() {
            return Ok(stream.tx.clone());
        }
        let (tx, mut events) = self.open_stream().await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        *slot = Some(PersistentStream {
            tx: tx.clone(),
            generation,
        });
        let shared = Arc::clone(&self.stream);
        tokio::spawn(async move {
            loop {
                match events.message().await {
                    Ok(Some(_event)) => {}
                    Ok(None) | Err(_) => break,
                }
            }
            let mut slot = shared.lock().await;
            if slot.as_ref().map(|s| s.generation) == Some(generation) {
                *slot = None;
            }
        });
        Ok(tx)
    }
}

#[async_trait]
impl LogStreamer for RemoteStreamer {
    async fn stream_entries(&self, entries: Vec<LogEntry>) -> Result<(), StreamError> {
        let tx = self.ensure_stream().await?;
        tx.send(IngressBatch {
            entries,
            chunk_end: true,
        })
        .await
        .map_err(|_| StreamError::Closed)
    }
}

#[async_trait]
impl ChunkedStreamer for RemoteStreamer {
    async fn start_stream(&self, info: ChunkInfo) -> Result<Box<dyn ChunkStream>, StreamError> {
        let (tx, mut events) = self.open_stream().await?;
        let last_nano_ts = Arc::new(AtomicI64::new(0));
        let (done_tx, done_rx) = mpsc::channel(1);
        let last = Arc::clone(&last_nano_ts);
        tokio::spawn(async move {
            loop {
                match events.message().await {
                    Ok(Some(event)) => {
                        last.store(event.last_nano_ts, Ordering::SeqCst);
                    }
                    Ok(None) => {
                        let _ = done_tx.send(Ok(())).await;
                        return;
                    }
                    Err(status) => {
                        let _ = done_tx.send(Err(StreamError::Rpc(status))).await;
                        return;
                    }
                }
            }
        });
        Ok(Box::new(RemoteChunkStream {
            tx: Some(tx),
            info,
            entry_count: 0,
            last_nano_ts,
            done_rx,
        }))
    }
}

struct RemoteChunkStream {
    tx: Option<mpsc::Sender<IngressBatch>>,
    info: ChunkInfo,
    entry_count: usize,
    last_nano_ts: Arc<AtomicI64>,
    done_rx: mpsc::Receiver<Result<(), StreamError>>,
}

#[async_trait]
impl ChunkStream for RemoteChunkStream {
    async fn stream_entry(&mut self, entry: &LogEntry) -> Result<(), StreamError> {
        let tx = self.tx.as_ref().ok_or(StreamError::Closed)?;
        self.entry_count += 1;
        tx.send(IngressBatch {
            entries: vec![entry.clone()],
            chunk_end: self.entry_count == self.info.num_entries,
        })
        .await
        .map_err(|_| StreamError::Closed)
    }

    async fn stream_end(&mut self) -> (i64, Result<(), StreamError>) {
        // Dropping the sender closes the send side of the stream; the
        // server then finishes its response stream and the reader task
        // reports how it ended.
        self.tx = None;
        let result = match self.done_rx.recv().await {
            Some(result) => result,
            None => Err(StreamError::Closed),
        };
        (self.last_nano_ts.load(Ordering::SeqCst), result)
    }
}
