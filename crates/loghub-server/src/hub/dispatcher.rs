// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The hub dispatcher: a lossy fan-out tap, not a queue.
//!
//! Consumer connections are kept in a shared set. Each batch writer works
//! against a snapshot of the set taken when the batch opens, framing every
//! entry as a big-endian u32 length followed by its protobuf encoding.
//! Per-connection write errors are ignored; the connection's own read loop
//! notices the disconnect and deregisters it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use prost::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpListener;
use tracing::debug;

use loghub::proto::LogEntry;
use loghub::LogEmitter;

use crate::store::{BatchWriter, LogStore, StoreError};

struct Consumer {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
}

/// Dispatches ingress entries to connected consumers.
#[derive(Default)]
pub struct Dispatcher {
    emitter: Option<Arc<dyn LogEmitter>>,
    next_conn_id: AtomicU64,
    conns: RwLock<HashMap<u64, Arc<Consumer>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additionally replicates every accepted entry into a local emitter.
    pub fn replicate_to(mut self, emitter: Arc<dyn LogEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn consumer_count(&self) -> usize {
        #[allow(clippy::expect_used)]
        let conns = self.conns.read().expect("lock poisoned");
        conns.len()
    }

    /// Accepts consumer connections until the listener fails. Each
    /// connection's read loop exists only to detect disconnection.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (socket, addr) = listener.accept().await?;
            debug!(%addr, "hub consumer connected");
            let (mut read_half, write_half) = socket.into_split();
            let id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);
            let consumer = Arc::new(Consumer {
                writer: tokio::sync::Mutex::new(write_half),
            });
            {
                #[allow(clippy::expect_used)]
                let mut conns = self.conns.write().expect("lock poisoned");
                conns.insert(id, consumer);
            }
            let dispatcher = Arc::clone(&self);
            tokio::spawn(async move {
                let mut scratch = [0u8; 1];
                loop {
                    match read_half.read(&mut scratch).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
                {
                    #[allow(clippy::expect_used)]
                    let mut conns = dispatcher.conns.write().expect("lock poisoned");
                    conns.remove(&id);
                }
                debug!(%addr, "hub consumer disconnected");
            });
        }
    }
}

#[async_trait]
impl LogStore for Dispatcher {
    async fn write_batch(&self, _client_name: &str) -> Result<Box<dyn BatchWriter>, StoreError> {
        let conns: Vec<Arc<Consumer>> = {
            #[allow(clippy::expect_used)]
            let conns = self.conns.read().expect("lock poisoned");
            conns.values().cloned().collect()
        };
        Ok(Box::new(DispatchBatchWriter {
            emitter: self.emitter.clone(),
            conns,
        }))
    }
}

struct DispatchBatchWriter {
    emitter: Option<Arc<dyn LogEmitter>>,
    conns: Vec<Arc<Consumer>>,
}

#[async_trait]
impl BatchWriter for DispatchBatchWriter {
    async fn write_entry(&mut self, entry: &LogEntry) -> Result<(), StoreError> {
        if let Some(emitter) = &self.emitter {
            emitter.emit_log_entry(entry);
        }
        if self.conns.is_empty() {
            return Ok(());
        }
        let payload = entry.encode_to_vec();
        let frame_len = (payload.len() as u32).to_be_bytes();
        for consumer in &self.conns {
            // Writes are synchronous and unbounded: a blocked consumer
            // stalls this batch writer until it drains or disconnects.
            let mut writer = consumer.writer.lock().await;
            let _ = writer.write_all(&frame_len).await;
            let _ = writer.write_all(&payload).await;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
