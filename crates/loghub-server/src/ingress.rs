// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bidirectional gRPC ingress.
//!
//! Producers stream `IngressBatch` messages; the server writes each entry
//! to the configured store and answers with `IngressEvent{last_nano_ts}`
//! acknowledgements. Acks are sent on chunk boundaries, after more than
//! `MAX_PENDING_ACKS` entries, or when a write fails; they throttle the
//! producer's in-flight bytes.

use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status, Streaming};
use tracing::debug;

use loghub_proto::v1::ingress_service_server::IngressService;
use loghub_proto::v1::{IngressBatch, IngressEvent};

use crate::store::LogStore;

/// Metadata key that must carry a non-empty client name.
pub const METADATA_KEY_CLIENT_NAME: &str = "logs-client";

/// Entries accepted since the last acknowledgement before one is forced.
pub const MAX_PENDING_ACKS: usize = 8;

const ACK_CHANNEL_CAPACITY: usize = 8;

/// The ingress service implementation over a [`LogStore`].
pub struct IngressServer {
    store: Arc<dyn LogStore>,
}

impl IngressServer {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        IngressServer { store }
    }
}

fn client_name_from(metadata: &MetadataMap) -> Option<String> {
    metadata
        .get_all(METADATA_KEY_CLIENT_NAME)
        .iter()
        .filter_map(|val| val.to_str().ok())
        .find(|val| !val.is_empty())
        .map(str::to_string)
}

#[tonic::async_trait]
impl IngressService for IngressServer {
    type IngressStreamStream =
        Pin<Box<dyn Stream<Item = Result<IngressEvent, Status>> + Send + 'static>>;

    async fn ingress_stream(
        &self,
        request: Request<Streaming<IngressBatch>>,
    ) -> Result<Response<Self::IngressStreamStream>, Status> {
        let client_name = client_name_from(request.metadata())
            .ok_or_else(|| Status::unauthenticated("unauthenticated"))?;
        debug!(client = %client_name, "ingress stream opened");

        let mut batches = request.into_inner();
        let store = Arc::clone(&self.store);
        let (ack_tx, ack_rx) = mpsc::channel(ACK_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut receiver = IngressReceiver::new(store, client_name);
            loop {
                match batches.message().await {
                    Ok(Some(batch)) => {
                        if let Err(status) = receiver.handle_batch(&batch, &ack_tx).await {
                            let _ = ack_tx.send(Err(status)).await;
                            return;
                        }
                    }
                    // Producer closed its side, or the transport failed;
                    // either way the stream is over.
                    Ok(None) | Err(_) => return,
                }
            }
        });
        Ok(Response::new(Box::pin(ReceiverStream::new(ack_rx))))
    }
}

struct IngressReceiver {
    store: Arc<dyn LogStore>,
    client_name: String,
    received_nano_ts: i64,
    ack_pending: usize,
}

impl IngressReceiver {
    fn new(store: Arc<dyn LogStore>, client_name: String) -> Self {
        IngressReceiver {
            store,
            client_name,
            received_nano_ts: 0,
            ack_pending: 0,
        }
    }

    async fn handle_batch(
        &mut self,
        batch: &IngressBatch,
        acks: &mpsc::Sender<Result<IngressEvent, Status>>,
    ) -> Result<(), Status> {
        let mut writer = self
            .store
            .write_batch(&self.client_name)
            .await
            .map_err(|err| Status::internal(err.to_string()))?;

        let mut write_error = None;
        for entry in &batch.entries {
            if let Err(err) = writer.write_entry(entry).await {
                write_error = Some(err);
                break;
            }
            self.received_nano_ts = entry.nano_ts;
            self.ack_pending += 1;
        }
        if let Err(err) = writer.close().await {
            debug!(client = %self.client_name, error = %err, "batch writer close failed");
        }

        if batch.chunk_end || self.ack_pending > MAX_PENDING_ACKS || write_error.is_some() {
            let _ = acks
                .send(Ok(IngressEvent {
                    last_nano_ts: self.received_nano_ts,
                }))
                .await;
            self.ack_pending = 0;
        }

        match write_error {
            Some(err) => Err(Status::internal(err.to_string())),
            None => Ok(()),
        }
    }
}
