// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;

use loghub::proto::LogEntry;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Blob(#[from] loghub::blob::BlobError),

    #[error("store failed: {0}")]
    Internal(String),
}

/// Writes the entries of one ingress batch.
#[async_trait]
pub trait BatchWriter: Send {
    /// A failed write means the entry was not accepted; the ingress server
    /// stops the batch and propagates the error to the producer.
    async fn write_entry(&mut self, entry: &LogEntry) -> Result<(), StoreError>;

    async fn close(&mut self) -> Result<(), StoreError>;
}

/// The abstraction of log storage behind the ingress server.
#[async_trait]
pub trait LogStore: Send + Sync + 'static {
    async fn write_batch(&self, client_name: &str) -> Result<Box<dyn BatchWriter>, StoreError>;
}

/// Writes every batch to all inner stores. All stores see every entry; the
/// first error is reported after the rest were attempted.
pub struct MultiStore {
    stores: Vec<Arc<dyn LogStore>>,
}

impl MultiStore {
    pub fn new(stores: Vec<Arc<dyn LogStore>>) -> Self {
        MultiStore { stores }
    }
}

#[async_trait]
impl LogStore for MultiStore {
    async fn write_batch(&self, client_name: &str) -> Result<Box<dyn BatchWriter>, StoreError> {
        let mut writers = Vec::with_capacity(self.stores.len());
        for store in &self.stores {
            writers.push(store.write_batch(client_name).await?);
        }
        Ok(Box::new(MultiBatchWriter { writers }))
    }
}

struct MultiBatchWriter {
    writers: Vec<Box<dyn BatchWriter>>,
}

#[async_trait]
impl BatchWriter for MultiBatchWriter {
    async fn write_entry(&mut self, entry: &LogEntry) -> Result<(), StoreError> {
        let mut first_error = None;
        for writer in &mut self.writers {
            if let Err(err) = writer.write_entry(entry).await {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        let mut first_error = None;
        for writer in &mut self.writers {
            if let Err(err) = writer.close().await {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
