// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logging configuration and default-logger assembly.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::blob_emitter::{create_file_with, BlobEmitter};
use crate::chunked_emitter::{ChunkedEmitter, ChunkedEmitterConfig};
use crate::console::ConsoleEmitter;
use crate::emitter::{setup, LogEmitter, MultiEmitter};
use crate::errors::StreamError;
use crate::remote::RemoteStreamer;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown console printer: {0}")]
    UnknownPrinter(String),

    #[error("remote streaming requires a client name")]
    MissingClientName,

    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Configuration for the emitter chain behind the default logger.
///
/// Values default from `LOGS_*` environment variables; the CLI binds the
/// same fields to flags.
#[derive(Clone, Debug)]
pub struct Config {
    pub client_name: String,
    /// Console printer selection: "" or "default" for compact lines,
    /// "json" for JSON lines, "none" to disable console output.
    pub console_printer: String,

    /// Blob filename pattern; empty disables the blob file sink.
    pub blob_file: String,
    pub blob_sync: bool,
    /// 0 means no limit.
    pub blob_size_limit: u64,

    /// Ingress server address; empty disables remote streaming.
    pub remote_addr: String,

    pub chunked_max_buffer: usize,
    pub chunked_max_batch: usize,
    pub chunked_collect_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client_name: env_or_default("LOGS_CLIENT", String::new()),
            console_printer: env_or_default("LOGS_PRINTER", String::new()),
            blob_file: env_or_default("LOGS_BLOB_FILE", String::new()),
            blob_sync: false,
            blob_size_limit: 0,
            remote_addr: env_or_default("LOGS_REMOTE_ADDR", String::new()),
            chunked_max_buffer: env_or_int("LOGS_CHUNKED_BUFFER_MAX", 1 << 20),
            chunked_max_batch: env_or_int("LOGS_CHUNKED_BATCH_MAX", 1 << 14),
            chunked_collect_period: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Builds the emitter chain. Must be called within a Tokio runtime when
    /// remote streaming is configured.
    pub fn emitter(&self) -> Result<Arc<dyn LogEmitter>, ConfigError> {
        let mut emitters = MultiEmitter::new();
        match self.console_printer.as_str() {
            "" | "default" => emitters.push(Arc::new(ConsoleEmitter::compact_stderr())),
            "json" => emitters.push(Arc::new(ConsoleEmitter::json(Box::new(
                std::io::stderr(),
            )))),
            "none" => {}
            other => return Err(ConfigError::UnknownPrinter(other.to_string())),
        }

        if !self.blob_file.is_empty() {
            emitters.push(Arc::new(BlobEmitter::new(
                create_file_with(self.blob_file.clone()),
                self.blob_sync,
                self.blob_size_limit,
            )));
        }

        if !self.remote_addr.is_empty() {
            if self.client_name.is_empty() {
                return Err(ConfigError::MissingClientName);
            }
            let streamer = RemoteStreamer::connect(&self.client_name, &self.remote_addr)?;
            let mut chunked = ChunkedEmitterConfig::new(
                Arc::new(streamer),
                self.chunked_max_buffer,
                self.chunked_max_batch,
            );
            chunked.collect_period = self.chunked_collect_period;
            emitters.push(Arc::new(ChunkedEmitter::new(chunked)));
        }

        Ok(emitters.into_emitter())
    }

    /// Builds the emitter chain and installs it as the process-wide
    /// default logger.
    pub fn setup_default_logger(&self) -> Result<(), ConfigError> {
        setup(self.emitter()?);
        Ok(())
    }
}

fn env_or_default(var: &str, default: String) -> String {
    env::var(var).unwrap_or(default)
}

fn env_or_int(var: &str, default: usize) -> usize {
    env::var(var)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}
