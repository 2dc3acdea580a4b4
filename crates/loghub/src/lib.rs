// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Span-aware structured logging client.
//!
//! Application code talks to a [`Logger`], which produces typed
//! [`proto::LogEntry`] records carrying inherited trace/span context and
//! attributes. Entries flow into a configured chain of [`LogEmitter`] sinks:
//! console, rotating blob files, or buffered streaming emitters that ship
//! batches to a remote ingress over gRPC with at-least-once delivery.
//!
//! Failures inside the logging subsystem never reach application code; they
//! are reported through the [`emergent`] logger, a dedicated stderr logger
//! that exists to avoid feedback loops.

pub mod assembler;
pub mod blob;
pub mod blob_emitter;
pub mod chunked_emitter;
pub mod config;
pub mod console;
mod emergent;
mod emitter;
mod errors;
pub mod ids;
pub mod level;
mod logger;
pub mod remote;
pub mod source;
pub mod stream_emitter;

pub use loghub_proto::v1 as proto;

pub use emergent::EmergentEmitter;
pub use emitter::{
    default_logger, emergent, root, setup, DummyEmitter, EmitterFn, LogEmitter, MultiEmitter,
};
pub use errors::StreamError;
pub use level::{parse_level, Level};
pub use logger::{
    start_span, use_logger, Attribute, LogContext, LogPrinter, Logger, SpanInfo,
};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock in nanoseconds since the Unix epoch.
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
