// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Trace and span identifiers.
//!
//! Trace IDs are 16 raw bytes stored little-endian; the display form
//! reverses the byte order before hex encoding, so the string reads
//! big-endian like other tracing systems. Span IDs are non-zero u64 values
//! displayed as zero-padded big-endian hex.

use data_encoding::HEXLOWER;
use rand::RngCore;

use crate::proto::SpanContext;

#[derive(Debug, thiserror::Error)]
#[error("invalid id: {0}")]
pub struct InvalidId(pub String);

/// Returns a new random 128-bit trace ID.
pub fn new_trace_id() -> Vec<u8> {
    let mut id = vec![0u8; 16];
    rand::thread_rng().fill_bytes(&mut id);
    id
}

/// Returns a time based span ID. Uniqueness is best-effort within a producer.
pub fn new_span_id() -> u64 {
    crate::now_nanos() as u64
}

/// A trace ID is valid iff it is exactly 16 bytes.
pub fn is_trace_id_valid(id: &[u8]) -> bool {
    id.len() == 16
}

/// Parses a string encoded trace ID back into raw bytes.
pub fn parse_trace_id(s: &str) -> Result<Vec<u8>, InvalidId> {
    let mut id = HEXLOWER
        .decode(s.to_lowercase().as_bytes())
        .map_err(|_| InvalidId(s.to_string()))?;
    if !is_trace_id_valid(&id) {
        return Err(InvalidId(s.to_string()));
    }
    id.reverse();
    Ok(id)
}

/// Parses a string encoded span ID.
pub fn parse_span_id(s: &str) -> Result<u64, InvalidId> {
    u64::from_str_radix(s, 16).map_err(|_| InvalidId(s.to_string()))
}

/// String encoded trace ID from a span context, or "" when invalid.
pub fn trace_id_string(ctx: Option<&SpanContext>) -> String {
    let Some(ctx) = ctx else {
        return String::new();
    };
    if !is_trace_id_valid(&ctx.trace_id) {
        return String::new();
    }
    let mut id = ctx.trace_id.clone();
    id.reverse();
    HEXLOWER.encode(&id)
}

/// String encoded span ID from a span context, or "" when absent.
pub fn span_id_string(ctx: Option<&SpanContext>) -> String {
    match ctx {
        Some(ctx) if ctx.span_id != 0 => format!("{:016x}", ctx.span_id),
        _ => String::new(),
    }
}

/// Combined "trace/span" form, or "" when either part is missing.
pub fn id_string(ctx: Option<&SpanContext>) -> String {
    let tid = trace_id_string(ctx);
    let sid = span_id_string(ctx);
    if tid.is_empty() || sid.is_empty() {
        return String::new();
    }
    format!("{tid}/{sid}")
}
