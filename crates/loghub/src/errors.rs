// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors surfaced by streaming sinks.
///
/// These never propagate to application code emitting entries; the emitters
/// report them through the emergent logger and carry on.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("stream closed")]
    Closed,

    #[error("invalid client name: {0}")]
    InvalidClientName(String),

    #[error("operation canceled")]
    Canceled,
}
