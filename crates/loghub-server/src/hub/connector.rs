// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use bytes::BytesMut;
use prost::Message;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;

use loghub::proto::LogEntry;
use loghub::LogEmitter;

/// Connects to a hub and feeds received entries into a local emitter.
pub struct Connector {
    pub emitter: Arc<dyn LogEmitter>,
}

impl Connector {
    pub async fn dial_and_stream(&self, addr: &str) -> std::io::Result<()> {
        let stream = TcpStream::connect(addr).await?;
        self.stream(stream).await
    }

    /// Decodes length-prefixed frames until the stream ends. Malformed
    /// entries are skipped; transport errors terminate. Returns `Ok` on a
    /// clean end at a frame boundary.
    pub async fn stream<R: AsyncRead + Unpin>(&self, mut input: R) -> std::io::Result<()> {
        let mut payload = BytesMut::new();
        loop {
            let mut frame_len = [0u8; 4];
            match input.read_exact(&mut frame_len).await {
                Ok(_) => {}
                Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(err) => return Err(err),
            }
            let size = u32::from_be_bytes(frame_len) as usize;
            payload.resize(size, 0);
            input.read_exact(&mut payload).await?;
            match LogEntry::decode(&payload[..]) {
                Ok(entry) => self.emitter.emit_log_entry(&entry),
                Err(_) => continue,
            }
        }
    }
}
