// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Length-prefixed blob framing for binary log files.
//!
//! Record layout: `head(LE u32 payload size) | payload | 0..3 zero pad |
//! tail(LE u32 payload size)`. Padding aligns the tail to 4 bytes. The
//! duplicated size detects torn writes and allows resyncing after mid-file
//! corruption.

use std::io::{self, Read, Write};

use prost::Message;

use crate::proto::LogEntry;

/// Maximum accepted payload size: 16 MiB.
pub const MAX_RECORD_BODY: u32 = 1 << 24;
/// Default blob file size limit: 64 MiB.
pub const DEFAULT_FILE_SIZE_LIMIT: u64 = 1 << 26;
/// Suffix of blob log files.
pub const FILE_SUFFIX: &str = ".logs.blob";
/// Name of the actively written blob file; renamed on rotation.
pub const CURRENT_FILE_NAME: &str = "current.logs.blob";

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("bad record: {0}")]
    BadRecord(String),

    /// Writing the record would exceed the writer's size limit; the caller
    /// is expected to rotate to a fresh file.
    #[error("size limit exceeded")]
    SizeLimitExceeded,

    #[error("decode record: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn padded(size: usize) -> usize {
    (size + 3) & !3
}

/// On-disk size of an entry once framed: padded payload plus head and tail.
pub fn raw_record_size(entry: &LogEntry) -> usize {
    padded(entry.encoded_len()) + 8
}

/// Frames an entry into a single contiguous record.
pub fn encode_record(entry: &LogEntry) -> Vec<u8> {
    let body = entry.encode_to_vec();
    let head = (body.len() as u32).to_le_bytes();
    let mut record = Vec::with_capacity(padded(body.len()) + 8);
    record.extend_from_slice(&head);
    record.extend_from_slice(&body);
    record.resize(4 + padded(body.len()), 0);
    record.extend_from_slice(&head);
    record
}

/// Writes framed log entries to a byte stream.
pub struct Writer<W: Write> {
    out: W,
    sync: bool,
    size_limit: u64,
    written_size: u64,
}

impl<W: Write> Writer<W> {
    /// `size_limit` of zero means unlimited. With `sync` set the output is
    /// flushed after every record.
    pub fn new(out: W, sync: bool, size_limit: u64) -> Self {
        Writer {
            out,
            sync,
            size_limit,
            written_size: 0,
        }
    }

    pub fn written_size(&self) -> u64 {
        self.written_size
    }

    /// Writes a single entry, refusing with [`BlobError::SizeLimitExceeded`]
    /// when the record would push the file past the size limit.
    pub fn write_entry(&mut self, entry: &LogEntry) -> Result<(), BlobError> {
        let record_size = raw_record_size(entry) as u64;
        if self.size_limit > 0 && self.written_size + record_size > self.size_limit {
            return Err(BlobError::SizeLimitExceeded);
        }
        let record = encode_record(entry);
        self.out.write_all(&record)?;
        self.written_size += record.len() as u64;
        if self.sync {
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Reads framed log entries from a byte stream.
pub struct Reader<R: Read> {
    input: R,
}

impl<R: Read> Reader<R> {
    pub fn new(input: R) -> Self {
        Reader { input }
    }

    /// Reads one entry. Returns `None` on a clean end of stream at a record
    /// boundary; a truncated record surfaces as an I/O error and a size
    /// mismatch as [`BlobError::BadRecord`].
    pub fn read_entry(&mut self) -> Result<Option<LogEntry>, BlobError> {
        let mut head = [0u8; 4];
        if !self.fill_or_eof(&mut head)? {
            return Ok(None);
        }
        let size = u32::from_le_bytes(head);
        if size == 0 || size > MAX_RECORD_BODY {
            return Err(BlobError::BadRecord(format!("head size {size} invalid")));
        }
        let padded_size = padded(size as usize);
        let mut body = vec![0u8; padded_size + 4];
        self.input.read_exact(&mut body)?;
        let tail_size = u32::from_le_bytes([
            body[padded_size],
            body[padded_size + 1],
            body[padded_size + 2],
            body[padded_size + 3],
        ]);
        if tail_size != size {
            return Err(BlobError::BadRecord(format!(
                "tail size {tail_size} not match head size {size}"
            )));
        }
        let entry = LogEntry::decode(&body[..size as usize])?;
        Ok(Some(entry))
    }

    /// Fills `buf` completely, or reports a clean EOF when the stream ends
    /// before the first byte.
    fn fill_or_eof(&mut self, buf: &mut [u8]) -> Result<bool, BlobError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.input.read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(BlobError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated record head",
                )));
            }
            filled += n;
        }
        Ok(true)
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}
