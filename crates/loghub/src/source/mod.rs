// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Readers that decode log entries from files or streams, auto-detecting
//! JSON-lines versus blob framing, plus the filter algebra applied on top.

pub mod filter;
pub mod filter_parser;

use std::io::{self, BufRead, BufReader, Read};

use crate::blob::{self, BlobError};
use crate::proto::LogEntry;

use filter::LogEntryFilter;

const WHITESPACE: &[u8] = b" \t\r\n";
const MAX_PRE_READ: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("parse entry: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reads log entries one at a time; `None` signals a clean end of input.
pub trait EntryReader {
    fn read(&mut self) -> Result<Option<LogEntry>, SourceError>;
}

/// Applies a filter on top of another reader.
pub struct FilteredReader<R: EntryReader> {
    pub reader: R,
    pub filter: Option<Box<dyn LogEntryFilter>>,
}

impl<R: EntryReader> EntryReader for FilteredReader<R> {
    fn read(&mut self) -> Result<Option<LogEntry>, SourceError> {
        loop {
            let Some(entry) = self.reader.read()? else {
                return Ok(None);
            };
            match &self.filter {
                Some(filter) if !filter.matches(&entry) => continue,
                _ => return Ok(Some(entry)),
            }
        }
    }
}

/// Reads newline-separated JSON entries.
pub struct JsonSource<R: BufRead> {
    input: R,
    skip_errors: bool,
}

impl<R: BufRead> JsonSource<R> {
    pub fn new(input: R) -> Self {
        JsonSource {
            input,
            skip_errors: false,
        }
    }

    pub fn skip_errors(mut self, skip: bool) -> Self {
        self.skip_errors = skip;
        self
    }
}

impl<R: BufRead> EntryReader for JsonSource<R> {
    fn read(&mut self) -> Result<Option<LogEntry>, SourceError> {
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => return Ok(Some(entry)),
                Err(err) if self.skip_errors => {
                    let _ = err;
                    continue;
                }
                Err(err) => return Err(SourceError::Parse(err)),
            }
        }
    }
}

/// Reads blob-framed entries.
pub struct BlobSource<R: Read> {
    reader: blob::Reader<R>,
}

impl<R: Read> BlobSource<R> {
    pub fn new(input: R) -> Self {
        BlobSource {
            reader: blob::Reader::new(input),
        }
    }
}

impl<R: Read> EntryReader for BlobSource<R> {
    fn read(&mut self) -> Result<Option<LogEntry>, SourceError> {
        Ok(self.reader.read_entry()?)
    }
}

type Replayed<R> = io::Chain<io::Cursor<Vec<u8>>, R>;

enum Detected<R: Read> {
    Pending(Option<R>),
    Json(JsonSource<BufReader<Replayed<R>>>),
    Blob(BlobSource<Replayed<R>>),
    Done,
}

/// Auto-detects the content of a stream to decode log entries.
///
/// Single bytes are consumed through leading whitespace (up to 4096 bytes
/// are buffered, then discarded); a `{` switches to the JSON-lines reader,
/// anything else to the blob reader with the consumed bytes replayed.
pub struct StreamSource<R: Read> {
    skip_errors: bool,
    state: Detected<R>,
}

impl<R: Read> StreamSource<R> {
    pub fn new(input: R) -> Self {
        StreamSource {
            skip_errors: false,
            state: Detected::Pending(Some(input)),
        }
    }

    pub fn skip_errors(mut self, skip: bool) -> Self {
        self.skip_errors = skip;
        self
    }

    fn detect(&mut self, mut input: R) -> Result<(), SourceError> {
        let mut pre_read = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            if input.read(&mut byte)? == 0 {
                self.state = Detected::Done;
                return Ok(());
            }
            pre_read.push(byte[0]);
            if WHITESPACE.contains(&byte[0]) {
                if pre_read.len() > MAX_PRE_READ {
                    pre_read.clear();
                }
                continue;
            }
            if byte[0] == b'{' {
                // Only the brace is replayed; leading whitespace is noise
                // to the JSON-lines reader.
                let replay = io::Cursor::new(vec![b'{']).chain(input);
                self.state = Detected::Json(
                    JsonSource::new(BufReader::new(replay)).skip_errors(self.skip_errors),
                );
            } else {
                let replay = io::Cursor::new(pre_read).chain(input);
                self.state = Detected::Blob(BlobSource::new(replay));
            }
            return Ok(());
        }
    }
}

impl<R: Read> EntryReader for StreamSource<R> {
    fn read(&mut self) -> Result<Option<LogEntry>, SourceError> {
        loop {
            match &mut self.state {
                Detected::Pending(input) => {
                    let Some(input) = input.take() else {
                        return Ok(None);
                    };
                    self.detect(input)?;
                }
                Detected::Json(reader) => return reader.read(),
                Detected::Blob(reader) => return reader.read(),
                Detected::Done => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::blob::Writer;
    use crate::level::Level;

    fn entry(nano_ts: i64, message: &str) -> LogEntry {
        LogEntry {
            nano_ts,
            level: Level::Info as i32,
            message: message.to_string(),
            ..Default::default()
        }
    }

    fn blob_bytes(entries: &[LogEntry]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf, false, 0);
        for entry in entries {
            writer.write_entry(entry).unwrap();
        }
        buf
    }

    fn json_bytes(entries: &[LogEntry]) -> Vec<u8> {
        let mut buf = Vec::new();
        for entry in entries {
            buf.extend_from_slice(serde_json::to_string(entry).unwrap().as_bytes());
            buf.push(b'\n');
        }
        buf
    }

    fn read_all<R: EntryReader>(mut reader: R) -> Vec<LogEntry> {
        let mut out = Vec::new();
        while let Some(entry) = reader.read().unwrap() {
            out.push(entry);
        }
        out
    }

    #[test]
    fn test_detects_json_lines() {
        let entries = vec![entry(1, "a"), entry(2, "b")];
        let data = json_bytes(&entries);
        let got = read_all(StreamSource::new(Cursor::new(data)));
        assert_eq!(got, entries);
    }

    #[test]
    fn test_detects_json_after_whitespace() {
        let entries = vec![entry(1, "a")];
        let mut data = b"  \n\t ".to_vec();
        data.extend_from_slice(&json_bytes(&entries));
        let got = read_all(StreamSource::new(Cursor::new(data)));
        assert_eq!(got, entries);
    }

    #[test]
    fn test_detects_blob() {
        let entries = vec![entry(1, "a"), entry(2, "b"), entry(3, "c")];
        let data = blob_bytes(&entries);
        let got = read_all(StreamSource::new(Cursor::new(data)));
        assert_eq!(got, entries);
    }

    #[test]
    fn test_empty_input_is_clean_end() {
        let got = read_all(StreamSource::new(Cursor::new(Vec::new())));
        assert!(got.is_empty());
    }

    #[test]
    fn test_json_skip_errors() {
        let mut data = b"{not json}\n".to_vec();
        data.extend_from_slice(&json_bytes(&[entry(5, "ok")]));
        let got = read_all(StreamSource::new(Cursor::new(data)).skip_errors(true));
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].nano_ts, 5);
    }

    #[test]
    fn test_json_error_surfaces_without_skip() {
        let data = b"{not json}\n".to_vec();
        let mut reader = StreamSource::new(Cursor::new(data));
        assert!(matches!(reader.read(), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_filtered_reader_applies_filter() {
        let entries = vec![entry(1, "keep"), entry(2, "drop"), entry(3, "keep")];
        let data = json_bytes(&entries);
        let reader = FilteredReader {
            reader: StreamSource::new(Cursor::new(data)),
            filter: Some(Box::new(filter::MessageFilter {
                contains: "keep".to_string(),
            })),
        };
        let got = read_all(reader);
        assert_eq!(got.iter().map(|e| e.nano_ts).collect::<Vec<_>>(), vec![1, 3]);
    }
}
