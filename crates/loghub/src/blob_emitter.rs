// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Rotating blob file sink.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::blob::{BlobError, Writer};
use crate::emitter::{emergent, LogEmitter};
use crate::proto::LogEntry;

/// Factory producing the next output file when the emitter rotates.
pub type CreateFile = Box<dyn Fn() -> io::Result<Box<dyn Write + Send>> + Send + Sync>;

/// Emits log entries encoded as framed binary records, rotating to a fresh
/// file from the factory whenever the size limit is reached. Failures other
/// than rotation are reported to the emergent logger and the entry is
/// dropped.
pub struct BlobEmitter {
    create_file: CreateFile,
    sync: bool,
    size_limit: u64,
    writer: Mutex<Option<Writer<Box<dyn Write + Send>>>>,
}

impl BlobEmitter {
    pub fn new(create_file: CreateFile, sync: bool, size_limit: u64) -> Self {
        BlobEmitter {
            create_file,
            sync,
            size_limit,
            writer: Mutex::new(None),
        }
    }
}

impl LogEmitter for BlobEmitter {
    fn emit_log_entry(&self, entry: &LogEntry) {
        #[allow(clippy::expect_used)]
        let mut writer = self.writer.lock().expect("lock poisoned");
        loop {
            if let Some(active) = writer.as_mut() {
                match active.write_entry(entry) {
                    Ok(()) => return,
                    Err(BlobError::SizeLimitExceeded) => {
                        *writer = None;
                    }
                    Err(err) => {
                        *writer = None;
                        emergent().error(&err).print_err("BlobWriter: ");
                        return;
                    }
                }
            }
            match (self.create_file)() {
                Ok(out) => *writer = Some(Writer::new(out, self.sync, self.size_limit)),
                Err(err) => {
                    emergent().error(&err).print_err("BlobWriter CreateFile: ");
                    return;
                }
            }
        }
    }
}

/// Returns a [`CreateFile`] producing files named after `pattern`.
///
/// The tokens `{timestamp}` (unix seconds), `{nanos}` (nanosecond part) and
/// `{seq}` (auto-incremented, starting at 0) are substituted on each
/// rotation; parent directories are created as needed.
pub fn create_file_with(pattern: impl Into<String>) -> CreateFile {
    let pattern = pattern.into();
    let sequence = AtomicI64::new(0);
    Box::new(move || {
        let now = crate::now_nanos();
        let seq = sequence.fetch_add(1, Ordering::SeqCst);
        let name = pattern
            .replace("{timestamp}", &(now / 1_000_000_000).to_string())
            .replace("{nanos}", &(now % 1_000_000_000).to_string())
            .replace("{seq}", &seq.to_string());
        if let Some(parent) = Path::new(&name).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = fs::File::create(&name)?;
        Ok(Box::new(file) as Box<dyn Write + Send>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use crate::blob::{raw_record_size, Reader};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn entry(nano_ts: i64) -> LogEntry {
        LogEntry {
            nano_ts,
            message: "rotate me".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_rotates_on_size_limit() {
        let files: Arc<Mutex<Vec<SharedBuf>>> = Arc::new(Mutex::new(Vec::new()));
        let files_in_factory = Arc::clone(&files);
        let create: CreateFile = Box::new(move || {
            let buf = SharedBuf::default();
            files_in_factory.lock().unwrap().push(buf.clone());
            Ok(Box::new(buf) as Box<dyn Write + Send>)
        });
        // Each file fits exactly two records.
        let limit = 2 * raw_record_size(&entry(0)) as u64;
        let emitter = BlobEmitter::new(create, false, limit);

        for ts in 1..=5 {
            emitter.emit_log_entry(&entry(ts));
        }

        let files = files.lock().unwrap();
        assert_eq!(files.len(), 3);
        let mut seen = Vec::new();
        for file in files.iter() {
            let bytes = file.0.lock().unwrap().clone();
            let mut reader = Reader::new(io::Cursor::new(bytes));
            while let Some(entry) = reader.read_entry().unwrap() {
                seen.push(entry.nano_ts);
            }
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_factory_failure_drops_entry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);
        let create: CreateFile = Box::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "nope"))
        });
        let emitter = BlobEmitter::new(create, false, 0);
        emitter.emit_log_entry(&entry(1));
        emitter.emit_log_entry(&entry(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_create_file_with_substitutes_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir
            .path()
            .join("logs-{seq}.blob")
            .to_string_lossy()
            .to_string();
        let create = create_file_with(pattern);
        let _ = create().unwrap();
        let _ = create().unwrap();
        assert!(dir.path().join("logs-0.blob").exists());
        assert!(dir.path().join("logs-1.blob").exists());
    }
}
