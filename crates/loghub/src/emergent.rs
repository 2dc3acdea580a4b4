// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};
use std::sync::Mutex;

use time::macros::format_description;
use time::OffsetDateTime;

use crate::emitter::LogEmitter;
use crate::level::{level_char, level_of};
use crate::proto::LogEntry;

/// Writes the logging subsystem's own errors without going through any
/// other emitter.
pub struct EmergentEmitter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl EmergentEmitter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        EmergentEmitter {
            out: Mutex::new(out),
        }
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(io::stderr()))
    }
}

impl LogEmitter for EmergentEmitter {
    fn emit_log_entry(&self, entry: &LogEntry) {
        let mut line = String::from("LOGE:");
        line.push(level_char(level_of(entry)));
        line.push_str(&format_timestamp(entry.nano_ts));
        line.push(' ');
        if !entry.location.is_empty() {
            line.push_str(base_name(&entry.location));
            line.push(' ');
        }
        line.push_str(&entry.message);
        line.push_str("\r\n");
        #[allow(clippy::expect_used)]
        let mut out = self.out.lock().expect("lock poisoned");
        let _ = out.write_all(line.as_bytes());
    }
}

/// "MMDD HH:MM:SS.ffffff" in UTC, glog style.
pub(crate) fn format_timestamp(nano_ts: i64) -> String {
    let format = format_description!(
        "[month][day] [hour]:[minute]:[second].[subsecond digits:6]"
    );
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nano_ts))
        .ok()
        .and_then(|t| t.format(format).ok())
        .unwrap_or_default()
}

/// Final path component of a "file:line" location.
pub(crate) fn base_name(location: &str) -> &str {
    match location.rsplit_once('/') {
        Some((_, base)) => base,
        None => location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::level::Level;

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

    #[test]
    fn test_line_format() {
        let buf = SharedBuf::default();
        let emitter = EmergentEmitter::new(Box::new(buf.clone()));
        emitter.emit_log_entry(&LogEntry {
            nano_ts: 1_700_000_000_000_000_000,
            level: Level::Error as i32,
            location: "src/server/hub.rs:42".to_string(),
            message: "Overrun 30 bytes of records".to_string(),
            ..Default::default()
        });
        let line = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(line.starts_with("LOGE:E"), "line: {line}");
        assert!(line.contains("hub.rs:42 "), "line: {line}");
        assert!(line.contains("Overrun 30 bytes of records"), "line: {line}");
        assert!(line.ends_with("\r\n"), "line: {line}");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("a/b/c.rs:1"), "c.rs:1");
        assert_eq!(base_name("c.rs:1"), "c.rs:1");
    }
}
