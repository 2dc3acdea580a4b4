// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Console output: JSON lines, or a compact glog-style line format.
//! The colorized pretty printer is a separate tool; this stays minimal.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::emergent::{base_name, format_timestamp};
use crate::emitter::{emergent, LogEmitter};
use crate::ids;
use crate::level::{level_char, level_of};
use crate::proto::{value, LogEntry};

pub struct ConsoleEmitter {
    out: Mutex<Box<dyn Write + Send>>,
    json: bool,
}

impl ConsoleEmitter {
    pub fn json(out: Box<dyn Write + Send>) -> Self {
        ConsoleEmitter {
            out: Mutex::new(out),
            json: true,
        }
    }

    pub fn compact(out: Box<dyn Write + Send>) -> Self {
        ConsoleEmitter {
            out: Mutex::new(out),
            json: false,
        }
    }

    pub fn json_stdout() -> Self {
        Self::json(Box::new(io::stdout()))
    }

    pub fn compact_stderr() -> Self {
        Self::compact(Box::new(io::stderr()))
    }
}

impl LogEmitter for ConsoleEmitter {
    fn emit_log_entry(&self, entry: &LogEntry) {
        let line = if self.json {
            match serde_json::to_string(entry) {
                Ok(line) => line,
                Err(err) => {
                    emergent().error(&err).print_err("ConsoleEmitter: ");
                    return;
                }
            }
        } else {
            compact_line(entry)
        };
        #[allow(clippy::expect_used)]
        let mut out = self.out.lock().expect("lock poisoned");
        let _ = writeln!(out, "{line}");
    }
}

fn compact_line(entry: &LogEntry) -> String {
    let mut line = String::new();
    line.push(level_char(level_of(entry)));
    line.push_str(&format_timestamp(entry.nano_ts));
    line.push(' ');
    if !entry.location.is_empty() {
        line.push_str(base_name(&entry.location));
        line.push(' ');
    }
    if let Some(trace) = &entry.trace {
        let id = ids::id_string(trace.span_context.as_ref());
        if !id.is_empty() {
            line.push('[');
            line.push_str(&id);
            line.push_str("] ");
        }
    }
    line.push_str(&entry.message);
    let mut names: Vec<&String> = entry.attributes.keys().collect();
    names.sort();
    for name in names {
        if let Some(value) = entry.attributes.get(name) {
            line.push(' ');
            line.push_str(name);
            line.push('=');
            line.push_str(&render_value(value));
        }
    }
    line
}

fn render_value(value: &crate::proto::Value) -> String {
    match &value.value {
        Some(value::Value::BoolValue(v)) => v.to_string(),
        Some(value::Value::IntValue(v)) => v.to_string(),
        Some(value::Value::FloatValue(v)) => v.to_string(),
        Some(value::Value::DoubleValue(v)) => v.to_string(),
        Some(value::Value::StrValue(v)) => v.clone(),
        Some(value::Value::Json(v)) => v.clone(),
        Some(value::Value::Proto(v)) => format!("<{} bytes>", v.len()),
        None => String::new(),
    }
}
