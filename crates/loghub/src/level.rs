// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::proto::{log_entry, LogEntry};

pub use log_entry::Level;

#[derive(Debug, thiserror::Error)]
#[error("unknown level: {0}")]
pub struct UnknownLevel(pub String);

/// Parses a human friendly level string to a log level.
pub fn parse_level(s: &str) -> Result<Level, UnknownLevel> {
    match s.to_lowercase().as_str() {
        "" | "no" | "none" => Ok(Level::None),
        "i" | "info" => Ok(Level::Info),
        "w" | "warn" | "warning" => Ok(Level::Warning),
        "e" | "err" | "error" => Ok(Level::Error),
        "c" | "crit" | "critical" => Ok(Level::Critical),
        "f" | "fatal" => Ok(Level::Fatal),
        _ => Err(UnknownLevel(s.to_string())),
    }
}

/// Typed level of an entry; unknown wire values map to NONE.
pub fn level_of(entry: &LogEntry) -> Level {
    Level::try_from(entry.level).unwrap_or(Level::None)
}

/// Single-character tag used by line-oriented output.
pub fn level_char(level: Level) -> char {
    match level {
        Level::None => ' ',
        Level::Info => 'I',
        Level::Warning => 'W',
        Level::Error => 'E',
        Level::Critical => 'C',
        Level::Fatal => 'F',
    }
}
