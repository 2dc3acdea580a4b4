// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, LazyLock, RwLock};

use crate::emergent::EmergentEmitter;
use crate::logger::Logger;
use crate::proto::LogEntry;

/// A sink for log entries.
///
/// Implementations must be callable from many producer threads at once and
/// must not retain the entry beyond the call without copying it.
pub trait LogEmitter: Send + Sync {
    fn emit_log_entry(&self, entry: &LogEntry);
}

/// The closure form of [`LogEmitter`].
pub struct EmitterFn<F>(pub F);

impl<F> LogEmitter for EmitterFn<F>
where
    F: Fn(&LogEntry) + Send + Sync,
{
    fn emit_log_entry(&self, entry: &LogEntry) {
        (self.0)(entry)
    }
}

/// Discards log entries silently.
pub struct DummyEmitter;

impl LogEmitter for DummyEmitter {
    fn emit_log_entry(&self, _entry: &LogEntry) {}
}

/// Forwards each entry to every inner emitter in order.
///
/// A failing emitter never short-circuits the rest; emitters report their
/// own failures through the emergent logger.
#[derive(Default)]
pub struct MultiEmitter {
    emitters: Vec<Arc<dyn LogEmitter>>,
}

impl MultiEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, emitter: Arc<dyn LogEmitter>) {
        self.emitters.push(emitter);
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// Unwraps a single-emitter chain to avoid a needless indirection,
    /// otherwise returns the chain itself.
    pub fn into_emitter(mut self) -> Arc<dyn LogEmitter> {
        if self.emitters.len() == 1 {
            #[allow(clippy::expect_used)]
            return self.emitters.pop().expect("len checked");
        }
        Arc::new(self)
    }
}

impl From<Vec<Arc<dyn LogEmitter>>> for MultiEmitter {
    fn from(emitters: Vec<Arc<dyn LogEmitter>>) -> Self {
        MultiEmitter { emitters }
    }
}

impl LogEmitter for MultiEmitter {
    fn emit_log_entry(&self, entry: &LogEntry) {
        for emitter in &self.emitters {
            emitter.emit_log_entry(entry);
        }
    }
}

static DEFAULT_LOGGER: LazyLock<RwLock<Logger>> =
    LazyLock::new(|| RwLock::new(Logger::root(Arc::new(DummyEmitter))));

static EMERGENT_LOGGER: LazyLock<Logger> =
    LazyLock::new(|| Logger::root(Arc::new(EmergentEmitter::stderr())));

/// Returns the process-wide default logger.
pub fn default_logger() -> Logger {
    #[allow(clippy::expect_used)]
    let logger = DEFAULT_LOGGER.read().expect("lock poisoned");
    logger.clone()
}

/// Returns the emergent logger, wired to stderr only.
///
/// Used exclusively by the logging subsystem for its own errors so a broken
/// sink can never feed entries back into itself.
pub fn emergent() -> Logger {
    EMERGENT_LOGGER.clone()
}

/// Replaces the process-wide default logger.
pub fn setup(emitter: Arc<dyn LogEmitter>) -> Logger {
    let logger = Logger::root(emitter);
    #[allow(clippy::expect_used)]
    let mut slot = DEFAULT_LOGGER.write().expect("lock poisoned");
    *slot = logger.clone();
    logger
}

/// Creates a root logger detached from the process-wide default.
pub fn root(emitter: Arc<dyn LogEmitter>) -> Logger {
    Logger::root(emitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_multi_emitter_forwards_in_order() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut multi = MultiEmitter::new();
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            multi.push(Arc::new(EmitterFn(move |entry: &LogEntry| {
                seen.lock().unwrap().push(format!("{tag}:{}", entry.message));
            })));
        }
        multi.emit_log_entry(&LogEntry {
            message: "x".to_string(),
            ..Default::default()
        });
        assert_eq!(*seen.lock().unwrap(), vec!["a:x", "b:x"]);
    }

    #[test]
    fn test_single_emitter_chain_unwraps() {
        let mut multi = MultiEmitter::new();
        multi.push(Arc::new(DummyEmitter));
        assert_eq!(multi.len(), 1);
        let _ = multi.into_emitter();
    }
}
