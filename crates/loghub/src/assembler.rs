// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reassembles completed spans from a stream of per-entry events, for
//! backends that want spans rather than logs.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ids;
use crate::proto::{trace, LogEntry, Span};

/// Maintains partial spans keyed by their "trace/span" id string.
///
/// SpanStart and SpanEnd for a given span id are assumed to arrive in order
/// from a single producer; `add_entry` itself is safe to call from many
/// threads.
#[derive(Default)]
pub struct SpanAssembler {
    spans: Mutex<HashMap<String, Span>>,
}

impl SpanAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one entry. Returns the completed span when `entry` carries a
    /// SpanEnd event for a known span; entries without trace context are
    /// ignored, and regular entries for unknown spans are dropped.
    pub fn add_entry(&self, entry: &LogEntry) -> Option<Span> {
        let trace = entry.trace.as_ref()?;
        let id = ids::id_string(trace.span_context.as_ref());
        if id.is_empty() {
            return None;
        }
        match &trace.event {
            Some(trace::Event::SpanStart(event)) => {
                self.span_start(id, entry, event);
                None
            }
            Some(trace::Event::SpanEnd(_)) => self.span_end(&id, entry),
            None => {
                self.regular_log(&id, entry);
                None
            }
        }
    }

    fn span_start(&self, id: String, entry: &LogEntry, event: &trace::SpanStart) {
        let span = Span {
            context: entry.trace.as_ref().and_then(|t| t.span_context.clone()),
            name: event.name.clone(),
            kind: event.kind,
            start_ns: entry.nano_ts,
            duration: 0,
            attributes: entry.attributes.clone(),
            links: event.links.clone(),
            logs: vec![entry.clone()],
        };
        #[allow(clippy::expect_used)]
        self.spans.lock().expect("lock poisoned").insert(id, span);
    }

    fn span_end(&self, id: &str, entry: &LogEntry) -> Option<Span> {
        #[allow(clippy::expect_used)]
        let mut span = self.spans.lock().expect("lock poisoned").remove(id)?;
        span.logs.push(entry.clone());
        span.duration = entry.nano_ts - span.start_ns;
        Some(span)
    }

    fn regular_log(&self, id: &str, entry: &LogEntry) {
        #[allow(clippy::expect_used)]
        let mut spans = self.spans.lock().expect("lock poisoned");
        if let Some(span) = spans.get_mut(id) {
            span.logs.push(entry.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{SpanContext, Trace};

    fn context() -> SpanContext {
        SpanContext {
            trace_id: (1u8..17).collect(),
            span_id: 9,
        }
    }

    fn entry_at(nano_ts: i64, event: Option<trace::Event>) -> LogEntry {
        LogEntry {
            nano_ts,
            trace: Some(Trace {
                span_context: Some(context()),
                event,
            }),
            ..Default::default()
        }
    }

    fn span_start_at(nano_ts: i64) -> LogEntry {
        entry_at(
            nano_ts,
            Some(trace::Event::SpanStart(trace::SpanStart {
                name: "op".to_string(),
                kind: 0,
                links: Vec::new(),
            })),
        )
    }

    #[test]
    fn test_assembles_span_with_interleaved_logs() {
        let assembler = SpanAssembler::new();
        assert!(assembler.add_entry(&span_start_at(100)).is_none());
        for ts in [110, 120, 130] {
            assert!(assembler.add_entry(&entry_at(ts, None)).is_none());
        }
        let span = assembler
            .add_entry(&entry_at(150, Some(trace::Event::SpanEnd(trace::SpanEnd {}))))
            .expect("completed span");
        assert_eq!(span.name, "op");
        assert_eq!(span.logs.len(), 5);
        assert_eq!(span.start_ns, 100);
        assert_eq!(span.duration, 50);
    }

    #[test]
    fn test_ignores_entries_without_context() {
        let assembler = SpanAssembler::new();
        assert!(assembler.add_entry(&LogEntry::default()).is_none());
        let no_span_id = LogEntry {
            trace: Some(Trace {
                span_context: Some(SpanContext {
                    trace_id: (1u8..17).collect(),
                    span_id: 0,
                }),
                event: None,
            }),
            ..Default::default()
        };
        assert!(assembler.add_entry(&no_span_id).is_none());
    }

    #[test]
    fn test_drops_events_for_unknown_spans() {
        let assembler = SpanAssembler::new();
        assert!(assembler.add_entry(&entry_at(10, None)).is_none());
        assert!(assembler
            .add_entry(&entry_at(20, Some(trace::Event::SpanEnd(trace::SpanEnd {}))))
            .is_none());
    }
}
