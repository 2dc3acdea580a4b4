// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The span-aware logger.
//!
//! A [`Logger`] is an immutable bundle of (emitter, optional span, attribute
//! map). Forking a child copies the attribute map, so concurrent siblings
//! never observe each other's attributes. Spans open with
//! [`Logger::start_span`] (emitting a SpanStart entry) and close with
//! [`Logger::end_span`] (emitting SpanEnd and handing back the parent).
//!
//! Source locations are captured with `#[track_caller]`, so every shortcut
//! records the application call site, not a frame inside this crate.

use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::emitter::{default_logger, LogEmitter};
use crate::ids;
use crate::level::Level;
use crate::proto::{link, span, trace, Link, LogEntry, SpanContext, Trace, Value};

/// A single named attribute.
pub struct Attribute {
    pub name: String,
    pub value: Value,
}

impl Attribute {
    fn new(name: impl Into<String>, value: crate::proto::value::Value) -> Self {
        Attribute {
            name: name.into(),
            value: Value { value: Some(value) },
        }
    }

    pub fn bool(name: impl Into<String>, val: bool) -> Self {
        Self::new(name, crate::proto::value::Value::BoolValue(val))
    }

    pub fn int(name: impl Into<String>, val: i64) -> Self {
        Self::new(name, crate::proto::value::Value::IntValue(val))
    }

    pub fn float(name: impl Into<String>, val: f32) -> Self {
        Self::new(name, crate::proto::value::Value::FloatValue(val))
    }

    pub fn double(name: impl Into<String>, val: f64) -> Self {
        Self::new(name, crate::proto::value::Value::DoubleValue(val))
    }

    pub fn str(name: impl Into<String>, val: impl Into<String>) -> Self {
        Self::new(name, crate::proto::value::Value::StrValue(val.into()))
    }

    /// Attaches an arbitrary object serialized as a JSON string.
    ///
    /// Panics when serialization fails; silently dropping attribute payloads
    /// is not an option.
    pub fn json<T: serde::Serialize>(name: impl Into<String>, val: &T) -> Self {
        let name = name.into();
        match serde_json::to_string(val) {
            Ok(encoded) => Self::new(name, crate::proto::value::Value::Json(encoded)),
            Err(err) => panic!("encode JSON attribute {name}: {err}"),
        }
    }

    /// Attaches an encoded protobuf message.
    pub fn proto<M: prost::Message>(name: impl Into<String>, msg: &M) -> Self {
        Self::new(name, crate::proto::value::Value::Proto(msg.encode_to_vec()))
    }
}

/// Producer-side description of a span.
#[derive(Clone, Debug)]
pub struct SpanInfo {
    pub name: String,
    pub kind: span::Kind,
    pub context: Option<SpanContext>,
    pub parent: Option<Link>,
    pub links: Vec<Link>,
}

impl Default for SpanInfo {
    fn default() -> Self {
        SpanInfo {
            name: String::new(),
            kind: span::Kind::Unspecified,
            context: None,
            parent: None,
            links: Vec::new(),
        }
    }
}

impl SpanInfo {
    pub fn named(name: impl Into<String>) -> Self {
        SpanInfo {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builds span identity from string encoded IDs, e.g. extracted from
    /// wire headers. Invalid input yields an empty `SpanInfo` rather than
    /// an error; propagation is best-effort.
    pub fn from_ids(trace_id: &str, span_id: &str, parent_span_id: &str) -> Self {
        let mut info = SpanInfo::default();
        if trace_id.is_empty() {
            return info;
        }
        let Ok(trace_id) = ids::parse_trace_id(trace_id) else {
            return info;
        };
        let mut context = SpanContext {
            trace_id: trace_id.clone(),
            span_id: 0,
        };
        if !span_id.is_empty() {
            let Ok(span_id) = ids::parse_span_id(span_id) else {
                return info;
            };
            context.span_id = span_id;
        }
        if !parent_span_id.is_empty() {
            let Ok(parent_span_id) = ids::parse_span_id(parent_span_id) else {
                return info;
            };
            info.parent = Some(Link {
                span_context: Some(SpanContext {
                    trace_id,
                    span_id: parent_span_id,
                }),
                r#type: link::Type::ChildOf as i32,
                attributes: HashMap::new(),
            });
        }
        info.context = Some(context);
        info
    }

    pub fn trace_id(&self) -> String {
        ids::trace_id_string(self.context.as_ref())
    }

    pub fn span_id(&self) -> String {
        ids::span_id_string(self.context.as_ref())
    }

    /// Combined links including the parent link, parent first.
    pub fn all_links(&self) -> Vec<Link> {
        let mut links = Vec::with_capacity(self.links.len() + 1);
        if let Some(parent) = &self.parent {
            links.push(parent.clone());
        }
        links.extend(self.links.iter().cloned());
        links
    }
}

impl fmt::Display for SpanInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, ids::id_string(self.context.as_ref()))
    }
}

struct LoggerInner {
    emitter: Arc<dyn LogEmitter>,
    parent: Option<Logger>,
    span: Option<SpanInfo>,
    attrs: HashMap<String, Value>,
}

/// The API for emitting logs. Cheap to clone; all state is shared and
/// immutable, so a logger is safe to use from many threads.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    /// Creates a root logger over an emitter.
    pub fn root(emitter: Arc<dyn LogEmitter>) -> Logger {
        Logger {
            inner: Arc::new(LoggerInner {
                emitter,
                parent: None,
                span: None,
                attrs: HashMap::new(),
            }),
        }
    }

    /// Creates a child logger carrying a copy of this logger's attributes
    /// extended with `attrs`. The parent is never mutated.
    pub fn child(&self, attrs: impl IntoIterator<Item = Attribute>) -> Logger {
        Logger {
            inner: Arc::new(self.child_inner(attrs)),
        }
    }

    fn child_inner(&self, attrs: impl IntoIterator<Item = Attribute>) -> LoggerInner {
        let mut copied = self.inner.attrs.clone();
        for attr in attrs {
            copied.insert(attr.name, attr.value);
        }
        LoggerInner {
            emitter: Arc::clone(&self.inner.emitter),
            parent: Some(self.clone()),
            span: self.inner.span.clone(),
            attrs: copied,
        }
    }

    /// Current span information, or an empty one outside any span.
    pub fn span_info(&self) -> SpanInfo {
        self.inner.span.clone().unwrap_or_default()
    }

    /// Starts a new span and returns the logger bound to it.
    ///
    /// Identity rules: a missing parent link defaults to the enclosing
    /// logger's span; a missing trace ID is adopted from the parent link or
    /// freshly generated; a zero span ID is generated from the wall clock.
    /// Emits a SpanStart entry at level NONE.
    #[track_caller]
    pub fn start_span(
        &self,
        info: SpanInfo,
        attrs: impl IntoIterator<Item = Attribute>,
    ) -> Logger {
        let mut inner = self.child_inner(attrs);
        let mut span = info;
        if span.parent.is_none() {
            if let Some(enclosing) = &self.inner.span {
                span.parent = Some(Link {
                    span_context: enclosing.context.clone(),
                    r#type: link::Type::ChildOf as i32,
                    attributes: HashMap::new(),
                });
            }
        }
        let mut context = span.context.take().unwrap_or_default();
        if !ids::is_trace_id_valid(&context.trace_id) {
            context.trace_id = match &span.parent {
                Some(parent) => parent
                    .span_context
                    .as_ref()
                    .map(|ctx| ctx.trace_id.clone())
                    .unwrap_or_default(),
                None => ids::new_trace_id(),
            };
        }
        if context.span_id == 0 {
            context.span_id = ids::new_span_id();
        }
        span.context = Some(context);
        inner.span = Some(span);
        let logger = Logger {
            inner: Arc::new(inner),
        };

        let mut entry = logger.make_entry();
        if let Some(span) = &logger.inner.span {
            if let Some(trace) = entry.trace.as_mut() {
                trace.event = Some(trace::Event::SpanStart(trace::SpanStart {
                    name: span.name.clone(),
                    kind: span.kind as i32,
                    links: span.all_links(),
                }));
            }
            entry.message = format!("SPAN_START {span}");
        }
        logger.emit(entry);
        logger
    }

    /// Ends the current span and returns the parent logger, or the default
    /// logger for a parentless span. A logger without a span is returned
    /// unchanged.
    #[track_caller]
    pub fn end_span(&self) -> Logger {
        let Some(span) = &self.inner.span else {
            return self.clone();
        };
        let mut entry = self.make_entry();
        if let Some(trace) = entry.trace.as_mut() {
            trace.event = Some(trace::Event::SpanEnd(trace::SpanEnd {}));
        }
        entry.message = format!("SPAN_END {span}");
        self.emit(entry);
        match &self.inner.parent {
            Some(parent) => parent.clone(),
            None => default_logger(),
        }
    }

    /// Starts building a single printable entry.
    #[track_caller]
    pub fn printer(&self) -> LogPrinter {
        LogPrinter {
            logger: self.clone(),
            entry: self.make_entry(),
            err: None,
        }
    }

    #[track_caller]
    pub fn with(&self, attrs: impl IntoIterator<Item = Attribute>) -> LogPrinter {
        self.printer().with(attrs)
    }

    #[track_caller]
    pub fn info(&self) -> LogPrinter {
        self.printer().info()
    }

    #[track_caller]
    pub fn warning<E: fmt::Display + ?Sized>(&self, err: &E) -> LogPrinter {
        self.printer().warning(err)
    }

    #[track_caller]
    pub fn error<E: fmt::Display + ?Sized>(&self, err: &E) -> LogPrinter {
        self.printer().error(err)
    }

    #[track_caller]
    pub fn critical<E: fmt::Display + ?Sized>(&self, err: &E) -> LogPrinter {
        self.printer().critical(err)
    }

    #[track_caller]
    pub fn fatal<E: fmt::Display + ?Sized>(&self, err: &E) -> LogPrinter {
        self.printer().fatal(err)
    }

    #[track_caller]
    pub fn print(&self, message: impl Into<String>) {
        self.printer().print(message)
    }

    #[track_caller]
    fn make_entry(&self) -> LogEntry {
        let location = Location::caller();
        let mut entry = LogEntry {
            nano_ts: crate::now_nanos(),
            location: format!("{}:{}", location.file(), location.line()),
            attributes: self.inner.attrs.clone(),
            ..Default::default()
        };
        if let Some(span) = &self.inner.span {
            entry.trace = Some(Trace {
                span_context: span.context.clone(),
                event: None,
            });
        }
        entry
    }

    fn emit(&self, entry: LogEntry) {
        let fatal = entry.level == Level::Fatal as i32;
        self.inner.emitter.emit_log_entry(&entry);
        if fatal {
            // Intentionally hard: nothing downstream gets a chance to flush.
            std::process::exit(1);
        }
    }

    #[cfg(test)]
    pub(crate) fn same_as(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl LogEmitter for Logger {
    fn emit_log_entry(&self, entry: &LogEntry) {
        self.inner.emitter.emit_log_entry(entry);
    }
}

/// Prepares and prints a single log entry.
pub struct LogPrinter {
    logger: Logger,
    entry: LogEntry,
    err: Option<String>,
}

impl LogPrinter {
    pub fn with(mut self, attrs: impl IntoIterator<Item = Attribute>) -> Self {
        for attr in attrs {
            self.entry.attributes.insert(attr.name, attr.value);
        }
        self
    }

    pub fn info(mut self) -> Self {
        self.entry.level = Level::Info as i32;
        self
    }

    pub fn warning<E: fmt::Display + ?Sized>(self, err: &E) -> Self {
        self.set_error(Level::Warning, err)
    }

    pub fn error<E: fmt::Display + ?Sized>(self, err: &E) -> Self {
        self.set_error(Level::Error, err)
    }

    pub fn critical<E: fmt::Display + ?Sized>(self, err: &E) -> Self {
        self.set_error(Level::Critical, err)
    }

    /// A FATAL print terminates the process right after the entry is handed
    /// to the sink.
    pub fn fatal<E: fmt::Display + ?Sized>(self, err: &E) -> Self {
        self.set_error(Level::Fatal, err)
    }

    pub fn print(mut self, message: impl Into<String>) {
        self.entry.message = message.into();
        self.logger.emit(self.entry);
    }

    /// Prints the error set by warning/error/critical/fatal with a prefix.
    /// Does nothing when no error is set.
    pub fn print_err(self, prefix: &str) {
        if let Some(text) = self.err.clone() {
            self.print(format!("{prefix}{text}"));
        }
    }

    fn set_error<E: fmt::Display + ?Sized>(mut self, level: Level, err: &E) -> Self {
        self.entry.level = level as i32;
        let text = err.to_string();
        self.entry.attributes.insert(
            "error".to_string(),
            Value {
                value: Some(crate::proto::value::Value::StrValue(text.clone())),
            },
        );
        self.err = Some(text);
        self
    }
}

/// An explicit context value carrying the current logger, the moral
/// equivalent of attaching a logger to a request context.
#[derive(Clone, Default)]
pub struct LogContext {
    logger: Option<Logger>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The attached logger, or the process-wide default.
    pub fn logger(&self) -> Logger {
        self.logger.clone().unwrap_or_else(default_logger)
    }

    pub fn with_logger(&self, logger: Logger) -> LogContext {
        LogContext {
            logger: Some(logger),
        }
    }
}

/// Returns the logger attached to `ctx`, else the process-wide default.
pub fn use_logger(ctx: &LogContext) -> Logger {
    ctx.logger()
}

/// Starts a new span from the current context and returns both the derived
/// context and the span's logger.
#[track_caller]
pub fn start_span(
    ctx: &LogContext,
    name: &str,
    attrs: impl IntoIterator<Item = Attribute>,
) -> (LogContext, Logger) {
    let logger = use_logger(ctx).start_span(SpanInfo::named(name), attrs);
    (ctx.with_logger(logger.clone()), logger)
}
