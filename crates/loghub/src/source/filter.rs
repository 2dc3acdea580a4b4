// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Composable log entry predicates with typed attribute comparisons.

use regex::Regex;

use crate::ids;
use crate::level::{level_of, Level};
use crate::proto::{value, LogEntry, Value};

/// A predicate over log entries.
pub trait LogEntryFilter: Send + Sync {
    fn matches(&self, entry: &LogEntry) -> bool;
}

/// The closure form of [`LogEntryFilter`].
pub struct FilterFn<F>(pub F);

impl<F> LogEntryFilter for FilterFn<F>
where
    F: Fn(&LogEntry) -> bool + Send + Sync,
{
    fn matches(&self, entry: &LogEntry) -> bool {
        (self.0)(entry)
    }
}

/// A conjunction of filters; the empty list matches everything.
#[derive(Default)]
pub struct Filters(pub Vec<Box<dyn LogEntryFilter>>);

impl LogEntryFilter for Filters {
    fn matches(&self, entry: &LogEntry) -> bool {
        self.0.iter().all(|filter| filter.matches(entry))
    }
}

/// Filters by time range: `since` is inclusive, `before` exclusive, both in
/// nanoseconds and both optional.
#[derive(Default)]
pub struct TimeRangeFilter {
    pub since: Option<i64>,
    pub before: Option<i64>,
}

impl LogEntryFilter for TimeRangeFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(since) = self.since {
            if entry.nano_ts < since {
                return false;
            }
        }
        if let Some(before) = self.before {
            if entry.nano_ts >= before {
                return false;
            }
        }
        true
    }
}

/// Filters by severity: entry.level >= min, and < max when max is not NONE.
pub struct LevelFilter {
    pub min_level: Level,
    pub max_level: Level,
}

impl LevelFilter {
    pub fn at_least(level: Level) -> Self {
        LevelFilter {
            min_level: level,
            max_level: Level::None,
        }
    }
}

impl LogEntryFilter for LevelFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        let level = level_of(entry);
        if level < self.min_level {
            return false;
        }
        if self.max_level != Level::None && level >= self.max_level {
            return false;
        }
        true
    }
}

/// Matches partial hex strings against the display form of trace/span ids.
#[derive(Default)]
pub struct TraceSpanFilter {
    pub trace_id_contains: String,
    pub span_id_contains: String,
}

impl LogEntryFilter for TraceSpanFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        let context = entry.trace.as_ref().and_then(|t| t.span_context.as_ref());
        if !self.trace_id_contains.is_empty()
            && !ids::trace_id_string(context).contains(&self.trace_id_contains)
        {
            return false;
        }
        if !self.span_id_contains.is_empty()
            && !ids::span_id_string(context).contains(&self.span_id_contains)
        {
            return false;
        }
        true
    }
}

/// Filters by substrings of the source location.
#[derive(Default)]
pub struct LocationFilter {
    /// Matches when at least one substring occurs.
    pub contains_any: Vec<String>,
    /// All substrings must occur.
    pub contains_all: Vec<String>,
    /// No substring may occur.
    pub not_contains: Vec<String>,
}

impl LogEntryFilter for LocationFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        let location = &entry.location;
        if !self.contains_any.is_empty()
            && !self.contains_any.iter().any(|s| location.contains(s))
        {
            return false;
        }
        if !self.contains_all.iter().all(|s| location.contains(s)) {
            return false;
        }
        if self.not_contains.iter().any(|s| location.contains(s)) {
            return false;
        }
        true
    }
}

/// Excludes entries that carry SpanStart/SpanEnd events.
pub struct SpanEventFilter {
    pub exclude: bool,
}

impl LogEntryFilter for SpanEventFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        if self.exclude {
            if let Some(trace) = &entry.trace {
                if trace.event.is_some() {
                    return false;
                }
            }
        }
        true
    }
}

/// Matches a substring of the message.
pub struct MessageFilter {
    pub contains: String,
}

impl LogEntryFilter for MessageFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        entry.message.contains(&self.contains)
    }
}

type ValueMatcher = Box<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// Matches one named attribute with a type-polymorphic comparison.
pub struct AttributeFilter {
    pub name: String,
    matcher: ValueMatcher,
}

impl LogEntryFilter for AttributeFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        (self.matcher)(entry.attributes.get(&self.name))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FilterParseError {
    #[error("invalid attribute filter: {0}")]
    InvalidAttributeFilter(String),

    #[error("invalid regular expression {0:?}: {1}")]
    InvalidRegex(String, regex::Error),

    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error(transparent)]
    UnknownLevel(#[from] crate::level::UnknownLevel),

    #[error("unknown filter: {0}")]
    UnknownFilter(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn compare<T: PartialOrd + PartialEq>(self, v1: T, v2: T) -> bool {
        match self {
            Op::Eq => v1 == v2,
            Op::Ne => v1 != v2,
            Op::Lt => v1 < v2,
            Op::Le => v1 <= v2,
            Op::Gt => v1 > v2,
            Op::Ge => v1 >= v2,
        }
    }
}

/// The comparison value parsed into every numeric interpretation it allows.
/// `true`/`false` parse as booleans; a `0x` prefix parses as hex unsigned,
/// a `u` prefix as decimal unsigned; everything else tries float and int.
struct ParsedValue {
    raw: String,
    bool_val: Option<bool>,
    float_val: Option<f64>,
    uint_val: Option<u64>,
    int_val: Option<i64>,
}

impl ParsedValue {
    fn parse(raw: &str) -> Self {
        let mut parsed = ParsedValue {
            raw: raw.to_string(),
            bool_val: None,
            float_val: None,
            uint_val: None,
            int_val: None,
        };
        match raw.to_lowercase().as_str() {
            "true" => {
                parsed.bool_val = Some(true);
                return parsed;
            }
            "false" => {
                parsed.bool_val = Some(false);
                return parsed;
            }
            _ => {}
        }
        if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            parsed.uint_val = u64::from_str_radix(hex, 16).ok();
        } else if let Some(dec) = raw.strip_prefix('u').or_else(|| raw.strip_prefix('U')) {
            parsed.uint_val = dec.parse().ok();
        } else {
            parsed.float_val = raw.parse().ok();
            parsed.int_val = raw.parse().ok();
        }
        parsed
    }

    fn float_compare(&self, val: f64, op: Op) -> bool {
        if let Some(f) = self.float_val {
            return op.compare(val, f);
        }
        if let Some(i) = self.int_val {
            return op.compare(val, i as f64);
        }
        if let Some(u) = self.uint_val {
            return op.compare(val, u as f64);
        }
        false
    }

    fn int_compare(&self, val: i64, op: Op) -> bool {
        if let Some(i) = self.int_val {
            return op.compare(val, i);
        }
        if let Some(u) = self.uint_val {
            // Unsigned comparison reinterprets the attribute's bits.
            return op.compare(val as u64, u);
        }
        if let Some(f) = self.float_val {
            return op.compare(val as f64, f);
        }
        false
    }
}

fn ordinal_matcher(raw: &str, op: Op) -> ValueMatcher {
    let parsed = ParsedValue::parse(raw);
    let equal_cmp = matches!(op, Op::Eq | Op::Ne);
    Box::new(move |value| {
        let Some(inner) = value.and_then(|v| v.value.as_ref()) else {
            // A missing attribute behaves as the empty string, but only for
            // equality comparisons.
            if equal_cmp {
                return op.compare("", parsed.raw.as_str());
            }
            return false;
        };
        match inner {
            value::Value::BoolValue(b) => match (parsed.bool_val, op) {
                (Some(expected), Op::Eq) => *b == expected,
                (Some(expected), Op::Ne) => *b != expected,
                _ => false,
            },
            value::Value::DoubleValue(d) => parsed.float_compare(*d, op),
            value::Value::FloatValue(f) => parsed.float_compare(f64::from(*f), op),
            value::Value::IntValue(i) => parsed.int_compare(*i, op),
            value::Value::StrValue(s) => op.compare(s.as_str(), parsed.raw.as_str()),
            value::Value::Json(_) | value::Value::Proto(_) => false,
        }
    })
}

fn str_matcher(pred: impl Fn(&str) -> bool + Send + Sync + 'static) -> ValueMatcher {
    Box::new(move |value| match value.and_then(|v| v.value.as_ref()) {
        None => pred(""),
        Some(value::Value::StrValue(s)) => pred(s),
        Some(_) => false,
    })
}

/// Parses `<name><op><value>` with operators `= != < <= > >= : ~`, where
/// `:` is substring match and `~` a regular expression.
pub fn parse_attribute_filter(s: &str) -> Result<AttributeFilter, FilterParseError> {
    #[allow(clippy::expect_used)]
    let pattern = Regex::new("^([^:=~<>!]+)(!=|<=|>=|=|:|~|<|>)(.*)$").expect("static regex");
    let captures = pattern
        .captures(s)
        .ok_or_else(|| FilterParseError::InvalidAttributeFilter(s.to_string()))?;
    let name = captures[1].to_string();
    let op = captures[2].to_string();
    let val = captures[3].to_string();
    let matcher = match op.as_str() {
        "=" => ordinal_matcher(&val, Op::Eq),
        "!=" => ordinal_matcher(&val, Op::Ne),
        "<" => ordinal_matcher(&val, Op::Lt),
        "<=" => ordinal_matcher(&val, Op::Le),
        ">" => ordinal_matcher(&val, Op::Gt),
        ">=" => ordinal_matcher(&val, Op::Ge),
        ":" => str_matcher(move |s| s.contains(&val)),
        "~" => {
            let regex = Regex::new(&val)
                .map_err(|err| FilterParseError::InvalidRegex(val.clone(), err))?;
            str_matcher(move |s| regex.is_match(s))
        }
        other => return Err(FilterParseError::InvalidOperator(other.to_string())),
    };
    Ok(AttributeFilter { name, matcher })
}
