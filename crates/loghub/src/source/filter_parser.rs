// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parses command-line filter expressions into [`Filters`].
//!
//! Accepted forms:
//! - `since=<nanos|RFC3339>` / `before=<nanos|RFC3339>`
//! - `level=<name>` (also `l=`, `lv=`)
//! - `location=<substr>` (also `loc=`; a leading `!` or `~` negates)
//! - `span-events=no` (also `event=`, `se=`, `ev=`; empty value works too)
//! - `a:<name><op><value>` attribute comparison
//! - any other bare string matches the message

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::filter::{
    parse_attribute_filter, FilterParseError, Filters, LevelFilter, LocationFilter,
    LogEntryFilter, MessageFilter, SpanEventFilter, TimeRangeFilter,
};
use crate::level::{parse_level, Level};

/// Parses a list of filter expressions; all of them must match.
pub fn parse_filters<S: AsRef<str>>(exprs: &[S]) -> Result<Filters, FilterParseError> {
    let mut filters = Vec::with_capacity(exprs.len());
    for expr in exprs {
        if let Some(filter) = parse_filter(expr.as_ref())? {
            filters.push(filter);
        }
    }
    Ok(Filters(filters))
}

/// Parses one filter expression; returns `None` for expressions that are
/// valid but match everything.
pub fn parse_filter(expr: &str) -> Result<Option<Box<dyn LogEntryFilter>>, FilterParseError> {
    if let Some(rest) = expr.strip_prefix("a:") {
        return Ok(Some(Box::new(parse_attribute_filter(rest)?)));
    }

    let Some((key, val)) = expr.split_once('=') else {
        if expr.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Box::new(MessageFilter {
            contains: expr.to_string(),
        })));
    };

    match key.to_lowercase().as_str() {
        "since" => Ok(Some(Box::new(TimeRangeFilter {
            since: Some(parse_time(val)?),
            before: None,
        }))),
        "before" => Ok(Some(Box::new(TimeRangeFilter {
            since: None,
            before: Some(parse_time(val)?),
        }))),
        "l" | "lv" | "level" => {
            let level = parse_level(val)?;
            if level == Level::None {
                return Ok(None);
            }
            Ok(Some(Box::new(LevelFilter::at_least(level))))
        }
        "location" | "loc" => {
            if val.is_empty() {
                return Ok(None);
            }
            let filter = if let Some(negated) =
                val.strip_prefix('!').or_else(|| val.strip_prefix('~'))
            {
                LocationFilter {
                    not_contains: vec![negated.to_string()],
                    ..Default::default()
                }
            } else {
                LocationFilter {
                    contains_any: vec![val.to_string()],
                    ..Default::default()
                }
            };
            Ok(Some(Box::new(filter)))
        }
        "span-events" | "span-event" | "event" | "se" | "ev" => {
            match val.to_lowercase().as_str() {
                "" | "no" | "none" => Ok(Some(Box::new(SpanEventFilter { exclude: true }))),
                _ => Ok(None),
            }
        }
        _ => Err(FilterParseError::UnknownFilter(expr.to_string())),
    }
}

fn parse_time(s: &str) -> Result<i64, FilterParseError> {
    if let Ok(nanos) = s.parse::<i64>() {
        return Ok(nanos);
    }
    OffsetDateTime::parse(s, &Rfc3339)
        .map(|t| t.unix_timestamp_nanos() as i64)
        .map_err(|_| FilterParseError::InvalidTime(s.to_string()))
}
