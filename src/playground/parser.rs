//! # Request Parser
//!
//! Parses list query parameters (`filters[field]`, `page[number]`,
//! `page[size]`) and write request bodies (`data.attributes`).

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use super::errors::{PlaygroundError, PlaygroundResult};
use super::pagination::PageParams;
use super::record::{Attributes, FieldValue};

/// Parsed list parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// `filters[field]=value` pairs
    pub filters: BTreeMap<String, String>,
    pub page: PageParams,
}

impl ListParams {
    /// Parse query parameters from a HashMap.
    ///
    /// Unknown keys are ignored. Page values are read leniently: a leading
    /// integer is taken, anything unparseable counts as 0 and is then
    /// clamped by the planner.
    pub fn parse(params: &HashMap<String, String>) -> Self {
        let mut result = ListParams::default();

        for (key, value) in params {
            if let Some(field) = bracketed(key, "filters") {
                result.filters.insert(field.to_string(), value.clone());
                continue;
            }
            match bracketed(key, "page") {
                Some("number") => result.page.number = Some(lenient_int(value)),
                Some("size") => result.page.size = Some(lenient_int(value)),
                _ => {}
            }
        }

        result
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_page(mut self, number: i64, size: i64) -> Self {
        self.page = PageParams {
            number: Some(number),
            size: Some(size),
        };
        self
    }
}

/// `filters[title]` → `title` for prefix `filters`
fn bracketed<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
        .filter(|inner| !inner.is_empty())
}

/// Read a leading integer: `" 12abc"` → 12, `"-3"` → -3, `"abc"` → 0
fn lenient_int(value: &str) -> i64 {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let mut result: i64 = 0;
    for c in digits.chars() {
        let Some(d) = c.to_digit(10) else { break };
        result = result.saturating_mul(10).saturating_add(d as i64);
    }

    if negative {
        -result
    } else {
        result
    }
}

/// Extract `data.attributes` from a write request body
pub fn attributes_of(body: &Value) -> PlaygroundResult<&Map<String, Value>> {
    let data = body
        .get("data")
        .filter(|d| !d.is_null())
        .ok_or_else(|| PlaygroundError::ParameterMissing("data".to_string()))?;

    data.get("attributes")
        .and_then(Value::as_object)
        .ok_or_else(|| PlaygroundError::ParameterMissing("attributes".to_string()))
}

/// Keep only whitelisted attributes. Anything else is dropped silently.
pub fn whitelist(attributes: &Map<String, Value>, allowed: &[String]) -> Attributes {
    attributes
        .iter()
        .filter(|(key, _)| allowed.iter().any(|field| field == *key))
        .map(|(key, value)| (key.clone(), FieldValue::from_json(value)))
        .collect()
}
