//! # Filter Planner
//!
//! Turns raw `filters[field]=value` parameters into predicates, keeping only
//! the fields a model explicitly declares as filterable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::Record;

/// How a configured filter compares values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Equality match
    Exact,
    /// Case-insensitive substring match
    Partial,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Exact => "exact",
            FilterType::Partial => "partial",
        }
    }
}

/// A filter declared on a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDef {
    pub field: String,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
}

impl FilterDef {
    pub fn new(field: impl Into<String>, filter_type: FilterType) -> Self {
        Self {
            field: field.into(),
            filter_type,
        }
    }

    pub fn exact(field: impl Into<String>) -> Self {
        Self::new(field, FilterType::Exact)
    }

    pub fn partial(field: impl Into<String>) -> Self {
        Self::new(field, FilterType::Partial)
    }
}

/// One applied filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterPredicate {
    pub field: String,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub value: String,
}

impl FilterPredicate {
    /// Check if a record satisfies this predicate.
    ///
    /// Records that do not expose the field, or hold null, never match.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.read(&self.field).and_then(|v| v.as_text()) else {
            return false;
        };

        match self.filter_type {
            FilterType::Exact => actual == self.value,
            FilterType::Partial => actual
                .to_lowercase()
                .contains(&self.value.to_lowercase()),
        }
    }
}

/// Build predicates for every raw parameter that names a configured filter.
///
/// Predicates come out in configuration order. Parameters for fields that
/// are not configured are dropped so clients cannot probe arbitrary columns.
pub fn plan_filters(
    raw: &BTreeMap<String, String>,
    configured: &[FilterDef],
) -> Vec<FilterPredicate> {
    configured
        .iter()
        .filter_map(|def| {
            raw.get(&def.field).map(|value| FilterPredicate {
                field: def.field.clone(),
                filter_type: def.filter_type,
                value: value.clone(),
            })
        })
        .collect()
}

/// Check a record against a conjunction of predicates
pub fn matches_all(predicates: &[FilterPredicate], record: &Record) -> bool {
    predicates.iter().all(|p| p.matches(record))
}
