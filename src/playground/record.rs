//! # Records
//!
//! The shape a storage collaborator hands to the playground. A record is an
//! explicit field table: the serializer reads fields by name from it and
//! never reflects on backing types.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A single field value as stored by the backing store
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    /// Structured value stored verbatim (arrays, objects)
    Json(Value),
}

impl FieldValue {
    /// Render the value for a JSON:API document.
    ///
    /// Timestamps and dates become ISO-8601 strings, everything else passes
    /// through unchanged.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::Json(v) => v.clone(),
        }
    }

    /// Convert an incoming JSON attribute into a field value
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Json(other.clone()),
        }
    }

    /// Textual form used for filter comparison against query parameters
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) => Some(s.clone()),
            other => match other.to_json() {
                Value::String(s) => Some(s),
                v => Some(v.to_string()),
            },
        }
    }

    /// Whether the value counts as blank for presence validation
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Json(Value::Array(a)) => a.is_empty(),
            FieldValue::Json(Value::Object(o)) => o.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

/// An association as seen from one record
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// To-many association, holding the related ids
    Many(Vec<String>),
    /// To-one association, `None` when nothing is linked
    One(Option<String>),
}

/// Input attributes for a write, already whitelisted
pub type Attributes = BTreeMap<String, FieldValue>;

/// A backing record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    fields: BTreeMap<String, FieldValue>,
    relations: BTreeMap<String, Relation>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    /// Primary identifier in string form
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read a field; `None` means the record does not expose it
    pub fn read(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn set_relation(&mut self, name: impl Into<String>, relation: Relation) {
        self.relations.insert(name.into(), relation);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Build a record from a JSON object, e.g. a seed row
    pub fn from_json_object(id: impl Into<String>, object: &Map<String, Value>) -> Self {
        let mut record = Record::new(id);
        for (key, value) in object {
            record.set(key.clone(), FieldValue::from_json(value));
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_timestamps_render_as_iso8601() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(
            FieldValue::Timestamp(ts).to_json(),
            json!("2024-03-01T12:30:00.000Z")
        );

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(FieldValue::Date(date).to_json(), json!("2024-03-01"));
    }

    #[test]
    fn test_plain_values_pass_through() {
        assert_eq!(FieldValue::Integer(4).to_json(), json!(4));
        assert_eq!(FieldValue::Bool(true).to_json(), json!(true));
        assert_eq!(FieldValue::Null.to_json(), Value::Null);
        assert_eq!(FieldValue::from("x").to_json(), json!("x"));
        assert_eq!(FieldValue::Json(json!([1, 2])).to_json(), json!([1, 2]));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(FieldValue::from_json(&json!(3)), FieldValue::Integer(3));
        assert_eq!(FieldValue::from_json(&json!(1.5)), FieldValue::Float(1.5));
        assert_eq!(FieldValue::from_json(&json!("a")), FieldValue::from("a"));
    }

    #[test]
    fn test_blank() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::from("  ").is_blank());
        assert!(!FieldValue::from("x").is_blank());
        assert!(!FieldValue::Integer(0).is_blank());
    }

    #[test]
    fn test_record_read() {
        let record = Record::new("7").with_field("title", "Soup");
        assert_eq!(record.id(), "7");
        assert_eq!(record.read("title"), Some(&FieldValue::from("Soup")));
        assert_eq!(record.read("missing"), None);
    }
}
