//! # In-Memory Record Store
//!
//! A [`RecordStore`] kept in process memory. It behaves like a small
//! relational table: declared columns, sequential ids, presence
//! validations, automatic `created_at`/`updated_at` stamps and
//! insertion-ordered scans.

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde_json::Value;
use tracing::trace;

use super::filter::matches_all;
use super::record::{Attributes, FieldValue, Record, Relation};
use super::registry::ModelConfiguration;
use super::store::{RecordStore, Scope, StoreError, StoreResult, ValidationErrors};

/// Message used for failed presence validations
pub const BLANK_MESSAGE: &str = "can't be blank";

type DestroyGuard = Box<dyn Fn(&Record) -> Option<String> + Send + Sync>;

#[derive(Debug, Default)]
struct Table {
    records: Vec<Record>,
    next_id: u64,
}

impl Table {
    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

/// In-memory store for one model
pub struct MemoryStore {
    table: RwLock<Table>,
    columns: Vec<String>,
    to_many: Vec<String>,
    required: Vec<String>,
    timestamps: bool,
    destroy_guard: Option<DestroyGuard>,
    offline: RwLock<bool>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("columns", &self.columns)
            .field("to_many", &self.to_many)
            .field("required", &self.required)
            .field("timestamps", &self.timestamps)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::default()),
            columns: Vec::new(),
            to_many: Vec::new(),
            required: Vec::new(),
            timestamps: false,
            destroy_guard: None,
            offline: RwLock::new(false),
        }
    }

    /// A store whose columns are the model's exposed attributes and whose
    /// to-many associations are its plural relationships
    pub fn for_model(config: &ModelConfiguration) -> Self {
        Self::new()
            .columns(config.attribute_names())
            .has_many(config.to_many_relationships())
    }

    /// Declare the table's columns. A column a write leaves unset is stored
    /// as null.
    pub fn columns<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declare to-many associations; new records start with no links
    pub fn has_many<I, S>(mut self, relationships: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to_many.extend(relationships.into_iter().map(Into::into));
        self
    }

    /// Require fields to be present and non-blank on every write
    pub fn require<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Stamp `created_at` / `updated_at` on writes
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Refuse to destroy records for which `guard` returns a reason
    pub fn with_destroy_guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&Record) -> Option<String> + Send + Sync + 'static,
    {
        self.destroy_guard = Some(Box::new(guard));
        self
    }

    /// Simulate losing the backing store; every call fails with
    /// [`StoreError::Unavailable`] while offline
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut flag) = self.offline.write() {
            *flag = offline;
        }
    }

    /// Store a record as-is, bypassing validation. Numeric ids advance the
    /// id sequence.
    pub fn insert(&self, record: Record) -> StoreResult<Record> {
        let mut table = self.write()?;
        if let Ok(numeric) = record.id().parse::<u64>() {
            table.next_id = table.next_id.max(numeric);
        }
        match table.position(record.id()) {
            Some(idx) => table.records[idx] = record.clone(),
            None => table.records.push(record.clone()),
        }
        Ok(record)
    }

    /// Store a validated seed row given as a JSON object. An `id` member is
    /// kept, otherwise the next id is assigned.
    pub fn seed(&self, row: &serde_json::Map<String, Value>) -> StoreResult<Record> {
        let mut fields = row.clone();
        let given = match fields.remove("id") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let draft = Record::from_json_object(String::new(), &fields);
        self.validate(&draft).map_err(StoreError::Invalid)?;

        let id = match given {
            Some(id) => id,
            None => self.write()?.allocate_id(),
        };
        let mut record = Record::from_json_object(id, &fields);
        self.fill_defaults(&mut record);
        self.stamp(&mut record, true);
        self.insert(record)
    }

    /// Set an association on a stored record
    pub fn link(&self, id: &str, name: &str, relation: Relation) -> StoreResult<()> {
        let mut table = self.write()?;
        let idx = table
            .position(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        table.records[idx].set_relation(name, relation);
        Ok(())
    }

    /// Number of stored records
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn check_online(&self) -> StoreResult<()> {
        let offline = self
            .offline
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        if *offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Table>> {
        self.check_online()?;
        self.table
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Table>> {
        self.check_online()?;
        self.table
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn validate(&self, record: &Record) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for field in &self.required {
            let blank = record.read(field).map(FieldValue::is_blank).unwrap_or(true);
            if blank {
                errors.add(field.clone(), BLANK_MESSAGE);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Unset columns become null, unlinked to-many associations empty
    fn fill_defaults(&self, record: &mut Record) {
        for column in &self.columns {
            if record.read(column).is_none() {
                record.set(column.clone(), FieldValue::Null);
            }
        }
        for name in &self.to_many {
            if record.relation(name).is_none() {
                record.set_relation(name.clone(), Relation::Many(Vec::new()));
            }
        }
    }

    fn stamp(&self, record: &mut Record, created: bool) {
        if !self.timestamps {
            return;
        }
        let now = Utc::now();
        if created {
            record.set("created_at", FieldValue::Timestamp(now));
        }
        record.set("updated_at", FieldValue::Timestamp(now));
    }
}

impl RecordStore for MemoryStore {
    fn find(&self, id: &str, _includes: &[String]) -> StoreResult<Option<Record>> {
        let table = self.read()?;
        Ok(table.position(id).map(|idx| table.records[idx].clone()))
    }

    fn load(&self, scope: &Scope) -> StoreResult<Vec<Record>> {
        let table = self.read()?;
        let matching = table
            .records
            .iter()
            .filter(|r| matches_all(&scope.predicates, r))
            .cloned();

        let records: Vec<Record> = match scope.window {
            Some(window) => matching.skip(window.offset).take(window.limit).collect(),
            None => matching.collect(),
        };
        trace!(count = records.len(), "records loaded");
        Ok(records)
    }

    fn count(&self, scope: &Scope) -> StoreResult<usize> {
        let table = self.read()?;
        Ok(table
            .records
            .iter()
            .filter(|r| matches_all(&scope.predicates, r))
            .count())
    }

    fn create(&self, attributes: Attributes) -> StoreResult<Record> {
        let mut table = self.write()?;

        // Validate before taking an id so failed creates leave no gap
        let mut record = Record::new(String::new());
        for (field, value) in attributes {
            record.set(field, value);
        }
        self.validate(&record).map_err(StoreError::Invalid)?;

        let id = table.allocate_id();
        let mut stored = Record::new(id);
        for (field, value) in record.fields() {
            stored.set(field.clone(), value.clone());
        }
        self.fill_defaults(&mut stored);
        self.stamp(&mut stored, true);
        table.records.push(stored.clone());
        Ok(stored)
    }

    fn update(&self, record: &Record, attributes: Attributes) -> StoreResult<Record> {
        let mut table = self.write()?;
        let idx = table
            .position(record.id())
            .ok_or_else(|| StoreError::NotFound {
                id: record.id().to_string(),
            })?;

        let mut updated = table.records[idx].clone();
        for (field, value) in attributes {
            updated.set(field, value);
        }
        self.validate(&updated).map_err(StoreError::Invalid)?;

        self.stamp(&mut updated, false);
        table.records[idx] = updated.clone();
        Ok(updated)
    }

    fn destroy(&self, record: &Record) -> StoreResult<()> {
        if let Some(reason) = self.destroy_guard.as_ref().and_then(|guard| guard(record)) {
            return Err(StoreError::NotDestroyed { reason });
        }

        let mut table = self.write()?;
        let idx = table.position(record.id()).ok_or_else(|| StoreError::NotFound {
            id: record.id().to_string(),
        })?;
        table.records.remove(idx);
        Ok(())
    }
}
