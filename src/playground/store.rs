//! # Storage Collaborator
//!
//! The interface the dispatcher needs from a record store. Implementations
//! own persistence, validation and id assignment; the playground only
//! plans queries and shapes results.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::filter::FilterPredicate;
use super::record::{Attributes, Record};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One failed validation on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Validation failures reported by a store, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{} {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    // ==================
    // Domain outcomes
    // ==================
    /// The record did not pass validation and was not written
    #[error("Validation failed: {0}")]
    Invalid(ValidationErrors),

    /// The record is gone, e.g. removed between lookup and write
    #[error("No record with id {id}")]
    NotFound { id: String },

    /// The record exists but the store refused to remove it
    #[error("Record could not be destroyed: {reason}")]
    NotDestroyed { reason: String },

    // ==================
    // Infrastructure faults
    // ==================
    /// The store cannot be reached or its state is unusable
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the query itself
    #[error("Query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// Whether this error describes the request rather than the store
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            StoreError::Invalid(_) | StoreError::NotFound { .. } | StoreError::NotDestroyed { .. }
        )
    }
}

/// What a list or show request asks the store for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Conjunctive predicates
    pub predicates: Vec<FilterPredicate>,
    /// Relationships the caller will read; a preloading hint only
    pub includes: Vec<String>,
    /// Offset/limit window; `None` loads every match
    pub window: Option<Window>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn including(mut self, relationships: &[String]) -> Self {
        self.includes = relationships.to_vec();
        self
    }

    pub fn filtered(mut self, predicates: Vec<FilterPredicate>) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn windowed(mut self, offset: usize, limit: usize) -> Self {
        self.window = Some(Window { offset, limit });
        self
    }
}

/// Record store trait backing one model
pub trait RecordStore: Send + Sync {
    /// Find a record by its id as given by the client
    fn find(&self, id: &str, includes: &[String]) -> StoreResult<Option<Record>>;

    /// Load records matching the scope, in a stable order
    fn load(&self, scope: &Scope) -> StoreResult<Vec<Record>>;

    /// Count records matching the scope's predicates; the window is ignored
    fn count(&self, scope: &Scope) -> StoreResult<usize>;

    /// Validate and persist a new record
    fn create(&self, attributes: Attributes) -> StoreResult<Record>;

    /// Validate and apply a partial update. On failure nothing is written;
    /// a record that no longer exists is [`StoreError::NotFound`].
    fn update(&self, record: &Record, attributes: Attributes) -> StoreResult<Record>;

    /// Remove a record. A record that no longer exists is
    /// [`StoreError::NotFound`], a refusal is [`StoreError::NotDestroyed`].
    fn destroy(&self, record: &Record) -> StoreResult<()>;
}
