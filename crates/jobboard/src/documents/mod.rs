//! Document collaborator contract.
//!
//! The core only needs keyed reads, merge/replace writes, equality queries, insert-only creates,
//! and a conditional update that fails distinguishably when its precondition does not hold.
//! Any structured backend offering those operations can sit behind [`DocumentStore`].

mod memory;

pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ErrorKind;

/// Field bag persisted for one document.
pub type Fields = Map<String, Value>;

/// Logical collections used by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Applications,
}

impl Collection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Applications => "applications",
        }
    }
}

/// A stored document and its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }
}

/// Whether a `put` replaces the stored fields or merges into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    Merge,
}

/// Conjunction of field equalities, used as a query filter and as a write precondition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<(String, Value)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| fields.get(field) == Some(expected))
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DocumentError>;

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), DocumentError>;

    /// Insert-only write; fails with [`DocumentError::AlreadyExists`] when the key is taken.
    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), DocumentError>;

    async fn query(
        &self,
        collection: Collection,
        predicate: &Predicate,
    ) -> Result<Vec<Document>, DocumentError>;

    /// Merge `fields` into an existing document only if `condition` holds for the stored copy.
    /// The check and the write are a single atomic step.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
        condition: &Predicate,
    ) -> Result<Document, DocumentError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document not found")]
    NotFound,
    #[error("document already exists")]
    AlreadyExists,
    #[error("write precondition not satisfied")]
    ConditionFailed,
    #[error("malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::AlreadyExists | DocumentError::ConditionFailed => ErrorKind::Conflict,
            DocumentError::NotFound
            | DocumentError::Malformed { .. }
            | DocumentError::Unavailable(_) => ErrorKind::BackendFailure,
        }
    }
}
