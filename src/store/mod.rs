//! Document store capability
//!
//! The engines run against any backend that can do per-document reads and
//! writes, atomic multi-document batches, equality queries, and a
//! serializable read-modify-write transaction. [`MemoryStore`] is the
//! in-process implementation used by tests and the demo binary.

pub mod collections;
pub mod memory;

pub use collections::{
    mapping_for, AttributeField, AttributeMapping, ALL_MAPPINGS, COLLECTION_COMPANIES,
    COLLECTION_CONTACTS, COLLECTION_DISTRIBUTION_CAPABILITIES,
    COLLECTION_DISTRIBUTION_QUALITY_BUCKETS, COLLECTION_INTRODUCTIONS,
};
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A stored document; always a JSON object
pub type Document = Value;

/// Errors reported by a store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("backend failure: {0}")]
    Backend(String),

    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One field mutation inside an update
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Replace the field with the given value
    Set(Value),
    /// Add each element not already present, preserving existing order
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each element
    ArrayRemove(Vec<Value>),
    /// Remove the field
    Delete,
}

/// One write inside a batch
#[derive(Debug, Clone)]
pub enum BatchOp {
    Set { data: Document, merge: bool },
    Update { fields: Vec<(String, FieldOp)> },
    Delete,
}

/// An ordered set of writes committed atomically
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub(crate) ops: Vec<(String, String, BatchOp)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch::default()
    }

    pub fn set(&mut self, collection: &str, id: &str, data: Document, merge: bool) -> &mut Self {
        self.ops
            .push((collection.to_string(), id.to_string(), BatchOp::Set { data, merge }));
        self
    }

    pub fn update(
        &mut self,
        collection: &str,
        id: &str,
        fields: Vec<(String, FieldOp)>,
    ) -> &mut Self {
        self.ops
            .push((collection.to_string(), id.to_string(), BatchOp::Update { fields }));
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops
            .push((collection.to_string(), id.to_string(), BatchOp::Delete));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Read-modify-write handle inside [`DocumentStore::run_transaction`]
///
/// All operations observe and mutate one serializable view; the whole
/// closure commits or nothing does.
pub trait Transaction {
    fn get(&mut self, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    fn set(&mut self, collection: &str, id: &str, doc: Document, merge: bool) -> StoreResult<()>;
    fn update(
        &mut self,
        collection: &str,
        id: &str,
        fields: Vec<(String, FieldOp)>,
    ) -> StoreResult<()>;
}

/// Transaction body; returns an arbitrary JSON value to the caller
pub type TxnFn = Box<dyn FnOnce(&mut dyn Transaction) -> StoreResult<Value> + Send>;

/// Backend capability consumed by every engine
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` when absent
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Fetch many documents positionally; missing ids yield `None`
    async fn get_many(&self, collection: &str, ids: &[String]) -> StoreResult<Vec<Option<Document>>>;

    /// Write one document; `merge` folds top-level fields into an existing doc
    async fn set(&self, collection: &str, id: &str, doc: Document, merge: bool) -> StoreResult<()>;

    /// Apply field mutations to an existing document
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Vec<(String, FieldOp)>,
    ) -> StoreResult<()>;

    /// Remove a document; deleting a missing document succeeds
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Apply every write in the batch atomically
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Run a serializable read-modify-write closure
    async fn run_transaction(&self, f: TxnFn) -> StoreResult<Value>;

    /// Equality query on a top-level field, in insertion order
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>>;

    /// Capped id scan in insertion order
    async fn list_ids(&self, collection: &str, limit: usize) -> StoreResult<Vec<String>>;
}
