//! Errors raised by the in-memory store.
//!
//! These mirror the server-side failures a real document store reports. They reach callers
//! as the source of [`AccessorError::Backend`](crudlayer_core::error::AccessorError::Backend).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// A document with the same `_id` is already stored.
    #[error("E11000 duplicate key error collection: {namespace} dup key: {{ _id: {id} }}")]
    DuplicateKey { namespace: String, id: String },
    /// The filter used an operator the in-memory evaluator does not know.
    #[error("unknown operator: {0}")]
    UnsupportedOperator(String),
    /// The filter is structurally invalid, e.g. `$and` without an array.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    /// The update would change a document's `_id`.
    #[error("Performing an update on the path '{0}' would modify the immutable field '_id'")]
    ImmutableField(String),
    /// The update names a field that cannot be set.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
}

pub type MemoryStoreResult<T> = Result<T, MemoryStoreError>;
