//! Error types and result types for collection accessor operations.
//!
//! The accessor itself raises exactly one kind of error, [`AccessorError::InvalidArgument`],
//! when a mapping argument is missing, empty, or of the wrong shape. Every other failure
//! originates in the backend and is carried through [`AccessorError::Backend`] with the
//! driver's own error as the source.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error raised by a storage driver.
pub type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all possible errors that can occur when interacting with a collection.
#[derive(Error, Debug)]
pub enum AccessorError {
    /// A required mapping argument was not a mapping, or was empty where a
    /// non-empty mapping is required.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The connection configuration is incomplete or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The backend could not be constructed or the store could not be reached.
    #[error("Initialization error: {0}")]
    Initialization(#[source] BoxedError),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error raised by the underlying store, passed through unmodified.
    #[error(transparent)]
    Backend(BoxedError),
}

/// A specialized `Result` type for accessor operations.
pub type AccessorResult<T> = Result<T, AccessorError>;

impl AccessorError {
    /// Wraps a store error without translating it.
    pub fn backend(err: impl Into<BoxedError>) -> Self {
        AccessorError::Backend(err.into())
    }

    /// Wraps an error raised while constructing a backend.
    pub fn initialization(err: impl Into<BoxedError>) -> Self {
        AccessorError::Initialization(err.into())
    }

    /// Whether the accessor rejected an argument before contacting the store.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, AccessorError::InvalidArgument(_))
    }

    /// Returns the store error if this is a backend error and it has type `E`.
    pub fn backend_error<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            AccessorError::Backend(err) | AccessorError::Initialization(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<BsonError> for AccessorError {
    fn from(err: BsonError) -> Self {
        AccessorError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for AccessorError {
    fn from(err: SerdeJsonError) -> Self {
        AccessorError::Serialization(err.to_string())
    }
}
