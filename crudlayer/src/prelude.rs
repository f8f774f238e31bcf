//! Convenient re-exports of commonly used types from crudlayer.
//!
//! ```ignore
//! use crudlayer::prelude::*;
//! ```
//!
//! [`DynCollectionBackend`](crate::backend::DynCollectionBackend) is not re-exported here. It
//! shares its method names with [`CollectionBackend`], so importing both makes method calls
//! on a backend ambiguous.

pub use crudlayer_core::{
    accessor::CollectionAccessor,
    backend::{CollectionBackend, CollectionBackendBuilder, InsertOutcome, Namespace, UpdateOutcome},
    config::{ConnectionConfig, ConnectionConfigBuilder},
    error::{AccessorError, AccessorResult},
};
