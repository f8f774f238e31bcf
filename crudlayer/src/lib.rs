//! Main crudlayer crate: a data-access object bound to one collection of a document store.
//!
//! This crate is the primary entry point for users of crudlayer. It re-exports the core
//! types from the sub-crates and gives access to the available storage backends.
//!
//! # Features
//!
//! - **Four operations** - create, read, update and delete on one collection, each a single store request
//! - **Argument checks** - Non-mapping or empty arguments are rejected before the store is contacted
//! - **Injected configuration** - Connection settings come from a [`ConnectionConfig`](config::ConnectionConfig)
//! - **Multiple backends** - In-memory and MongoDB, behind one backend trait
//!
//! # Quick Start
//!
//! ```ignore
//! use crudlayer::{prelude::*, memory::InMemoryCollection};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> AccessorResult<()> {
//!     let animals = CollectionAccessor::connect(InMemoryCollection::builder("AAC", "animals")).await?;
//!
//!     animals.create(doc! { "name": "Rex", "animal_type": "Dog", "age_weeks": 52 }).await?;
//!
//!     let dogs = animals.read(doc! { "animal_type": "Dog" }).await?;
//!     println!("Dogs: {dogs:?}");
//!
//!     let modified = animals
//!         .update(doc! { "name": "Rex" }, doc! { "outcome_type": "Adoption" })
//!         .await?;
//!     assert_eq!(modified, 1);
//!
//!     assert_eq!(animals.delete(doc! { "name": "Rex" }).await?, 1);
//!
//!     animals.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! When the backend is only known at runtime, erase its type with `into_dyn`. The result
//! is a `CollectionAccessor<Box<dyn DynCollectionBackend>>` with the same operations.
//!
//! ```ignore
//! use crudlayer::{prelude::*, backend::DynCollectionBackend, memory::InMemoryCollectionBuilder};
//!
//! async fn open(config: &ConnectionConfig) -> AccessorResult<CollectionAccessor<Box<dyn DynCollectionBackend>>> {
//!     Ok(CollectionAccessor::connect(InMemoryCollectionBuilder::from_config(config)?).await?.into_dyn())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory collection for development and testing
//! - `mongodb` - MongoDB collection (requires the `mongodb` feature)

pub mod prelude;

pub use crudlayer_core::{accessor, backend, config, document, error};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use crudlayer_memory::{InMemoryCollection, InMemoryCollectionBuilder, MemoryStoreError};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use crudlayer_mongodb::{MongoDbCollection, MongoDbCollectionBuilder};
}
