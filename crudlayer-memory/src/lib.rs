//! In-memory collection backend for crudlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `CollectionBackend`
//! trait. It behaves like a single MongoDB collection for the requests the accessor makes,
//! which makes it suited to development and tests that should not need a running server.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent requests through an async-aware RwLock
//! - **MongoDB filter subset** - Equality, comparison, `$in`/`$nin`, `$exists` and the logical combinators
//! - **`$set` updates** - Dotted paths, modified counts and an immutable `_id`
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
//!     animals.create(doc! { "name": "Rex", "animal_type": "Dog" }).await?;
//!     assert_eq!(animals.read(doc! { "animal_type": "Dog" }).await?.len(), 1);
//!
//!     animals.shutdown().await
//! }
//! ```

pub mod error;
pub mod store;
mod evaluator;
mod update;

pub use error::{MemoryStoreError, MemoryStoreResult};
pub use store::{InMemoryCollection, InMemoryCollectionBuilder};
