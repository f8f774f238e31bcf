//! Core of the crudlayer project: a data-access object bound to one collection of a
//! document store.
//!
//! This crate provides:
//!
//! - **Collection accessor** ([`accessor`]) - create, read, update and delete against one collection
//! - **Backend abstraction** ([`backend`]) - The store seam implemented by the in-memory and MongoDB backends
//! - **Configuration** ([`config`]) - Externally supplied connection settings
//! - **Argument validation** ([`document`]) - Mapping checks and typed conversions
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use crudlayer::{prelude::*, memory::InMemoryCollection};
//! use bson::doc;
//!
//! let accessor = CollectionAccessor::connect(InMemoryCollection::builder("AAC", "animals")).await?;
//! accessor.create(doc! { "name": "Rex", "breed": "Beagle" }).await?;
//! ```

pub mod accessor;
pub mod backend;
pub mod config;
pub mod document;
pub mod error;
