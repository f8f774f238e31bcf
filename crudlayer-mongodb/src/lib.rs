//! MongoDB backend implementation for crudlayer.
//!
//! This crate provides a MongoDB-based implementation of the `CollectionBackend` trait on
//! top of the official async driver. Every accessor request maps to one driver call:
//! `insert_one`, `find`, `update_many` with `$set`, and `delete_many`.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! crudlayer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The builder takes either a connection string or a [`ConnectionConfig`](crudlayer_core::config::ConnectionConfig).
//! Building pings the server, so an unreachable server or rejected credentials fail at
//! construction rather than on the first request.
//!
//! # Example
//!
//! ```ignore
//! use crudlayer::{prelude::*, mongodb::MongoDbCollectionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> AccessorResult<()> {
//!     let config = ConnectionConfig::builder("AAC", "animals")
//!         .credentials("aacuser", "password")
//!         .build()?;
//!
//!     let animals = CollectionAccessor::connect(MongoDbCollectionBuilder::from_config(&config)?).await?;
//!     animals.shutdown().await
//! }
//! ```

pub mod store;

pub use store::{MongoDbCollection, MongoDbCollectionBuilder};
