//! The collection accessor: create, read, update and delete against one collection.
//!
//! A [`CollectionAccessor`] owns a backend bound to one collection and turns each call into
//! exactly one store-level request, after checking that every mapping argument has the
//! required shape. Invalid arguments never reach the store.
//!
//! # Example
//!
//! ```ignore
//! use crudlayer::{prelude::*, memory::InMemoryCollection};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> AccessorResult<()> {
//!     let accessor = CollectionAccessor::connect(InMemoryCollection::builder("AAC", "animals")).await?;
//!
//!     assert!(accessor.create(doc! { "name": "Rex", "animal_type": "Dog" }).await?);
//!     let dogs = accessor.read(doc! { "animal_type": "Dog" }).await?;
//!     let modified = accessor.update(doc! { "name": "Rex" }, doc! { "outcome_type": "Adoption" }).await?;
//!     let removed = accessor.delete(doc! { "name": "Rex" }).await?;
//!
//!     accessor.shutdown().await
//! }
//! ```

use bson::{Bson, Document};
use log::{debug, error, info, warn};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Instant;

use crate::{
    backend::{self, CollectionBackend, CollectionBackendBuilder, Namespace, UpdateOutcome},
    document::{Emptiness, expect_mapping, from_document, to_bson},
    error::{AccessorError, AccessorResult},
};

/// Data-access object bound to a single collection of a document store.
///
/// The accessor is an owned value: acquire it with [`CollectionAccessor::connect`] (or wrap
/// an existing backend with [`CollectionAccessor::new`]), share it by reference, and release
/// it with [`CollectionAccessor::shutdown`]. [`CollectionAccessor::scoped`] does both around
/// a closure.
///
/// All operations take `&self`; concurrent callers share the backend, which is responsible
/// for its own synchronization.
#[derive(Debug)]
pub struct CollectionAccessor<B: CollectionBackend> {
    backend: B,
}

impl<B: CollectionBackend> CollectionAccessor<B> {
    /// Wraps an already constructed backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Builds a backend and wraps it.
    ///
    /// # Errors
    ///
    /// Propagates the builder's error when the store is unreachable or the credentials
    /// are rejected. There is no retry.
    pub async fn connect<T>(builder: T) -> AccessorResult<Self>
    where
        T: CollectionBackendBuilder<Backend = B>,
    {
        let started_at = Instant::now();

        match builder.build().await {
            Ok(backend) => {
                info!(
                    "event=accessor_connect status=ok namespace={} duration_ms={}",
                    backend.namespace(),
                    started_at.elapsed().as_millis()
                );
                Ok(Self::new(backend))
            }
            Err(err) => {
                error!(
                    "event=accessor_connect status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Connects, runs `f` with the accessor, then shuts the accessor down.
    ///
    /// The accessor is shut down whether or not `f` succeeds. An error from `f` takes
    /// precedence over an error from the shutdown.
    ///
    /// ```ignore
    /// let names = CollectionAccessor::scoped(builder, async |animals| {
    ///     animals.create(doc! { "name": "Rex" }).await?;
    ///     animals.read(doc! {}).await
    /// })
    /// .await?;
    /// ```
    pub async fn scoped<T, F, R>(builder: T, f: F) -> AccessorResult<R>
    where
        T: CollectionBackendBuilder<Backend = B>,
        F: AsyncFnOnce(&CollectionAccessor<B>) -> AccessorResult<R>,
    {
        let accessor = Self::connect(builder).await?;
        let result = f(&accessor).await;
        let shutdown = accessor.shutdown().await;

        let value = result?;
        shutdown?;

        Ok(value)
    }

    /// The database and collection this accessor operates on.
    pub fn namespace(&self) -> &Namespace {
        self.backend.namespace()
    }

    /// Returns a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Inserts `document` as a new record.
    ///
    /// Returns whether the store acknowledged the write.
    ///
    /// # Errors
    ///
    /// Returns [`AccessorError::InvalidArgument`] if `document` is not a non-empty mapping.
    /// Store failures are propagated unmodified.
    pub async fn create(&self, document: impl Into<Bson>) -> AccessorResult<bool> {
        let document = self.check("create", "document", document.into(), Emptiness::Rejected)?;
        let started_at = Instant::now();

        let outcome = self
            .backend
            .insert_one(document)
            .await
            .inspect_err(|err| self.failed("create", err))?;

        debug!(
            "event=accessor_create status=ok namespace={} acknowledged={} duration_ms={}",
            self.namespace(),
            outcome.acknowledged,
            started_at.elapsed().as_millis()
        );

        Ok(outcome.acknowledged)
    }

    /// Serializes `value` and inserts it like [`CollectionAccessor::create`].
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `value` cannot be represented as BSON, and
    /// [`AccessorError::InvalidArgument`] if it does not serialize to a non-empty mapping.
    pub async fn create_from<T: Serialize>(&self, value: &T) -> AccessorResult<bool> {
        self.create(to_bson(value)?).await
    }

    /// Retrieves every document matching `query`.
    ///
    /// An empty mapping matches every document. Results are returned in store order, which
    /// is not guaranteed to be stable between calls.
    ///
    /// # Errors
    ///
    /// Returns [`AccessorError::InvalidArgument`] if `query` is not a mapping.
    pub async fn read(&self, query: impl Into<Bson>) -> AccessorResult<Vec<Document>> {
        let query = self.check("read", "query", query.into(), Emptiness::Allowed)?;
        let started_at = Instant::now();

        let documents = self
            .backend
            .find(query)
            .await
            .inspect_err(|err| self.failed("read", err))?;

        debug!(
            "event=accessor_read status=ok namespace={} count={} duration_ms={}",
            self.namespace(),
            documents.len(),
            started_at.elapsed().as_millis()
        );

        Ok(documents)
    }

    /// Retrieves every document matching `query` and deserializes each into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`CollectionAccessor::read`], plus a serialization error for the first
    /// document that does not have the shape of `T`.
    pub async fn read_into<T: DeserializeOwned>(&self, query: impl Into<Bson>) -> AccessorResult<Vec<T>> {
        self.read(query)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Sets the fields of `changes` on every document matching `query`.
    ///
    /// Returns the number of documents actually modified. Matched documents whose fields
    /// already hold the target values are not counted; use
    /// [`CollectionAccessor::update_counts`] to also get the matched count.
    ///
    /// # Errors
    ///
    /// Returns [`AccessorError::InvalidArgument`] if either argument is not a non-empty mapping.
    pub async fn update(&self, query: impl Into<Bson>, changes: impl Into<Bson>) -> AccessorResult<u64> {
        Ok(self.update_counts(query, changes).await?.modified)
    }

    /// Like [`CollectionAccessor::update`] but returns both matched and modified counts.
    pub async fn update_counts(
        &self,
        query: impl Into<Bson>,
        changes: impl Into<Bson>,
    ) -> AccessorResult<UpdateOutcome> {
        let query = self.check("update", "query", query.into(), Emptiness::Rejected)?;
        let changes = self.check("update", "changes", changes.into(), Emptiness::Rejected)?;
        let started_at = Instant::now();

        let outcome = self
            .backend
            .update_many(query, changes)
            .await
            .inspect_err(|err| self.failed("update", err))?;

        debug!(
            "event=accessor_update status=ok namespace={} matched={} modified={} duration_ms={}",
            self.namespace(),
            outcome.matched,
            outcome.modified,
            started_at.elapsed().as_millis()
        );

        Ok(outcome)
    }

    /// Removes every document matching `query` and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`AccessorError::InvalidArgument`] if `query` is not a non-empty mapping.
    pub async fn delete(&self, query: impl Into<Bson>) -> AccessorResult<u64> {
        let query = self.check("delete", "query", query.into(), Emptiness::Rejected)?;
        let started_at = Instant::now();

        let deleted = self
            .backend
            .delete_many(query)
            .await
            .inspect_err(|err| self.failed("delete", err))?;

        debug!(
            "event=accessor_delete status=ok namespace={} deleted={} duration_ms={}",
            self.namespace(),
            deleted,
            started_at.elapsed().as_millis()
        );

        Ok(deleted)
    }

    /// Releases the accessor and its connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to shut down cleanly.
    pub async fn shutdown(self) -> AccessorResult<()> {
        let namespace = self.namespace().clone();

        self.backend.shutdown().await?;
        info!("event=accessor_shutdown status=ok namespace={namespace}");

        Ok(())
    }

    fn check(&self, operation: &str, argument: &str, value: Bson, emptiness: Emptiness) -> AccessorResult<Document> {
        expect_mapping(argument, value, emptiness).inspect_err(|err| {
            warn!(
                "event=accessor_{operation} status=rejected namespace={} error={}",
                self.namespace(),
                err
            )
        })
    }

    fn failed(&self, operation: &str, err: &AccessorError) {
        error!(
            "event=accessor_{operation} status=error namespace={} error={}",
            self.namespace(),
            err
        );
    }
}

impl<B: CollectionBackend + 'static> CollectionAccessor<B> {
    /// Erases the backend type so accessors over different backends share one type.
    pub fn into_dyn(self) -> CollectionAccessor<Box<dyn backend::DynCollectionBackend>> {
        CollectionAccessor::new(Box::new(self.backend))
    }
}

impl CollectionAccessor<Box<dyn backend::DynCollectionBackend>> {
    /// Returns the backend as `B` if that is its concrete type.
    pub fn downcast_backend<B: CollectionBackend + 'static>(&self) -> Option<&B> {
        backend::DynCollectionBackend::as_any(&*self.backend).downcast_ref::<B>()
    }
}
