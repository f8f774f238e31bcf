//! Storage backend abstraction for a single collection.
//!
//! A backend is bound to one collection of one database and exposes exactly the four
//! store-level requests the accessor needs: insert-one, find, update-many and delete-many.
//! Each request is atomic on its own; nothing spans multiple requests.
//!
//! # Traits
//!
//! - [`CollectionBackend`]: The core trait for storage backends
//! - [`DynCollectionBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`CollectionBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use crudlayer::backend::CollectionBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! backend.insert_one(doc! { "name": "Alice", "age": 30 }).await?;
//! let found = backend.find(doc! { "name": "Alice" }).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{any::Any, fmt};

use crate::error::AccessorResult;

/// The database and collection a backend is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Result of an insert-one request.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    /// Whether the store acknowledged the write.
    pub acknowledged: bool,
    /// The `_id` of the inserted document, assigned by the store if it was absent.
    pub inserted_id: Bson,
}

/// Result of an update-many request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Documents selected by the filter.
    pub matched: u64,
    /// Documents whose content actually changed.
    pub modified: u64,
}

/// Abstract interface for a collection in a document store.
///
/// # Thread Safety
///
/// Implementations must be safe to share between async tasks. Whether concurrent requests
/// are serialized, pooled or run in parallel is up to the implementation.
///
/// # Error Handling
///
/// Store failures are returned as [`AccessorError::Backend`](crate::error::AccessorError::Backend)
/// wrapping the store's own error. Backends do not validate arguments; the accessor has
/// already done so.
#[async_trait]
pub trait CollectionBackend: Send + Sync + fmt::Debug {
    /// The database and collection this backend reads and writes.
    fn namespace(&self) -> &Namespace;

    /// Inserts a single document.
    ///
    /// If the document has no `_id` field the store assigns one.
    async fn insert_one(&self, document: Document) -> AccessorResult<InsertOutcome>;

    /// Returns every document matching `filter`, in store order.
    ///
    /// An empty filter matches every document.
    async fn find(&self, filter: Document) -> AccessorResult<Vec<Document>>;

    /// Sets the fields of `changes` on every document matching `filter`.
    ///
    /// Fields not named in `changes` are left untouched. A matched document only counts as
    /// modified if at least one of its values changed.
    async fn update_many(&self, filter: Document, changes: Document) -> AccessorResult<UpdateOutcome>;

    /// Removes every document matching `filter` and returns how many were removed.
    async fn delete_many(&self, filter: Document) -> AccessorResult<u64>;

    /// Releases the backend's connection.
    ///
    /// The default implementation is a no-op, but backends with external connections
    /// should override this.
    async fn shutdown(self) -> AccessorResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> CollectionBackend for &B
where
    B: CollectionBackend,
{
    fn namespace(&self) -> &Namespace {
        CollectionBackend::namespace(*self)
    }

    async fn insert_one(&self, document: Document) -> AccessorResult<InsertOutcome> {
        CollectionBackend::insert_one(*self, document).await
    }

    async fn find(&self, filter: Document) -> AccessorResult<Vec<Document>> {
        CollectionBackend::find(*self, filter).await
    }

    async fn update_many(&self, filter: Document, changes: Document) -> AccessorResult<UpdateOutcome> {
        CollectionBackend::update_many(*self, filter, changes).await
    }

    async fn delete_many(&self, filter: Document) -> AccessorResult<u64> {
        CollectionBackend::delete_many(*self, filter).await
    }
}

/// Object-safe mirror of [`CollectionBackend`] for picking a backend at runtime.
///
/// Every [`CollectionBackend`] implements this trait, and `Box<dyn DynCollectionBackend>`
/// implements [`CollectionBackend`] in turn.
#[async_trait]
pub trait DynCollectionBackend: Send + Sync + fmt::Debug {
    fn namespace(&self) -> &Namespace;
    async fn insert_one(&self, document: Document) -> AccessorResult<InsertOutcome>;
    async fn find(&self, filter: Document) -> AccessorResult<Vec<Document>>;
    async fn update_many(&self, filter: Document, changes: Document) -> AccessorResult<UpdateOutcome>;
    async fn delete_many(&self, filter: Document) -> AccessorResult<u64>;
    async fn shutdown_boxed(self: Box<Self>) -> AccessorResult<()>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<B: CollectionBackend + 'static> DynCollectionBackend for B {
    fn namespace(&self) -> &Namespace {
        CollectionBackend::namespace(self)
    }

    async fn insert_one(&self, document: Document) -> AccessorResult<InsertOutcome> {
        CollectionBackend::insert_one(self, document).await
    }

    async fn find(&self, filter: Document) -> AccessorResult<Vec<Document>> {
        CollectionBackend::find(self, filter).await
    }

    async fn update_many(&self, filter: Document, changes: Document) -> AccessorResult<UpdateOutcome> {
        CollectionBackend::update_many(self, filter, changes).await
    }

    async fn delete_many(&self, filter: Document) -> AccessorResult<u64> {
        CollectionBackend::delete_many(self, filter).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> AccessorResult<()> {
        CollectionBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl CollectionBackend for Box<dyn DynCollectionBackend> {
    fn namespace(&self) -> &Namespace {
        DynCollectionBackend::namespace(&**self)
    }

    async fn insert_one(&self, document: Document) -> AccessorResult<InsertOutcome> {
        DynCollectionBackend::insert_one(&**self, document).await
    }

    async fn find(&self, filter: Document) -> AccessorResult<Vec<Document>> {
        DynCollectionBackend::find(&**self, filter).await
    }

    async fn update_many(&self, filter: Document, changes: Document) -> AccessorResult<UpdateOutcome> {
        DynCollectionBackend::update_many(&**self, filter, changes).await
    }

    async fn delete_many(&self, filter: Document) -> AccessorResult<u64> {
        DynCollectionBackend::delete_many(&**self, filter).await
    }

    async fn shutdown(self) -> AccessorResult<()> {
        DynCollectionBackend::shutdown_boxed(self).await
    }
}

#[async_trait]
pub trait CollectionBackendBuilder {
    type Backend: CollectionBackend;

    async fn build(self) -> AccessorResult<Self::Backend>;
}
