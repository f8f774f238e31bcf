//! In-memory collection backend.
//!
//! This module provides a single collection kept in memory, in insertion order, behind an
//! async-safe read-write lock.

use std::sync::Arc;
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};
use log::debug;

use crudlayer_core::{
    backend::{CollectionBackend, CollectionBackendBuilder, InsertOutcome, Namespace, UpdateOutcome},
    config::ConnectionConfig,
    error::{AccessorError, AccessorResult},
};

use crate::{
    error::MemoryStoreError,
    evaluator::DocumentEvaluator,
    update::apply_set,
};


/// Thread-safe in-memory collection.
///
/// This struct implements the [`CollectionBackend`] trait with the same request semantics
/// as a MongoDB collection: generated `ObjectId` keys, duplicate-key rejection, filter
/// documents and `$set` updates.
///
/// # Thread Safety
///
/// `InMemoryCollection` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying documents. Each request holds the lock for its whole
/// duration, so requests are atomic with respect to each other.
///
/// # Performance
///
/// Every request scans all documents (no indexing).
///
/// # Example
///
/// ```ignore
/// use crudlayer_memory::InMemoryCollection;
/// use crudlayer::backend::CollectionBackend;
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let animals = InMemoryCollection::new("AAC", "animals");
///
///     animals.insert_one(doc! { "name": "Rex", "animal_type": "Dog" }).await?;
///
///     let dogs = animals.find(doc! { "animal_type": "Dog" }).await?;
///     assert_eq!(dogs.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryCollection {
    namespace: Namespace,
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryCollection {
    /// Creates a new empty collection bound to `database.collection`.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::with_documents(Namespace::new(database, collection), vec![])
    }

    /// Creates a builder for constructing an `InMemoryCollection`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use crudlayer_memory::InMemoryCollection;
    ///
    /// let animals = InMemoryCollection::builder("AAC", "animals").build().await?;
    /// ```
    pub fn builder(database: impl Into<String>, collection: impl Into<String>) -> InMemoryCollectionBuilder {
        InMemoryCollectionBuilder::new(database, collection)
    }

    fn with_documents(namespace: Namespace, documents: Vec<Document>) -> Self {
        Self {
            namespace,
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether no documents are stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl CollectionBackend for InMemoryCollection {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    async fn insert_one(&self, mut document: Document) -> AccessorResult<InsertOutcome> {
        let mut documents = self.documents.write().await;

        let inserted_id = match document.get("_id") {
            Some(id) => id.clone(),
            None => {
                // Generated keys go first, as the server does it.
                let id = Bson::ObjectId(ObjectId::new());
                let mut keyed = Document::new();
                keyed.insert("_id", id.clone());

                for (key, value) in document {
                    keyed.insert(key, value);
                }

                document = keyed;
                id
            }
        };

        if documents.iter().any(|stored| stored.get("_id") == Some(&inserted_id)) {
            return Err(AccessorError::backend(MemoryStoreError::DuplicateKey {
                namespace: self.namespace.to_string(),
                id: inserted_id.to_string(),
            }));
        }

        documents.push(document);
        debug!("event=memory_insert_one status=ok namespace={} id={}", self.namespace, inserted_id);

        Ok(InsertOutcome {
            acknowledged: true,
            inserted_id,
        })
    }

    async fn find(&self, filter: Document) -> AccessorResult<Vec<Document>> {
        let documents = self.documents.read().await;

        Ok(
            DocumentEvaluator::filter_documents(documents.iter(), &filter)
                .map_err(AccessorError::backend)?
                .into_iter()
                .cloned()
                .collect()
        )
    }

    async fn update_many(&self, filter: Document, changes: Document) -> AccessorResult<UpdateOutcome> {
        let mut documents = self.documents.write().await;

        // Evaluate every filter before writing anything so a bad filter changes nothing.
        let mut selected = Vec::new();
        for (index, document) in documents.iter().enumerate() {
            if DocumentEvaluator::new(document)
                .matches(&filter)
                .map_err(AccessorError::backend)?
            {
                selected.push(index);
            }
        }

        // Apply to copies and commit only once every selected document accepted the changes.
        let mut updated = Vec::with_capacity(selected.len());
        for index in selected {
            let mut document = documents[index].clone();
            let modified = apply_set(&mut document, &changes).map_err(AccessorError::backend)?;
            updated.push((index, document, modified));
        }

        let mut outcome = UpdateOutcome::default();
        for (index, document, modified) in updated {
            outcome.matched += 1;

            if modified {
                outcome.modified += 1;
                documents[index] = document;
            }
        }

        Ok(outcome)
    }

    async fn delete_many(&self, filter: Document) -> AccessorResult<u64> {
        let mut documents = self.documents.write().await;

        let mut retained = Vec::with_capacity(documents.len());
        let mut deleted = 0;

        for document in documents.iter() {
            if DocumentEvaluator::new(document)
                .matches(&filter)
                .map_err(AccessorError::backend)?
            {
                deleted += 1;
            } else {
                retained.push(document.clone());
            }
        }

        *documents = retained;
        Ok(deleted)
    }
}


/// Builder for constructing [`InMemoryCollection`] instances.
///
/// # Example
///
/// ```ignore
/// use crudlayer_memory::InMemoryCollection;
/// use crudlayer::backend::CollectionBackendBuilder;
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() {
///     let animals = InMemoryCollection::builder("AAC", "animals")
///         .with_documents(vec![doc! { "name": "Rex" }])
///         .build()
///         .await
///         .unwrap();
/// }
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryCollectionBuilder {
    namespace: Namespace,
    documents: Vec<Document>,
}

impl InMemoryCollectionBuilder {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::new(database, collection),
            documents: vec![],
        }
    }

    /// Uses the database and collection of `config`; the connection options are ignored.
    pub fn from_config(config: &ConnectionConfig) -> AccessorResult<Self> {
        config.validate()?;

        Ok(Self::new(config.database.clone(), config.collection.clone()))
    }

    /// Seeds the collection. Documents are inserted in order when the collection is built.
    pub fn with_documents(mut self, documents: impl IntoIterator<Item = Document>) -> Self {
        self.documents.extend(documents);
        self
    }
}

#[async_trait]
impl CollectionBackendBuilder for InMemoryCollectionBuilder {
    type Backend = InMemoryCollection;

    /// Builds the collection and inserts the seed documents.
    ///
    /// Fails if two seed documents share an `_id`.
    async fn build(self) -> AccessorResult<Self::Backend> {
        let collection = InMemoryCollection::with_documents(self.namespace, vec![]);

        for document in self.documents {
            collection.insert_one(document).await?;
        }

        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn insert_assigns_object_id_first() {
        let animals = InMemoryCollection::new("AAC", "animals");

        let outcome = animals.insert_one(doc! { "name": "Rex" }).await.unwrap();
        assert!(outcome.acknowledged);
        assert!(matches!(outcome.inserted_id, Bson::ObjectId(_)));

        let stored = animals.find(doc! {}).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].keys().next().map(String::as_str), Some("_id"));
        assert_eq!(stored[0].get("_id"), Some(&outcome.inserted_id));
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let animals = InMemoryCollection::new("AAC", "animals");

        animals.insert_one(doc! { "_id": "A684346", "name": "Rex" }).await.unwrap();
        let err = animals.insert_one(doc! { "_id": "A684346", "name": "Max" }).await.unwrap_err();

        assert!(matches!(
            err.backend_error::<MemoryStoreError>(),
            Some(MemoryStoreError::DuplicateKey { .. })
        ));
        assert_eq!(animals.len().await, 1);
    }

    #[tokio::test]
    async fn clones_share_documents() {
        let animals = InMemoryCollection::new("AAC", "animals");
        let other = animals.clone();
        assert!(animals.is_empty().await);

        other.insert_one(doc! { "name": "Rex" }).await.unwrap();
        assert_eq!(animals.len().await, 1);
        assert!(!animals.is_empty().await);
    }

    #[tokio::test]
    async fn failed_update_changes_nothing() {
        let animals = InMemoryCollection::builder("AAC", "animals")
            .with_documents(vec![
                doc! { "_id": 1, "name": { "first": "Max" }, "age": 3 },
                doc! { "_id": 2, "name": "Rex", "age": 3 },
            ])
            .build()
            .await
            .unwrap();

        let err = animals
            .update_many(doc! { "age": 3 }, doc! { "name.first": "Bo" })
            .await
            .unwrap_err();

        assert!(matches!(err.backend_error::<MemoryStoreError>(), Some(MemoryStoreError::InvalidUpdate(_))));
        assert_eq!(
            animals.find(doc! { "_id": 1 }).await.unwrap(),
            vec![doc! { "_id": 1, "name": { "first": "Max" }, "age": 3 }]
        );
    }

    #[tokio::test]
    async fn unknown_operator_is_a_backend_error() {
        let animals = InMemoryCollection::builder("AAC", "animals")
            .with_documents(vec![doc! { "name": "Rex" }])
            .build()
            .await
            .unwrap();

        let err = animals.delete_many(doc! { "name": { "$regex": "^R" } }).await.unwrap_err();

        assert_eq!(err.to_string(), "unknown operator: $regex");
        assert_eq!(animals.len().await, 1);
    }

    #[tokio::test]
    async fn builder_from_config_uses_the_namespace() {
        let config = ConnectionConfig::builder("AAC", "animals").build().unwrap();
        let animals = InMemoryCollectionBuilder::from_config(&config).unwrap().build().await.unwrap();

        assert_eq!(animals.namespace(), &Namespace::new("AAC", "animals"));
    }
}
