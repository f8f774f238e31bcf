use std::time::Instant;
use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, doc};
use log::{debug, error, info};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{Acknowledgment, ClientOptions},
};
use crudlayer_core::{
    backend::{CollectionBackend, CollectionBackendBuilder, InsertOutcome, Namespace, UpdateOutcome},
    config::ConnectionConfig,
    error::{AccessorError, AccessorResult},
};


/// A single MongoDB collection reached through one driver client.
///
/// The client pools connections internally, so one `MongoDbCollection` serves concurrent
/// requests. Driver errors are returned as [`AccessorError::Backend`] with the
/// [`mongodb::error::Error`] as their source.
#[derive(Debug)]
pub struct MongoDbCollection {
    client: Client,
    collection: MongoCollection<Document>,
    namespace: Namespace,
}

impl MongoDbCollection {
    pub fn new(client: Client, namespace: Namespace) -> Self {
        let collection = client
            .database(&namespace.database)
            .collection(&namespace.collection);

        Self { client, collection, namespace }
    }

    pub fn builder(dsn: &str, database: &str, collection: &str) -> MongoDbCollectionBuilder {
        MongoDbCollectionBuilder::new(dsn, database, collection)
    }

    /// The driver client, for requests outside the accessor's contract.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Whether the collection's write concern asks the server to acknowledge writes.
    fn acknowledges_writes(&self) -> bool {
        !matches!(
            self.collection.write_concern().and_then(|concern| concern.w.as_ref()),
            Some(Acknowledgment::Nodes(0))
        )
    }
}

#[async_trait]
impl CollectionBackend for MongoDbCollection {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    async fn insert_one(&self, document: Document) -> AccessorResult<InsertOutcome> {
        let result = self.collection
            .insert_one(document)
            .await
            .map_err(AccessorError::backend)?;

        Ok(InsertOutcome {
            acknowledged: self.acknowledges_writes(),
            inserted_id: result.inserted_id,
        })
    }

    async fn find(&self, filter: Document) -> AccessorResult<Vec<Document>> {
        self.collection
            .find(filter)
            .await
            .map_err(AccessorError::backend)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(AccessorError::backend)
    }

    async fn update_many(&self, filter: Document, changes: Document) -> AccessorResult<UpdateOutcome> {
        let result = self.collection
            .update_many(filter, doc! { "$set": changes })
            .await
            .map_err(AccessorError::backend)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_many(&self, filter: Document) -> AccessorResult<u64> {
        Ok(
            self.collection
                .delete_many(filter)
                .await
                .map_err(AccessorError::backend)?
                .deleted_count
        )
    }

    async fn shutdown(self) -> AccessorResult<()> {
        self.client.shutdown().await;
        info!("event=mongodb_shutdown status=ok namespace={}", self.namespace);

        Ok(())
    }
}

/// Builds a [`MongoDbCollection`] from a connection string or a [`ConnectionConfig`].
///
/// Building verifies the connection: the driver connects lazily, so the builder pings the
/// authentication database and fails if the server cannot be selected or the credentials
/// are rejected.
pub struct MongoDbCollectionBuilder {
    dsn: String,
    namespace: Namespace,
}

impl MongoDbCollectionBuilder {
    pub fn new(dsn: &str, database: &str, collection: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            namespace: Namespace::new(database, collection),
        }
    }

    /// Validates `config` and uses its connection URI and namespace.
    pub fn from_config(config: &ConnectionConfig) -> AccessorResult<Self> {
        config.validate()?;

        Ok(Self {
            dsn: config.connection_uri(),
            namespace: Namespace::new(config.database.clone(), config.collection.clone()),
        })
    }

    async fn connect(&self) -> AccessorResult<Client> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(AccessorError::initialization)?;

        let auth_source = options
            .credential
            .as_ref()
            .and_then(|credential| credential.source.clone())
            .unwrap_or_else(|| self.namespace.database.clone());

        let client = Client::with_options(options).map_err(AccessorError::initialization)?;

        client
            .database(&auth_source)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(AccessorError::initialization)?;

        Ok(client)
    }
}

impl std::fmt::Debug for MongoDbCollectionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The DSN may carry a password.
        f.debug_struct("MongoDbCollectionBuilder")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CollectionBackendBuilder for MongoDbCollectionBuilder {
    type Backend = MongoDbCollection;

    async fn build(self) -> AccessorResult<Self::Backend> {
        let started_at = Instant::now();

        match self.connect().await {
            Ok(client) => {
                debug!(
                    "event=mongodb_connect status=ok namespace={} duration_ms={}",
                    self.namespace,
                    started_at.elapsed().as_millis()
                );
                Ok(MongoDbCollection::new(client, self.namespace))
            }
            Err(err) => {
                error!(
                    "event=mongodb_connect status=error namespace={} duration_ms={} error={}",
                    self.namespace,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_from_config_carries_uri_and_namespace() {
        let config = ConnectionConfig::builder("AAC", "animals")
            .host("db.internal")
            .credentials("aacuser", "s3cret")
            .build()
            .unwrap();

        let builder = MongoDbCollectionBuilder::from_config(&config).unwrap();

        assert_eq!(builder.dsn, config.connection_uri());
        assert_eq!(builder.namespace, Namespace::new("AAC", "animals"));
        assert!(!format!("{builder:?}").contains("s3cret"));
    }

    #[test]
    fn builder_from_invalid_config_fails() {
        let mut config = ConnectionConfig::builder("AAC", "animals").build().unwrap();
        config.collection = String::new();

        assert!(matches!(
            MongoDbCollectionBuilder::from_config(&config),
            Err(AccessorError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn malformed_dsn_fails_to_build() {
        let err = MongoDbCollection::builder("not-a-uri", "AAC", "animals")
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, AccessorError::Initialization(_)));
        assert!(err.backend_error::<mongodb::error::Error>().is_some());
    }
}
