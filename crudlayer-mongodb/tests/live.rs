//! Tests against a running MongoDB server.
//!
//! Run with `CRUDLAYER_TEST_MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`.

use bson::{Document, doc, oid::ObjectId};

use crudlayer_core::{
    accessor::CollectionAccessor,
    backend::CollectionBackendBuilder,
    error::AccessorError,
};
use crudlayer_mongodb::{MongoDbCollection, MongoDbCollectionBuilder};

const DATABASE: &str = "crudlayer_test";

fn uri() -> String {
    std::env::var("CRUDLAYER_TEST_MONGODB_URI").expect("CRUDLAYER_TEST_MONGODB_URI must be set")
}

/// Connects to a fresh collection so tests do not see each other's documents.
async fn fresh_accessor() -> CollectionAccessor<MongoDbCollection> {
    let collection = format!("animals_{}", ObjectId::new().to_hex());

    CollectionAccessor::connect(MongoDbCollectionBuilder::new(&uri(), DATABASE, &collection))
        .await
        .unwrap()
}

async fn drop_and_shutdown(accessor: CollectionAccessor<MongoDbCollection>) {
    let namespace = accessor.namespace().clone();

    accessor
        .backend()
        .client()
        .database(&namespace.database)
        .collection::<Document>(&namespace.collection)
        .drop()
        .await
        .unwrap();

    accessor.shutdown().await.unwrap();
}

#[tokio::test]
#[ignore = "needs a MongoDB server"]
async fn crud_round_trip() {
    let animals = fresh_accessor().await;

    assert!(animals.create(doc! { "name": "Rex", "animal_type": "Dog", "age_weeks": 52 }).await.unwrap());
    assert!(animals.create(doc! { "name": "Tom", "animal_type": "Cat", "age_weeks": 20 }).await.unwrap());

    assert_eq!(animals.read(doc! {}).await.unwrap().len(), 2);
    assert_eq!(animals.read(doc! { "animal_type": "Dog" }).await.unwrap().len(), 1);

    assert_eq!(animals.update(doc! { "name": "Rex" }, doc! { "outcome_type": "Adoption" }).await.unwrap(), 1);
    assert_eq!(animals.update(doc! { "name": "Rex" }, doc! { "outcome_type": "Adoption" }).await.unwrap(), 0);

    let rex = animals.read(doc! { "name": "Rex" }).await.unwrap();
    assert_eq!(rex[0].get_str("outcome_type").unwrap(), "Adoption");
    assert_eq!(rex[0].get_i32("age_weeks").unwrap(), 52);

    assert_eq!(animals.delete(doc! { "name": "Rex" }).await.unwrap(), 1);
    assert_eq!(animals.delete(doc! { "name": "Rex" }).await.unwrap(), 0);
    assert!(animals.read(doc! { "name": "Rex" }).await.unwrap().is_empty());

    drop_and_shutdown(animals).await;
}

#[tokio::test]
#[ignore = "needs a MongoDB server"]
async fn driver_errors_pass_through() {
    let animals = fresh_accessor().await;

    animals.create(doc! { "_id": 1, "name": "Rex" }).await.unwrap();
    let err = animals.create(doc! { "_id": 1, "name": "Max" }).await.unwrap_err();

    assert!(matches!(err, AccessorError::Backend(_)));
    assert!(err.backend_error::<mongodb::error::Error>().is_some());

    drop_and_shutdown(animals).await;
}

#[tokio::test]
#[ignore = "needs a MongoDB server"]
async fn unreachable_server_fails_at_construction() {
    let err = MongoDbCollectionBuilder::new(
        "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200",
        DATABASE,
        "animals",
    )
    .build()
    .await
    .unwrap_err();

    assert!(matches!(err, AccessorError::Initialization(_)));
}
