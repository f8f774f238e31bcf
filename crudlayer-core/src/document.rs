//! Argument validation and typed conversions for documents.
//!
//! Documents and queries are plain [`bson::Document`] mappings. Accessor operations accept
//! anything convertible into a [`Bson`] value and use [`expect_mapping`] to reject input that
//! is not a mapping (or is empty where a non-empty mapping is required) before the store is
//! contacted.

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{AccessorError, AccessorResult};

/// Whether an argument may be an empty mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emptiness {
    /// `{}` is accepted (e.g. "match all" queries).
    Allowed,
    /// `{}` is rejected.
    Rejected,
}

/// Checks that `value` is a mapping and returns it as a [`Document`].
///
/// # Errors
///
/// Returns [`AccessorError::InvalidArgument`] naming `argument` when the value is not a
/// document, or is an empty document and `emptiness` is [`Emptiness::Rejected`].
pub fn expect_mapping(argument: &str, value: Bson, emptiness: Emptiness) -> AccessorResult<Document> {
    match (value, emptiness) {
        (Bson::Document(doc), Emptiness::Rejected) if doc.is_empty() => Err(
            AccessorError::InvalidArgument(format!("{argument} must be a non-empty mapping"))
        ),
        (Bson::Document(doc), _) => Ok(doc),
        (other, Emptiness::Rejected) => Err(AccessorError::InvalidArgument(format!(
            "{argument} must be a non-empty mapping, got {}",
            type_name(&other),
        ))),
        (other, Emptiness::Allowed) => Err(AccessorError::InvalidArgument(format!(
            "{argument} must be a mapping, got {}",
            type_name(&other),
        ))),
    }
}

/// Serializes any serde value into a BSON value suitable for [`expect_mapping`].
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_bson<T: Serialize>(value: &T) -> AccessorResult<Bson> {
    Ok(serialize_to_bson(value)?)
}

/// Deserializes a stored document into a typed value.
///
/// # Errors
///
/// Returns an error if the document does not have the shape of `T`.
pub fn from_document<T: DeserializeOwned>(document: Document) -> AccessorResult<T> {
    Ok(deserialize_from_bson(Bson::Document(document))?)
}

/// Converts a stored document to relaxed extended JSON.
pub fn to_json(document: &Document) -> Value {
    Bson::Document(document.clone()).into_relaxed_extjson()
}

fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "boolean",
        Bson::Null | Bson::Undefined => "null",
        Bson::Int32(_) => "int32",
        Bson::Int64(_) => "int64",
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "date",
        _ => "scalar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[test]
    fn accepts_non_empty_mappings() {
        let doc = expect_mapping("document", Bson::Document(doc! { "name": "Rex" }), Emptiness::Rejected).unwrap();

        assert_eq!(doc.get_str("name").unwrap(), "Rex");
    }

    #[test]
    fn empty_mapping_depends_on_emptiness() {
        assert!(expect_mapping("query", Bson::Document(doc! {}), Emptiness::Allowed).is_ok());

        let err = expect_mapping("query", Bson::Document(doc! {}), Emptiness::Rejected).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.to_string(), "Invalid argument: query must be a non-empty mapping");
    }

    #[test]
    fn rejects_scalars_and_sequences() {
        let err = expect_mapping("query", Bson::Int32(5), Emptiness::Allowed).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: query must be a mapping, got int32");

        let err = expect_mapping("document", Bson::Array(vec![]), Emptiness::Rejected).unwrap_err();
        assert!(err.is_invalid_argument());

        assert!(expect_mapping("query", Bson::Null, Emptiness::Allowed).is_err());
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Animal {
        name: String,
        age_upon_outcome_weeks: i32,
    }

    #[test]
    fn typed_values_convert_through_bson() {
        let animal = Animal { name: "Bella".into(), age_upon_outcome_weeks: 52 };

        let bson = to_bson(&animal).unwrap();
        let doc = expect_mapping("document", bson, Emptiness::Rejected).unwrap();
        assert_eq!(to_json(&doc), serde_json::json!({ "name": "Bella", "age_upon_outcome_weeks": 52 }));

        let restored: Animal = from_document(doc).unwrap();
        assert_eq!(restored, animal);
    }
}
