//! Filter evaluation for in-memory document matching.
//!
//! This module evaluates MongoDB-style filter documents against stored documents. The
//! supported subset is implicit equality, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`,
//! `$in`, `$nin`, `$exists`, and the top-level combinators `$and`, `$or` and `$nor`.
//! Field names may be dotted paths into embedded documents and arrays.

use std::cmp::Ordering;
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use crate::error::{MemoryStoreError, MemoryStoreResult};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so that `1`, `1_i64` and `1.0` compare equal.
/// Embedded documents compare field by field, in order.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    ObjectId(ObjectId),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Embedded document, in field order
    Map(Vec<(&'a str, Comparable<'a>)>),
    /// Any other BSON type, compared exactly
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}


/// Evaluates a filter document against one stored document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns whether the document satisfies every clause of `filter`.
    ///
    /// An empty filter matches every document.
    pub fn matches(&self, filter: &Document) -> MemoryStoreResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => self.all(clauses(key, condition)?)?,
                "$or" => self.any(clauses(key, condition)?)?,
                "$nor" => !self.any(clauses(key, condition)?)?,
                op if op.starts_with('$') => return Err(MemoryStoreError::UnsupportedOperator(op.to_string())),
                field => self.field_matches(field, condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Returns the documents of `documents` matching `filter`, preserving their order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> MemoryStoreResult<Vec<&'a Document>> {
        let mut matched = vec![];

        for document in documents {
            if DocumentEvaluator::new(document).matches(filter)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    fn all(&self, filters: Vec<&Document>) -> MemoryStoreResult<bool> {
        for filter in filters {
            if !self.matches(filter)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn any(&self, filters: Vec<&Document>) -> MemoryStoreResult<bool> {
        for filter in filters {
            if self.matches(filter)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn field_matches(&self, field: &str, condition: &Bson) -> MemoryStoreResult<bool> {
        let values = lookup(self.document, field);

        match condition {
            Bson::Document(ops) if is_operator_document(ops) => {
                for (op, operand) in ops {
                    if !apply_operator(&values, op, operand)? {
                        return Ok(false);
                    }
                }

                Ok(true)
            }
            _ => Ok(equals_any(&values, condition)),
        }
    }
}

fn clauses<'f>(operator: &str, condition: &'f Bson) -> MemoryStoreResult<Vec<&'f Document>> {
    let invalid = || MemoryStoreError::InvalidFilter(format!("{operator} must be a nonempty array of documents"));

    match condition {
        Bson::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_document().ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

fn is_operator_document(document: &Document) -> bool {
    document
        .keys()
        .next()
        .is_some_and(|key| key.starts_with('$'))
}

fn apply_operator(values: &[&Bson], op: &str, operand: &Bson) -> MemoryStoreResult<bool> {
    match op {
        "$eq" => Ok(equals_any(values, operand)),
        "$ne" => Ok(!equals_any(values, operand)),
        "$gt" => Ok(compare_any(values, operand, |o| o == Ordering::Greater)),
        "$gte" => Ok(compare_any(values, operand, |o| o != Ordering::Less)),
        "$lt" => Ok(compare_any(values, operand, |o| o == Ordering::Less)),
        "$lte" => Ok(compare_any(values, operand, |o| o != Ordering::Greater)),
        "$in" => Ok(in_list(values, op, operand)?),
        "$nin" => Ok(!in_list(values, op, operand)?),
        "$exists" => Ok(!values.is_empty() == truthy(operand)),
        other => Err(MemoryStoreError::UnsupportedOperator(other.to_string())),
    }
}

/// Whether any resolved value (or any element of a resolved array) equals `target`.
///
/// A missing field equals `null`.
fn equals_any(values: &[&Bson], target: &Bson) -> bool {
    let target = Comparable::from(target);

    if values.is_empty() {
        return target == Comparable::Null;
    }

    values.iter().any(|value| {
        let value = Comparable::from(*value);

        match &value {
            Comparable::Array(items) => value == target || items.iter().any(|item| *item == target),
            _ => value == target,
        }
    })
}

fn compare_any(values: &[&Bson], target: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let target = Comparable::from(target);
    let check = |value: &Comparable| value.partial_cmp(&target).is_some_and(&accept);

    values.iter().any(|value| match Comparable::from(*value) {
        Comparable::Array(items) => items.iter().any(|item| check(item)),
        scalar => check(&scalar),
    })
}

fn in_list(values: &[&Bson], op: &str, operand: &Bson) -> MemoryStoreResult<bool> {
    match operand {
        Bson::Array(candidates) => Ok(candidates.iter().any(|candidate| equals_any(values, candidate))),
        _ => Err(MemoryStoreError::InvalidFilter(format!("{op} needs an array"))),
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    }
}

/// Resolves a dotted path against a document.
///
/// Arrays along the path are traversed element-wise unless the segment is a numeric index,
/// so the result can hold several values.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments = path.split('.').collect::<Vec<_>>();
    let mut found = vec![];

    if let Some(first) = document.get(segments[0]) {
        descend(first, &segments[1..], &mut found);
    }

    found
}

fn descend<'a>(value: &'a Bson, segments: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((segment, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(doc) => {
            if let Some(next) = doc.get(*segment) {
                descend(next, rest, found);
            }
        }
        Bson::Array(items) => match segment.parse::<usize>() {
            Ok(index) => {
                if let Some(next) = items.get(index) {
                    descend(next, rest, found);
                }
            }
            Err(_) => {
                for item in items.iter().filter(|item| matches!(item, Bson::Document(_))) {
                    descend(item, segments, found);
                }
            }
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn dog() -> Document {
        doc! {
            "name": "Rex",
            "animal_type": "Dog",
            "age_weeks": 52,
            "tags": ["friendly", "vaccinated"],
            "location": { "lat": 30.75, "long": -97.5 },
            "intakes": [{ "year": 2019 }, { "year": 2021 }],
        }
    }

    fn matches(filter: Document) -> bool {
        DocumentEvaluator::new(&dog()).matches(&filter).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches(doc! {}));
    }

    #[test]
    fn implicit_equality() {
        assert!(matches(doc! { "name": "Rex", "animal_type": "Dog" }));
        assert!(!matches(doc! { "name": "Rex", "animal_type": "Cat" }));
        assert!(matches(doc! { "age_weeks": 52.0 }));
        assert!(matches(doc! { "age_weeks": 52_i64 }));
    }

    #[test]
    fn equality_reaches_into_arrays_and_paths() {
        assert!(matches(doc! { "tags": "friendly" }));
        assert!(matches(doc! { "tags": ["friendly", "vaccinated"] }));
        assert!(!matches(doc! { "tags": ["vaccinated", "friendly"] }));
        assert!(matches(doc! { "location.lat": 30.75 }));
        assert!(matches(doc! { "intakes.year": 2021 }));
        assert!(matches(doc! { "intakes.0.year": 2019 }));
        assert!(!matches(doc! { "intakes.1.year": 2019 }));
    }

    #[test]
    fn embedded_documents_compare_in_order() {
        assert!(matches(doc! { "location": { "lat": 30.75, "long": -97.5 } }));
        assert!(!matches(doc! { "location": { "long": -97.5, "lat": 30.75 } }));
    }

    #[test]
    fn missing_fields_equal_null() {
        assert!(matches(doc! { "outcome_type": Bson::Null }));
        assert!(!matches(doc! { "name": Bson::Null }));
    }

    #[test]
    fn comparison_operators() {
        assert!(matches(doc! { "age_weeks": { "$gt": 26, "$lte": 52 } }));
        assert!(!matches(doc! { "age_weeks": { "$lt": 52 } }));
        assert!(matches(doc! { "age_weeks": { "$gte": 52.0 } }));
        assert!(matches(doc! { "intakes.year": { "$gt": 2020 } }));
        assert!(!matches(doc! { "name": { "$gt": 5 } }));
        assert!(matches(doc! { "name": { "$ne": "Max" } }));
        assert!(matches(doc! { "name": { "$eq": "Rex" } }));
    }

    #[test]
    fn membership_and_existence() {
        assert!(matches(doc! { "animal_type": { "$in": ["Cat", "Dog"] } }));
        assert!(matches(doc! { "animal_type": { "$nin": ["Cat", "Bird"] } }));
        assert!(matches(doc! { "tags": { "$in": ["vaccinated"] } }));
        assert!(matches(doc! { "name": { "$exists": true } }));
        assert!(matches(doc! { "outcome_type": { "$exists": false } }));
    }

    #[test]
    fn logical_combinators() {
        assert!(matches(doc! { "$or": [{ "name": "Max" }, { "name": "Rex" }] }));
        assert!(matches(doc! { "$and": [{ "animal_type": "Dog" }, { "age_weeks": { "$gt": 10 } }] }));
        assert!(!matches(doc! { "$nor": [{ "animal_type": "Dog" }] }));
    }

    #[test]
    fn unknown_operators_and_bad_shapes_are_errors() {
        let dog = dog();
        let evaluator = DocumentEvaluator::new(&dog);

        assert_eq!(
            evaluator.matches(&doc! { "name": { "$regex": "^R" } }).unwrap_err(),
            MemoryStoreError::UnsupportedOperator("$regex".into())
        );
        assert_eq!(
            evaluator.matches(&doc! { "$where": "true" }).unwrap_err(),
            MemoryStoreError::UnsupportedOperator("$where".into())
        );
        assert!(matches!(
            evaluator.matches(&doc! { "$or": { "name": "Rex" } }).unwrap_err(),
            MemoryStoreError::InvalidFilter(_)
        ));
        assert!(matches!(
            evaluator.matches(&doc! { "name": { "$in": "Rex" } }).unwrap_err(),
            MemoryStoreError::InvalidFilter(_)
        ));
    }

    #[test]
    fn filter_documents_keeps_store_order() {
        let documents = vec![
            doc! { "n": 1, "kind": "dog" },
            doc! { "n": 2, "kind": "cat" },
            doc! { "n": 3, "kind": "dog" },
        ];

        let matched = DocumentEvaluator::filter_documents(&documents, &doc! { "kind": "dog" }).unwrap();

        assert_eq!(matched.iter().map(|d| d.get_i32("n").unwrap()).collect::<Vec<_>>(), vec![1, 3]);
    }
}
