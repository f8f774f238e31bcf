//! `$set` application for in-memory documents.

use bson::{Bson, Document};

use crate::error::{MemoryStoreError, MemoryStoreResult};

/// Most null elements a single `$set` may append to reach an array index.
const MAX_ARRAY_PADDING: usize = 1_500_000;

/// Sets every field of `changes` on `document`.
///
/// Field names may be dotted paths. Missing intermediate documents are created and numeric
/// segments index into arrays, padding with nulls like the server does. The changes are
/// applied to a copy and committed only if all of them succeed, so a failing update leaves
/// `document` untouched.
///
/// Returns whether any value of `document` actually changed.
pub(crate) fn apply_set(document: &mut Document, changes: &Document) -> MemoryStoreResult<bool> {
    check_paths(changes)?;

    let mut updated = document.clone();

    for (path, value) in changes {
        let segments = path.split('.').collect::<Vec<_>>();
        set_in_document(&mut updated, &segments, value.clone(), path)?;
    }

    let id_unchanged = match (updated.get("_id"), document.get("_id")) {
        (Some(new), Some(old)) => same_value(new, old),
        (new, old) => new.is_none() && old.is_none(),
    };

    if !id_unchanged {
        let path = changes
            .keys()
            .find(|path| path.as_str() == "_id" || path.starts_with("_id."))
            .map_or("_id", String::as_str);

        return Err(MemoryStoreError::ImmutableField(path.to_string()));
    }

    if same_fields(&updated, document) {
        return Ok(false);
    }

    *document = updated;
    Ok(true)
}

/// Order-sensitive equality that treats a NaN as equal to the same NaN.
///
/// `Document`'s own `PartialEq` ignores field order, and `f64` equality never holds for NaN.
fn same_fields(left: &Document, right: &Document) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|((left_key, left_value), (right_key, right_value))| {
                left_key == right_key && same_value(left_value, right_value)
            })
}

fn same_value(left: &Bson, right: &Bson) -> bool {
    match (left, right) {
        (Bson::Double(left), Bson::Double(right)) => left.to_bits() == right.to_bits(),
        (Bson::Document(left), Bson::Document(right)) => same_fields(left, right),
        (Bson::Array(left), Bson::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right.iter())
                    .all(|(left, right)| same_value(left, right))
        }
        _ => left == right,
    }
}

fn check_paths(changes: &Document) -> MemoryStoreResult<()> {
    for path in changes.keys() {
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(MemoryStoreError::InvalidUpdate(format!(
                    "the update path '{path}' contains an empty field name"
                )));
            }

            if segment.starts_with('$') {
                return Err(MemoryStoreError::InvalidUpdate(format!(
                    "the dollar ($) prefixed field '{segment}' in '{path}' is not allowed"
                )));
            }
        }
    }

    // Two paths where one is a prefix of the other would write the same subtree twice.
    for path in changes.keys() {
        for other in changes.keys() {
            if path != other && other.starts_with(path.as_str()) && other[path.len()..].starts_with('.') {
                return Err(MemoryStoreError::InvalidUpdate(format!(
                    "updating the path '{other}' would create a conflict at '{path}'"
                )));
            }
        }
    }

    Ok(())
}

fn set_in_document(document: &mut Document, segments: &[&str], value: Bson, path: &str) -> MemoryStoreResult<()> {
    let Some((head, rest)) = segments.split_first() else {
        return Err(MemoryStoreError::InvalidUpdate(format!("empty update path '{path}'")));
    };

    if rest.is_empty() {
        document.insert(*head, value);
        return Ok(());
    }

    match document.get_mut(*head) {
        Some(child) => set_in_value(child, rest, value, path),
        None => {
            let mut child = Document::new();
            set_in_document(&mut child, rest, value, path)?;
            document.insert(*head, child);
            Ok(())
        }
    }
}

fn set_in_value(target: &mut Bson, segments: &[&str], value: Bson, path: &str) -> MemoryStoreResult<()> {
    match target {
        Bson::Document(document) => set_in_document(document, segments, value, path),
        Bson::Array(items) => {
            let Some((head, rest)) = segments.split_first() else {
                return Err(MemoryStoreError::InvalidUpdate(format!("empty update path '{path}'")));
            };
            let index = head.parse::<usize>().map_err(|_| cannot_create(head, path))?;

            if index >= items.len() {
                if index - items.len() > MAX_ARRAY_PADDING {
                    return Err(MemoryStoreError::InvalidUpdate(format!(
                        "can't backfill array to index {index} along the path '{path}', \
                         at most {MAX_ARRAY_PADDING} elements may be added"
                    )));
                }

                items.resize(index, Bson::Null);
                items.push(if rest.is_empty() {
                    value
                } else {
                    let mut child = Document::new();
                    set_in_document(&mut child, rest, value, path)?;
                    Bson::Document(child)
                });
                return Ok(());
            }

            if rest.is_empty() {
                items[index] = value;
                Ok(())
            } else {
                set_in_value(&mut items[index], rest, value, path)
            }
        }
        _ => Err(cannot_create(segments.first().copied().unwrap_or_default(), path)),
    }
}

fn cannot_create(segment: &str, path: &str) -> MemoryStoreError {
    MemoryStoreError::InvalidUpdate(format!("cannot create field '{segment}' along the path '{path}'"))
}
