//! Identifier normalization.
//!
//! Callers hand identifiers to the access layer in whatever form they hold them:
//! a native [`ObjectId`], its 24 character hex encoding, or a raw BSON value read
//! back from somewhere else. [`normalize_id`] turns all of these into the store's
//! canonical [`ObjectId`] or rejects them.

use bson::{Bson, Document, oid::ObjectId};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// An identifier as supplied by a caller, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawId {
    /// Already in canonical form.
    ObjectId(ObjectId),
    /// Textual encoding, expected to be 24 hexadecimal characters.
    Text(String),
    /// Any BSON value. Only `ObjectId` and `String` values normalize.
    Bson(Bson),
}

impl From<ObjectId> for RawId {
    fn from(id: ObjectId) -> Self {
        RawId::ObjectId(id)
    }
}

impl From<&ObjectId> for RawId {
    fn from(id: &ObjectId) -> Self {
        RawId::ObjectId(*id)
    }
}

impl From<String> for RawId {
    fn from(text: String) -> Self {
        RawId::Text(text)
    }
}

impl From<&str> for RawId {
    fn from(text: &str) -> Self {
        RawId::Text(text.to_string())
    }
}

impl From<Bson> for RawId {
    fn from(value: Bson) -> Self {
        RawId::Bson(value)
    }
}

/// Converts a caller supplied identifier into the store's canonical [`ObjectId`].
///
/// Pure function: performs no I/O.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidIdentifier`] when the value is neither an
/// `ObjectId` nor a string that decodes into one.
///
/// # Example
///
/// ```ignore
/// use docaccess::id::normalize_id;
///
/// let id = normalize_id("667fd8a1c2a4b5e6f7a8b9c0")?;
/// assert_eq!(normalize_id(id)?, id);
/// assert!(normalize_id("not-an-id").is_err());
/// ```
pub fn normalize_id(raw: impl Into<RawId>) -> DocumentStoreResult<ObjectId> {
    match raw.into() {
        RawId::ObjectId(id) | RawId::Bson(Bson::ObjectId(id)) => Ok(id),
        RawId::Text(text) | RawId::Bson(Bson::String(text)) => parse_hex(&text),
        RawId::Bson(other) => Err(DocumentStoreError::InvalidIdentifier(format!(
            "unsupported identifier value {other}"
        ))),
    }
}

/// Normalizes every identifier, failing on the first one that does not normalize.
pub fn normalize_ids<I>(raw: impl IntoIterator<Item = I>) -> DocumentStoreResult<Vec<ObjectId>>
where
    I: Into<RawId>,
{
    raw.into_iter()
        .map(normalize_id)
        .collect()
}

/// Returns the `_id` a document will be stored under, assigning a fresh one first if it has none.
///
/// An assigned `_id` is placed ahead of every other field.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidIdentifier`] if `_id` is present but not an `ObjectId`.
pub fn assign_id(document: Document) -> DocumentStoreResult<(ObjectId, Document)> {
    match document.get("_id").cloned() {
        Some(Bson::ObjectId(id)) => Ok((id, document)),
        Some(other) => Err(DocumentStoreError::InvalidIdentifier(format!(
            "_id must be an ObjectId, got {other}"
        ))),
        None => {
            let id = ObjectId::new();
            let mut prepared = Document::new();

            prepared.insert("_id", id);
            for (key, value) in document {
                prepared.insert(key, value);
            }

            Ok((id, prepared))
        }
    }
}

fn parse_hex(text: &str) -> DocumentStoreResult<ObjectId> {
    ObjectId::parse_str(text)
        .map_err(|_| DocumentStoreError::InvalidIdentifier(format!("{text:?} is not a 24 character hex ObjectId")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "667fd8a1c2a4b5e6f7a8b9c0";

    #[test]
    fn test_normalize_hex_string() {
        let id = normalize_id(HEX).unwrap();
        assert_eq!(id.to_hex(), HEX);
        assert_eq!(normalize_id(HEX.to_string()).unwrap(), id);
    }

    #[test]
    fn test_normalize_object_id_is_identity() {
        let id = ObjectId::new();
        assert_eq!(normalize_id(id).unwrap(), id);
        assert_eq!(normalize_id(&id).unwrap(), id);
        assert_eq!(normalize_id(Bson::ObjectId(id)).unwrap(), id);
    }

    #[test]
    fn test_normalize_bson_string() {
        let id = normalize_id(Bson::String(HEX.to_string())).unwrap();
        assert_eq!(id.to_hex(), HEX);
    }

    #[test]
    fn test_rejects_malformed_values() {
        for bad in ["", "abc", "667fd8a1c2a4b5e6f7a8b9cz", "667fd8a1c2a4b5e6f7a8b9c0ff"] {
            assert!(matches!(
                normalize_id(bad),
                Err(DocumentStoreError::InvalidIdentifier(_))
            ), "{bad:?} should be rejected");
        }

        assert!(matches!(
            normalize_id(Bson::Int32(7)),
            Err(DocumentStoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_normalize_ids_fails_on_first_bad_value() {
        let ids = normalize_ids(vec![HEX, HEX]).unwrap();
        assert_eq!(ids.len(), 2);

        assert!(normalize_ids(vec![HEX, "nope"]).is_err());
    }

    #[test]
    fn test_assign_id() {
        let (id, document) = assign_id(bson::doc! { "SenderID": "LAB-01" }).unwrap();
        assert_eq!(document.keys().next().map(String::as_str), Some("_id"));
        assert_eq!(document.get_object_id("_id").unwrap(), id);

        let existing = ObjectId::new();
        let (id, _) = assign_id(bson::doc! { "_id": existing }).unwrap();
        assert_eq!(id, existing);

        assert!(matches!(
            assign_id(bson::doc! { "_id": 7 }),
            Err(DocumentStoreError::InvalidIdentifier(_))
        ));
    }
}
