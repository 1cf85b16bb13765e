//! Core traits and types for document representation and serialization.
//!
//! This module provides the trait that every persisted document type implements,
//! conversion helpers between typed documents and the store's BSON representation,
//! and [`Stored`], the shape reads come back in.

use bson::{Bson, Document as BsonDocument, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Core trait that all documents handled by the access layer must implement.
///
/// A document type is bound to a logical schema name. The schema name is resolved
/// to a physical collection when an access implementation is constructed (see
/// [`crate::config`]).
///
/// # Example
///
/// ```ignore
/// use docaccess::document::Document;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct AuditEntry {
///     pub actor: String,
/// }
///
/// impl Document for AuditEntry {
///     fn schema_name() -> &'static str {
///         "AUDIT"
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the logical schema name this document type is stored under.
    fn schema_name() -> &'static str;
}

/// Extension trait providing serialization/deserialization utilities for documents.
///
/// Automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Converts this document to a BSON map, the form store clients accept for writes.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Persistence`] if the document does not serialize
    /// to a map.
    fn to_bson_document(&self) -> DocumentStoreResult<BsonDocument>;

    /// Creates a document from a BSON value.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn to_bson_document(&self) -> DocumentStoreResult<BsonDocument> {
        match self.to_bson()? {
            Bson::Document(document) => Ok(document),
            other => Err(DocumentStoreError::Persistence(format!(
                "{} documents must serialize to a map, got {:?}",
                D::schema_name(),
                other.element_type()
            ))),
        }
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// A document read back from the store together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<D> {
    /// The identifier the store holds the document under.
    pub id: ObjectId,
    /// The decoded document, without the identifier field.
    pub document: D,
}

impl<D: Document> Stored<D> {
    /// Splits the `_id` field off a raw store document and decodes the rest.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIdentifier`] when `_id` is missing or not an
    /// `ObjectId`, and [`DocumentStoreError::Serialization`] when the remainder does not
    /// decode into `D`.
    pub fn from_raw(mut raw: BsonDocument) -> DocumentStoreResult<Self> {
        let id = match raw.remove("_id") {
            Some(Bson::ObjectId(id)) => id,
            Some(other) => {
                return Err(DocumentStoreError::InvalidIdentifier(format!(
                    "stored _id {other} is not an ObjectId"
                )));
            }
            None => {
                return Err(DocumentStoreError::InvalidIdentifier(
                    "stored document has no _id".to_string(),
                ));
            }
        };

        Ok(Self {
            id,
            document: D::from_bson(Bson::Document(raw))?,
        })
    }

    /// Discards the identifier and returns the document.
    pub fn into_document(self) -> D {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl Document for Note {
        fn schema_name() -> &'static str {
            "NOTE"
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Tag(String);

    impl Document for Tag {
        fn schema_name() -> &'static str {
            "TAG"
        }
    }

    #[test]
    fn test_non_map_document_is_rejected_for_writes() {
        assert!(matches!(
            Tag("urgent".to_string()).to_bson_document(),
            Err(DocumentStoreError::Persistence(_))
        ));
    }

    #[test]
    fn test_from_raw_splits_identifier() {
        let id = ObjectId::new();
        let stored = Stored::<Note>::from_raw(doc! { "_id": id, "text": "hello" }).unwrap();

        assert_eq!(stored.id, id);
        assert_eq!(stored.into_document(), Note { text: "hello".to_string() });
    }

    #[test]
    fn test_from_raw_requires_object_id() {
        assert!(matches!(
            Stored::<Note>::from_raw(doc! { "_id": "abc", "text": "hello" }),
            Err(DocumentStoreError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            Stored::<Note>::from_raw(doc! { "text": "hello" }),
            Err(DocumentStoreError::InvalidIdentifier(_))
        ));
    }
}
