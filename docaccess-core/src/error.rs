//! Error types and result types for document access operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`].
//! Outcomes such as "nothing matched" or "nothing was modified" are not errors;
//! they are reported through the `Ok` value of the operation.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when accessing a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store client initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Required configuration is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The supplied value cannot be normalized into a store identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// External document payload is not valid JSON or lacks a required nested section.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
    /// The store rejected a write (duplicate key, immutable field, invalid update path).
    #[error("Persistence error: {0}")]
    Persistence(String),
    /// A bulk request was given a different number of identifiers and values.
    #[error("Mismatched batch length: {ids} identifiers, {values} values")]
    MismatchedBatchLength {
        /// Number of identifiers supplied.
        ids: usize,
        /// Number of value maps supplied.
        values: usize,
    },
    /// The store aborted the transaction with an error that may succeed on retry.
    #[error("Transient transaction error: {0}")]
    TransientTransaction(String),
    /// No collection is registered for the schema name.
    #[error("Unknown schema: {0}")]
    UnknownSchema(String),
    /// An error occurred in the underlying store client.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns `true` when the failed unit of work may succeed if run again.
    pub fn is_transient(&self) -> bool {
        matches!(self, DocumentStoreError::TransientTransaction(_))
    }
}

/// A specialized `Result` type for document access operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
