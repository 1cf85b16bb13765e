//! The document access contract.
//!
//! [`DocumentAccess`] is the complete operation surface a document access
//! implementation offers for one document type: single and bulk reads, inserts,
//! updates and deletes, plus the transaction wrapper every one of them runs in.
//! [`TypedCollection`](crate::collection::TypedCollection) implements it over any
//! [`StoreBackend`](crate::backend::StoreBackend); supporting another store means
//! implementing that backend trait, not this one.
//!
//! Operations never panic or swallow failures. A call either succeeds with a value
//! that says what happened (`false` when nothing was modified, `None` when nothing
//! matched) or fails with a typed [`DocumentStoreError`](crate::error::DocumentStoreError).

use async_trait::async_trait;
use bson::{Document as BsonDocument, oid::ObjectId};
use futures::future::BoxFuture;

use crate::{
    document::{Document, Stored},
    error::DocumentStoreResult,
    id::RawId,
    query::Condition,
    write::BulkOutcome,
};

/// A unit of work run inside a transaction, borrowing the access handle and session.
pub type UnitOfWork<'s, T> = BoxFuture<'s, DocumentStoreResult<T>>;

/// Operation set every document access implementation provides.
///
/// # Example
///
/// ```ignore
/// use docaccess::prelude::*;
/// use bson::doc;
///
/// let id = access.insert_one(&document).await?;
/// let changed = access.update_by_id(id, doc! { "Patient.Order.ReportType": "C" }).await?;
/// let stored = access.find_by_id(id).await?;
/// ```
#[async_trait]
pub trait DocumentAccess<D: Document>: Send + Sync {
    /// Session type of the underlying store.
    type Session: Send;

    /// Runs `op` inside one transaction and returns what it returns.
    ///
    /// The transaction commits when `op` succeeds and aborts when it fails, so a
    /// failing unit of work leaves no partial writes behind. Transient store
    /// failures surface as
    /// [`DocumentStoreError::TransientTransaction`](crate::error::DocumentStoreError::TransientTransaction);
    /// they are not retried here.
    ///
    /// ```ignore
    /// use futures::FutureExt;
    ///
    /// let moved = access
    ///     .transaction(|access, session| async move {
    ///         let ids = access.insert_many_in(session, &[first, second]).await?;
    ///         access.delete_by_ids_in(session, vec![old]).await?;
    ///         Ok(ids)
    ///     }.boxed())
    ///     .await?;
    /// ```
    async fn transaction<T, F>(&self, op: F) -> DocumentStoreResult<T>
    where
        T: Send,
        F: for<'s> FnOnce(&'s Self, &'s mut Self::Session) -> UnitOfWork<'s, T> + Send;

    /// Returns the first document matching `condition`, if any.
    async fn find_one(&self, condition: Condition) -> DocumentStoreResult<Option<Stored<D>>>;

    /// Returns the documents matching `condition`, at most `limit` of them when given.
    async fn find_many(
        &self,
        condition: Condition,
        limit: Option<usize>,
    ) -> DocumentStoreResult<Vec<Stored<D>>>;

    /// Returns the document stored under `id`, if any.
    async fn find_by_id<I>(&self, id: I) -> DocumentStoreResult<Option<Stored<D>>>
    where
        I: Into<RawId> + Send;

    /// Returns the documents stored under any of `ids`, in store order.
    async fn find_by_ids<I>(&self, ids: Vec<I>) -> DocumentStoreResult<Vec<Stored<D>>>
    where
        I: Into<RawId> + Send;

    /// Persists `document` and returns the identifier assigned to it.
    async fn insert_one(&self, document: &D) -> DocumentStoreResult<ObjectId>;

    /// Persists `documents` and returns their identifiers in input order.
    async fn insert_many(&self, documents: &[D]) -> DocumentStoreResult<Vec<ObjectId>>;

    /// Sets `values` on the first document matching `condition`.
    ///
    /// Returns `true` only if the document's content actually changed.
    async fn update_one(&self, condition: Condition, values: BsonDocument) -> DocumentStoreResult<bool>;

    /// Sets `values` on every document matching `condition`.
    ///
    /// Returns `true` if at least one document's content actually changed.
    async fn update_many(&self, condition: Condition, values: BsonDocument) -> DocumentStoreResult<bool>;

    /// Sets `values` on the document stored under `id`.
    async fn update_by_id<I>(&self, id: I, values: BsonDocument) -> DocumentStoreResult<bool>
    where
        I: Into<RawId> + Send;

    /// Sets `values[i]` on the document stored under `ids[i]`, in one batched request.
    async fn update_by_ids<I>(
        &self,
        ids: Vec<I>,
        values: Vec<BsonDocument>,
    ) -> DocumentStoreResult<BulkOutcome>
    where
        I: Into<RawId> + Send;

    /// Deletes the first document matching `condition`. Returns `true` if one was deleted.
    async fn delete_one(&self, condition: Condition) -> DocumentStoreResult<bool>;

    /// Deletes every document matching `condition`. Returns `true` if any were deleted.
    async fn delete_many(&self, condition: Condition) -> DocumentStoreResult<bool>;

    /// Deletes the document stored under `id`. Returns `true` if it existed.
    async fn delete_by_id<I>(&self, id: I) -> DocumentStoreResult<bool>
    where
        I: Into<RawId> + Send;

    /// Deletes the documents stored under `ids`, in one batched request.
    async fn delete_by_ids<I>(&self, ids: Vec<I>) -> DocumentStoreResult<BulkOutcome>
    where
        I: Into<RawId> + Send;
}
