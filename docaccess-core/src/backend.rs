//! Store client abstraction.
//!
//! [`StoreBackend`] is the boundary between the access layer and a concrete document
//! store. It exposes per-collection writes and reads that report store-level results
//! (assigned identifiers, matched/modified/deleted counts), plus the session and
//! transaction primitives the access layer wraps every operation in.
//!
//! Every data operation takes an optional session. With a session that has a
//! transaction in progress, the operation joins that transaction; without one it
//! runs directly against the store.
//!
//! # Example
//!
//! ```ignore
//! use docaccess::backend::StoreBackend;
//! use docaccess::query::Filter;
//! use bson::doc;
//!
//! let mut session = backend.start_session().await?;
//! backend.start_transaction(&mut session).await?;
//!
//! let id = backend.insert_one("hl7_messages", doc! { "SenderID": "S1" }, Some(&mut session)).await?;
//! backend.update_one("hl7_messages", &Filter::id(id), doc! { "SenderID": "S2" }, Some(&mut session)).await?;
//!
//! backend.commit_transaction(&mut session).await?;
//! ```

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::{Condition, Query},
    write::{BulkWriteResult, DeleteResult, UpdateResult, WriteModel},
};

/// Abstract interface for document store clients.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one client is shared by every call an
/// access implementation makes. Sessions are owned by a single unit of work.
///
/// # Error Handling
///
/// Write rejections (duplicate keys, immutable fields) are reported as
/// [`DocumentStoreError::Persistence`](crate::error::DocumentStoreError::Persistence).
/// Transaction aborts the store marks as retryable are reported as
/// [`DocumentStoreError::TransientTransaction`](crate::error::DocumentStoreError::TransientTransaction).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Store-side handle carrying at most one transaction at a time.
    type Session: Send;

    /// Opens a new session.
    async fn start_session(&self) -> DocumentStoreResult<Self::Session>;

    /// Starts a transaction on `session`.
    async fn start_transaction(&self, session: &mut Self::Session) -> DocumentStoreResult<()>;

    /// Commits the transaction in progress on `session`.
    async fn commit_transaction(&self, session: &mut Self::Session) -> DocumentStoreResult<()>;

    /// Aborts the transaction in progress on `session`, discarding its writes.
    async fn abort_transaction(&self, session: &mut Self::Session) -> DocumentStoreResult<()>;

    /// Inserts one document and returns the identifier it was stored under.
    ///
    /// A document without an `_id` field is assigned a fresh [`ObjectId`].
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<ObjectId>;

    /// Inserts documents in order and returns their identifiers in the same order.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<Vec<ObjectId>>;

    /// Applies `set` as a partial field replacement to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Condition,
        set: Document,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<UpdateResult>;

    /// Applies `set` as a partial field replacement to every document matching `filter`.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Condition,
        set: Document,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<UpdateResult>;

    /// Deletes the first document matching `filter`.
    async fn delete_one(
        &self,
        collection: &str,
        filter: &Condition,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<DeleteResult>;

    /// Deletes every document matching `filter`.
    async fn delete_many(
        &self,
        collection: &str,
        filter: &Condition,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<DeleteResult>;

    /// Executes all `models` in a single round trip.
    ///
    /// Sub-operations are independent: one matching nothing does not stop the others.
    /// Results are index-aligned with `models`.
    async fn bulk_write(
        &self,
        collection: &str,
        models: Vec<WriteModel>,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<BulkWriteResult>;

    /// Returns the raw documents (including `_id`) matching `query`, in natural order.
    async fn find(
        &self,
        collection: &str,
        query: Query,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Cleanly shuts down the client, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory for store clients.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
