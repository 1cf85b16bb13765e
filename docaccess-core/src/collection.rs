//! Document access bound to one collection of a store.
//!
//! [`TypedCollection`] implements [`DocumentAccess`] for a document type over any
//! [`StoreBackend`]. Every public operation normalizes its identifiers, then runs
//! as a single unit of work inside [`DocumentAccess::transaction`]. The `*_in`
//! methods are those units of work; they take an open session so several of them
//! can be composed into one transaction.
//!
//! # Example
//!
//! ```ignore
//! use docaccess::{prelude::*, memory::InMemoryStore, schema::Hl7Document};
//!
//! let access = TypedCollection::<_, Hl7Document>::new(InMemoryStore::new())?;
//!
//! let document = Hl7Document::from_external_json(payload)?;
//! let id = access.insert_one(&document).await?;
//!
//! assert!(access.delete_by_id(id).await?);
//! assert!(!access.delete_by_id(id).await?);
//! ```

use async_trait::async_trait;
use bson::{Document as BsonDocument, oid::ObjectId};
use futures::FutureExt;
use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::{
    backend::StoreBackend,
    config::{self, StoreConfig},
    contract::{DocumentAccess, UnitOfWork},
    document::{Document, DocumentExt, Stored},
    error::{DocumentStoreError, DocumentStoreResult},
    id::{RawId, normalize_id, normalize_ids},
    query::{Condition, Filter, Query},
    write::{BulkOutcome, WriteModel},
};

/// Access to the documents of type `D` held in one collection of backend `B`.
///
/// The collection owns its backend handle and reuses it for every call.
#[derive(Debug)]
pub struct TypedCollection<B: StoreBackend, D: Document> {
    name: String,
    backend: B,
    _marker: PhantomData<D>,
}

impl<B: StoreBackend, D: Document> TypedCollection<B, D> {
    /// Binds to the collection the built-in schema mapping assigns to `D`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::UnknownSchema`] if `D`'s schema has no collection.
    pub fn new(backend: B) -> DocumentStoreResult<Self> {
        let name = config::collection_for(D::schema_name())
            .ok_or_else(|| DocumentStoreError::UnknownSchema(D::schema_name().to_string()))?;

        Ok(Self::with_collection(backend, name))
    }

    /// Binds to the collection `config` assigns to `D`, honoring its overrides.
    pub fn with_config(backend: B, config: &StoreConfig) -> DocumentStoreResult<Self> {
        Ok(Self::with_collection(backend, config.collection_for(D::schema_name())?))
    }

    /// Binds to an explicitly named collection.
    pub fn with_collection(backend: B, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend,
            _marker: PhantomData,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Releases the backend handle.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Reads the documents matching `condition` within `session`.
    pub async fn find_in(
        &self,
        session: &mut B::Session,
        condition: Condition,
        limit: Option<usize>,
    ) -> DocumentStoreResult<Vec<Stored<D>>> {
        let raw = self.backend
            .find(
                &self.name,
                Query::builder()
                    .filter(condition)
                    .maybe_limit(limit)
                    .build(),
                Some(session),
            )
            .await?;

        debug!(collection = %self.name, found = raw.len(), "read documents");

        raw.into_iter()
            .map(Stored::from_raw)
            .collect()
    }

    /// Inserts one document within `session`.
    pub async fn insert_one_in(&self, session: &mut B::Session, document: &D) -> DocumentStoreResult<ObjectId> {
        let raw = document.to_bson_document()?;

        self.backend
            .insert_one(&self.name, raw, Some(session))
            .await
    }

    /// Inserts documents within `session`, returning identifiers in input order.
    pub async fn insert_many_in(
        &self,
        session: &mut B::Session,
        documents: &[D],
    ) -> DocumentStoreResult<Vec<ObjectId>> {
        let raw = documents
            .iter()
            .map(DocumentExt::to_bson_document)
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        debug!(collection = %self.name, count = raw.len(), "inserting documents");

        self.backend
            .insert_many(&self.name, raw, Some(session))
            .await
    }

    /// Updates the first match within `session`; `true` if its content changed.
    pub async fn update_one_in(
        &self,
        session: &mut B::Session,
        condition: Condition,
        values: BsonDocument,
    ) -> DocumentStoreResult<bool> {
        let result = self.backend
            .update_one(&self.name, &condition, values, Some(session))
            .await?;

        Ok(result.modified_count > 0)
    }

    /// Updates every match within `session`; `true` if any content changed.
    pub async fn update_many_in(
        &self,
        session: &mut B::Session,
        condition: Condition,
        values: BsonDocument,
    ) -> DocumentStoreResult<bool> {
        let result = self.backend
            .update_many(&self.name, &condition, values, Some(session))
            .await?;

        debug!(
            collection = %self.name,
            matched = result.matched_count,
            modified = result.modified_count,
            "updated documents"
        );

        Ok(result.modified_count > 0)
    }

    /// Sends one batched update, `values[i]` applied to `ids[i]`, within `session`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::MismatchedBatchLength`] before contacting the store
    /// if the two lists differ in length.
    pub async fn update_by_ids_in(
        &self,
        session: &mut B::Session,
        ids: Vec<ObjectId>,
        values: Vec<BsonDocument>,
    ) -> DocumentStoreResult<BulkOutcome> {
        let models = prepare_bulk_updates(&ids, values)?;

        self.bulk_write_in(session, ids, models).await
    }

    /// Deletes the first match within `session`; `true` if a document was removed.
    pub async fn delete_one_in(&self, session: &mut B::Session, condition: Condition) -> DocumentStoreResult<bool> {
        let result = self.backend
            .delete_one(&self.name, &condition, Some(session))
            .await?;

        Ok(result.deleted_count > 0)
    }

    /// Deletes every match within `session`; `true` if any document was removed.
    pub async fn delete_many_in(&self, session: &mut B::Session, condition: Condition) -> DocumentStoreResult<bool> {
        let result = self.backend
            .delete_many(&self.name, &condition, Some(session))
            .await?;

        debug!(collection = %self.name, deleted = result.deleted_count, "deleted documents");

        Ok(result.deleted_count > 0)
    }

    /// Sends one batched delete for `ids` within `session`.
    pub async fn delete_by_ids_in(
        &self,
        session: &mut B::Session,
        ids: Vec<ObjectId>,
    ) -> DocumentStoreResult<BulkOutcome> {
        let models = prepare_bulk_deletes(&ids);

        self.bulk_write_in(session, ids, models).await
    }

    async fn bulk_write_in(
        &self,
        session: &mut B::Session,
        ids: Vec<ObjectId>,
        models: Vec<WriteModel>,
    ) -> DocumentStoreResult<BulkOutcome> {
        if models.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let result = self.backend
            .bulk_write(&self.name, models, Some(session))
            .await?;
        let outcome = BulkOutcome::from_results(ids, &result);

        debug!(
            collection = %self.name,
            submitted = outcome.len(),
            applied = outcome.applied_count(),
            "bulk write finished"
        );

        Ok(outcome)
    }

    fn logged<T>(&self, operation: &'static str, result: DocumentStoreResult<T>) -> DocumentStoreResult<T> {
        if let Err(err) = &result {
            warn!(operation, collection = %self.name, error = %err, "document access failed");
        }

        result
    }
}

/// One `UpdateOne` per identifier, paired positionally with `values`.
fn prepare_bulk_updates(ids: &[ObjectId], values: Vec<BsonDocument>) -> DocumentStoreResult<Vec<WriteModel>> {
    if ids.len() != values.len() {
        return Err(DocumentStoreError::MismatchedBatchLength {
            ids: ids.len(),
            values: values.len(),
        });
    }

    Ok(ids
        .iter()
        .zip(values)
        .map(|(id, set)| WriteModel::UpdateOne { filter: Filter::id(*id), set })
        .collect())
}

/// One `DeleteOne` per identifier.
fn prepare_bulk_deletes(ids: &[ObjectId]) -> Vec<WriteModel> {
    ids.iter()
        .map(|id| WriteModel::DeleteOne { filter: Filter::id(*id) })
        .collect()
}

#[async_trait]
impl<B, D> DocumentAccess<D> for TypedCollection<B, D>
where
    B: StoreBackend + 'static,
    D: Document,
{
    type Session = B::Session;

    async fn transaction<T, F>(&self, op: F) -> DocumentStoreResult<T>
    where
        T: Send,
        F: for<'s> FnOnce(&'s Self, &'s mut Self::Session) -> UnitOfWork<'s, T> + Send,
    {
        let mut session = self.backend.start_session().await?;
        self.backend.start_transaction(&mut session).await?;

        debug!(collection = %self.name, "transaction started");

        match op(self, &mut session).await {
            Ok(value) => {
                self.backend.commit_transaction(&mut session).await?;
                debug!(collection = %self.name, "transaction committed");

                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = self.backend.abort_transaction(&mut session).await {
                    warn!(collection = %self.name, error = %abort_err, "transaction abort failed");
                }
                debug!(collection = %self.name, error = %err, "transaction aborted");

                Err(err)
            }
        }
    }

    async fn find_one(&self, condition: Condition) -> DocumentStoreResult<Option<Stored<D>>> {
        let result = self
            .transaction(move |this, session| {
                this.find_in(session, condition, Some(1))
                    .map(|found| found.map(|stored| stored.into_iter().next()))
                    .boxed()
            })
            .await;

        self.logged("find_one", result)
    }

    async fn find_many(
        &self,
        condition: Condition,
        limit: Option<usize>,
    ) -> DocumentStoreResult<Vec<Stored<D>>> {
        let result = self
            .transaction(move |this, session| this.find_in(session, condition, limit).boxed())
            .await;

        self.logged("find_many", result)
    }

    async fn find_by_id<I>(&self, id: I) -> DocumentStoreResult<Option<Stored<D>>>
    where
        I: Into<RawId> + Send,
    {
        let id = self.logged("find_by_id", normalize_id(id))?;

        let result = self
            .transaction(move |this, session| {
                this.find_in(session, Filter::id(id), Some(1))
                    .map(|found| found.map(|stored| stored.into_iter().next()))
                    .boxed()
            })
            .await;

        self.logged("find_by_id", result)
    }

    async fn find_by_ids<I>(&self, ids: Vec<I>) -> DocumentStoreResult<Vec<Stored<D>>>
    where
        I: Into<RawId> + Send,
    {
        let ids = self.logged("find_by_ids", normalize_ids(ids))?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = self
            .transaction(move |this, session| this.find_in(session, Filter::ids(ids), None).boxed())
            .await;

        self.logged("find_by_ids", result)
    }

    async fn insert_one(&self, document: &D) -> DocumentStoreResult<ObjectId> {
        let document = document.clone();

        let result = self
            .transaction(move |this, session| {
                async move { this.insert_one_in(session, &document).await }.boxed()
            })
            .await;

        self.logged("insert_one", result)
    }

    async fn insert_many(&self, documents: &[D]) -> DocumentStoreResult<Vec<ObjectId>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let documents = documents.to_vec();

        let result = self
            .transaction(move |this, session| {
                async move { this.insert_many_in(session, &documents).await }.boxed()
            })
            .await;

        self.logged("insert_many", result)
    }

    async fn update_one(&self, condition: Condition, values: BsonDocument) -> DocumentStoreResult<bool> {
        let result = self
            .transaction(move |this, session| this.update_one_in(session, condition, values).boxed())
            .await;

        self.logged("update_one", result)
    }

    async fn update_many(&self, condition: Condition, values: BsonDocument) -> DocumentStoreResult<bool> {
        let result = self
            .transaction(move |this, session| this.update_many_in(session, condition, values).boxed())
            .await;

        self.logged("update_many", result)
    }

    async fn update_by_id<I>(&self, id: I, values: BsonDocument) -> DocumentStoreResult<bool>
    where
        I: Into<RawId> + Send,
    {
        let id = self.logged("update_by_id", normalize_id(id))?;

        let result = self
            .transaction(move |this, session| this.update_one_in(session, Filter::id(id), values).boxed())
            .await;

        self.logged("update_by_id", result)
    }

    async fn update_by_ids<I>(
        &self,
        ids: Vec<I>,
        values: Vec<BsonDocument>,
    ) -> DocumentStoreResult<BulkOutcome>
    where
        I: Into<RawId> + Send,
    {
        if ids.len() != values.len() {
            return self.logged(
                "update_by_ids",
                Err(DocumentStoreError::MismatchedBatchLength {
                    ids: ids.len(),
                    values: values.len(),
                }),
            );
        }

        let ids = self.logged("update_by_ids", normalize_ids(ids))?;
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let result = self
            .transaction(move |this, session| this.update_by_ids_in(session, ids, values).boxed())
            .await;

        self.logged("update_by_ids", result)
    }

    async fn delete_one(&self, condition: Condition) -> DocumentStoreResult<bool> {
        let result = self
            .transaction(move |this, session| this.delete_one_in(session, condition).boxed())
            .await;

        self.logged("delete_one", result)
    }

    async fn delete_many(&self, condition: Condition) -> DocumentStoreResult<bool> {
        let result = self
            .transaction(move |this, session| this.delete_many_in(session, condition).boxed())
            .await;

        self.logged("delete_many", result)
    }

    async fn delete_by_id<I>(&self, id: I) -> DocumentStoreResult<bool>
    where
        I: Into<RawId> + Send,
    {
        let id = self.logged("delete_by_id", normalize_id(id))?;

        let result = self
            .transaction(move |this, session| this.delete_one_in(session, Filter::id(id)).boxed())
            .await;

        self.logged("delete_by_id", result)
    }

    async fn delete_by_ids<I>(&self, ids: Vec<I>) -> DocumentStoreResult<BulkOutcome>
    where
        I: Into<RawId> + Send,
    {
        let ids = self.logged("delete_by_ids", normalize_ids(ids))?;
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let result = self
            .transaction(move |this, session| this.delete_by_ids_in(session, ids).boxed())
            .await;

        self.logged("delete_by_ids", result)
    }
}
