//! In-memory storage implementation for document stores.
//!
//! Collections are vectors of BSON documents kept in insertion order behind an
//! async-aware read-write lock. Every committed write stamps the documents it
//! changed with a new commit sequence number.
//!
//! A transaction works on private snapshots, one per collection, each taken the
//! first time the transaction reads or writes that collection. Reads and writes
//! inside it see only those snapshots. On commit, every document
//! the transaction wrote is checked against the live store: if another writer
//! committed a change to it in the meantime the commit fails with
//! [`DocumentStoreError::TransientTransaction`] and nothing is applied; otherwise
//! the staged documents replace the live ones.

use std::{collections::{HashMap, HashSet}, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Document, oid::ObjectId};
use uuid::Uuid;
use tracing::debug;

use docaccess_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    id::assign_id,
    query::{Condition, Query},
    write::{BulkWriteResult, DeleteResult, UpdateResult, WriteModel, WriteModelResult},
};

use crate::{evaluator::DocumentEvaluator, update::apply_set};

#[derive(Debug, Clone, Default)]
struct CollectionState {
    documents: Vec<Document>,
    /// Commit sequence of the last write to each document, deleted ones included.
    versions: HashMap<ObjectId, u64>,
}

type StoreMap = HashMap<String, CollectionState>;

#[derive(Debug, Default)]
struct StoreState {
    sequence: u64,
    collections: StoreMap,
}

#[derive(Debug, Default)]
struct Transaction {
    /// Collections the transaction has accessed, as of its first access to each.
    snapshot: StoreMap,
    /// Documents written by the transaction, per collection.
    touched: HashMap<String, HashSet<ObjectId>>,
}

/// Session handle for [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemorySession {
    id: Uuid,
    transaction: Option<Transaction>,
}

impl InMemorySession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether a transaction is in progress on this session.
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }
}


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones
/// share the same underlying data. Queries scan every document of a collection.
///
/// # Example
///
/// ```ignore
/// use docaccess_memory::InMemoryStore;
/// use docaccess::{backend::StoreBackend, query::Filter};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.insert_one("hl7_messages", doc! { "SenderID": "LAB-01" }, None).await?;
///
/// let found = store.find("hl7_messages", Query::builder().filter(Filter::id(id)).build(), None).await?;
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Number of committed documents in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .collections
            .get(collection)
            .map_or(0, |state| state.documents.len())
    }

    /// Runs `op` against a staged copy of `collection` and keeps the copy only if `op` succeeds.
    ///
    /// Inside a transaction the copy comes from the session's snapshot and the changed
    /// documents are recorded; otherwise it comes from the live store and the changed
    /// documents are stamped with a new commit sequence.
    async fn write<T, F>(
        &self,
        collection: &str,
        session: Option<&mut InMemorySession>,
        op: F,
    ) -> DocumentStoreResult<T>
    where
        F: FnOnce(&mut Vec<Document>) -> DocumentStoreResult<T> + Send,
        T: Send,
    {
        match session.and_then(|session| session.transaction.as_mut()) {
            Some(transaction) => {
                let state = self.snapshot(transaction, collection).await;
                let mut staged = state.documents.clone();
                let output = op(&mut staged)?;
                let changed = changed_ids(&state.documents, &staged);

                state.documents = staged;
                transaction
                    .touched
                    .entry(collection.to_string())
                    .or_default()
                    .extend(changed);

                Ok(output)
            }
            None => {
                let mut guard = self.store.write().await;
                let StoreState { sequence, collections } = &mut *guard;
                let state = collections
                    .entry(collection.to_string())
                    .or_default();
                let mut staged = state.documents.clone();
                let output = op(&mut staged)?;
                let changed = changed_ids(&state.documents, &staged);

                state.documents = staged;
                if !changed.is_empty() {
                    *sequence += 1;
                    for id in changed {
                        state.versions.insert(id, *sequence);
                    }
                }

                Ok(output)
            }
        }
    }

    /// The transaction's view of `collection`, copied from the live store on first access.
    async fn snapshot<'t>(&self, transaction: &'t mut Transaction, collection: &str) -> &'t mut CollectionState {
        if !transaction.snapshot.contains_key(collection) {
            let state = self
                .store
                .read()
                .await
                .collections
                .get(collection)
                .cloned()
                .unwrap_or_default();
            transaction.snapshot.insert(collection.to_string(), state);
        }

        transaction.snapshot.entry(collection.to_string()).or_default()
    }

    async fn read<T, F>(
        &self,
        collection: &str,
        session: Option<&mut InMemorySession>,
        op: F,
    ) -> DocumentStoreResult<T>
    where
        F: FnOnce(&[Document]) -> DocumentStoreResult<T> + Send,
        T: Send,
    {
        match session.and_then(|session| session.transaction.as_mut()) {
            Some(transaction) => op(self.snapshot(transaction, collection).await.documents.as_slice()),
            None => {
                let store = self.store.read().await;

                op(
                    store
                        .collections
                        .get(collection)
                        .map_or(&[][..], |state| state.documents.as_slice())
                )
            }
        }
    }
}

fn id_of(document: &Document) -> Option<ObjectId> {
    document.get_object_id("_id").ok()
}

/// Identifiers of the documents added, removed or modified between `before` and `after`.
fn changed_ids(before: &[Document], after: &[Document]) -> HashSet<ObjectId> {
    let mut remaining = before
        .iter()
        .filter_map(|document| id_of(document).map(|id| (id, document)))
        .collect::<HashMap<_, _>>();
    let mut changed = HashSet::new();

    for document in after {
        if let Some(id) = id_of(document) {
            if remaining.remove(&id) != Some(document) {
                changed.insert(id);
            }
        }
    }

    changed.extend(remaining.into_keys());
    changed
}

fn position_of(documents: &[Document], id: &ObjectId) -> Option<usize> {
    documents
        .iter()
        .position(|document| document.get_object_id("_id").is_ok_and(|stored| &stored == id))
}

fn insert_all(collection: &str, documents: &mut Vec<Document>, batch: Vec<(ObjectId, Document)>) -> DocumentStoreResult<Vec<ObjectId>> {
    let mut seen = HashSet::with_capacity(batch.len());
    let mut ids = Vec::with_capacity(batch.len());

    for (id, document) in batch {
        if !seen.insert(id) || position_of(documents, &id).is_some() {
            return Err(DocumentStoreError::Persistence(format!(
                "duplicate key {id} in collection '{collection}'"
            )));
        }

        documents.push(document);
        ids.push(id);
    }

    Ok(ids)
}

fn update_matching(
    documents: &mut [Document],
    filter: &Condition,
    set: &Document,
    limit: Option<usize>,
) -> DocumentStoreResult<UpdateResult> {
    let mut result = UpdateResult::default();

    for document in documents.iter_mut() {
        if limit.is_some_and(|limit| result.matched_count as usize >= limit) {
            break;
        }
        if !DocumentEvaluator::matches(document, filter)? {
            continue;
        }

        result.matched_count += 1;
        if apply_set(document, set)? {
            result.modified_count += 1;
        }
    }

    Ok(result)
}

fn delete_matching(documents: &mut Vec<Document>, filter: &Condition, limit: Option<usize>) -> DocumentStoreResult<DeleteResult> {
    let mut keep = Vec::with_capacity(documents.len());
    let mut result = DeleteResult::default();

    for document in documents.drain(..) {
        let within_limit = limit.is_none_or(|limit| (result.deleted_count as usize) < limit);

        if within_limit && DocumentEvaluator::matches(&document, filter)? {
            result.deleted_count += 1;
        } else {
            keep.push(document);
        }
    }

    *documents = keep;

    Ok(result)
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    type Session = InMemorySession;

    async fn start_session(&self) -> DocumentStoreResult<Self::Session> {
        Ok(InMemorySession {
            id: Uuid::new_v4(),
            transaction: None,
        })
    }

    async fn start_transaction(&self, session: &mut Self::Session) -> DocumentStoreResult<()> {
        if session.transaction.is_some() {
            return Err(DocumentStoreError::Backend(format!(
                "transaction already in progress on session {}",
                session.id
            )));
        }

        session.transaction = Some(Transaction::default());

        Ok(())
    }

    async fn commit_transaction(&self, session: &mut Self::Session) -> DocumentStoreResult<()> {
        let Some(transaction) = session.transaction.take() else {
            return Err(DocumentStoreError::Backend(format!(
                "no transaction in progress on session {}",
                session.id
            )));
        };

        let mut guard = self.store.write().await;
        let StoreState { sequence, collections } = &mut *guard;

        for (name, ids) in &transaction.touched {
            let base = transaction.snapshot.get(name);
            let live = collections.get(name);

            for id in ids {
                let base_version = base.and_then(|state| state.versions.get(id));
                let live_version = live.and_then(|state| state.versions.get(id));

                if base_version != live_version {
                    return Err(DocumentStoreError::TransientTransaction(format!(
                        "write conflict on document {id} in collection '{name}'"
                    )));
                }
            }
        }

        let Transaction { snapshot, touched } = transaction;
        *sequence += 1;

        for (name, ids) in touched {
            let staged = snapshot
                .get(&name)
                .map_or(&[][..], |state| state.documents.as_slice())
                .iter()
                .filter_map(|document| id_of(document).filter(|id| ids.contains(id)).map(|id| (id, document)))
                .collect::<Vec<_>>();
            let state = collections.entry(name).or_default();
            let mut placed = HashSet::new();

            state.documents.retain_mut(|document| match id_of(document) {
                Some(id) if ids.contains(&id) => match staged.iter().find(|(staged_id, _)| *staged_id == id) {
                    Some((_, replacement)) => {
                        *document = (*replacement).clone();
                        placed.insert(id);
                        true
                    }
                    None => false,
                },
                _ => true,
            });

            for (id, document) in &staged {
                if !placed.contains(id) {
                    state.documents.push((*document).clone());
                }
            }
            for id in ids {
                state.versions.insert(id, *sequence);
            }
        }

        debug!(session = %session.id, "in-memory transaction committed");

        Ok(())
    }

    async fn abort_transaction(&self, session: &mut Self::Session) -> DocumentStoreResult<()> {
        match session.transaction.take() {
            Some(_) => Ok(()),
            None => Err(DocumentStoreError::Backend(format!(
                "no transaction in progress on session {}",
                session.id
            ))),
        }
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<ObjectId> {
        let prepared = assign_id(document)?;

        let ids = self
            .write(collection, session, |documents| insert_all(collection, documents, vec![prepared]))
            .await?;

        ids.into_iter()
            .next()
            .ok_or_else(|| DocumentStoreError::Backend("insert reported no identifier".to_string()))
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<Vec<ObjectId>> {
        let batch = documents
            .into_iter()
            .map(assign_id)
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        self.write(collection, session, |documents| insert_all(collection, documents, batch))
            .await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Condition,
        set: Document,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.write(collection, session, |documents| update_matching(documents, filter, &set, Some(1)))
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Condition,
        set: Document,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<UpdateResult> {
        self.write(collection, session, |documents| update_matching(documents, filter, &set, None))
            .await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Condition,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<DeleteResult> {
        self.write(collection, session, |documents| delete_matching(documents, filter, Some(1)))
            .await
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Condition,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<DeleteResult> {
        self.write(collection, session, |documents| delete_matching(documents, filter, None))
            .await
    }

    async fn bulk_write(
        &self,
        collection: &str,
        models: Vec<WriteModel>,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<BulkWriteResult> {
        self.write(collection, session, |documents| {
            let mut results = Vec::with_capacity(models.len());

            for model in &models {
                results.push(match model {
                    WriteModel::UpdateOne { filter, set } => {
                        WriteModelResult::Updated(update_matching(documents, filter, set, Some(1))?)
                    }
                    WriteModel::DeleteOne { filter } => {
                        WriteModelResult::Deleted(delete_matching(documents, filter, Some(1))?)
                    }
                });
            }

            Ok(BulkWriteResult { results })
        })
        .await
    }

    async fn find(
        &self,
        collection: &str,
        query: Query,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.read(collection, session, |documents| {
            let mut found = Vec::new();
            let limit = query.effective_limit().unwrap_or(usize::MAX);

            for document in documents {
                if found.len() >= limit {
                    break;
                }

                let matched = match &query.filter {
                    Some(filter) => DocumentEvaluator::matches(document, filter)?,
                    None => true,
                };
                if matched {
                    found.push(document.clone());
                }
            }

            Ok(found)
        })
        .await
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docaccess_core::query::Filter;

    const COLLECTION: &str = "hl7_messages";

    async fn seeded() -> (InMemoryStore, Vec<ObjectId>) {
        let store = InMemoryStore::new();
        let ids = store
            .insert_many(
                COLLECTION,
                vec![
                    doc! { "SenderID": "LAB-01", "VersionNumber": "2.5" },
                    doc! { "SenderID": "LAB-02", "VersionNumber": "2.5" },
                    doc! { "SenderID": "LAB-03", "VersionNumber": "2.3" },
                ],
                None,
            )
            .await
            .unwrap();

        (store, ids)
    }

    fn everything() -> Query {
        Query::builder().filter(Filter::all()).build()
    }

    #[tokio::test]
    async fn test_insert_assigns_leading_object_id() {
        let store = InMemoryStore::new();
        let id = store.insert_one(COLLECTION, doc! { "SenderID": "LAB-01" }, None).await.unwrap();

        let found = store.find(COLLECTION, everything(), None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].keys().next().map(String::as_str), Some("_id"));
        assert_eq!(found[0].get_object_id("_id").unwrap(), id);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_and_non_object_id_keys() {
        let (store, ids) = seeded().await;

        let err = store
            .insert_one(COLLECTION, doc! { "_id": ids[0], "SenderID": "LAB-09" }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::Persistence(_)));

        let err = store
            .insert_one(COLLECTION, doc! { "_id": "abc", "SenderID": "LAB-09" }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidIdentifier(_)));

        assert_eq!(store.count(COLLECTION).await, 3);
    }

    #[tokio::test]
    async fn test_insert_many_is_all_or_nothing() {
        let (store, ids) = seeded().await;

        let err = store
            .insert_many(
                COLLECTION,
                vec![doc! { "SenderID": "LAB-04" }, doc! { "_id": ids[1], "SenderID": "LAB-05" }],
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::Persistence(_)));
        assert_eq!(store.count(COLLECTION).await, 3);
    }

    #[tokio::test]
    async fn test_update_counts_matched_and_modified() {
        let (store, _) = seeded().await;

        let result = store
            .update_many(COLLECTION, &Filter::eq("VersionNumber", "2.5"), doc! { "VersionNumber": "2.5" }, None)
            .await
            .unwrap();
        assert_eq!(result, UpdateResult { matched_count: 2, modified_count: 0 });

        let result = store
            .update_one(COLLECTION, &Filter::eq("VersionNumber", "2.5"), doc! { "VersionNumber": "2.6" }, None)
            .await
            .unwrap();
        assert_eq!(result, UpdateResult { matched_count: 1, modified_count: 1 });
    }

    #[tokio::test]
    async fn test_delete_one_and_many() {
        let (store, _) = seeded().await;

        let result = store.delete_one(COLLECTION, &Filter::eq("VersionNumber", "2.5"), None).await.unwrap();
        assert_eq!(result.deleted_count, 1);

        let result = store.delete_many(COLLECTION, &Filter::all(), None).await.unwrap();
        assert_eq!(result.deleted_count, 2);
        assert_eq!(store.count(COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn test_bulk_write_reports_each_model() {
        let (store, ids) = seeded().await;
        let missing = ObjectId::new();

        let result = store
            .bulk_write(
                COLLECTION,
                vec![
                    WriteModel::UpdateOne { filter: Filter::id(ids[0]), set: doc! { "SenderID": "LAB-10" } },
                    WriteModel::UpdateOne { filter: Filter::id(missing), set: doc! { "SenderID": "LAB-11" } },
                    WriteModel::DeleteOne { filter: Filter::id(ids[2]) },
                ],
                None,
            )
            .await
            .unwrap();

        let applied = result.results.iter().map(WriteModelResult::applied).collect::<Vec<_>>();
        assert_eq!(applied, vec![true, false, true]);
        assert_eq!(store.count(COLLECTION).await, 2);
    }

    #[tokio::test]
    async fn test_find_respects_limit_and_order() {
        let (store, ids) = seeded().await;

        let found = store
            .find(COLLECTION, Query::builder().filter(Filter::all()).limit(2).build(), None)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].get_object_id("_id").unwrap(), ids[0]);

        let found = store
            .find(COLLECTION, Query::builder().filter(Filter::all()).limit(0).build(), None)
            .await
            .unwrap();
        assert_eq!(found.len(), 3);

        let found = store.find("unknown", everything(), None).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_transaction_isolated_until_commit() {
        let (store, ids) = seeded().await;
        let mut session = store.start_session().await.unwrap();
        store.start_transaction(&mut session).await.unwrap();

        store.delete_one(COLLECTION, &Filter::id(ids[0]), Some(&mut session)).await.unwrap();

        let inside = store.find(COLLECTION, everything(), Some(&mut session)).await.unwrap();
        assert_eq!(inside.len(), 2);
        assert_eq!(store.count(COLLECTION).await, 3);

        store.commit_transaction(&mut session).await.unwrap();
        assert_eq!(store.count(COLLECTION).await, 2);
        assert!(!session.in_transaction());
    }

    #[tokio::test]
    async fn test_abort_discards_writes() {
        let (store, _) = seeded().await;
        let mut session = store.start_session().await.unwrap();
        store.start_transaction(&mut session).await.unwrap();

        store.insert_one(COLLECTION, doc! { "SenderID": "LAB-04" }, Some(&mut session)).await.unwrap();
        store.abort_transaction(&mut session).await.unwrap();

        assert_eq!(store.count(COLLECTION).await, 3);
        assert!(store.abort_transaction(&mut session).await.is_err());
    }

    #[tokio::test]
    async fn test_conflicting_commit_is_transient() {
        let (store, ids) = seeded().await;
        let mut session = store.start_session().await.unwrap();
        store.start_transaction(&mut session).await.unwrap();

        store
            .update_one(COLLECTION, &Filter::id(ids[0]), doc! { "SenderID": "TX" }, Some(&mut session))
            .await
            .unwrap();
        store
            .update_one(COLLECTION, &Filter::id(ids[0]), doc! { "SenderID": "DIRECT" }, None)
            .await
            .unwrap();

        let err = store.commit_transaction(&mut session).await.unwrap_err();
        assert!(err.is_transient());

        let found = store
            .find(COLLECTION, Query::builder().filter(Filter::id(ids[0])).build(), None)
            .await
            .unwrap();
        assert_eq!(found[0].get_str("SenderID").unwrap(), "DIRECT");
    }

    #[tokio::test]
    async fn test_disjoint_transactions_both_commit() {
        let (store, ids) = seeded().await;
        let mut first = store.start_session().await.unwrap();
        let mut second = store.start_session().await.unwrap();
        store.start_transaction(&mut first).await.unwrap();
        store.start_transaction(&mut second).await.unwrap();

        store
            .update_one(COLLECTION, &Filter::id(ids[0]), doc! { "SenderID": "FIRST" }, Some(&mut first))
            .await
            .unwrap();
        store.delete_one(COLLECTION, &Filter::id(ids[1]), Some(&mut second)).await.unwrap();
        let inserted = store
            .insert_one(COLLECTION, doc! { "SenderID": "LAB-04" }, Some(&mut second))
            .await
            .unwrap();

        store.commit_transaction(&mut first).await.unwrap();
        store.commit_transaction(&mut second).await.unwrap();

        let found = store.find(COLLECTION, everything(), None).await.unwrap();
        let senders = found
            .iter()
            .map(|document| document.get_str("SenderID").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(senders, vec!["FIRST", "LAB-03", "LAB-04"]);
        assert_eq!(found[2].get_object_id("_id").unwrap(), inserted);
    }

    #[test]
    fn test_changed_ids_detects_all_kinds_of_change() {
        let kept = doc! { "_id": ObjectId::new(), "SenderID": "A" };
        let edited = doc! { "_id": ObjectId::new(), "SenderID": "B" };
        let removed = doc! { "_id": ObjectId::new(), "SenderID": "C" };
        let added = doc! { "_id": ObjectId::new(), "SenderID": "D" };

        let mut edited_after = edited.clone();
        edited_after.insert("SenderID", "E");

        let changed = changed_ids(
            &[kept.clone(), edited.clone(), removed.clone()],
            &[kept, edited_after, added.clone()],
        );

        let expected = [&edited, &removed, &added]
            .into_iter()
            .map(|document| id_of(document).unwrap())
            .collect::<HashSet<_>>();
        assert_eq!(changed, expected);
    }

    #[tokio::test]
    async fn test_transaction_snapshots_collections_on_first_access() {
        let (store, _) = seeded().await;
        store.insert_one("audit", doc! { "Event": "seeded" }, None).await.unwrap();

        let mut session = store.start_session().await.unwrap();
        store.start_transaction(&mut session).await.unwrap();
        assert!(session.transaction.as_ref().unwrap().snapshot.is_empty());

        store.find(COLLECTION, everything(), Some(&mut session)).await.unwrap();
        let snapshot = &session.transaction.as_ref().unwrap().snapshot;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(COLLECTION));

        store.insert_one(COLLECTION, doc! { "SenderID": "LATE" }, None).await.unwrap();
        store.insert_one("audit", doc! { "Event": "late" }, None).await.unwrap();

        assert_eq!(store.find(COLLECTION, everything(), Some(&mut session)).await.unwrap().len(), 3);
        assert_eq!(store.find("audit", everything(), Some(&mut session)).await.unwrap().len(), 2);

        store.commit_transaction(&mut session).await.unwrap();
    }

    #[tokio::test]
    async fn test_nested_transaction_rejected() {
        let store = InMemoryStore::new();
        let mut session = store.start_session().await.unwrap();

        store.start_transaction(&mut session).await.unwrap();
        assert!(store.start_transaction(&mut session).await.is_err());
    }
}
