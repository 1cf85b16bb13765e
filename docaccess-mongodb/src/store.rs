use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, doc, oid::ObjectId};
use mongodb::{
    Client, ClientSession, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::{
        ClientOptions, Credential, DeleteOneModel, FindOptions, UpdateModifications, UpdateOneModel,
        WriteModel as MongoWriteModel,
    },
};
use tracing::{debug, warn};

use docaccess_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    config::StoreConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    id::assign_id,
    query::{Condition, Query, QueryVisitor},
    write::{BulkWriteResult, DeleteResult, UpdateResult, WriteModel, WriteModelResult},
};

use crate::query::MongoQueryTranslator;

/// Awaits a driver action, attaching `session` when one is given.
macro_rules! in_session {
    ($action:expr, $session:expr) => {
        match $session {
            Some(session) => $action.session(session).await,
            None => $action.await,
        }
    };
}

/// Maps a driver error onto the access layer's error taxonomy.
fn map_error(err: MongoError) -> DocumentStoreError {
    if err.contains_label(TRANSIENT_TRANSACTION_ERROR) || err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) {
        return DocumentStoreError::TransientTransaction(err.to_string());
    }

    match *err.kind {
        ErrorKind::Write(_) | ErrorKind::InsertMany(_) | ErrorKind::BulkWrite(_) => {
            DocumentStoreError::Persistence(err.to_string())
        }
        _ => DocumentStoreError::Backend(err.to_string()),
    }
}

fn translate(condition: &Condition) -> DocumentStoreResult<Document> {
    MongoQueryTranslator.visit_expr(condition)
}


#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(url: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(url, database)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn write_model(&self, collection: &MongoCollection<Document>, model: WriteModel) -> DocumentStoreResult<MongoWriteModel> {
        Ok(match model {
            WriteModel::UpdateOne { filter, set } => MongoWriteModel::UpdateOne(
                UpdateOneModel::builder()
                    .namespace(collection.namespace())
                    .filter(translate(&filter)?)
                    .update(UpdateModifications::Document(doc! { "$set": set }))
                    .build()
            ),
            WriteModel::DeleteOne { filter } => MongoWriteModel::DeleteOne(
                DeleteOneModel::builder()
                    .namespace(collection.namespace())
                    .filter(translate(&filter)?)
                    .build()
            ),
        })
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    type Session = ClientSession;

    async fn start_session(&self) -> DocumentStoreResult<Self::Session> {
        self.client
            .start_session()
            .await
            .map_err(map_error)
    }

    async fn start_transaction(&self, session: &mut Self::Session) -> DocumentStoreResult<()> {
        session
            .start_transaction()
            .await
            .map_err(map_error)
    }

    async fn commit_transaction(&self, session: &mut Self::Session) -> DocumentStoreResult<()> {
        session
            .commit_transaction()
            .await
            .map_err(map_error)
    }

    async fn abort_transaction(&self, session: &mut Self::Session) -> DocumentStoreResult<()> {
        session
            .abort_transaction()
            .await
            .map_err(map_error)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<ObjectId> {
        let (id, document) = assign_id(document)?;
        let mongo_collection = self.get_collection(collection);

        in_session!(mongo_collection.insert_one(document), session).map_err(map_error)?;

        Ok(id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<Vec<ObjectId>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let (ids, documents): (Vec<_>, Vec<_>) = documents
            .into_iter()
            .map(assign_id)
            .collect::<DocumentStoreResult<Vec<_>>>()?
            .into_iter()
            .unzip();
        let mongo_collection = self.get_collection(collection);

        in_session!(mongo_collection.insert_many(documents), session).map_err(map_error)?;

        Ok(ids)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Condition,
        set: Document,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<UpdateResult> {
        let mongo_collection = self.get_collection(collection);
        let result = in_session!(
            mongo_collection.update_one(translate(filter)?, doc! { "$set": set }),
            session
        )
        .map_err(map_error)?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Condition,
        set: Document,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<UpdateResult> {
        let mongo_collection = self.get_collection(collection);
        let result = in_session!(
            mongo_collection.update_many(translate(filter)?, doc! { "$set": set }),
            session
        )
        .map_err(map_error)?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Condition,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<DeleteResult> {
        let mongo_collection = self.get_collection(collection);
        let result = in_session!(mongo_collection.delete_one(translate(filter)?), session).map_err(map_error)?;

        Ok(DeleteResult { deleted_count: result.deleted_count })
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Condition,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<DeleteResult> {
        let mongo_collection = self.get_collection(collection);
        let result = in_session!(mongo_collection.delete_many(translate(filter)?), session).map_err(map_error)?;

        Ok(DeleteResult { deleted_count: result.deleted_count })
    }

    /// Sends every model in one unordered client-level bulk write (MongoDB 8.0 or later).
    async fn bulk_write(
        &self,
        collection: &str,
        models: Vec<WriteModel>,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<BulkWriteResult> {
        if models.is_empty() {
            return Ok(BulkWriteResult::default());
        }

        let mongo_collection = self.get_collection(collection);
        let kinds = models
            .iter()
            .map(|model| matches!(model, WriteModel::UpdateOne { .. }))
            .collect::<Vec<_>>();
        let models = models
            .into_iter()
            .map(|model| self.write_model(&mongo_collection, model))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        let result = in_session!(
            self.client
                .bulk_write(models)
                .ordered(false)
                .verbose_results(),
            session
        )
        .map_err(map_error)?;

        debug!(
            collection,
            matched = result.summary.matched_count,
            modified = result.summary.modified_count,
            deleted = result.summary.deleted_count,
            "bulk write acknowledged"
        );

        Ok(BulkWriteResult {
            results: kinds
                .into_iter()
                .enumerate()
                .map(|(index, is_update)| {
                    if is_update {
                        WriteModelResult::Updated(
                            result
                                .update_results
                                .get(&index)
                                .map(|update| UpdateResult {
                                    matched_count: update.matched_count,
                                    modified_count: update.modified_count,
                                })
                                .unwrap_or_default(),
                        )
                    } else {
                        WriteModelResult::Deleted(DeleteResult {
                            deleted_count: result
                                .delete_results
                                .get(&index)
                                .map_or(0, |delete| delete.deleted_count),
                        })
                    }
                })
                .collect(),
        })
    }

    async fn find(
        &self,
        collection: &str,
        query: Query,
        session: Option<&mut Self::Session>,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut options = FindOptions::default();
        options.limit = query.effective_limit().map(|limit| limit as i64);

        let filter = match &query.filter {
            Some(expr) => translate(expr)?,
            None => doc! {},
        };
        let coll = self.get_collection(collection);
        let action = coll
            .find(filter)
            .with_options(options);

        match session {
            Some(session) => action
                .session(&mut *session)
                .await
                .map_err(map_error)?
                .stream(session)
                .try_collect::<Vec<Document>>()
                .await
                .map_err(map_error),
            None => action
                .await
                .map_err(map_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(map_error),
        }
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}


/// Builds a [`MongoDbStore`] from a connection URL and optional credentials.
///
/// Credentials are attached to the client options rather than spliced into the URL.
pub struct MongoDbStoreBuilder {
    url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(url: &str, database: &str) -> Self {
        Self {
            url: url.to_string(),
            database: database.to_string(),
            username: None,
            password: None,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            url: config.url.clone(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.url)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if self.username.is_some() || self.password.is_some() {
            if self.username.is_none() {
                warn!("store password configured without a user name");
            }
            options.credential = Some(
                Credential::builder()
                    .username(self.username)
                    .password(self.password)
                    .build()
            );
        }

        let client = Client::with_options(options)
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        debug!(database = %self.database, "connected store client");

        Ok(MongoDbStore::new(client, self.database))
    }
}
