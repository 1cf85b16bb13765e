//! Transactional document access for HL7 message documents.
//!
//! This crate is the entry point of the docaccess workspace. It re-exports the core
//! types and the store clients: callers parse an external HL7 payload into an
//! [`Hl7Document`](schema::Hl7Document), then read and write it through a
//! [`TypedCollection`](collection::TypedCollection), which runs every operation in
//! a store transaction and reports what happened as a typed result.
//!
//! # Quick Start
//!
//! ```ignore
//! use docaccess::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let access = TypedCollection::<_, Hl7Document>::new(InMemoryStore::new())?;
//!
//!     let document = Hl7Document::from_external_json(payload)?;
//!     let id = access.insert_one(&document).await?;
//!
//!     // `true` only if the stored value actually changed
//!     let changed = access
//!         .update_by_id(id.to_hex(), doc! { "Patient.Order.ReportType": "C" })
//!         .await?;
//!
//!     let stored = access.find_by_id(id).await?;
//!     assert!(access.delete_by_id(id).await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Transactions
//!
//! Several operations can share one transaction through
//! [`DocumentAccess::transaction`](contract::DocumentAccess::transaction) and the
//! session-taking `*_in` methods of [`TypedCollection`](collection::TypedCollection):
//!
//! ```ignore
//! use futures::FutureExt;
//!
//! let replaced = access
//!     .transaction(move |access, session| async move {
//!         let ids = access.insert_many_in(session, &corrected).await?;
//!         access.delete_by_ids_in(session, stale).await?;
//!         Ok(ids)
//!     }.boxed())
//!     .await?;
//! ```
//!
//! A failed unit of work aborts the transaction. A failure the store marks as
//! retryable is returned as
//! [`DocumentStoreError::TransientTransaction`](error::DocumentStoreError::TransientTransaction);
//! retrying is left to the caller.
//!
//! # Backends
//!
//! - [`memory`] - In-memory store with snapshot transactions, for development and tests
//! - [`mongodb`] - MongoDB store (requires `mongodb` feature)

pub mod prelude;

pub use docaccess_core::{backend, collection, config, contract, document, error, id, query, schema, write};

// Re-export BSON types for convenience
pub use bson;

/// In-memory store client.
pub mod memory {
    pub use docaccess_memory::{InMemorySession, InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB store client.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docaccess_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
