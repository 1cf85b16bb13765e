//! In-memory document store client.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend`
//! trait with snapshot transactions. It stands in for a real store in development
//! and tests, and follows the same read, `$set` update and write-conflict rules.
//!
//! # Quick Start
//!
//! ```ignore
//! use docaccess::{prelude::*, memory::InMemoryStore, schema::Hl7Document};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let access = TypedCollection::<_, Hl7Document>::new(backend)?;
//!
//!     let document = Hl7Document::from_external_json(payload)?;
//!     let id = access.insert_one(&document).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docaccess_memory;

pub mod store;
pub mod evaluator;
pub mod update;

pub use store::{InMemorySession, InMemoryStore, InMemoryStoreBuilder};
