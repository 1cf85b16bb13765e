//! MongoDB store client.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Every access operation runs in a driver session transaction, so the target
//! deployment must be a replica set or sharded cluster. Batched updates and deletes
//! use the client-level bulk write command, which needs MongoDB 8.0 or later.
//!
//! To use this client, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docaccess = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! Connection parameters come from a [`StoreConfig`](docaccess_core::config::StoreConfig),
//! usually read from the environment, so no credentials live in source.
//!
//! # Example
//!
//! ```ignore
//! use docaccess::{prelude::*, config::StoreConfig, mongodb::MongoDbStoreBuilder, schema::Hl7Document};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::from_env()?;
//!     let backend = MongoDbStoreBuilder::from_config(&config).build().await?;
//!     let access = TypedCollection::<_, Hl7Document>::with_config(backend, &config)?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docaccess_mongodb;

pub mod store;
pub mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
