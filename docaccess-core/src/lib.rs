//! Core of the document access layer.
//!
//! This crate provides:
//!
//! - **Identifiers** ([`id`]) - Normalization of raw identifiers to [`bson::oid::ObjectId`]
//! - **Document traits** ([`document`]) - Serialization of typed documents and stored envelopes
//! - **HL7 schema** ([`schema`]) - The HL7 document model and its external key mapping
//! - **Query and filtering API** ([`query`]) - Type-safe condition construction
//! - **Write results** ([`write`]) - Store-level write models and per-item bulk outcomes
//! - **Store backend abstraction** ([`backend`]) - The store client boundary
//! - **Access contract** ([`contract`]) - The operation set every access implementation offers
//! - **Typed collections** ([`collection`]) - The transactional access implementation
//! - **Configuration** ([`config`]) - Connection settings and schema to collection mapping
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docaccess_core::{collection::TypedCollection, contract::DocumentAccess, schema::Hl7Document};
//!
//! let access = TypedCollection::<_, Hl7Document>::new(backend)?;
//! let document = Hl7Document::from_external_json(payload)?;
//!
//! let id = access.insert_one(&document).await?;
//! let stored = access.find_by_id(id.to_hex()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docaccess_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod contract;
pub mod document;
pub mod error;
pub mod id;
pub mod query;
pub mod schema;
pub mod write;
