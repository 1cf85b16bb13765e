//! Convenient re-exports of commonly used types.
//!
//! ```ignore
//! use docaccess::prelude::*;
//! ```

pub use docaccess_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::TypedCollection,
    config::StoreConfig,
    contract::{DocumentAccess, UnitOfWork},
    document::{Document, DocumentExt, Stored},
    error::{DocumentStoreError, DocumentStoreResult},
    id::{RawId, normalize_id, normalize_ids},
    query::{Condition, Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor},
    schema::Hl7Document,
    write::{BulkItem, BulkOutcome},
};
