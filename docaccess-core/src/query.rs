//! Conditions and read requests.
//!
//! A [`Condition`] says which stored messages an operation applies to. The access
//! layer passes it through untouched; the MongoDB client turns it into a filter
//! document and the in-memory client evaluates it message by message, both through
//! [`QueryVisitor`].
//!
//! Field paths are dotted, so `Patient.Order.Results.0.Units` addresses the units of
//! the first result and `Patient.Order.Results.Units` any result's units.

use bson::{Bson, oid::ObjectId};

use crate::error::DocumentStoreError;

/// How a field is compared with the value in an [`Expr::Field`].
///
/// Text operators ignore case and treat their argument literally.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Lt,
    /// Substring of a text field, or every listed value present in an array field.
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    /// The field holds one of the listed values. The value must be an array.
    AnyOf,
    /// The field holds none of the listed values. The value must be an array.
    NoneOf,
}

/// A condition tree.
///
/// ```ignore
/// use docaccess::query::Filter;
///
/// let abnormal_finals = Filter::eq("Patient.Order.ReportType", "F")
///     .and(Filter::any_of("Patient.Order.Results.AbnormalFlag", vec!["H", "L"]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Every branch matches. No branches matches every message.
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// The field is present (`true`) or absent (`false`).
    Exists(String, bool),
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    /// Conjunction with `other`, flattened into an existing `And`.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut branches) => {
                branches.push(other);
                Expr::And(branches)
            }
            single => Expr::And(vec![single, other]),
        }
    }

    /// Disjunction with `other`, flattened into an existing `Or`.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut branches) => {
                branches.push(other);
                Expr::Or(branches)
            }
            single => Expr::Or(vec![single, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// The selector taken by every access operation.
pub type Condition = Expr;

/// A condition plus an optional cap on how many messages come back.
///
/// A cap of zero means no cap, as with the MongoDB `limit` option.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Option<Expr>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// The cap to apply, with zero read as "none".
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|limit| *limit > 0)
    }
}

/// Constructors for [`Condition`]s.
///
/// ```ignore
/// use docaccess::query::Filter;
///
/// let lab_one = Filter::eq("SenderID", "LAB-01");
/// let without_results = Filter::not_exists("Patient.Order.Results.0");
/// ```
pub struct Filter;

macro_rules! field_filters {
    ($($(#[$doc:meta])* $name:ident => $op:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
                Expr::Field { field: field.into(), op: FieldOp::$op, value: value.into() }
            }
        )*
    };
}

impl Filter {
    field_filters! {
        eq => Eq;
        ne => Ne;
        gt => Gt;
        lt => Lt;
        starts_with => StartsWith;
        ends_with => EndsWith;
        contains => Contains;
        not_contains => NotContains;
        /// `value` is the array of accepted values.
        any_of => AnyOf;
        /// `value` is the array of rejected values.
        none_of => NoneOf;
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(branches: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(branches.into_iter().collect())
    }

    pub fn or(branches: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(branches.into_iter().collect())
    }

    /// Matches every stored message.
    pub fn all() -> Expr {
        Expr::And(Vec::new())
    }

    /// Matches the message stored under `id`.
    pub fn id(id: ObjectId) -> Expr {
        Self::eq("_id", id)
    }

    /// Matches the messages stored under any of `ids`.
    pub fn ids(ids: impl IntoIterator<Item = ObjectId>) -> Expr {
        Self::any_of("_id", ids.into_iter().map(Bson::ObjectId).collect::<Vec<_>>())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Like [`QueryBuilder::limit`], but `None` clears a cap set earlier.
    pub fn maybe_limit(mut self, limit: Option<usize>) -> Self {
        self.query.limit = limit;
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Folds a condition tree into one output per node.
///
/// [`QueryVisitor::visit_expr`] dispatches on the node kind; implementors supply the
/// per-kind methods and recurse through `visit_expr` for nested branches.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, branches: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, branches: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, inner: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(branches) => self.visit_and(branches),
            Expr::Or(branches) => self.visit_or(branches),
            Expr::Not(inner) => self.visit_not(inner),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
