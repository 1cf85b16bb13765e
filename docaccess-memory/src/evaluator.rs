//! Condition evaluation for in-memory document filtering.
//!
//! Field names are dotted paths. A path segment that meets an array either indexes
//! it (`Results.0.Value`) or fans out over its elements (`Results.Value`), and a
//! condition on a path holds when it holds for any value the path reaches.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docaccess_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so `Int32(10)` equals `Double(10.0)`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Values with no comparison semantics; equal to nothing.
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Collects every value `path` reaches from `value`.
fn resolve<'a>(value: &'a Bson, path: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = path.split_first() else {
        out.push(value);
        return;
    };

    match value {
        Bson::Document(doc) => {
            if let Some(next) = doc.get(*head) {
                resolve(next, rest, out);
            }
        }
        Bson::Array(items) => {
            if let Some(item) = head.parse::<usize>().ok().and_then(|index| items.get(index)) {
                resolve(item, rest, out);
            }
            for item in items.iter().filter(|item| matches!(item, Bson::Document(_))) {
                resolve(item, path, out);
            }
        }
        _ => {}
    }
}

/// Looks up every value a dotted `field` path reaches in `document`.
pub(crate) fn lookup<'a>(document: &'a Document, field: &str) -> Vec<&'a Bson> {
    let path = field.split('.').collect::<Vec<_>>();
    let mut out = Vec::new();

    if let Some((head, rest)) = path.split_first() {
        if let Some(value) = document.get(*head) {
            resolve(value, rest, &mut out);
        }
    }

    out
}

/// `candidate` equals `value`, or is an array holding an element equal to it.
fn equals(candidate: &Bson, value: &Bson) -> bool {
    let expected = Comparable::from(value);
    let actual = Comparable::from(candidate);

    if actual == expected {
        return true;
    }

    match actual {
        Comparable::Array(items) => items.iter().any(|item| item == &expected),
        _ => false,
    }
}

/// Applies an ordering test to `candidate`, or to each element when it is an array.
fn compares(candidate: &Bson, value: &Bson, test: impl Fn(Ordering) -> bool + Copy) -> bool {
    let expected = Comparable::from(value);

    match candidate {
        Bson::Array(items) => items.iter().any(|item| compares(item, value, test)),
        _ => Comparable::from(candidate)
            .partial_cmp(&expected)
            .is_some_and(test),
    }
}

/// Case-insensitive string test, applied to each element when `candidate` is an array.
fn text_matches(candidate: &Bson, test: &impl Fn(&str) -> bool) -> bool {
    match candidate {
        Bson::String(text) => test(&text.to_lowercase()),
        Bson::Array(items) => items.iter().any(|item| text_matches(item, test)),
        _ => false,
    }
}

fn expect_string<'v>(op: &str, value: &'v Bson) -> DocumentStoreResult<&'v str> {
    value
        .as_str()
        .ok_or_else(|| DocumentStoreError::Backend(format!("{op} operator requires a string value")))
}

fn expect_array<'v>(op: &str, value: &'v Bson) -> DocumentStoreResult<&'v [Bson]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| DocumentStoreError::Backend(format!("{op} operator requires an array value")))
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns `true` when `document` satisfies `expr`.
    pub fn matches(document: &Document, expr: &Expr) -> DocumentStoreResult<bool> {
        DocumentEvaluator::new(document).evaluate(expr)
    }

    fn any_of(&self, field: &str, values: &[Bson]) -> bool {
        let candidates = lookup(self.document, field);

        if candidates.is_empty() {
            return values.iter().any(|value| matches!(value, Bson::Null));
        }

        candidates
            .iter()
            .any(|candidate| values.iter().any(|value| equals(candidate, value)))
    }

    fn contains(&self, field: &str, value: &Bson) -> DocumentStoreResult<bool> {
        match value {
            Bson::String(needle) => {
                let needle = needle.to_lowercase();
                Ok(
                    lookup(self.document, field)
                        .iter()
                        .any(|candidate| text_matches(candidate, &|text: &str| text.contains(&needle)))
                )
            }
            Bson::Array(needles) => Ok(
                !needles.is_empty()
                    && needles.iter().all(|needle| {
                        lookup(self.document, field)
                            .iter()
                            .any(|candidate| equals(candidate, needle))
                    })
            ),
            _ => Err(DocumentStoreError::Backend(
                "Contains operator requires a string or array value".to_string(),
            )),
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(!lookup(self.document, field).is_empty() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let candidates = lookup(self.document, field);

        match op {
            FieldOp::Eq => Ok(self.any_of(field, std::slice::from_ref(value))),
            FieldOp::Ne => Ok(!self.any_of(field, std::slice::from_ref(value))),
            FieldOp::Gt => Ok(candidates.iter().any(|c| compares(c, value, |o| o == Ordering::Greater))),
            FieldOp::Lt => Ok(candidates.iter().any(|c| compares(c, value, |o| o == Ordering::Less))),
            FieldOp::Contains => self.contains(field, value),
            FieldOp::NotContains => match value {
                Bson::Array(values) => Ok(!self.any_of(field, values)),
                _ => Ok(!self.contains(field, value)?),
            },
            FieldOp::StartsWith => {
                let prefix = expect_string("StartsWith", value)?.to_lowercase();
                Ok(candidates.iter().any(|c| text_matches(c, &|text: &str| text.starts_with(&prefix))))
            }
            FieldOp::EndsWith => {
                let suffix = expect_string("EndsWith", value)?.to_lowercase();
                Ok(candidates.iter().any(|c| text_matches(c, &|text: &str| text.ends_with(&suffix))))
            }
            FieldOp::AnyOf => Ok(self.any_of(field, expect_array("AnyOf", value)?)),
            FieldOp::NoneOf => Ok(!self.any_of(field, expect_array("NoneOf", value)?)),
        }
    }
}
