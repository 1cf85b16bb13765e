//! Condition translation to MongoDB query syntax.

use bson::{Document, Bson, doc};

use docaccess_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::DocumentStoreError,
};


/// Translates conditions into MongoDB query documents.
///
/// Field names pass through unchanged, so dotted paths address nested fields.
/// String matching operators are case-insensitive and match their argument literally.
pub(crate) struct MongoQueryTranslator;

/// Escapes regular expression metacharacters so `text` matches literally.
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // `$not` only applies to operator expressions; `$nor` negates a whole filter.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": escape_regex(s), "$options": "i" },
                    Bson::Array(arr) => doc! { "$all": arr },
                    _ => return Err(DocumentStoreError::Backend("Contains operator requires a string or array value".to_string())),
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": { "$regex": escape_regex(s), "$options": "i" } },
                    Bson::Array(arr) => doc! { "$nin": arr },
                    _ => return Err(DocumentStoreError::Backend("NotContains operator requires a string or array value".to_string())),
                },
                FieldOp::StartsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("^{}", escape_regex(s)), "$options": "i" },
                    _ => return Err(DocumentStoreError::Backend("StartsWith operator requires a string value".to_string())),
                },
                FieldOp::EndsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("{}$", escape_regex(s)), "$options": "i" },
                    _ => return Err(DocumentStoreError::Backend("EndsWith operator requires a string value".to_string())),
                },
                FieldOp::AnyOf => match value {
                    Bson::Array(arr) => doc! { "$in": arr },
                    _ => return Err(DocumentStoreError::Backend("AnyOf operator requires an array value".to_string())),
                },
                FieldOp::NoneOf => match value {
                    Bson::Array(arr) => doc! { "$nin": arr },
                    _ => return Err(DocumentStoreError::Backend("NoneOf operator requires an array value".to_string())),
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use docaccess_core::query::Filter;

    fn translate(expr: Expr) -> Document {
        MongoQueryTranslator.visit_expr(&expr).unwrap()
    }

    #[test]
    fn test_dotted_paths_pass_through() {
        assert_eq!(
            translate(Filter::eq("Patient.Order.ReportType", "F")),
            doc! { "Patient.Order.ReportType": { "$eq": "F" } }
        );
    }

    #[test]
    fn test_identifier_filters() {
        let id = ObjectId::new();

        assert_eq!(translate(Filter::id(id)), doc! { "_id": { "$eq": id } });
        assert_eq!(translate(Filter::ids(vec![id])), doc! { "_id": { "$in": [id] } });
    }

    #[test]
    fn test_empty_and_matches_everything() {
        assert_eq!(translate(Filter::all()), doc! {});
    }

    #[test]
    fn test_not_uses_nor() {
        assert_eq!(
            translate(Filter::eq("SenderID", "LAB-01").not()),
            doc! { "$nor": [{ "SenderID": { "$eq": "LAB-01" } }] }
        );
    }

    #[test]
    fn test_regex_arguments_are_escaped() {
        assert_eq!(
            translate(Filter::starts_with("VersionNumber", "2.5")),
            doc! { "VersionNumber": { "$regex": "^2\\.5", "$options": "i" } }
        );
    }

    #[test]
    fn test_any_of_requires_array() {
        assert!(MongoQueryTranslator.visit_expr(&Filter::any_of("SenderID", "LAB-01")).is_err());
    }
}
