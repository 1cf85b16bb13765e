//! Partial field replacement (`$set` semantics) on stored documents.

use bson::{Bson, Document};

use docaccess_core::error::{DocumentStoreError, DocumentStoreResult};

/// Sets every dotted path in `set` on `document`.
///
/// Missing intermediate documents are created. Returns `true` only if at least one
/// value actually differs from what was stored. On error `document` may be partially
/// updated, so callers apply this to a staged copy.
pub(crate) fn apply_set(document: &mut Document, set: &Document) -> DocumentStoreResult<bool> {
    let mut changed = false;

    for (path, value) in set {
        if path == "_id" || path.starts_with("_id.") {
            if document.get("_id") != Some(value) {
                return Err(DocumentStoreError::Persistence(
                    "the _id field is immutable".to_string(),
                ));
            }
            continue;
        }

        let segments = path.split('.').collect::<Vec<_>>();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(DocumentStoreError::Persistence(format!("invalid update path '{path}'")));
        }

        changed |= set_path(document, &segments, value, path)?;
    }

    Ok(changed)
}

fn set_path(document: &mut Document, segments: &[&str], value: &Bson, path: &str) -> DocumentStoreResult<bool> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(false);
    };

    if rest.is_empty() {
        if document.get(*head) == Some(value) {
            return Ok(false);
        }
        document.insert(*head, value.clone());
        return Ok(true);
    }

    let child = document
        .entry(head.to_string())
        .or_insert_with(|| Bson::Document(Document::new()));

    set_in(child, rest, value, path)
}

fn set_in(target: &mut Bson, segments: &[&str], value: &Bson, path: &str) -> DocumentStoreResult<bool> {
    match target {
        Bson::Document(document) => set_path(document, segments, value, path),
        Bson::Array(items) => {
            let Some((head, rest)) = segments.split_first() else {
                return Ok(false);
            };
            let index = head.parse::<usize>().map_err(|_| {
                DocumentStoreError::Persistence(format!("cannot set '{path}': '{head}' is not an array index"))
            })?;

            if items.len() <= index {
                items.resize(index + 1, Bson::Null);
            }

            if rest.is_empty() {
                if items[index] == *value {
                    return Ok(false);
                }
                items[index] = value.clone();
                return Ok(true);
            }

            if items[index] == Bson::Null {
                items[index] = Bson::Document(Document::new());
            }

            set_in(&mut items[index], rest, value, path)
        }
        _ => Err(DocumentStoreError::Persistence(format!(
            "cannot set '{path}': a parent field is not a document"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    fn stored() -> Document {
        doc! {
            "_id": ObjectId::parse_str("65f1a2b3c4d5e6f708192a3b").unwrap(),
            "SenderID": "LAB-01",
            "Patient": {
                "Order": {
                    "ReportType": "F",
                    "Results": [{ "Value": 10.5, "Units": "mmol/L" }],
                },
            },
        }
    }

    #[test]
    fn test_top_level_and_nested_paths() {
        let mut document = stored();

        assert!(apply_set(&mut document, &doc! { "SenderID": "LAB-02" }).unwrap());
        assert!(apply_set(&mut document, &doc! { "Patient.Order.ReportType": "C" }).unwrap());
        assert!(apply_set(&mut document, &doc! { "Patient.Order.Results.0.Units": "g/L" }).unwrap());

        assert_eq!(document.get_str("SenderID").unwrap(), "LAB-02");
        let order = document.get_document("Patient").unwrap().get_document("Order").unwrap();
        assert_eq!(order.get_str("ReportType").unwrap(), "C");
        assert_eq!(
            order.get_array("Results").unwrap()[0].as_document().unwrap().get_str("Units").unwrap(),
            "g/L"
        );
    }

    #[test]
    fn test_identical_value_is_not_a_change() {
        let mut document = stored();

        assert!(!apply_set(&mut document, &doc! { "SenderID": "LAB-01" }).unwrap());
        assert!(!apply_set(&mut document, &doc! { "Patient.Order.Results.0.Value": 10.5 }).unwrap());
        assert!(!apply_set(&mut document, &doc! {}).unwrap());
        assert_eq!(document, stored());
    }

    #[test]
    fn test_missing_parents_are_created() {
        let mut document = stored();

        assert!(apply_set(&mut document, &doc! { "Patient.Visit.Room": "12B" }).unwrap());
        assert_eq!(
            document.get_document("Patient").unwrap().get_document("Visit").unwrap(),
            &doc! { "Room": "12B" }
        );
    }

    #[test]
    fn test_rejects_id_change_and_scalar_parent() {
        let mut document = stored();

        assert!(matches!(
            apply_set(&mut document, &doc! { "_id": ObjectId::new() }),
            Err(DocumentStoreError::Persistence(_))
        ));
        assert!(matches!(
            apply_set(&mut document, &doc! { "SenderID.Code": "X" }),
            Err(DocumentStoreError::Persistence(_))
        ));

        let id = document.get_object_id("_id").unwrap();
        assert!(!apply_set(&mut document, &doc! { "_id": id }).unwrap());
    }
}
