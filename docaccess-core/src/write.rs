//! Write requests and store-reported write results.
//!
//! Store clients report what a write actually did through these types. The access
//! layer turns them into the booleans and per-item outcomes its callers see.

use bson::{Document as BsonDocument, oid::ObjectId};

use crate::query::Condition;

/// Result of an update as reported by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents selected by the condition.
    pub matched_count: u64,
    /// Documents whose content actually changed.
    pub modified_count: u64,
}

/// Result of a delete as reported by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// One sub-operation of a bulk write request.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteModel {
    /// Apply `set` as a partial field replacement to the first document matching `filter`.
    UpdateOne { filter: Condition, set: BsonDocument },
    /// Remove the first document matching `filter`.
    DeleteOne { filter: Condition },
}

/// Store-reported result for one [`WriteModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteModelResult {
    Updated(UpdateResult),
    Deleted(DeleteResult),
}

impl WriteModelResult {
    /// Whether the sub-operation changed the store.
    pub fn applied(&self) -> bool {
        match self {
            WriteModelResult::Updated(result) => result.modified_count > 0,
            WriteModelResult::Deleted(result) => result.deleted_count > 0,
        }
    }
}

/// Store-reported results of a bulk write, index-aligned with the submitted models.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub results: Vec<WriteModelResult>,
}

impl BulkWriteResult {
    /// Sum of modified counts across all update sub-operations.
    pub fn modified_count(&self) -> u64 {
        self.results
            .iter()
            .map(|result| match result {
                WriteModelResult::Updated(update) => update.modified_count,
                WriteModelResult::Deleted(_) => 0,
            })
            .sum()
    }

    /// Sum of deleted counts across all delete sub-operations.
    pub fn deleted_count(&self) -> u64 {
        self.results
            .iter()
            .map(|result| match result {
                WriteModelResult::Deleted(delete) => delete.deleted_count,
                WriteModelResult::Updated(_) => 0,
            })
            .sum()
    }
}

/// Outcome of one item of a bulk update or delete by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkItem {
    pub id: ObjectId,
    /// `true` when the store modified (or deleted) the document.
    pub applied: bool,
}

/// Per-item outcome of a bulk update or delete by identifiers.
///
/// Items appear in the order the identifiers were supplied, so callers can see
/// exactly which parts of a batch took effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub items: Vec<BulkItem>,
}

impl BulkOutcome {
    /// Pairs identifiers with the store's index-aligned results.
    ///
    /// Identifiers without a reported result count as not applied.
    pub fn from_results(ids: Vec<ObjectId>, result: &BulkWriteResult) -> Self {
        Self {
            items: ids
                .into_iter()
                .enumerate()
                .map(|(index, id)| BulkItem {
                    id,
                    applied: result
                        .results
                        .get(index)
                        .is_some_and(WriteModelResult::applied),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items the store applied.
    pub fn applied_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.applied)
            .count()
    }

    /// `true` if at least one item was applied.
    pub fn any_applied(&self) -> bool {
        self.items.iter().any(|item| item.applied)
    }

    /// `true` if the batch is non-empty and every item was applied.
    pub fn all_applied(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.applied)
    }

    /// Identifiers of the items the store did not apply.
    pub fn unapplied_ids(&self) -> Vec<ObjectId> {
        self.items
            .iter()
            .filter(|item| !item.applied)
            .map(|item| item.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updated(modified_count: u64) -> WriteModelResult {
        WriteModelResult::Updated(UpdateResult { matched_count: 1, modified_count })
    }

    #[test]
    fn test_bulk_write_counts() {
        let result = BulkWriteResult {
            results: vec![
                updated(1),
                updated(0),
                WriteModelResult::Deleted(DeleteResult { deleted_count: 1 }),
            ],
        };

        assert_eq!(result.modified_count(), 1);
        assert_eq!(result.deleted_count(), 1);
    }

    #[test]
    fn test_outcome_reports_partial_batches() {
        let ids = vec![ObjectId::new(), ObjectId::new(), ObjectId::new()];
        // Third result intentionally missing.
        let result = BulkWriteResult { results: vec![updated(1), updated(0)] };

        let outcome = BulkOutcome::from_results(ids.clone(), &result);

        assert_eq!(outcome.len(), 3);
        assert_eq!(outcome.applied_count(), 1);
        assert!(outcome.any_applied());
        assert!(!outcome.all_applied());
        assert_eq!(outcome.unapplied_ids(), vec![ids[1], ids[2]]);
    }

    #[test]
    fn test_empty_outcome_is_not_all_applied() {
        let outcome = BulkOutcome::default();

        assert!(outcome.is_empty());
        assert!(!outcome.any_applied());
        assert!(!outcome.all_applied());
    }
}
