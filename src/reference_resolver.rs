//! Lookups of records by collection name and identifier.
//!
//! An absent collection behaves like an empty one everywhere in this module,
//! and a failed lookup is a plain `None` that callers are expected to skip.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::scenario_model::{Record, RecordId, ScenarioDocument};

/// First record of `collection` whose resolved id equals `id`.
pub fn find_by_id<'a>(document: &'a ScenarioDocument, collection: &str, id: RecordId) -> Option<&'a Record> {
    document
        .collection(collection)
        .iter()
        .find(|record| record.resolved_id() == Some(id))
}

pub fn find_by_id_mut<'a>(
    document: &'a mut ScenarioDocument,
    collection: &str,
    id: RecordId,
) -> Option<&'a mut Record> {
    document
        .collection_mut(collection)?
        .iter_mut()
        .find(|record| record.resolved_id() == Some(id))
}

/// Largest resolved id in `collection`, never below zero.
pub fn max_id(document: &ScenarioDocument, collection: &str) -> RecordId {
    document
        .collection(collection)
        .iter()
        .filter_map(Record::resolved_id)
        .fold(0, RecordId::max)
}

/// Identifier the next appended record should take.
///
/// Fails once the largest id of `collection` is `i64::MAX`.
pub fn next_id(document: &ScenarioDocument, collection: &str) -> Result<RecordId, AppResponse> {
    id_at(collection, max_id(document, collection), 1)
}

/// `base + offset`, or a validation error when that overflows.
pub fn id_at(collection: &str, base: RecordId, offset: usize) -> Result<RecordId, AppResponse> {
    RecordId::try_from(offset)
        .ok()
        .and_then(|offset| base.checked_add(offset))
        .ok_or_else(|| AppResponse::ValidationError(format!("No identifiers left after {base} in {collection}")))
}

/// Distinct ids of `collection` in document order.
///
/// Records without a usable id count as id `0`.
pub fn candidate_ids(document: &ScenarioDocument, collection: &str) -> Vec<RecordId> {
    let mut ids: Vec<RecordId> = Vec::new();
    for record in document.collection(collection) {
        let id = record.resolved_id().unwrap_or(0);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

pub fn pick_random_id<R: Rng + ?Sized>(document: &ScenarioDocument, collection: &str, rng: &mut R) -> Option<RecordId> {
    candidate_ids(document, collection).choose(rng).copied()
}

/// Up to `count` distinct ids sampled without replacement.
///
/// When the collection has no more than `count` ids, all of them are
/// returned in document order.
pub fn pick_random_ids<R: Rng + ?Sized>(
    document: &ScenarioDocument,
    collection: &str,
    count: usize,
    rng: &mut R,
) -> Vec<RecordId> {
    let ids = candidate_ids(document, collection);
    if ids.len() <= count {
        return ids;
    }
    ids.choose_multiple(rng, count).copied().collect()
}

/// One selectable target of a foreign-key picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceOption {
    pub class: String,
    pub id: RecordId,
    pub label: String,
}

/// Every record of `collection` as a picker option.
///
/// Records without an id fall back to their position, and records without a
/// non-empty label are shown as `#<id>`.
pub fn reference_options(document: &ScenarioDocument, collection: &str) -> Vec<ReferenceOption> {
    document
        .collection(collection)
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let id = record.resolved_id().unwrap_or(index as RecordId);
            let label = record
                .label()
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{id}"));
            ReferenceOption {
                class: collection.to_string(),
                id,
                label,
            }
        })
        .collect()
}
