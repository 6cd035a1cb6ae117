//! Bidirectional relationship synchronization.
//!
//! Record factories only fill in the forward side of a relationship (a `User`
//! lists its `applications`). After new records are appended to a document,
//! [`synchronize`] walks their declared owning fields and installs the
//! back-reference on every referenced record (each `Application` then lists
//! the `User` under `users`).
//!
//! Nothing here fails: a dangling id, an unknown collection or a malformed
//! field is skipped and the rest of the batch still applies.

use indexmap::IndexMap;
use log::debug;
use serde_json::Value as JsonValue;

use crate::reference_resolver::find_by_id_mut;
use crate::relationship_schema::RelationshipSchema;
use crate::scenario_model::{FieldValue, Record, Reference, ReferenceEntry, ScenarioDocument};

/// Newly created records grouped by collection name.
pub type NewRecords = IndexMap<String, Vec<Record>>;

/// Returns a copy of `document` with back-references for `new_records` installed.
///
/// `document` must already contain the new records. The input is left
/// untouched.
///
/// # Examples
///
/// ```rust
/// use indexmap::IndexMap;
/// use scenario_editor_core::relationship_schema::RelationshipSchema;
/// use scenario_editor_core::relationship_sync::synchronize;
/// use scenario_editor_core::scenario_model::{Record, Reference, ScenarioDocument};
/// use serde_json::json;
///
/// let station: Record = serde_json::from_value(json!({"attributes": {"id": 1}, "relationships": {"edge_servers": []}}))?;
/// let server: Record = serde_json::from_value(json!({
///     "attributes": {"id": 7},
///     "relationships": {"base_station": {"class": "BaseStation", "id": 1}}
/// }))?;
///
/// let mut document = ScenarioDocument::new();
/// document.push("BaseStation", station);
/// document.push("EdgeServer", server.clone());
///
/// let new_records = IndexMap::from([("EdgeServer".to_string(), vec![server])]);
/// let synced = synchronize(&new_records, &document, &RelationshipSchema::edgesimpy());
///
/// let ids = synced.collection("BaseStation")[0].relationship("edge_servers").unwrap().reference_ids();
/// assert_eq!(ids, vec![7]);
/// # Ok::<(), serde_json::Error>(())
/// ```
pub fn synchronize(new_records: &NewRecords, document: &ScenarioDocument, schema: &RelationshipSchema) -> ScenarioDocument {
    let mut updated = document.clone();
    synchronize_in_place(new_records, &mut updated, schema);
    updated
}

/// Same as [`synchronize`] but mutates `document` directly.
///
/// Returns the number of reciprocal fields written.
pub fn synchronize_in_place(
    new_records: &NewRecords,
    document: &mut ScenarioDocument,
    schema: &RelationshipSchema,
) -> usize {
    let mut written = 0;

    for (source_type, records) in new_records {
        let Some(mappings) = schema.owning_fields(source_type) else {
            debug!("No relationship mappings for {source_type}, skipping {} records", records.len());
            continue;
        };

        for record in records {
            let Some(source_id) = record.resolved_id() else {
                continue;
            };

            for (field, target) in mappings {
                let Some(value) = record.relationship(field) else {
                    continue;
                };

                for target_id in value.reference_ids() {
                    let Some(target_record) = find_by_id_mut(document, &target.collection, target_id) else {
                        debug!(
                            "{source_type} {source_id}: {field} points at missing {} {target_id}",
                            target.collection
                        );
                        continue;
                    };

                    let back_reference = Reference::new(source_type.as_str(), source_id);
                    if schema.is_array_field(&target.field) {
                        if append_back_reference(target_record, &target.field, back_reference) {
                            written += 1;
                        }
                    } else {
                        target_record.set_relationship(target.field.as_str(), back_reference);
                        written += 1;
                    }
                }
            }
        }
    }

    debug!("Relationship sync wrote {written} reciprocal fields");
    written
}

/// Appends `reference` to the array field `field` of `record`.
///
/// A missing or non-array field is replaced by an empty array first. Nothing
/// is appended when an entry with the same id is already present, whether it
/// is stored as a reference or as a bare id. Returns whether the field grew.
pub fn append_back_reference(record: &mut Record, field: &str, reference: Reference) -> bool {
    let value = record
        .relationships_mut()
        .entry(field.to_string())
        .or_insert_with(|| FieldValue::ReferenceArray(Vec::new()));

    if !value.is_array() {
        *value = FieldValue::ReferenceArray(Vec::new());
    }

    if value.contains_id(reference.id) {
        return false;
    }

    match value {
        FieldValue::ReferenceArray(entries) => entries.push(ReferenceEntry::Reference(reference)),
        FieldValue::ObjectArray(objects) => {
            if let JsonValue::Object(object) = reference.to_json() {
                objects.push(object);
            }
        }
        FieldValue::Scalar(JsonValue::Array(items)) => items.push(reference.to_json()),
        _ => return false,
    }
    true
}
