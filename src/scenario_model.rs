//! Data model definitions for scenario documents.
//!
//! A scenario is a JSON object mapping collection names (`NetworkSwitch`,
//! `User`, `EdgeServer`, ...) to ordered arrays of records. This module
//! defines the in-memory shape of that document:
//!
//! - [`ScenarioDocument`]: ordered map of collection name to records
//! - [`Record`]: one entry, with `attributes` and `relationships` sections
//! - [`FieldValue`]: the classified value of a relationship field
//! - [`Reference`]: a `{ "class": ..., "id": ... }` foreign key
//!
//! Relationship fields are classified once, when the record is deserialized,
//! instead of being re-inspected on every pass. Classification is lossless:
//! a [`FieldValue`] converts back into the same JSON value it was built from.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

/// Ordered JSON object, as produced by `serde_json` with `preserve_order`.
pub type JsonMap = Map<String, JsonValue>;

/// Identifier of a record within its collection.
///
/// Uniqueness is a convention of the scenario files, never enforced here.
pub type RecordId = i64;

/// Relationship section of a record, field name to classified value.
pub type Relationships = IndexMap<String, FieldValue>;

/// A foreign key pointing at a record of another collection.
///
/// A JSON object is a reference when it has exactly two keys, `class`
/// (a string) and `id` (an integer).
///
/// # Examples
///
/// ```rust
/// use scenario_editor_core::scenario_model::Reference;
/// use serde_json::json;
///
/// let reference = Reference::from_json(&json!({"class": "BaseStation", "id": 3}));
/// assert_eq!(reference, Some(Reference::new("BaseStation", 3)));
///
/// // A third key makes it an ordinary object.
/// assert!(Reference::from_json(&json!({"class": "BaseStation", "id": 3, "x": 1})).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Collection name of the referenced record.
    pub class: String,
    /// Resolved identifier of the referenced record.
    pub id: RecordId,
}

impl Reference {
    pub fn new(class: impl Into<String>, id: RecordId) -> Self {
        Self {
            class: class.into(),
            id,
        }
    }

    /// Recognizes the exact `{class, id}` shape.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        if object.len() != 2 {
            return None;
        }
        let class = object.get("class")?.as_str()?;
        let id = object.get("id")?.as_i64()?;
        Some(Self::new(class, id))
    }

    pub fn to_json(&self) -> JsonValue {
        json!({ "class": self.class, "id": self.id })
    }
}

/// One element of a reference array: either a full reference or a bare id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceEntry {
    Reference(Reference),
    Id(RecordId),
}

impl ReferenceEntry {
    pub fn id(&self) -> RecordId {
        match self {
            ReferenceEntry::Reference(reference) => reference.id,
            ReferenceEntry::Id(id) => *id,
        }
    }

    pub fn from_json(value: &JsonValue) -> Option<Self> {
        if let Some(reference) = Reference::from_json(value) {
            return Some(ReferenceEntry::Reference(reference));
        }
        value.as_i64().map(ReferenceEntry::Id)
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            ReferenceEntry::Reference(reference) => reference.to_json(),
            ReferenceEntry::Id(id) => JsonValue::from(*id),
        }
    }
}

/// Classified value of a relationship field.
///
/// The variant is decided when the record is deserialized:
///
/// | JSON shape | Variant |
/// |---|---|
/// | `{"class": "X", "id": 1}` | [`FieldValue::Reference`] |
/// | array of references and/or integer ids (also `[]`) | [`FieldValue::ReferenceArray`] |
/// | any other object | [`FieldValue::Object`] |
/// | non-empty array of objects, not all references | [`FieldValue::ObjectArray`] |
/// | anything else (null, strings, numbers, mixed arrays) | [`FieldValue::Scalar`] |
///
/// # Examples
///
/// ```rust
/// use scenario_editor_core::scenario_model::FieldValue;
/// use serde_json::json;
///
/// let links = FieldValue::from(json!([{"class": "NetworkLink", "id": 1}, 2]));
/// assert_eq!(links.reference_ids(), vec![1, 2]);
///
/// let model = FieldValue::from(json!("ConteratoNetworkPowerModel"));
/// assert!(matches!(model, FieldValue::Scalar(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum FieldValue {
    Reference(Reference),
    ReferenceArray(Vec<ReferenceEntry>),
    Object(JsonMap),
    ObjectArray(Vec<JsonMap>),
    Scalar(JsonValue),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Scalar(JsonValue::Null))
    }

    pub fn is_array(&self) -> bool {
        match self {
            FieldValue::ReferenceArray(_) | FieldValue::ObjectArray(_) => true,
            FieldValue::Scalar(value) => value.is_array(),
            _ => false,
        }
    }

    /// Identifiers this field points at.
    ///
    /// A single reference yields its id. Arrays yield the id of every entry
    /// that carries one (references, bare ids, objects with an integer `id`);
    /// entries without an id are dropped. Nested non-reference objects and
    /// scalars point at nothing.
    pub fn reference_ids(&self) -> Vec<RecordId> {
        match self {
            FieldValue::Reference(reference) => vec![reference.id],
            FieldValue::ReferenceArray(entries) => entries.iter().map(ReferenceEntry::id).collect(),
            FieldValue::ObjectArray(objects) => objects
                .iter()
                .filter_map(|object| object.get("id").and_then(JsonValue::as_i64))
                .collect(),
            FieldValue::Scalar(JsonValue::Array(items)) => items.iter().filter_map(entry_id).collect(),
            _ => Vec::new(),
        }
    }

    /// True when an array field already holds an entry with `id`.
    pub fn contains_id(&self, id: RecordId) -> bool {
        self.is_array() && self.reference_ids().contains(&id)
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::from(self.clone())
    }
}

fn entry_id(value: &JsonValue) -> Option<RecordId> {
    match value {
        JsonValue::Object(object) => object.get("id").and_then(JsonValue::as_i64),
        other => other.as_i64(),
    }
}

fn classify_array(items: Vec<JsonValue>) -> FieldValue {
    let entries: Option<Vec<ReferenceEntry>> = items.iter().map(ReferenceEntry::from_json).collect();
    if let Some(entries) = entries {
        return FieldValue::ReferenceArray(entries);
    }

    if items.iter().all(JsonValue::is_object) {
        let objects = items
            .into_iter()
            .filter_map(|item| match item {
                JsonValue::Object(object) => Some(object),
                _ => None,
            })
            .collect();
        return FieldValue::ObjectArray(objects);
    }

    FieldValue::Scalar(JsonValue::Array(items))
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        if let Some(reference) = Reference::from_json(&value) {
            return FieldValue::Reference(reference);
        }
        match value {
            JsonValue::Object(object) => FieldValue::Object(object),
            JsonValue::Array(items) => classify_array(items),
            other => FieldValue::Scalar(other),
        }
    }
}

impl From<FieldValue> for JsonValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Reference(reference) => reference.to_json(),
            FieldValue::ReferenceArray(entries) => {
                JsonValue::Array(entries.iter().map(ReferenceEntry::to_json).collect())
            }
            FieldValue::Object(object) => JsonValue::Object(object),
            FieldValue::ObjectArray(objects) => {
                JsonValue::Array(objects.into_iter().map(JsonValue::Object).collect())
            }
            FieldValue::Scalar(value) => value,
        }
    }
}

impl From<Reference> for FieldValue {
    fn from(reference: Reference) -> Self {
        FieldValue::Reference(reference)
    }
}

/// A single entry of a scenario collection.
///
/// Scenario records conventionally carry two sections:
///
/// - **attributes**: free-form data, usually including a numeric `id`
/// - **relationships**: field name to [`FieldValue`]
///
/// Any other top-level keys (some files put `id` at the top level) are kept
/// in `extra` and written back untouched. A `null` section reads as absent
/// and is not written back; a section that is neither an object nor `null`
/// rejects the record.
///
/// # Examples
///
/// ```rust
/// use scenario_editor_core::scenario_model::{Record, Reference};
/// use serde_json::json;
///
/// let record: Record = serde_json::from_value(json!({
///     "attributes": {"id": 4, "coordinates": [2, 0]},
///     "relationships": {"base_station": {"class": "BaseStation", "id": 1}}
/// }))?;
///
/// assert_eq!(record.resolved_id(), Some(4));
/// assert_eq!(record.relationship_reference("base_station"), Some(&Reference::new("BaseStation", 1)));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<JsonMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Relationships>,

    #[serde(flatten)]
    pub extra: JsonMap,
}

impl Record {
    /// Identifier used for lookups: `attributes.id`, else top-level `id`.
    ///
    /// A present, non-null `attributes.id` wins even when it is not an
    /// integer, in which case the record has no usable id.
    pub fn resolved_id(&self) -> Option<RecordId> {
        let from_attributes = self
            .attributes
            .as_ref()
            .and_then(|attributes| attributes.get("id"))
            .filter(|value| !value.is_null());

        match from_attributes {
            Some(value) => value.as_i64(),
            None => self.extra.get("id").and_then(JsonValue::as_i64),
        }
    }

    pub fn has_attribute_id(&self) -> bool {
        self.attributes
            .as_ref()
            .is_some_and(|attributes| attributes.contains_key("id"))
    }

    /// Writes `id` into `attributes` when the record has them, at top level otherwise.
    pub fn set_id(&mut self, id: RecordId) {
        match self.attributes.as_mut() {
            Some(attributes) => {
                attributes.insert("id".to_string(), JsonValue::from(id));
            }
            None => {
                self.extra.insert("id".to_string(), JsonValue::from(id));
            }
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&JsonValue> {
        self.attributes.as_ref().and_then(|attributes| attributes.get(key))
    }

    pub fn attributes_mut(&mut self) -> &mut JsonMap {
        self.attributes.get_or_insert_with(JsonMap::new)
    }

    pub fn label(&self) -> Option<&str> {
        self.attribute("label")
            .or_else(|| self.extra.get("label"))
            .and_then(JsonValue::as_str)
    }

    pub fn relationship(&self, field: &str) -> Option<&FieldValue> {
        self.relationships.as_ref().and_then(|relationships| relationships.get(field))
    }

    pub fn relationship_reference(&self, field: &str) -> Option<&Reference> {
        match self.relationship(field) {
            Some(FieldValue::Reference(reference)) => Some(reference),
            _ => None,
        }
    }

    /// Relationship section, created empty when missing.
    pub fn relationships_mut(&mut self) -> &mut Relationships {
        self.relationships.get_or_insert_with(Relationships::new)
    }

    pub fn set_relationship(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.relationships_mut().insert(field.into(), value.into());
    }
}

/// An entire scenario: collection name to ordered records.
///
/// Collection order and record order are preserved exactly as loaded, and new
/// collections are appended at the end.
///
/// # Examples
///
/// ```rust
/// use scenario_editor_core::scenario_model::{Record, ScenarioDocument};
///
/// let mut document = ScenarioDocument::new();
/// document.push("EdgeServer", Record::default());
///
/// assert_eq!(document.collection("EdgeServer").len(), 1);
/// assert!(document.collection("User").is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioDocument {
    pub collections: IndexMap<String, Vec<Record>>,
}

impl ScenarioDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Records of `name`; an absent collection reads as empty.
    pub fn collection(&self, name: &str) -> &[Record] {
        self.collections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn collection_mut(&mut self, name: &str) -> Option<&mut Vec<Record>> {
        self.collections.get_mut(name)
    }

    /// Records of `name`, creating the collection when absent.
    pub fn collection_entry(&mut self, name: &str) -> &mut Vec<Record> {
        self.collections.entry(name.to_string()).or_default()
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn push(&mut self, name: &str, record: Record) {
        self.collection_entry(name).push(record);
    }

    pub fn extend(&mut self, name: &str, records: impl IntoIterator<Item = Record>) {
        self.collection_entry(name).extend(records);
    }
}
