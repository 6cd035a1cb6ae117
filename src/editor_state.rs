//! Editing session over one scenario document.
//!
//! [`EditorState`] is what the FFI layer hands out as an opaque pointer. It
//! owns the loaded document together with the codec, record factory, seeded
//! RNG and the optional snapshot store, and every mutating operation either
//! succeeds completely or leaves the document as it was.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::derived_sync::{link_application_access_patterns, link_new_switches, link_user_access_patterns};
use crate::editor_config::EditorConfig;
use crate::record_factory::{EdgeSimPyFactory, GenerationContext, RecordFactory};
use crate::reference_resolver::{id_at, next_id, reference_options, ReferenceOption};
use crate::relationship_schema::RelationshipSchema;
use crate::relationship_sync::synchronize_in_place;
use crate::scenario_codec::ScenarioCodec;
use crate::scenario_loader::{read_file_text, ScenarioLoader};
use crate::scenario_model::{Record, ScenarioDocument};
use crate::scenario_store::ScenarioStore;

const SUMMARY_VALUE_LIMIT: usize = 30;

/// Name and size of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub name: String,
    pub count: usize,
}

/// A collection matching a search, with the positions of its matching records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMatch {
    pub name: String,
    pub indices: Vec<usize>,
}

/// One attribute rendered for a record card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub key: String,
    pub value: String,
}

/// Display strings for the attributes of `record`.
///
/// Arrays show their length, objects show `[object]`, and anything longer
/// than 30 characters is cut with `...`. Records without an `attributes`
/// section are summarized from their top-level keys.
pub fn item_summary(record: &Record) -> Vec<SummaryEntry> {
    let source = match &record.attributes {
        Some(attributes) => attributes.clone(),
        None => match serde_json::to_value(record) {
            Ok(JsonValue::Object(object)) => object,
            _ => return Vec::new(),
        },
    };

    source
        .iter()
        .map(|(key, value)| {
            let display = match value {
                JsonValue::Array(items) => format!("[{} items]", items.len()),
                JsonValue::Object(_) => "[object]".to_string(),
                JsonValue::String(text) => truncate(text),
                other => truncate(&other.to_string()),
            };
            SummaryEntry {
                key: key.clone(),
                value: display,
            }
        })
        .collect()
}

fn truncate(text: &str) -> String {
    if text.chars().count() > SUMMARY_VALUE_LIMIT {
        let head: String = text.chars().take(SUMMARY_VALUE_LIMIT).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// One editing session: the loaded document plus everything needed to
/// change it.
///
/// Loading replaces the document only after the new text parsed; on any
/// error the previous document stays in place.
pub struct EditorState {
    pub document: ScenarioDocument,
    pub config: EditorConfig,
    codec: ScenarioCodec,
    factory: Box<dyn RecordFactory>,
    rng: StdRng,
    loader: Option<ScenarioLoader>,
    store: Option<ScenarioStore>,
}

impl EditorState {
    pub fn init(config: EditorConfig) -> Result<Self, AppResponse> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let store = match &config.store_path {
            Some(path) => Some(ScenarioStore::open(path, config.store_map_size)?),
            None => None,
        };

        Ok(Self {
            document: ScenarioDocument::new(),
            codec: ScenarioCodec::new()?,
            factory: Box::new(EdgeSimPyFactory),
            rng,
            loader: None,
            store,
            config,
        })
    }

    /// Replaces the record factory used by [`EditorState::generate_items`].
    pub fn with_factory(mut self, factory: Box<dyn RecordFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn schema(&self) -> &RelationshipSchema {
        &self.config.relationship_schema
    }

    pub fn codec(&self) -> &ScenarioCodec {
        &self.codec
    }

    // Loading

    pub fn load_from_str(&mut self, text: &str) -> Result<&ScenarioDocument, AppResponse> {
        let document = self.codec.parse_document(text)?;
        info!(
            "Scenario loaded: {} collections, {} records",
            document.collections.len(),
            document.record_count()
        );
        self.document = document;
        Ok(&self.document)
    }

    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<&ScenarioDocument, AppResponse> {
        let text = read_file_text(path)?;
        self.load_from_str(&text)
    }

    pub fn load_from_url(&mut self, url: &str) -> Result<&ScenarioDocument, AppResponse> {
        if url.trim().is_empty() {
            return Err(AppResponse::BadRequest("URL cannot be empty".to_string()));
        }
        let text = self.loader()?.fetch_text(url)?;
        self.load_from_str(&text)
    }

    pub fn load_example(&mut self) -> Result<&ScenarioDocument, AppResponse> {
        let url = self.config.default_url.clone();
        self.load_from_url(&url)
    }

    fn loader(&mut self) -> Result<&ScenarioLoader, AppResponse> {
        if self.loader.is_none() {
            self.loader = Some(ScenarioLoader::new(self.config.http_timeout_secs)?);
        }
        self.loader
            .as_ref()
            .ok_or_else(|| AppResponse::TransportError("HTTP client unavailable".to_string()))
    }

    pub fn clear(&mut self) {
        self.document = ScenarioDocument::new();
    }

    // Export

    pub fn export_string(&self) -> Result<String, AppResponse> {
        if self.document.is_empty() {
            return Err(AppResponse::ValidationError("No scenario data to download".to_string()));
        }
        self.codec.serialize_document(&self.document)
    }

    /// Writes the export file into `dir` and returns its path.
    pub fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AppResponse> {
        let text = self.export_string()?;
        let path = dir.as_ref().join(&self.config.export_file_name);
        fs::write(&path, text)?;
        info!("Scenario exported to {}", path.display());
        Ok(path)
    }

    // Browsing

    /// True when at least one collection holds a record.
    pub fn has_scenario_data(&self) -> bool {
        self.document.collections.values().any(|records| !records.is_empty())
    }

    pub fn collections(&self) -> Vec<CollectionSummary> {
        self.document
            .collections
            .iter()
            .map(|(name, records)| CollectionSummary {
                name: name.clone(),
                count: records.len(),
            })
            .collect()
    }

    /// Case-insensitive search over collection names and record JSON.
    ///
    /// A collection whose name matches is returned with all of its records;
    /// otherwise only records whose JSON contains the query are listed, and
    /// collections without any are left out. An empty query matches
    /// everything.
    pub fn filter(&self, query: &str) -> Vec<CollectionMatch> {
        let query = query.to_lowercase();
        self.document
            .collections
            .iter()
            .filter_map(|(name, records)| {
                let all: Vec<usize> = (0..records.len()).collect();
                if query.is_empty() || name.to_lowercase().contains(&query) {
                    return Some(CollectionMatch {
                        name: name.clone(),
                        indices: all,
                    });
                }
                let indices: Vec<usize> = records
                    .iter()
                    .enumerate()
                    .filter(|(_, record)| {
                        serde_json::to_string(record)
                            .map(|json| json.to_lowercase().contains(&query))
                            .unwrap_or(false)
                    })
                    .map(|(index, _)| index)
                    .collect();
                (!indices.is_empty()).then(|| CollectionMatch {
                    name: name.clone(),
                    indices,
                })
            })
            .collect()
    }

    pub fn reference_options(&self, collection: &str) -> Vec<ReferenceOption> {
        reference_options(&self.document, collection)
    }

    // Editing

    pub fn get_item(&self, collection: &str, index: usize) -> Result<&Record, AppResponse> {
        self.document
            .collection(collection)
            .get(index)
            .ok_or_else(|| AppResponse::NotFound(format!("No {collection} at index {index}")))
    }

    /// Starting point for a new record: a copy of the first record of the
    /// collection, renumbered when it carries an `attributes.id`.
    pub fn new_item_template(&self, collection: &str) -> Result<Record, AppResponse> {
        let mut template = self.document.collection(collection).first().cloned().unwrap_or_default();
        if template.has_attribute_id() {
            template.set_id(next_id(&self.document, collection)?);
        }
        Ok(template)
    }

    /// Appends `record` and returns its index.
    pub fn add_item(&mut self, collection: &str, record: Record) -> usize {
        let records = self.document.collection_entry(collection);
        records.push(record);
        info!("Item added to {collection}");
        records.len() - 1
    }

    pub fn update_item(&mut self, collection: &str, index: usize, record: Record) -> Result<(), AppResponse> {
        let slot = self
            .document
            .collection_mut(collection)
            .and_then(|records| records.get_mut(index))
            .ok_or_else(|| AppResponse::NotFound(format!("No {collection} at index {index}")))?;
        *slot = record;
        info!("Item {index} of {collection} updated");
        Ok(())
    }

    pub fn add_item_json(&mut self, collection: &str, text: &str) -> Result<usize, AppResponse> {
        let record = self.codec.parse_record(text)?;
        Ok(self.add_item(collection, record))
    }

    pub fn update_item_json(&mut self, collection: &str, index: usize, text: &str) -> Result<(), AppResponse> {
        let record = self.codec.parse_record(text)?;
        self.update_item(collection, index, record)
    }

    /// Removes the record at `index`, keeping the order of the others.
    pub fn delete_item(&mut self, collection: &str, index: usize) -> Result<Record, AppResponse> {
        let records = self
            .document
            .collection_mut(collection)
            .filter(|records| index < records.len())
            .ok_or_else(|| AppResponse::NotFound(format!("No {collection} at index {index}")))?;
        let removed = records.remove(index);
        info!("Item {index} of {collection} deleted");
        Ok(removed)
    }

    // Generation

    /// Generates `count` records of `collection` with the session factory.
    ///
    /// Returns the number of records actually appended, which is lower than
    /// `count` when the factory lacks prerequisites for some of them.
    pub fn generate_items(&mut self, collection: &str, count: i64, add_dependencies: bool) -> Result<usize, AppResponse> {
        let factory = std::mem::replace(&mut self.factory, Box::new(EdgeSimPyFactory));
        let result = self.generate_items_with(factory.as_ref(), collection, count, add_dependencies);
        self.factory = factory;
        result
    }

    pub fn generate_items_with(
        &mut self,
        factory: &dyn RecordFactory,
        collection: &str,
        count: i64,
        add_dependencies: bool,
    ) -> Result<usize, AppResponse> {
        if count <= 0 {
            return Err(AppResponse::ValidationError(
                "Please enter a number greater than 0".to_string(),
            ));
        }
        if count > self.config.max_generate_count {
            return Err(AppResponse::ValidationError(format!(
                "Maximum {} items can be generated at once",
                self.config.max_generate_count
            )));
        }

        let count = count as usize;
        let start = next_id(&self.document, collection)?;
        // Every index in start..=last fits in an id from here on.
        let last = id_at(collection, start, count - 1)?;

        let mut records: Vec<Record> = {
            let mut context = GenerationContext::new(&self.document, &mut self.rng);
            (start..=last)
                .filter_map(|index| factory.generate(collection, index, &mut context))
                .collect()
        };

        let skipped = count - records.len();
        if skipped > 0 {
            warn!("{skipped} {collection} records could not be generated");
        }

        for (position, record) in records.iter_mut().enumerate() {
            if record.has_attribute_id() {
                continue;
            }
            if record.attributes.is_some() || !record.extra.contains_key("id") {
                record.set_id(id_at(collection, start, position)?);
            }
        }

        if records.is_empty() {
            info!("Generated no {collection} records");
            return Ok(0);
        }

        if add_dependencies {
            // Staged on a copy; the session document changes only on success.
            let mut updated = self.document.clone();
            updated.extend(collection, records.iter().cloned());

            let new_records = IndexMap::from([(collection.to_string(), records.clone())]);
            let schema = &self.config.relationship_schema;
            synchronize_in_place(&new_records, &mut updated, schema);

            match collection {
                "User" => {
                    link_user_access_patterns(&records, &mut updated, schema)?;
                }
                "Application" => {
                    link_application_access_patterns(&records, &mut updated, schema)?;
                }
                "NetworkSwitch" => {
                    link_new_switches(&records, &mut updated, &mut self.rng)?;
                }
                _ => {}
            }
            self.document = updated;
        } else {
            self.document.extend(collection, records.iter().cloned());
        }

        info!(
            "Generated {} {collection}(s){}",
            records.len(),
            if add_dependencies { " with dependencies" } else { "" }
        );
        Ok(records.len())
    }

    // Snapshots

    fn store(&self) -> Result<&ScenarioStore, AppResponse> {
        self.store
            .as_ref()
            .ok_or_else(|| AppResponse::BadRequest("Snapshot store is not configured".to_string()))
    }

    pub fn save_snapshot(&self, name: &str) -> Result<(), AppResponse> {
        self.store()?.save(name, &self.document)
    }

    pub fn restore_snapshot(&mut self, name: &str) -> Result<&ScenarioDocument, AppResponse> {
        let document = self
            .store()?
            .load(name)?
            .ok_or_else(|| AppResponse::NotFound(format!("No snapshot named '{name}'")))?;
        self.document = document;
        Ok(&self.document)
    }

    pub fn list_snapshots(&self) -> Result<Vec<String>, AppResponse> {
        self.store()?.list()
    }

    pub fn delete_snapshot(&self, name: &str) -> Result<bool, AppResponse> {
        self.store()?.delete(name)
    }
}
