//! # Test Suite for the Scenario Editor Core
//!
//! ## Test Categories
//!
//! ### 1. Model and Codec Tests
//! - Relationship field classification, record shapes, `Infinity` handling
//!
//! ### 2. Resolver and Synchronizer Tests
//! - Id lookups, random sampling, reciprocal fields in both directions
//!
//! ### 3. Generation Tests
//! - Count validation, dependent records, template placeholders
//!
//! ### 4. Editor Session Tests
//! - Loading, editing, search, export, snapshots
//!
//! ### 5. FFI Function Tests
//! - All `extern "C"` entry points, including null pointers and bad input
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test
//! cargo test test_ffi_        # FFI tests
//! cargo test test_generate_   # Generation tests
//! ```

#[cfg(test)]
pub mod tests {
    use std::cell::Cell;
    use std::ffi::{CStr, CString};
    use std::os::raw::c_char;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use indexmap::IndexMap;
    use log::{info, warn};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value as JsonValue};

    use crate::app_response::AppResponse;
    use crate::derived_sync::link_new_switches;
    use crate::editor_config::EditorConfig;
    use crate::editor_state::{item_summary, EditorState};
    use crate::record_factory::{GenerationContext, RecordFactory, TemplateFactory, ACCESS_PATTERN};
    use crate::reference_resolver::{
        candidate_ids, find_by_id, id_at, max_id, next_id, pick_random_ids, reference_options,
    };
    use crate::relationship_schema::RelationshipSchema;
    use crate::relationship_sync::{append_back_reference, synchronize};
    use crate::scenario_codec::{ScenarioCodec, INFINITY_SENTINEL};
    use crate::scenario_model::{FieldValue, Record, RecordId, Reference, ReferenceEntry, ScenarioDocument};
    use crate::scenario_store::ScenarioStore;

    // Helpers

    fn record(value: JsonValue) -> Record {
        serde_json::from_value(value).expect("test record should deserialize")
    }

    fn document(value: JsonValue) -> ScenarioDocument {
        serde_json::from_value(value).expect("test document should deserialize")
    }

    fn seeded_editor() -> EditorState {
        let config = EditorConfig {
            seed: Some(7),
            ..EditorConfig::default()
        };
        EditorState::init(config).expect("editor should initialize")
    }

    fn ids_of(document: &ScenarioDocument, collection: &str) -> Vec<RecordId> {
        document
            .collection(collection)
            .iter()
            .filter_map(Record::resolved_id)
            .collect()
    }

    fn relationship_ids(record: &Record, field: &str) -> Vec<RecordId> {
        record
            .relationship(field)
            .map(FieldValue::reference_ids)
            .unwrap_or_default()
    }

    /// Unique directory under the system temp dir, removed by [`cleanup_dir`].
    fn unique_store_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("{prefix}_{}_{nanos}", std::process::id()))
    }

    fn cleanup_dir(path: &PathBuf) {
        if let Err(e) = std::fs::remove_dir_all(path) {
            warn!("Could not clean test directory {}: {e}", path.display());
        }
    }

    /// Reads and frees a response string returned by the FFI layer.
    fn read_response(ptr: *const c_char) -> AppResponse {
        assert!(!ptr.is_null(), "FFI returned a null response");
        let text = unsafe { CStr::from_ptr(ptr) }
            .to_str()
            .expect("response should be UTF-8")
            .to_string();
        crate::free_response(ptr as *mut c_char);
        serde_json::from_str(&text).expect("response should be an AppResponse")
    }

    fn topology_document() -> ScenarioDocument {
        document(json!({
            "NetworkSwitch": [
                {"attributes": {"id": 1}, "relationships": {"links": [], "edge_servers": [], "base_station": {"class": "BaseStation", "id": 1}}},
                {"attributes": {"id": 2}, "relationships": {"links": [], "edge_servers": [], "base_station": {"class": "BaseStation", "id": 2}}}
            ],
            "BaseStation": [
                {"attributes": {"id": 1, "label": "north"}, "relationships": {"users": [], "edge_servers": [], "network_switch": {"class": "NetworkSwitch", "id": 1}}},
                {"attributes": {"id": 2, "label": ""}, "relationships": {"users": [], "edge_servers": [], "network_switch": {"class": "NetworkSwitch", "id": 2}}}
            ],
            "Application": [
                {"attributes": {"id": 1, "label": "video"}, "relationships": {"services": [], "users": []}},
                {"attributes": {"id": 2, "label": "chat"}, "relationships": {"services": [], "users": []}},
                {"attributes": {"id": 3, "label": "game"}, "relationships": {"services": [], "users": []}}
            ]
        }))
    }

    /// Factory that only counts how often it is asked for a record.
    struct CountingFactory {
        calls: Cell<usize>,
    }

    impl RecordFactory for CountingFactory {
        fn generate(&self, _collection: &str, index: RecordId, _context: &mut GenerationContext<'_>) -> Option<Record> {
            self.calls.set(self.calls.get() + 1);
            Some(record(json!({"attributes": {"id": index}})))
        }
    }

    // Model and codec

    #[test]
    fn test_field_value_classification() {
        let reference = FieldValue::from(json!({"class": "BaseStation", "id": 2}));
        assert_eq!(reference, FieldValue::Reference(Reference::new("BaseStation", 2)));

        let three_keys = FieldValue::from(json!({"class": "BaseStation", "id": 2, "extra": true}));
        assert!(matches!(three_keys, FieldValue::Object(_)));

        let string_id = FieldValue::from(json!({"class": "BaseStation", "id": "2"}));
        assert!(matches!(string_id, FieldValue::Object(_)));

        let empty = FieldValue::from(json!([]));
        assert_eq!(empty, FieldValue::ReferenceArray(Vec::new()));
        assert!(empty.is_array());

        let mixed_refs = FieldValue::from(json!([{"class": "User", "id": 1}, 4]));
        assert_eq!(
            mixed_refs,
            FieldValue::ReferenceArray(vec![
                ReferenceEntry::Reference(Reference::new("User", 1)),
                ReferenceEntry::Id(4),
            ])
        );

        let objects = FieldValue::from(json!([{"id": 3, "weight": 2}, {"name": "x"}]));
        assert!(matches!(objects, FieldValue::ObjectArray(_)));
        assert_eq!(objects.reference_ids(), vec![3]);

        let scalars = FieldValue::from(json!([1, "two"]));
        assert!(matches!(scalars, FieldValue::Scalar(_)));

        let null = FieldValue::from(JsonValue::Null);
        assert!(null.is_null());
        assert!(null.reference_ids().is_empty());

        let map = FieldValue::from(json!({"1": {"class": "CircularDurationAndIntervalAccessPattern", "id": 1}}));
        assert!(matches!(map, FieldValue::Object(_)));
        assert!(map.reference_ids().is_empty());
    }

    #[test]
    fn test_field_value_is_lossless() {
        let shapes = [
            json!({"class": "User", "id": 1}),
            json!([{"class": "User", "id": 1}, 2]),
            json!({"a": [1, 2]}),
            json!([{"id": 1, "w": 0.5}]),
            json!("pathway"),
            json!(null),
            json!([]),
        ];
        for shape in shapes {
            assert_eq!(FieldValue::from(shape.clone()).to_json(), shape);
        }
    }

    #[test]
    fn test_record_shapes_and_ids() {
        let nested = record(json!({"attributes": {"id": 4}, "relationships": {}}));
        assert_eq!(nested.resolved_id(), Some(4));
        assert!(nested.has_attribute_id());

        let top_level = record(json!({"id": 9, "label": "flat"}));
        assert_eq!(top_level.resolved_id(), Some(9));
        assert_eq!(top_level.label(), Some("flat"));
        assert!(!top_level.has_attribute_id());

        // A non-null attributes.id wins even when it is unusable.
        let shadowed = record(json!({"id": 9, "attributes": {"id": "nine"}}));
        assert_eq!(shadowed.resolved_id(), None);

        let null_id = record(json!({"id": 9, "attributes": {"id": null}}));
        assert_eq!(null_id.resolved_id(), Some(9));

        let round_trip = serde_json::to_value(&top_level).expect("record should serialize");
        assert_eq!(round_trip, json!({"id": 9, "label": "flat"}));
    }

    #[test]
    fn test_null_record_sections_read_as_absent() {
        let codec = ScenarioCodec::new().expect("codec should build");

        let parsed = codec
            .parse_record(r#"{"attributes": null, "relationships": null, "id": 1}"#)
            .expect("null sections are accepted");
        assert!(parsed.attributes.is_none());
        assert!(parsed.relationships.is_none());
        assert_eq!(parsed.resolved_id(), Some(1));
        assert_eq!(serde_json::to_value(&parsed).expect("record should serialize"), json!({"id": 1}));

        let not_an_object = codec.parse_document(r#"{"User": [{"attributes": 5}]}"#);
        assert!(matches!(not_an_object, Err(AppResponse::SerializationError(_))));
    }

    #[test]
    fn test_codec_infinity_round_trip() {
        let codec = ScenarioCodec::new().expect("codec should build");
        let text = r#"{
  "CircularDurationAndIntervalAccessPattern": [
    {
      "attributes": {
        "id": 1,
        "duration_values": [Infinity],
        "history": [{"start": 1, "end": Infinity, "next_access": Infinity}]
      },
      "relationships": {"user": {"class": "User", "id": 1}}
    }
  ]
}"#;

        let parsed = codec.parse_document(text).expect("Infinity should be accepted");
        let pattern = &parsed.collection(ACCESS_PATTERN)[0];
        assert_eq!(pattern.attribute("duration_values"), Some(&json!([INFINITY_SENTINEL])));

        let exported = codec.serialize_document(&parsed).expect("document should serialize");
        assert!(!exported.contains(&INFINITY_SENTINEL.to_string()));
        assert!(exported.contains("[Infinity]"));
        assert!(exported.contains(r#""end": Infinity,"#));
        assert!(exported.contains(r#""next_access": Infinity"#));

        let reparsed = codec.parse_document(&exported).expect("exported text should parse");
        assert_eq!(reparsed, parsed);
        info!("Infinity round trip preserved {} records", reparsed.record_count());
    }

    #[test]
    fn test_codec_rejects_malformed_documents() {
        let codec = ScenarioCodec::new().expect("codec should build");

        let not_json = codec.parse_document("{ not json");
        assert!(matches!(not_json, Err(AppResponse::SerializationError(_))));

        let top_level_array = codec.parse_document("[1, 2, 3]");
        assert!(matches!(top_level_array, Err(AppResponse::SerializationError(_))));

        let non_array_collection = codec.parse_document(r#"{"User": {"id": 1}}"#);
        assert!(matches!(non_array_collection, Err(AppResponse::SerializationError(_))));
    }

    #[test]
    fn test_codec_preserves_collection_and_key_order() {
        let codec = ScenarioCodec::new().expect("codec should build");
        let text = r#"{"Zeta": [{"attributes": {"z": 1, "a": 2}}], "Alpha": [{"id": 1}]}"#;
        let parsed = codec.parse_document(text).expect("document should parse");

        let names: Vec<&str> = parsed.collection_names().collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);

        let exported = codec.serialize_document(&parsed).expect("document should serialize");
        let zeta = exported.find("Zeta").expect("Zeta exported");
        let alpha = exported.find("Alpha").expect("Alpha exported");
        assert!(zeta < alpha);
        assert!(exported.find("\"z\"") < exported.find("\"a\""));
    }

    // Resolver

    #[test]
    fn test_resolver_lookups() {
        let doc = topology_document();

        assert_eq!(find_by_id(&doc, "BaseStation", 2).and_then(Record::label), Some(""));
        assert!(find_by_id(&doc, "BaseStation", 99).is_none());
        assert!(find_by_id(&doc, "Missing", 1).is_none());

        assert_eq!(max_id(&doc, "Application"), 3);
        assert_eq!(next_id(&doc, "Application"), Ok(4));
        assert_eq!(max_id(&doc, "Missing"), 0);
        assert_eq!(next_id(&doc, "Missing"), Ok(1));

        assert_eq!(id_at("Sensor", RecordId::MAX - 1, 1), Ok(RecordId::MAX));
        assert!(matches!(id_at("Sensor", RecordId::MAX, 1), Err(AppResponse::ValidationError(_))));
    }

    #[test]
    fn test_resolver_candidate_ids_are_distinct() {
        let doc = document(json!({
            "Sensor": [{"id": 5}, {"id": 5}, {"label": "no id"}, {"attributes": {"id": 2}}]
        }));
        assert_eq!(candidate_ids(&doc, "Sensor"), vec![5, 0, 2]);
    }

    #[test]
    fn test_resolver_pick_random_ids() {
        let doc = topology_document();
        let mut rng = StdRng::seed_from_u64(42);

        for count in 0..5 {
            let picked = pick_random_ids(&doc, "Application", count, &mut rng);
            assert_eq!(picked.len(), count.min(3));
            let mut deduped = picked.clone();
            deduped.sort_unstable();
            deduped.dedup();
            assert_eq!(deduped.len(), picked.len(), "sampled ids must be distinct");
            assert!(picked.iter().all(|id| (1..=3).contains(id)));
        }

        assert_eq!(pick_random_ids(&doc, "Application", 10, &mut rng), vec![1, 2, 3]);
        assert!(pick_random_ids(&doc, "Missing", 3, &mut rng).is_empty());
    }

    #[test]
    fn test_reference_options_labels() {
        let doc = topology_document();
        let options = reference_options(&doc, "BaseStation");
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].label, "north");
        assert_eq!(options[1].label, "#2");
        assert_eq!(options[1].class, "BaseStation");
    }

    // Synchronizer

    #[test]
    fn test_sync_single_valued_reciprocal() {
        let server = record(json!({
            "attributes": {"id": 10},
            "relationships": {"services": [{"class": "Service", "id": 1}]}
        }));
        let doc = document(json!({
            "Service": [{"attributes": {"id": 1}, "relationships": {"server": null}}]
        }));
        let mut with_server = doc.clone();
        with_server.push("EdgeServer", server.clone());

        let new_records = IndexMap::from([("EdgeServer".to_string(), vec![server])]);
        let synced = synchronize(&new_records, &with_server, &RelationshipSchema::edgesimpy());

        let service = &synced.collection("Service")[0];
        assert_eq!(service.relationship_reference("server"), Some(&Reference::new("EdgeServer", 10)));
        // Input untouched.
        assert!(with_server.collection("Service")[0].relationship("server").is_some_and(FieldValue::is_null));
    }

    #[test]
    fn test_sync_array_reciprocal_is_idempotent() {
        let mut doc = topology_document();
        let user = record(json!({
            "attributes": {"id": 1},
            "relationships": {"applications": [{"class": "Application", "id": 1}, {"class": "Application", "id": 3}]}
        }));
        doc.push("User", user.clone());

        let schema = RelationshipSchema::edgesimpy();
        let new_records = IndexMap::from([("User".to_string(), vec![user])]);
        let once = synchronize(&new_records, &doc, &schema);
        let twice = synchronize(&new_records, &once, &schema);

        assert_eq!(once, twice);
        let first = find_by_id(&once, "Application", 1).expect("application 1");
        assert_eq!(relationship_ids(first, "users"), vec![1]);
        let second = find_by_id(&once, "Application", 2).expect("application 2");
        assert!(relationship_ids(second, "users").is_empty());
    }

    #[test]
    fn test_sync_dangling_reference_changes_nothing() {
        let mut doc = topology_document();
        let user = record(json!({
            "attributes": {"id": 1},
            "relationships": {"applications": [{"class": "Application", "id": 99}]}
        }));
        doc.push("User", user.clone());

        let new_records = IndexMap::from([("User".to_string(), vec![user])]);
        let synced = synchronize(&new_records, &doc, &RelationshipSchema::edgesimpy());
        assert_eq!(synced, doc);
    }

    #[test]
    fn test_sync_missing_target_collection_is_not_created() {
        let server = record(json!({
            "attributes": {"id": 3},
            "relationships": {"base_station": {"class": "BaseStation", "id": 1}}
        }));
        let mut doc = ScenarioDocument::new();
        doc.push("EdgeServer", server.clone());

        let new_records = IndexMap::from([("EdgeServer".to_string(), vec![server])]);
        let synced = synchronize(&new_records, &doc, &RelationshipSchema::edgesimpy());
        assert!(!synced.collections.contains_key("BaseStation"));
        assert_eq!(synced, doc);
    }

    #[test]
    fn test_sync_switch_links_overwrite_link_nodes() {
        let switch = record(json!({
            "attributes": {"id": 5},
            "relationships": {"links": [{"class": "NetworkLink", "id": 1}]}
        }));
        let mut doc = document(json!({
            "NetworkLink": [{
                "attributes": {"id": 1},
                "relationships": {"nodes": [{"class": "NetworkSwitch", "id": 1}, {"class": "NetworkSwitch", "id": 2}]}
            }]
        }));
        doc.push("NetworkSwitch", switch.clone());

        let new_records = IndexMap::from([("NetworkSwitch".to_string(), vec![switch])]);
        let synced = synchronize(&new_records, &doc, &RelationshipSchema::edgesimpy());

        // "nodes" is not an array field, so it becomes a single reference.
        let link = &synced.collection("NetworkLink")[0];
        assert_eq!(link.relationship_reference("nodes"), Some(&Reference::new("NetworkSwitch", 5)));
    }

    #[test]
    fn test_append_back_reference_coerces_and_dedupes() {
        let mut target = record(json!({"attributes": {"id": 1}, "relationships": {"users": "broken"}}));

        assert!(append_back_reference(&mut target, "users", Reference::new("User", 4)));
        assert!(!append_back_reference(&mut target, "users", Reference::new("User", 4)));
        assert_eq!(relationship_ids(&target, "users"), vec![4]);

        let mut bare_ids = record(json!({"relationships": {"links": [7]}}));
        assert!(!append_back_reference(&mut bare_ids, "links", Reference::new("NetworkLink", 7)));
        assert!(append_back_reference(&mut bare_ids, "links", Reference::new("NetworkLink", 8)));
        assert_eq!(relationship_ids(&bare_ids, "links"), vec![7, 8]);

        let mut bare = Record::default();
        assert!(append_back_reference(&mut bare, "services", Reference::new("Service", 2)));
        assert_eq!(relationship_ids(&bare, "services"), vec![2]);
    }

    #[test]
    fn test_custom_schema() {
        let schema = RelationshipSchema::empty()
            .with_mapping("Drone", "hub", "Hub", "drones")
            .with_array_field("drones");
        let drone = record(json!({"attributes": {"id": 1}, "relationships": {"hub": {"class": "Hub", "id": 1}}}));
        let mut doc = document(json!({"Hub": [{"attributes": {"id": 1}}]}));
        doc.push("Drone", drone.clone());

        let synced = synchronize(&IndexMap::from([("Drone".to_string(), vec![drone])]), &doc, &schema);
        assert_eq!(relationship_ids(&synced.collection("Hub")[0], "drones"), vec![1]);

        // Default schema knows nothing about drones.
        let untouched = synchronize(
            &IndexMap::from([("Drone".to_string(), synced.collection("Drone").to_vec())]),
            &doc,
            &RelationshipSchema::edgesimpy(),
        );
        assert_eq!(untouched, doc);
    }

    // Generation

    #[test]
    fn test_generate_rejects_invalid_counts() {
        let mut editor = seeded_editor();
        editor.document = topology_document();
        let before = editor.document.clone();
        let factory = CountingFactory { calls: Cell::new(0) };

        for count in [0, -3, 10_001] {
            let result = editor.generate_items_with(&factory, "User", count, true);
            assert!(matches!(result, Err(AppResponse::ValidationError(_))), "count {count} accepted");
        }

        assert_eq!(factory.calls.get(), 0);
        assert_eq!(editor.document, before);
    }

    #[test]
    fn test_generate_rejects_exhausted_ids() {
        let mut editor = seeded_editor();
        editor
            .load_from_str(r#"{"Sensor": [{"attributes": {"id": 9223372036854775807}}]}"#)
            .expect("largest id is valid JSON");
        let before = editor.document.clone();

        let result = editor.generate_items("Sensor", 1, true);
        assert!(matches!(result, Err(AppResponse::ValidationError(_))), "got {result:?}");
        assert_eq!(editor.document, before);
        assert!(matches!(editor.new_item_template("Sensor"), Err(AppResponse::ValidationError(_))));

        // Room for exactly one more id.
        editor
            .load_from_str(r#"{"Sensor": [{"attributes": {"id": 9223372036854775806}}]}"#)
            .expect("document should load");
        assert!(matches!(editor.generate_items("Sensor", 2, false), Err(AppResponse::ValidationError(_))));
        assert_eq!(editor.document.collection("Sensor").len(), 1);

        assert_eq!(editor.generate_items("Sensor", 1, false), Ok(1));
        assert_eq!(max_id(&editor.document, "Sensor"), RecordId::MAX);
    }

    #[test]
    fn test_generate_users_rejects_exhausted_pattern_ids() {
        let mut editor = seeded_editor();
        editor.document = topology_document();
        editor
            .document
            .push(ACCESS_PATTERN, record(json!({"attributes": {"id": RecordId::MAX}})));
        let before = editor.document.clone();

        let result = editor.generate_items("User", 2, true);
        assert!(matches!(result, Err(AppResponse::ValidationError(_))), "got {result:?}");
        // Neither the users nor their back-references were kept.
        assert_eq!(editor.document, before);
    }

    #[test]
    fn test_generate_users_continue_access_pattern_ids() {
        let mut editor = seeded_editor();
        editor.document = topology_document();
        let existing = record(json!({
            "attributes": {"id": 7},
            "relationships": {
                "user": {"class": "User", "id": 99},
                "app": {"class": "Application", "id": 1}
            }
        }));
        editor.document.push(ACCESS_PATTERN, existing.clone());

        editor.generate_items("User", 3, true).expect("users should generate");
        let doc = &editor.document;

        let patterns = doc.collection(ACCESS_PATTERN);
        assert_eq!(patterns[0], existing);

        let new_ids: Vec<RecordId> = patterns[1..].iter().filter_map(Record::resolved_id).collect();
        let expected: Vec<RecordId> = (8..8 + new_ids.len() as RecordId).collect();
        assert!(!new_ids.is_empty());
        assert_eq!(new_ids, expected);

        // Each user owns the next run of ids, in the order of its applications.
        let mut remaining = new_ids.as_slice();
        for user in doc.collection("User") {
            let app_count = relationship_ids(user, "applications").len();
            let (own, rest) = remaining.split_at(app_count);
            assert_eq!(relationship_ids(user, "access_patterns"), own.to_vec());
            remaining = rest;
        }
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_generate_users_with_access_patterns() {
        let mut editor = seeded_editor();
        editor.document = topology_document();

        let created = editor.generate_items("User", 5, true).expect("users should generate");
        assert_eq!(created, 5);

        let doc = &editor.document;
        assert_eq!(ids_of(doc, "User"), vec![1, 2, 3, 4, 5]);

        let patterns = doc.collection(ACCESS_PATTERN);
        let pattern_ids: Vec<RecordId> = patterns.iter().filter_map(Record::resolved_id).collect();
        let expected: Vec<RecordId> = (1..=patterns.len() as RecordId).collect();
        assert_eq!(pattern_ids, expected, "pattern ids must be sequential from 1");

        let edge_count: usize = doc
            .collection("User")
            .iter()
            .map(|user| relationship_ids(user, "applications").len())
            .sum();
        assert_eq!(patterns.len(), edge_count);

        for user in doc.collection("User") {
            let user_id = user.resolved_id().expect("user id");
            let app_ids = relationship_ids(user, "applications");
            assert!((1..=3).contains(&app_ids.len()));

            let own_patterns = relationship_ids(user, "access_patterns");
            assert_eq!(own_patterns.len(), app_ids.len());

            for (app_id, pattern_id) in app_ids.iter().zip(&own_patterns) {
                let pattern = find_by_id(doc, ACCESS_PATTERN, *pattern_id).expect("pattern exists");
                assert_eq!(pattern.relationship_reference("user"), Some(&Reference::new("User", user_id)));
                assert_eq!(pattern.relationship_reference("app"), Some(&Reference::new("Application", *app_id)));

                let app = find_by_id(doc, "Application", *app_id).expect("application exists");
                assert!(relationship_ids(app, "users").contains(&user_id));
                assert!(relationship_ids(app, "access_patterns").contains(pattern_id));
            }
        }
    }

    #[test]
    fn test_generate_applications_with_access_patterns() {
        let mut editor = seeded_editor();
        editor.document = document(json!({
            "User": [
                {"attributes": {"id": 1}, "relationships": {"applications": [], "access_patterns": []}},
                {"attributes": {"id": 2}, "relationships": {"applications": [], "access_patterns": []}}
            ],
            "Application": [{"attributes": {"id": 1}, "relationships": {"users": []}}]
        }));

        editor.generate_items("Application", 2, true).expect("applications should generate");
        let doc = &editor.document;
        assert_eq!(ids_of(doc, "Application"), vec![1, 2, 3]);

        for app in &doc.collection("Application")[1..] {
            let app_id = app.resolved_id().expect("application id");
            let users = relationship_ids(app, "users");
            let patterns = relationship_ids(app, "access_patterns");
            assert_eq!(users.len(), patterns.len());
            for (user_id, pattern_id) in users.iter().zip(&patterns) {
                let pattern = find_by_id(doc, ACCESS_PATTERN, *pattern_id).expect("pattern exists");
                assert_eq!(pattern.relationship_reference("app"), Some(&Reference::new("Application", app_id)));
                assert_eq!(pattern.relationship_reference("user"), Some(&Reference::new("User", *user_id)));
            }
        }
    }

    #[test]
    fn test_generate_switches_with_links() {
        let mut editor = seeded_editor();
        editor.document = topology_document();

        editor.generate_items("NetworkSwitch", 3, true).expect("switches should generate");
        let doc = &editor.document;
        assert_eq!(ids_of(doc, "NetworkSwitch"), vec![1, 2, 3, 4, 5]);
        assert_eq!(ids_of(doc, "NetworkLink"), vec![1, 2, 3]);

        for (link, switch_id) in doc.collection("NetworkLink").iter().zip(3..) {
            assert_eq!(relationship_ids(link, "nodes"), vec![switch_id, 1]);
            let delay = link.attribute("delay").and_then(JsonValue::as_i64);
            assert!(matches!(delay, Some(10) | Some(200)));

            let new_switch = find_by_id(doc, "NetworkSwitch", switch_id).expect("new switch");
            assert_eq!(relationship_ids(new_switch, "links"), vec![link.resolved_id().expect("link id")]);
        }

        let anchor = find_by_id(doc, "NetworkSwitch", 1).expect("anchor switch");
        assert_eq!(relationship_ids(anchor, "links"), vec![1, 2, 3]);
        let untouched = find_by_id(doc, "NetworkSwitch", 2).expect("second switch");
        assert!(relationship_ids(untouched, "links").is_empty());
    }

    #[test]
    fn test_link_new_switches_without_anchor() {
        let mut doc = ScenarioDocument::new();
        let fresh = record(json!({"attributes": {"id": 1}, "relationships": {"links": []}}));
        doc.push("NetworkSwitch", fresh.clone());

        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(link_new_switches(&[fresh], &mut doc, &mut rng), Ok(0));
        assert!(!doc.collections.contains_key("NetworkLink"));
    }

    #[test]
    fn test_generate_skips_missing_prerequisites() {
        let mut editor = seeded_editor();

        let created = editor.generate_items("BaseStation", 4, false).expect("generation should not fail");
        assert_eq!(created, 0);

        let links = editor.generate_items("NetworkLink", 2, false).expect("generation should not fail");
        assert_eq!(links, 0);
    }

    #[test]
    fn test_generate_edge_servers_sync_base_station() {
        let mut editor = seeded_editor();
        editor.document = topology_document();

        editor.generate_items("EdgeServer", 4, true).expect("servers should generate");
        let doc = &editor.document;
        assert_eq!(ids_of(doc, "EdgeServer"), vec![1, 2, 3, 4]);

        for server in doc.collection("EdgeServer") {
            let server_id = server.resolved_id().expect("server id");
            let station_id = server
                .relationship_reference("base_station")
                .map(|reference| reference.id)
                .expect("base station reference");
            let station = find_by_id(doc, "BaseStation", station_id).expect("station exists");
            assert!(relationship_ids(station, "edge_servers").contains(&server_id));

            let switch_id = server
                .relationship_reference("network_switch")
                .map(|reference| reference.id)
                .expect("switch reference");
            let switch = find_by_id(doc, "NetworkSwitch", switch_id).expect("switch exists");
            assert!(relationship_ids(switch, "edge_servers").contains(&server_id));
        }
    }

    #[test]
    fn test_generate_without_dependencies_leaves_targets_alone() {
        let mut editor = seeded_editor();
        editor.document = topology_document();
        let apps_before = editor.document.collection("Application").to_vec();

        editor.generate_items("User", 3, false).expect("users should generate");
        assert_eq!(editor.document.collection("Application"), apps_before.as_slice());
        assert!(!editor.document.collections.contains_key(ACCESS_PATTERN));
    }

    #[test]
    fn test_generate_unknown_collection() {
        let mut editor = seeded_editor();
        editor.generate_items("Sensor", 2, true).expect("fallback records should generate");

        let sensors = editor.document.collection("Sensor");
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[1].attribute("label"), Some(&json!("item_2")));
        assert_eq!(sensors[1].attribute("type"), Some(&json!("Sensor")));
    }

    #[test]
    fn test_template_factory() {
        let mut editor = seeded_editor();
        editor.document = document(json!({"Probe": [{"attributes": {"id": 4, "name": "existing"}}]}));

        let factory = TemplateFactory::new(json!({
            "attributes": {"name": "{NAME}", "tag": "p-{RANDOM}", "seen": "{TIMESTAMP}", "score": -1},
            "relationships": {}
        }));
        let created = editor
            .generate_items_with(&factory, "Probe", 3, false)
            .expect("template records should generate");
        assert_eq!(created, 3);

        let probes = editor.document.collection("Probe");
        assert_eq!(ids_of(&editor.document, "Probe"), vec![4, 5, 6, 7]);
        assert_eq!(probes[1].attribute("name"), Some(&json!("item_5")));

        let tag = probes[1].attribute("tag").and_then(JsonValue::as_str).expect("tag");
        assert_eq!(tag.len(), "p-".len() + 8);

        let score = probes[2].attribute("score").and_then(JsonValue::as_i64).expect("score");
        assert!((0..=1000).contains(&score));

        let seen = probes[3].attribute("seen").and_then(JsonValue::as_str).expect("timestamp");
        assert!(seen.ends_with('Z'));
    }

    #[test]
    fn test_template_random_is_shared_within_a_string() {
        let mut editor = seeded_editor();
        let factory = TemplateFactory::new(json!({
            "attributes": {"pair": "{RANDOM}-{RANDOM}", "other": "{RANDOM}"}
        }));
        editor
            .generate_items_with(&factory, "Probe", 1, false)
            .expect("template record should generate");

        let probe = &editor.document.collection("Probe")[0];
        let pair = probe.attribute("pair").and_then(JsonValue::as_str).expect("pair");
        let (left, right) = pair.split_once('-').expect("separator");
        assert_eq!(left.len(), 8);
        assert_eq!(left, right);
        assert_eq!(probe.resolved_id(), Some(1));
    }

    #[test]
    fn test_session_factory_override() {
        let factory = TemplateFactory::new(json!({"id": "{ID}", "kind": "flat"}));
        let mut editor = seeded_editor().with_factory(Box::new(factory));

        editor.generate_items("Flat", 2, false).expect("records should generate");
        let flat = editor.document.collection("Flat");
        assert_eq!(flat.len(), 2);
        // Top-level string id is left as generated.
        assert_eq!(flat[0].extra.get("id"), Some(&json!("1")));
        assert_eq!(flat[1].extra.get("kind"), Some(&json!("flat")));
    }

    // Editor session

    #[test]
    fn test_failed_load_keeps_previous_document() {
        let mut editor = seeded_editor();
        editor
            .load_from_str(r#"{"User": [{"attributes": {"id": 1}}]}"#)
            .expect("valid document should load");
        let before = editor.document.clone();

        assert!(editor.load_from_str("{ broken").is_err());
        assert!(editor.load_from_file("/definitely/not/here.json").is_err());
        assert_eq!(editor.document, before);
    }

    #[test]
    fn test_load_from_invalid_url() {
        let mut editor = seeded_editor();
        let result = editor.load_from_url("not a url");
        assert!(matches!(result, Err(AppResponse::TransportError(_))), "got {result:?}");

        let empty = editor.load_from_url("  ");
        assert!(matches!(empty, Err(AppResponse::BadRequest(_))));
        assert!(editor.document.is_empty());
    }

    #[test]
    fn test_load_from_file_and_export_to_dir() {
        let dir = unique_store_dir("scenario_export_test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let source = dir.join("input.json");
        std::fs::write(&source, r#"{"Service": [{"attributes": {"id": 1, "ttl": Infinity}}]}"#).expect("write input");

        let mut editor = seeded_editor();
        editor.load_from_file(&source).expect("file should load");
        let exported = editor.export_to_dir(&dir).expect("export should succeed");

        assert!(exported.ends_with("edgesimpy-scenario.json"));
        let text = std::fs::read_to_string(&exported).expect("read export");
        assert!(text.contains(r#""ttl": Infinity"#));

        cleanup_dir(&dir);
    }

    #[test]
    fn test_export_empty_document_fails() {
        let editor = seeded_editor();
        let result = editor.export_string();
        assert!(matches!(result, Err(AppResponse::ValidationError(_))));
    }

    #[test]
    fn test_delete_item_preserves_order() {
        let mut editor = seeded_editor();
        let servers: Vec<JsonValue> = (1..=5).map(|id| json!({"attributes": {"id": id}})).collect();
        editor.document = document(json!({
            "EdgeServer": servers,
            "User": [{"attributes": {"id": 1}}]
        }));

        let removed = editor.delete_item("EdgeServer", 2).expect("index 2 exists");
        assert_eq!(removed.resolved_id(), Some(3));
        assert_eq!(ids_of(&editor.document, "EdgeServer"), vec![1, 2, 4, 5]);
        assert_eq!(ids_of(&editor.document, "User"), vec![1]);

        assert!(matches!(editor.delete_item("EdgeServer", 10), Err(AppResponse::NotFound(_))));
        assert!(matches!(editor.delete_item("Missing", 0), Err(AppResponse::NotFound(_))));
    }

    #[test]
    fn test_add_and_update_items() {
        let mut editor = seeded_editor();
        editor.document = topology_document();

        let index = editor
            .add_item_json("Application", r#"{"attributes": {"id": 4, "label": "maps"}}"#)
            .expect("item should be added");
        assert_eq!(index, 3);

        editor
            .update_item_json("Application", 0, r#"{"attributes": {"id": 1, "label": "stream"}}"#)
            .expect("item should update");
        let first = editor.get_item("Application", 0).expect("first application");
        assert_eq!(first.label(), Some("stream"));

        assert!(matches!(editor.update_item("Application", 9, Record::default()), Err(AppResponse::NotFound(_))));
        assert!(editor.add_item_json("Application", "not json").is_err());

        let new_collection = editor.add_item("Sensor", Record::default());
        assert_eq!(new_collection, 0);
        assert_eq!(editor.document.collection_names().last(), Some("Sensor"));
    }

    #[test]
    fn test_new_item_template() {
        let mut editor = seeded_editor();
        editor.document = topology_document();

        let template = editor.new_item_template("Application").expect("template");
        assert_eq!(template.resolved_id(), Some(4));
        assert_eq!(template.label(), Some("video"));

        let empty = editor.new_item_template("Missing").expect("empty template");
        assert_eq!(empty, Record::default());
    }

    #[test]
    fn test_filter_collections_and_records() {
        let mut editor = seeded_editor();
        editor.document = topology_document();

        let by_name = editor.filter("applic");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Application");
        assert_eq!(by_name[0].indices, vec![0, 1, 2]);

        let by_content = editor.filter("CHAT");
        assert_eq!(by_content.len(), 1);
        assert_eq!(by_content[0].name, "Application");
        assert_eq!(by_content[0].indices, vec![1]);

        assert_eq!(editor.filter("").len(), 3);
        assert!(editor.filter("nothing matches this").is_empty());
    }

    #[test]
    fn test_item_summary() {
        let server = record(json!({
            "attributes": {
                "id": 1,
                "label": "a label that is definitely longer than thirty characters",
                "coordinates": [1, 2],
                "power": {"max": 10},
                "active": true
            }
        }));
        let summary = item_summary(&server);
        let values: Vec<(&str, &str)> = summary.iter().map(|e| (e.key.as_str(), e.value.as_str())).collect();

        assert_eq!(
            values,
            vec![
                ("id", "1"),
                ("label", "a label that is definitely lon..."),
                ("coordinates", "[2 items]"),
                ("power", "[object]"),
                ("active", "true"),
            ]
        );

        let flat = item_summary(&record(json!({"id": 3, "name": "flat"})));
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn test_collections_summary() {
        let mut editor = seeded_editor();
        assert!(!editor.has_scenario_data());

        editor.document = topology_document();
        assert!(editor.has_scenario_data());

        let summary = editor.collections();
        let counts: Vec<(&str, usize)> = summary.iter().map(|c| (c.name.as_str(), c.count)).collect();
        assert_eq!(counts, vec![("NetworkSwitch", 2), ("BaseStation", 2), ("Application", 3)]);

        editor.clear();
        assert!(editor.collections().is_empty());
    }

    // Configuration

    #[test]
    fn test_config_defaults_and_validation() {
        let config = EditorConfig::from_json_str("{}").expect("empty config is valid");
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.max_generate_count, 10_000);
        assert!(config.store_path.is_none());

        let zero = EditorConfig::from_json_str(r#"{"max_generate_count": 0}"#);
        assert!(matches!(zero, Err(AppResponse::ValidationError(_))));

        let above_limit = EditorConfig::from_json_str(r#"{"max_generate_count": 50000}"#);
        assert!(matches!(above_limit, Err(AppResponse::ValidationError(_))));
        let at_limit = EditorConfig::from_json_str(r#"{"max_generate_count": 10000}"#);
        assert!(at_limit.is_ok());

        let malformed = EditorConfig::from_json_str("{");
        assert!(matches!(malformed, Err(AppResponse::SerializationError(_))));

        let custom = EditorConfig::from_json_str(r#"{"max_generate_count": 5, "seed": 1}"#).expect("valid config");
        let mut editor = EditorState::init(custom).expect("editor should initialize");
        let too_many = editor.generate_items("Sensor", 6, false);
        assert!(matches!(too_many, Err(AppResponse::ValidationError(_))));
    }

    #[test]
    fn test_config_schema_round_trip() {
        let config = EditorConfig::default();
        let text = serde_json::to_string(&config).expect("config should serialize");
        assert!(text.contains(r#""type":"BaseStation""#));

        let restored = EditorConfig::from_json_str(&text).expect("config should parse back");
        assert_eq!(restored.relationship_schema, RelationshipSchema::edgesimpy());
    }

    // Snapshot store

    #[test]
    fn test_store_save_load_list_delete() {
        let dir = unique_store_dir("scenario_store_test");
        {
            let store = ScenarioStore::open(&dir, 16 * 1024 * 1024).expect("store should open");
            let doc = topology_document();

            store.save("beta", &doc).expect("save beta");
            store.save("alpha", &ScenarioDocument::new()).expect("save alpha");

            assert_eq!(store.load("beta").expect("load beta"), Some(doc));
            assert_eq!(store.load("gamma").expect("load gamma"), None);
            assert_eq!(store.list().expect("list"), vec!["alpha".to_string(), "beta".to_string()]);

            assert!(store.delete("alpha").expect("delete alpha"));
            assert!(!store.delete("alpha").expect("delete alpha again"));
            assert!(matches!(store.save(" ", &ScenarioDocument::new()), Err(AppResponse::ValidationError(_))));

            store.clear().expect("clear");
            assert!(store.list().expect("list").is_empty());
        }
        cleanup_dir(&dir);
    }

    #[test]
    fn test_editor_snapshots() {
        let dir = unique_store_dir("scenario_snapshot_test");
        {
            let config = EditorConfig {
                seed: Some(1),
                store_path: Some(dir.display().to_string()),
                ..EditorConfig::default()
            };
            let mut editor = EditorState::init(config).expect("editor should initialize");
            editor.document = topology_document();
            editor.save_snapshot("draft").expect("snapshot saved");

            editor.clear();
            editor.restore_snapshot("draft").expect("snapshot restored");
            assert_eq!(editor.document, topology_document());

            assert_eq!(editor.list_snapshots().expect("list"), vec!["draft".to_string()]);
            assert!(matches!(editor.restore_snapshot("missing"), Err(AppResponse::NotFound(_))));
            assert!(editor.delete_snapshot("draft").expect("delete"));
        }
        cleanup_dir(&dir);

        let without_store = seeded_editor();
        assert!(matches!(without_store.save_snapshot("x"), Err(AppResponse::BadRequest(_))));
    }

    // FFI

    #[test]
    fn test_ffi_create_and_close_editor() {
        use crate::{close_editor, create_editor};

        let editor = create_editor(std::ptr::null());
        assert!(!editor.is_null());
        assert!(read_response(close_editor(editor)).is_ok());

        let bad_config = CString::new(r#"{"max_generate_count": -1}"#).expect("CString");
        assert!(create_editor(bad_config.as_ptr()).is_null());

        let not_json = CString::new("{").expect("CString");
        assert!(create_editor(not_json.as_ptr()).is_null());
    }

    #[test]
    fn test_ffi_null_pointers() {
        use crate::{close_editor, create_editor, export_scenario, generate_items, list_collections, load_scenario};

        let json = CString::new("{}").expect("CString");
        let response = read_response(load_scenario(std::ptr::null_mut(), json.as_ptr()));
        assert!(matches!(response, AppResponse::BadRequest(_)));

        assert!(matches!(read_response(list_collections(std::ptr::null_mut())), AppResponse::BadRequest(_)));
        assert!(matches!(read_response(export_scenario(std::ptr::null_mut())), AppResponse::BadRequest(_)));
        assert!(matches!(read_response(close_editor(std::ptr::null_mut())), AppResponse::BadRequest(_)));

        let editor = create_editor(std::ptr::null());
        let response = read_response(load_scenario(editor, std::ptr::null()));
        assert!(matches!(response, AppResponse::BadRequest(_)));

        let response = read_response(generate_items(editor, std::ptr::null(), 1, false));
        assert!(matches!(response, AppResponse::BadRequest(_)));

        read_response(close_editor(editor));
        crate::free_response(std::ptr::null_mut());
    }

    #[test]
    fn test_ffi_load_edit_generate_export() {
        use crate::{
            add_item, close_editor, create_editor, delete_item, export_scenario, generate_items, get_item,
            get_reference_options, list_collections, load_scenario, new_item_template, search_scenario, update_item,
        };

        let config = CString::new(r#"{"seed": 11}"#).expect("CString");
        let editor = create_editor(config.as_ptr());
        assert!(!editor.is_null());

        let scenario = CString::new(
            r#"{"Application": [{"attributes": {"id": 1, "label": "video"}, "relationships": {"users": []}}],
                "Service": [{"attributes": {"id": 1, "ttl": Infinity}}]}"#,
        )
        .expect("CString");
        let loaded = read_response(load_scenario(editor, scenario.as_ptr()));
        let AppResponse::Ok(summary) = loaded else {
            panic!("load failed: {loaded:?}");
        };
        assert!(summary.contains("Application"));

        let users = CString::new("User").expect("CString");
        assert_eq!(read_response(generate_items(editor, users.as_ptr(), 2, true)), AppResponse::Ok("2".to_string()));
        assert!(matches!(
            read_response(generate_items(editor, users.as_ptr(), 0, true)),
            AppResponse::ValidationError(_)
        ));

        let AppResponse::Ok(collections) = read_response(list_collections(editor)) else {
            panic!("list_collections failed");
        };
        assert!(collections.contains(ACCESS_PATTERN));

        let applications = CString::new("Application").expect("CString");
        let AppResponse::Ok(item) = read_response(get_item(editor, applications.as_ptr(), 0)) else {
            panic!("get_item failed");
        };
        assert!(item.contains("\"users\""));
        assert!(matches!(read_response(get_item(editor, applications.as_ptr(), -1)), AppResponse::BadRequest(_)));
        assert!(matches!(read_response(get_item(editor, applications.as_ptr(), 50)), AppResponse::NotFound(_)));

        let AppResponse::Ok(template) = read_response(new_item_template(editor, applications.as_ptr())) else {
            panic!("new_item_template failed");
        };
        let template_ptr = CString::new(template).expect("CString");
        assert_eq!(read_response(add_item(editor, applications.as_ptr(), template_ptr.as_ptr())), AppResponse::Ok("1".to_string()));

        let replacement = CString::new(r#"{"attributes": {"id": 2, "label": "renamed"}}"#).expect("CString");
        assert!(read_response(update_item(editor, applications.as_ptr(), 1, replacement.as_ptr())).is_ok());

        let AppResponse::Ok(options) = read_response(get_reference_options(editor, applications.as_ptr())) else {
            panic!("get_reference_options failed");
        };
        assert!(options.contains("renamed"));

        let query = CString::new("renamed").expect("CString");
        let AppResponse::Ok(matches) = read_response(search_scenario(editor, query.as_ptr())) else {
            panic!("search_scenario failed");
        };
        assert!(matches.contains("Application"));

        assert!(read_response(delete_item(editor, applications.as_ptr(), 1)).is_ok());

        let AppResponse::Ok(exported) = read_response(export_scenario(editor)) else {
            panic!("export_scenario failed");
        };
        assert!(exported.contains(r#""ttl": Infinity"#));

        read_response(close_editor(editor));
        info!("FFI workflow completed");
    }

    #[test]
    fn test_ffi_snapshots_and_download() {
        use crate::{close_editor, create_editor, download_scenario, list_snapshots, load_scenario, restore_snapshot, save_snapshot};

        let dir = unique_store_dir("ffi_snapshot_test");
        let config = json!({"store_path": dir.join("store").display().to_string()}).to_string();
        let config = CString::new(config).expect("CString");
        let editor = create_editor(config.as_ptr());
        assert!(!editor.is_null());

        let scenario = CString::new(r#"{"User": [{"attributes": {"id": 1}}]}"#).expect("CString");
        assert!(read_response(load_scenario(editor, scenario.as_ptr())).is_ok());

        let name = CString::new("first").expect("CString");
        assert!(read_response(save_snapshot(editor, name.as_ptr())).is_ok());
        assert_eq!(read_response(list_snapshots(editor)), AppResponse::Ok(r#"["first"]"#.to_string()));
        assert!(read_response(restore_snapshot(editor, name.as_ptr())).is_ok());

        let target = CString::new(dir.display().to_string()).expect("CString");
        let AppResponse::Ok(path) = read_response(download_scenario(editor, target.as_ptr())) else {
            panic!("download_scenario failed");
        };
        assert!(std::path::Path::new(&path).exists());

        read_response(close_editor(editor));
        cleanup_dir(&dir);
    }
}
