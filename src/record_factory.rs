//! Synthetic record generation.
//!
//! A [`RecordFactory`] builds one plausible record per call, picking existing
//! identifiers through a [`GenerationContext`] so that generated records point
//! at real targets. Returning `None` means a prerequisite collection is empty
//! (no `NetworkSwitch` to attach a `BaseStation` to, for instance).

use chrono::{SecondsFormat, Utc};
use log::warn;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde_json::{json, Map, Value as JsonValue};

use crate::reference_resolver::{pick_random_id, pick_random_ids};
use crate::scenario_codec::INFINITY_SENTINEL;
use crate::scenario_model::{Record, RecordId, ScenarioDocument};

pub const ACCESS_PATTERN: &str = "CircularDurationAndIntervalAccessPattern";
pub const NETWORK_LINK: &str = "NetworkLink";

const GRID_SIZE: RecordId = 100;
const TRACE_LENGTH: usize = 60;
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Read access to the current document plus a source of randomness.
pub struct GenerationContext<'a> {
    pub document: &'a ScenarioDocument,
    rng: &'a mut dyn RngCore,
}

impl<'a> GenerationContext<'a> {
    pub fn new(document: &'a ScenarioDocument, rng: &'a mut dyn RngCore) -> Self {
        Self { document, rng }
    }

    pub fn existing(&self, collection: &str) -> &'a [Record] {
        self.document.collection(collection)
    }

    pub fn random_id(&mut self, collection: &str) -> Option<RecordId> {
        pick_random_id(self.document, collection, &mut *self.rng)
    }

    pub fn random_ids(&mut self, collection: &str, count: usize) -> Vec<RecordId> {
        pick_random_ids(self.document, collection, count, &mut *self.rng)
    }

    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }
}

/// Source of synthetic records for bulk generation.
pub trait RecordFactory {
    /// Builds the record numbered `index` of `collection`, or `None` when a
    /// prerequisite is missing.
    fn generate(&self, collection: &str, index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record>;
}

fn record_from_json(value: JsonValue) -> Option<Record> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Generated record does not match the record shape: {e}");
            None
        }
    }
}

fn grid_position(index: RecordId) -> [RecordId; 2] {
    [(index % GRID_SIZE) * 2, (index / GRID_SIZE) * 2]
}

pub fn random_string(rng: &mut dyn RngCore, length: usize) -> String {
    (0..length)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

/// Access pattern wiring `user_id` to `app_id`, active forever.
pub fn access_pattern_record(id: RecordId, user_id: RecordId, app_id: RecordId) -> Option<Record> {
    record_from_json(json!({
        "attributes": {
            "id": id,
            "duration_values": [INFINITY_SENTINEL],
            "interval_values": [0],
            "history": [{
                "start": 1,
                "end": INFINITY_SENTINEL,
                "duration": INFINITY_SENTINEL,
                "waiting_time": 0,
                "access_time": 0,
                "interval": 0,
                "next_access": INFINITY_SENTINEL
            }]
        },
        "relationships": {
            "user": {"class": "User", "id": user_id},
            "app": {"class": "Application", "id": app_id}
        }
    }))
}

/// Link between two switches; one in five is a long-distance link.
pub fn network_link_record(id: RecordId, nodes: [RecordId; 2], long_distance: bool) -> Option<Record> {
    let (delay, bandwidth) = if long_distance { (200, 125.0) } else { (10, 12.5) };
    record_from_json(json!({
        "attributes": {
            "id": id,
            "delay": delay,
            "bandwidth": bandwidth,
            "bandwidth_demand": 0,
            "active": true
        },
        "relationships": {
            "topology": {"class": "Topology", "id": 1},
            "active_flows": [],
            "applications": [],
            "nodes": [
                {"class": "NetworkSwitch", "id": nodes[0]},
                {"class": "NetworkSwitch", "id": nodes[1]}
            ]
        }
    }))
}

struct ServerModel {
    name: &'static str,
    cpu: u32,
    memory: u32,
    disk: u32,
    max_power: u32,
    static_power: f64,
    provider: u32,
}

static SERVER_MODELS: [ServerModel; 3] = [
    ServerModel {
        name: "E5430",
        cpu: 8,
        memory: 16384,
        disk: 131072,
        max_power: 265,
        static_power: 0.6264,
        provider: 1,
    },
    ServerModel {
        name: "E5507",
        cpu: 8,
        memory: 8192,
        disk: 131072,
        max_power: 218,
        static_power: 0.3073,
        provider: 2,
    },
    ServerModel {
        name: "E5645",
        cpu: 12,
        memory: 16384,
        disk: 131072,
        max_power: 200,
        static_power: 0.3155,
        provider: 3,
    },
];

/// Generators for the EdgeSimPy scenario collections.
///
/// Unknown collections get a minimal `{id, label, type}` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeSimPyFactory;

impl RecordFactory for EdgeSimPyFactory {
    fn generate(&self, collection: &str, index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record> {
        match collection {
            "NetworkSwitch" => network_switch(index, context),
            "NetworkLink" => network_link(index, context),
            "BaseStation" => base_station(index, context),
            "User" => user(index, context),
            "EdgeServer" => edge_server(index, context),
            "Service" => service(index, context),
            "Application" => application(index, context),
            ACCESS_PATTERN => {
                let user_id = context.random_id("User").unwrap_or(index);
                let app_id = context.random_id("Application").unwrap_or(index);
                access_pattern_record(index, user_id, app_id)
            }
            other => record_from_json(json!({
                "attributes": {"id": index, "label": format!("item_{index}"), "type": other},
                "relationships": {}
            })),
        }
    }
}

fn network_switch(index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record> {
    let base_station_id = context.random_id("BaseStation").unwrap_or(index);
    record_from_json(json!({
        "attributes": {
            "id": index,
            "coordinates": grid_position(index),
            "active": true,
            "power_model_parameters": {
                "chassis_power": 60,
                "ports_power_consumption": {"125": 1, "12.5": 0.3}
            }
        },
        "relationships": {
            "power_model": "ConteratoNetworkPowerModel",
            "edge_servers": [],
            "links": [],
            "base_station": {"class": "BaseStation", "id": base_station_id}
        }
    }))
}

fn network_link(index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record> {
    let switch_ids = context.random_ids("NetworkSwitch", 2);
    if switch_ids.len() < 2 {
        warn!(
            "Cannot generate NetworkLink {index}: need at least 2 NetworkSwitches, found {}",
            switch_ids.len()
        );
        return None;
    }
    let long_distance = context.rng().gen_range(0..=100) > 80;
    network_link_record(index, [switch_ids[0], switch_ids[1]], long_distance)
}

fn base_station(index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record> {
    let Some(network_switch_id) = context.random_id("NetworkSwitch") else {
        warn!("Cannot generate BaseStation {index}: no NetworkSwitches available");
        return None;
    };
    record_from_json(json!({
        "attributes": {
            "id": index,
            "coordinates": grid_position(index),
            "wireless_delay": 10
        },
        "relationships": {
            "users": [],
            "edge_servers": [],
            "network_switch": {"class": "NetworkSwitch", "id": network_switch_id}
        }
    }))
}

fn user(index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record> {
    let cell = index.rem_euclid(GRID_SIZE * GRID_SIZE);
    let coordinates = [cell % GRID_SIZE, cell / GRID_SIZE];
    let base_station_id = context.random_id("BaseStation").unwrap_or(0);

    let app_count = context.rng().gen_range(1..=3);
    let application_ids = context.random_ids("Application", app_count);
    let access_pattern_ids = context.random_ids(ACCESS_PATTERN, application_ids.len());

    let mut delays = Map::new();
    let mut delay_slas = Map::new();
    let mut making_requests = Map::new();
    let mut access_patterns = Map::new();
    let mut applications = Vec::new();

    for (position, app_id) in application_ids.iter().enumerate() {
        let key = app_id.to_string();
        delays.insert(key.clone(), JsonValue::Null);
        delay_slas.insert(key.clone(), json!(context.rng().gen_range(30..=40)));
        making_requests.insert(key.clone(), json!({"1": true}));
        let pattern_id = access_pattern_ids.get(position).copied().unwrap_or(*app_id);
        access_patterns.insert(key, json!({"class": ACCESS_PATTERN, "id": pattern_id}));
        applications.push(json!({"class": "Application", "id": app_id}));
    }

    record_from_json(json!({
        "attributes": {
            "id": index,
            "coordinates": coordinates,
            "coordinates_trace": vec![coordinates; TRACE_LENGTH],
            "delays": delays,
            "delay_slas": delay_slas,
            "communication_paths": {},
            "making_requests": making_requests,
            "providers_trust": {"1": 2, "2": 2, "3": 2}
        },
        "relationships": {
            "access_patterns": access_patterns,
            "mobility_model": "pathway",
            "applications": applications,
            "base_station": {"class": "BaseStation", "id": base_station_id}
        }
    }))
}

fn edge_server(index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record> {
    let model = SERVER_MODELS.choose(context.rng())?;
    let base_station_id = context.random_id("BaseStation");
    let network_switch_id = context.random_id("NetworkSwitch");
    let (Some(base_station_id), Some(network_switch_id)) = (base_station_id, network_switch_id) else {
        warn!("Cannot generate EdgeServer {index}: need BaseStation and NetworkSwitch");
        return None;
    };

    record_from_json(json!({
        "attributes": {
            "id": index,
            "available": true,
            "model_name": model.name,
            "cpu": model.cpu,
            "memory": model.memory,
            "disk": model.disk,
            "cpu_demand": 0,
            "memory_demand": 0,
            "disk_demand": 0,
            "coordinates": grid_position(index),
            "max_concurrent_layer_downloads": 3,
            "active": true,
            "power_model_parameters": {
                "max_power_consumption": model.max_power,
                "static_power_percentage": model.static_power
            },
            "infrastructure_provider": model.provider
        },
        "relationships": {
            "power_model": "LinearServerPowerModel",
            "base_station": {"class": "BaseStation", "id": base_station_id},
            "network_switch": {"class": "NetworkSwitch", "id": network_switch_id},
            "services": [],
            "container_layers": [],
            "container_images": [],
            "container_registries": []
        }
    }))
}

fn service(index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record> {
    const CPU_OPTIONS: [u32; 4] = [2, 4, 8, 16];
    const MEMORY_OPTIONS: [u32; 4] = [2048, 4096, 8192, 16384];

    let application_id = context.random_id("Application").unwrap_or(index % 6 + 1);
    let image = context.existing("ContainerImage").choose(context.rng());
    let image_digest = image
        .and_then(|image| image.attribute("digest"))
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("sha256:{}", random_string(context.rng(), 64)));
    let image_label = image
        .and_then(|image| image.attribute("name"))
        .and_then(JsonValue::as_str)
        .unwrap_or("unknown")
        .to_string();

    let cpu_demand = CPU_OPTIONS.choose(context.rng()).copied().unwrap_or(2);
    let memory_demand = MEMORY_OPTIONS.choose(context.rng()).copied().unwrap_or(2048);

    record_from_json(json!({
        "attributes": {
            "id": index,
            "label": image_label,
            "state": 0,
            "_available": true,
            "cpu_demand": cpu_demand,
            "memory_demand": memory_demand,
            "image_digest": image_digest,
            "privacy_requirement": 0,
            "drop": false
        },
        "relationships": {
            "application": {"class": "Application", "id": application_id},
            "server": null
        }
    }))
}

fn application(index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record> {
    let service_id = context.random_id("Service").unwrap_or(index);
    let user_id = context.random_id("User").unwrap_or(index);
    record_from_json(json!({
        "attributes": {"id": index, "label": ""},
        "relationships": {
            "services": [{"class": "Service", "id": service_id}],
            "users": [{"class": "User", "id": user_id}]
        }
    }))
}

/// Clones a template record, filling in placeholders.
///
/// In every string value `{ID}` becomes the index, `{NAME}` becomes
/// `item_<index>`, `{RANDOM}` eight random characters (the same eight for
/// every occurrence within one string) and `{TIMESTAMP}` the current UTC
/// time. A numeric `-1` becomes a random integer in `0..=1000`.
///
/// Substitution keeps the value a string, so `"{ID}"` yields a string id.
/// Leave `attributes.id` out of the template to get numeric ids assigned
/// during generation.
///
/// # Examples
///
/// ```rust
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use scenario_editor_core::record_factory::{GenerationContext, RecordFactory, TemplateFactory};
/// use scenario_editor_core::scenario_model::ScenarioDocument;
/// use serde_json::json;
///
/// let factory = TemplateFactory::new(json!({"attributes": {"label": "{NAME}", "code": "s-{ID}"}}));
/// let document = ScenarioDocument::new();
/// let mut rng = StdRng::seed_from_u64(1);
/// let mut context = GenerationContext::new(&document, &mut rng);
///
/// let record = factory.generate("Sensor", 12, &mut context).unwrap();
/// assert_eq!(record.attribute("label"), Some(&json!("item_12")));
/// assert_eq!(record.attribute("code"), Some(&json!("s-12")));
/// ```
#[derive(Debug, Clone)]
pub struct TemplateFactory {
    template: JsonValue,
}

impl TemplateFactory {
    pub fn new(template: JsonValue) -> Self {
        Self { template }
    }

    fn fill(&self, value: &JsonValue, index: RecordId, timestamp: &str, rng: &mut dyn RngCore) -> JsonValue {
        match value {
            JsonValue::String(text) => {
                let mut filled = text
                    .replace("{ID}", &index.to_string())
                    .replace("{NAME}", &format!("item_{index}"))
                    .replace("{TIMESTAMP}", timestamp);
                if filled.contains("{RANDOM}") {
                    filled = filled.replace("{RANDOM}", &random_string(rng, 8));
                }
                JsonValue::String(filled)
            }
            JsonValue::Number(number) if number.as_f64() == Some(-1.0) => json!(rng.gen_range(0..=1000)),
            JsonValue::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.fill(item, index, timestamp, rng))
                    .collect(),
            ),
            JsonValue::Object(object) => JsonValue::Object(
                object
                    .iter()
                    .map(|(key, item)| (key.clone(), self.fill(item, index, timestamp, rng)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl RecordFactory for TemplateFactory {
    fn generate(&self, _collection: &str, index: RecordId, context: &mut GenerationContext<'_>) -> Option<Record> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let filled = self.fill(&self.template, index, &timestamp, context.rng());
        record_from_json(filled)
    }
}
