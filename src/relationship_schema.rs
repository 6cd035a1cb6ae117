//! Declared relationships between scenario collections.
//!
//! For each source collection the schema lists its owning relationship
//! fields and, for each, the collection they point at plus the field on the
//! other side that should hold the back-reference. Whether that reciprocal
//! field holds one reference or an array of them is decided by name alone,
//! from [`RelationshipSchema::array_fields`].

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Field names whose reciprocal value is an array of references.
pub const DEFAULT_ARRAY_FIELDS: [&str; 6] = [
    "applications",
    "users",
    "services",
    "edge_servers",
    "links",
    "access_patterns",
];

/// Where a relationship field points and which field answers back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReciprocalTarget {
    /// Collection the owning field references.
    #[serde(rename = "type")]
    pub collection: String,
    /// Field on the referenced record holding the back-reference.
    pub field: String,
}

/// Immutable relationship table handed to the synchronizer.
///
/// # Examples
///
/// ```rust
/// use scenario_editor_core::relationship_schema::RelationshipSchema;
///
/// let schema = RelationshipSchema::edgesimpy();
/// let target = schema.reciprocal("EdgeServer", "base_station").unwrap();
/// assert_eq!(target.collection, "BaseStation");
/// assert_eq!(target.field, "edge_servers");
/// assert!(schema.is_array_field("edge_servers"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSchema {
    pub mappings: IndexMap<String, IndexMap<String, ReciprocalTarget>>,
    pub array_fields: IndexSet<String>,
}

impl Default for RelationshipSchema {
    fn default() -> Self {
        Self::edgesimpy()
    }
}

impl RelationshipSchema {
    /// Schema without mappings, using the default array-field allow-list.
    pub fn empty() -> Self {
        Self {
            mappings: IndexMap::new(),
            array_fields: DEFAULT_ARRAY_FIELDS.iter().map(|field| field.to_string()).collect(),
        }
    }

    /// Relationships of the EdgeSimPy scenario format.
    pub fn edgesimpy() -> Self {
        Self::empty()
            .with_mapping("User", "applications", "Application", "users")
            .with_mapping("User", "base_station", "BaseStation", "users")
            .with_mapping("User", "access_patterns", "CircularDurationAndIntervalAccessPattern", "user")
            .with_mapping("Application", "services", "Service", "application")
            .with_mapping("Application", "users", "User", "applications")
            .with_mapping("Service", "application", "Application", "services")
            .with_mapping("Service", "server", "EdgeServer", "services")
            .with_mapping("EdgeServer", "services", "Service", "server")
            .with_mapping("EdgeServer", "base_station", "BaseStation", "edge_servers")
            .with_mapping("EdgeServer", "network_switch", "NetworkSwitch", "edge_servers")
            .with_mapping("BaseStation", "users", "User", "base_station")
            .with_mapping("BaseStation", "edge_servers", "EdgeServer", "base_station")
            .with_mapping("BaseStation", "network_switch", "NetworkSwitch", "base_station")
            .with_mapping("NetworkSwitch", "edge_servers", "EdgeServer", "network_switch")
            .with_mapping("NetworkSwitch", "base_station", "BaseStation", "network_switch")
            .with_mapping("NetworkSwitch", "links", "NetworkLink", "nodes")
            .with_mapping("CircularDurationAndIntervalAccessPattern", "user", "User", "access_patterns")
            .with_mapping("CircularDurationAndIntervalAccessPattern", "app", "Application", "access_patterns")
    }

    pub fn with_mapping(mut self, source: &str, field: &str, target: &str, reciprocal: &str) -> Self {
        self.mappings.entry(source.to_string()).or_default().insert(
            field.to_string(),
            ReciprocalTarget {
                collection: target.to_string(),
                field: reciprocal.to_string(),
            },
        );
        self
    }

    pub fn with_array_field(mut self, field: &str) -> Self {
        self.array_fields.insert(field.to_string());
        self
    }

    /// Owning fields declared for `collection`, if any.
    pub fn owning_fields(&self, collection: &str) -> Option<&IndexMap<String, ReciprocalTarget>> {
        self.mappings.get(collection)
    }

    pub fn reciprocal(&self, collection: &str, field: &str) -> Option<&ReciprocalTarget> {
        self.owning_fields(collection)?.get(field)
    }

    pub fn is_array_field(&self, field: &str) -> bool {
        self.array_fields.contains(field)
    }
}
