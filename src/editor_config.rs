//! Editor configuration.
//!
//! Every field has a default, so an empty JSON object (or no configuration at
//! all) yields a working editor. Hosts usually override only `store_path` and
//! `seed`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::relationship_schema::RelationshipSchema;

/// Example scenario offered on the empty screen.
pub const DEFAULT_URL: &str =
    "https://raw.githubusercontent.com/EdgeSimPy/edgesimpy-tutorials/master/datasets/sample_dataset1.json";

/// Name of the exported scenario file.
pub const EXPORT_FILE_NAME: &str = "edgesimpy-scenario.json";

/// Upper bound on records produced by one generation request.
pub const MAX_GENERATE_COUNT: i64 = 10_000;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// LMDB map size for the snapshot store (64 MiB).
pub const DEFAULT_STORE_MAP_SIZE: usize = 64 * 1024 * 1024;

/// # Examples
///
/// ```rust
/// use scenario_editor_core::editor_config::EditorConfig;
///
/// let config = EditorConfig::from_json_str(r#"{"seed": 42, "max_generate_count": 500}"#)?;
/// assert_eq!(config.seed, Some(42));
/// assert_eq!(config.max_generate_count, 500);
/// assert_eq!(config.export_file_name, "edgesimpy-scenario.json");
/// # Ok::<(), scenario_editor_core::app_response::AppResponse>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub default_url: String,
    pub export_file_name: String,
    pub max_generate_count: i64,
    pub http_timeout_secs: u64,
    /// Seed for generation; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Directory of the snapshot store; `None` disables snapshots.
    pub store_path: Option<String>,
    pub store_map_size: usize,
    pub relationship_schema: RelationshipSchema,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_URL.to_string(),
            export_file_name: EXPORT_FILE_NAME.to_string(),
            max_generate_count: MAX_GENERATE_COUNT,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            seed: None,
            store_path: None,
            store_map_size: DEFAULT_STORE_MAP_SIZE,
            relationship_schema: RelationshipSchema::edgesimpy(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(text: &str) -> Result<Self, AppResponse> {
        let config: EditorConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppResponse> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            AppResponse::BadRequest(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.max_generate_count <= 0 || self.max_generate_count > MAX_GENERATE_COUNT {
            return Err(AppResponse::ValidationError(format!(
                "max_generate_count must be between 1 and {MAX_GENERATE_COUNT}"
            )));
        }
        if self.export_file_name.trim().is_empty() {
            return Err(AppResponse::ValidationError("export_file_name cannot be empty".to_string()));
        }
        if self.store_map_size == 0 {
            return Err(AppResponse::ValidationError("store_map_size must be greater than 0".to_string()));
        }
        Ok(())
    }
}
