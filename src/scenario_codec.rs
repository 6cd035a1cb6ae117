//! Text codec for scenario files.
//!
//! Scenario files produced by the simulator contain the bare token `Infinity`,
//! which strict JSON rejects. Before parsing, the token is rewritten to
//! [`INFINITY_SENTINEL`]; after serializing, the sentinel is rewritten back.
//! The rewrite works on the text, not on the parsed tree, so an ordinary
//! integer field holding exactly the sentinel also comes back as `Infinity`.

use log::debug;
use regex::Regex;

use crate::app_response::AppResponse;
use crate::scenario_model::{Record, ScenarioDocument};

/// Stand-in for `Infinity` while the document is in memory (2^53 - 1).
pub const INFINITY_SENTINEL: i64 = 9007199254740991;

impl From<regex::Error> for AppResponse {
    fn from(err: regex::Error) -> Self {
        AppResponse::SerializationError(format!("Invalid rewrite pattern: {}", err))
    }
}

/// Parses and serializes scenario text with the `Infinity` substitution.
///
/// # Examples
///
/// ```rust
/// use scenario_editor_core::scenario_codec::ScenarioCodec;
///
/// let codec = ScenarioCodec::new()?;
/// let document = codec.parse_document(r#"{"Service": [{"attributes": {"id": 1, "ttl": Infinity}}]}"#)?;
/// let text = codec.serialize_document(&document)?;
/// assert!(text.contains(r#""ttl": Infinity"#));
/// # Ok::<(), scenario_editor_core::app_response::AppResponse>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioCodec {
    infinity_value: Regex,
    infinity_array: Regex,
    sentinel_value: Regex,
    sentinel_array: Regex,
}

impl ScenarioCodec {
    pub fn new() -> Result<Self, AppResponse> {
        Ok(Self {
            infinity_value: Regex::new(r":\s*Infinity")?,
            infinity_array: Regex::new(r"\[\s*Infinity\s*\]")?,
            sentinel_value: Regex::new(&format!(r":\s*{INFINITY_SENTINEL}([,\n\r\s}}]|$)"))?,
            sentinel_array: Regex::new(&format!(r"\[\s*{INFINITY_SENTINEL}\s*\]"))?,
        })
    }

    /// `Infinity` to sentinel, applied before parsing.
    pub fn clean_infinity_values(&self, text: &str) -> String {
        let replaced = self
            .infinity_value
            .replace_all(text, format!(": {INFINITY_SENTINEL}").as_str());
        self.infinity_array
            .replace_all(&replaced, format!("[{INFINITY_SENTINEL}]").as_str())
            .into_owned()
    }

    /// Sentinel to `Infinity`, applied after serializing.
    pub fn infinity_to_string(&self, text: &str) -> String {
        let replaced = self.sentinel_value.replace_all(text, ": Infinity${1}");
        self.sentinel_array.replace_all(&replaced, "[Infinity]").into_owned()
    }

    pub fn parse_document(&self, text: &str) -> Result<ScenarioDocument, AppResponse> {
        let cleaned = self.clean_infinity_values(text);
        let document: ScenarioDocument = serde_json::from_str(&cleaned)?;
        debug!(
            "Parsed scenario with {} collections and {} records",
            document.collections.len(),
            document.record_count()
        );
        Ok(document)
    }

    /// Pretty JSON with two-space indentation.
    pub fn serialize_document(&self, document: &ScenarioDocument) -> Result<String, AppResponse> {
        let json = serde_json::to_string_pretty(document)?;
        Ok(self.infinity_to_string(&json))
    }

    pub fn parse_record(&self, text: &str) -> Result<Record, AppResponse> {
        let cleaned = self.clean_infinity_values(text);
        Ok(serde_json::from_str(&cleaned)?)
    }

    pub fn serialize_record(&self, record: &Record) -> Result<String, AppResponse> {
        let json = serde_json::to_string_pretty(record)?;
        Ok(self.infinity_to_string(&json))
    }
}
