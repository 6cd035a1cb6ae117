//! Fetching scenario text from a URL or a local file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;
use reqwest::blocking::Client;

use crate::app_response::AppResponse;

/// Blocking HTTP fetcher for remote scenario files.
#[derive(Debug, Clone)]
pub struct ScenarioLoader {
    client: Client,
}

impl ScenarioLoader {
    pub fn new(timeout_secs: u64) -> Result<Self, AppResponse> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppResponse::TransportError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Body of `url`; any non-success status is a transport error.
    pub fn fetch_text(&self, url: &str) -> Result<String, AppResponse> {
        info!("Fetching scenario from {url}");
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppResponse::TransportError(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        Ok(response.text()?)
    }
}

pub fn read_file_text(path: impl AsRef<Path>) -> Result<String, AppResponse> {
    let path = path.as_ref();
    info!("Reading scenario from {}", path.display());
    fs::read_to_string(path)
        .map_err(|e| AppResponse::TransportError(format!("Cannot read {}: {e}", path.display())))
}
