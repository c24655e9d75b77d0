//! User-editable settings.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SYNC_ENDPOINT;

/// Persisted settings: the remote endpoint contracts are pushed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Sync endpoint. `None` disables sync.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_endpoint(DEFAULT_SYNC_ENDPOINT)
    }
}

impl Settings {
    /// Settings pointing at `endpoint`.
    #[must_use]
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: Some(endpoint.to_string()),
        }
    }

    /// The endpoint to push to, if one is set and not blank.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Save a new endpoint; blank input restores `fallback`.
    pub fn set_endpoint(&mut self, raw: &str, fallback: &str) {
        let raw = raw.trim();
        let url = if raw.is_empty() { fallback } else { raw };
        self.endpoint = Some(url.to_string());
    }

    /// Turn sync off.
    pub fn clear_endpoint(&mut self) {
        self.endpoint = None;
    }
}
