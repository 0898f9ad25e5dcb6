//! Client configuration.
//!
//! The project fields are passed through to the backend untouched. The only
//! setting this crate interprets is `use_emulators`.

use serde::Deserialize;

/// Environment variable selecting emulation mode.
pub const USE_EMULATORS_ENV: &str = "USE_EMULATORS";

/// Project configuration for the remote services.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub project_id: String,
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub storage_bucket: Option<String>,
    pub app_id: Option<String>,
    /// Reroute every service to its local emulator at connection creation.
    pub use_emulators: bool,
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    pub fn with_emulators(mut self, use_emulators: bool) -> Self {
        self.use_emulators = use_emulators;
        self
    }

    /// Parse a static project configuration object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Layer the process environment over `self`.
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Layer values from `lookup` over `self`.
    ///
    /// An absent emulator flag leaves the configuration as it was; it is never
    /// an error.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(USE_EMULATORS_ENV) {
            self.use_emulators = is_truthy(&raw);
        }
        self
    }
}

/// Boolean-like flag parsing: set and non-empty means on, unless it spells off.
fn is_truthy(raw: &str) -> bool {
    let raw = raw.trim();
    !raw.is_empty()
        && !matches!(
            raw.to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        )
}
