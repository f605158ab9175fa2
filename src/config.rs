//! Page configuration — resource locations, engine host, and which
//! optional controls to build.
//!
//! Every field has a default matching the stock export layout, so an
//! empty JSON object (or no config at all) is a valid configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PATCH_EXPORT_URL: &str = "patch.export.json";
pub const DEFAULT_DEPENDENCIES_URL: &str = "dependencies.json";
pub const DEFAULT_EXPORT_DIR: &str = "export/";
pub const DEFAULT_ENGINE_BASE_URL: &str = "https://c74-public.nyc3.digitaloceanspaces.com/rnbo/";
pub const DEFAULT_TITLE: &str = "Voice Changer Website";

/// Settings consumed by the bootstrapper and the control builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BootstrapConfig {
    /// Location of the exported device description.
    pub patch_export_url: String,
    /// Location of the optional dependency list.
    pub dependencies_url: String,
    /// Prefix applied to every dependency `file`.
    pub export_dir: String,
    /// Directory holding one `<version>/rnbo.min.js` per engine release.
    pub engine_base_url: String,
    /// Text written into the title element.
    pub title: String,
    pub midi_keyboard: bool,
    pub inport_form: bool,
    pub outport_console: bool,
    pub presets: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            patch_export_url: DEFAULT_PATCH_EXPORT_URL.to_string(),
            dependencies_url: DEFAULT_DEPENDENCIES_URL.to_string(),
            export_dir: DEFAULT_EXPORT_DIR.to_string(),
            engine_base_url: DEFAULT_ENGINE_BASE_URL.to_string(),
            title: DEFAULT_TITLE.to_string(),
            midi_keyboard: false,
            inport_form: false,
            outport_console: false,
            presets: false,
        }
    }
}

impl BootstrapConfig {
    /// Parse a JSON config, falling back to defaults for missing keys.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
