//! Device description types for `patch.export.json`.
//!
//! The engine consumes the raw document as-is; these types are the
//! read-only view the page needs (engine version, parameters, ports,
//! presets). Export layouts differ between engine releases, so the view
//! never rejects a document: unknown keys are ignored, and a missing,
//! `null` or oddly shaped field reads as its default. List fields drop
//! only the entries they cannot read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Description (top-level) ─────────────────────────────────

/// A loaded device description: the verbatim JSON plus a typed view.
#[derive(Debug, Clone)]
pub struct DeviceDescription {
    raw: Value,
    export: PatcherExport,
}

/// Typed view of the export document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatcherExport {
    #[serde(default, deserialize_with = "lenient")]
    pub desc: PatcherDesc,
    /// Presets stored alongside the patch.
    #[serde(default, deserialize_with = "lenient_list")]
    pub presets: Vec<PresetEntry>,
}

/// The `desc` block: graph metadata and its public surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatcherDesc {
    #[serde(default, deserialize_with = "lenient")]
    pub meta: PatcherMeta,
    #[serde(default, deserialize_with = "lenient_list")]
    pub parameters: Vec<ParameterDesc>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub inports: Vec<PortDesc>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub outports: Vec<PortDesc>,
    #[serde(default, rename = "numMidiInputPorts", deserialize_with = "lenient")]
    pub num_midi_input_ports: u32,
    #[serde(default, rename = "numMidiOutputPorts", deserialize_with = "lenient")]
    pub num_midi_output_ports: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatcherMeta {
    /// Engine release the patch was exported with, e.g. "1.3.4".
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub rnboversion: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// One automatable parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDesc {
    #[serde(default, rename = "paramId", deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub minimum: f64,
    #[serde(default = "default_maximum", deserialize_with = "lenient_maximum")]
    pub maximum: f64,
    #[serde(default, rename = "initialValue", deserialize_with = "lenient")]
    pub initial_value: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub steps: u32,
}

fn default_maximum() -> f64 {
    1.0
}

/// A named message port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDesc {
    #[serde(default, deserialize_with = "lenient")]
    pub tag: String,
}

/// A preset as stored in the export: a name and an opaque state blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetEntry {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default)]
    pub preset: Value,
}

// ── Lenient field readers ───────────────────────────────────

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_maximum<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or_else(default_maximum))
}

/// A list whose unreadable entries are skipped; anything but an array
/// reads as empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items.into_iter().filter_map(|item| T::deserialize(item).ok()).collect())
}

// ── Parsing ─────────────────────────────────────────────────

impl DeviceDescription {
    /// Build from an already-parsed JSON document. Any JSON document is
    /// accepted; whatever the view cannot read is left at its default.
    pub fn from_value(raw: Value) -> Self {
        let export = PatcherExport::deserialize(&raw).unwrap_or_default();
        DeviceDescription { raw, export }
    }

    /// Parse a response body. Fails only when the body is not JSON.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(serde_json::from_str(body)?))
    }

    /// The document exactly as fetched; this is what the engine receives.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn export(&self) -> &PatcherExport {
        &self.export
    }

    /// Engine release required to run this description.
    pub fn engine_version(&self) -> Option<&str> {
        self.export.desc.meta.rnboversion.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.export.desc.meta.name.as_deref()
    }

    pub fn parameters(&self) -> &[ParameterDesc] {
        &self.export.desc.parameters
    }

    pub fn presets(&self) -> &[PresetEntry] {
        &self.export.presets
    }
}

// ── Tests ───────────────────────────────────────────────────
