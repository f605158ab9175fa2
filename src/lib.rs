pub mod audio;
pub mod bundle;
pub mod config;
pub mod controls;
pub mod dependency;
pub mod description;
pub mod device;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod microphone;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(test)]
mod fake;

pub use crate::config::BootstrapConfig;
pub use crate::error::BootstrapError;
pub use crate::session::{BootstrapOutcome, Session, SessionPhase};

use serde::Serialize;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the voicechanger_web version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: hosted engine script URL for `version`.
/// Errors for debug-build versions, which are never published.
#[wasm_bindgen]
pub fn engine_script_url(version: &str) -> Result<String, JsValue> {
    engine::validate_version(version).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(engine::script_url(config::DEFAULT_ENGINE_BASE_URL, version))
}

/// WASM-exposed: prefix the `file` of every dependency entry with `export_dir`.
#[wasm_bindgen]
pub fn rewrite_dependencies(dependencies: JsValue, export_dir: &str) -> Result<JsValue, JsValue> {
    let list: Vec<dependency::Dependency> =
        serde_wasm_bindgen::from_value(dependencies).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let rewritten = dependency::rewrite_file_references(list, export_dir);
    rewritten
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}
