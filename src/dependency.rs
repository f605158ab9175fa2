//! Optional data-buffer dependencies listed in `dependencies.json`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the dependency list, kept as exported.
///
/// Only a string `file` is interpreted; everything else (including
/// entries that are not objects) is handed to the engine untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dependency(pub Value);

impl Dependency {
    /// The referenced file, if the entry names one.
    pub fn file(&self) -> Option<&str> {
        self.0.get("file").and_then(Value::as_str)
    }
}

/// Parse a dependency list body. Only a non-array body is an error;
/// callers decide whether that matters.
pub fn parse_list(body: &str) -> Result<Vec<Dependency>, serde_json::Error> {
    serde_json::from_str(body)
}

/// Prefix every non-empty string `file` with `export_dir`. All other
/// entries are returned unchanged.
pub fn rewrite_file_references(dependencies: Vec<Dependency>, export_dir: &str) -> Vec<Dependency> {
    dependencies
        .into_iter()
        .map(|mut d| {
            if let Some(Value::String(file)) = d.0.get_mut("file") {
                if !file.is_empty() {
                    file.insert_str(0, export_dir);
                }
            }
            d
        })
        .collect()
}
