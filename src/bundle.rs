//! Export bundle loading — the device description and its optional
//! dependency list, fetched through any [`ResourceFetcher`].
//!
//! The page session uses the two loaders directly; [`inspect`] runs the
//! same requests without an audio host so a bundle can be checked from
//! the command line (`check-bundle`, feature `native`).

use serde::Serialize;

use crate::config::BootstrapConfig;
use crate::dependency::{self, Dependency};
use crate::description::DeviceDescription;
use crate::engine;
use crate::error::BootstrapError;
use crate::fetch::ResourceFetcher;

/// Fetch and parse the device description at `url`.
pub async fn fetch_description<F: ResourceFetcher>(fetcher: &F, url: &str) -> Result<DeviceDescription, BootstrapError> {
    let response = fetcher.fetch(url).await.map_err(|e| BootstrapError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if !response.ok() {
        return Err(BootstrapError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }
    DeviceDescription::parse(&response.body).map_err(|e| BootstrapError::Format {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Fetch the dependency list at `url` with file references rewritten
/// under `export_dir`. Any failure means "no dependencies".
pub async fn fetch_dependencies<F: ResourceFetcher>(fetcher: &F, url: &str, export_dir: &str) -> Vec<Dependency> {
    let parsed = match fetcher.fetch(url).await {
        Ok(response) if response.ok() => dependency::parse_list(&response.body).map_err(|e| e.to_string()),
        Ok(response) => Err(format!("HTTP {}", response.status)),
        Err(e) => Err(e.to_string()),
    };
    match parsed {
        Ok(list) => dependency::rewrite_file_references(list, export_dir),
        Err(reason) => {
            log::debug!("no dependencies from {url}: {reason}");
            Vec::new()
        }
    }
}

/// What a page would load for a bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReport {
    pub name: Option<String>,
    pub engine_version: Option<String>,
    /// Hosted engine script, when the description names a version.
    pub engine_script: Option<String>,
    pub parameters: Vec<String>,
    pub presets: Vec<String>,
    pub dependencies: Vec<Dependency>,
}

/// Load a bundle the way `Session::bootstrap` does, stopping short of the
/// engine and audio graph.
pub async fn inspect<F: ResourceFetcher>(fetcher: &F, config: &BootstrapConfig) -> Result<BundleReport, BootstrapError> {
    let description = fetch_description(fetcher, &config.patch_export_url).await?;
    let engine_script = match description.engine_version() {
        Some(version) => {
            engine::validate_version(version)?;
            Some(engine::script_url(&config.engine_base_url, version))
        }
        None => None,
    };
    let dependencies = fetch_dependencies(fetcher, &config.dependencies_url, &config.export_dir).await;

    let desc = &description.export().desc;
    Ok(BundleReport {
        name: description.name().map(str::to_string),
        engine_version: description.engine_version().map(str::to_string),
        engine_script,
        parameters: desc.parameters.iter().map(|p| p.id.clone()).collect(),
        presets: description.presets().iter().map(|p| p.name.clone()).collect(),
        dependencies,
    })
}
