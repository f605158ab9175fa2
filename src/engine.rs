//! Engine resolution — make sure the patch runtime matching a
//! description is available before a device is created.
//!
//! The version check is pure and runs before any script request, so a
//! debug export fails without touching the network.

use std::sync::LazyLock;

use regex::Regex;

use crate::description::DeviceDescription;
use crate::error::{BootstrapError, HostError};

static DEBUG_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+-dev$").expect("valid debug-version pattern"));

/// Host capability for loading the engine script.
#[allow(async_fn_in_trait)]
pub trait EngineLoader {
    /// Is the engine already present (e.g. included with a script tag)?
    fn engine_loaded(&self) -> bool;

    /// Inject the script at `url` and wait for it to load or fail.
    async fn load_engine_script(&self, url: &str) -> Result<(), HostError>;
}

/// How the engine became available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineHandle {
    /// Present before bootstrap started.
    Preloaded,
    /// Loaded during bootstrap from this URL.
    Loaded { version: String, url: String },
}

/// Reject versions that only exist as local debug builds.
pub fn validate_version(version: &str) -> Result<(), BootstrapError> {
    if DEBUG_VERSION.is_match(version) {
        return Err(BootstrapError::DebugEngineVersion {
            version: version.to_string(),
        });
    }
    Ok(())
}

/// Hosted script location for `version` under `base_url`.
pub fn script_url(base_url: &str, version: &str) -> String {
    format!("{base_url}{}/rnbo.min.js", encode_uri_component(version))
}

/// Make the engine required by `description` available.
pub async fn resolve<L: EngineLoader>(
    loader: &L,
    description: &DeviceDescription,
    base_url: &str,
) -> Result<EngineHandle, BootstrapError> {
    if loader.engine_loaded() {
        return Ok(EngineHandle::Preloaded);
    }
    let version = description
        .engine_version()
        .ok_or(BootstrapError::MissingEngineVersion)?;
    validate_version(version)?;

    let url = script_url(base_url, version);
    log::info!("loading engine v{version} from {url}");
    loader.load_engine_script(&url).await.map_err(|e| {
        log::error!("engine script failed: {e}");
        BootstrapError::ScriptLoad {
            version: version.to_string(),
        }
    })?;
    Ok(EngineHandle::Loaded {
        version: version.to_string(),
        url,
    })
}

/// Percent-encode everything outside `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingLoader {
        preloaded: bool,
        fail: bool,
        requested: RefCell<Vec<String>>,
    }

    impl RecordingLoader {
        fn new(preloaded: bool, fail: bool) -> Self {
            RecordingLoader {
                preloaded,
                fail,
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl EngineLoader for RecordingLoader {
        fn engine_loaded(&self) -> bool {
            self.preloaded
        }

        async fn load_engine_script(&self, url: &str) -> Result<(), HostError> {
            self.requested.borrow_mut().push(url.to_string());
            if self.fail { Err("404".into()) } else { Ok(()) }
        }
    }

    fn description(version: Option<&str>) -> DeviceDescription {
        let meta = match version {
            Some(v) => serde_json::json!({ "rnboversion": v }),
            None => serde_json::json!({}),
        };
        DeviceDescription::from_value(serde_json::json!({ "desc": { "meta": meta } }))
    }

    #[test]
    fn debug_versions_are_rejected() {
        assert!(validate_version("1.2.3-dev").is_err());
        assert!(validate_version("10.20.30-dev").is_err());
        assert!(validate_version("1.2.3").is_ok());
        assert!(validate_version("1.2.3-beta").is_ok());
        assert!(validate_version("1.2-dev").is_ok());
        assert!(validate_version("x1.2.3-dev").is_ok());
    }

    #[test]
    fn url_is_versioned_and_encoded() {
        assert_eq!(
            script_url("https://cdn.example/rnbo/", "1.3.4"),
            "https://cdn.example/rnbo/1.3.4/rnbo.min.js"
        );
        assert_eq!(script_url("/", "1.0 beta/x"), "/1.0%20beta%2Fx/rnbo.min.js");
    }

    #[test]
    fn debug_version_fails_before_any_script_request() {
        let loader = RecordingLoader::new(false, false);
        let err = pollster::block_on(resolve(&loader, &description(Some("1.2.3-dev")), "/"))
            .unwrap_err();
        assert!(matches!(err, BootstrapError::DebugEngineVersion { .. }));
        assert!(loader.requested.borrow().is_empty());
    }

    #[test]
    fn preloaded_engine_skips_loading() {
        let loader = RecordingLoader::new(true, false);
        // Even a debug version is fine when the page ships the engine itself.
        let handle = pollster::block_on(resolve(&loader, &description(Some("1.2.3-dev")), "/")).unwrap();
        assert_eq!(handle, EngineHandle::Preloaded);
        assert!(loader.requested.borrow().is_empty());
    }

    #[test]
    fn script_failure_becomes_script_load_error() {
        let loader = RecordingLoader::new(false, true);
        let err = pollster::block_on(resolve(&loader, &description(Some("1.3.4")), "/rnbo/")).unwrap_err();
        assert_eq!(err, BootstrapError::ScriptLoad { version: "1.3.4".into() });
        assert_eq!(*loader.requested.borrow(), vec!["/rnbo/1.3.4/rnbo.min.js".to_string()]);
    }

    #[test]
    fn missing_version_is_reported() {
        let loader = RecordingLoader::new(false, false);
        let err = pollster::block_on(resolve(&loader, &description(None), "/")).unwrap_err();
        assert_eq!(err, BootstrapError::MissingEngineVersion);
    }
}
