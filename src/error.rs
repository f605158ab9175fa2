use std::fmt;

/// Everything that can stop the bootstrap sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapError {
    /// A resource request never produced a response.
    Transport { url: String, message: String },
    /// The description answered with a status outside `[200, 300)`.
    HttpStatus { url: String, status: u16 },
    /// A response body was not the structured data we expected.
    Format { url: String, message: String },
    /// The engine has to be loaded but the description names no version.
    MissingEngineVersion,
    /// The description was exported with an unpublished debug engine.
    DebugEngineVersion { version: String },
    /// The engine script tag fired `error`.
    ScriptLoad { version: String },
    DeviceCreation(HostError),
    DependencyLoad(HostError),
    /// Context or node creation, or a graph connection, failed.
    Audio(HostError),
    /// A page control could not be built.
    Surface(HostError),
}

/// Opaque failure reported by a host seam (browser, engine, fake).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError(pub String);

/// Why live input could not be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The host has no capture API at all.
    Unsupported,
    /// Capture was requested and refused (or failed).
    Denied(String),
}

impl BootstrapError {
    /// Response status attached to the failure, if there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            BootstrapError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Transport { url, message } => {
                write!(f, "Failed to fetch \"{url}\": {message}")
            }
            BootstrapError::HttpStatus { url, status } => {
                write!(f, "Fetching \"{url}\" returned HTTP {status}")
            }
            BootstrapError::Format { url, message } => {
                write!(f, "Invalid JSON in \"{url}\": {message}")
            }
            BootstrapError::MissingEngineVersion => {
                write!(f, "Patcher export does not declare an RNBO version")
            }
            BootstrapError::DebugEngineVersion { .. } => write!(
                f,
                "Patcher exported with a Debug Version!\nPlease specify the correct RNBO version to use in the code."
            ),
            BootstrapError::ScriptLoad { version } => write!(f, "Failed to load rnbo.js v{version}"),
            BootstrapError::DeviceCreation(e) => write!(f, "Device creation failed: {e}"),
            BootstrapError::DependencyLoad(e) => write!(f, "Loading data buffer dependencies failed: {e}"),
            BootstrapError::Audio(e) => write!(f, "Audio graph error: {e}"),
            BootstrapError::Surface(e) => write!(f, "Page control error: {e}"),
        }
    }
}

impl std::error::Error for BootstrapError {}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for HostError {}

impl From<&str> for HostError {
    fn from(message: &str) -> Self {
        HostError(message.to_string())
    }
}

impl From<String> for HostError {
    fn from(message: String) -> Self {
        HostError(message)
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Unsupported => write!(f, "getUserMedia not supported on this browser"),
            CaptureError::Denied(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for CaptureError {}
