//! Diagnostic reports handed to the page's error-presentation hook.

use serde::Serialize;

use crate::error::BootstrapError;

pub const EXPORT_HEADER: &str = "Couldn't load patcher export bundle";

/// Payload for a failed bootstrap step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(serialize_with = "as_display")]
    pub error: BootstrapError,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Receives `Some(report)` on failure and `None` once on success.
///
/// `installed` is asked right before each report; when it says no, the
/// failure propagates to the caller instead. Plain closures are always
/// installed.
pub trait DiagnosticHook {
    fn installed(&self) -> bool {
        true
    }

    fn report(&self, diagnostic: Option<&Diagnostic>);
}

impl<F: Fn(Option<&Diagnostic>)> DiagnosticHook for F {
    fn report(&self, diagnostic: Option<&Diagnostic>) {
        self(diagnostic)
    }
}

impl Diagnostic {
    /// A bare report, no presentation hints.
    pub fn new(error: BootstrapError) -> Self {
        Diagnostic {
            error,
            header: None,
            description: None,
        }
    }

    /// Report for a description-loading failure. Hints pointing at the
    /// configured location are added only when the server answered with
    /// an unsuccessful status.
    pub fn for_export(error: BootstrapError, export_url: &str) -> Self {
        let unsuccessful = error.status().is_some_and(|s| !(200..300).contains(&s));
        if !unsuccessful {
            return Diagnostic::new(error);
        }
        Diagnostic {
            error,
            header: Some(EXPORT_HEADER.to_string()),
            description: Some(format!(
                "Check the page configuration to see what file it's trying to load. Currently it's \
                 trying to load \"{export_url}\". If that doesn't match the name of the file you \
                 exported from RNBO, change patchExportUrl."
            )),
        }
    }
}

fn as_display<S: serde::Serializer>(error: &BootstrapError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
