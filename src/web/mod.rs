//! Browser entry point.
//!
//! On module start a session is built from the page (config, control
//! surface, `guardrails` hook) and the first click on `<body>` runs
//! [`setup`]. A rejected setup promise surfaces as an unhandled
//! rejection, same as the stock export page.

mod dom;
mod platform;

pub use dom::DomSurface;
pub use platform::{RnboDevice, WebPlatform};

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Reflect};
use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use crate::config::BootstrapConfig;
use crate::diagnostics::{Diagnostic, DiagnosticHook};
use crate::error::HostError;
use crate::session::Session;

/// Global the page may set before the module loads to override defaults.
const CONFIG_GLOBAL: &str = "voiceChangerConfig";
/// Error-presentation function installed by `guardrails.js`.
const GUARDRAILS_GLOBAL: &str = "guardrails";

thread_local! {
    static SESSION: RefCell<Option<Rc<Session<WebPlatform>>>> = const { RefCell::new(None) };
}

impl From<HostError> for JsValue {
    fn from(err: HostError) -> Self {
        js_sys::Error::new(&err.0).into()
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();

    let session = build_session()?;
    let body = session.platform().document()?.body().ok_or(HostError::from("document has no body"))?;
    SESSION.with(|s| s.borrow_mut().replace(Rc::new(session)));

    let onclick = Closure::<dyn FnMut()>::new(|| {
        let _ = wasm_bindgen_futures::future_to_promise(async {
            setup().await?;
            Ok(JsValue::UNDEFINED)
        });
    });
    body.set_onclick(Some(onclick.as_ref().unchecked_ref()));
    onclick.forget();
    Ok(())
}

/// Run the bootstrap sequence. Later calls are no-ops.
#[wasm_bindgen]
pub async fn setup() -> Result<(), JsValue> {
    let session = SESSION
        .with(|s| s.borrow().clone())
        .ok_or(HostError::from("module not started"))?;
    let outcome = session
        .bootstrap()
        .await
        .map_err(|e| JsValue::from(js_sys::Error::new(&e.to_string())))?;
    log::debug!("setup finished: {outcome:?}");
    Ok(())
}

fn build_session() -> Result<Session<WebPlatform>, JsValue> {
    let platform = WebPlatform::new()?;
    let config = read_config(platform.window());
    let surface = DomSurface::new(platform.document()?);
    let hook = GuardrailsHook {
        window: platform.window().clone(),
    };

    Ok(Session::new(platform, config)
        .with_surface(Box::new(surface))
        .with_diagnostic_hook(hook))
}

fn read_config(window: &web_sys::Window) -> BootstrapConfig {
    let value = Reflect::get(window, &JsValue::from_str(CONFIG_GLOBAL)).unwrap_or(JsValue::UNDEFINED);
    if value.is_undefined() || value.is_null() {
        return BootstrapConfig::default();
    }
    serde_wasm_bindgen::from_value(value).unwrap_or_else(|e| {
        log::warn!("ignoring invalid {CONFIG_GLOBAL}: {e}");
        BootstrapConfig::default()
    })
}

/// Forwards reports to `window.guardrails`, looked up on every report so
/// a script that loads after this module still gets them.
struct GuardrailsHook {
    window: web_sys::Window,
}

impl GuardrailsHook {
    fn function(&self) -> Option<Function> {
        Reflect::get(&self.window, &JsValue::from_str(GUARDRAILS_GLOBAL))
            .ok()?
            .dyn_into::<Function>()
            .ok()
    }
}

impl DiagnosticHook for GuardrailsHook {
    fn installed(&self) -> bool {
        self.function().is_some()
    }

    fn report(&self, report: Option<&Diagnostic>) {
        let Some(guardrails) = self.function() else {
            return;
        };
        let called = match report {
            None => guardrails.call0(&JsValue::NULL),
            Some(report) => match diagnostic_payload(report) {
                Ok(payload) => guardrails.call1(&JsValue::NULL, &payload),
                Err(e) => Err(e),
            },
        };
        if let Err(e) = called {
            log::error!("guardrails failed: {e:?}");
        }
    }
}

/// `{error, header?, description?}` with `error` as a real `Error`.
fn diagnostic_payload(report: &Diagnostic) -> Result<JsValue, JsValue> {
    let payload = report
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)?;
    let error = js_sys::Error::new(&report.error.to_string());
    Reflect::set(&payload, &JsValue::from_str("error"), &error)?;
    Ok(payload)
}
