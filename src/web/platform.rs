//! Browser host: `fetch`, script injection, Web Audio, and the RNBO
//! device object reached through `window.RNBO`.

use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioContext, AudioNode, Document, GainNode, HtmlScriptElement, MediaStream, MediaStreamAudioSourceNode,
    MediaStreamConstraints, Response, Window,
};

use crate::audio::{AudioHost, LocalTask};
use crate::dependency::Dependency;
use crate::device::{Device, EventTime, MessageEvent, MessageListener, MidiEvent, Parameter};
use crate::engine::EngineLoader;
use crate::error::{CaptureError, HostError};
use crate::fetch::{FetchResponse, ResourceFetcher};

const RNBO_GLOBAL: &str = "RNBO";

/// Best-effort message for a thrown JS value.
pub(crate) fn js_error(value: JsValue) -> HostError {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return HostError(String::from(err.to_string()));
    }
    HostError(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

fn get(target: &JsValue, key: &str) -> Result<JsValue, HostError> {
    Reflect::get(target, &JsValue::from_str(key)).map_err(js_error)
}

fn set(target: &JsValue, key: &str, value: &JsValue) -> Result<(), HostError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(js_error)
}

fn denied(value: JsValue) -> CaptureError {
    CaptureError::Denied(js_error(value).0)
}

fn defined(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

/// Serialize JSON as plain objects/arrays (not `Map`s).
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, HostError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| HostError(e.to_string()))
}

fn method(target: &JsValue, name: &str) -> Result<Function, HostError> {
    get(target, name)?
        .dyn_into::<Function>()
        .map_err(|_| HostError(format!("{name} is not a function")))
}

// ── Platform ────────────────────────────────────────────────

pub struct WebPlatform {
    window: Window,
}

impl WebPlatform {
    pub fn new() -> Result<Self, HostError> {
        let window = web_sys::window().ok_or("no window")?;
        Ok(WebPlatform { window })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> Result<Document, HostError> {
        Ok(self.window.document().ok_or("no document")?)
    }

    fn rnbo(&self) -> Result<JsValue, HostError> {
        let rnbo = get(&self.window, RNBO_GLOBAL)?;
        if !defined(&rnbo) {
            return Err("RNBO is not loaded".into());
        }
        Ok(rnbo)
    }

    /// Issue the capture request; the prompt is shown from here on.
    fn get_user_media(&self) -> Result<Promise, CaptureError> {
        let navigator = self.window.navigator();
        if !get(&navigator, "mediaDevices").is_ok_and(|v| defined(&v)) {
            return Err(CaptureError::Unsupported);
        }
        let devices = navigator.media_devices().map_err(|_| CaptureError::Unsupported)?;

        let constraints = MediaStreamConstraints::new();
        constraints.set_audio(&JsValue::TRUE);
        constraints.set_video(&JsValue::FALSE);
        devices.get_user_media_with_constraints(&constraints).map_err(denied)
    }

    /// Older Safari only ships the prefixed constructor.
    fn webkit_context(&self) -> Option<AudioContext> {
        let ctor = get(&self.window, "webkitAudioContext").ok()?.dyn_into::<Function>().ok()?;
        Reflect::construct(&ctor, &Array::new())
            .ok()
            .map(JsCast::unchecked_into)
    }
}

impl ResourceFetcher for WebPlatform {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, HostError> {
        let response: Response = JsFuture::from(self.window.fetch_with_str(path))
            .await
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        let status = response.status();
        let body = JsFuture::from(response.text().map_err(js_error)?)
            .await
            .map_err(js_error)?;
        Ok(FetchResponse {
            status,
            body: body.as_string().unwrap_or_default(),
        })
    }
}

impl EngineLoader for WebPlatform {
    fn engine_loaded(&self) -> bool {
        get(&self.window, RNBO_GLOBAL).is_ok_and(|v| defined(&v))
    }

    async fn load_engine_script(&self, url: &str) -> Result<(), HostError> {
        let document = self.document()?;
        let body = document.body().ok_or("document has no body")?;
        let script: HtmlScriptElement = document
            .create_element("script")
            .map_err(js_error)?
            .dyn_into()
            .map_err(|_| HostError::from("created script is not an HTMLScriptElement"))?;
        script.set_src(url);
        let loaded = Promise::new(&mut |resolve: Function, reject: Function| {
            script.set_onload(Some(&resolve));
            script.set_onerror(Some(&reject));
        });
        body.append_child(&script).map_err(js_error)?;
        JsFuture::from(loaded).await.map_err(js_error)?;
        Ok(())
    }
}

impl AudioHost for WebPlatform {
    type Context = AudioContext;
    type Output = GainNode;
    type Input = MediaStreamAudioSourceNode;
    type Device = RnboDevice;

    fn create_context(&self) -> Result<AudioContext, HostError> {
        match AudioContext::new() {
            Ok(context) => Ok(context),
            Err(err) => self.webkit_context().ok_or_else(|| js_error(err)),
        }
    }

    fn create_output(&self, context: &AudioContext) -> Result<GainNode, HostError> {
        let gain = context.create_gain().map_err(js_error)?;
        gain.connect_with_audio_node(&context.destination()).map_err(js_error)?;
        Ok(gain)
    }

    async fn create_device(&self, context: &AudioContext, patcher: &Value) -> Result<RnboDevice, HostError> {
        let rnbo = self.rnbo()?;
        let create = method(&rnbo, "createDevice")?;

        let options = Object::new();
        set(&options, "context", &JsValue::from(context.clone()))?;
        set(&options, "patcher", &to_js(patcher)?)?;

        let pending: Promise = create
            .call1(&rnbo, &options)
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        let inner = JsFuture::from(pending).await.map_err(js_error)?;
        Ok(RnboDevice {
            inner,
            rnbo,
            context: context.clone(),
        })
    }

    fn connect_device(&self, device: &RnboDevice, output: &GainNode) -> Result<(), HostError> {
        device.node()?.connect_with_audio_node(output).map_err(js_error)?;
        Ok(())
    }

    fn request_input(&self, context: &AudioContext) -> LocalTask<Result<MediaStreamAudioSourceNode, CaptureError>> {
        let pending = match self.get_user_media() {
            Ok(pending) => pending,
            Err(err) => return Box::pin(std::future::ready(Err::<MediaStreamAudioSourceNode, _>(err))),
        };
        let context = context.clone();
        Box::pin(async move {
            let stream: MediaStream = JsFuture::from(pending)
                .await
                .map_err(denied)?
                .dyn_into()
                .map_err(denied)?;
            context.create_media_stream_source(&stream).map_err(denied)
        })
    }

    fn connect_input(input: &MediaStreamAudioSourceNode, device: &RnboDevice) -> Result<(), HostError> {
        input.connect_with_audio_node(&device.node()?).map_err(js_error)?;
        Ok(())
    }

    fn spawn_local(&self, task: LocalTask<()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn resume(&self, context: &AudioContext) -> Result<(), HostError> {
        // The returned promise only settles once the user has interacted.
        let _ = context.resume().map_err(js_error)?;
        Ok(())
    }
}

// ── Device ──────────────────────────────────────────────────

/// Handle to a device created by `RNBO.createDevice`.
#[derive(Clone)]
pub struct RnboDevice {
    inner: JsValue,
    rnbo: JsValue,
    context: AudioContext,
}

impl RnboDevice {
    pub fn node(&self) -> Result<AudioNode, HostError> {
        get(&self.inner, "node")?.dyn_into().map_err(js_error)
    }

    fn call(&self, name: &str, args: &Array) -> Result<JsValue, HostError> {
        method(&self.inner, name)?.apply(&self.inner, args).map_err(js_error)
    }

    fn list(&self, key: &str) -> Vec<JsValue> {
        get(&self.inner, key)
            .ok()
            .and_then(|v| v.dyn_into::<Array>().ok())
            .map(|a| a.iter().collect())
            .unwrap_or_default()
    }

    fn time(&self, time: EventTime) -> Result<JsValue, HostError> {
        match time {
            EventTime::Now => get(&self.rnbo, "TimeNow"),
            EventTime::At(ms) => Ok(JsValue::from_f64(ms)),
        }
    }

    fn schedule(&self, constructor: &str, args: &Array) -> Result<(), HostError> {
        let ctor = method(&self.rnbo, constructor)?;
        let event = Reflect::construct(&ctor, args).map_err(js_error)?;
        self.call("scheduleEvent", &Array::of1(&event))?;
        Ok(())
    }

    fn tags(values: Vec<JsValue>) -> Vec<String> {
        values
            .iter()
            .filter_map(|v| get(v, "tag").ok()?.as_string())
            .collect()
    }
}

fn number(value: &JsValue, key: &str) -> f64 {
    get(value, key).ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
}

impl Device for RnboDevice {
    fn parameters(&self) -> Vec<Parameter> {
        self.list("parameters")
            .iter()
            .filter_map(|p| {
                let id = get(p, "id").ok()?.as_string()?;
                let name = get(p, "name").ok().and_then(|v| v.as_string()).unwrap_or_else(|| id.clone());
                Some(Parameter {
                    id,
                    name,
                    value: number(p, "value"),
                    min: number(p, "min"),
                    max: number(p, "max"),
                })
            })
            .collect()
    }

    fn set_parameter(&self, id: &str, value: f64) -> Result<(), HostError> {
        let parameter = self
            .list("parameters")
            .into_iter()
            .find(|p| get(p, "id").ok().and_then(|v| v.as_string()).as_deref() == Some(id))
            .ok_or_else(|| HostError(format!("unknown parameter {id}")))?;
        set(&parameter, "value", &JsValue::from_f64(value))
    }

    fn now_ms(&self) -> f64 {
        self.context.current_time() * 1000.0
    }

    fn midi_input_count(&self) -> u32 {
        number(&self.inner, "numMIDIInputPorts") as u32
    }

    fn inport_tags(&self) -> Vec<String> {
        let inport = get(&self.rnbo, "MessagePortType").and_then(|t| get(&t, "Inport"));
        let Ok(inport) = inport else {
            return Vec::new();
        };
        let inports = self
            .list("messages")
            .into_iter()
            .filter(|m| get(m, "type").is_ok_and(|t| t == inport))
            .collect();
        Self::tags(inports)
    }

    fn outport_tags(&self) -> Vec<String> {
        Self::tags(self.list("outports"))
    }

    fn schedule_midi(&self, event: &MidiEvent) -> Result<(), HostError> {
        let data: Array = event.data.iter().map(|b| JsValue::from(*b)).collect();
        let args = Array::of3(&self.time(event.time)?, &JsValue::from(event.port), &data);
        self.schedule("MIDIEvent", &args)
    }

    fn schedule_message(&self, event: &MessageEvent) -> Result<(), HostError> {
        let payload: Array = event.payload.iter().map(|v| JsValue::from_f64(*v)).collect();
        let args = Array::of3(&self.time(event.time)?, &JsValue::from_str(&event.tag), &payload);
        self.schedule("MessageEvent", &args)
    }

    fn set_preset(&self, preset: &Value) -> Result<(), HostError> {
        self.call("setPreset", &Array::of1(&to_js(preset)?))?;
        Ok(())
    }

    fn subscribe_messages(&self, mut listener: MessageListener) -> Result<(), HostError> {
        let emitter = get(&self.inner, "messageEvent")?;
        let subscribe = method(&emitter, "subscribe")?;
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            let tag = get(&event, "tag").ok().and_then(|t| t.as_string()).unwrap_or_default();
            let payload = match get(&event, "payload") {
                Ok(p) if Array::is_array(&p) => Array::from(&p).iter().filter_map(|v| v.as_f64()).collect(),
                Ok(p) => p.as_f64().into_iter().collect(),
                Err(_) => Vec::new(),
            };
            listener(&tag, &payload);
        });
        subscribe
            .call1(&emitter, callback.as_ref().unchecked_ref())
            .map_err(js_error)?;
        callback.forget();
        Ok(())
    }

    async fn load_dependencies(&self, dependencies: &[Dependency]) -> Result<(), HostError> {
        let pending: Promise = self
            .call("loadDataBufferDependencies", &Array::of1(&to_js(dependencies)?))?
            .dyn_into()
            .map_err(js_error)?;
        let results = JsFuture::from(pending).await.map_err(js_error)?;
        if let Ok(results) = results.dyn_into::<Array>() {
            for result in results.iter() {
                if get(&result, "type").ok().and_then(|t| t.as_string()).as_deref() == Some("fail") {
                    let id = get(&result, "id").ok().and_then(|v| v.as_string()).unwrap_or_default();
                    log::warn!("failed to load buffer with id {id}");
                }
            }
        }
        Ok(())
    }
}
