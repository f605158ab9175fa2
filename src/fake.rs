//! In-memory host, device and control surface used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::audio::{AudioHost, LocalTask};
use crate::controls::{ControlSurface, Panel, VoiceButton};
use crate::dependency::Dependency;
use crate::description::PresetEntry;
use crate::device::{Device, MessageEvent, MessageListener, MidiEvent, Parameter};
use crate::engine::EngineLoader;
use crate::error::{CaptureError, HostError};
use crate::fetch::{FetchResponse, ResourceFetcher};

// ── Host ────────────────────────────────────────────────────

#[derive(Default)]
struct HostState {
    events: RefCell<Vec<String>>,
    responses: RefCell<HashMap<String, Result<FetchResponse, HostError>>>,
    engine_loaded: Cell<bool>,
    script_fails: Cell<bool>,
    device_fails: Cell<bool>,
    dependency_load_fails: Cell<bool>,
    capture: RefCell<Capture>,
    spawned: RefCell<Vec<LocalTask<()>>>,
    devices_created: Cell<usize>,
}

/// How the next capture request settles.
#[derive(Default)]
enum Capture {
    #[default]
    Grant,
    Fail(CaptureError),
    /// The permission prompt is never answered.
    Pending,
}

/// Records every host call as a short event string.
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Rc<HostState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeContext;

#[derive(Debug, Clone, PartialEq)]
pub struct FakeOutput;

pub struct FakeInput {
    host: Rc<HostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        FakeHost::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.state
            .responses
            .borrow_mut()
            .insert(path.to_string(), Ok(FetchResponse::new(status, body)));
    }

    pub fn fail_fetch(&self, path: &str) {
        self.state
            .responses
            .borrow_mut()
            .insert(path.to_string(), Err(HostError::from("TypeError: Failed to fetch")));
    }

    pub fn set_engine_loaded(&self, loaded: bool) {
        self.state.engine_loaded.set(loaded);
    }

    pub fn set_script_fails(&self, fails: bool) {
        self.state.script_fails.set(fails);
    }

    pub fn set_device_fails(&self, fails: bool) {
        self.state.device_fails.set(fails);
    }

    pub fn set_dependency_load_fails(&self, fails: bool) {
        self.state.dependency_load_fails.set(fails);
    }

    pub fn set_capture(&self, result: Result<(), CaptureError>) {
        *self.state.capture.borrow_mut() = match result {
            Ok(()) => Capture::Grant,
            Err(err) => Capture::Fail(err),
        };
    }

    pub fn set_capture_pending(&self) {
        *self.state.capture.borrow_mut() = Capture::Pending;
    }

    pub fn pending_tasks(&self) -> usize {
        self.state.spawned.borrow().len()
    }

    /// Drive every spawned task to completion. Only call this when no
    /// task waits on a capture that never settles.
    pub fn run_spawned(&self) {
        let tasks: Vec<_> = self.state.spawned.borrow_mut().drain(..).collect();
        for task in tasks {
            pollster::block_on(task);
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.state.events.borrow().clone()
    }

    pub fn devices_created(&self) -> usize {
        self.state.devices_created.get()
    }

    fn record(&self, event: impl Into<String>) {
        self.state.events.borrow_mut().push(event.into());
    }
}

impl ResourceFetcher for FakeHost {
    async fn fetch(&self, path: &str) -> Result<FetchResponse, HostError> {
        self.record(format!("fetch:{path}"));
        self.state
            .responses
            .borrow()
            .get(path)
            .cloned()
            .unwrap_or_else(|| Ok(FetchResponse::new(404, "Not Found")))
    }
}

impl EngineLoader for FakeHost {
    fn engine_loaded(&self) -> bool {
        self.state.engine_loaded.get()
    }

    async fn load_engine_script(&self, url: &str) -> Result<(), HostError> {
        self.record(format!("script:{url}"));
        if self.state.script_fails.get() {
            return Err("script error".into());
        }
        self.state.engine_loaded.set(true);
        Ok(())
    }
}

impl AudioHost for FakeHost {
    type Context = FakeContext;
    type Output = FakeOutput;
    type Input = FakeInput;
    type Device = FakeDevice;

    fn create_context(&self) -> Result<FakeContext, HostError> {
        self.record("context");
        Ok(FakeContext)
    }

    fn create_output(&self, _context: &FakeContext) -> Result<FakeOutput, HostError> {
        self.record("output->destination");
        Ok(FakeOutput)
    }

    async fn create_device(&self, _context: &FakeContext, _patcher: &Value) -> Result<FakeDevice, HostError> {
        self.record("create_device");
        if self.state.device_fails.get() {
            return Err("Error: invalid patcher".into());
        }
        self.state.devices_created.set(self.state.devices_created.get() + 1);
        let device = FakeDevice::with_parameters(&["mode"]);
        device.state.events.replace(Some(self.state.clone()));
        device.state.dependency_load_fails.set(self.state.dependency_load_fails.get());
        Ok(device)
    }

    fn connect_device(&self, _device: &FakeDevice, _output: &FakeOutput) -> Result<(), HostError> {
        self.record("device->output");
        Ok(())
    }

    fn request_input(&self, _context: &FakeContext) -> LocalTask<Result<FakeInput, CaptureError>> {
        self.record("capture");
        let settled: Result<FakeInput, CaptureError> = match &*self.state.capture.borrow() {
            Capture::Grant => Ok(FakeInput {
                host: self.state.clone(),
            }),
            Capture::Fail(err) => Err(err.clone()),
            Capture::Pending => return Box::pin(std::future::pending::<Result<FakeInput, CaptureError>>()),
        };
        Box::pin(std::future::ready(settled))
    }

    fn connect_input(input: &FakeInput, _device: &FakeDevice) -> Result<(), HostError> {
        input.host.events.borrow_mut().push("input->device".to_string());
        Ok(())
    }

    fn spawn_local(&self, task: LocalTask<()>) {
        self.state.spawned.borrow_mut().push(task);
    }

    fn resume(&self, _context: &FakeContext) -> Result<(), HostError> {
        self.record("resume");
        Ok(())
    }
}

// ── Device ──────────────────────────────────────────────────

#[derive(Default)]
struct DeviceState {
    parameters: RefCell<Vec<Parameter>>,
    now_ms: Cell<f64>,
    midi_inputs: Cell<u32>,
    inports: RefCell<Vec<String>>,
    outports: RefCell<Vec<String>>,
    midi_sent: RefCell<Vec<MidiEvent>>,
    messages_sent: RefCell<Vec<MessageEvent>>,
    presets_applied: RefCell<Vec<Value>>,
    dependencies_loaded: RefCell<Vec<Dependency>>,
    dependency_load_fails: Cell<bool>,
    listeners: RefCell<Vec<MessageListener>>,
    events: RefCell<Option<Rc<HostState>>>,
}

#[derive(Clone, Default)]
pub struct FakeDevice {
    state: Rc<DeviceState>,
}

impl FakeDevice {
    pub fn with_parameters(ids: &[&str]) -> Self {
        let device = FakeDevice::default();
        *device.state.parameters.borrow_mut() = ids
            .iter()
            .map(|id| Parameter {
                id: id.to_string(),
                name: id.to_string(),
                value: 0.0,
                min: 0.0,
                max: 5.0,
            })
            .collect();
        device
    }

    pub fn parameter_value(&self, id: &str) -> Option<f64> {
        self.state.parameters.borrow().iter().find(|p| p.id == id).map(|p| p.value)
    }

    pub fn set_now_ms(&self, now: f64) {
        self.state.now_ms.set(now);
    }

    pub fn set_midi_inputs(&self, count: u32) {
        self.state.midi_inputs.set(count);
    }

    pub fn set_ports(&self, inports: &[&str], outports: &[&str]) {
        *self.state.inports.borrow_mut() = inports.iter().map(|s| s.to_string()).collect();
        *self.state.outports.borrow_mut() = outports.iter().map(|s| s.to_string()).collect();
    }

    pub fn midi_sent(&self) -> Vec<MidiEvent> {
        self.state.midi_sent.borrow().clone()
    }

    pub fn messages_sent(&self) -> Vec<MessageEvent> {
        self.state.messages_sent.borrow().clone()
    }

    pub fn presets_applied(&self) -> Vec<Value> {
        self.state.presets_applied.borrow().clone()
    }

    pub fn dependencies_loaded(&self) -> Vec<Dependency> {
        self.state.dependencies_loaded.borrow().clone()
    }

    /// Deliver a message to every subscribed listener.
    pub fn emit(&self, tag: &str, payload: &[f64]) {
        for listener in self.state.listeners.borrow_mut().iter_mut() {
            listener(tag, payload);
        }
    }
}

impl Device for FakeDevice {
    fn parameters(&self) -> Vec<Parameter> {
        self.state.parameters.borrow().clone()
    }

    fn set_parameter(&self, id: &str, value: f64) -> Result<(), HostError> {
        let mut parameters = self.state.parameters.borrow_mut();
        let parameter = parameters
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| HostError(format!("unknown parameter {id}")))?;
        parameter.value = value;
        Ok(())
    }

    fn now_ms(&self) -> f64 {
        self.state.now_ms.get()
    }

    fn midi_input_count(&self) -> u32 {
        self.state.midi_inputs.get()
    }

    fn inport_tags(&self) -> Vec<String> {
        self.state.inports.borrow().clone()
    }

    fn outport_tags(&self) -> Vec<String> {
        self.state.outports.borrow().clone()
    }

    fn schedule_midi(&self, event: &MidiEvent) -> Result<(), HostError> {
        self.state.midi_sent.borrow_mut().push(event.clone());
        Ok(())
    }

    fn schedule_message(&self, event: &MessageEvent) -> Result<(), HostError> {
        self.state.messages_sent.borrow_mut().push(event.clone());
        Ok(())
    }

    fn set_preset(&self, preset: &Value) -> Result<(), HostError> {
        self.state.presets_applied.borrow_mut().push(preset.clone());
        Ok(())
    }

    fn subscribe_messages(&self, listener: MessageListener) -> Result<(), HostError> {
        self.state.listeners.borrow_mut().push(listener);
        Ok(())
    }

    async fn load_dependencies(&self, dependencies: &[Dependency]) -> Result<(), HostError> {
        if let Some(host) = self.state.events.borrow().as_ref() {
            host.events
                .borrow_mut()
                .push(format!("load_dependencies:{}", dependencies.len()));
        }
        if self.state.dependency_load_fails.get() {
            return Err("Error: could not decode buffer".into());
        }
        self.state.dependencies_loaded.borrow_mut().extend_from_slice(dependencies);
        Ok(())
    }
}

// ── Surface ─────────────────────────────────────────────────

/// Records which controls were built, one string per call.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    calls: Rc<RefCell<Vec<String>>>,
}

impl RecordingSurface {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl ControlSurface<FakeDevice> for RecordingSurface {
    fn set_title(&self, title: &str) -> Result<(), HostError> {
        self.record(format!("title:{title}"));
        Ok(())
    }

    fn add_voice_buttons(&self, _device: &FakeDevice, parameter: &Parameter, _buttons: &[VoiceButton]) -> Result<(), HostError> {
        self.record(format!("buttons:{}", parameter.id));
        Ok(())
    }

    fn add_keyboard(&self, _device: &FakeDevice, notes: &[u8]) -> Result<(), HostError> {
        let notes: Vec<String> = notes.iter().map(|n| n.to_string()).collect();
        self.record(format!("keyboard:{}", notes.join(",")));
        Ok(())
    }

    fn add_inport_form(&self, _device: &FakeDevice, tags: &[String]) -> Result<(), HostError> {
        self.record(format!("inports:{}", tags.join(",")));
        Ok(())
    }

    fn attach_outport_console(&self, _device: &FakeDevice, tags: &[String]) -> Result<(), HostError> {
        self.record(format!("outports:{}", tags.join(",")));
        Ok(())
    }

    fn add_preset_selector(&self, _device: &FakeDevice, presets: &[PresetEntry]) -> Result<(), HostError> {
        let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
        self.record(format!("presets:{}", names.join(",")));
        Ok(())
    }

    fn remove_panel(&self, panel: Panel) -> Result<(), HostError> {
        self.record(format!("remove:{panel:?}"));
        Ok(())
    }
}
