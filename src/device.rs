//! The engine-owned processing unit, as seen from the page.

use serde_json::Value;

use crate::dependency::Dependency;
use crate::error::HostError;

/// Snapshot of one device parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// When an event should fire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventTime {
    /// As soon as the engine processes it.
    Now,
    /// Absolute engine time in milliseconds.
    At(f64),
}

/// A raw MIDI message scheduled on a device input port.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiEvent {
    pub time: EventTime,
    pub port: u32,
    pub data: [u8; 3],
}

/// A list of numbers sent to an inport.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub time: EventTime,
    pub tag: String,
    pub payload: Vec<f64>,
}

/// Callback invoked with `(tag, payload)` for every message the device emits.
pub type MessageListener = Box<dyn FnMut(&str, &[f64])>;

/// An instantiated device. Handles are cheap clones of the same unit.
#[allow(async_fn_in_trait)]
pub trait Device: Clone {
    fn parameters(&self) -> Vec<Parameter>;

    fn set_parameter(&self, id: &str, value: f64) -> Result<(), HostError>;

    /// Current engine time in milliseconds.
    fn now_ms(&self) -> f64;

    fn midi_input_count(&self) -> u32;

    fn inport_tags(&self) -> Vec<String>;

    fn outport_tags(&self) -> Vec<String>;

    fn schedule_midi(&self, event: &MidiEvent) -> Result<(), HostError>;

    fn schedule_message(&self, event: &MessageEvent) -> Result<(), HostError>;

    fn set_preset(&self, preset: &Value) -> Result<(), HostError>;

    fn subscribe_messages(&self, listener: MessageListener) -> Result<(), HostError>;

    /// Load sample buffers before the device is connected.
    async fn load_dependencies(&self, dependencies: &[Dependency]) -> Result<(), HostError>;
}
