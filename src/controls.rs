//! Page controls — the behavior behind the buttons, keys and forms.
//!
//! Everything that decides *what* a control does lives here and is
//! testable without a page; a [`ControlSurface`] only renders it.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::BootstrapConfig;
use crate::description::{DeviceDescription, PresetEntry};
use crate::device::{Device, EventTime, MessageEvent, MidiEvent, Parameter};
use crate::error::HostError;

// ── Voice buttons ───────────────────────────────────────────

/// A button that sets a parameter to a fixed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceButton {
    pub label: &'static str,
    pub value: f64,
}

/// One row of these is built for every device parameter.
pub const VOICE_BUTTONS: [VoiceButton; 5] = [
    VoiceButton { label: "Alien", value: 0.0 },
    VoiceButton { label: "Robot", value: 1.0 },
    VoiceButton { label: "Ghost", value: 2.0 },
    VoiceButton { label: "Underwater", value: 3.0 },
    VoiceButton { label: "Mountain Echo", value: 5.0 },
];

impl VoiceButton {
    pub fn apply<D: Device>(&self, device: &D, parameter_id: &str) -> Result<(), HostError> {
        log::debug!("{} -> {parameter_id} = {}", self.label, self.value);
        device.set_parameter(parameter_id, self.value)
    }
}

// ── Clickable keyboard ──────────────────────────────────────

pub const KEYBOARD_NOTES: [u8; 4] = [49, 52, 56, 63];
pub const NOTE_DURATION_MS: f64 = 250.0;
pub const NOTE_VELOCITY: u8 = 100;

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;

/// Note-on now, note-off [`NOTE_DURATION_MS`] later.
pub fn note_events(note: u8, now_ms: f64, channel: u8, port: u32) -> (MidiEvent, MidiEvent) {
    let channel = channel & 0x0F;
    let on = MidiEvent {
        time: EventTime::At(now_ms),
        port,
        data: [NOTE_ON + channel, note, NOTE_VELOCITY],
    };
    let off = MidiEvent {
        time: EventTime::At(now_ms + NOTE_DURATION_MS),
        port,
        data: [NOTE_OFF + channel, note, 0],
    };
    (on, off)
}

/// Play `note` on channel 0, port 0.
pub fn press_key<D: Device>(device: &D, note: u8) -> Result<(), HostError> {
    let (on, off) = note_events(note, device.now_ms(), 0, 0);
    device.schedule_midi(&on)?;
    device.schedule_midi(&off)
}

// ── Inports ─────────────────────────────────────────────────

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Longest leading decimal literal, the prefix a browser's `parseFloat` reads.
static NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)")
        .expect("valid number pattern")
});

/// Split form text on whitespace runs into numbers. Each word is read up
/// to its first non-numeric character ("2.5x" is 2.5); a word with no
/// numeric prefix, including the empty words before leading or after
/// trailing whitespace, becomes NaN.
pub fn parse_inport_values(text: &str) -> Vec<f64> {
    WHITESPACE.split(text).map(leading_number).collect()
}

fn leading_number(word: &str) -> f64 {
    NUMBER_PREFIX
        .find(word)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

pub fn send_inport<D: Device>(device: &D, tag: &str, text: &str) -> Result<(), HostError> {
    device.schedule_message(&MessageEvent {
        time: EventTime::Now,
        tag: tag.to_string(),
        payload: parse_inport_values(text),
    })
}

// ── Outports ────────────────────────────────────────────────

/// Console line for a device message, or `None` if `tag` is not an outport.
pub fn outport_readout(outports: &[String], tag: &str, payload: &[f64]) -> Option<String> {
    if !outports.iter().any(|o| o == tag) {
        return None;
    }
    let values: Vec<String> = payload.iter().map(|v| format_number(*v)).collect();
    Some(format!("{tag}: {}", values.join(",")))
}

/// Subscribe to device messages and pass each outport line to `render`.
pub fn watch_outports<D: Device>(
    device: &D,
    outports: Vec<String>,
    mut render: impl FnMut(String) + 'static,
) -> Result<(), HostError> {
    device.subscribe_messages(Box::new(move |tag: &str, payload: &[f64]| {
        if let Some(line) = outport_readout(&outports, tag, payload) {
            log::info!("{line}");
            render(line);
        }
    }))
}

/// Integers print without a fractional part.
fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

// ── Presets ─────────────────────────────────────────────────

pub fn apply_preset<D: Device>(device: &D, presets: &[PresetEntry], index: usize) -> Result<(), HostError> {
    let entry = presets
        .get(index)
        .ok_or_else(|| HostError(format!("no preset at index {index}")))?;
    log::info!("applying preset {}", entry.name);
    device.set_preset(&entry.preset)
}

// ── Surface ─────────────────────────────────────────────────

/// Optional page sections that are removed when they have nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Inports,
    Outports,
    Presets,
}

/// Renders controls into the page. Implementations wire each widget to
/// the functions above.
pub trait ControlSurface<D: Device> {
    fn set_title(&self, title: &str) -> Result<(), HostError>;

    fn add_voice_buttons(&self, device: &D, parameter: &Parameter, buttons: &[VoiceButton]) -> Result<(), HostError>;

    fn add_keyboard(&self, device: &D, notes: &[u8]) -> Result<(), HostError>;

    fn add_inport_form(&self, device: &D, tags: &[String]) -> Result<(), HostError>;

    fn attach_outport_console(&self, device: &D, tags: &[String]) -> Result<(), HostError>;

    fn add_preset_selector(&self, device: &D, presets: &[PresetEntry]) -> Result<(), HostError>;

    fn remove_panel(&self, panel: Panel) -> Result<(), HostError>;
}

/// Build every control enabled in `config` for a freshly connected device.
pub fn build<D, S>(surface: &S, device: &D, description: &DeviceDescription, config: &BootstrapConfig) -> Result<(), HostError>
where
    D: Device,
    S: ControlSurface<D> + ?Sized,
{
    surface.set_title(&config.title)?;

    for parameter in device.parameters() {
        surface.add_voice_buttons(device, &parameter, &VOICE_BUTTONS)?;
    }

    if config.inport_form {
        let tags = device.inport_tags();
        if tags.is_empty() {
            surface.remove_panel(Panel::Inports)?;
        } else {
            surface.add_inport_form(device, &tags)?;
        }
    }

    if config.outport_console {
        let tags = device.outport_tags();
        if tags.is_empty() {
            surface.remove_panel(Panel::Outports)?;
        } else {
            surface.attach_outport_console(device, &tags)?;
        }
    }

    if config.presets {
        let presets = description.presets();
        if presets.is_empty() {
            surface.remove_panel(Panel::Presets)?;
        } else {
            surface.add_preset_selector(device, presets)?;
        }
    }

    if config.midi_keyboard && device.midi_input_count() > 0 {
        surface.add_keyboard(device, &KEYBOARD_NOTES)?;
    }

    Ok(())
}
