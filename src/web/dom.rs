//! DOM rendering of the page controls.
//!
//! Element ids are fixed by the page template; a missing element is an
//! error at the point it is needed.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlButtonElement, HtmlElement, HtmlInputElement, HtmlSelectElement};

use super::platform::{RnboDevice, js_error};
use crate::controls::{self, ControlSurface, Panel, VoiceButton};
use crate::description::PresetEntry;
use crate::device::Parameter;
use crate::error::HostError;

const TITLE: &str = "patcher-title";
const PARAMETERS: &str = "rnbo-parameter-sliders";
const KEYBOARD: &str = "rnbo-clickable-keyboard";
const NO_MIDI: &str = "no-midi-label";
const INPORT_FORM: &str = "inport-form";
const INPORT_SELECT: &str = "inport-select";
const INPORT_TEXT: &str = "inport-text";
const NO_INPORTS: &str = "no-inports-label";
const CONSOLE_DIV: &str = "rnbo-console-div";
const CONSOLE_READOUT: &str = "rnbo-console-readout";
const NO_OUTPORTS: &str = "no-outports-label";
const PRESET_SELECT: &str = "preset-select";
const NO_PRESETS: &str = "no-presets-label";

pub struct DomSurface {
    document: Document,
}

impl DomSurface {
    pub fn new(document: Document) -> Self {
        DomSurface { document }
    }

    fn element(&self, id: &str) -> Result<Element, HostError> {
        self.document
            .get_element_by_id(id)
            .ok_or_else(|| HostError(format!("missing element #{id}")))
    }

    fn typed<T: JsCast>(&self, id: &str) -> Result<T, HostError> {
        self.element(id)?
            .dyn_into::<T>()
            .map_err(|_| HostError(format!("#{id} has an unexpected element type")))
    }

    fn create(&self, tag: &str) -> Result<Element, HostError> {
        self.document.create_element(tag).map_err(js_error)
    }

    fn remove(&self, id: &str) -> Result<(), HostError> {
        self.element(id)?.remove();
        Ok(())
    }

    fn listen(target: &Element, event: &str, handler: impl FnMut(Event) + 'static) -> Result<(), HostError> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(js_error)?;
        callback.forget();
        Ok(())
    }
}

impl ControlSurface<RnboDevice> for DomSurface {
    fn set_title(&self, title: &str) -> Result<(), HostError> {
        self.typed::<HtmlElement>(TITLE)?.set_inner_text(title);
        Ok(())
    }

    fn add_voice_buttons(&self, device: &RnboDevice, parameter: &Parameter, buttons: &[VoiceButton]) -> Result<(), HostError> {
        let container = self.element(PARAMETERS)?;
        for voice in buttons.iter().copied() {
            let row = self.create("div")?;
            let button: HtmlButtonElement = self
                .create("button")?
                .dyn_into()
                .map_err(|_| HostError::from("created button is not an HTMLButtonElement"))?;
            let label = self.create("label")?;
            label.set_text_content(Some(voice.label));
            button.append_child(&label).map_err(js_error)?;
            button.set_value(&voice.value.to_string());

            let device = device.clone();
            let id = parameter.id.clone();
            Self::listen(&button, "click", move |_| {
                if let Err(e) = voice.apply(&device, &id) {
                    log::error!("{}: {e}", voice.label);
                }
            })?;

            row.append_child(&button).map_err(js_error)?;
            container.append_child(&row).map_err(js_error)?;
        }
        Ok(())
    }

    fn add_keyboard(&self, device: &RnboDevice, notes: &[u8]) -> Result<(), HostError> {
        let keyboard = self.element(KEYBOARD)?;
        self.remove(NO_MIDI)?;
        for &note in notes {
            let key = self.create("div")?;
            let label = self.create("p")?;
            label.set_text_content(Some(&note.to_string()));
            key.append_child(&label).map_err(js_error)?;

            let device = device.clone();
            let pressed = key.clone();
            Self::listen(&key, "pointerdown", move |_| {
                if let Err(e) = controls::press_key(&device, note) {
                    log::error!("note {note}: {e}");
                }
                let _ = pressed.class_list().add_1("clicked");
            })?;
            let released = key.clone();
            Self::listen(&key, "pointerup", move |_| {
                let _ = released.class_list().remove_1("clicked");
            })?;

            keyboard.append_child(&key).map_err(js_error)?;
        }
        Ok(())
    }

    fn add_inport_form(&self, device: &RnboDevice, tags: &[String]) -> Result<(), HostError> {
        self.remove(NO_INPORTS)?;
        let select: HtmlSelectElement = self.typed(INPORT_SELECT)?;
        for tag in tags {
            let option = self.create("option")?;
            option.set_text_content(Some(tag));
            select.append_child(&option).map_err(js_error)?;
        }
        let text: HtmlInputElement = self.typed(INPORT_TEXT)?;
        let form = self.element(INPORT_FORM)?;
        let device = device.clone();
        Self::listen(&form, "submit", move |event| {
            // Keep the page from reloading.
            event.prevent_default();
            if let Err(e) = controls::send_inport(&device, &select.value(), &text.value()) {
                log::error!("inport message: {e}");
            }
        })
    }

    fn attach_outport_console(&self, device: &RnboDevice, tags: &[String]) -> Result<(), HostError> {
        self.remove(NO_OUTPORTS)?;
        let readout: HtmlElement = self.typed(CONSOLE_READOUT)?;
        controls::watch_outports(device, tags.to_vec(), move |line| readout.set_inner_text(&line))
    }

    fn add_preset_selector(&self, device: &RnboDevice, presets: &[PresetEntry]) -> Result<(), HostError> {
        self.remove(NO_PRESETS)?;
        let select: HtmlSelectElement = self.typed(PRESET_SELECT)?;
        for (index, preset) in presets.iter().enumerate() {
            let option = self.create("option")?;
            option.set_text_content(Some(&preset.name));
            option
                .set_attribute("value", &index.to_string())
                .map_err(js_error)?;
            select.append_child(&option).map_err(js_error)?;
        }
        let device = device.clone();
        let presets = presets.to_vec();
        let selected = select.clone();
        Self::listen(&select, "change", move |_| {
            let applied = selected
                .value()
                .parse::<usize>()
                .map_err(|e| HostError(e.to_string()))
                .and_then(|index| controls::apply_preset(&device, &presets, index));
            if let Err(e) = applied {
                log::error!("preset: {e}");
            }
        })
    }

    fn remove_panel(&self, panel: Panel) -> Result<(), HostError> {
        match panel {
            Panel::Inports => self.remove(INPORT_FORM),
            Panel::Outports => self.remove(CONSOLE_DIV),
            Panel::Presets => self.remove(PRESET_SELECT),
        }
    }
}
