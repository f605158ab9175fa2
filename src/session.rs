//! Session bootstrapper — the one-time setup sequence for the page.
//!
//! `bootstrap()` acquires an audio context and output node, loads the
//! device description (and the engine it needs), loads optional
//! dependencies, instantiates and connects the device, builds the page
//! controls, requests the microphone and starts audio flow. The
//! microphone is connected in the background whenever the user grants
//! it; setup never waits for the permission prompt.
//!
//! The session is a small state machine. It leaves `Uninitialized` as
//! soon as the output node exists, before the first suspend point, and
//! never goes back: a failed bootstrap is terminal, and any further
//! call is a no-op.

use std::cell::RefCell;

use crate::audio::AudioHost;
use crate::bundle;
use crate::config::BootstrapConfig;
use crate::controls::{self, ControlSurface};
use crate::description::DeviceDescription;
use crate::device::Device;
use crate::diagnostics::{Diagnostic, DiagnosticHook};
use crate::engine::{self, EngineLoader};
use crate::error::BootstrapError;
use crate::fetch::ResourceFetcher;
use crate::microphone;

/// Everything the bootstrapper needs from its host.
pub trait Platform: ResourceFetcher + EngineLoader + AudioHost + 'static {}

impl<T: ResourceFetcher + EngineLoader + AudioHost + 'static> Platform for T {}

enum SessionState<P: AudioHost> {
    Uninitialized,
    Started {
        context: P::Context,
        output: P::Output,
    },
    Ready {
        context: P::Context,
        output: P::Output,
        device: P::Device,
    },
}

/// Externally visible session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    /// Output node exists; bootstrap is running or has failed.
    Started,
    Ready,
}

/// How a `bootstrap()` call ended without propagating an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The session was already past `Uninitialized`; nothing was done.
    AlreadyInitialized,
    /// A failure was handed to the diagnostic hook and setup stopped.
    Reported,
    /// Device connected and audio running.
    Ready,
}

/// One page session: host, configuration and setup state.
pub struct Session<P: Platform> {
    platform: P,
    config: BootstrapConfig,
    hook: Option<Box<dyn DiagnosticHook>>,
    surface: Option<Box<dyn ControlSurface<P::Device>>>,
    state: RefCell<SessionState<P>>,
}

impl<P: Platform> Session<P> {
    pub fn new(platform: P, config: BootstrapConfig) -> Self {
        Session {
            platform,
            config,
            hook: None,
            surface: None,
            state: RefCell::new(SessionState::Uninitialized),
        }
    }

    /// Route failures (and the final success signal) through `hook`
    /// instead of returning them, whenever the hook reports itself
    /// installed.
    pub fn with_diagnostic_hook(mut self, hook: impl DiagnosticHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn with_surface(mut self, surface: Box<dyn ControlSurface<P::Device>>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn phase(&self) -> SessionPhase {
        match &*self.state.borrow() {
            SessionState::Uninitialized => SessionPhase::Uninitialized,
            SessionState::Started { .. } => SessionPhase::Started,
            SessionState::Ready { .. } => SessionPhase::Ready,
        }
    }

    /// The connected device, once the session is ready.
    pub fn device(&self) -> Option<P::Device> {
        match &*self.state.borrow() {
            SessionState::Ready { device, .. } => Some(device.clone()),
            _ => None,
        }
    }

    /// The mixing node, from the first bootstrap step on.
    pub fn output(&self) -> Option<P::Output> {
        match &*self.state.borrow() {
            SessionState::Uninitialized => None,
            SessionState::Started { output, .. } | SessionState::Ready { output, .. } => Some(output.clone()),
        }
    }

    pub fn context(&self) -> Option<P::Context> {
        match &*self.state.borrow() {
            SessionState::Uninitialized => None,
            SessionState::Started { context, .. } | SessionState::Ready { context, .. } => Some(context.clone()),
        }
    }

    /// Run the setup sequence once. See the module docs for the order
    /// of steps and [`BootstrapOutcome`] for the non-error results.
    pub async fn bootstrap(&self) -> Result<BootstrapOutcome, BootstrapError> {
        let Some((context, output)) = self.begin()? else {
            log::debug!("session already initialized");
            return Ok(BootstrapOutcome::AlreadyInitialized);
        };

        let description = match self.load_description().await {
            Ok(description) => description,
            Err(err) => return self.report(Diagnostic::for_export(err, &self.config.patch_export_url)),
        };

        let dependencies =
            bundle::fetch_dependencies(&self.platform, &self.config.dependencies_url, &self.config.export_dir).await;

        let device = match self.platform.create_device(&context, description.raw()).await {
            Ok(device) => device,
            Err(err) => return self.report(Diagnostic::new(BootstrapError::DeviceCreation(err))),
        };

        if !dependencies.is_empty() {
            log::info!("loading {} data buffer dependencies", dependencies.len());
            device
                .load_dependencies(&dependencies)
                .await
                .map_err(BootstrapError::DependencyLoad)?;
        }

        self.platform
            .connect_device(&device, &output)
            .map_err(BootstrapError::Audio)?;

        if let Some(surface) = &self.surface {
            controls::build(surface.as_ref(), &device, &description, &self.config).map_err(BootstrapError::Surface)?;
        }

        // The grant may never come; the connection happens in the background.
        microphone::connect(&self.platform, &context, &device);
        self.platform.resume(&context).map_err(BootstrapError::Audio)?;

        *self.state.borrow_mut() = SessionState::Ready {
            context,
            output,
            device,
        };
        log::info!("session ready");
        if let Some(hook) = self.hook() {
            hook.report(None);
        }
        Ok(BootstrapOutcome::Ready)
    }

    /// Guard plus context/output creation. Returns `None` when the
    /// output node already exists.
    fn begin(&self) -> Result<Option<(P::Context, P::Output)>, BootstrapError> {
        let mut state = self.state.borrow_mut();
        if !matches!(*state, SessionState::Uninitialized) {
            return Ok(None);
        }
        let context = self.platform.create_context().map_err(BootstrapError::Audio)?;
        let output = self.platform.create_output(&context).map_err(BootstrapError::Audio)?;
        *state = SessionState::Started {
            context: context.clone(),
            output: output.clone(),
        };
        Ok(Some((context, output)))
    }

    async fn load_description(&self) -> Result<DeviceDescription, BootstrapError> {
        let description = bundle::fetch_description(&self.platform, &self.config.patch_export_url).await?;
        engine::resolve(&self.platform, &description, &self.config.engine_base_url).await?;
        Ok(description)
    }

    /// The hook, if one is installed right now.
    fn hook(&self) -> Option<&dyn DiagnosticHook> {
        self.hook.as_deref().filter(|hook| hook.installed())
    }

    fn report(&self, diagnostic: Diagnostic) -> Result<BootstrapOutcome, BootstrapError> {
        match self.hook() {
            Some(hook) => {
                log::error!("{}", diagnostic.error);
                hook.report(Some(&diagnostic));
                Ok(BootstrapOutcome::Reported)
            }
            None => Err(diagnostic.error),
        }
    }
}
