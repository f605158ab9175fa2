//! Audio graph seam: context, output node, device instantiation and
//! live input.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::device::Device;
use crate::error::{CaptureError, HostError};

/// A boxed future that owns everything it touches, so the host can run
/// it after the caller has moved on.
pub type LocalTask<T> = Pin<Box<dyn Future<Output = T>>>;

/// The host's audio graph and the engine's device factory.
///
/// Handles are clones of shared host objects, so the session can hand
/// them to later steps without holding a borrow across suspend points.
#[allow(async_fn_in_trait)]
pub trait AudioHost {
    type Context: Clone;
    type Output: Clone;
    type Input: 'static;
    type Device: Device + 'static;

    fn create_context(&self) -> Result<Self::Context, HostError>;

    /// Create the mixing node and connect it to the physical output.
    fn create_output(&self, context: &Self::Context) -> Result<Self::Output, HostError>;

    /// Instantiate a device for `patcher` (the raw description).
    async fn create_device(&self, context: &Self::Context, patcher: &Value) -> Result<Self::Device, HostError>;

    fn connect_device(&self, device: &Self::Device, output: &Self::Output) -> Result<(), HostError>;

    /// Ask for live audio capture. The request is issued right away; the
    /// returned task settles once the user answers the permission prompt,
    /// which may be never.
    fn request_input(&self, context: &Self::Context) -> LocalTask<Result<Self::Input, CaptureError>>;

    fn connect_input(input: &Self::Input, device: &Self::Device) -> Result<(), HostError>;

    /// Run `task` on the host's event loop without waiting for it.
    fn spawn_local(&self, task: LocalTask<()>);

    /// Start audio flow.
    fn resume(&self, context: &Self::Context) -> Result<(), HostError>;
}
