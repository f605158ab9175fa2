//! Microphone connector — route live input into the device.
//!
//! Capture is best effort and runs in the background: the permission
//! prompt can stay open indefinitely, and without a grant the session
//! keeps running as an output-only page.

use crate::audio::{AudioHost, LocalTask};
use crate::error::CaptureError;

/// Whether live input ended up attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrophoneStatus {
    Connected,
    Unavailable,
}

/// Request capture and hand the wait for it to the host. Returns as soon
/// as the request is issued; never fails.
pub fn connect<A: AudioHost + 'static>(host: &A, context: &A::Context, device: &A::Device) {
    let request = host.request_input(context);
    let device = device.clone();
    host.spawn_local(Box::pin(async move {
        attach::<A>(request, device).await;
    }));
}

/// Wait for `request` and connect the granted input into `device`.
pub async fn attach<A: AudioHost>(
    request: LocalTask<Result<A::Input, CaptureError>>,
    device: A::Device,
) -> MicrophoneStatus {
    let input = match request.await {
        Ok(input) => input,
        Err(err) => {
            log::warn!("The following getUserMedia error occurred: {err}");
            return MicrophoneStatus::Unavailable;
        }
    };
    match A::connect_input(&input, &device) {
        Ok(()) => {
            log::info!("connected mic");
            MicrophoneStatus::Connected
        }
        Err(err) => {
            log::warn!("could not connect microphone source: {err}");
            MicrophoneStatus::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeContext, FakeDevice, FakeHost};

    #[test]
    fn granted_capture_is_connected() {
        let host = FakeHost::new();
        let request = host.request_input(&FakeContext);
        let status = pollster::block_on(attach::<FakeHost>(request, FakeDevice::default()));
        assert_eq!(status, MicrophoneStatus::Connected);
        assert_eq!(host.events(), vec!["capture", "input->device"]);
    }

    #[test]
    fn unsupported_capture_is_not_fatal() {
        let host = FakeHost::new();
        host.set_capture(Err(CaptureError::Unsupported));
        let request = host.request_input(&FakeContext);
        let status = pollster::block_on(attach::<FakeHost>(request, FakeDevice::default()));
        assert_eq!(status, MicrophoneStatus::Unavailable);
        assert_eq!(host.events(), vec!["capture"]);
    }

    #[test]
    fn connect_returns_before_the_grant() {
        let host = FakeHost::new();
        connect(&host, &FakeContext, &FakeDevice::default());
        assert_eq!(host.events(), vec!["capture"]);
        assert_eq!(host.pending_tasks(), 1);

        host.run_spawned();
        assert_eq!(host.events(), vec!["capture", "input->device"]);
        assert_eq!(host.pending_tasks(), 0);
    }
}
