//! Camera adapter for sessions without a camera

use async_trait::async_trait;

use crate::application::ports::{
    CaptureDevice, CaptureError, DeviceFailure, DeviceOutcome, FailureBroadcaster,
    FailureListener,
};
use crate::domain::capture::{CapturedImage, JpegQuality, Surface};

/// Device that never acquires.
///
/// Used when the camera is disabled or no frame source is configured, so the
/// workflow takes the normal failure path into manual entry.
pub struct UnavailableDevice {
    reason: String,
    listeners: FailureBroadcaster,
}

impl UnavailableDevice {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            listeners: FailureBroadcaster::new(),
        }
    }
}

impl Default for UnavailableDevice {
    fn default() -> Self {
        Self::new("no camera configured")
    }
}

#[async_trait]
impl CaptureDevice for UnavailableDevice {
    async fn acquire(&self, _surface: &Surface) -> DeviceOutcome {
        self.listeners.notify(&DeviceFailure {
            message: self.reason.clone(),
        });
        DeviceOutcome::Unavailable(self.reason.clone())
    }

    fn is_ready(&self) -> bool {
        false
    }

    async fn snapshot(&self, _quality: JpegQuality) -> Result<CapturedImage, CaptureError> {
        Err(CaptureError::NotReady)
    }

    async fn release(&self) {}

    fn on_failure(&self, listener: FailureListener) {
        self.listeners.subscribe(listener);
    }

    fn diagnostic(&self) -> Option<String> {
        Some(format!("Error accessing camera: {}", self.reason))
    }
}
