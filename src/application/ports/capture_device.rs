//! Capture device port

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::capture::{CapturedImage, JpegQuality, Surface};

/// Capture errors
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Camera is not ready")]
    NotReady,

    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode snapshot: {0}")]
    EncodeFailed(String),
}

/// Result of an acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    Ready,
    Unavailable(String),
}

impl DeviceOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Notification raised once per failed acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFailure {
    pub message: String,
}

/// Observer for device failures.
pub type FailureListener = Arc<dyn Fn(&DeviceFailure) + Send + Sync>;

/// Listener registry shared by device adapters.
///
/// Devices announce failures here without knowing who listens.
#[derive(Default)]
pub struct FailureBroadcaster {
    listeners: Mutex<Vec<FailureListener>>,
}

impl FailureBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe(&self, listener: FailureListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Deliver a failure to every listener
    pub fn notify(&self, failure: &DeviceFailure) {
        // Snapshot so listeners may subscribe from inside a callback
        let listeners: Vec<FailureListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(failure);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Port for a camera-like capture device
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Bind to a surface and start the stream, preferring the rear camera.
    ///
    /// On failure the device renders a diagnostic into the surface and
    /// notifies every registered failure listener exactly once, before
    /// `acquire` returns and on the task that called it. Listeners rely on
    /// that to tell which acquisition failed.
    ///
    /// When acquisitions overlap, a late outcome of an earlier call must not
    /// overwrite the stream or diagnostic of a later one.
    async fn acquire(&self, surface: &Surface) -> DeviceOutcome;

    /// Whether the stream has started producing frames
    fn is_ready(&self) -> bool;

    /// Grab the current frame, sized to the bound surface, as a compressed image.
    ///
    /// # Errors
    /// `CaptureError::NotReady` when called before `is_ready()`
    async fn snapshot(&self, quality: JpegQuality) -> Result<CapturedImage, CaptureError>;

    /// Stop the stream. Idempotent, safe when never acquired.
    async fn release(&self);

    /// Register a failure observer
    fn on_failure(&self, listener: FailureListener);

    /// Diagnostic currently rendered into the surface, if acquisition failed
    fn diagnostic(&self) -> Option<String>;
}

/// Blanket implementation for boxed devices
#[async_trait]
impl CaptureDevice for Box<dyn CaptureDevice> {
    async fn acquire(&self, surface: &Surface) -> DeviceOutcome {
        self.as_ref().acquire(surface).await
    }

    fn is_ready(&self) -> bool {
        self.as_ref().is_ready()
    }

    async fn snapshot(&self, quality: JpegQuality) -> Result<CapturedImage, CaptureError> {
        self.as_ref().snapshot(quality).await
    }

    async fn release(&self) {
        self.as_ref().release().await
    }

    fn on_failure(&self, listener: FailureListener) {
        self.as_ref().on_failure(listener)
    }

    fn diagnostic(&self) -> Option<String> {
        self.as_ref().diagnostic()
    }
}
