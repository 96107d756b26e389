//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture_device;
pub mod config;
pub mod gateway;

// Re-export common types
pub use capture_device::{
    CaptureDevice, CaptureError, DeviceFailure, DeviceOutcome, FailureBroadcaster,
    FailureListener,
};
pub use config::ConfigStore;
pub use gateway::{BackendGateway, GatewayError};
