//! Application layer - Use cases and port interfaces
//!
//! Contains the workflow controller and the trait definitions
//! for the camera, the backend and configuration storage.

pub mod ports;
pub mod workflow;

// Re-export use cases
pub use workflow::{Step, WorkflowConfig, WorkflowController, WorkflowError};
