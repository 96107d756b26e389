//! Domain layer - Core business logic
//!
//! Contains value objects, the workflow state machine, the view renderer
//! and domain errors. This layer has no dependencies on external systems.

pub mod capture;
pub mod config;
pub mod error;
pub mod matching;
pub mod workflow;

// Re-export common types
pub use capture::{CapturedImage, Duration, Facing, ImageMimeType, JpegQuality, Surface};
pub use config::AppConfig;
pub use error::*;
pub use matching::{EmailPreview, ExtractionResult, ResultStatus, Subscriber};
pub use workflow::{Phase, View, WorkflowState};
