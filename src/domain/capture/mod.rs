//! Capture domain module

mod captured_image;
mod duration;
mod facing;
mod quality;
mod surface;

pub use captured_image::{CapturedImage, ImageMimeType};
pub use duration::Duration;
pub use facing::Facing;
pub use quality::JpegQuality;
pub use surface::Surface;
