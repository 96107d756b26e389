//! Capture device adapters

mod still_image;
mod unavailable;

pub use still_image::StillImageDevice;
pub use unavailable::UnavailableDevice;
