//! Subscriber matching domain module

mod extraction;
mod preview;
mod subscriber;

pub use extraction::{ExtractionResult, ResultStatus, ADDRESS_FALLBACK};
pub use preview::EmailPreview;
pub use subscriber::Subscriber;
