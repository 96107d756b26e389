//! Backend gateway port

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::capture::CapturedImage;
use crate::domain::matching::{EmailPreview, ExtractionResult, Subscriber};

/// Transport-level gateway errors.
///
/// Domain failures (`status = error`, `email_error`) are not errors here;
/// they come back as an `ExtractionResult`.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

/// Port for the recognition and notification backend
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Recognize the address in a captured image and look for a subscriber
    async fn recognize_image(&self, image: &CapturedImage)
        -> Result<ExtractionResult, GatewayError>;

    /// Look for a subscriber matching typed address text
    async fn recognize_text(&self, address: &str) -> Result<ExtractionResult, GatewayError>;

    /// Render the notification email for a subscriber
    async fn preview_email(&self, subscriber: &Subscriber) -> Result<EmailPreview, GatewayError>;

    /// Dispatch the notification email
    async fn send_email(
        &self,
        subscriber: &Subscriber,
        extracted_address: &str,
    ) -> Result<ExtractionResult, GatewayError>;
}
