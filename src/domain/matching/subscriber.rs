//! Subscriber snapshot

use serde::{Deserialize, Serialize};

/// A subscriber record as returned by the backend.
/// Never built by the workflow itself, only echoed back on preview and dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Subscriber {
    /// Name for display, falling back to "N/A"
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("N/A")
    }

    /// Email for display, falling back to "N/A"
    pub fn display_email(&self) -> &str {
        self.email.as_deref().unwrap_or("N/A")
    }

    /// Registered address for display, falling back to "N/A"
    pub fn display_address(&self) -> &str {
        self.address.as_deref().unwrap_or("N/A")
    }
}
