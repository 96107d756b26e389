//! Recognition and dispatch results

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Subscriber;

/// Shown when neither recognition nor manual input produced any text
pub const ADDRESS_FALLBACK: &str = "Could not extract the address";

/// Closed set of result statuses returned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    MatchFound,
    Success,
    EmailError,
    NotFound,
    Error,
}

impl ResultStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MatchFound => "match_found",
            Self::Success => "success",
            Self::EmailError => "email_error",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a recognition call or of an email dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber: Option<Subscriber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// A result with only a status set
    pub fn with_status(status: ResultStatus) -> Self {
        Self {
            status,
            extracted_address: None,
            provided_address: None,
            subscriber: None,
            error: None,
        }
    }

    /// Whether the backend reported a failure. An `error` field wins over any status.
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.status == ResultStatus::Error
    }

    /// Whether this result should move the workflow to confirmation
    pub fn is_confirmable_match(&self) -> bool {
        !self.is_error() && self.status == ResultStatus::MatchFound && self.subscriber.is_some()
    }

    /// Address text for display: extracted, else provided, else the fallback text.
    /// Blank strings count as absent.
    pub fn display_address(&self) -> &str {
        non_blank(self.extracted_address.as_deref())
            .or_else(|| non_blank(self.provided_address.as_deref()))
            .unwrap_or(ADDRESS_FALLBACK)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
