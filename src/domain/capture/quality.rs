//! JPEG quality value object

use std::fmt;
use std::str::FromStr;

use crate::domain::error::QualityParseError;

/// Default snapshot quality
pub const DEFAULT_QUALITY: f32 = 0.9;

/// Snapshot compression quality in the range (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct JpegQuality(f32);

impl JpegQuality {
    /// Create a quality value, rejecting anything outside (0, 1]
    pub fn new(value: f32) -> Result<Self, QualityParseError> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(QualityParseError {
                input: value.to_string(),
            })
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Encoder quality on the 1..=100 scale
    pub fn as_percent(&self) -> u8 {
        ((self.0 * 100.0).round() as u8).clamp(1, 100)
    }
}

impl Default for JpegQuality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

impl FromStr for JpegQuality {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f32 = s.trim().parse().map_err(|_| QualityParseError {
            input: s.to_string(),
        })?;
        Self::new(value).map_err(|_| QualityParseError {
            input: s.to_string(),
        })
    }
}

impl fmt::Display for JpegQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
