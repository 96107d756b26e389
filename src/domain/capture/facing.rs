//! Camera facing preference

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidFacingError;

/// Which camera to prefer when a device offers more than one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Facing {
    /// Rear camera, the one pointed at the envelope
    #[default]
    Environment,
    /// Front camera
    User,
}

impl Facing {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::User => "user",
        }
    }
}

impl FromStr for Facing {
    type Err = InvalidFacingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "environment" | "rear" | "back" => Ok(Self::Environment),
            "user" | "front" => Ok(Self::User),
            _ => Err(InvalidFacingError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
