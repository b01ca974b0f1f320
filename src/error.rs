// error.rs - The script error type that all core failures funnel through

use crate::location::Location;
use std::fmt;

/// The single error kind surfaced to scripts.  Carries a human readable
/// message and, when one was known at throw time, the source location.
/// Call stack traces are folded into the message when the interpreter
/// raises the error.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    location: Option<Location>,
    message: String,
}

pub type Result<T> = std::result::Result<T, ScriptError>;

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        ScriptError {
            location: None,
            message: message.into(),
        }
    }

    pub fn with_location(location: Location, message: impl Into<String>) -> Self {
        ScriptError {
            location: Some(location),
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{}: {}", location, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ScriptError {}

// ============================================================================
// TESTS
// ============================================================================
