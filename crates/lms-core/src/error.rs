//! # Validation Errors
//!
//! Errors raised when user-entered values fail basic shape checks. State
//! machine errors live next to their machines in `lms-state`.

use thiserror::Error;

/// Input validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty after trimming.
    #[error("{field} must not be empty")]
    Empty {
        /// Field name as seen by the client.
        field: String,
    },

    /// A text field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Field name as seen by the client.
        field: String,
        /// Maximum permitted length in characters.
        max: usize,
    },

    /// Role name not recognised.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Trim a human-entered label and check it is non-empty and at most `max`
/// characters. Returns the trimmed value.
pub fn validate_name(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(trimmed.to_string())
}
