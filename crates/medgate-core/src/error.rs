//! # Error Hierarchy
//!
//! Validation failures for identity values and for the trusted header contract.

use thiserror::Error;

/// Identity value or trusted header validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Subject identifier is empty, too long, or contains bytes that are not
    /// visible ASCII.
    #[error("invalid subject id \"{value}\": {reason}")]
    InvalidSubject {
        /// The rejected value, truncated for display.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Role name is empty, too long, or contains bytes that are not visible ASCII.
    #[error("invalid role \"{value}\": {reason}")]
    InvalidRole {
        /// The rejected value, truncated for display.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A trusted header appeared more than once.
    #[error("trusted header {0} appears more than once")]
    DuplicateHeader(&'static str),

    /// A role header was present without a subject header.
    #[error("role header present without a subject header")]
    RoleWithoutSubject,
}
