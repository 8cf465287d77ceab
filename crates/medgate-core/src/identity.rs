//! # Identity Newtypes
//!
//! A [`VerifiedIdentity`] is what the gateway derives from a valid bearer
//! credential: a [`SubjectId`] and, when the token carries one, a [`Role`].
//! It lives for exactly one request.
//!
//! ## Validation
//!
//! Both newtypes end up as header values on the outbound request, so both are
//! restricted to visible ASCII (`0x21..=0x7E`). Anything a header could not
//! carry verbatim is rejected at construction rather than mangled later.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a subject identifier, in bytes.
pub const MAX_SUBJECT_LEN: usize = 256;

/// Maximum length of a role name, in bytes.
pub const MAX_ROLE_LEN: usize = 64;

/// Helper macro to implement `Deserialize` for string newtypes that must
/// validate their contents. Deserializes as a plain `String`, then routes
/// through the type's `new()` constructor so that invalid values are
/// rejected at deserialization time.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Check the shared character rules. Returns the rejection reason on failure.
fn check_header_safe(value: &str, max_len: usize) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("must not be empty");
    }
    if value.len() > max_len {
        return Err("too long");
    }
    if !value.bytes().all(|b| b.is_ascii_graphic()) {
        return Err("must contain only visible ASCII characters");
    }
    Ok(())
}

/// Shorten a rejected value for error messages.
fn preview(value: &str) -> String {
    value.chars().take(32).collect()
}

// ---------------------------------------------------------------------------
// SubjectId
// ---------------------------------------------------------------------------

/// The authenticated caller's identifier, as carried in the token's subject claim.
///
/// Numeric subjects are stored in their decimal rendering, so a token with
/// `"sub": 7` and one with `"sub": "7"` identify the same caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a subject identifier, validating its format.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        match check_header_safe(&value, MAX_SUBJECT_LEN) {
            Ok(()) => Ok(Self(value)),
            Err(reason) => Err(ValidationError::InvalidSubject {
                value: preview(&value),
                reason,
            }),
        }
    }

    /// Create a subject identifier from a numeric claim.
    pub fn from_number(value: impl Into<i128>) -> Self {
        // A decimal integer is always non-empty visible ASCII, well under the limit.
        Self(value.into().to_string())
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(SubjectId);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The caller's role, as carried in the token's role claim.
///
/// The gateway does not interpret roles; it relays them. Backends decide
/// what a role permits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Create a role, validating its format.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        match check_header_safe(&value, MAX_ROLE_LEN) {
            Ok(()) => Ok(Self(value)),
            Err(reason) => Err(ValidationError::InvalidRole {
                value: preview(&value),
                reason,
            }),
        }
    }

    /// Access the role as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl_validating_deserialize!(Role);

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// VerifiedIdentity
// ---------------------------------------------------------------------------

/// Identity derived from a bearer credential after signature and claim checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// Who the caller is.
    pub subject: SubjectId,
    /// What the caller is, when the token says so.
    pub role: Option<Role>,
}

impl VerifiedIdentity {
    /// Identity with a subject and no role.
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            role: None,
        }
    }

    /// Attach a role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}
