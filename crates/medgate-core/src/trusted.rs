//! # Trusted Identity Headers
//!
//! The header contract between the gateway and backend services. Only the
//! gateway writes these headers: it removes every client-supplied value and
//! re-derives them from a verified token. Backends read identity from these
//! headers and never look at the original credential.
//!
//! | Header        | Value                               |
//! |---------------|-------------------------------------|
//! | `x-user-id`   | [`SubjectId`] of the caller         |
//! | `x-user-role` | [`Role`] of the caller, when known  |

use http::header::HeaderName;
use http::HeaderMap;

use crate::error::ValidationError;
use crate::identity::{Role, SubjectId, VerifiedIdentity};

/// Header carrying the authenticated subject identifier.
pub const SUBJECT_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// Header carrying the authenticated caller's role.
pub const ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

/// Every header name the gateway is permitted to set. A client-supplied value
/// for any of these never reaches a backend.
pub const TRUSTED_HEADERS: [HeaderName; 2] = [SUBJECT_HEADER, ROLE_HEADER];

/// Return the single value of `name`, or an error if it appears more than once.
fn single<'a>(
    headers: &'a HeaderMap,
    name: &HeaderName,
    label: &'static str,
) -> Result<Option<&'a http::HeaderValue>, ValidationError> {
    let mut values = headers.get_all(name).iter();
    let first = values.next();
    if values.next().is_some() {
        return Err(ValidationError::DuplicateHeader(label));
    }
    Ok(first)
}

impl VerifiedIdentity {
    /// Read the identity the gateway injected into a backend request.
    ///
    /// Returns `Ok(None)` when no subject header is present, meaning the
    /// request was forwarded anonymously. Backends that require a caller
    /// must reject such requests themselves.
    pub fn from_trusted_headers(headers: &HeaderMap) -> Result<Option<Self>, ValidationError> {
        let subject = single(headers, &SUBJECT_HEADER, "x-user-id")?;
        let role = single(headers, &ROLE_HEADER, "x-user-role")?;

        let Some(subject) = subject else {
            return match role {
                Some(_) => Err(ValidationError::RoleWithoutSubject),
                None => Ok(None),
            };
        };

        let subject = SubjectId::new(subject.to_str().unwrap_or_default())?;
        let role = role
            .map(|value| Role::new(value.to_str().unwrap_or_default()))
            .transpose()?;

        Ok(Some(Self { subject, role }))
    }
}
