//! # Identity Propagator
//!
//! Writes the trusted identity headers on an outbound request. The gateway
//! is the only writer of these headers: every client-supplied value is
//! removed, whether or not an identity is attached afterwards.
//!
//! [`attach_identity`] must be the last mutation of the outbound header map.
//! Anything that runs after it could reintroduce a client value.

use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderMap, HeaderValue};
use medgate_core::{VerifiedIdentity, ROLE_HEADER, SUBJECT_HEADER, TRUSTED_HEADERS};

/// Replace the trusted headers in `headers` with values derived from `identity`.
///
/// With no identity the trusted headers are simply absent. With an identity,
/// the subject header is always set and the role header only when a role is known.
pub fn attach_identity(
    headers: &mut HeaderMap,
    identity: Option<&VerifiedIdentity>,
) -> Result<(), InvalidHeaderValue> {
    for name in &TRUSTED_HEADERS {
        // `remove` drops every value of a repeated header.
        headers.remove(name);
    }

    let Some(identity) = identity else {
        return Ok(());
    };

    headers.insert(
        SUBJECT_HEADER,
        HeaderValue::from_str(identity.subject.as_str())?,
    );
    if let Some(role) = &identity.role {
        headers.insert(ROLE_HEADER, HeaderValue::from_str(role.as_str())?);
    }
    Ok(())
}
