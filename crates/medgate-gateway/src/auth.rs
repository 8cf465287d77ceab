//! # Per-Route Authentication
//!
//! The credential is verified once per request, before routing, and the
//! outcome is kept. The matched rule's [`AuthPolicy`] then decides what a
//! failure means: a 401 on required routes, anonymous forwarding on optional ones.

use axum::http::HeaderMap;
use medgate_auth::{bearer_token, TokenError, TokenVerifier, VerifiedIdentity};

use crate::routing::AuthPolicy;

/// Extract and verify the bearer credential.
pub fn authenticate(
    headers: &HeaderMap,
    verifier: &TokenVerifier,
) -> Result<VerifiedIdentity, TokenError> {
    let token = bearer_token(headers)?;
    verifier.verify(token)
}

/// Apply `policy` to the verification outcome.
///
/// Returns the identity to forward (`None` for anonymous) or the error that
/// must be answered with a 401.
pub fn authorize(
    policy: AuthPolicy,
    outcome: Result<VerifiedIdentity, TokenError>,
) -> Result<Option<VerifiedIdentity>, TokenError> {
    match (policy, outcome) {
        (_, Ok(identity)) => Ok(Some(identity)),
        (AuthPolicy::Required, Err(err)) => Err(err),
        (AuthPolicy::Optional, Err(TokenError::MissingCredential)) => Ok(None),
        (AuthPolicy::Optional, Err(err)) => {
            tracing::debug!(
                reason = err.reason(),
                "invalid credential on optional route, forwarding anonymously"
            );
            Ok(None)
        }
    }
}
