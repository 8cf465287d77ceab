//! `Authorization: Bearer <token>` header extraction.

use http::header::AUTHORIZATION;
use http::HeaderMap;

use crate::error::TokenError;

/// Extract the raw token from the request's `Authorization` header.
///
/// The header must be exactly two space-separated tokens, the first being
/// the `Bearer` scheme (matched case-insensitively). A repeated
/// `Authorization` header is treated as malformed.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, TokenError> {
    let mut values = headers.get_all(AUTHORIZATION).iter();
    let value = values.next().ok_or(TokenError::MissingCredential)?;
    if values.next().is_some() {
        return Err(TokenError::MalformedHeader);
    }

    let value = value.to_str().map_err(|_| TokenError::MalformedHeader)?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(TokenError::MalformedHeader),
    }
}
