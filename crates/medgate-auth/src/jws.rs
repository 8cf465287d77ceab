//! JWS compact serialization helpers shared by the signer and verifier.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::TokenError;
use crate::secret::SharedSecret;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// The only algorithm this crate signs or accepts.
pub(crate) const ALGORITHM: &str = "HS256";

/// JOSE header. Unknown fields are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JoseHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// The three segments of a compact token, still encoded.
pub(crate) struct Segments<'a> {
    pub header: &'a str,
    pub claims: &'a str,
    pub signature: &'a str,
    /// `header.claims`, the bytes the signature covers.
    pub signing_input: &'a str,
}

impl<'a> Segments<'a> {
    pub fn split(token: &'a str) -> Result<Self, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::MalformedToken(
                "expected three dot-separated segments".into(),
            ));
        };
        if header.is_empty() || claims.is_empty() || signature.is_empty() {
            return Err(TokenError::MalformedToken("empty segment".into()));
        }
        Ok(Self {
            header,
            claims,
            signature,
            signing_input: &token[..header.len() + 1 + claims.len()],
        })
    }
}

pub(crate) fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn decode(segment: &str, what: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::MalformedToken(format!("{what} is not base64url: {e}")))
}

pub(crate) fn mac(secret: &SharedSecret) -> Result<HmacSha256, TokenError> {
    // HMAC accepts keys of any length; the only failure mode is unreachable.
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::EmptySecret)
}
