//! HS256 token signing, used by the identity-issuing service and by tests.

use hmac::Mac;
use serde_json::Value;

use crate::error::TokenError;
use crate::jws::{self, JoseHeader, ALGORITHM};
use crate::secret::SharedSecret;

/// Produces tokens the [`TokenVerifier`](crate::TokenVerifier) accepts when
/// both hold the same [`SharedSecret`].
#[derive(Debug, Clone)]
pub struct TokenSigner {
    secret: SharedSecret,
}

impl TokenSigner {
    /// Create a signer for the given secret.
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }

    /// Sign a claims object.
    ///
    /// The claims are serialized as given; nothing is added or checked
    /// beyond requiring a JSON object.
    pub fn sign(&self, claims: &Value) -> Result<String, TokenError> {
        if !claims.is_object() {
            return Err(TokenError::MalformedToken(
                "claims must be a JSON object".into(),
            ));
        }

        let header = JoseHeader {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let header = serde_json::to_vec(&header)
            .map_err(|e| TokenError::MalformedToken(e.to_string()))?;
        let claims =
            serde_json::to_vec(claims).map_err(|e| TokenError::MalformedToken(e.to_string()))?;

        let signing_input = format!("{}.{}", jws::encode(&header), jws::encode(&claims));
        let mut mac = jws::mac(&self.secret)?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{signing_input}.{}", jws::encode(&signature)))
    }
}
