//! Token verification error types.

use thiserror::Error;

/// Why a bearer credential was not accepted.
///
/// The gateway never forwards these to a backend. Depending on the route it
/// either answers 401 or proceeds without an identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No `Authorization` header was sent.
    #[error("missing authorization header")]
    MissingCredential,

    /// The `Authorization` header is not exactly `Bearer <token>`.
    #[error("authorization header must be of the form 'Bearer <token>'")]
    MalformedHeader,

    /// The token is not a well-formed JWS compact serialization.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token header names an algorithm other than HS256.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not match the shared secret.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The `exp` claim is in the past.
    #[error("token expired")]
    Expired,

    /// The `nbf` claim is in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// The token carries no subject claim.
    #[error("token has no subject claim")]
    MissingSubjectClaim,

    /// A claim has a JSON type other than the accepted ones.
    #[error("claim '{claim}' has an unsupported type")]
    UnsupportedClaimType {
        /// Claim name.
        claim: &'static str,
    },

    /// A claim has the right type but an unacceptable value.
    #[error("claim '{claim}' is invalid: {reason}")]
    InvalidClaim {
        /// Claim name.
        claim: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The shared secret is empty.
    #[error("shared secret must not be empty")]
    EmptySecret,
}

/// Coarse classification of [`TokenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenErrorKind {
    /// The credential is absent or cannot be parsed.
    Credential,
    /// The credential is cryptographically invalid.
    Cryptographic,
    /// The credential is authentic but its claims are unacceptable.
    Claims,
    /// The verifier itself is misconfigured.
    Configuration,
}

impl TokenErrorKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Cryptographic => "cryptographic",
            Self::Claims => "claims",
            Self::Configuration => "configuration",
        }
    }
}

impl TokenError {
    /// Classify this error.
    pub fn kind(&self) -> TokenErrorKind {
        match self {
            Self::MissingCredential | Self::MalformedHeader | Self::MalformedToken(_) => {
                TokenErrorKind::Credential
            }
            Self::UnsupportedAlgorithm(_) | Self::InvalidSignature => {
                TokenErrorKind::Cryptographic
            }
            Self::Expired
            | Self::NotYetValid
            | Self::MissingSubjectClaim
            | Self::UnsupportedClaimType { .. }
            | Self::InvalidClaim { .. } => TokenErrorKind::Claims,
            Self::EmptySecret => TokenErrorKind::Configuration,
        }
    }

    /// Stable snake_case label for logs, metrics, and error bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedHeader => "malformed_header",
            Self::MalformedToken(_) => "malformed_token",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::MissingSubjectClaim => "missing_subject_claim",
            Self::UnsupportedClaimType { .. } => "unsupported_claim_type",
            Self::InvalidClaim { .. } => "invalid_claim",
            Self::EmptySecret => "empty_secret",
        }
    }
}
