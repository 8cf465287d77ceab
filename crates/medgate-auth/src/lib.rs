//! # medgate-auth — Bearer Credential Verification
//!
//! Validates the bearer token presented to the gateway and extracts the
//! caller's [`VerifiedIdentity`]. Verification is a pure function of the
//! token, the shared secret, and the clock: no I/O, no identity store lookup.
//!
//! ## Token format
//!
//! JWS compact serialization signed with HMAC-SHA256 (`alg: HS256`):
//!
//! ```text
//! base64url(header) . base64url(claims) . base64url(HMAC-SHA256(secret, header.claims))
//! ```
//!
//! | Claim  | Required | Type              | Meaning                       |
//! |--------|----------|-------------------|-------------------------------|
//! | `sub`  | yes      | string or integer | Subject identifier            |
//! | `role` | no       | string            | Caller role, relayed verbatim |
//! | `exp`  | no       | integer (seconds) | Expiry                        |
//! | `nbf`  | no       | integer (seconds) | Not-before                    |
//!
//! The identity-issuing service signs tokens with the same secret via
//! [`TokenSigner`].

pub mod bearer;
pub mod error;
pub mod secret;
pub mod signer;
pub mod verifier;

mod jws;

pub use bearer::bearer_token;
pub use error::{TokenError, TokenErrorKind};
pub use medgate_core::VerifiedIdentity;
pub use secret::SharedSecret;
pub use signer::TokenSigner;
pub use verifier::TokenVerifier;
