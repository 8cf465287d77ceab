//! # Token Verifier
//!
//! Checks, in order: structure, algorithm, signature, temporal claims,
//! subject, role. Nothing from the claims segment is trusted before the
//! signature has been verified.

use chrono::{DateTime, Utc};
use hmac::Mac;
use medgate_core::{Role, SubjectId, VerifiedIdentity};
use serde_json::{Map, Value};

use crate::error::TokenError;
use crate::jws::{self, JoseHeader, Segments, ALGORITHM};
use crate::secret::SharedSecret;

/// Reserved claim carrying the subject identifier.
pub const SUBJECT_CLAIM: &str = "sub";

/// Claim carrying the caller's role.
pub const ROLE_CLAIM: &str = "role";

/// Verifies HS256 bearer tokens against a [`SharedSecret`].
///
/// Immutable once built; share it across requests behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    secret: SharedSecret,
    leeway_secs: i64,
}

impl TokenVerifier {
    /// Create a verifier with zero clock leeway.
    pub fn new(secret: SharedSecret) -> Self {
        Self {
            secret,
            leeway_secs: 0,
        }
    }

    /// Tolerate this much clock skew when checking `exp` and `nbf`.
    pub fn with_leeway(mut self, leeway_secs: u32) -> Self {
        self.leeway_secs = i64::from(leeway_secs);
        self
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<VerifiedIdentity, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now`.
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedIdentity, TokenError> {
        let segments = Segments::split(token)?;

        let header: JoseHeader = serde_json::from_slice(&jws::decode(segments.header, "header")?)
            .map_err(|e| TokenError::MalformedToken(format!("header is not valid JSON: {e}")))?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = jws::decode(segments.signature, "signature")?;
        let mut mac = jws::mac(&self.secret)?;
        mac.update(segments.signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Value = serde_json::from_slice(&jws::decode(segments.claims, "claims")?)
            .map_err(|e| TokenError::MalformedToken(format!("claims are not valid JSON: {e}")))?;
        let Value::Object(claims) = claims else {
            return Err(TokenError::MalformedToken(
                "claims must be a JSON object".into(),
            ));
        };

        self.check_temporal(&claims, now.timestamp())?;

        Ok(VerifiedIdentity {
            subject: subject(&claims)?,
            role: role(&claims)?,
        })
    }

    fn check_temporal(&self, claims: &Map<String, Value>, now: i64) -> Result<(), TokenError> {
        if let Some(exp) = timestamp_claim(claims, "exp")? {
            if now >= exp.saturating_add(self.leeway_secs) {
                return Err(TokenError::Expired);
            }
        }
        if let Some(nbf) = timestamp_claim(claims, "nbf")? {
            if now.saturating_add(self.leeway_secs) < nbf {
                return Err(TokenError::NotYetValid);
            }
        }
        Ok(())
    }
}

fn timestamp_claim(
    claims: &Map<String, Value>,
    claim: &'static str,
) -> Result<Option<i64>, TokenError> {
    match claims.get(claim) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or(TokenError::InvalidClaim {
            claim,
            reason: "must be an integer number of seconds".into(),
        }),
        Some(_) => Err(TokenError::UnsupportedClaimType { claim }),
    }
}

fn subject(claims: &Map<String, Value>) -> Result<SubjectId, TokenError> {
    match claims.get(SUBJECT_CLAIM) {
        None | Some(Value::Null) => Err(TokenError::MissingSubjectClaim),
        Some(Value::String(s)) => SubjectId::new(s.as_str()).map_err(|e| TokenError::InvalidClaim {
            claim: SUBJECT_CLAIM,
            reason: e.to_string(),
        }),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(SubjectId::from_number(i))
            } else if let Some(u) = n.as_u64() {
                Ok(SubjectId::from_number(u))
            } else {
                // Fractional numbers are not identifiers.
                Err(TokenError::UnsupportedClaimType {
                    claim: SUBJECT_CLAIM,
                })
            }
        }
        Some(_) => Err(TokenError::UnsupportedClaimType {
            claim: SUBJECT_CLAIM,
        }),
    }
}

fn role(claims: &Map<String, Value>) -> Result<Option<Role>, TokenError> {
    match claims.get(ROLE_CLAIM) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Role::new(s.as_str())
            .map(Some)
            .map_err(|e| TokenError::InvalidClaim {
                claim: ROLE_CLAIM,
                reason: e.to_string(),
            }),
        Some(_) => Err(TokenError::UnsupportedClaimType { claim: ROLE_CLAIM }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::TokenSigner;
    use chrono::TimeZone;
    use serde_json::json;

    const SECRET: &str = "gateway-shared-secret";

    fn secret() -> SharedSecret {
        SharedSecret::new(SECRET).unwrap()
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(secret())
    }

    fn sign(claims: Value) -> String {
        TokenSigner::new(secret()).sign(&claims).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    // ── subject claim ────────────────────────────────────────────

    #[test]
    fn numeric_subject_accepted() {
        let identity = verifier().verify(&sign(json!({"sub": 7}))).unwrap();
        assert_eq!(identity.subject.as_str(), "7");
        assert!(identity.role.is_none());
    }

    #[test]
    fn string_subject_accepted() {
        let identity = verifier()
            .verify(&sign(json!({"sub": "patient-19"})))
            .unwrap();
        assert_eq!(identity.subject.as_str(), "patient-19");
    }

    #[test]
    fn large_unsigned_subject_accepted() {
        let identity = verifier()
            .verify(&sign(json!({"sub": u64::MAX})))
            .unwrap();
        assert_eq!(identity.subject.as_str(), u64::MAX.to_string());
    }

    #[test]
    fn missing_subject_rejected() {
        assert_eq!(
            verifier().verify(&sign(json!({"role": "doctor"}))).unwrap_err(),
            TokenError::MissingSubjectClaim
        );
        assert_eq!(
            verifier().verify(&sign(json!({"sub": null}))).unwrap_err(),
            TokenError::MissingSubjectClaim
        );
    }

    #[test]
    fn unsupported_subject_types_rejected() {
        for sub in [json!(true), json!([7]), json!({"id": 7}), json!(7.5)] {
            assert_eq!(
                verifier().verify(&sign(json!({"sub": sub}))).unwrap_err(),
                TokenError::UnsupportedClaimType { claim: "sub" },
            );
        }
    }

    #[test]
    fn header_unsafe_subject_rejected() {
        let err = verifier()
            .verify(&sign(json!({"sub": "7\r\nx-user-role: admin"})))
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidClaim { claim: "sub", .. }));
    }

    // ── role claim ───────────────────────────────────────────────

    #[test]
    fn role_extracted() {
        let identity = verifier()
            .verify(&sign(json!({"sub": 7, "role": "doctor"})))
            .unwrap();
        assert_eq!(identity.role.unwrap().as_str(), "doctor");
    }

    #[test]
    fn non_string_role_rejected() {
        assert_eq!(
            verifier()
                .verify(&sign(json!({"sub": 7, "role": 1})))
                .unwrap_err(),
            TokenError::UnsupportedClaimType { claim: "role" }
        );
    }

    // ── signature and structure ──────────────────────────────────

    #[test]
    fn different_secret_is_invalid_signature() {
        let other = TokenSigner::new(SharedSecret::new("some-other-secret").unwrap());
        let token = other.sign(&json!({"sub": 7})).unwrap();
        assert_eq!(
            verifier().verify(&token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn tampered_claims_are_invalid_signature() {
        let token = sign(json!({"sub": 7}));
        let forged_claims = jws::encode(br#"{"sub":1}"#);
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_claims;
        let forged = parts.join(".");
        assert_eq!(
            verifier().verify(&forged).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn alg_none_rejected() {
        let header = jws::encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = jws::encode(br#"{"sub":7}"#);
        let token = format!("{header}.{claims}.c2ln");
        assert_eq!(
            verifier().verify(&token).unwrap_err(),
            TokenError::UnsupportedAlgorithm("none".into())
        );
    }

    #[test]
    fn garbage_is_malformed() {
        for token in ["garbage", "a.b", "a.b.c.d", "..", "!!!.###.$$$"] {
            let err = verifier().verify(token).unwrap_err();
            assert!(
                matches!(err, TokenError::MalformedToken(_)),
                "{token}: {err:?}"
            );
        }
    }

    #[test]
    fn signed_non_object_claims_malformed() {
        let header = jws::encode(br#"{"alg":"HS256"}"#);
        let claims = jws::encode(b"[1,2,3]");
        let signing_input = format!("{header}.{claims}");
        let mut mac = jws::mac(&secret()).unwrap();
        mac.update(signing_input.as_bytes());
        let sig = jws::encode(&mac.finalize().into_bytes());
        let token = format!("{signing_input}.{sig}");
        assert!(matches!(
            verifier().verify(&token).unwrap_err(),
            TokenError::MalformedToken(_)
        ));
    }

    // ── temporal claims ──────────────────────────────────────────

    #[test]
    fn expired_token_rejected() {
        let token = sign(json!({"sub": 7, "exp": 1_000}));
        assert_eq!(
            verifier().verify_at(&token, at(1_000)).unwrap_err(),
            TokenError::Expired
        );
        assert!(verifier().verify_at(&token, at(999)).is_ok());
    }

    #[test]
    fn leeway_extends_expiry() {
        let token = sign(json!({"sub": 7, "exp": 1_000}));
        let lenient = verifier().with_leeway(30);
        assert!(lenient.verify_at(&token, at(1_029)).is_ok());
        assert_eq!(
            lenient.verify_at(&token, at(1_030)).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn not_before_enforced() {
        let token = sign(json!({"sub": 7, "nbf": 2_000}));
        assert_eq!(
            verifier().verify_at(&token, at(1_999)).unwrap_err(),
            TokenError::NotYetValid
        );
        assert!(verifier().verify_at(&token, at(2_000)).is_ok());
    }

    #[test]
    fn non_integer_exp_rejected() {
        let token = sign(json!({"sub": 7, "exp": "tomorrow"}));
        assert_eq!(
            verifier().verify(&token).unwrap_err(),
            TokenError::UnsupportedClaimType { claim: "exp" }
        );
    }

    #[test]
    fn expired_is_not_a_signature_failure() {
        let token = sign(json!({"sub": 7, "exp": 1}));
        let err = verifier().verify(&token).unwrap_err();
        assert_eq!(err.kind(), crate::TokenErrorKind::Claims);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any integer subject signed with the configured secret verifies
            /// to its decimal rendering.
            #[test]
            fn any_numeric_subject_verifies(n in any::<i64>()) {
                let identity = verifier().verify(&sign(json!({"sub": n}))).unwrap();
                prop_assert_eq!(identity.subject.as_str(), n.to_string());
            }

            /// Any visible-ASCII string subject verifies to itself.
            #[test]
            fn any_string_subject_verifies(s in "[!-~]{1,64}") {
                let identity = verifier().verify(&sign(json!({"sub": s.clone()}))).unwrap();
                prop_assert_eq!(identity.subject.as_str(), s.as_str());
            }

            /// Tokens signed with any other secret never verify.
            #[test]
            fn foreign_secret_never_verifies(other in "[a-zA-Z0-9]{1,48}") {
                prop_assume!(other != SECRET);
                let signer = TokenSigner::new(SharedSecret::new(other).unwrap());
                let token = signer.sign(&json!({"sub": 7})).unwrap();
                prop_assert_eq!(verifier().verify(&token).unwrap_err(), TokenError::InvalidSignature);
            }
        }
    }
}
