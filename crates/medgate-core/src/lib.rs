#![deny(missing_docs)]

//! # medgate-core — Identity Types Shared Across the Perimeter
//!
//! The gateway authenticates a caller once and hands the derived identity to
//! backend services as trusted headers. This crate holds the types on both
//! sides of that hand-off so the gateway (writer) and every backend (reader)
//! agree on names and formats.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identity values.** [`SubjectId`] and [`Role`]
//!    validate at construction and are always legal HTTP header values.
//!
//! 2. **One allow-list of trusted headers.** [`TRUSTED_HEADERS`] is the only
//!    set of header names the gateway overwrites, and the only set backends
//!    read identity from.
//!
//! 3. **Structured errors with `thiserror`.** No `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod trusted;

pub use error::ValidationError;
pub use identity::{Role, SubjectId, VerifiedIdentity};
pub use trusted::{ROLE_HEADER, SUBJECT_HEADER, TRUSTED_HEADERS};
