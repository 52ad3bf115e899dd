//! BrowserID-NG Core Library
//!
//! Verifies BrowserID identity assertions:
//! - Issuers sign certificates binding a user key to an email address
//! - Users sign short-lived assertions for a relying party
//! - Verifiers walk the certificate chain back to a trusted key, which is
//!   either this system's own root key or one published by a primary domain

pub mod assertion;
pub mod audience;
pub mod certificate;
pub mod chain;
pub mod error;
pub mod jwt;
pub mod keys;
pub mod primary;
pub mod verifier;

pub use assertion::{Assertion, CertificateBundle};
pub use audience::{compare_audiences, AudienceMismatch};
pub use certificate::{Certificate, Principal};
pub use chain::{verify_chain, ChainPolicy, IssuerKeyLookup, VerifiedChain, MAX_CHAIN_LENGTH};
pub use error::Error;
pub use keys::{Algorithm, KeyPair, PublicKey, SecretKey};
pub use primary::{PrimaryResolver, Support, WellKnownFetcher, MAX_DELEGATION_HOPS};
pub use verifier::{VerificationOutcome, Verifier, VerifyOptions};

/// Result type for browserid-core operations
pub type Result<T> = std::result::Result<T, Error>;
