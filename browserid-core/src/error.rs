//! Error types for BrowserID-NG
//!
//! The `Display` text of each variant is the `reason` string reported to
//! relying parties, so it is part of the wire contract.

use thiserror::Error;

use crate::audience::AudienceMismatch;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("malformed assertion")]
    MalformedAssertion,

    #[error("certificate has expired")]
    CertificateExpired,

    #[error("assertion has expired")]
    AssertionExpired,

    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    #[error("bad signature in chain")]
    BadCertificateSignature,

    #[error("verification failure")]
    BadAssertionSignature,

    #[error("certificate chain too long: {length} certificates, at most {max} allowed")]
    ChainTooLong { length: usize, max: usize },

    #[error("audience mismatch: {0}")]
    AudienceMismatch(AudienceMismatch),

    #[error("unverified email")]
    UnverifiedEmail,

    #[error("issuer issue '{issuer}' may not speak for emails from '{email_domain}'")]
    AuthorityMismatch {
        issuer: String,
        email_domain: String,
    },

    #[error("this verifier doesn't respect certs issued from domains other than: {hostname}")]
    PrimarySupportDisabled { hostname: String },

    #[error("invalid domain: '{0}'")]
    InvalidDomain(String),

    #[error("bad support document for '{domain}': {reason}")]
    PrimaryMalformed { domain: String, reason: String },

    #[error("Circular reference in delegating authority: {}", .path.join(" > "))]
    DelegationCycle { path: Vec<String> },

    #[error("Too many hops while delegating authority: {}", .path.join(" > "))]
    TooManyHops { path: Vec<String> },

    #[error("{domain} is not a browserid primary - {reason}")]
    PrimaryUnavailable { domain: String, reason: String },

    #[error("can't get public key for {domain}")]
    PublicKeyUnavailable { domain: String },

    #[error("untrusted issuer: {0}")]
    UntrustedIssuer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from expiry rather than from a bad signature
    /// or policy check.
    pub fn is_expiration(&self) -> bool {
        matches!(self, Error::CertificateExpired | Error::AssertionExpired)
    }
}
