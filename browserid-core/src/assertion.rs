//! Identity assertions for BrowserID-NG
//!
//! An assertion proves a user's identity to a relying party.
//! A certificate bundle carries the certificate chain that backs it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::jwt::{self, SignedObject};
use crate::{Certificate, Error, PublicKey, Result, SecretKey};

/// Claims in an identity assertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Audience (the relying party this assertion is for)
    pub aud: String,

    /// Expiration, milliseconds since the epoch
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub exp: DateTime<Utc>,
}

/// An identity assertion claiming an email for a specific audience
#[derive(Debug, Clone)]
pub struct Assertion {
    signed: SignedObject,
    claims: AssertionClaims,
}

impl Assertion {
    /// Create and sign a new assertion valid for `validity` from now
    ///
    /// # Arguments
    /// * `audience` - The relying party (e.g., "https://example.com")
    /// * `validity` - How long the assertion should be valid (typically 2-5 minutes)
    /// * `user_key` - The user's signing key
    pub fn create(audience: &str, validity: Duration, user_key: &SecretKey) -> Result<Self> {
        Self::create_at(audience, Utc::now() + validity, user_key)
    }

    /// Create and sign a new assertion with an explicit expiry
    pub fn create_at(
        audience: &str,
        expires_at: DateTime<Utc>,
        user_key: &SecretKey,
    ) -> Result<Self> {
        let claims = AssertionClaims {
            aud: audience.to_string(),
            exp: expires_at,
        };
        let encoded = jwt::sign(&claims, user_key)?;
        Self::parse(&encoded)
    }

    /// Parse an assertion from its encoded form (does not verify signature)
    pub fn parse(encoded: &str) -> Result<Self> {
        let signed = SignedObject::parse(encoded)?;
        let claims = signed.payload()?;
        Ok(Self { signed, claims })
    }

    /// Verify the assertion signature against a public key
    pub fn verify(&self, public_key: &PublicKey) -> Result<()> {
        self.signed.verify(public_key)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.claims.exp
    }

    pub fn claims(&self) -> &AssertionClaims {
        &self.claims
    }

    /// Get the audience
    pub fn audience(&self) -> &str {
        &self.claims.aud
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.exp
    }

    /// Get the encoded form
    pub fn encoded(&self) -> &str {
        self.signed.encoded()
    }
}

/// Certificate chain plus assertion
///
/// Format: `<cert-1>~<cert-2>~...~<cert-n>~<assertion>`
///
/// Each certificate is signed by the subject key of the one before it; the
/// first is signed by a key the verifier already trusts and the assertion by
/// the last subject key.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    certificates: Vec<Certificate>,
    assertion: Assertion,
}

impl CertificateBundle {
    /// Create a bundle with a single certificate
    pub fn new(certificate: Certificate, assertion: Assertion) -> Self {
        Self {
            certificates: vec![certificate],
            assertion,
        }
    }

    /// Create a bundle with a certificate chain
    pub fn with_chain(certificates: Vec<Certificate>, assertion: Assertion) -> Self {
        Self {
            certificates,
            assertion,
        }
    }

    /// Parse the `cert~cert~...~assertion` format
    pub fn parse(encoded: &str) -> Result<Self> {
        let mut parts: Vec<&str> = encoded.split('~').collect();
        let assertion = match parts.pop() {
            Some(last) if !parts.is_empty() => Assertion::parse(last)?,
            _ => return Err(Error::MalformedAssertion),
        };

        let certificates = parts
            .into_iter()
            .map(Certificate::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            certificates,
            assertion,
        })
    }

    /// Encode to the `cert~cert~...~assertion` format
    pub fn encode(&self) -> String {
        let mut parts: Vec<&str> = self.certificates.iter().map(|c| c.encoded()).collect();
        parts.push(self.assertion.encoded());
        parts.join("~")
    }

    /// Get the certificates in the chain
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// Get the assertion
    pub fn assertion(&self) -> &Assertion {
        &self.assertion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Algorithm, KeyPair, Principal};

    #[test]
    fn test_assertion_create_and_verify() {
        let user_key = KeyPair::generate(Algorithm::Ed25519).unwrap();

        let assertion =
            Assertion::create("https://example.com", Duration::minutes(5), user_key.secret_key())
                .unwrap();

        assertion.verify(&user_key.public_key()).unwrap();
        assert_eq!(assertion.audience(), "https://example.com");
        assert!(!assertion.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_bundle_encode_parse() {
        let domain_key = KeyPair::generate(Algorithm::Ed25519).unwrap();
        let user_key = KeyPair::generate(Algorithm::Ds).unwrap();

        let cert = Certificate::create(
            "example.com",
            Principal::email("alice@example.com"),
            &user_key.public_key(),
            Duration::hours(1),
            domain_key.secret_key(),
        )
        .unwrap();
        let assertion = Assertion::create(
            "https://relying-party.com",
            Duration::minutes(5),
            user_key.secret_key(),
        )
        .unwrap();

        let encoded = CertificateBundle::new(cert, assertion).encode();
        assert_eq!(encoded.matches('~').count(), 1);

        let parsed = CertificateBundle::parse(&encoded).unwrap();
        assert_eq!(parsed.certificates().len(), 1);
        assert_eq!(parsed.certificates()[0].issuer(), "example.com");
        assert_eq!(parsed.assertion().audience(), "https://relying-party.com");
        parsed.assertion().verify(&user_key.public_key()).unwrap();
    }

    #[test]
    fn test_bundle_without_certificate_is_malformed() {
        let user_key = KeyPair::generate(Algorithm::Ed25519).unwrap();
        let assertion =
            Assertion::create("rp.com", Duration::minutes(5), user_key.secret_key()).unwrap();

        assert!(matches!(
            CertificateBundle::parse(assertion.encoded()),
            Err(Error::MalformedAssertion)
        ));
        assert!(matches!(
            CertificateBundle::parse("not~a~bundle"),
            Err(Error::MalformedAssertion)
        ));
    }
}
