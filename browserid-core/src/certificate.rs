//! Identity certificates for BrowserID-NG
//!
//! A certificate binds a user's public key to their email address,
//! signed by the issuing domain's key.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::jwt::{self, SignedObject};
use crate::{Error, PublicKey, Result, SecretKey};

/// Principal identifier in a certificate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Principal {
    /// Email address the issuer has verified
    Email { email: String },
    /// Email address the issuer vouches for without having verified it
    UnverifiedEmail {
        #[serde(rename = "unverified-email")]
        unverified_email: String,
    },
}

impl Principal {
    /// Create an email principal
    pub fn email(email: impl Into<String>) -> Self {
        Principal::Email {
            email: email.into(),
        }
    }

    /// Create an unverified email principal
    pub fn unverified_email(email: impl Into<String>) -> Self {
        Principal::UnverifiedEmail {
            unverified_email: email.into(),
        }
    }

    /// The address, verified or not
    pub fn address(&self) -> &str {
        match self {
            Principal::Email { email } => email,
            Principal::UnverifiedEmail { unverified_email } => unverified_email,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Principal::Email { .. })
    }

    /// Extract the domain from the address
    pub fn domain(&self) -> Option<&str> {
        self.address().rsplit_once('@').map(|(_, domain)| domain)
    }
}

/// Claims in an identity certificate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateClaims {
    /// Issuer (the domain that signed this certificate)
    pub iss: String,

    /// Issued at, milliseconds since the epoch
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<DateTime<Utc>>,

    /// Expiration, milliseconds since the epoch
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub exp: DateTime<Utc>,

    /// The certified public key
    #[serde(rename = "public-key")]
    pub public_key: PublicKey,

    pub principal: Principal,
}

/// An identity certificate binding a public key to an email address
#[derive(Debug, Clone)]
pub struct Certificate {
    signed: SignedObject,
    claims: CertificateClaims,
}

impl Certificate {
    /// Create and sign a certificate valid from now for `validity`
    pub fn create(
        issuer: &str,
        principal: Principal,
        subject_key: &PublicKey,
        validity: Duration,
        issuer_key: &SecretKey,
    ) -> Result<Self> {
        let now = Utc::now();
        Self::create_at(issuer, principal, subject_key, now, now + validity, issuer_key)
    }

    /// Create and sign a certificate with explicit issue and expiry times
    pub fn create_at(
        issuer: &str,
        principal: Principal,
        subject_key: &PublicKey,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        issuer_key: &SecretKey,
    ) -> Result<Self> {
        if expires_at <= issued_at {
            return Err(Error::InvalidCertificate(
                "expiry must be later than issue time".into(),
            ));
        }

        let claims = CertificateClaims {
            iss: issuer.to_string(),
            iat: Some(issued_at),
            exp: expires_at,
            public_key: subject_key.clone(),
            principal,
        };

        let encoded = jwt::sign(&claims, issuer_key)?;
        Self::parse(&encoded)
    }

    /// Parse a certificate from its encoded form (does not verify signature)
    pub fn parse(encoded: &str) -> Result<Self> {
        let signed = SignedObject::parse(encoded)?;
        let claims = signed.payload()?;
        Ok(Self { signed, claims })
    }

    /// Verify the certificate signature against the issuer's public key
    pub fn verify(&self, issuer_public_key: &PublicKey) -> Result<()> {
        self.signed.verify(issuer_public_key)
    }

    /// Whether the certificate has expired as of `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.claims.exp
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn claims(&self) -> &CertificateClaims {
        &self.claims
    }

    /// Get the certified public key
    pub fn public_key(&self) -> &PublicKey {
        &self.claims.public_key
    }

    pub fn principal(&self) -> &Principal {
        &self.claims.principal
    }

    /// Get the issuer domain
    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.exp
    }

    /// Get the encoded form
    pub fn encoded(&self) -> &str {
        self.signed.encoded()
    }
}
