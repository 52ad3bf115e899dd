//! Certificate chain verification
//!
//! Walks a bundle's certificates in order. The first certificate is checked
//! against a key obtained from an [`IssuerKeyLookup`]; every later
//! certificate, and finally the assertion, against the subject key of the
//! certificate before it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::assertion::AssertionClaims;
use crate::certificate::{CertificateClaims, Principal};
use crate::primary::{PrimaryResolver, WellKnownFetcher};
use crate::{CertificateBundle, Error, PublicKey, Result};

/// Longest certificate chain accepted by default
pub const MAX_CHAIN_LENGTH: usize = 1;

/// Limits applied while walking a chain
#[derive(Debug, Clone)]
pub struct ChainPolicy {
    pub max_certificates: usize,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self {
            max_certificates: MAX_CHAIN_LENGTH,
        }
    }
}

impl ChainPolicy {
    fn check_length(&self, length: usize) -> Result<()> {
        if length > self.max_certificates {
            return Err(Error::ChainTooLong {
                length,
                max: self.max_certificates,
            });
        }
        Ok(())
    }
}

/// Source of the key that signed the first certificate in a chain
#[async_trait]
pub trait IssuerKeyLookup: Send + Sync {
    async fn issuer_key(&self, issuer: &str) -> Result<PublicKey>;
}

/// Trusts a single static key for one hostname
#[derive(Debug, Clone)]
pub struct RootKeyLookup {
    hostname: String,
    key: PublicKey,
}

impl RootKeyLookup {
    pub fn new(hostname: impl Into<String>, key: PublicKey) -> Self {
        Self {
            hostname: hostname.into(),
            key,
        }
    }
}

#[async_trait]
impl IssuerKeyLookup for RootKeyLookup {
    async fn issuer_key(&self, issuer: &str) -> Result<PublicKey> {
        if issuer == self.hostname {
            Ok(self.key.clone())
        } else {
            Err(Error::UntrustedIssuer(issuer.to_string()))
        }
    }
}

/// Trusts a fixed set of issuers to sign with the root key
#[derive(Debug, Clone)]
pub struct ForcedIssuerLookup {
    issuers: Vec<String>,
    key: PublicKey,
}

impl ForcedIssuerLookup {
    pub fn new(issuers: Vec<String>, key: PublicKey) -> Self {
        Self { issuers, key }
    }

    pub fn permits(&self, issuer: &str) -> bool {
        self.issuers.iter().any(|i| i == issuer)
    }
}

#[async_trait]
impl IssuerKeyLookup for ForcedIssuerLookup {
    async fn issuer_key(&self, issuer: &str) -> Result<PublicKey> {
        if self.permits(issuer) {
            Ok(self.key.clone())
        } else {
            Err(Error::UntrustedIssuer(issuer.to_string()))
        }
    }
}

#[async_trait]
impl<F: WellKnownFetcher> IssuerKeyLookup for PrimaryResolver<F> {
    async fn issuer_key(&self, issuer: &str) -> Result<PublicKey> {
        self.public_key(issuer).await
    }
}

/// A chain whose signatures and expiry times all checked out
#[derive(Debug, Clone)]
pub struct VerifiedChain {
    pub certificates: Vec<CertificateClaims>,
    /// Principal of the last certificate
    pub principal: Principal,
    /// Issuer of the first certificate, the one whose key was looked up.
    /// Later `iss` fields are chosen by the previous certificate's holder.
    pub issuer: String,
    pub assertion: AssertionClaims,
}

/// Verify every certificate in `bundle` and the trailing assertion as of `now`
pub async fn verify_chain<L>(
    bundle: &CertificateBundle,
    now: DateTime<Utc>,
    lookup: &L,
    policy: &ChainPolicy,
) -> Result<VerifiedChain>
where
    L: IssuerKeyLookup + ?Sized,
{
    let certificates = bundle.certificates();
    if certificates.is_empty() {
        return Err(Error::MalformedAssertion);
    }
    policy.check_length(certificates.len())?;

    let mut signer: Option<PublicKey> = None;
    for cert in certificates {
        if cert.is_expired_at(now) {
            debug!(issuer = %cert.issuer(), expired = %cert.expires_at(), "Certificate expired");
            return Err(Error::CertificateExpired);
        }

        let issuer_key = match signer.take() {
            Some(key) => key,
            None => lookup.issuer_key(cert.issuer()).await?,
        };

        cert.verify(&issuer_key)
            .map_err(|_| Error::BadCertificateSignature)?;
        signer = Some(cert.public_key().clone());
    }

    let assertion = bundle.assertion();
    if assertion.is_expired_at(now) {
        return Err(Error::AssertionExpired);
    }
    let signer = signer.ok_or(Error::MalformedAssertion)?;
    assertion
        .verify(&signer)
        .map_err(|_| Error::BadAssertionSignature)?;

    // certificates is non-empty
    let first = &certificates[0];
    let last = &certificates[certificates.len() - 1];
    Ok(VerifiedChain {
        certificates: certificates.iter().map(|c| c.claims().clone()).collect(),
        principal: last.principal().clone(),
        issuer: first.issuer().to_string(),
        assertion: assertion.claims().clone(),
    })
}
