//! Assertion verification
//!
//! Ties the pieces together. An assertion is accepted when:
//! 1. its certificate chain verifies back to a trusted issuer key
//! 2. its audience matches the one the relying party supplied
//! 3. the principal is verified, or the caller accepts unverified ones
//! 4. the issuer may speak for the email's domain
//!
//! Issuer keys come from the local root key when the issuer is this
//! verifier's own hostname (or an explicitly forced issuer), and from the
//! primary resolver otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::audience::compare_audiences;
use crate::chain::{verify_chain, ChainPolicy, ForcedIssuerLookup, IssuerKeyLookup, RootKeyLookup};
use crate::primary::{PrimaryResolver, WellKnownFetcher};
use crate::{CertificateBundle, Error, PublicKey, Result};

/// Per-request verification options
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Issuer trusted to sign with the root key for this request
    pub force_issuer: Option<String>,
    /// Accept certificates for unverified email addresses
    pub allow_unverified: bool,
}

/// A successfully verified assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub email: String,
    pub audience: String,
    pub expires: DateTime<Utc>,
    pub issuer: String,
    /// False when the certificate only carried an unverified email
    pub verified: bool,
}

/// Verifies bundles against a root key and a primary resolver
#[derive(Debug)]
pub struct Verifier<F> {
    hostname: String,
    root: RootKeyLookup,
    root_key: PublicKey,
    resolver: Arc<PrimaryResolver<F>>,
    policy: ChainPolicy,
}

impl<F: WellKnownFetcher> Verifier<F> {
    /// `hostname` is this system's own issuer name, whose certificates are
    /// checked against `root_key`
    pub fn new(
        hostname: impl Into<String>,
        root_key: PublicKey,
        resolver: Arc<PrimaryResolver<F>>,
    ) -> Self {
        let hostname = hostname.into();
        Self {
            root: RootKeyLookup::new(hostname.clone(), root_key.clone()),
            hostname,
            root_key,
            resolver,
            policy: ChainPolicy::default(),
        }
    }

    pub fn with_chain_policy(mut self, policy: ChainPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn resolver(&self) -> &Arc<PrimaryResolver<F>> {
        &self.resolver
    }

    /// Verify an encoded bundle for `audience` as of now
    pub async fn verify(
        &self,
        assertion: &str,
        audience: &str,
        options: &VerifyOptions,
    ) -> Result<VerificationOutcome> {
        self.verify_at(assertion, audience, options, Utc::now()).await
    }

    /// Verify an encoded bundle for `audience` as of `now`
    pub async fn verify_at(
        &self,
        assertion: &str,
        audience: &str,
        options: &VerifyOptions,
        now: DateTime<Utc>,
    ) -> Result<VerificationOutcome> {
        let bundle = CertificateBundle::parse(assertion)?;

        let lookup = IssuerRouter {
            verifier: self,
            forced: options
                .force_issuer
                .as_ref()
                .map(|issuer| ForcedIssuerLookup::new(vec![issuer.clone()], self.root_key.clone())),
        };
        let chain = verify_chain(&bundle, now, &lookup, &self.policy).await?;

        compare_audiences(&chain.assertion.aud, audience).map_err(|e| {
            debug!(want = %chain.assertion.aud, got = %audience, reason = %e, "Audience mismatch");
            Error::AudienceMismatch(e)
        })?;

        let verified = chain.principal.is_verified();
        if !verified && !options.allow_unverified {
            return Err(Error::UnverifiedEmail);
        }

        let email = chain.principal.address().to_string();
        let email_domain = chain.principal.domain().unwrap_or(&email).to_string();
        let issuer = chain.issuer;

        let may_speak = issuer == self.hostname
            || issuer == email_domain
            || options.force_issuer.as_deref() == Some(issuer.as_str())
            || self.resolver.delegates_to(&email_domain, &issuer).await;
        if !may_speak {
            return Err(Error::AuthorityMismatch {
                issuer,
                email_domain,
            });
        }

        debug!(%email, %issuer, verified, "Assertion verified");
        Ok(VerificationOutcome {
            email,
            audience: chain.assertion.aud,
            expires: chain.assertion.exp,
            issuer,
            verified,
        })
    }
}

/// Picks the key source for an issuer
struct IssuerRouter<'a, F> {
    verifier: &'a Verifier<F>,
    forced: Option<ForcedIssuerLookup>,
}

#[async_trait]
impl<'a, F: WellKnownFetcher> IssuerKeyLookup for IssuerRouter<'a, F> {
    async fn issuer_key(&self, issuer: &str) -> Result<PublicKey> {
        if issuer == self.verifier.hostname {
            return self.verifier.root.issuer_key(issuer).await;
        }
        if !self.verifier.resolver.config().enabled {
            return Err(Error::PrimarySupportDisabled {
                hostname: self.verifier.hostname.clone(),
            });
        }
        if let Some(forced) = self.forced.as_ref().filter(|f| f.permits(issuer)) {
            return forced.issuer_key(issuer).await;
        }
        self.verifier.resolver.issuer_key(issuer).await
    }
}
