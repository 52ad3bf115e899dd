//! Primary authority resolution
//!
//! A primary is a domain that vouches for its own users by publishing a
//! support document at `/.well-known/browserid`. A domain may instead
//! delegate to another domain, which is followed until a document with a
//! public key is found.

mod cache;
mod fetch;
mod well_known;

use tracing::{debug, info, warn};

pub use cache::{CacheConfig, SupportCache};
pub use fetch::{FetchedDocument, NoNetwork, Shim, ShimmedFetcher, WellKnownFetcher};
pub use well_known::{validate_domain, PrimaryUrls, WellKnownDocument, WELL_KNOWN_PATH};

use crate::{Error, PublicKey, Result};

/// Longest delegation path followed, counting the origin domain
pub const MAX_DELEGATION_HOPS: usize = 6;

/// Resolver settings
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// When false every domain is reported as not a primary
    pub enabled: bool,
    pub max_delegation_hops: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_delegation_hops: MAX_DELEGATION_HOPS,
        }
    }
}

/// Domains visited while following delegation, origin first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationPath(Vec<String>);

impl DelegationPath {
    pub fn new(origin: impl Into<String>) -> Self {
        Self(vec![origin.into()])
    }

    /// Record a hop to `next`, failing on a revisit or when the path is
    /// already longer than `max_hops`
    pub fn follow(&mut self, next: &str, max_hops: usize) -> Result<()> {
        if self.contains(next) {
            return Err(Error::DelegationCycle {
                path: self.0.clone(),
            });
        }
        if self.0.len() > max_hops {
            return Err(Error::TooManyHops {
                path: self.0.clone(),
            });
        }
        self.0.push(next.to_string());
        Ok(())
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.0.iter().any(|d| d == domain)
    }

    pub fn domains(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A resolved primary
#[derive(Debug, Clone)]
pub struct PrimaryAuthority {
    /// The domain that was asked about
    pub domain: String,
    /// The domain whose document carried the key
    pub authority: String,
    pub public_key: PublicKey,
    pub urls: PrimaryUrls,
    pub delegation: DelegationPath,
}

/// Outcome of checking a domain for primary support
#[derive(Debug, Clone)]
pub enum Support {
    Primary(PrimaryAuthority),
    /// The domain published `disabled: true`
    Disabled { domain: String },
    NotPrimary { reason: String },
}

impl Support {
    pub fn is_primary(&self) -> bool {
        matches!(self, Support::Primary(_))
    }

    pub fn authority(&self) -> Option<&PrimaryAuthority> {
        match self {
            Support::Primary(authority) => Some(authority),
            _ => None,
        }
    }
}

/// Resolves domains to primary authorities with a read-through cache
#[derive(Debug)]
pub struct PrimaryResolver<F> {
    fetcher: F,
    cache: SupportCache,
    config: ResolverConfig,
}

impl<F: WellKnownFetcher> PrimaryResolver<F> {
    pub fn new(fetcher: F, cache: SupportCache, config: ResolverConfig) -> Self {
        Self {
            fetcher,
            cache,
            config,
        }
    }

    /// Resolver with default settings and an unbounded cache
    pub fn with_fetcher(fetcher: F) -> Self {
        Self::new(fetcher, SupportCache::default(), ResolverConfig::default())
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn cache(&self) -> &SupportCache {
        &self.cache
    }

    /// Check whether `domain` is a primary, following delegation
    pub async fn check_support(&self, domain: &str) -> Result<Support> {
        if !self.config.enabled {
            return Ok(Support::NotPrimary {
                reason: "primary support disabled".into(),
            });
        }

        validate_domain(domain)?;
        let domain = domain.to_ascii_lowercase();

        if let Some(support) = self.cache.get(&domain) {
            return Ok(support);
        }

        let support = self.resolve(&domain).await?;
        self.cache.insert(domain, support.clone());
        Ok(support)
    }

    async fn resolve(&self, origin: &str) -> Result<Support> {
        let mut path = DelegationPath::new(origin);
        let mut current = origin.to_string();

        loop {
            let fetched = match self.fetcher.fetch(&current).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    debug!(domain = %current, error = %e, "Not a browserid primary");
                    return Ok(Support::NotPrimary {
                        reason: e.to_string(),
                    });
                }
            };

            let value: serde_json::Value = match serde_json::from_str(&fetched.body) {
                Ok(value) => value,
                Err(e) => {
                    debug!(domain = %current, error = %e, "Support document is not JSON");
                    return Ok(Support::NotPrimary {
                        reason: format!("{current} served a support document that is not JSON"),
                    });
                }
            };

            let malformed = |reason: String| {
                warn!(domain = %current, %reason, "Malformed support document");
                Error::PrimaryMalformed {
                    domain: current.clone(),
                    reason,
                }
            };

            match WellKnownDocument::from_value(&value).map_err(malformed)? {
                WellKnownDocument::Disabled => {
                    debug!(domain = %current, "Primary support disabled by domain");
                    return Ok(Support::Disabled {
                        domain: origin.to_string(),
                    });
                }
                WellKnownDocument::Delegation { authority } => {
                    debug!(from = %current, to = %authority, "Following delegation");
                    path.follow(&authority, self.config.max_delegation_hops)?;
                    current = authority;
                }
                WellKnownDocument::Primary {
                    public_key,
                    authentication,
                    provisioning,
                } => {
                    let urls = PrimaryUrls::build(&fetched.base_url, &authentication, &provisioning)
                        .map_err(malformed)?;
                    info!(
                        domain = %origin,
                        authority = %current,
                        key = %public_key.fingerprint(),
                        "Found browserid primary"
                    );
                    return Ok(Support::Primary(PrimaryAuthority {
                        domain: origin.to_string(),
                        authority: current,
                        public_key,
                        urls,
                        delegation: path,
                    }));
                }
            }
        }
    }

    /// The public key `domain` signs certificates with
    pub async fn public_key(&self, domain: &str) -> Result<PublicKey> {
        match self.check_support(domain).await? {
            Support::Primary(authority) => Ok(authority.public_key),
            _ => Err(Error::PublicKeyUnavailable {
                domain: domain.to_string(),
            }),
        }
    }

    /// Whether `domain` resolves, directly or through delegation, to `issuer`
    pub async fn delegates_to(&self, domain: &str, issuer: &str) -> bool {
        match self.check_support(domain).await {
            Ok(Support::Primary(authority)) => authority.authority.eq_ignore_ascii_case(issuer),
            Ok(_) => false,
            Err(e) => {
                debug!(%domain, %issuer, error = %e, "Delegation check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_records_path() {
        let mut path = DelegationPath::new("a.com");
        path.follow("b.com", MAX_DELEGATION_HOPS).unwrap();
        assert_eq!(path.domains(), ["a.com", "b.com"]);
    }

    #[test]
    fn test_follow_detects_cycle() {
        let mut path = DelegationPath::new("cycle.domain");
        path.follow("cycle2.domain", MAX_DELEGATION_HOPS).unwrap();
        let err = path.follow("cycle.domain", MAX_DELEGATION_HOPS).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Circular reference in delegating authority: cycle.domain > cycle2.domain"
        );
    }

    #[test]
    fn test_follow_self_delegation_is_cycle() {
        let mut path = DelegationPath::new("a.com");
        assert!(matches!(
            path.follow("a.com", MAX_DELEGATION_HOPS),
            Err(Error::DelegationCycle { .. })
        ));
    }

    #[test]
    fn test_follow_enforces_ceiling() {
        let mut path = DelegationPath::new("d0");
        for i in 1..=2 {
            path.follow(&format!("d{i}"), 2).unwrap();
        }
        match path.follow("d3", 2) {
            Err(Error::TooManyHops { path }) => assert_eq!(path, ["d0", "d1", "d2"]),
            other => panic!("expected TooManyHops, got {other:?}"),
        }
    }
}
