//! Retrieval of support documents
//!
//! The resolver never touches the network itself. It is handed a
//! [`WellKnownFetcher`]; the verifier service supplies an HTTPS one, and
//! local setups wrap it in [`ShimmedFetcher`] to serve fixed documents.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::{Error, Result};

/// A fetched support document body and the origin its relative URLs are
/// resolved against
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub body: String,
    pub base_url: String,
}

/// Trait for fetching support documents
///
/// Any error means the domain is treated as not being a primary.
#[async_trait]
pub trait WellKnownFetcher: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<FetchedDocument>;
}

#[async_trait]
impl<F: WellKnownFetcher + ?Sized> WellKnownFetcher for std::sync::Arc<F> {
    async fn fetch(&self, domain: &str) -> Result<FetchedDocument> {
        (**self).fetch(domain).await
    }
}

/// Fetcher for setups with no outbound network access
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNetwork;

#[async_trait]
impl WellKnownFetcher for NoNetwork {
    async fn fetch(&self, domain: &str) -> Result<FetchedDocument> {
        Err(Error::PrimaryUnavailable {
            domain: domain.to_string(),
            reason: "network access disabled".into(),
        })
    }
}

/// A local stand-in for one domain: `domain|origin|path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shim {
    pub domain: String,
    pub origin: String,
    pub path: PathBuf,
}

impl Shim {
    /// Parse a comma separated list of `domain|origin|path` triples
    pub fn parse_list(list: &str) -> Result<Vec<Shim>> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let parts: Vec<&str> = entry.split('|').collect();
                match parts[..] {
                    [domain, origin, path] if !domain.is_empty() && !path.is_empty() => Ok(Shim {
                        domain: domain.to_ascii_lowercase(),
                        origin: origin.trim_end_matches('/').to_string(),
                        path: PathBuf::from(path),
                    }),
                    _ => Err(Error::InvalidDomain(format!(
                        "bad shim '{entry}', expected domain|origin|path"
                    ))),
                }
            })
            .collect()
    }
}

/// Serves shimmed domains from local files and passes the rest through
#[derive(Debug)]
pub struct ShimmedFetcher<F> {
    documents: HashMap<String, FetchedDocument>,
    inner: F,
}

impl<F: WellKnownFetcher> ShimmedFetcher<F> {
    /// Read every shim's document up front. A missing file is an error.
    pub fn load(shims: &[Shim], inner: F) -> Result<Self> {
        let mut documents = HashMap::new();
        for shim in shims {
            let body = std::fs::read_to_string(&shim.path)?;
            info!(
                domain = %shim.domain,
                origin = %shim.origin,
                "Shimmed primary support document"
            );
            documents.insert(
                shim.domain.clone(),
                FetchedDocument {
                    body,
                    base_url: shim.origin.clone(),
                },
            );
        }
        Ok(Self { documents, inner })
    }

    pub fn is_shimmed(&self, domain: &str) -> bool {
        self.documents.contains_key(domain)
    }
}

#[async_trait]
impl<F: WellKnownFetcher> WellKnownFetcher for ShimmedFetcher<F> {
    async fn fetch(&self, domain: &str) -> Result<FetchedDocument> {
        match self.documents.get(domain) {
            Some(doc) => Ok(doc.clone()),
            None => self.inner.fetch(domain).await,
        }
    }
}
