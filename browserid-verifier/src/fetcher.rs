//! HTTPS retrieval of support documents

use std::time::Duration;

use async_trait::async_trait;
use browserid_core::primary::{FetchedDocument, WellKnownFetcher, WELL_KNOWN_PATH};
use browserid_core::{Error as CoreError, Result as CoreResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};
use tracing::debug;

/// Fetches `/.well-known/browserid` from a domain over HTTPS
#[derive(Debug, Clone)]
pub struct HttpsFetcher {
    client: Client,
    scheme: &'static str,
}

impl HttpsFetcher {
    /// Create a fetcher with the given request timeout. Redirects are not
    /// followed.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            scheme: "https",
        })
    }

    /// Fetch over plain http instead (for local development and tests)
    pub fn allow_http(mut self) -> Self {
        self.scheme = "http";
        self
    }

    fn unavailable(domain: &str, reason: impl Into<String>) -> CoreError {
        CoreError::PrimaryUnavailable {
            domain: domain.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl WellKnownFetcher for HttpsFetcher {
    async fn fetch(&self, domain: &str) -> CoreResult<FetchedDocument> {
        let base_url = format!("{}://{}", self.scheme, domain);
        let url = format!("{base_url}{WELL_KNOWN_PATH}");
        debug!(%url, "Fetching support document");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::unavailable(domain, format!("could not connect: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::unavailable(
                domain,
                format!("support document returned status {}", status.as_u16()),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("application/json") {
            return Err(Self::unavailable(
                domain,
                format!("support document has content type '{content_type}', not application/json"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::unavailable(domain, format!("could not read body: {e}")))?;

        Ok(FetchedDocument { body, base_url })
    }
}
