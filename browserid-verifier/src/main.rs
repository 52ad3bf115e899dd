//! BrowserID-NG Verifier
//!
//! Answers relying parties asking whether an identity assertion is valid
//! for their audience.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use browserid_core::primary::{PrimaryResolver, ShimmedFetcher, SupportCache};
use browserid_core::Verifier;
use browserid_verifier::{load_root_public_key, routes, AppState, Config, HttpsFetcher};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "browserid_verifier=debug,browserid_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "Loaded configuration");

    let root_key = load_root_public_key(&config.root_key_file)?;
    tracing::info!(
        algorithm = %root_key.algorithm(),
        fingerprint = %root_key.fingerprint(),
        "Loaded root public key"
    );

    let mut fetcher = HttpsFetcher::new(config.well_known_timeout)
        .context("failed to create HTTP client")?;
    if config.well_known_allow_http {
        tracing::warn!("Fetching support documents over plain http");
        fetcher = fetcher.allow_http();
    }
    // An empty shim list passes every domain through
    let fetcher = ShimmedFetcher::load(&config.shimmed_primaries, fetcher)
        .context("failed to load shimmed primaries")?;

    if config.disable_primary_support {
        tracing::info!(hostname = %config.hostname, "Primary support disabled");
    }
    let resolver = PrimaryResolver::new(
        fetcher,
        SupportCache::new(&config.cache),
        config.resolver_config(),
    );

    let verifier = Verifier::new(config.hostname.clone(), root_key, Arc::new(resolver));
    let state = Arc::new(AppState::new(verifier));
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Verifier listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
