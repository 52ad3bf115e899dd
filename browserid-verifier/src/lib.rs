//! BrowserID-NG Verifier
//!
//! HTTP service that relying parties call to check an identity assertion
//! against an audience. Verification itself lives in `browserid-core`;
//! this crate adds configuration, the HTTPS support document fetcher and
//! the `/verify` endpoint.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod routes;
pub mod state;

pub use config::{load_root_public_key, Config, ConfigError};
pub use error::ServiceError;
pub use fetcher::HttpsFetcher;
pub use state::AppState;
