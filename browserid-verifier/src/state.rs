//! Shared application state

use browserid_core::primary::WellKnownFetcher;
use browserid_core::Verifier;

/// State shared by all request handlers
pub struct AppState<F> {
    pub verifier: Verifier<F>,
}

impl<F: WellKnownFetcher> AppState<F> {
    pub fn new(verifier: Verifier<F>) -> Self {
        Self { verifier }
    }
}
