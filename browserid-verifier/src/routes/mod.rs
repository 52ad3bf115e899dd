//! HTTP routes for the verifier

mod verify;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::routing::{get, MethodRouter};
use axum::Router;
use browserid_core::primary::WellKnownFetcher;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use verify::VerifyParams;

/// Create the router with all routes
pub fn create_router<F>(state: Arc<AppState<F>>) -> Router
where
    F: WellKnownFetcher + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/verify", verify_routes::<F>())
        .route("/", verify_routes::<F>())
        .route("/ping.txt", get(ping))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn verify_routes<F>() -> MethodRouter<Arc<AppState<F>>>
where
    F: WellKnownFetcher + 'static,
{
    get(verify::verify_get::<F>)
        .post(verify::verify_post::<F>)
        .options(preflight)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// GET /ping.txt
async fn ping() -> &'static str {
    "k."
}
