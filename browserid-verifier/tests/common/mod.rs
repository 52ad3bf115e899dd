//! Common test utilities for verifier integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum_test::TestServer;
use browserid_core::primary::{
    NoNetwork, PrimaryResolver, ResolverConfig, SupportCache, WellKnownFetcher,
};
use browserid_core::{
    Algorithm, Assertion, Certificate, CertificateBundle, KeyPair, Principal, Verifier,
};
use browserid_verifier::{routes, AppState, HttpsFetcher};
use chrono::Duration;

/// Issuer name of the verifier's own certificate authority
pub const HOSTNAME: &str = "login.example.org";

pub const AUDIENCE: &str = "https://rp.example.com";

/// Create a test server backed by `fetcher`
pub fn create_server_with<F>(root: &KeyPair, fetcher: F, primaries: bool) -> TestServer
where
    F: WellKnownFetcher + 'static,
{
    let config = ResolverConfig {
        enabled: primaries,
        ..ResolverConfig::default()
    };
    let resolver = PrimaryResolver::new(fetcher, SupportCache::default(), config);
    let verifier = Verifier::new(HOSTNAME, root.public_key(), Arc::new(resolver));
    let app = routes::create_router(Arc::new(AppState::new(verifier)));

    TestServer::new(app).expect("Failed to create test server")
}

/// Create a test server with no outbound network access
pub fn create_test_server() -> (TestServer, KeyPair) {
    let root = KeyPair::generate(Algorithm::Ds).unwrap();
    let server = create_server_with(&root, NoNetwork, true);
    (server, root)
}

/// Plain http fetcher for talking to mock servers
pub fn http_fetcher() -> HttpsFetcher {
    HttpsFetcher::new(StdDuration::from_secs(5))
        .unwrap()
        .allow_http()
}

/// Build an encoded bundle whose certificate `signer` issued as `issuer`
pub fn bundle(issuer: &str, principal: Principal, signer: &KeyPair, audience: &str) -> String {
    bundle_with_validity(
        issuer,
        principal,
        signer,
        audience,
        Duration::minutes(5),
        Duration::minutes(2),
    )
}

pub fn bundle_with_validity(
    issuer: &str,
    principal: Principal,
    signer: &KeyPair,
    audience: &str,
    cert_validity: Duration,
    assertion_validity: Duration,
) -> String {
    let user = KeyPair::generate(Algorithm::Ed25519).unwrap();
    let cert = Certificate::create(
        issuer,
        principal,
        &user.public_key(),
        cert_validity,
        signer.secret_key(),
    )
    .unwrap();
    let assertion = Assertion::create(audience, assertion_validity, user.secret_key()).unwrap();
    CertificateBundle::new(cert, assertion).encode()
}

/// A bundle certified by the verifier's own root key
pub fn secondary_bundle(root: &KeyPair, email: &str, audience: &str) -> String {
    bundle(HOSTNAME, Principal::email(email), root, audience)
}
