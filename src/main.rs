/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! SSO API server entry point.
//!
//! A standalone Axum service that runs the OIDC login handshake against
//! configured identity providers and issues sessions. The default binary
//! wires in-memory stores; production deployments supply their own store
//! implementations through the library.

use std::sync::Arc;

use sso_api::config::Config;
use sso_api::cookies::CookieScope;
use sso_api::handshake::Handshake;
use sso_api::oidc::JwksCache;
use sso_api::registry::ProviderRegistry;
use sso_api::routes;
use sso_api::state::AppState;
use sso_api::store::{MemorySessions, MemoryStore, NoopCipher};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("failed to load configuration");

    let http = config.http_client();
    let jwks = Arc::new(JwksCache::new(http.clone()));
    let store = MemoryStore::new();
    let registry = Arc::new(ProviderRegistry::new(
        config.providers.clone(),
        store.clone(),
        Arc::new(NoopCipher),
        http,
        jwks,
    ));
    let handshake = Arc::new(Handshake::new(
        registry.clone(),
        store.clone(),
        store,
        MemorySessions::new(),
    ));

    let state = AppState {
        registry,
        handshake,
        login_url: config.login_url.clone(),
        after_login_url: config.after_login_url.clone(),
        cookie_scope: CookieScope {
            domain: config.cookie_domain.clone(),
            secure: config.cookie_secure,
        },
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router().layer(cors).with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listener");

    tracing::info!("SSO API listening on {}", config.listen_addr);

    axum::serve(listener, app).await.expect("server error");
}
