// Copyright 2024-2025 Felipe Torres González
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

//! Main file of the Arena server

use arena::{
    CandidateCache, CandidateStore, PgCandidateStore, WebServerState, app_router,
    candidates::NewCandidate,
    configuration::Settings,
    errors::{CacheError, StoreError},
    telemetry::configure_tracing,
};
use std::{net::SocketAddr, process::exit, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load the settings.
    let settings = Settings::new().expect("Failed to parse configuration files.");

    // Initialize the tracing subsystem.
    configure_tracing(settings.tracing_level.as_str());

    // Connect the DB backend of the candidates.
    let store = match PgCandidateStore::connect_backend(&settings.database).await {
        Ok(store) => store,
        Err(e) => {
            error!("An error occurred while attempting to connect to the DB:\n{e}");
            exit(69)
        }
    };
    store.migrate().await?;

    let cache = Arc::new(CandidateCache::new(store, &settings.cache));
    seed_catalog(cache.as_ref(), &settings.catalog).await;

    let flusher = cache.spawn_periodic_flush();

    // Build an Axum HTTP server.
    let app = app_router(WebServerState::new(cache.clone(), settings.rating.k_factor));

    let http_server_address = SocketAddr::from_str(&format!(
        "{}:{}",
        &settings.application.http_server_host, settings.application.http_server_port
    ))
    .expect("Failed to build a socket using the configuration");

    let tcp_listener = TcpListener::bind(http_server_address)
        .await
        .expect("Failed to bind to the provided address");

    info!("Started Arena server at {http_server_address}");

    axum::serve(tcp_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Votes accepted before the shutdown are still pending.
    flusher.abort();
    match cache.flush().await {
        Ok(written) => debug!("Final write-back of {written} candidates"),
        Err(e) => error!("Final write-back failed, some votes are lost: {e}"),
    }

    info!("Gracefully closed Arena server");

    Ok(())
}

/// Adds the candidates of the configuration that are not stored yet.
async fn seed_catalog<S: CandidateStore>(cache: &CandidateCache<S>, catalog: &[NewCandidate]) {
    for candidate in catalog {
        match cache.create(candidate).await {
            Ok(record) => info!("Candidate {} added to the arena", record.name),
            Err(CacheError::Persistence(StoreError::DuplicatedName(_))) => {
                debug!("Candidate {} already in the arena", candidate.name)
            }
            Err(e) => warn!("Failed to add candidate {}: {e}", candidate.name),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
