// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
use snapvault::config::NodeConfig;
use snapvault::server::{build_router, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    snapvault::telemetry::init_telemetry();

    let cfg = NodeConfig::from_env();
    tracing::info!("Initializing Snapvault node with config: {:?}", cfg);

    let state = AppState::new(&cfg.data_dir);
    let app = build_router(state, cfg.auth_token.clone());

    tracing::info!("Listening on {}", cfg.bind_addr);
    let listener = TcpListener::bind(cfg.bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
