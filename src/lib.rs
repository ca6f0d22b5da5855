// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod api;
pub mod record;
pub mod paths;
pub mod fsio;
pub mod snapshot_store;
pub mod profile_store;
pub mod server;
pub mod telemetry;
