// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
use axum::extract::Request as AxumRequest;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::api::*;
use crate::errors::StoreError;
use crate::profile_store::ProfileStore;
use crate::record::Record;
use crate::snapshot_store::{SnapshotStore, SourceFilter};

/// Shared handles to the two stores. Each store sits behind its own mutex,
/// so all operations on a store are serialized; this is the exclusive-access
/// discipline that keeps cache and disk consistent under concurrent
/// requests.
#[derive(Clone)]
pub struct AppState {
    pub snapshots: Arc<Mutex<SnapshotStore>>,
    pub profiles: Arc<Mutex<ProfileStore>>,
}

impl AppState {
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(SnapshotStore::new(data_dir))),
            profiles: Arc::new(Mutex::new(ProfileStore::new(data_dir))),
        }
    }
}

async fn auth_guard(
    State(token): State<Arc<Option<String>>>,
    req: AxumRequest,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(expected) = &*token {
        let provided = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.strip_prefix("Bearer "));
        if provided == Some(expected.as_str()) {
            return Ok(next.run(req).await);
        }
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

pub fn build_router(state: AppState, auth_token: Option<String>) -> Router {
    let mut app = Router::new()
        .route("/snapshot-manager/save", post(save_snapshot))
        .route("/snapshot-manager/list", post(list_snapshots))
        .route("/snapshot-manager/get", post(get_snapshot))
        .route("/snapshot-manager/update-meta", post(update_snapshot_meta))
        .route("/snapshot-manager/delete", post(delete_snapshot))
        .route("/snapshot-manager/delete-all", post(delete_all_snapshots))
        .route("/snapshot-manager/workflows", get(list_workflows))
        .route("/snapshot-manager/prune", post(prune_snapshots))
        .route("/snapshot-manager/migrate", post(migrate_snapshots))
        .route("/snapshot-manager/profile/save", post(save_profile))
        .route("/snapshot-manager/profile/list", get(list_profiles))
        .route("/snapshot-manager/profile/get", post(get_profile))
        .route("/snapshot-manager/profile/update", post(update_profile))
        .route("/snapshot-manager/profile/delete", post(delete_profile))
        // Observability
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        // Editor frontends are browser clients
        .layer(CorsLayer::permissive());

    if let Some(token) = auth_token {
        tracing::info!("Auth Enabled: Bearer token required");
        let auth_state = Arc::new(Some(token));
        app = app.layer(from_fn_with_state(auth_state, auth_guard));
    } else {
        tracing::warn!("Auth Disabled: No token configured");
    }

    app
}

async fn save_snapshot(
    State(state): State<AppState>,
    Json(req): Json<SaveSnapshotRequest>,
) -> Result<Json<OkResponse>, StoreError> {
    let record = req.record.ok_or(StoreError::MissingField("record"))?;
    let mut store = state.snapshots.lock().await;
    store.put(&record)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn list_snapshots(
    State(state): State<AppState>,
    Json(req): Json<ListSnapshotsRequest>,
) -> Result<Json<Vec<Record>>, StoreError> {
    let key = req
        .workflow_key
        .ok_or(StoreError::MissingField("workflowKey"))?;
    let mut store = state.snapshots.lock().await;
    Ok(Json(store.list_metadata(&key)))
}

async fn get_snapshot(
    State(state): State<AppState>,
    Json(req): Json<SnapshotRefRequest>,
) -> Result<Json<Record>, StoreError> {
    let key = req
        .workflow_key
        .ok_or(StoreError::MissingField("workflowKey"))?;
    let id = req.id.ok_or(StoreError::MissingField("id"))?;
    let store = state.snapshots.lock().await;
    let record = store.get_full(&key, &id)?.ok_or(StoreError::NotFound)?;
    Ok(Json(record))
}

async fn update_snapshot_meta(
    State(state): State<AppState>,
    Json(req): Json<UpdateMetaRequest>,
) -> Result<Json<OkResponse>, StoreError> {
    let key = req
        .workflow_key
        .ok_or(StoreError::MissingField("workflowKey"))?;
    let id = req.id.ok_or(StoreError::MissingField("id"))?;
    let fields = req.fields.ok_or(StoreError::MissingField("fields"))?;
    let mut store = state.snapshots.lock().await;
    store.update_meta(&key, &id, &fields)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn delete_snapshot(
    State(state): State<AppState>,
    Json(req): Json<SnapshotRefRequest>,
) -> Result<Json<OkResponse>, StoreError> {
    let key = req
        .workflow_key
        .ok_or(StoreError::MissingField("workflowKey"))?;
    let id = req.id.ok_or(StoreError::MissingField("id"))?;
    let mut store = state.snapshots.lock().await;
    store.delete(&key, &id)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn delete_all_snapshots(
    State(state): State<AppState>,
    Json(req): Json<ListSnapshotsRequest>,
) -> Result<Json<DeleteAllResponse>, StoreError> {
    let key = req
        .workflow_key
        .ok_or(StoreError::MissingField("workflowKey"))?;
    let mut store = state.snapshots.lock().await;
    let locked_count = store.delete_all(&key)?;
    Ok(Json(DeleteAllResponse { locked_count }))
}

async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<Vec<WorkflowSummary>>, StoreError> {
    let mut store = state.snapshots.lock().await;
    let summaries = store
        .list_workflows()
        .into_iter()
        .map(|(workflow_key, count)| WorkflowSummary {
            workflow_key,
            count,
        })
        .collect();
    Ok(Json(summaries))
}

async fn prune_snapshots(
    State(state): State<AppState>,
    Json(req): Json<PruneRequest>,
) -> Result<Json<PruneResponse>, StoreError> {
    let key = req
        .workflow_key
        .ok_or(StoreError::MissingField("workflowKey"))?;
    let max_snapshots = req
        .max_snapshots
        .ok_or(StoreError::MissingField("maxSnapshots"))?;
    let source = SourceFilter::from_request(req.source.as_deref());
    let protected: HashSet<String> = req.protected_ids.into_iter().collect();
    let mut store = state.snapshots.lock().await;
    let deleted = store.prune(&key, max_snapshots, source, &protected)?;
    Ok(Json(PruneResponse { deleted }))
}

async fn migrate_snapshots(
    State(state): State<AppState>,
    Json(req): Json<MigrateRequest>,
) -> Result<Json<MigrateResponse>, StoreError> {
    let records = req
        .records
        .and_then(|v| match v {
            serde_json::Value::Array(list) => Some(list),
            _ => None,
        })
        .ok_or(StoreError::MissingField("records"))?;

    let mut store = state.snapshots.lock().await;
    let mut imported = 0usize;
    for value in records {
        let serde_json::Value::Object(record) = value else {
            continue;
        };
        if record.contains_key("id") && record.contains_key("workflowKey") {
            store.put(&record)?;
            imported += 1;
        }
    }
    Ok(Json(MigrateResponse { imported }))
}

async fn save_profile(
    State(state): State<AppState>,
    Json(req): Json<SaveProfileRequest>,
) -> Result<Json<OkResponse>, StoreError> {
    let profile = req.profile.ok_or(StoreError::MissingField("profile"))?;
    let mut store = state.profiles.lock().await;
    store.put(&profile)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<Record>>, StoreError> {
    let mut store = state.profiles.lock().await;
    Ok(Json(store.list_all()))
}

async fn get_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileRefRequest>,
) -> Result<Json<Record>, StoreError> {
    let id = req.id.ok_or(StoreError::MissingField("id"))?;
    let store = state.profiles.lock().await;
    let profile = store.get(&id)?.ok_or(StoreError::NotFound)?;
    Ok(Json(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<OkResponse>, StoreError> {
    let id = req.id.ok_or(StoreError::MissingField("id"))?;
    let fields = req.fields.ok_or(StoreError::MissingField("fields"))?;
    let mut store = state.profiles.lock().await;
    store.update(&id, &fields)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn delete_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileRefRequest>,
) -> Result<Json<OkResponse>, StoreError> {
    let id = req.id.ok_or(StoreError::MissingField("id"))?;
    let mut store = state.profiles.lock().await;
    store.delete(&id)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
