// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
//! Request/response bodies for the HTTP surface.
//!
//! Required fields are deserialized as `Option` and checked in the
//! handlers, so a missing field reports 400 with an explanatory error body
//! instead of an extractor rejection.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize)]
pub struct SaveSnapshotRequest {
    pub record: Option<Record>,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshotsRequest {
    pub workflow_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRefRequest {
    pub workflow_key: Option<String>,
    pub id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetaRequest {
    pub workflow_key: Option<String>,
    pub id: Option<String>,
    pub fields: Option<Record>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResponse {
    pub locked_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub workflow_key: String,
    pub count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneRequest {
    pub workflow_key: Option<String>,
    pub max_snapshots: Option<usize>,
    pub source: Option<String>,
    #[serde(default)]
    pub protected_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct PruneResponse {
    pub deleted: usize,
}

#[derive(Deserialize)]
pub struct MigrateRequest {
    pub records: Option<Value>,
}

#[derive(Serialize)]
pub struct MigrateResponse {
    pub imported: usize,
}

#[derive(Deserialize)]
pub struct SaveProfileRequest {
    pub profile: Option<Record>,
}

#[derive(Deserialize)]
pub struct ProfileRefRequest {
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub id: Option<String>,
    pub fields: Option<Record>,
}
