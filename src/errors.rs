// Copyright (c) 2025 Snapvault Contributors. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid snapshot id: {0:?}")]
    InvalidIdentifier(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Resource not found")]
    NotFound,
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::InvalidIdentifier(_) | StoreError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
