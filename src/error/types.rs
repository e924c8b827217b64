use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::adapters::traits::AdapterError;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    ValidationError(String),
    ConfigError(String),
    Adapter(AdapterError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Adapter(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Adapter(AdapterError::BlockResolution(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Adapter(AdapterError::UnsupportedChain(_)) => StatusCode::NOT_FOUND,
            AppError::Adapter(AdapterError::Contract { .. })
            | AppError::Adapter(AdapterError::Rpc(_))
            | AppError::Adapter(AdapterError::InvalidData(_)) => StatusCode::BAD_GATEWAY,
            AppError::Adapter(AdapterError::Config(_)) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<AdapterError> for AppError {
    fn from(err: AdapterError) -> Self {
        AppError::Adapter(err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}
