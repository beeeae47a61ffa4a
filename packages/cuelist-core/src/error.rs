//! Centralized error types for the Cuelist core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::device::transport::TransportError;
use crate::project::source::SourceError;

/// Application-wide error type for the Cuelist control plane.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum ControlError {
    /// A playback operation was requested without a loaded project.
    #[error("No project loaded")]
    NoProjectLoaded,

    /// Requested item ID does not exist in the loaded project.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Requested project ID does not exist, or does not match the current one.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// A different project is already loaded; unload it first.
    #[error("Project already loaded: {0}")]
    ProjectAlreadyLoaded(String),

    /// Item references a device that is not configured.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Command dispatch attempted while the device session is not connected.
    #[error("Device not connected: {0}")]
    DeviceNotConnected(String),

    /// Establishing or tearing down a device connection failed.
    #[error("Device connection failed: {0}")]
    DeviceConnection(String),

    /// The device rejected a command or the exchange failed mid-flight.
    #[error("Device command failed: {0}")]
    DeviceCommand(String),

    /// A template-only operation was invoked on a non-template item.
    #[error("Item is not a template: {0}")]
    NotATemplate(String),

    /// The project source failed to produce records.
    #[error("Project store error: {0}")]
    Store(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Server configuration error (missing required settings).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoProjectLoaded => "no_project_loaded",
            Self::ItemNotFound(_) => "item_not_found",
            Self::ProjectNotFound(_) => "project_not_found",
            Self::ProjectAlreadyLoaded(_) => "project_already_loaded",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::DeviceNotConnected(_) => "device_not_connected",
            Self::DeviceConnection(_) => "device_connection_failed",
            Self::DeviceCommand(_) => "device_command_failed",
            Self::NotATemplate(_) => "not_a_template",
            Self::Store(_) => "store_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ItemNotFound(_) | Self::ProjectNotFound(_) | Self::DeviceNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::NoProjectLoaded
            | Self::ProjectAlreadyLoaded(_)
            | Self::NotATemplate(_)
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::DeviceNotConnected(_) => StatusCode::CONFLICT,
            Self::DeviceConnection(_) | Self::DeviceCommand(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TransportError> for ControlError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected => Self::DeviceNotConnected(err.to_string()),
            TransportError::Connect(_) => Self::DeviceConnection(err.to_string()),
            TransportError::Io(_) | TransportError::Timeout => {
                Self::DeviceCommand(err.to_string())
            }
        }
    }
}

impl From<SourceError> for ControlError {
    fn from(err: SourceError) -> Self {
        Self::Store(err.to_string())
    }
}
