//! Error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use openapi_server::ErrorApiModel;
use tracing::error;

use crate::errors::ManagerError;

impl ManagerError {
    /// HTTP status reported for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ManagerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ManagerError::NotFound(_) => StatusCode::NOT_FOUND,
            ManagerError::DeploymentAlreadyExists(_) => StatusCode::CONFLICT,
            ManagerError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ManagerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
        }

        let body = ErrorApiModel {
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
