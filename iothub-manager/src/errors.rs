//! Error types for the IoT Hub manager

use thiserror::Error;

/// Main error type for the IoT Hub manager
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Deployment already exists: {0}")]
    DeploymentAlreadyExists(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManagerError {
    /// Fold any failure of an external call into one of the domain kinds.
    ///
    /// `NotFound`, `DeploymentAlreadyExists` and `ExternalService` pass
    /// through; everything else becomes `ExternalService`.
    pub fn into_external(self) -> Self {
        match self {
            ManagerError::NotFound(_)
            | ManagerError::DeploymentAlreadyExists(_)
            | ManagerError::ExternalService(_) => self,
            other => ManagerError::ExternalService(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ManagerError {
    fn from(err: reqwest::Error) -> Self {
        ManagerError::ExternalService(err.to_string())
    }
}
