//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::ServicesConfig;
use crate::authn::token_mngr::TokenManager;
use crate::deploy::Deployments;
use crate::errors::ManagerError;
use crate::hub::HttpClient;

/// Main application state
pub struct AppState {
    /// Token manager for hub authentication
    pub token_mngr: Arc<TokenManager>,

    /// HTTP client for the hub registry
    pub http_client: Arc<HttpClient>,

    /// Deployment manager
    pub deployments: Arc<Deployments>,
}

impl AppState {
    /// Initialize application state
    pub fn init(services: &ServicesConfig) -> Result<Self, ManagerError> {
        info!(
            "Initializing application state for hub {}...",
            services.connection.hub_name()
        );

        let token_mngr = Arc::new(TokenManager::new(
            services.connection.clone(),
            services.token.clone(),
        ));

        let http_client = Arc::new(HttpClient::new(
            services.connection.host_name(),
            token_mngr.clone(),
            services.hub.clone(),
        )?);

        let deployments = Arc::new(Deployments::with_options(
            http_client.clone(),
            http_client.clone(),
            services.deployments.clone(),
        ));

        Ok(Self {
            token_mngr,
            http_client,
            deployments,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), ManagerError> {
        info!("Shutting down application state...");
        Ok(())
    }
}
