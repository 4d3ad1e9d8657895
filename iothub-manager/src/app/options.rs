//! Application configuration options

use std::sync::Arc;
use std::time::Duration;

use crate::authn::conn_string::IotHubConnectionString;
use crate::authn::token_mngr::TokenOptions;
use crate::deploy::DeploymentOptions;
use crate::errors::ManagerError;
use crate::hub::HubClientOptions;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Registry and deployment services
    pub services: ServicesConfig,
}

impl AppOptions {
    /// Resolve settings into options; fails when the connection string is
    /// missing or malformed
    pub fn from_settings(settings: &Settings) -> Result<Self, ManagerError> {
        Ok(Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            services: ServicesConfig {
                connection: Arc::new(settings.connection_string()?),
                hub: HubClientOptions {
                    api_version: settings.iothub.api_version.clone(),
                    request_timeout: Duration::from_secs(settings.iothub.request_timeout_secs),
                },
                token: TokenOptions {
                    ttl: chrono::Duration::seconds(settings.iothub.sas_token_ttl_secs as i64),
                    ..Default::default()
                },
                deployments: DeploymentOptions {
                    max_deployments: settings.deployments.max_deployments,
                    ..Default::default()
                },
            },
        })
    }
}

/// Lifecycle options for the service
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9042,
        }
    }
}

/// Configuration of the services behind the API
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub connection: Arc<IotHubConnectionString>,
    pub hub: HubClientOptions,
    pub token: TokenOptions,
    pub deployments: DeploymentOptions,
}
