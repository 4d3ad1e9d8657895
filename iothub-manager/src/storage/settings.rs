//! Settings file management

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::info;

use crate::authn::conn_string::IotHubConnectionString;
use crate::errors::ManagerError;
use crate::filesys::file::File;
use crate::hub::DEFAULT_API_VERSION;
use crate::logs::LogLevel;
use crate::deploy::MAX_DEPLOYMENTS;

/// Environment variable overriding the hub connection string
pub const CONNECTION_STRING_ENV: &str = "PCS_IOTHUB_CONNSTRING";

/// Default settings file path
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Service settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Directory for daily rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// IoT Hub configuration
    #[serde(default)]
    pub iothub: IotHubSettings,

    /// Deployment management configuration
    #[serde(default)]
    pub deployments: DeploymentSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            iothub: IotHubSettings::default(),
            deployments: DeploymentSettings::default(),
        }
    }
}

impl Settings {
    /// Read the settings file, falling back to defaults when it is absent,
    /// then apply environment overrides
    pub async fn load(file: &File) -> Result<Self, ManagerError> {
        let mut settings = if file.exists().await {
            file.read_json::<Settings>().await.map_err(|e| {
                ManagerError::ConfigError(format!(
                    "Unable to read settings file {}: {}",
                    file.path().display(),
                    e
                ))
            })?
        } else {
            info!(
                "Settings file {} not found, using defaults",
                file.path().display()
            );
            Settings::default()
        };

        settings.apply_overrides(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(CONNECTION_STRING_ENV).filter(|v| !v.trim().is_empty()) {
            self.iothub.connection_string = Some(SecretString::from(value));
        }
    }

    /// Parse the configured connection string
    pub fn connection_string(&self) -> Result<IotHubConnectionString, ManagerError> {
        let raw = self.iothub.connection_string.as_ref().ok_or_else(|| {
            ManagerError::ConfigError(format!(
                "IoT Hub connection string is not configured (set iothub.connection_string or {})",
                CONNECTION_STRING_ENV
            ))
        })?;
        IotHubConnectionString::parse(raw.expose_secret())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9042
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// IoT Hub settings
#[derive(Debug, Deserialize)]
pub struct IotHubSettings {
    /// Service connection string, never logged
    #[serde(default)]
    pub connection_string: Option<SecretString>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Lifetime of signed access tokens
    #[serde(default = "default_sas_token_ttl")]
    pub sas_token_ttl_secs: u64,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_sas_token_ttl() -> u64 {
    3600
}

impl Default for IotHubSettings {
    fn default() -> Self {
        Self {
            connection_string: None,
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout(),
            sas_token_ttl_secs: default_sas_token_ttl(),
        }
    }
}

/// Deployment management settings
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentSettings {
    /// Cap on configurations fetched per listing
    #[serde(default = "default_max_deployments")]
    pub max_deployments: usize,
}

fn default_max_deployments() -> usize {
    MAX_DEPLOYMENTS
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            max_deployments: default_max_deployments(),
        }
    }
}
