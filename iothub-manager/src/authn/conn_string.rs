//! IoT Hub connection strings

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use secrecy::{ExposeSecret, SecretString};

use crate::errors::ManagerError;

const HOST_NAME_KEY: &str = "HostName";
const KEY_NAME_KEY: &str = "SharedAccessKeyName";
const KEY_KEY: &str = "SharedAccessKey";

/// Parsed service connection string
/// (`HostName=...;SharedAccessKeyName=...;SharedAccessKey=...`)
pub struct IotHubConnectionString {
    host_name: String,
    shared_access_key_name: String,
    shared_access_key: SecretString,
}

impl IotHubConnectionString {
    pub fn parse(raw: &str) -> Result<Self, ManagerError> {
        let mut host_name = None;
        let mut key_name = None;
        let mut key = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part.split_once('=').ok_or_else(|| {
                ManagerError::ConfigError("Malformed IoT Hub connection string".to_string())
            })?;
            match name {
                HOST_NAME_KEY => host_name = Some(value.to_string()),
                KEY_NAME_KEY => key_name = Some(value.to_string()),
                KEY_KEY => key = Some(value.to_string()),
                _ => {}
            }
        }

        let host_name = require(HOST_NAME_KEY, host_name)?;
        let shared_access_key_name = require(KEY_NAME_KEY, key_name)?;
        let shared_access_key = require(KEY_KEY, key)?;

        STANDARD.decode(&shared_access_key).map_err(|_| {
            ManagerError::ConfigError("SharedAccessKey is not valid base64".to_string())
        })?;

        Ok(Self {
            host_name,
            shared_access_key_name,
            shared_access_key: SecretString::from(shared_access_key),
        })
    }

    /// Fully qualified hub host, e.g. `myhub.azure-devices.net`
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Hub name, the first label of the host name
    pub fn hub_name(&self) -> &str {
        self.host_name.split('.').next().unwrap_or_default()
    }

    pub fn shared_access_key_name(&self) -> &str {
        &self.shared_access_key_name
    }

    /// Decoded signing key
    pub fn signing_key(&self) -> Result<Vec<u8>, ManagerError> {
        STANDARD
            .decode(self.shared_access_key.expose_secret())
            .map_err(|_| ManagerError::AuthError("SharedAccessKey is not valid base64".to_string()))
    }
}

fn require(name: &str, value: Option<String>) -> Result<String, ManagerError> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        ManagerError::ConfigError(format!("IoT Hub connection string is missing {}", name))
    })
}

impl FromStr for IotHubConnectionString {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for IotHubConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IotHubConnectionString")
            .field("host_name", &self.host_name)
            .field("shared_access_key_name", &self.shared_access_key_name)
            .field("shared_access_key", &"[REDACTED]")
            .finish()
    }
}
