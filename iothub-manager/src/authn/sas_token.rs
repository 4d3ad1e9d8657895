//! Shared access signature tokens

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::authn::conn_string::IotHubConnectionString;
use crate::errors::ManagerError;

type HmacSha256 = Hmac<Sha256>;

fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// A signed `SharedAccessSignature` token for the hub
#[derive(Debug, Clone)]
pub struct SasToken {
    raw: String,
    expires_at: DateTime<Utc>,
}

impl SasToken {
    /// Sign a token valid until `expires_at`
    pub fn sign(
        connection: &IotHubConnectionString,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, ManagerError> {
        let resource = url_encode(connection.host_name());
        let expiry = expires_at.timestamp();
        let string_to_sign = format!("{}\n{}", resource, expiry);

        let mut mac = HmacSha256::new_from_slice(&connection.signing_key()?)
            .map_err(|e| ManagerError::AuthError(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let raw = format!(
            "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
            resource,
            url_encode(&signature),
            expiry,
            url_encode(connection.shared_access_key_name())
        );

        Ok(Self { raw, expires_at })
    }

    /// Sign a token valid for `ttl` from now
    pub fn generate(
        connection: &IotHubConnectionString,
        ttl: Duration,
    ) -> Result<Self, ManagerError> {
        Self::sign(connection, Utc::now() + ttl)
    }

    /// Value for the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Check if the token expires within the given duration
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at <= Utc::now() + margin
    }
}
