//! Token manager for hub authentication

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::authn::conn_string::IotHubConnectionString;
use crate::authn::sas_token::SasToken;
use crate::errors::ManagerError;

/// Token manager trait for testability
#[async_trait]
pub trait TokenManagerExt: Send + Sync {
    /// Get a token that is not about to expire
    async fn get_token(&self) -> Result<SasToken, ManagerError>;

    /// Mint a new token unconditionally
    async fn refresh_token(&self) -> Result<SasToken, ManagerError>;
}

/// Token manager options
#[derive(Debug, Clone)]
pub struct TokenOptions {
    /// Lifetime of minted tokens
    pub ttl: Duration,

    /// Tokens closer than this to expiry are replaced
    pub refresh_margin: Duration,
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(1),
            refresh_margin: Duration::minutes(5),
        }
    }
}

/// Caches the current SAS token and re-signs it before it expires
pub struct TokenManager {
    connection: Arc<IotHubConnectionString>,
    options: TokenOptions,
    cached_token: RwLock<Option<SasToken>>,
}

impl TokenManager {
    pub fn new(connection: Arc<IotHubConnectionString>, options: TokenOptions) -> Self {
        Self {
            connection,
            options,
            cached_token: RwLock::new(None),
        }
    }

    pub fn connection(&self) -> &IotHubConnectionString {
        &self.connection
    }
}

#[async_trait]
impl TokenManagerExt for TokenManager {
    async fn get_token(&self) -> Result<SasToken, ManagerError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.expires_within(self.options.refresh_margin) {
                    return Ok(token.clone());
                }
            }
        }

        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Result<SasToken, ManagerError> {
        let token = SasToken::generate(&self.connection, self.options.ttl)?;
        debug!("Signed new hub token, expires at: {}", token.expires_at());

        let mut cached = self.cached_token.write().await;
        *cached = Some(token.clone());
        Ok(token)
    }
}
