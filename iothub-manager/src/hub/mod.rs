//! IoT Hub registry access
//!
//! The deployment manager only sees the two traits below; `HttpClient`
//! implements both against the hub's service REST API.

pub mod client;
pub mod configurations;
pub mod twins;

use async_trait::async_trait;
use openapi_client::{Configuration, Twin};

use crate::errors::ManagerError;

pub use client::{HttpClient, HubClientOptions, DEFAULT_API_VERSION};

/// Configuration documents stored in the hub
#[async_trait]
pub trait ConfigurationRegistry: Send + Sync {
    /// Store a new configuration and return the document as the hub saved it
    async fn add_configuration(
        &self,
        configuration: Configuration,
    ) -> Result<Configuration, ManagerError>;

    /// Fetch at most `max_count` configurations
    async fn get_configurations(&self, max_count: usize)
        -> Result<Vec<Configuration>, ManagerError>;

    /// Fetch one configuration, `None` if the hub does not know the id
    async fn get_configuration(&self, id: &str) -> Result<Option<Configuration>, ManagerError>;

    async fn remove_configuration(&self, id: &str) -> Result<(), ManagerError>;
}

/// Device and module twin queries
#[async_trait]
pub trait DeviceTwinQuery: Send + Sync {
    /// Run a twin query, following continuations until every page is read
    async fn query_twins(&self, query: &str) -> Result<Vec<Twin>, ManagerError>;
}
