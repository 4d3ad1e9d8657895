//! Deployment manager
//!
//! Orchestrates create, list, get and delete against the configuration
//! registry. The registry is the only store: every call goes through to it
//! and nothing is cached between requests.

use std::sync::Arc;

use futures::future::try_join_all;
use openapi_client::Configuration;
use tracing::{error, info, warn};

use crate::deploy::codec::ConfigurationCodec;
use crate::deploy::metrics::MetricsAggregator;
use crate::deploy::ownership::OwnershipTag;
use crate::deploy::validator::validate;
use crate::errors::ManagerError;
use crate::hub::{ConfigurationRegistry, DeviceTwinQuery};
use crate::models::deployment::{DeploymentListModel, DeploymentModel, DeploymentRequest};
use crate::utils::generate_uuid;

/// Maximum number of configuration documents fetched by a listing
pub const MAX_DEPLOYMENTS: usize = 20;

/// Deployment manager options
#[derive(Debug, Clone)]
pub struct DeploymentOptions {
    /// Cap on documents fetched from the registry per listing
    pub max_deployments: usize,

    /// Label convention marking documents owned by this service
    pub ownership: OwnershipTag,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self {
            max_deployments: MAX_DEPLOYMENTS,
            ownership: OwnershipTag::default(),
        }
    }
}

/// Deployment manager
pub struct Deployments {
    registry: Arc<dyn ConfigurationRegistry>,
    metrics: MetricsAggregator,
    codec: ConfigurationCodec,
    options: DeploymentOptions,
}

impl Deployments {
    /// Create a manager with default options
    pub fn new(
        registry: Arc<dyn ConfigurationRegistry>,
        twins: Arc<dyn DeviceTwinQuery>,
    ) -> Self {
        Self::with_options(registry, twins, DeploymentOptions::default())
    }

    pub fn with_options(
        registry: Arc<dyn ConfigurationRegistry>,
        twins: Arc<dyn DeviceTwinQuery>,
        options: DeploymentOptions,
    ) -> Self {
        Self {
            registry,
            metrics: MetricsAggregator::new(twins),
            codec: ConfigurationCodec::new(options.ownership.clone()),
            options,
        }
    }

    pub fn options(&self) -> &DeploymentOptions {
        &self.options
    }

    /// Validate, encode and submit a deployment.
    ///
    /// The returned id is the one in the registry's response.
    pub async fn create(&self, request: DeploymentRequest) -> Result<DeploymentModel, ManagerError> {
        if let Err(e) = validate(&request) {
            warn!("Rejected deployment '{}': {}", request.name, e);
            return Err(e);
        }

        let configuration = self.codec.encode(&request, &generate_uuid())?;
        let created = self
            .registry
            .add_configuration(configuration)
            .await
            .map_err(|e| {
                error!("Failed to create deployment '{}': {}", request.name, e);
                e.into_external()
            })?;

        if created.id.trim().is_empty() {
            return Err(ManagerError::ExternalService(
                "registry returned a configuration without an id".to_string(),
            ));
        }

        let model = self.codec.merge_created(request, &created);
        info!("Created deployment '{}' with id {}", model.name, model.id);
        Ok(model)
    }

    /// List owned deployments sorted by name
    pub async fn list(&self, include_device_status: bool) -> Result<DeploymentListModel, ManagerError> {
        let configurations = self
            .registry
            .get_configurations(self.options.max_deployments)
            .await
            .map_err(|e| {
                error!("Failed to list configurations: {}", e);
                e.into_external()
            })?;

        let owned = configurations
            .iter()
            .filter(|configuration| self.options.ownership.is_owned(configuration));

        let mut items: Vec<DeploymentModel> = if include_device_status {
            try_join_all(owned.map(|configuration| self.decode_with_metrics(configuration))).await?
        } else {
            owned.map(|configuration| self.codec.decode(configuration)).collect()
        };
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(DeploymentListModel::new(items))
    }

    /// Get an owned deployment; foreign and missing ids are both `NotFound`
    pub async fn get(
        &self,
        id: &str,
        include_device_status: bool,
    ) -> Result<DeploymentModel, ManagerError> {
        let configuration = self.fetch_owned(id).await?;
        if include_device_status {
            return self.decode_with_metrics(&configuration).await;
        }
        Ok(self.codec.decode(&configuration))
    }

    /// Remove an owned deployment
    pub async fn delete(&self, id: &str) -> Result<(), ManagerError> {
        let configuration = self.fetch_owned(id).await?;
        self.registry
            .remove_configuration(&configuration.id)
            .await
            .map_err(|e| {
                error!("Failed to delete deployment {}: {}", id, e);
                e.into_external()
            })?;

        info!("Deleted deployment {}", id);
        Ok(())
    }

    async fn fetch_owned(&self, id: &str) -> Result<Configuration, ManagerError> {
        if id.trim().is_empty() {
            return Err(ManagerError::NotFound("deployment id is empty".to_string()));
        }

        let configuration = self
            .registry
            .get_configuration(id)
            .await
            .map_err(ManagerError::into_external)?;

        match configuration {
            Some(configuration) if self.options.ownership.is_owned(&configuration) => {
                Ok(configuration)
            }
            _ => Err(ManagerError::NotFound(format!("Deployment {} not found", id))),
        }
    }

    async fn decode_with_metrics(
        &self,
        configuration: &Configuration,
    ) -> Result<DeploymentModel, ManagerError> {
        let mut model = self.codec.decode(configuration);
        let metrics = self.metrics.snapshot(configuration, model.deployment_type).await?;
        model.metrics = Some(metrics);
        Ok(model)
    }
}
