//! Deployment status aggregation from device twins

use std::sync::Arc;

use openapi_client::{Configuration, ConfigurationInfo, Twin};
use tracing::debug;

use crate::deploy::fsm::DeviceRolloutFsm;
use crate::errors::ManagerError;
use crate::hub::DeviceTwinQuery;
use crate::models::deployment::{DeploymentMetrics, DeploymentType, DeviceDeploymentState};

/// Module whose twin reports the state of edge deployments
pub const EDGE_AGENT_MODULE: &str = "$edgeAgent";

/// Twin query selecting the devices a configuration targets or has been applied to
pub fn targeted_twins_query(deployment_id: &str, deployment_type: DeploymentType) -> String {
    let status = format!(
        "(configurations.[[{id}]].status = '{}' OR configurations.[[{id}]].status = '{}')",
        ConfigurationInfo::TARGETED,
        ConfigurationInfo::APPLIED,
        id = deployment_id
    );
    match deployment_type {
        DeploymentType::EdgeManifest => format!(
            "SELECT * FROM devices.modules WHERE moduleId = '{}' AND {}",
            EDGE_AGENT_MODULE, status
        ),
        DeploymentType::DeviceConfiguration => {
            format!("SELECT * FROM devices WHERE {}", status)
        }
    }
}

/// Rollout state of one twin; twins the hub has only targeted are pending
fn classify(twin: &Twin, deployment_id: &str) -> DeviceDeploymentState {
    let applied = twin
        .configurations
        .as_ref()
        .and_then(|configurations| configurations.get(deployment_id))
        .map_or(true, ConfigurationInfo::is_applied);
    if !applied {
        return DeviceDeploymentState::Pending;
    }
    DeviceRolloutFsm::from_twin(twin).state()
}

/// Summarizes per-device rollout status of a deployment
#[derive(Clone)]
pub struct MetricsAggregator {
    twins: Arc<dyn DeviceTwinQuery>,
}

impl MetricsAggregator {
    pub fn new(twins: Arc<dyn DeviceTwinQuery>) -> Self {
        Self { twins }
    }

    /// Compute a fresh status snapshot of a deployment's document.
    ///
    /// Devices the hub counts as targeted but whose twins have not shown up
    /// yet are pending. Nothing is cached between calls.
    pub async fn snapshot(
        &self,
        configuration: &Configuration,
        deployment_type: DeploymentType,
    ) -> Result<DeploymentMetrics, ManagerError> {
        let deployment_id = configuration.id.as_str();
        let query = targeted_twins_query(deployment_id, deployment_type);
        let twins = self
            .twins
            .query_twins(&query)
            .await
            .map_err(|e| match e {
                ManagerError::ExternalService(_) => e,
                other => ManagerError::ExternalService(other.to_string()),
            })?;

        let mut metrics = DeploymentMetrics::default();
        for twin in &twins {
            metrics.record(twin.device_id.clone(), classify(twin, deployment_id));
        }
        if let Some(targeted) = configuration.targeted_count() {
            metrics.record_unreported(targeted.saturating_sub(metrics.total()));
        }

        debug!(
            "Deployment {} status: {} applied, {} pending, {} failed",
            deployment_id, metrics.applied, metrics.pending, metrics.failed
        );
        Ok(metrics)
    }
}
