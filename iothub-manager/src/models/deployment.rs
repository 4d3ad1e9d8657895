//! Deployment models

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ManagerError;

/// How the package content of a deployment is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeploymentType {
    /// IoT Edge deployment manifest (`modulesContent`)
    #[default]
    EdgeManifest,

    /// Device twin desired properties (`deviceContent` / `moduleContent`)
    DeviceConfiguration,
}

impl DeploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentType::EdgeManifest => "edgeManifest",
            DeploymentType::DeviceConfiguration => "deviceConfiguration",
        }
    }

    /// Whether a deployment of this type must carry package content
    pub fn requires_content(&self) -> bool {
        matches!(self, DeploymentType::EdgeManifest)
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentType {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edgeManifest" => Ok(DeploymentType::EdgeManifest),
            "deviceConfiguration" => Ok(DeploymentType::DeviceConfiguration),
            other => Err(ManagerError::InvalidInput(format!(
                "Unknown deployment type: {}",
                other
            ))),
        }
    }
}

/// A request to roll out package content to a device group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub name: String,
    pub device_group_id: String,
    pub device_group_query: String,
    pub package_content: String,
    pub priority: i32,
    pub deployment_type: DeploymentType,
}

impl DeploymentRequest {
    pub fn new(
        name: impl Into<String>,
        device_group_id: impl Into<String>,
        device_group_query: impl Into<String>,
        package_content: impl Into<String>,
        priority: i32,
        deployment_type: DeploymentType,
    ) -> Self {
        Self {
            name: name.into(),
            device_group_id: device_group_id.into(),
            device_group_query: device_group_query.into(),
            package_content: package_content.into(),
            priority,
            deployment_type,
        }
    }
}

/// A deployment as reconstructed from the registry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeploymentModel {
    /// Assigned by the registry
    pub id: String,
    pub name: String,
    pub device_group_id: String,
    pub device_group_query: String,
    pub package_content: String,
    pub priority: i32,
    pub deployment_type: DeploymentType,
    pub etag: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,

    /// Only present when device status was requested
    pub metrics: Option<DeploymentMetrics>,
}

/// Deployments in presentation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentListModel {
    pub items: Vec<DeploymentModel>,
}

impl DeploymentListModel {
    pub fn new(items: Vec<DeploymentModel>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Rollout state of a single targeted device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceDeploymentState {
    Pending,
    Applied,
    Failed,
}

impl DeviceDeploymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceDeploymentState::Pending => "Pending",
            DeviceDeploymentState::Applied => "Applied",
            DeviceDeploymentState::Failed => "Failed",
        }
    }
}

/// Status snapshot of a deployment, computed per request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentMetrics {
    pub applied: u64,
    pub pending: u64,
    pub failed: u64,
    pub device_statuses: BTreeMap<String, DeviceDeploymentState>,
}

impl DeploymentMetrics {
    /// Record the state of one device
    pub fn record(&mut self, device_id: impl Into<String>, state: DeviceDeploymentState) {
        let previous = self.device_statuses.insert(device_id.into(), state);
        if let Some(previous) = previous {
            self.decrement(previous);
        }
        match state {
            DeviceDeploymentState::Pending => self.pending += 1,
            DeviceDeploymentState::Applied => self.applied += 1,
            DeviceDeploymentState::Failed => self.failed += 1,
        }
    }

    /// Count devices that are targeted but have no twin to report on yet
    pub fn record_unreported(&mut self, count: u64) {
        self.pending += count;
    }

    fn decrement(&mut self, state: DeviceDeploymentState) {
        match state {
            DeviceDeploymentState::Pending => self.pending -= 1,
            DeviceDeploymentState::Applied => self.applied -= 1,
            DeviceDeploymentState::Failed => self.failed -= 1,
        }
    }

    /// Number of devices counted
    pub fn total(&self) -> u64 {
        self.applied + self.pending + self.failed
    }
}
