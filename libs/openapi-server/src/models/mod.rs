//! IoT Hub manager API models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API version number used in `$type` metadata
pub const VERSION_NUMBER: &str = "1";

/// API version path segment
pub const VERSION_PATH: &str = "v1";

/// Resource metadata (`$type`, `$uri`)
pub type Metadata = BTreeMap<String, String>;

fn metadata(type_name: &str, uri: String) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("$type".to_string(), format!("{};{}", type_name, VERSION_NUMBER));
    metadata.insert("$uri".to_string(), uri);
    metadata
}

/// Deployment resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentApiModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub device_group_id: String,

    #[serde(default)]
    pub device_group_query: String,

    #[serde(default)]
    pub package_content: String,

    #[serde(default)]
    pub priority: i32,

    /// `edgeManifest` or `deviceConfiguration`
    #[serde(default = "default_deployment_type")]
    pub r#type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<DateTime<Utc>>,

    #[serde(rename = "ETag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DeploymentMetricsApiModel>,

    #[serde(rename = "$metadata", default, skip_deserializing)]
    pub metadata: Metadata,
}

fn default_deployment_type() -> String {
    "edgeManifest".to_string()
}

impl DeploymentApiModel {
    /// Stamp the resource metadata for the given deployment id
    pub fn with_metadata(mut self) -> Self {
        let id = self.id.clone().unwrap_or_default();
        self.metadata = metadata("Deployment", format!("/{}/deployments/{}", VERSION_PATH, id));
        self
    }
}

/// Rollout status counts of a deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentMetricsApiModel {
    pub applied_count: u64,
    pub pending_count: u64,
    pub failed_count: u64,

    /// Device id to `Pending`, `Applied` or `Failed`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub device_statuses: BTreeMap<String, String>,
}

/// Deployment list resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentListApiModel {
    #[serde(rename = "Items", default)]
    pub items: Vec<DeploymentApiModel>,

    #[serde(rename = "$metadata", default, skip_deserializing)]
    pub metadata: Metadata,
}

impl DeploymentListApiModel {
    pub fn new(items: Vec<DeploymentApiModel>) -> Self {
        Self {
            items,
            metadata: metadata("DeploymentsList", format!("/{}/deployments", VERSION_PATH)),
        }
    }
}

/// Service status resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusApiModel {
    pub name: String,
    pub status: String,
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
    pub uptime_secs: u64,

    #[serde(rename = "$metadata", default, skip_deserializing)]
    pub metadata: Metadata,
}

impl StatusApiModel {
    pub fn with_metadata(mut self) -> Self {
        self.metadata = metadata("Status", format!("/{}/status", VERSION_PATH));
        self
    }
}

/// Error body returned for failed requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorApiModel {
    pub message: String,
    pub status: u16,
}
