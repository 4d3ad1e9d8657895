//! Translation between deployments and registry configuration documents

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use openapi_client::{Configuration, ConfigurationContent};
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::deploy::ownership::OwnershipTag;
use crate::errors::ManagerError;
use crate::models::deployment::{DeploymentModel, DeploymentRequest, DeploymentType};

pub const NAME_LABEL: &str = "Name";
pub const DEVICE_GROUP_ID_LABEL: &str = "DeviceGroupId";
pub const TYPE_LABEL: &str = "Type";

/// Encodes deployment requests as configuration documents and decodes them back
#[derive(Debug, Clone, Default)]
pub struct ConfigurationCodec {
    ownership: OwnershipTag,
}

impl ConfigurationCodec {
    pub fn new(ownership: OwnershipTag) -> Self {
        Self { ownership }
    }

    /// Build the native document for a validated request.
    ///
    /// `id` only addresses the document on submission; the registry response
    /// carries the authoritative id.
    pub fn encode(
        &self,
        request: &DeploymentRequest,
        id: &str,
    ) -> Result<Configuration, ManagerError> {
        let mut labels = HashMap::new();
        labels.insert(NAME_LABEL.to_string(), request.name.clone());
        labels.insert(DEVICE_GROUP_ID_LABEL.to_string(), request.device_group_id.clone());
        labels.insert(TYPE_LABEL.to_string(), request.deployment_type.to_string());
        self.ownership.stamp(&mut labels);

        let mut configuration = Configuration::new(id);
        configuration.labels = Some(labels);
        configuration.priority = request.priority;
        configuration.target_condition = Some(request.device_group_query.clone());
        configuration.content =
            parse_package_content(&request.package_content, request.deployment_type)?;

        Ok(configuration)
    }

    /// Rebuild a deployment from a native document.
    ///
    /// Missing labels decode to empty strings; ownership is checked upstream.
    pub fn decode(&self, configuration: &Configuration) -> DeploymentModel {
        let deployment_type = configuration
            .label(TYPE_LABEL)
            .and_then(|label| label.parse().ok())
            .unwrap_or_else(|| infer_type(&configuration.content));

        DeploymentModel {
            id: configuration.id.clone(),
            name: configuration.label(NAME_LABEL).unwrap_or_default().to_string(),
            device_group_id: configuration
                .label(DEVICE_GROUP_ID_LABEL)
                .unwrap_or_default()
                .to_string(),
            device_group_query: configuration.target_condition.clone().unwrap_or_default(),
            package_content: render_package_content(&configuration.content),
            priority: configuration.priority,
            deployment_type,
            etag: configuration.etag.clone(),
            date_created: configuration
                .created_time_utc
                .as_deref()
                .and_then(parse_registry_timestamp),
            date_modified: configuration
                .last_updated_time_utc
                .as_deref()
                .and_then(parse_registry_timestamp),
            metrics: None,
        }
    }

    /// Merge the registry's response to a submission into the requested deployment
    pub fn merge_created(
        &self,
        request: DeploymentRequest,
        created: &Configuration,
    ) -> DeploymentModel {
        DeploymentModel {
            id: created.id.clone(),
            name: request.name,
            device_group_id: request.device_group_id,
            device_group_query: request.device_group_query,
            package_content: request.package_content,
            priority: request.priority,
            deployment_type: request.deployment_type,
            etag: created.etag.clone(),
            date_created: created
                .created_time_utc
                .as_deref()
                .and_then(parse_registry_timestamp),
            date_modified: created
                .last_updated_time_utc
                .as_deref()
                .and_then(parse_registry_timestamp),
            metrics: None,
        }
    }
}

/// Keys that make a JSON object content rather than a whole document
const CONTENT_SECTIONS: [&str; 3] = ["modulesContent", "deviceContent", "moduleContent"];

/// A whole configuration document supplied as package content
#[derive(Deserialize)]
struct PackageDocument<'a> {
    #[serde(borrow, default)]
    content: Option<&'a RawValue>,
}

/// Parse package content into the document content for the given type.
///
/// Accepts either the content object itself or a whole configuration
/// document, in which case its `content` is taken. The JSON text is kept
/// verbatim.
pub fn parse_package_content(
    package_content: &str,
    deployment_type: DeploymentType,
) -> Result<ConfigurationContent, ManagerError> {
    if package_content.trim().is_empty() {
        if deployment_type.requires_content() {
            return Err(ManagerError::InvalidInput(format!(
                "packageContent is required for {} deployments",
                deployment_type
            )));
        }
        if !package_content.is_empty() {
            return Err(ManagerError::InvalidInput(
                "packageContent is not a valid configuration: blank content".to_string(),
            ));
        }
        return Ok(ConfigurationContent::default());
    }

    let object: Map<String, Value> = serde_json::from_str(package_content).map_err(invalid)?;
    let is_document =
        object.contains_key("content") && !CONTENT_SECTIONS.iter().any(|key| object.contains_key(*key));

    let content = if is_document {
        let document: PackageDocument = serde_json::from_str(package_content).map_err(invalid)?;
        match document.content.map(RawValue::get).filter(|raw| *raw != "null") {
            Some(raw) => ConfigurationContent::from_json(raw).map_err(invalid)?,
            None => ConfigurationContent::default(),
        }
    } else {
        ConfigurationContent::from_json(package_content).map_err(invalid)?
    };
    check_sections(&content, deployment_type)?;

    Ok(content)
}

fn invalid(e: serde_json::Error) -> ManagerError {
    ManagerError::InvalidInput(format!("packageContent is not a valid configuration: {}", e))
}

fn check_sections(
    content: &ConfigurationContent,
    deployment_type: DeploymentType,
) -> Result<(), ManagerError> {
    let sections = content.sections().map_err(invalid)?;
    match deployment_type {
        DeploymentType::EdgeManifest => {
            if sections.modules_content.as_ref().map_or(true, |m| m.is_empty()) {
                return Err(ManagerError::InvalidInput(
                    "edgeManifest packageContent must define modulesContent".to_string(),
                ));
            }
        }
        DeploymentType::DeviceConfiguration => {
            if sections.modules_content.is_some() {
                return Err(ManagerError::InvalidInput(
                    "deviceConfiguration packageContent cannot define modulesContent".to_string(),
                ));
            }
            if sections.device_content.is_none() && sections.module_content.is_none() {
                return Err(ManagerError::InvalidInput(
                    "deviceConfiguration packageContent must define deviceContent or moduleContent"
                        .to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Document content as package content; empty content renders as ""
pub fn render_package_content(content: &ConfigurationContent) -> String {
    if content.is_empty() {
        return String::new();
    }
    content.as_json().unwrap_or_default().to_string()
}

fn infer_type(content: &ConfigurationContent) -> DeploymentType {
    let edge = content
        .sections()
        .map(|sections| sections.modules_content.is_some())
        .unwrap_or(false);
    if edge {
        DeploymentType::EdgeManifest
    } else {
        DeploymentType::DeviceConfiguration
    }
}

/// Parse a registry timestamp, which may lack a UTC offset
pub fn parse_registry_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
