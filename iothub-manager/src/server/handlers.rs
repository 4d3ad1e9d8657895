//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use openapi_server::{
    DeploymentApiModel, DeploymentListApiModel, DeploymentMetricsApiModel, StatusApiModel,
};
use serde::Deserialize;

use crate::deploy::query::to_target_condition;
use crate::errors::ManagerError;
use crate::models::deployment::{DeploymentMetrics, DeploymentModel, DeploymentRequest};
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Query parameters of the deployment read endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusQuery {
    #[serde(default)]
    pub include_device_status: bool,
}

/// Status handler
pub async fn status_handler(State(state): State<Arc<ServerState>>) -> Json<StatusApiModel> {
    let version = version_info();
    Json(
        StatusApiModel {
            name: "iothub-manager".to_string(),
            status: "OK:Alive and well".to_string(),
            version: version.version,
            git_hash: version.git_hash,
            build_time: version.build_time,
            uptime_secs: state.started_at.elapsed().as_secs(),
            metadata: Default::default(),
        }
        .with_metadata(),
    )
}

/// List deployments handler
pub async fn list_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<DeviceStatusQuery>,
) -> Result<Json<DeploymentListApiModel>, ManagerError> {
    let list = state.deployments.list(query.include_device_status).await?;
    let items = list.items.into_iter().map(to_api_model).collect();
    Ok(Json(DeploymentListApiModel::new(items)))
}

/// Create deployment handler
pub async fn create_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<DeploymentApiModel>, JsonRejection>,
) -> Result<Json<DeploymentApiModel>, ManagerError> {
    let Json(body) = body.map_err(|e| ManagerError::InvalidInput(e.body_text()))?;
    let request = to_request(body)?;
    let created = state.deployments.create(request).await?;
    Ok(Json(to_api_model(created)))
}

/// Get deployment handler
pub async fn get_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Query(query): Query<DeviceStatusQuery>,
) -> Result<Json<DeploymentApiModel>, ManagerError> {
    let model = state.deployments.get(&id, query.include_device_status).await?;
    Ok(Json(to_api_model(model)))
}

/// Delete deployment handler
pub async fn delete_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ManagerError> {
    state.deployments.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn to_request(body: DeploymentApiModel) -> Result<DeploymentRequest, ManagerError> {
    Ok(DeploymentRequest::new(
        body.name,
        body.device_group_id,
        to_target_condition(&body.device_group_query)?,
        body.package_content,
        body.priority,
        body.r#type.parse()?,
    ))
}

fn to_api_model(model: DeploymentModel) -> DeploymentApiModel {
    DeploymentApiModel {
        id: Some(model.id),
        name: model.name,
        device_group_id: model.device_group_id,
        device_group_query: model.device_group_query,
        package_content: model.package_content,
        priority: model.priority,
        r#type: model.deployment_type.to_string(),
        date_created: model.date_created,
        date_modified: model.date_modified,
        etag: model.etag,
        metrics: model.metrics.map(to_metrics_api_model),
        metadata: Default::default(),
    }
    .with_metadata()
}

fn to_metrics_api_model(metrics: DeploymentMetrics) -> DeploymentMetricsApiModel {
    DeploymentMetricsApiModel {
        applied_count: metrics.applied,
        pending_count: metrics.pending,
        failed_count: metrics.failed,
        device_statuses: metrics
            .device_statuses
            .into_iter()
            .map(|(device, state)| (device, state.as_str().to_string()))
            .collect(),
    }
}
