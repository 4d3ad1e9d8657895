//! Deployment request validation

use crate::deploy::codec::parse_package_content;
use crate::errors::ManagerError;
use crate::models::deployment::DeploymentRequest;

/// Check a request before anything is submitted to the registry.
///
/// Only ever fails with `InvalidInput`.
pub fn validate(request: &DeploymentRequest) -> Result<(), ManagerError> {
    require_non_blank("name", &request.name)?;
    require_non_blank("deviceGroupId", &request.device_group_id)?;
    require_non_blank("deviceGroupQuery", &request.device_group_query)?;

    if request.priority < 0 {
        return Err(ManagerError::InvalidInput(format!(
            "priority must be greater than or equal to zero, got {}",
            request.priority
        )));
    }

    parse_package_content(&request.package_content, request.deployment_type)?;
    Ok(())
}

fn require_non_blank(field: &str, value: &str) -> Result<(), ManagerError> {
    if value.trim().is_empty() {
        return Err(ManagerError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}
