//! Ownership of registry configuration documents
//!
//! The registry is shared with other tooling, so documents created by this
//! service carry a reserved label. Anything without it is foreign and never
//! surfaces through the deployment API.

use std::collections::HashMap;

use openapi_client::Configuration;

/// Label key marking documents created by this service
pub const RM_CREATED_LABEL: &str = "RMDeployment";

/// Value the ownership label must carry
pub const RM_CREATED_VALUE: &str = "true";

/// Label convention identifying documents owned by this service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipTag {
    key: String,
    value: String,
}

impl OwnershipTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// True iff the document carries the ownership label with the expected value
    pub fn is_owned(&self, configuration: &Configuration) -> bool {
        configuration.label(&self.key) == Some(self.value.as_str())
    }

    /// Add the ownership label to a label set
    pub fn stamp(&self, labels: &mut HashMap<String, String>) {
        labels.insert(self.key.clone(), self.value.clone());
    }
}

impl Default for OwnershipTag {
    fn default() -> Self {
        Self::new(RM_CREATED_LABEL, RM_CREATED_VALUE)
    }
}

/// Whether a document was created by this service, using the default tag
pub fn is_owned_by_this_system(configuration: &Configuration) -> bool {
    OwnershipTag::default().is_owned(configuration)
}
