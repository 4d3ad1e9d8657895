//! IoT Hub service API models

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// Schema version stamped on every configuration document
pub const CONFIGURATION_SCHEMA_VERSION: &str = "1.0";

/// System metric counting the devices a configuration targets
pub const TARGETED_COUNT_METRIC: &str = "targetedCount";

/// A configuration document as stored by the IoT Hub registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,

    #[serde(default)]
    pub content: ConfigurationContent,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_condition: Option<String>,

    /// Registry timestamps; the hub may omit the offset, so these stay raw
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time_utc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_time_utc: Option<String>,

    #[serde(default)]
    pub priority: i32,

    /// Computed by the hub; ignored on submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_metrics: Option<ConfigurationMetrics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl Configuration {
    /// Create an empty configuration document with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            schema_version: Some(CONFIGURATION_SCHEMA_VERSION.to_string()),
            ..Default::default()
        }
    }

    /// Look up a label value
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    /// Number of devices the hub reports as targeted, if it has computed it
    pub fn targeted_count(&self) -> Option<u64> {
        self.system_metrics
            .as_ref()
            .and_then(|metrics| metrics.results.get(TARGETED_COUNT_METRIC))
            .and_then(|count| u64::try_from(*count).ok())
    }
}

/// Payload pushed to the targeted devices or modules.
///
/// The JSON text is kept exactly as it was built or received, so key order,
/// whitespace and keys this crate does not model all survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationContent {
    raw: Option<String>,
}

impl ConfigurationContent {
    /// Wrap JSON text, which must be an object
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Map<String, Value>>(raw)?;
        Ok(Self {
            raw: Some(raw.to_string()),
        })
    }

    /// The JSON text, or `None` when no content was set
    pub fn as_json(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Typed view of the known content sections
    pub fn sections(&self) -> Result<ContentSections, serde_json::Error> {
        match &self.raw {
            Some(raw) => serde_json::from_str(raw),
            None => Ok(ContentSections::default()),
        }
    }

    /// True when unset or an empty object
    pub fn is_empty(&self) -> bool {
        match &self.raw {
            Some(raw) => serde_json::from_str::<Map<String, Value>>(raw)
                .map(|object| object.is_empty())
                .unwrap_or(false),
            None => true,
        }
    }
}

impl Serialize for ConfigurationContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = self.raw.clone().unwrap_or_else(|| "{}".to_string());
        let raw = RawValue::from_string(raw).map_err(<S::Error as serde::ser::Error>::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConfigurationContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Box<RawValue>>::deserialize(deserializer)?;
        Ok(Self {
            raw: raw.map(|raw| raw.get().to_string()),
        })
    }
}

/// Sections of configuration content that decide how it is applied
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSections {
    /// Edge deployment manifest, keyed by module (`$edgeAgent`, `$edgeHub`, ...)
    #[serde(default)]
    pub modules_content: Option<Map<String, Value>>,

    /// Desired properties patch for device twins
    #[serde(default)]
    pub device_content: Option<Map<String, Value>>,

    /// Desired properties patch for module twins
    #[serde(default)]
    pub module_content: Option<Map<String, Value>>,
}

/// Metric queries and their latest results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationMetrics {
    #[serde(default)]
    pub results: HashMap<String, i64>,

    #[serde(default)]
    pub queries: HashMap<String, String>,
}

/// Body of a `/devices/query` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpecification {
    pub query: String,
}

/// Device or module twin returned by a twin query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Twin {
    pub device_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(default)]
    pub properties: TwinProperties,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configurations: Option<HashMap<String, ConfigurationInfo>>,
}

/// Desired and reported property sections of a twin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwinProperties {
    #[serde(default)]
    pub desired: Map<String, Value>,

    #[serde(default)]
    pub reported: Map<String, Value>,
}

/// Per-twin state of a configuration (`Targeted`, `Applied`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationInfo {
    #[serde(default)]
    pub status: String,
}

impl ConfigurationInfo {
    pub const TARGETED: &'static str = "Targeted";
    pub const APPLIED: &'static str = "Applied";

    pub fn is_applied(&self) -> bool {
        self.status == Self::APPLIED
    }
}
