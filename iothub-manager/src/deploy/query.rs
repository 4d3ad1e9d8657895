//! Device group query conditions
//!
//! The console describes device groups as a list of conditions. The registry
//! wants a target condition string, so structured queries are translated at
//! the API boundary and raw query strings pass through unchanged.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::ManagerError;

/// Target condition matching every device
pub const ALL_DEVICES: &str = "*";

/// One condition of a device group query
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryCondition {
    pub key: String,
    pub operator: String,
    pub value: Value,
}

fn operator_symbol(operator: &str) -> Option<&'static str> {
    match operator.to_uppercase().as_str() {
        "EQ" => Some("="),
        "NE" => Some("!="),
        "LT" => Some("<"),
        "LE" => Some("<="),
        "GT" => Some(">"),
        "GE" => Some(">="),
        "IN" => Some("IN"),
        _ => None,
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(render_value).collect::<Vec<_>>().join(", ")
        ),
        other => other.to_string(),
    }
}

/// Render a list of conditions as a target condition
pub fn conditions_to_target(conditions: &[QueryCondition]) -> Result<String, ManagerError> {
    if conditions.is_empty() {
        return Ok(ALL_DEVICES.to_string());
    }

    let clauses = conditions
        .iter()
        .map(|condition| {
            let symbol = operator_symbol(&condition.operator).ok_or_else(|| {
                ManagerError::InvalidInput(format!(
                    "Unknown query operator: {}",
                    condition.operator
                ))
            })?;
            Ok(format!("{} {} {}", condition.key, symbol, render_value(&condition.value)))
        })
        .collect::<Result<Vec<_>, ManagerError>>()?;

    Ok(clauses.join(" and "))
}

/// Translate a device group query into a target condition.
///
/// JSON condition arrays are rendered; anything else is already a target
/// condition and is returned as is.
pub fn to_target_condition(query: &str) -> Result<String, ManagerError> {
    if !query.trim_start().starts_with('[') {
        return Ok(query.to_string());
    }

    let conditions: Vec<QueryCondition> = serde_json::from_str(query).map_err(|e| {
        ManagerError::InvalidInput(format!("deviceGroupQuery is not a valid condition list: {}", e))
    })?;
    conditions_to_target(&conditions)
}
