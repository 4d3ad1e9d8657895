//! Finite state machine for the rollout of a deployment on one device
//!
//! Devices start out `Pending` once targeted and settle in `Applied` or
//! `Failed` as they report back through their twin. The service only
//! observes these transitions; it never drives them.

use openapi_client::Twin;
use serde_json::Value;

use crate::models::deployment::DeviceDeploymentState;

/// Desired-status code a device reports after applying its desired properties
pub const DESIRED_STATUS_OK: i64 = 200;

/// Rollout event observed on a twin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutEvent {
    /// Device reported the desired version as applied
    Succeeded,

    /// Device reported the desired version with an error status
    Failed { code: i64, description: Option<String> },
}

/// Per-device rollout FSM
#[derive(Debug, Clone)]
pub struct DeviceRolloutFsm {
    state: DeviceDeploymentState,
    error: Option<String>,
}

impl DeviceRolloutFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: DeviceDeploymentState::Pending,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> DeviceDeploymentState {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: RolloutEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (DeviceDeploymentState::Pending, RolloutEvent::Succeeded) => {
                DeviceDeploymentState::Applied
            }
            (DeviceDeploymentState::Pending, RolloutEvent::Failed { code, description }) => {
                self.error = Some(match description {
                    Some(description) => format!("{}: {}", code, description),
                    None => code.to_string(),
                });
                DeviceDeploymentState::Failed
            }

            // Applied and Failed are terminal
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }

    /// Replay what a twin reports into a fresh FSM
    pub fn from_twin(twin: &Twin) -> Self {
        let mut fsm = Self::new();
        if let Some(event) = observe(twin) {
            // A fresh FSM is pending, so either event is accepted
            let _ = fsm.process(event);
        }
        fsm
    }
}

impl Default for DeviceRolloutFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the rollout event a twin reports, if any.
///
/// Nothing is reported until `lastDesiredVersion` catches up with the
/// desired `$version`.
pub fn observe(twin: &Twin) -> Option<RolloutEvent> {
    let desired_version = twin.properties.desired.get("$version").and_then(Value::as_i64)?;
    let reported = &twin.properties.reported;
    let reported_version = reported.get("lastDesiredVersion").and_then(Value::as_i64)?;
    if reported_version != desired_version {
        return None;
    }

    let status = reported.get("lastDesiredStatus");
    let code = status
        .and_then(|s| s.get("code"))
        .and_then(Value::as_i64)?;

    if code == DESIRED_STATUS_OK {
        Some(RolloutEvent::Succeeded)
    } else {
        let description = status
            .and_then(|s| s.get("description"))
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        Some(RolloutEvent::Failed { code, description })
    }
}
