//! Server state

use std::sync::Arc;
use std::time::Instant;

use crate::deploy::Deployments;

/// Server state shared across handlers
pub struct ServerState {
    pub deployments: Arc<Deployments>,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(deployments: Arc<Deployments>) -> Self {
        Self {
            deployments,
            started_at: Instant::now(),
        }
    }
}
