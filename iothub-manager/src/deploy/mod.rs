//! Deployment management

pub mod codec;
pub mod fsm;
pub mod manager;
pub mod metrics;
pub mod ownership;
pub mod query;
pub mod validator;

pub use manager::{DeploymentOptions, Deployments, MAX_DEPLOYMENTS};
