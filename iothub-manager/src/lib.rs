//! IoT Hub Manager Library
//!
//! Deployment management for an IoT solution, backed by the configuration
//! registry of an Azure IoT Hub.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod hub;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;
