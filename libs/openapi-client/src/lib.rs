//! IoT Hub service API models
//!
//! Serde representations of the documents exchanged with the IoT Hub
//! `/configurations` and `/devices/query` endpoints.

pub mod models;

pub use models::*;
