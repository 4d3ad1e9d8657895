//! IoT Hub manager API models

pub mod models;

pub use models::*;
