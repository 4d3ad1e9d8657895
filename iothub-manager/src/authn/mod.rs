//! Authentication against the IoT Hub service API

pub mod conn_string;
pub mod sas_token;
pub mod token_mngr;
