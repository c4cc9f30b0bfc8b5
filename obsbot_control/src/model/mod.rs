use thiserror::Error;

use crate::{config::ConfigError, sdk::Parameter, sdk::SdkError};

pub mod types;

pub type ObsbotResult<T> = Result<T, ObsbotError>;

#[derive(Error, Debug)]
pub enum ObsbotError {
    #[error("NotInitialized: the SDK session has not been initialized")]
    NotInitialized,
    #[error("NoDeviceSelected: select a camera before sending commands")]
    NoDeviceSelected,
    #[error("DeviceUnavailable: {0}")]
    DeviceUnavailable(String),
    #[error("OutOfRange: {parameter} = {value} (allowed {min}..={max})")]
    OutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Unreadable: the camera did not report {0}")]
    Unreadable(Parameter),
    #[error("UnknownCode: {parameter} reported unknown code {code}")]
    UnknownCode { parameter: Parameter, code: i32 },
    #[error("SdkError: {0}")]
    Sdk(#[from] SdkError),
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),
}
