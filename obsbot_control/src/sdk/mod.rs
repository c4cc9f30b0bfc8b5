//! Seam between the control facade and the vendor camera SDK.
//!
//! A [`CameraSdk`] owns device enumeration, the transport to the cameras and
//! the firmware protocol. Everything in this crate talks to cameras through
//! this trait, so a native binding and [`SimulatedSdk`] are interchangeable.

use crate::model::types::{
    ConnectionEvent, DeviceInfo, FocusMode, FovType, GimbalPosition, GimbalSpeed, MediaMode,
    WhiteBalanceType,
};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

pub mod simulated;

pub use simulated::SimulatedSdk;

/// Integer value the firmware reports when a parameter cannot be read
pub const UNREADABLE_SENTINEL: i32 = -1;

pub type SdkResult<T> = Result<T, SdkError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SdkError {
    #[error("SDK instance has not been initialized")]
    NotInitialized,
    #[error("device {0} is not attached")]
    DeviceNotFound(String),
    #[error("device {0} is attached but not responding")]
    Unreachable(String),
    #[error("preset {0} is not stored on the device")]
    UnknownPreset(i32),
    #[error("reading {0} failed")]
    ReadFailed(Parameter),
    #[error("{0}")]
    Other(String),
}

/// Command forwarded to the selected camera
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    MoveGimbal(GimbalPosition),
    MoveGimbalBySpeed(GimbalSpeed),
    AiTracking(bool),
    Zoom(f32),
    Fov(FovType),
    AutoFocusMode(FocusMode),
    ManualFocusPosition(i32),
    FaceFocus(bool),
    Hdr(bool),
    WhiteBalance {
        kind: WhiteBalanceType,
        manual_value: i32,
    },
    MediaMode(MediaMode),
    SavePreset {
        id: i32,
        name: String,
    },
    MoveToPreset(i32),
}

/// Camera parameters that can be queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Zoom,
    AutoFocusMode,
    ManualFocusPosition,
    Hdr,
    WhiteBalanceType,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Parameter::Zoom => "zoom",
            Parameter::AutoFocusMode => "auto focus mode",
            Parameter::ManualFocusPosition => "manual focus position",
            Parameter::Hdr => "HDR",
            Parameter::WhiteBalanceType => "white balance type",
        };
        f.write_str(name)
    }
}

/// Raw value returned by a parameter query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Integer code; [`UNREADABLE_SENTINEL`] when the camera could not answer
    Code(i32),
    Ratio(f32),
    Flag(bool),
}

#[async_trait]
pub trait CameraSdk: Send + Sync {
    /// Bring up the process-wide SDK state
    async fn initialize(&self) -> SdkResult<()>;

    /// Refresh the SDK's list of attached cameras
    async fn scan(&self) -> SdkResult<()>;

    /// Cameras known after the last scan, in SDK order
    async fn devices(&self) -> SdkResult<Vec<DeviceInfo>>;

    /// Open a control session on a camera, failing if it cannot be reached
    async fn open(&self, serial: &str) -> SdkResult<()>;

    async fn send(&self, serial: &str, command: Command) -> SdkResult<()>;

    async fn read(&self, serial: &str, parameter: Parameter) -> SdkResult<Reading>;

    /// Receiver for hotplug notifications published by the SDK
    fn connection_events(&self) -> broadcast::Receiver<ConnectionEvent>;
}
