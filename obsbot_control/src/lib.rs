//! OBSBOT Control
//!
//! A control facade for OBSBOT PTZ webcams: device discovery and selection,
//! gimbal movement, AI tracking, zoom/FOV, focus, HDR, white balance, media
//! mode and presets.
//!
//! The camera SDK sits behind the [`sdk::CameraSdk`] trait. The crate ships
//! [`sdk::SimulatedSdk`], an in-memory implementation used by the CLI and the
//! tests.
//!
//! ```no_run
//! use obsbot_control::{config::RangePolicy, sdk::SimulatedSdk, CameraControl};
//! use std::sync::Arc;
//!
//! # async fn demo() -> obsbot_control::ObsbotResult<()> {
//! let control = CameraControl::new(Arc::new(SimulatedSdk::new()), RangePolicy::Clamp);
//! control.initialize().await?;
//! control.scan_for_devices().await?;
//! if control.select_device(0).await {
//!     control.move_gimbal(20.0, -5.0, 0.0).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device_handler;
pub mod model;
pub mod sdk;

pub use device_handler::{CallbackHandle, CameraControl, ConnectionEvents};
pub use model::{ObsbotError, ObsbotResult};
