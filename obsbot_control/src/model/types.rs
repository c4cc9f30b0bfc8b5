//! Values passed between the application and the camera SDK.
//!
//! Mode enumerations carry the integer codes the vendor firmware uses, so a
//! native binding can convert with [`code`](FovType::code) and `TryFrom<i32>`.

use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive};

/// Hardware yaw range of the gimbal (degrees)
pub const YAW_RANGE: RangeInclusive<f32> = -110.0..=110.0;
/// Hardware pitch range of the gimbal (degrees)
pub const PITCH_RANGE: RangeInclusive<f32> = -45.0..=45.0;
/// Speed range accepted on both gimbal axes (degrees per second)
pub const SPEED_RANGE: RangeInclusive<f32> = -90.0..=90.0;
/// Digital zoom ratio
pub const ZOOM_RANGE: RangeInclusive<f32> = 1.0..=4.0;
/// Manual focus motor position
pub const FOCUS_RANGE: RangeInclusive<i32> = 0..=100;

/// Camera as reported by the SDK after a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Serial number, unique per physical camera
    pub serial: String,
    /// Product name shown to the user
    pub name: String,
}

impl DeviceInfo {
    pub fn new(serial: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.serial)
    }
}

/// Hotplug notification for a single camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionEvent {
    pub serial: String,
    pub connected: bool,
}

/// Absolute gimbal orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GimbalPosition {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Continuous gimbal motion in degrees per second
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GimbalSpeed {
    pub yaw: f32,
    pub pitch: f32,
}

impl GimbalSpeed {
    pub const STOP: GimbalSpeed = GimbalSpeed {
        yaw: 0.0,
        pitch: 0.0,
    };
}

/// Implements the code conversions shared by every vendor mode enumeration.
macro_rules! vendor_codes {
    ($name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl $name {
            /// Integer code understood by the camera firmware
            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code,)+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = i32;

            fn try_from(code: i32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    other => Err(other),
                }
            }
        }
    };
}

/// Field of view presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FovType {
    /// 86°
    Wide,
    /// 78°
    Medium,
    /// 65°
    Narrow,
}

vendor_codes!(FovType {
    Wide = 0,
    Medium = 1,
    Narrow = 2,
});

impl FovType {
    pub fn degrees(self) -> u32 {
        match self {
            FovType::Wide => 86,
            FovType::Medium => 78,
            FovType::Narrow => 65,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusMode {
    Auto,
    ContinuousAf,
    SingleAf,
    Manual,
}

vendor_codes!(FocusMode {
    Auto = 0,
    ContinuousAf = 1,
    SingleAf = 2,
    Manual = 3,
});

/// White balance mode; `Manual` uses the colour temperature sent alongside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteBalanceType {
    Auto,
    Daylight,
    Fluorescent,
    Tungsten,
    Manual,
}

vendor_codes!(WhiteBalanceType {
    Auto = 0,
    Daylight = 1,
    Fluorescent = 2,
    Tungsten = 3,
    Manual = 255,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaMode {
    Normal,
    VirtualBackground,
    AutoFrame,
}

vendor_codes!(MediaMode {
    Normal = 0,
    VirtualBackground = 1,
    AutoFrame = 2,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_balance_manual_code() {
        assert_eq!(WhiteBalanceType::Manual.code(), 255);
        assert_eq!(
            WhiteBalanceType::try_from(255),
            Ok(WhiteBalanceType::Manual)
        );
        // 4..=254 are not assigned by the firmware
        assert_eq!(WhiteBalanceType::try_from(4), Err(4));
    }

    #[test]
    fn test_unknown_codes_are_returned() {
        assert_eq!(FocusMode::try_from(-1), Err(-1));
        assert_eq!(FovType::try_from(3), Err(3));
        assert_eq!(MediaMode::try_from(2), Ok(MediaMode::AutoFrame));
    }

    #[test]
    fn test_fov_degrees_narrow_as_code_grows() {
        let degrees: Vec<u32> = [0, 1, 2]
            .into_iter()
            .map(|code| FovType::try_from(code).unwrap().degrees())
            .collect();
        assert_eq!(degrees, vec![86, 78, 65]);
    }
}
