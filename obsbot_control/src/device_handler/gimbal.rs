use super::CameraControl;
use crate::{
    model::{
        types::{GimbalPosition, GimbalSpeed, PITCH_RANGE, SPEED_RANGE, YAW_RANGE},
        ObsbotResult,
    },
    sdk::Command,
};

impl CameraControl {
    /// Move the gimbal to absolute angles (degrees).
    ///
    /// Yaw spans -110..110 and pitch -45..45 on the hardware; what happens
    /// outside that depends on the session's range policy. Roll is forwarded
    /// as given.
    pub async fn move_gimbal(&self, yaw: f32, pitch: f32, roll: f32) -> ObsbotResult<()> {
        let position = GimbalPosition {
            yaw: self.constrain("yaw", yaw, YAW_RANGE)?,
            pitch: self.constrain("pitch", pitch, PITCH_RANGE)?,
            roll,
        };
        self.send(Command::MoveGimbal(position)).await
    }

    /// Start continuous gimbal motion, for held-button style input
    pub async fn move_gimbal_by_speed(&self, yaw_speed: f32, pitch_speed: f32) -> ObsbotResult<()> {
        let speed = GimbalSpeed {
            yaw: self.constrain("yaw speed", yaw_speed, SPEED_RANGE)?,
            pitch: self.constrain("pitch speed", pitch_speed, SPEED_RANGE)?,
        };
        self.send(Command::MoveGimbalBySpeed(speed)).await
    }

    /// Stop any continuous gimbal motion
    pub async fn stop_gimbal(&self) -> ObsbotResult<()> {
        self.send(Command::MoveGimbalBySpeed(GimbalSpeed::STOP)).await
    }
}
