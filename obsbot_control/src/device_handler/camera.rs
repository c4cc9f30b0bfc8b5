use super::CameraControl;
use crate::{
    model::{
        types::{FocusMode, FovType, MediaMode, WhiteBalanceType, FOCUS_RANGE, ZOOM_RANGE},
        ObsbotError, ObsbotResult,
    },
    sdk::{Command, Parameter, Reading, SdkError},
};

/// Decode an integer reading into one of the vendor enumerations
fn decode<T: TryFrom<i32, Error = i32>>(parameter: Parameter, reading: Reading) -> ObsbotResult<T> {
    T::try_from(expect_code(parameter, reading)?)
        .map_err(|code| ObsbotError::UnknownCode { parameter, code })
}

fn expect_code(parameter: Parameter, reading: Reading) -> ObsbotResult<i32> {
    match reading {
        Reading::Code(code) => Ok(code),
        other => Err(mismatched(parameter, other)),
    }
}

fn mismatched(parameter: Parameter, reading: Reading) -> ObsbotError {
    ObsbotError::Sdk(SdkError::Other(format!(
        "unexpected reading {reading:?} for {parameter}"
    )))
}

impl CameraControl {
    /// Enable or disable AI human tracking
    pub async fn enable_ai_tracking(&self, enable: bool) -> ObsbotResult<()> {
        self.send(Command::AiTracking(enable)).await
    }

    /// Set the digital zoom ratio (1.0 to 4.0)
    pub async fn set_zoom(&self, level: f32) -> ObsbotResult<()> {
        let level = self.constrain("zoom", level, ZOOM_RANGE)?;
        self.send(Command::Zoom(level)).await
    }

    pub async fn zoom(&self) -> ObsbotResult<f32> {
        match self.read(Parameter::Zoom).await? {
            Reading::Ratio(level) => Ok(level),
            other => Err(mismatched(Parameter::Zoom, other)),
        }
    }

    pub async fn set_fov(&self, fov: FovType) -> ObsbotResult<()> {
        self.send(Command::Fov(fov)).await
    }

    pub async fn set_auto_focus_mode(&self, mode: FocusMode) -> ObsbotResult<()> {
        self.send(Command::AutoFocusMode(mode)).await
    }

    pub async fn auto_focus_mode(&self) -> ObsbotResult<FocusMode> {
        let reading = self.read(Parameter::AutoFocusMode).await?;
        decode(Parameter::AutoFocusMode, reading)
    }

    /// Set the manual focus motor position (0 to 100)
    pub async fn set_manual_focus_position(&self, position: i32) -> ObsbotResult<()> {
        let position = self.constrain("manual focus position", position, FOCUS_RANGE)?;
        self.send(Command::ManualFocusPosition(position)).await
    }

    pub async fn manual_focus_position(&self) -> ObsbotResult<i32> {
        let parameter = Parameter::ManualFocusPosition;
        let code = expect_code(parameter, self.read(parameter).await?)?;
        if FOCUS_RANGE.contains(&code) {
            Ok(code)
        } else {
            Err(ObsbotError::UnknownCode { parameter, code })
        }
    }

    /// Enable or disable focusing on detected faces
    pub async fn set_face_focus(&self, enable: bool) -> ObsbotResult<()> {
        self.send(Command::FaceFocus(enable)).await
    }

    pub async fn set_hdr(&self, enable: bool) -> ObsbotResult<()> {
        self.send(Command::Hdr(enable)).await
    }

    pub async fn hdr(&self) -> ObsbotResult<bool> {
        match self.read(Parameter::Hdr).await? {
            Reading::Flag(enabled) => Ok(enabled),
            other => Err(mismatched(Parameter::Hdr, other)),
        }
    }

    /// Set the white balance mode.
    ///
    /// `manual_value` is the colour temperature and only matters for
    /// [`WhiteBalanceType::Manual`].
    pub async fn set_white_balance(
        &self,
        kind: WhiteBalanceType,
        manual_value: i32,
    ) -> ObsbotResult<()> {
        self.send(Command::WhiteBalance { kind, manual_value }).await
    }

    pub async fn white_balance_type(&self) -> ObsbotResult<WhiteBalanceType> {
        let reading = self.read(Parameter::WhiteBalanceType).await?;
        decode(Parameter::WhiteBalanceType, reading)
    }

    pub async fn set_media_mode(&self, mode: MediaMode) -> ObsbotResult<()> {
        self.send(Command::MediaMode(mode)).await
    }
}
