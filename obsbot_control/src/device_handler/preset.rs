use super::CameraControl;
use crate::{model::ObsbotResult, sdk::Command};

impl CameraControl {
    /// Save the current gimbal position on the camera as preset `id`.
    ///
    /// Ids and names are passed to the camera as given; saving over an
    /// existing id replaces it.
    pub async fn save_preset(&self, id: i32, name: &str) -> ObsbotResult<()> {
        self.send(Command::SavePreset {
            id,
            name: name.to_owned(),
        })
        .await
    }

    /// Move the gimbal to the position stored as preset `id`
    pub async fn move_to_preset(&self, id: i32) -> ObsbotResult<()> {
        self.send(Command::MoveToPreset(id)).await
    }
}
