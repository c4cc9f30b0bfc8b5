use super::{CameraSdk, Command, Parameter, Reading, SdkError, SdkResult, UNREADABLE_SENTINEL};
use crate::model::types::{
    ConnectionEvent, DeviceInfo, FocusMode, FovType, GimbalPosition, GimbalSpeed, MediaMode,
    WhiteBalanceType, FOCUS_RANGE, PITCH_RANGE, SPEED_RANGE, YAW_RANGE, ZOOM_RANGE,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

/// Hotplug notifications buffered per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 64;

/// Command as received by the simulated SDK
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub serial: String,
    pub command: Command,
}

/// Settings a simulated camera currently holds
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedSettings {
    pub position: GimbalPosition,
    pub speed: GimbalSpeed,
    pub ai_tracking: bool,
    pub zoom: f32,
    pub fov: FovType,
    pub focus_mode: FocusMode,
    pub focus_position: i32,
    pub face_focus: bool,
    pub hdr: bool,
    pub white_balance: WhiteBalanceType,
    pub white_balance_manual: i32,
    pub media_mode: MediaMode,
    pub presets: HashMap<i32, (String, GimbalPosition)>,
}

impl Default for SimulatedSettings {
    fn default() -> Self {
        Self {
            position: GimbalPosition::default(),
            speed: GimbalSpeed::STOP,
            ai_tracking: false,
            zoom: 1.0,
            fov: FovType::Wide,
            focus_mode: FocusMode::Auto,
            focus_position: 50,
            face_focus: false,
            hdr: false,
            white_balance: WhiteBalanceType::Auto,
            white_balance_manual: 5000,
            media_mode: MediaMode::Normal,
            presets: HashMap::new(),
        }
    }
}

struct SimulatedCamera {
    info: DeviceInfo,
    reachable: bool,
    unreadable: HashSet<Parameter>,
    /// Raw readings reported instead of the stored settings
    forced: HashMap<Parameter, Reading>,
    settings: SimulatedSettings,
}

impl SimulatedCamera {
    fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            reachable: true,
            unreadable: HashSet::new(),
            forced: HashMap::new(),
            settings: SimulatedSettings::default(),
        }
    }

    fn apply(&mut self, command: &Command) -> SdkResult<()> {
        let settings = &mut self.settings;
        match command {
            // the firmware clamps to the mechanical limits
            Command::MoveGimbal(target) => {
                settings.position = GimbalPosition {
                    yaw: target.yaw.clamp(*YAW_RANGE.start(), *YAW_RANGE.end()),
                    pitch: target.pitch.clamp(*PITCH_RANGE.start(), *PITCH_RANGE.end()),
                    roll: target.roll,
                };
                settings.speed = GimbalSpeed::STOP;
            }
            Command::MoveGimbalBySpeed(speed) => {
                settings.speed = GimbalSpeed {
                    yaw: speed.yaw.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end()),
                    pitch: speed.pitch.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end()),
                };
            }
            Command::AiTracking(enabled) => settings.ai_tracking = *enabled,
            Command::Zoom(level) => {
                settings.zoom = (*level).clamp(*ZOOM_RANGE.start(), *ZOOM_RANGE.end())
            }
            Command::Fov(fov) => settings.fov = *fov,
            Command::AutoFocusMode(mode) => settings.focus_mode = *mode,
            Command::ManualFocusPosition(position) => {
                settings.focus_position = (*position).clamp(*FOCUS_RANGE.start(), *FOCUS_RANGE.end())
            }
            Command::FaceFocus(enabled) => settings.face_focus = *enabled,
            Command::Hdr(enabled) => settings.hdr = *enabled,
            Command::WhiteBalance { kind, manual_value } => {
                settings.white_balance = *kind;
                if *kind == WhiteBalanceType::Manual {
                    settings.white_balance_manual = *manual_value;
                }
            }
            Command::MediaMode(mode) => settings.media_mode = *mode,
            Command::SavePreset { id, name } => {
                settings
                    .presets
                    .insert(*id, (name.clone(), settings.position));
            }
            Command::MoveToPreset(id) => {
                let position = settings
                    .presets
                    .get(id)
                    .map(|(_, position)| *position)
                    .ok_or(SdkError::UnknownPreset(*id))?;
                settings.position = position;
                settings.speed = GimbalSpeed::STOP;
            }
        }
        Ok(())
    }

    fn read(&self, parameter: Parameter) -> SdkResult<Reading> {
        let settings = &self.settings;
        if self.unreadable.contains(&parameter) {
            return match parameter {
                Parameter::Zoom | Parameter::Hdr => Err(SdkError::ReadFailed(parameter)),
                _ => Ok(Reading::Code(UNREADABLE_SENTINEL)),
            };
        }
        if let Some(reading) = self.forced.get(&parameter) {
            return Ok(*reading);
        }
        Ok(match parameter {
            Parameter::Zoom => Reading::Ratio(settings.zoom),
            Parameter::AutoFocusMode => Reading::Code(settings.focus_mode.code()),
            Parameter::ManualFocusPosition => Reading::Code(settings.focus_position),
            Parameter::Hdr => Reading::Flag(settings.hdr),
            Parameter::WhiteBalanceType => Reading::Code(settings.white_balance.code()),
        })
    }
}

#[derive(Default)]
struct SimulatorState {
    initialized: bool,
    attached: Vec<SimulatedCamera>,
    /// Unplugged cameras keep their stored settings until they come back
    parked: HashMap<String, SimulatedCamera>,
    enumerated: Vec<DeviceInfo>,
    invocations: Vec<Invocation>,
}

impl SimulatorState {
    fn ensure_initialized(&self) -> SdkResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(SdkError::NotInitialized)
        }
    }

    fn reachable_camera(&mut self, serial: &str) -> SdkResult<&mut SimulatedCamera> {
        let camera = self
            .attached
            .iter_mut()
            .find(|camera| camera.info.serial == serial)
            .ok_or_else(|| SdkError::DeviceNotFound(serial.to_owned()))?;
        if !camera.reachable {
            return Err(SdkError::Unreachable(serial.to_owned()));
        }
        Ok(camera)
    }

    fn camera_mut(&mut self, serial: &str) -> Option<&mut SimulatedCamera> {
        self.attached
            .iter_mut()
            .find(|camera| camera.info.serial == serial)
    }
}

/// In-memory camera SDK.
///
/// Behaves like the vendor SDK from the facade's point of view: cameras are
/// attached and detached with [`plug`](SimulatedSdk::plug) and
/// [`unplug`](SimulatedSdk::unplug), which publish hotplug events, and every
/// delivered command is recorded so callers can check which camera it reached.
pub struct SimulatedSdk {
    state: Mutex<SimulatorState>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(SimulatorState::default()),
            events,
        }
    }
}

impl SimulatedSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulator with cameras already attached when the SDK starts
    pub fn with_devices(devices: impl IntoIterator<Item = DeviceInfo>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(SimulatorState {
                attached: devices.into_iter().map(SimulatedCamera::new).collect(),
                ..SimulatorState::default()
            }),
            events,
        }
    }

    /// Attach a camera and publish a connect event
    pub async fn plug(&self, info: DeviceInfo) {
        let serial = info.serial.clone();
        {
            let mut state = self.state.lock().await;
            if state.camera_mut(&serial).is_some() {
                return;
            }
            let camera = match state.parked.remove(&serial) {
                Some(mut camera) => {
                    camera.info = info;
                    camera
                }
                None => SimulatedCamera::new(info),
            };
            state.attached.push(camera);
        }
        debug!(%serial, "simulated camera attached");
        let _ = self.events.send(ConnectionEvent {
            serial,
            connected: true,
        });
    }

    /// Detach a camera and publish a disconnect event
    pub async fn unplug(&self, serial: &str) {
        {
            let mut state = self.state.lock().await;
            let Some(index) = state
                .attached
                .iter()
                .position(|camera| camera.info.serial == serial)
            else {
                return;
            };
            let camera = state.attached.remove(index);
            state.parked.insert(serial.to_owned(), camera);
        }
        debug!(%serial, "simulated camera detached");
        let _ = self.events.send(ConnectionEvent {
            serial: serial.to_owned(),
            connected: false,
        });
    }

    /// Keep a camera attached but make it stop answering
    pub async fn set_reachable(&self, serial: &str, reachable: bool) {
        if let Some(camera) = self.state.lock().await.camera_mut(serial) {
            camera.reachable = reachable;
        }
    }

    /// Make a parameter report the firmware's unreadable state
    pub async fn set_unreadable(&self, serial: &str, parameter: Parameter, unreadable: bool) {
        if let Some(camera) = self.state.lock().await.camera_mut(serial) {
            if unreadable {
                camera.unreadable.insert(parameter);
            } else {
                camera.unreadable.remove(&parameter);
            }
        }
    }

    /// Make a parameter report `reading` regardless of the stored settings,
    /// as firmware newer than this crate might; `None` restores normal reads
    pub async fn force_reading(
        &self,
        serial: &str,
        parameter: Parameter,
        reading: Option<Reading>,
    ) {
        if let Some(camera) = self.state.lock().await.camera_mut(serial) {
            match reading {
                Some(reading) => camera.forced.insert(parameter, reading),
                None => camera.forced.remove(&parameter),
            };
        }
    }

    /// Every command delivered so far, oldest first
    pub async fn invocations(&self) -> Vec<Invocation> {
        self.state.lock().await.invocations.clone()
    }

    pub async fn settings(&self, serial: &str) -> Option<SimulatedSettings> {
        self.state
            .lock()
            .await
            .camera_mut(serial)
            .map(|camera| camera.settings.clone())
    }
}

#[async_trait]
impl CameraSdk for SimulatedSdk {
    async fn initialize(&self) -> SdkResult<()> {
        self.state.lock().await.initialized = true;
        Ok(())
    }

    async fn scan(&self) -> SdkResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_initialized()?;
        state.enumerated = state
            .attached
            .iter()
            .map(|camera| camera.info.clone())
            .collect();
        Ok(())
    }

    async fn devices(&self) -> SdkResult<Vec<DeviceInfo>> {
        let state = self.state.lock().await;
        state.ensure_initialized()?;
        Ok(state.enumerated.clone())
    }

    async fn open(&self, serial: &str) -> SdkResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_initialized()?;
        state.reachable_camera(serial).map(|_| ())
    }

    async fn send(&self, serial: &str, command: Command) -> SdkResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_initialized()?;
        state.reachable_camera(serial)?.apply(&command)?;
        state.invocations.push(Invocation {
            serial: serial.to_owned(),
            command,
        });
        Ok(())
    }

    async fn read(&self, serial: &str, parameter: Parameter) -> SdkResult<Reading> {
        let mut state = self.state.lock().await;
        state.ensure_initialized()?;
        state.reachable_camera(serial)?.read(parameter)
    }

    fn connection_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }
}
