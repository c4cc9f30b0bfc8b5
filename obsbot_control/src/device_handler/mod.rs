use crate::{
    config::{Config, Constrained, RangePolicy},
    model::{
        types::{ConnectionEvent, DeviceInfo},
        ObsbotError, ObsbotResult,
    },
    sdk::{CameraSdk, Command, Parameter, Reading, SdkError, UNREADABLE_SENTINEL},
};
use std::{
    ops::RangeInclusive,
    sync::{Arc, Weak},
};
use tokio::sync::{
    broadcast::error::{RecvError, TryRecvError},
    RwLock,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod camera;
pub mod events;
pub mod gimbal;
pub mod preset;

pub use events::{CallbackHandle, ConnectionEvents};

/// Session state owned by the facade; everything else lives in the SDK
#[derive(Default)]
struct Session {
    initialized: bool,
    /// Device list captured by the last scan, indexed by callers
    devices: Vec<DeviceInfo>,
    selected: Option<DeviceInfo>,
}

struct Inner {
    sdk: Arc<dyn CameraSdk>,
    range_policy: RangePolicy,
    default_device: Option<String>,
    session: RwLock<Session>,
    shutdown: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Control session for the cameras reachable through one SDK instance.
///
/// Cloning is cheap and every clone addresses the same session, so the
/// handle can be passed to each part of the application that needs it.
/// [`initialize`](CameraControl::initialize) must run before anything else.
#[derive(Clone)]
pub struct CameraControl {
    inner: Arc<Inner>,
}

impl CameraControl {
    pub fn new(sdk: Arc<dyn CameraSdk>, range_policy: RangePolicy) -> Self {
        Self::build(sdk, range_policy, None)
    }

    /// Session using the range policy and default camera from `config`
    pub fn from_config(sdk: Arc<dyn CameraSdk>, config: &Config) -> Self {
        Self::build(sdk, config.range_policy, config.default_device.clone())
    }

    fn build(
        sdk: Arc<dyn CameraSdk>,
        range_policy: RangePolicy,
        default_device: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sdk,
                range_policy,
                default_device,
                session: RwLock::new(Session::default()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Initialize the SDK instance.
    ///
    /// Also starts the task that drops the selection when the selected camera
    /// disconnects. Must be called from within a tokio runtime. A second call
    /// does nothing.
    pub async fn initialize(&self) -> ObsbotResult<()> {
        let mut session = self.inner.session.write().await;
        if session.initialized {
            return Ok(());
        }
        self.inner.sdk.initialize().await?;
        session.initialized = true;
        drop(session);

        tokio::spawn(watch_selection(
            Arc::downgrade(&self.inner),
            self.inner.sdk.connection_events(),
            self.inner.shutdown.clone(),
        ));
        info!("camera SDK initialized");
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.session.read().await.initialized
    }

    /// Rescan for cameras and capture the list that indices refer to
    pub async fn scan_for_devices(&self) -> ObsbotResult<()> {
        self.ensure_initialized().await?;
        self.inner.sdk.scan().await?;
        let devices = self.inner.sdk.devices().await?;
        info!(count = devices.len(), "device scan finished");

        let needs_default = {
            let mut session = self.inner.session.write().await;
            session.devices = devices;
            session.selected.is_none()
        };

        if needs_default {
            if let Some(serial) = self.inner.default_device.clone() {
                if let Err(e) = self.select_device_by_serial(&serial).await {
                    warn!(%serial, error = %e, "configured default camera not selected");
                }
            }
        }
        Ok(())
    }

    /// Number of cameras found by the last scan
    pub async fn device_count(&self) -> usize {
        self.inner.session.read().await.devices.len()
    }

    /// Cameras found by the last scan
    pub async fn devices(&self) -> Vec<DeviceInfo> {
        self.inner.session.read().await.devices.clone()
    }

    /// Display name of the camera at `index`, `None` when out of range
    pub async fn device_name(&self, index: usize) -> Option<String> {
        self.inner
            .session
            .read()
            .await
            .devices
            .get(index)
            .map(|device| device.name.clone())
    }

    /// Select the camera at `index` as the target of control calls.
    ///
    /// Returns `false` for an index outside the last scan, or when the camera
    /// has gone away since that scan or does not answer.
    pub async fn select_device(&self, index: usize) -> bool {
        let device = {
            let session = self.inner.session.read().await;
            if !session.initialized {
                return false;
            }
            match session.devices.get(index) {
                Some(device) => device.clone(),
                None => return false,
            }
        };

        match self.open(device).await {
            Ok(()) => true,
            Err(e) => {
                warn!(index, error = %e, "device selection failed");
                false
            }
        }
    }

    /// Select a camera from the last scan by its serial number
    pub async fn select_device_by_serial(&self, serial: &str) -> ObsbotResult<()> {
        let device = {
            let session = self.inner.session.read().await;
            if !session.initialized {
                return Err(ObsbotError::NotInitialized);
            }
            session
                .devices
                .iter()
                .find(|device| device.serial == serial)
                .cloned()
                .ok_or_else(|| {
                    ObsbotError::DeviceUnavailable(format!("{serial} was not found by the last scan"))
                })?
        };
        self.open(device).await
    }

    async fn open(&self, device: DeviceInfo) -> ObsbotResult<()> {
        // disconnects published from here on are seen either below or by the watcher
        let mut events = self.inner.sdk.connection_events();
        self.inner.sdk.open(&device.serial).await.map_err(unavailable)?;

        let mut session = self.inner.session.write().await;
        let mut connected = true;
        let mut lagged = false;
        loop {
            match events.try_recv() {
                Ok(event) if event.serial == device.serial => connected = event.connected,
                Ok(_) => {}
                Err(TryRecvError::Lagged(_)) => lagged = true,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if lagged && connected {
            self.inner.sdk.open(&device.serial).await.map_err(unavailable)?;
        }
        if !connected {
            return Err(ObsbotError::DeviceUnavailable(format!(
                "{} disconnected while being selected",
                device.serial
            )));
        }

        info!(device = %device, "device selected");
        session.selected = Some(device);
        Ok(())
    }

    pub async fn selected_device(&self) -> Option<DeviceInfo> {
        self.inner.session.read().await.selected.clone()
    }

    /// Forget the current selection
    pub async fn deselect(&self) {
        self.inner.session.write().await.selected = None;
    }

    /// Stream of hotplug events, see [`ConnectionEvents`]
    pub fn subscribe(&self) -> ConnectionEvents {
        ConnectionEvents::new(
            self.inner.sdk.connection_events(),
            self.inner.shutdown.child_token(),
        )
    }

    /// Call `callback` with `(serial, connected)` for every hotplug event.
    ///
    /// The callback runs on a tokio task owned by the returned handle, one
    /// event at a time and in the order the SDK published them. Dropping the
    /// handle unregisters the callback.
    pub fn on_connection_change<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&str, bool) + Send + 'static,
    {
        CallbackHandle::spawn(self.subscribe(), callback)
    }

    async fn ensure_initialized(&self) -> ObsbotResult<()> {
        if self.inner.session.read().await.initialized {
            Ok(())
        } else {
            Err(ObsbotError::NotInitialized)
        }
    }

    /// Serial of the camera control calls go to
    async fn target(&self) -> ObsbotResult<String> {
        let session = self.inner.session.read().await;
        if !session.initialized {
            return Err(ObsbotError::NotInitialized);
        }
        session
            .selected
            .as_ref()
            .map(|device| device.serial.clone())
            .ok_or(ObsbotError::NoDeviceSelected)
    }

    pub(crate) async fn send(&self, command: Command) -> ObsbotResult<()> {
        let serial = self.target().await?;
        debug!(%serial, ?command, "forwarding command");
        self.inner.sdk.send(&serial, command).await?;
        Ok(())
    }

    pub(crate) async fn read(&self, parameter: Parameter) -> ObsbotResult<Reading> {
        let serial = self.target().await?;
        match self.inner.sdk.read(&serial, parameter).await {
            Ok(Reading::Code(UNREADABLE_SENTINEL)) | Err(SdkError::ReadFailed(_)) => {
                Err(ObsbotError::Unreadable(parameter))
            }
            Ok(reading) => Ok(reading),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply the session's range policy to a value bound for `parameter`
    pub(crate) fn constrain<T>(
        &self,
        parameter: &'static str,
        value: T,
        range: RangeInclusive<T>,
    ) -> ObsbotResult<T>
    where
        T: PartialOrd + Copy + Into<f64>,
    {
        match self.inner.range_policy.constrain(value, &range) {
            Constrained::Forward(value) => Ok(value),
            Constrained::Rejected => Err(ObsbotError::OutOfRange {
                parameter,
                value: value.into(),
                min: (*range.start()).into(),
                max: (*range.end()).into(),
            }),
        }
    }
}

fn unavailable(e: SdkError) -> ObsbotError {
    match e {
        SdkError::DeviceNotFound(_) | SdkError::Unreachable(_) => {
            ObsbotError::DeviceUnavailable(e.to_string())
        }
        other => ObsbotError::Sdk(other),
    }
}

/// Drop the selection if the selected camera no longer opens
async fn revalidate_selection(inner: &Inner) {
    let Some(serial) = inner
        .session
        .read()
        .await
        .selected
        .as_ref()
        .map(|device| device.serial.clone())
    else {
        return;
    };
    if let Err(e) = inner.sdk.open(&serial).await {
        let mut session = inner.session.write().await;
        if session
            .selected
            .as_ref()
            .is_some_and(|device| device.serial == serial)
        {
            warn!(%serial, error = %e, "selected device lost while events were missed");
            session.selected = None;
        }
    }
}

/// Clear the selection when the selected camera reports a disconnect
async fn watch_selection(
    inner: Weak<Inner>,
    mut events: tokio::sync::broadcast::Receiver<ConnectionEvent>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => event,
        };
        let event = match event {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "selection watcher missed connection events");
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                revalidate_selection(&inner).await;
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        if event.connected {
            continue;
        }

        let Some(inner) = inner.upgrade() else {
            break;
        };
        let mut session = inner.session.write().await;
        if session
            .selected
            .as_ref()
            .is_some_and(|device| device.serial == event.serial)
        {
            warn!(serial = %event.serial, "selected device disconnected");
            session.selected = None;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sdk::{SdkResult, SimulatedSdk};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Simulator whose cameras drop off the bus right after being opened
    struct DropsAfterOpen(Arc<SimulatedSdk>);

    #[async_trait]
    impl CameraSdk for DropsAfterOpen {
        async fn initialize(&self) -> SdkResult<()> {
            self.0.initialize().await
        }

        async fn scan(&self) -> SdkResult<()> {
            self.0.scan().await
        }

        async fn devices(&self) -> SdkResult<Vec<DeviceInfo>> {
            self.0.devices().await
        }

        async fn open(&self, serial: &str) -> SdkResult<()> {
            self.0.open(serial).await?;
            self.0.unplug(serial).await;
            Ok(())
        }

        async fn send(&self, serial: &str, command: Command) -> SdkResult<()> {
            self.0.send(serial, command).await
        }

        async fn read(&self, serial: &str, parameter: Parameter) -> SdkResult<Reading> {
            self.0.read(serial, parameter).await
        }

        fn connection_events(&self) -> broadcast::Receiver<ConnectionEvent> {
            self.0.connection_events()
        }
    }

    pub(crate) const TINY: &str = "RMOWA1";
    pub(crate) const MEET: &str = "RMOWB2";

    pub(crate) fn cameras() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo::new(TINY, "OBSBOT Tiny 2"),
            DeviceInfo::new(MEET, "OBSBOT Meet 2"),
        ]
    }

    /// Initialized and scanned session over two simulated cameras
    pub(crate) async fn session(policy: RangePolicy) -> (Arc<SimulatedSdk>, CameraControl) {
        let sdk = Arc::new(SimulatedSdk::with_devices(cameras()));
        let control = CameraControl::new(sdk.clone(), policy);
        control.initialize().await.unwrap();
        control.scan_for_devices().await.unwrap();
        (sdk, control)
    }

    /// Poll until `check` holds, giving spawned tasks time to run
    pub(crate) async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_operations_before_initialize() {
        let sdk = Arc::new(SimulatedSdk::with_devices(cameras()));
        let control = CameraControl::new(sdk.clone(), RangePolicy::PassThrough);

        assert!(matches!(
            control.scan_for_devices().await,
            Err(ObsbotError::NotInitialized)
        ));
        assert!(!control.select_device(0).await);
        assert!(matches!(
            control.set_hdr(true).await,
            Err(ObsbotError::NotInitialized)
        ));
        assert!(sdk.invocations().await.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_twice() {
        let (_, control) = session(RangePolicy::PassThrough).await;
        control.initialize().await.unwrap();
        assert!(control.is_initialized().await);
        assert_eq!(control.device_count().await, 2);
    }

    #[tokio::test]
    async fn test_out_of_range_indices() {
        let (_, control) = session(RangePolicy::PassThrough).await;
        let count = control.device_count().await;

        assert_eq!(control.device_name(0).await.as_deref(), Some("OBSBOT Tiny 2"));
        assert_eq!(control.device_name(1).await.as_deref(), Some("OBSBOT Meet 2"));
        for index in [count, count + 1, usize::MAX] {
            assert_eq!(control.device_name(index).await, None);
            assert!(!control.select_device(index).await);
        }
        assert_eq!(control.selected_device().await, None);
    }

    #[tokio::test]
    async fn test_commands_target_selected_device() {
        let (sdk, control) = session(RangePolicy::PassThrough).await;

        assert!(control.select_device(1).await);
        control.set_hdr(true).await.unwrap();
        assert!(control.select_device(0).await);
        control.enable_ai_tracking(true).await.unwrap();

        let targets: Vec<String> = sdk
            .invocations()
            .await
            .into_iter()
            .map(|invocation| invocation.serial)
            .collect();
        assert_eq!(targets, vec![MEET.to_owned(), TINY.to_owned()]);
        assert!(sdk.settings(MEET).await.unwrap().hdr);
        assert!(!sdk.settings(TINY).await.unwrap().hdr);
    }

    #[tokio::test]
    async fn test_control_without_selection() {
        let (sdk, control) = session(RangePolicy::PassThrough).await;

        assert!(matches!(
            control.move_gimbal(10.0, 0.0, 0.0).await,
            Err(ObsbotError::NoDeviceSelected)
        ));
        assert!(matches!(
            control.auto_focus_mode().await,
            Err(ObsbotError::NoDeviceSelected)
        ));
        assert!(matches!(
            control.move_to_preset(1).await,
            Err(ObsbotError::NoDeviceSelected)
        ));
        assert!(sdk.invocations().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_index_fails_selection() {
        let (sdk, control) = session(RangePolicy::PassThrough).await;
        sdk.unplug(TINY).await;

        // the snapshot still lists the camera until the next scan
        assert_eq!(control.device_count().await, 2);
        assert!(!control.select_device(0).await);

        sdk.set_reachable(MEET, false).await;
        assert!(!control.select_device(1).await);

        control.scan_for_devices().await.unwrap();
        assert_eq!(control.device_count().await, 1);
    }

    #[tokio::test]
    async fn test_select_by_serial() {
        let (_, control) = session(RangePolicy::PassThrough).await;
        control.select_device_by_serial(MEET).await.unwrap();
        assert_eq!(
            control.selected_device().await.map(|device| device.serial),
            Some(MEET.to_owned())
        );
        assert!(matches!(
            control.select_device_by_serial("missing").await,
            Err(ObsbotError::DeviceUnavailable(_))
        ));

        control.deselect().await;
        assert_eq!(control.selected_device().await, None);
    }

    #[tokio::test]
    async fn test_default_device_selected_on_scan() {
        let sdk = Arc::new(SimulatedSdk::with_devices(cameras()));
        let config = Config {
            default_device: Some(MEET.to_owned()),
            ..Config::default()
        };
        let control = CameraControl::from_config(sdk, &config);
        control.initialize().await.unwrap();
        control.scan_for_devices().await.unwrap();

        assert_eq!(
            control.selected_device().await.map(|device| device.serial),
            Some(MEET.to_owned())
        );
    }

    #[tokio::test]
    async fn test_selection_cleared_on_disconnect() {
        let (sdk, control) = session(RangePolicy::PassThrough).await;
        assert!(control.select_device(0).await);

        sdk.unplug(MEET).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(control.selected_device().await.is_some());

        sdk.unplug(TINY).await;
        eventually(|| {
            let control = control.clone();
            async move { control.selected_device().await.is_none() }
        })
        .await;
        assert!(matches!(
            control.set_zoom(2.0).await,
            Err(ObsbotError::NoDeviceSelected)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_during_selection() {
        let sim = Arc::new(SimulatedSdk::with_devices(cameras()));
        let control = CameraControl::new(
            Arc::new(DropsAfterOpen(sim.clone())),
            RangePolicy::PassThrough,
        );
        control.initialize().await.unwrap();
        control.scan_for_devices().await.unwrap();

        assert!(!control.select_device(0).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(control.selected_device().await, None);
        assert!(matches!(
            control.select_device_by_serial(MEET).await,
            Err(ObsbotError::DeviceUnavailable(_))
        ));
        assert!(sim.settings(TINY).await.is_none());
    }

    #[tokio::test]
    async fn test_missed_disconnect_still_clears_selection() {
        let (sdk, control) = session(RangePolicy::PassThrough).await;
        assert!(control.select_device(0).await);

        // the disconnect is followed by more events than the watcher buffers
        sdk.unplug(TINY).await;
        for _ in 0..40 {
            sdk.unplug(MEET).await;
            sdk.plug(DeviceInfo::new(MEET, "OBSBOT Meet 2")).await;
        }

        eventually(|| {
            let control = control.clone();
            async move { control.selected_device().await.is_none() }
        })
        .await;
    }
}
