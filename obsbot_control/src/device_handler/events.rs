//! Hotplug notification delivery.
//!
//! The SDK publishes connection changes on a broadcast channel from whatever
//! thread it uses internally. Subscribers here receive them on their own task,
//! in publication order. A subscriber that falls more than the channel
//! capacity behind skips the oldest events (a warning is logged) rather than
//! stalling the SDK.

use crate::model::types::ConnectionEvent;
use futures::{stream, Stream};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Cancellable subscription to connection changes
pub struct ConnectionEvents {
    rx: broadcast::Receiver<ConnectionEvent>,
    cancel: CancellationToken,
}

impl ConnectionEvents {
    pub(crate) fn new(rx: broadcast::Receiver<ConnectionEvent>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Wait for the next event; `None` once cancelled or the SDK is gone
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                received = self.rx.recv() => received,
            };
            match received {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "connection subscriber fell behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Token that ends this subscription when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn into_stream(self) -> impl Stream<Item = ConnectionEvent> {
        stream::unfold(self, |mut events| async move {
            events.next_event().await.map(|event| (event, events))
        })
    }
}

/// Registration created by [`CameraControl::on_connection_change`](super::CameraControl::on_connection_change).
///
/// The callback stays registered for as long as the handle is alive;
/// dropping the handle unregisters it. Registrations are independent of each
/// other, so several callbacks can listen at once.
#[must_use = "dropping the handle unregisters the callback"]
pub struct CallbackHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl CallbackHandle {
    pub(crate) fn spawn<F>(mut events: ConnectionEvents, callback: F) -> Self
    where
        F: Fn(&str, bool) + Send + 'static,
    {
        let cancel = events.cancellation_token();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next_event().await {
                callback(&event.serial, event.connected);
            }
            debug!("connection callback stopped");
        });
        Self { cancel, task }
    }

    /// Stop delivering events to the callback
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
