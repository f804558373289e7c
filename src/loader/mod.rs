//! Loader capabilities and the events they report.
//!
//! Loaders never touch controller state. They report back through an
//! [`EventSender`], tagging every message with the [`LoadTicket`] they were
//! issued, and the controller decides whether the result is still relevant.

pub mod image;
pub mod video;

use crate::error::MediaLoadError;
use crate::timer::TimerToken;
use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Tag attached to every load the controller issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    /// Index of the item the load was issued for.
    pub index: usize,
    /// Dispatch counter at issue time.
    pub attempt: u64,
}

/// What a loader wants done with an item.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub src: String,
}

/// Progress reported by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    /// Image fully decoded, or video able to play.
    Ready,
    /// Video stalled waiting for data.
    Buffering,
    /// Load or decode failed.
    Failed(MediaLoadError),
    /// Video playback finished naturally.
    Ended,
}

/// Everything that can wake the controller besides a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Loader { ticket: LoadTicket, event: LoaderEvent },
    TimerFired(TimerToken),
}

/// Receiving half of the controller's event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<PlayerEvent>;

/// Sending half of the controller's event channel, cloned into every loader
/// task and timer.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<PlayerEvent>,
}

/// Create the event channel the host drains into the controller.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}

impl EventSender {
    pub fn send(&self, event: PlayerEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Player event dropped, receiver is gone");
        }
    }

    pub fn loader(&self, ticket: LoadTicket, event: LoaderEvent) {
        self.send(PlayerEvent::Loader { ticket, event });
    }
}

/// Handle to an in-flight image load.
///
/// Canceling (or dropping) aborts the background task if there is one. A
/// result already queued on the channel is not recalled; the ticket check in
/// the controller discards it.
#[derive(Debug, Default)]
pub struct LoadHandle {
    task: Option<AbortHandle>,
}

impl LoadHandle {
    /// Handle for a load with no task to abort.
    pub fn detached() -> Self {
        Self { task: None }
    }

    pub fn from_task(task: AbortHandle) -> Self {
        Self { task: Some(task) }
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LoadHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Out-of-band image loading.
pub trait ImageLoader: Send {
    /// Start loading `request.src`. Exactly one `Ready` or `Failed` is sent
    /// for the ticket unless the handle is canceled first.
    fn load(&mut self, request: LoadRequest, events: EventSender) -> LoadHandle;
}

/// Binds a source to a playback resource.
pub trait VideoLoader: Send {
    /// Bind `request.src` and start playing. An `Err` means the resource
    /// could not even be created. Start-of-playback refusals are not errors.
    fn bind(
        &mut self,
        request: LoadRequest,
        events: EventSender,
    ) -> std::result::Result<Box<dyn VideoSession>, MediaLoadError>;
}

/// A bound video resource. Owned by the controller only.
pub trait VideoSession: Send {
    /// Stop playback and detach the source. Safe to call more than once.
    fn release(&mut self);
}

/// Opens a redirect URL in a new browsing context.
pub trait LinkOpener: Send {
    fn open(&self, url: &str) -> Result<()>;
}

/// The injectable capabilities a controller is built with.
pub struct Capabilities {
    pub video: Box<dyn VideoLoader>,
    pub image: Box<dyn ImageLoader>,
    pub links: Box<dyn LinkOpener>,
}
