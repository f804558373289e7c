//! Playback state machine for the floating carousel.
//!
//! The controller owns the current index, the dwell timer, the bound video
//! session, and the in-flight image load. Loaders and the timer report back
//! through the event channel; the host drains that channel into
//! [`PlaybackController::handle`] on the same loop that delivers user actions.

use crate::error::MediaLoadError;
use crate::loader::{
    Capabilities, EventSender, ImageLoader, LinkOpener, LoadHandle, LoadRequest, LoadTicket,
    LoaderEvent, PlayerEvent, VideoLoader, VideoSession,
};
use crate::media::{MediaItem, MediaList};
use crate::timer::{AutoAdvanceTimer, TimerToken};
use std::time::Duration;

/// What the presentation layer should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Dismissed, or nothing to show. Terminal.
    Hidden,
    Loading,
    Ready,
    Error,
}

/// Raw flags describing the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_index: usize,
    pub is_visible: bool,
    pub is_loading: bool,
    pub has_error: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub state: PlayerState,
    pub current_index: usize,
    pub len: usize,
    /// Prev/next buttons and dots.
    pub show_navigation: bool,
    pub show_retry: bool,
    pub error_message: Option<String>,
    pub current: Option<MediaItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    Ready,
    Error,
}

type CloseHandler = Box<dyn FnOnce() + Send>;

pub struct PlaybackController {
    media: MediaList,
    index: usize,
    phase: Phase,
    /// Host-driven visibility. Independent of `closed`.
    visible: bool,
    closed: bool,
    /// Bumped on every dispatch and invalidation; part of every ticket.
    attempt: u64,
    last_error: Option<MediaLoadError>,

    timer: AutoAdvanceTimer,
    active_video: Option<Box<dyn VideoSession>>,
    pending_image: Option<LoadHandle>,

    video_loader: Box<dyn VideoLoader>,
    image_loader: Box<dyn ImageLoader>,
    links: Box<dyn LinkOpener>,
    on_close: Option<CloseHandler>,
    events: EventSender,
}

impl PlaybackController {
    /// Create a controller and start loading the first item.
    ///
    /// An empty list yields a controller that is permanently hidden.
    pub fn new(
        media: MediaList,
        dwell: Duration,
        capabilities: Capabilities,
        events: EventSender,
    ) -> Self {
        let Capabilities {
            video,
            image,
            links,
        } = capabilities;

        let mut controller = Self {
            closed: media.is_empty(),
            media,
            index: 0,
            phase: Phase::Loading,
            visible: true,
            attempt: 0,
            last_error: None,
            timer: AutoAdvanceTimer::new(dwell),
            active_video: None,
            pending_image: None,
            video_loader: video,
            image_loader: image,
            links,
            on_close: None,
            events,
        };

        if controller.closed {
            tracing::info!("Media list is empty, player stays hidden");
        } else {
            controller.dispatch_load();
        }
        controller
    }

    /// Callback invoked once when the user dismisses the player.
    pub fn with_close_handler(mut self, handler: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(handler));
        self
    }

    pub fn state(&self) -> PlayerState {
        if self.closed {
            return PlayerState::Hidden;
        }
        match self.phase {
            Phase::Loading => PlayerState::Loading,
            Phase::Ready => PlayerState::Ready,
            Phase::Error => PlayerState::Error,
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            current_index: self.index,
            is_visible: self.visible && !self.closed,
            is_loading: !self.closed && self.phase == Phase::Loading,
            has_error: !self.closed && self.phase == Phase::Error,
        }
    }

    pub fn view(&self) -> PlayerView {
        let state = self.state();
        let error_message = (state == PlayerState::Error).then(|| {
            let kind = match self.current_item() {
                Some(item) if item.media_type.is_video() => "video",
                _ => "image",
            };
            format!("Failed to load {}", kind)
        });

        PlayerView {
            state,
            current_index: self.index,
            len: self.media.len(),
            show_navigation: state != PlayerState::Hidden && self.has_navigation(),
            show_retry: state == PlayerState::Error,
            error_message,
            current: self.current_item().cloned(),
        }
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    pub fn current_item(&self) -> Option<&MediaItem> {
        self.media.get(self.index)
    }

    pub fn last_error(&self) -> Option<&MediaLoadError> {
        self.last_error.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible && !self.closed
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn has_active_video(&self) -> bool {
        self.active_video.is_some()
    }

    fn has_navigation(&self) -> bool {
        self.media.len() > 1
    }

    fn is_active(&self) -> bool {
        !self.closed && self.visible
    }

    pub fn next(&mut self) {
        if !self.is_active() || !self.has_navigation() {
            return;
        }
        self.go_to(self.media.next_index(self.index));
    }

    pub fn prev(&mut self) {
        if !self.is_active() || !self.has_navigation() {
            return;
        }
        self.go_to(self.media.prev_index(self.index));
    }

    /// Jump to a dot. Out-of-range indices are ignored.
    pub fn jump_to(&mut self, index: usize) {
        if !self.is_active() {
            return;
        }
        if index >= self.media.len() {
            tracing::warn!(
                "Ignoring jump to {} in a list of {}",
                index,
                self.media.len()
            );
            return;
        }
        self.go_to(index);
    }

    /// Reload the current item, even though the index does not change.
    pub fn retry(&mut self) {
        if !self.is_active() {
            return;
        }
        tracing::info!("Retrying item {}", self.index);
        self.dispatch_load();
    }

    /// Dismiss the player. The close handler runs exactly once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        tracing::info!("Player closed");
        self.closed = true;
        self.invalidate();
        if let Some(handler) = self.on_close.take() {
            handler();
        }
    }

    /// Host-driven visibility. Hiding releases resources; showing again
    /// reloads the current item.
    pub fn set_visible(&mut self, visible: bool) {
        if self.closed || self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            tracing::debug!("Player visible again, resuming item {}", self.index);
            self.dispatch_load();
        } else {
            tracing::debug!("Player hidden, releasing resources");
            self.invalidate();
        }
    }

    /// The user clicked the current item.
    pub fn activate(&self) {
        if !self.is_active() {
            return;
        }
        let Some(url) = self.current_item().and_then(MediaItem::link) else {
            return;
        };
        if let Err(e) = self.links.open(url) {
            tracing::warn!("Failed to open {}: {:#}", url, e);
        }
    }

    /// Apply an event from a loader or the timer.
    pub fn handle(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Loader { ticket, event } => self.on_loader_event(ticket, event),
            PlayerEvent::TimerFired(token) => self.on_timer_fired(token),
        }
    }

    fn on_loader_event(&mut self, ticket: LoadTicket, event: LoaderEvent) {
        if !self.is_current(ticket) {
            tracing::debug!(
                "Discarding stale {:?} for item {} (attempt {})",
                event,
                ticket.index,
                ticket.attempt
            );
            return;
        }
        let Some(is_video) = self.current_item().map(|item| item.media_type.is_video()) else {
            return;
        };

        match event {
            LoaderEvent::Ready => {
                if self.phase == Phase::Error {
                    return;
                }
                self.phase = Phase::Ready;
                if !is_video {
                    self.pending_image = None;
                    if self.has_navigation() {
                        self.timer.arm(&self.events);
                    }
                }
            }
            LoaderEvent::Buffering => {
                if is_video && self.phase == Phase::Ready {
                    self.phase = Phase::Loading;
                }
            }
            LoaderEvent::Failed(error) => {
                tracing::warn!("Item {} failed: {}", self.index, error);
                self.release();
                self.phase = Phase::Error;
                self.last_error = Some(error);
            }
            LoaderEvent::Ended => {
                if is_video && self.phase != Phase::Error && self.has_navigation() {
                    self.advance();
                }
            }
        }
    }

    fn on_timer_fired(&mut self, token: TimerToken) {
        if !self.timer.take_fired(token) {
            tracing::debug!("Discarding stale timer firing");
            return;
        }
        if self.is_active() && self.phase == Phase::Ready && self.has_navigation() {
            self.advance();
        }
    }

    fn is_current(&self, ticket: LoadTicket) -> bool {
        self.is_active() && ticket.index == self.index && ticket.attempt == self.attempt
    }

    fn advance(&mut self) {
        self.go_to(self.media.next_index(self.index));
    }

    fn go_to(&mut self, index: usize) {
        self.index = index;
        self.dispatch_load();
    }

    /// Start a fresh load of the current item. Every path that (re)loads
    /// goes through here.
    fn dispatch_load(&mut self) {
        self.invalidate();
        self.phase = Phase::Loading;
        self.last_error = None;

        let Some(item) = self.media.get(self.index) else {
            return;
        };
        let request = LoadRequest {
            ticket: LoadTicket {
                index: self.index,
                attempt: self.attempt,
            },
            src: item.src.clone(),
        };
        tracing::info!(
            "Loading {} {} ({}/{})",
            item.media_type.as_str(),
            item.id,
            self.index + 1,
            self.media.len()
        );

        if item.media_type.is_video() {
            match self.video_loader.bind(request, self.events.clone()) {
                Ok(session) => self.active_video = Some(session),
                Err(error) => {
                    tracing::warn!("Video failed to bind: {}", error);
                    self.phase = Phase::Error;
                    self.last_error = Some(error);
                }
            }
        } else {
            self.pending_image = Some(self.image_loader.load(request, self.events.clone()));
        }
    }

    /// Release everything and make all outstanding results stale.
    fn invalidate(&mut self) {
        self.release();
        self.attempt += 1;
    }

    /// The single release point for the timer, the video session, and the
    /// in-flight image load.
    fn release(&mut self) {
        self.timer.cancel();
        if let Some(mut session) = self.active_video.take() {
            session.release();
        }
        if let Some(mut load) = self.pending_image.take() {
            load.cancel();
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.release();
    }
}
