//! Floating media carousel: a headless playback controller for a list of
//! videos, images, and gifs.

pub mod config;
pub mod controller;
pub mod error;
pub mod link;
pub mod loader;
pub mod media;
pub mod timer;

pub use config::PlayerConfig;
pub use controller::{PlaybackController, PlaybackState, PlayerState, PlayerView};
pub use error::MediaLoadError;
pub use loader::{
    event_channel, Capabilities, EventReceiver, EventSender, ImageLoader, LinkOpener, LoadHandle,
    LoadRequest, LoadTicket, LoaderEvent, PlayerEvent, VideoLoader, VideoSession,
};
pub use media::{MediaItem, MediaList, MediaType};
pub use timer::{AutoAdvanceTimer, TimerToken};
