//! Deterministic loaders for driving the controller headlessly.

#![allow(dead_code)]

use anyhow::Result;
use pip_player::{
    event_channel, Capabilities, EventReceiver, EventSender, ImageLoader, LinkOpener, LoadHandle,
    LoadRequest, LoadTicket, LoaderEvent, MediaItem, MediaList, MediaLoadError, MediaType,
    PlaybackController, PlayerEvent, VideoLoader, VideoSession,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DWELL: Duration = Duration::from_secs(3);

#[derive(Debug, Default)]
pub struct Log {
    pub image_loads: Vec<LoadRequest>,
    pub video_binds: Vec<LoadRequest>,
    pub video_releases: usize,
    pub opened: Vec<String>,
    pub fail_video_bind: bool,
}

/// Shared record of everything the fakes were asked to do.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Log>>,
}

impl Recorder {
    pub fn with<T>(&self, f: impl FnOnce(&mut Log) -> T) -> T {
        f(&mut self.log.lock().unwrap())
    }

    pub fn image_loads(&self) -> usize {
        self.with(|log| log.image_loads.len())
    }

    pub fn video_binds(&self) -> usize {
        self.with(|log| log.video_binds.len())
    }

    pub fn video_releases(&self) -> usize {
        self.with(|log| log.video_releases)
    }

    pub fn last_image(&self) -> LoadTicket {
        self.with(|log| log.image_loads.last().expect("no image load issued").ticket)
    }

    pub fn last_video(&self) -> LoadTicket {
        self.with(|log| log.video_binds.last().expect("no video bind issued").ticket)
    }

    pub fn opened(&self) -> Vec<String> {
        self.with(|log| log.opened.clone())
    }

    pub fn fail_video_binds(&self, fail: bool) {
        self.with(|log| log.fail_video_bind = fail);
    }
}

pub struct FakeImageLoader(Recorder);

impl ImageLoader for FakeImageLoader {
    fn load(&mut self, request: LoadRequest, _events: EventSender) -> LoadHandle {
        self.0.with(|log| log.image_loads.push(request));
        LoadHandle::detached()
    }
}

pub struct FakeVideoLoader(Recorder);

impl VideoLoader for FakeVideoLoader {
    fn bind(
        &mut self,
        request: LoadRequest,
        _events: EventSender,
    ) -> std::result::Result<Box<dyn VideoSession>, MediaLoadError> {
        let src = request.src.clone();
        let fail = self.0.with(|log| {
            log.video_binds.push(request);
            log.fail_video_bind
        });
        if fail {
            return Err(MediaLoadError::pipeline(&src, "no decoder"));
        }
        Ok(Box::new(FakeSession {
            recorder: self.0.clone(),
            released: false,
        }))
    }
}

struct FakeSession {
    recorder: Recorder,
    released: bool,
}

impl VideoSession for FakeSession {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.recorder.with(|log| log.video_releases += 1);
        }
    }
}

pub struct FakeLinks(Recorder);

impl LinkOpener for FakeLinks {
    fn open(&self, url: &str) -> Result<()> {
        self.0.with(|log| log.opened.push(url.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub controller: PlaybackController,
    pub recorder: Recorder,
    pub events: EventReceiver,
    pub closes: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new(items: Vec<MediaItem>) -> Self {
        let recorder = Recorder::default();
        let (sender, events) = event_channel();
        let capabilities = Capabilities {
            video: Box::new(FakeVideoLoader(recorder.clone())),
            image: Box::new(FakeImageLoader(recorder.clone())),
            links: Box::new(FakeLinks(recorder.clone())),
        };
        let closes = Arc::new(AtomicUsize::new(0));
        let counter = closes.clone();
        let controller =
            PlaybackController::new(MediaList::new(items), DWELL, capabilities, sender)
                .with_close_handler(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });

        Self {
            controller,
            recorder,
            events,
            closes,
        }
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn deliver(&mut self, ticket: LoadTicket, event: LoaderEvent) {
        self.controller.handle(PlayerEvent::Loader { ticket, event });
    }

    /// Wait for the next queued event and feed it to the controller.
    pub async fn pump(&mut self) -> PlayerEvent {
        let event = self.events.recv().await.expect("event channel closed");
        self.controller.handle(event.clone());
        event
    }
}

pub fn image(id: &str) -> MediaItem {
    MediaItem::new(id, format!("https://cdn.test/{}.png", id), MediaType::Image)
}

pub fn gif(id: &str) -> MediaItem {
    MediaItem::new(id, format!("https://cdn.test/{}.gif", id), MediaType::Gif)
}

pub fn video(id: &str) -> MediaItem {
    MediaItem::new(id, format!("https://cdn.test/{}.mp4", id), MediaType::Video)
}

pub fn failure(src: &str) -> LoaderEvent {
    LoaderEvent::Failed(MediaLoadError::fetch(src, "404 Not Found"))
}
