//! Video loaders.
//!
//! With the `gstreamer` feature, videos are decoded by a GStreamer pipeline
//! whose bus is mapped onto loader events. Without it, every bind fails so the
//! carousel shows the retry affordance instead of stalling.

use super::{EventSender, LoadRequest, LoaderEvent, VideoLoader, VideoSession};
use crate::error::MediaLoadError;
use anyhow::{Context, Result};

/// Video loader used when no playback backend is compiled in.
#[derive(Debug, Default)]
pub struct UnavailableVideoLoader;

impl VideoLoader for UnavailableVideoLoader {
    fn bind(
        &mut self,
        request: LoadRequest,
        _events: EventSender,
    ) -> Result<Box<dyn VideoSession>, MediaLoadError> {
        Err(MediaLoadError::pipeline(
            &request.src,
            "video playback support is not compiled in",
        ))
    }
}

/// Map a buffering level onto the controller's Loading/Ready split.
#[cfg_attr(not(feature = "gstreamer"), allow(dead_code))]
fn buffering_event(percent: i32) -> LoaderEvent {
    if percent < 100 {
        LoaderEvent::Buffering
    } else {
        LoaderEvent::Ready
    }
}

/// URI for a source: URLs pass through, local paths are canonicalized.
#[cfg_attr(not(feature = "gstreamer"), allow(dead_code))]
fn to_uri(src: &str) -> Result<String> {
    if src.contains("://") {
        return Ok(src.to_string());
    }
    let path = std::fs::canonicalize(src).with_context(|| format!("Video not found: {}", src))?;
    url::Url::from_file_path(&path)
        .map(String::from)
        .map_err(|_| anyhow::anyhow!("Cannot express {} as a file URI", path.display()))
}

#[cfg(feature = "gstreamer")]
pub use gst_backend::{FrameSlot, GstVideoLoader, VideoFrame};

#[cfg(feature = "gstreamer")]
mod gst_backend {
    use super::super::{EventSender, LoadRequest, LoadTicket, LoaderEvent, VideoLoader, VideoSession};
    use super::{buffering_event, to_uri};
    use crate::error::MediaLoadError;
    use anyhow::{Context, Result};
    use futures_util::StreamExt;
    use gstreamer as gst;
    use gstreamer::prelude::*;
    use gstreamer_app as gst_app;
    use gstreamer_video as gst_video;
    use std::sync::{Arc, Mutex};
    use tokio::task::JoinHandle;

    /// Video frame extracted from the pipeline.
    #[derive(Clone)]
    pub struct VideoFrame {
        pub pixels: Vec<u8>,
        pub width: u32,
        pub height: u32,
    }

    /// Latest decoded frame of the bound video, shared with the presentation
    /// layer.
    #[derive(Clone, Default)]
    pub struct FrameSlot {
        frame: Arc<Mutex<Option<VideoFrame>>>,
    }

    impl FrameSlot {
        pub fn current(&self) -> Option<VideoFrame> {
            self.frame.lock().ok()?.clone()
        }

        fn store(&self, frame: VideoFrame) {
            if let Ok(mut guard) = self.frame.lock() {
                *guard = Some(frame);
            }
        }

        fn clear(&self) {
            if let Ok(mut guard) = self.frame.lock() {
                *guard = None;
            }
        }
    }

    /// GStreamer-backed video loader.
    pub struct GstVideoLoader {
        frames: FrameSlot,
    }

    impl GstVideoLoader {
        /// Initialize GStreamer (call once at startup).
        pub fn init() -> Result<Self> {
            gst::init().context("Failed to initialize GStreamer")?;
            tracing::info!("GStreamer initialized: {}", gst::version_string());
            Ok(Self {
                frames: FrameSlot::default(),
            })
        }

        pub fn frames(&self) -> FrameSlot {
            self.frames.clone()
        }
    }

    impl VideoLoader for GstVideoLoader {
        fn bind(
            &mut self,
            request: LoadRequest,
            events: EventSender,
        ) -> std::result::Result<Box<dyn VideoSession>, MediaLoadError> {
            let session = GstSession::start(&request, events, self.frames.clone())
                .map_err(|e| MediaLoadError::pipeline(&request.src, format!("{:#}", e)))?;
            Ok(Box::new(session))
        }
    }

    struct GstSession {
        pipeline: Option<gst::Pipeline>,
        bus_task: Option<JoinHandle<()>>,
        frames: FrameSlot,
    }

    impl GstSession {
        fn start(request: &LoadRequest, events: EventSender, frames: FrameSlot) -> Result<Self> {
            let uri = to_uri(&request.src)?;
            tracing::debug!("Binding video: {}", uri);

            let pipeline = gst::Pipeline::new();

            let src = gst::ElementFactory::make("uridecodebin")
                .name("source")
                .property("uri", &uri)
                .build()
                .context("Failed to create uridecodebin")?;

            let convert = gst::ElementFactory::make("videoconvert")
                .name("convert")
                .build()
                .context("Failed to create videoconvert")?;

            let scale = gst::ElementFactory::make("videoscale")
                .name("scale")
                .build()
                .context("Failed to create videoscale")?;

            let appsink = gst_app::AppSink::builder()
                .name("sink")
                .caps(
                    &gst_video::VideoCapsBuilder::new()
                        .format(gst_video::VideoFormat::Rgba)
                        .build(),
                )
                .build();

            pipeline
                .add_many([&src, &convert, &scale, appsink.upcast_ref()])
                .context("Failed to add elements to pipeline")?;
            gst::Element::link_many([&convert, &scale, appsink.upcast_ref()])
                .context("Failed to link elements")?;

            // uridecodebin exposes pads once it has typefound the stream
            let convert_weak = convert.downgrade();
            src.connect_pad_added(move |_src, src_pad| {
                let Some(convert) = convert_weak.upgrade() else {
                    return;
                };
                let Some(sink_pad) = convert.static_pad("sink") else {
                    return;
                };
                if sink_pad.is_linked() {
                    return;
                }

                let caps = src_pad
                    .current_caps()
                    .unwrap_or_else(|| src_pad.query_caps(None));
                let is_video = caps
                    .structure(0)
                    .map(|s| s.name().starts_with("video/"))
                    .unwrap_or(false);

                if is_video {
                    if let Err(e) = src_pad.link(&sink_pad) {
                        tracing::error!("Failed to link pads: {:?}", e);
                    }
                }
            });

            let frame_slot = frames.clone();
            appsink.set_callbacks(
                gst_app::AppSinkCallbacks::builder()
                    .new_sample(move |appsink| {
                        let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                        let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                        let caps = sample.caps().ok_or(gst::FlowError::Error)?;

                        let info = gst_video::VideoInfo::from_caps(caps)
                            .map_err(|_| gst::FlowError::Error)?;
                        let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;

                        frame_slot.store(VideoFrame {
                            pixels: map.as_slice().to_vec(),
                            width: info.width(),
                            height: info.height(),
                        });
                        Ok(gst::FlowSuccess::Ok)
                    })
                    .build(),
            );

            let bus = pipeline.bus().context("Pipeline has no bus")?;
            let bus_task = tokio::spawn(watch_bus(
                bus,
                pipeline.downgrade(),
                request.ticket,
                request.src.clone(),
                events,
            ));

            // Plays once: EOS is reported as Ended so the carousel moves on,
            // there is no seek-to-start loop.
            // Refusing to start playing is logged only; a real failure
            // arrives on the bus as an error message.
            if let Err(e) = pipeline.set_state(gst::State::Playing) {
                tracing::warn!("Playback start prevented for {}: {:?}", request.src, e);
            }

            Ok(Self {
                pipeline: Some(pipeline),
                bus_task: Some(bus_task),
                frames,
            })
        }
    }

    impl VideoSession for GstSession {
        fn release(&mut self) {
            if let Some(task) = self.bus_task.take() {
                task.abort();
            }
            if let Some(pipeline) = self.pipeline.take() {
                if let Err(e) = pipeline.set_state(gst::State::Null) {
                    tracing::warn!("Failed to stop pipeline: {:?}", e);
                }
            }
            self.frames.clear();
        }
    }

    impl Drop for GstSession {
        fn drop(&mut self) {
            self.release();
        }
    }

    async fn watch_bus(
        bus: gst::Bus,
        pipeline: gst::glib::WeakRef<gst::Pipeline>,
        ticket: LoadTicket,
        src: String,
        events: EventSender,
    ) {
        let mut messages = bus.stream();
        while let Some(msg) = messages.next().await {
            match msg.view() {
                gst::MessageView::StateChanged(change) => {
                    let from_pipeline = pipeline
                        .upgrade()
                        .map(|p| msg.src() == Some(p.upcast_ref::<gst::Object>()))
                        .unwrap_or(false);
                    if from_pipeline && change.current() == gst::State::Playing {
                        events.loader(ticket, LoaderEvent::Ready);
                    }
                }
                gst::MessageView::Buffering(buffering) => {
                    events.loader(ticket, buffering_event(buffering.percent()));
                }
                gst::MessageView::Eos(_) => {
                    events.loader(ticket, LoaderEvent::Ended);
                    break;
                }
                gst::MessageView::Error(err) => {
                    tracing::error!("GStreamer error: {} ({:?})", err.error(), err.debug());
                    events.loader(
                        ticket,
                        LoaderEvent::Failed(MediaLoadError::pipeline(&src, err.error())),
                    );
                    break;
                }
                _ => {}
            }
        }
    }

}
