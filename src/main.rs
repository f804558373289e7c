use anyhow::{Context, Result};
use pip_player::link::SystemLinkOpener;
use pip_player::loader::image::HttpImageLoader;
use pip_player::{
    event_channel, Capabilities, MediaList, PlaybackController, PlayerConfig, PlayerState,
    PlayerView, VideoLoader,
};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(playlist) = args.next() else {
        anyhow::bail!("usage: pip-player <playlist.json | url> [config.toml]");
    };
    let config_path = args.next();
    let config = PlayerConfig::load(config_path.as_deref().map(Path::new))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let media = if playlist.starts_with("http://") || playlist.starts_with("https://") {
        MediaList::fetch(&client, &playlist).await?
    } else {
        MediaList::from_file(Path::new(&playlist)).await?
    };
    tracing::info!("Loaded {} media items", media.len());

    let (events, mut event_rx) = event_channel();
    let (video, frame_size) = video_backend()?;
    let capabilities = Capabilities {
        video,
        image: Box::new(HttpImageLoader::with_client(client, config.image_cache_entries)),
        links: Box::new(SystemLinkOpener),
    };
    let mut controller = PlaybackController::new(media, config.dwell(), capabilities, events)
        .with_close_handler(|| tracing::info!("Player dismissed"));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_view = controller.view();
    report(&last_view, frame_size());

    while controller.state() != PlayerState::Hidden {
        tokio::select! {
            Some(event) = event_rx.recv() => controller.handle(event),
            line = stdin.next_line(), if stdin_open => match line.context("Failed to read stdin")? {
                Some(line) => apply_command(&mut controller, line.trim()),
                None => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => controller.close(),
        }

        let view = controller.view();
        if view != last_view {
            report(&view, frame_size());
            last_view = view;
        }
    }

    Ok(())
}

/// Dimensions of the latest decoded video frame, if any.
type FrameSize = Box<dyn Fn() -> Option<(u32, u32)>>;

#[cfg(feature = "gstreamer")]
fn video_backend() -> Result<(Box<dyn VideoLoader>, FrameSize)> {
    let loader = pip_player::loader::video::GstVideoLoader::init()?;
    let frames = loader.frames();
    let frame_size: FrameSize =
        Box::new(move || frames.current().map(|frame| (frame.width, frame.height)));
    Ok((Box::new(loader), frame_size))
}

#[cfg(not(feature = "gstreamer"))]
fn video_backend() -> Result<(Box<dyn VideoLoader>, FrameSize)> {
    tracing::warn!("Built without the gstreamer feature, videos will fail to load");
    Ok((
        Box::new(pip_player::loader::video::UnavailableVideoLoader),
        Box::new(|| None),
    ))
}

fn apply_command(controller: &mut PlaybackController, command: &str) {
    match command {
        "n" => controller.next(),
        "p" => controller.prev(),
        "r" => controller.retry(),
        "o" => controller.activate(),
        "h" => controller.set_visible(false),
        "s" => controller.set_visible(true),
        "c" | "q" => controller.close(),
        "" => {}
        other => match other.parse::<usize>() {
            Ok(index) => controller.jump_to(index),
            Err(_) => tracing::warn!("Unknown command: {}", other),
        },
    }
}

fn report(view: &PlayerView, frame: Option<(u32, u32)>) {
    let id = view.current.as_ref().map(|item| item.id.as_str()).unwrap_or("-");
    if let Some((width, height)) = frame {
        tracing::debug!("Video frame {}x{}", width, height);
    }
    match &view.error_message {
        Some(message) => tracing::info!(
            "[{}/{}] {} {:?}: {} (r to retry)",
            view.current_index + 1,
            view.len,
            id,
            view.state,
            message
        ),
        None => tracing::info!(
            "[{}/{}] {} {:?}",
            view.current_index + 1,
            view.len,
            id,
            view.state
        ),
    }
}
