//! Opening redirect links in the user's browser.

use crate::loader::LinkOpener;
use anyhow::{Context, Result};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::task::JoinHandle;
use url::Url;

/// Hands http(s) links to the platform's URL opener.
#[derive(Debug, Default)]
pub struct SystemLinkOpener;

impl LinkOpener for SystemLinkOpener {
    fn open(&self, url: &str) -> Result<()> {
        let url = parse_link(url)?;
        tracing::info!("Opening {}", url);

        spawn_reaped(opener_command(url.as_str()))
            .with_context(|| format!("Failed to launch browser for {}", url))?;
        Ok(())
    }
}

/// Spawn `command` detached from stdio and wait on it in the background so
/// the exited child is reaped.
fn spawn_reaped(mut command: Command) -> Result<JoinHandle<Option<ExitStatus>>> {
    let runtime = tokio::runtime::Handle::try_current()
        .context("Opening links requires a tokio runtime")?;
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    Ok(runtime.spawn(async move {
        match child.wait().await {
            Ok(status) => {
                if !status.success() {
                    tracing::warn!("Link opener exited with {}", status);
                }
                Some(status)
            }
            Err(e) => {
                tracing::warn!("Failed to wait for link opener: {}", e);
                None
            }
        }
    }))
}

/// Only absolute web links are opened.
pub fn parse_link(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).with_context(|| format!("Invalid link: {}", url))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => anyhow::bail!("Refusing to open {} link: {}", other, url),
    }
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", url]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}
