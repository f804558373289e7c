//! Single-owner auto-advance countdown.

use crate::loader::{EventSender, PlayerEvent};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Identifies one arming of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

struct Armed {
    token: TimerToken,
    task: JoinHandle<()>,
}

/// Dwell timer for images and gifs.
///
/// At most one countdown is outstanding. Arming replaces the previous one and
/// a firing is only honored if its token is the one currently armed.
pub struct AutoAdvanceTimer {
    dwell: Duration,
    next_token: u64,
    armed: Option<Armed>,
}

impl AutoAdvanceTimer {
    pub fn new(dwell: Duration) -> Self {
        Self {
            dwell,
            next_token: 0,
            armed: None,
        }
    }

    /// Start a countdown, canceling any outstanding one. Must be called from
    /// within a tokio runtime.
    pub fn arm(&mut self, events: &EventSender) -> TimerToken {
        self.cancel();

        self.next_token += 1;
        let token = TimerToken(self.next_token);
        let dwell = self.dwell;
        let events = events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(dwell).await;
            events.send(PlayerEvent::TimerFired(token));
        });

        tracing::debug!("Auto-advance armed for {:?}", dwell);
        self.armed = Some(Armed { token, task });
        token
    }

    /// Cancel the outstanding countdown, if any.
    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.task.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Consume a firing. Returns true only for the armed token.
    pub fn take_fired(&mut self, token: TimerToken) -> bool {
        if self.armed.as_ref().is_some_and(|armed| armed.token == token) {
            self.armed = None;
            true
        } else {
            false
        }
    }
}

impl Drop for AutoAdvanceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
