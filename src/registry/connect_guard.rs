use crate::session::SessionId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Collapses repeated open requests for one target into a single session.
///
/// Leading edge: the first request opens a session; later requests for the
/// same target within the window resolve to that session.
#[derive(Debug)]
pub struct ConnectGuard {
    window: Duration,
    recent: HashMap<String, (Instant, SessionId)>,
}

impl ConnectGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            recent: HashMap::new(),
        }
    }

    /// Session opened for `target` within the window, if any
    pub fn check(&mut self, target: &str, now: Instant) -> Option<SessionId> {
        self.recent
            .retain(|_, (opened, _)| now.saturating_duration_since(*opened) < self.window);
        self.recent.get(target).map(|(_, id)| *id)
    }

    pub fn record(&mut self, target: String, session: SessionId, now: Instant) {
        self.recent.insert(target, (now, session));
    }

    /// Forget any entry pointing at `session`
    pub fn forget(&mut self, session: SessionId) {
        self.recent.retain(|_, (_, id)| *id != session);
    }
}
