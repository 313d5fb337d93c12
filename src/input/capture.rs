use super::{InputBridge, InputOutcome};
use crate::session::SessionId;
use par_remote_input::KeyInput;

/// The single application-wide keyboard capture point.
///
/// At most one session owns it; raw key events go to the owner only.
#[derive(Debug, Default)]
pub struct KeyboardCapture {
    owner: Option<(SessionId, InputBridge)>,
}

impl KeyboardCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give the capture to `session`, replacing any previous owner
    pub fn acquire(&mut self, session: SessionId, bridge: InputBridge) {
        if let Some((previous, _)) = &self.owner
            && *previous != session
        {
            log::debug!("Keyboard capture moves {} -> {}", previous, session);
        }
        self.owner = Some((session, bridge));
    }

    /// Drop the capture if `session` holds it. Returns whether it did.
    pub fn release(&mut self, session: SessionId) -> bool {
        match &self.owner {
            Some((owner, _)) if *owner == session => {
                self.owner = None;
                log::debug!("Keyboard capture released by {}", session);
                true
            }
            _ => false,
        }
    }

    pub fn owner(&self) -> Option<SessionId> {
        self.owner.as_ref().map(|(id, _)| *id)
    }

    /// Route a raw key event to the owning session
    pub fn dispatch(&self, input: &KeyInput) -> InputOutcome {
        match &self.owner {
            Some((_, bridge)) => bridge.handle_key(input),
            None => InputOutcome::NoOwner,
        }
    }
}
