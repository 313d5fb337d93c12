use std::fmt;

/// Lifecycle state of one session.
///
/// `Idle -> Connecting -> [Waiting] -> Connected -> Disconnecting -> Disconnected`,
/// with `Error` reachable from any in-progress state. `Error` and
/// `Disconnected` end an attempt; reconnecting starts over at `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Connecting,
    Waiting,
    Connected,
    Disconnecting,
    Disconnected,
    Error,
}

impl SessionStatus {
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (Idle | Error | Disconnected, Connecting) => true,
            (Connecting, Waiting | Connected) => true,
            (Waiting, Connected) => true,
            (Connecting | Waiting | Connected, Error) => true,
            (Disconnecting, Disconnected) => true,
            (Disconnecting | Disconnected, Disconnecting) => false,
            (_, Disconnecting) => true,
            _ => false,
        }
    }

    /// A connect attempt is running or established
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionStatus::Connecting | SessionStatus::Waiting | SessionStatus::Connected
        )
    }

    /// The current attempt is over
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Error | SessionStatus::Disconnected)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Connecting => "Connecting",
            SessionStatus::Waiting => "Waiting",
            SessionStatus::Connected => "Connected",
            SessionStatus::Disconnecting => "Disconnecting",
            SessionStatus::Disconnected => "Disconnected",
            SessionStatus::Error => "Error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::SessionStatus::*;

    #[test]
    fn test_happy_path() {
        assert!(Idle.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Waiting));
        assert!(Waiting.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Disconnecting));
        assert!(Disconnecting.can_transition_to(Disconnected));
    }

    #[test]
    fn test_errors_and_restarts() {
        assert!(Connecting.can_transition_to(Error));
        assert!(Connected.can_transition_to(Error));
        assert!(!Idle.can_transition_to(Error));
        assert!(Error.can_transition_to(Connecting));
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Error.can_transition_to(Disconnecting));
    }

    #[test]
    fn test_no_skipping() {
        assert!(!Idle.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(Waiting));
        assert!(!Disconnected.can_transition_to(Disconnecting));
        assert!(!Connected.can_transition_to(Disconnected));
    }
}
