//! Synthetic key sequences: chords, staged system combos and secure attention.
//!
//! Stage order is kept with explicit sleeps. Every key re-resolves the live
//! transport, so a session that disconnects mid-sequence stops receiving keys.

use super::{InputBridge, InputMode, is_disconnect};
use par_remote_input::{KeyChord, RemoteKey, SECURE_ATTENTION, SystemCombo};
use std::time::Duration;

/// Result of a synthetic sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    Completed,
    /// Session is view-only; nothing was sent
    ViewOnly,
    /// No live transport when the sequence started
    NotConnected,
    /// Transport went away or the session became view-only mid-sequence;
    /// `stage` is the first stage that did not run (1-based)
    Aborted { stage: u8 },
}

impl InputBridge {
    /// Press modifiers then key, settle, release in reverse order
    pub async fn send_chord(&self, chord: &KeyChord) -> SequenceOutcome {
        if let Some(outcome) = self.precheck() {
            return outcome;
        }
        log::debug!("Sending chord {:?}", chord);
        if self.run_chord(chord).await {
            SequenceOutcome::Completed
        } else {
            SequenceOutcome::Aborted { stage: 1 }
        }
    }

    /// Three stages separated by the configured settle delays
    pub async fn send_system_combo(&self, combo: &SystemCombo) -> SequenceOutcome {
        if let Some(outcome) = self.precheck() {
            return outcome;
        }
        log::debug!("Sending system combo {:?}", combo);

        if !self.run_chord(&combo.opener).await {
            return SequenceOutcome::Aborted { stage: 1 };
        }

        tokio::time::sleep(Duration::from_millis(self.config().combo_first_settle_ms)).await;
        if let Some(outcome) = self.stage_gate(2) {
            return outcome;
        }
        if !self.tap(combo.menu_key) {
            log::info!("System combo aborted before stage 2: transport gone");
            return SequenceOutcome::Aborted { stage: 2 };
        }

        tokio::time::sleep(Duration::from_millis(self.config().combo_second_settle_ms)).await;
        if let Some(outcome) = self.stage_gate(3) {
            return outcome;
        }
        if !self.tap(combo.action_key) {
            log::info!("System combo aborted before stage 3: transport gone");
            return SequenceOutcome::Aborted { stage: 3 };
        }

        SequenceOutcome::Completed
    }

    /// Ctrl+Alt+Del, through the native primitive when the transport has one
    pub async fn send_secure_attention(&self) -> SequenceOutcome {
        if let Some(outcome) = self.precheck() {
            return outcome;
        }
        let native = self.transport().with(|t| {
            if t.capabilities().native_secure_attention {
                Some(t.send_secure_attention())
            } else {
                None
            }
        });
        match native {
            None => SequenceOutcome::NotConnected,
            Some(Some(Ok(()))) => SequenceOutcome::Completed,
            Some(Some(Err(e))) => {
                log::warn!("Native secure attention failed: {}", e);
                SequenceOutcome::Aborted { stage: 1 }
            }
            Some(None) => {
                let [modifiers @ .., key] = SECURE_ATTENTION;
                self.send_chord(&KeyChord::new(modifiers.to_vec(), key)).await
            }
        }
    }

    /// Ask the remote to copy its selection; the result arrives on the
    /// inbound clipboard stream
    pub async fn request_remote_clipboard(&self) -> SequenceOutcome {
        self.send_chord(&KeyChord::copy()).await
    }

    fn precheck(&self) -> Option<SequenceOutcome> {
        if self.mode() == InputMode::ViewOnly {
            return Some(SequenceOutcome::ViewOnly);
        }
        if !self.transport().is_live() {
            return Some(SequenceOutcome::NotConnected);
        }
        None
    }

    /// View-only can be switched on during a settle delay
    fn stage_gate(&self, stage: u8) -> Option<SequenceOutcome> {
        if self.mode() == InputMode::ViewOnly {
            log::info!("System combo stopped before stage {}: view-only", stage);
            return Some(SequenceOutcome::Aborted { stage });
        }
        None
    }

    async fn run_chord(&self, chord: &KeyChord) -> bool {
        for keysym in chord.press_order() {
            if !self.emit(keysym, true) {
                return false;
            }
        }
        tokio::time::sleep(Duration::from_millis(self.config().chord_settle_ms)).await;
        for keysym in chord.release_order() {
            if !self.emit(keysym, false) {
                return false;
            }
        }
        true
    }

    fn tap(&self, keysym: u32) -> bool {
        self.emit(keysym, true) && self.emit(keysym, false)
    }

    /// False when there is no transport left to send to
    fn emit(&self, keysym: u32, pressed: bool) -> bool {
        let result = self.transport().with(|t| {
            let key = RemoteKey::synthetic(keysym, t.code_space());
            t.send_key(&key, pressed)
        });
        match result {
            None => false,
            Some(Ok(())) => true,
            Some(Err(e)) if is_disconnect(&e) => false,
            Some(Err(e)) => {
                log::debug!("Synthetic key 0x{:X} failed: {}", keysym, e);
                true
            }
        }
    }
}
