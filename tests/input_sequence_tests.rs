//! Input forwarding, view-only mode and synthetic key sequences.

mod common;

use common::{MockHost, Sent, connect_and_open, settle};
use par_remote::ConnectionParams;
use par_remote::input::{InputMode, InputOutcome, SequenceOutcome};
use par_remote::transport::{ButtonMask, TransportEvent};
use par_remote_input::keysym::{XK_ALT_L, XK_CONTROL_L, XK_DELETE, XK_SUPER_L};
use par_remote_input::{KeyChord, KeyInput, PowerAction, SystemCombo};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use winit::keyboard::{Key, KeyCode, NamedKey, PhysicalKey};

fn vnc() -> ConnectionParams {
    ConnectionParams::vnc_relay("desk.lan", 5900)
}

fn ctrl(pressed: bool) -> KeyInput {
    KeyInput::new(
        Key::Named(NamedKey::Control),
        PhysicalKey::Code(KeyCode::ControlLeft),
        pressed,
    )
}

// ============================================================================
// Direct forwarding and view-only
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_keys_forwarded_and_modifiers_tracked() {
    let host = MockHost::new();
    let session = host.session(vnc());
    let connection = connect_and_open(&host, &session).await;

    assert_eq!(session.input().handle_key(&ctrl(true)), InputOutcome::Forwarded);
    assert!(session.input().modifiers().control);
    assert_eq!(session.input().handle_key(&ctrl(false)), InputOutcome::Forwarded);
    assert!(!session.input().modifiers().control);

    assert_eq!(
        connection.log.keys(),
        vec![(XK_CONTROL_L, true), (XK_CONTROL_L, false)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_view_only_swallows_input() {
    let host = MockHost::new();
    let session = host.session(vnc().with_view_only(true));
    let connection = connect_and_open(&host, &session).await;
    assert_eq!(session.input_mode(), InputMode::ViewOnly);
    assert!(!session.input().cursor_visible());

    assert_eq!(session.input().pointer_moved(10.0, 10.0), InputOutcome::Swallowed);
    assert_eq!(session.input().handle_key(&ctrl(true)), InputOutcome::Swallowed);
    assert_eq!(
        session.input().send_chord(&KeyChord::lock_screen()).await,
        SequenceOutcome::ViewOnly
    );
    assert!(connection.log.messages().is_empty());

    // Rendering side stays up
    assert!(session.has_transport());

    assert_eq!(session.toggle_view_only(), InputMode::Interactive);
    assert_eq!(session.input().pointer_moved(10.0, 10.0), InputOutcome::Forwarded);
}

#[tokio::test(start_paused = true)]
async fn test_entering_view_only_clears_held_state() {
    let host = MockHost::new();
    let session = host.session(vnc());
    connect_and_open(&host, &session).await;

    session.input().handle_key(&ctrl(true));
    session.input().pointer_button(ButtonMask::LEFT, true);
    assert!(session.input().modifiers().control);

    session.set_input_mode(InputMode::ViewOnly);

    assert!(!session.input().modifiers().control);
    assert_eq!(session.input().buttons(), ButtonMask::NONE);
}

#[tokio::test(start_paused = true)]
async fn test_input_without_transport_reports_not_connected() {
    let host = MockHost::new();
    let session = host.session(vnc());

    assert_eq!(
        session.input().pointer_moved(1.0, 1.0),
        InputOutcome::NotConnected
    );
    assert_eq!(session.input().handle_key(&ctrl(true)), InputOutcome::NotConnected);
    assert_eq!(
        session.input().send_secure_attention().await,
        SequenceOutcome::NotConnected
    );
}

#[tokio::test(start_paused = true)]
async fn test_scroll_sends_press_release_pairs() {
    let host = MockHost::new();
    let session = host.session(vnc());
    let connection = connect_and_open(&host, &session).await;

    session.input().pointer_scrolled(-2);

    let masks: Vec<ButtonMask> = connection
        .log
        .messages()
        .into_iter()
        .filter_map(|m| match m {
            Sent::Pointer(p) => Some(p.buttons),
            _ => None,
        })
        .collect();
    assert_eq!(
        masks,
        vec![
            ButtonMask::SCROLL_DOWN,
            ButtonMask::NONE,
            ButtonMask::SCROLL_DOWN,
            ButtonMask::NONE
        ]
    );
}

// ============================================================================
// Synthetic sequences
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_chord_press_and_release_order() {
    let host = MockHost::new();
    let session = host.session(vnc());
    let connection = connect_and_open(&host, &session).await;

    let outcome = session.input().request_remote_clipboard().await;

    assert_eq!(outcome, SequenceOutcome::Completed);
    let c = 'c' as u32;
    assert_eq!(
        connection.log.keys(),
        vec![
            (XK_CONTROL_L, true),
            (c, true),
            (c, false),
            (XK_CONTROL_L, false)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_system_combo_stages_and_delays() {
    let host = MockHost::new();
    let session = host.session(vnc());
    let connection = connect_and_open(&host, &session).await;

    let start = Instant::now();
    let outcome = session
        .input()
        .send_system_combo(&SystemCombo::power_menu(PowerAction::Restart))
        .await;
    assert_eq!(outcome, SequenceOutcome::Completed);

    let (x, u, r) = ('x' as u32, 'u' as u32, 'r' as u32);
    assert_eq!(
        connection.log.keys(),
        vec![
            (XK_SUPER_L, true),
            (x, true),
            (x, false),
            (XK_SUPER_L, false),
            (u, true),
            (u, false),
            (r, true),
            (r, false),
        ]
    );

    let at: Vec<Duration> = connection
        .log
        .all()
        .into_iter()
        .map(|r| r.at - start)
        .collect();
    // Opener press, chord settle, release
    assert_eq!(at[0], Duration::ZERO);
    assert_eq!(at[2], Duration::from_millis(50));
    // Stage 2 after the first settle, stage 3 after the second
    assert_eq!(at[4], Duration::from_millis(550));
    assert_eq!(at[6], Duration::from_millis(850));
}

#[tokio::test(start_paused = true)]
async fn test_system_combo_aborts_when_session_closes() {
    let host = MockHost::new();
    let session = host.session(vnc());
    let connection = connect_and_open(&host, &session).await;

    let input = session.input().clone();
    let combo = tokio::spawn(async move {
        input
            .send_system_combo(&SystemCombo::power_menu(PowerAction::Shutdown))
            .await
    });
    sleep(Duration::from_millis(200)).await;
    connection.emit(TransportEvent::Closed);
    settle().await;

    let outcome = combo.await.unwrap();
    assert_eq!(outcome, SequenceOutcome::Aborted { stage: 2 });
    // Only the opener chord reached the remote
    assert_eq!(connection.log.keys().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_system_combo_stops_when_view_only_during_settle() {
    let host = MockHost::new();
    let session = host.session(vnc());
    let connection = connect_and_open(&host, &session).await;

    let input = session.input().clone();
    let combo = tokio::spawn(async move {
        input
            .send_system_combo(&SystemCombo::power_menu(PowerAction::Shutdown))
            .await
    });
    sleep(Duration::from_millis(200)).await;
    session.set_input_mode(InputMode::ViewOnly);

    let outcome = combo.await.unwrap();
    assert_eq!(outcome, SequenceOutcome::Aborted { stage: 2 });
    // Opener pressed and released, nothing after it
    assert_eq!(
        connection.log.keys(),
        vec![
            (XK_SUPER_L, true),
            ('x' as u32, true),
            ('x' as u32, false),
            (XK_SUPER_L, false),
        ]
    );
    assert!(session.has_transport());
}

#[tokio::test(start_paused = true)]
async fn test_system_combo_skips_action_when_view_only_before_last_stage() {
    let host = MockHost::new();
    let session = host.session(vnc());
    let connection = connect_and_open(&host, &session).await;

    let input = session.input().clone();
    let combo = tokio::spawn(async move {
        input
            .send_system_combo(&SystemCombo::power_menu(PowerAction::Shutdown))
            .await
    });
    sleep(Duration::from_millis(700)).await;
    session.set_input_mode(InputMode::ViewOnly);

    let outcome = combo.await.unwrap();
    assert_eq!(outcome, SequenceOutcome::Aborted { stage: 3 });
    let keys = connection.log.keys();
    assert_eq!(keys.len(), 6);
    assert_eq!(keys[4..], [('u' as u32, true), ('u' as u32, false)]);
}

#[tokio::test(start_paused = true)]
async fn test_secure_attention_uses_native_primitive() {
    let host = MockHost::new();
    host.display.capabilities.lock().native_secure_attention = true;
    let session = host.session(vnc());
    let connection = connect_and_open(&host, &session).await;

    let outcome = session.input().send_secure_attention().await;

    assert_eq!(outcome, SequenceOutcome::Completed);
    assert_eq!(connection.log.messages(), vec![Sent::SecureAttention]);
}

#[tokio::test(start_paused = true)]
async fn test_secure_attention_falls_back_to_chord() {
    let host = MockHost::new();
    let session = host.session(vnc());
    let connection = connect_and_open(&host, &session).await;

    let outcome = session.input().send_secure_attention().await;

    assert_eq!(outcome, SequenceOutcome::Completed);
    assert_eq!(
        connection.log.keys(),
        vec![
            (XK_CONTROL_L, true),
            (XK_ALT_L, true),
            (XK_DELETE, true),
            (XK_DELETE, false),
            (XK_ALT_L, false),
            (XK_CONTROL_L, false),
        ]
    );
}
