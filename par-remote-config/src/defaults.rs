//! Default value functions for configuration.
//!
//! Each function is used as a `#[serde(default = "crate::defaults::...")]`
//! attribute on a config field and by the matching `Default` impl.

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_false() -> bool {
    false
}

pub fn bool_true() -> bool {
    true
}

// ── Gateway ────────────────────────────────────────────────────────────────

pub fn gateway_host() -> String {
    "127.0.0.1".to_string()
}

/// guacd's well-known listening port
pub fn gateway_port() -> u16 {
    4822
}

// ── Viewport ───────────────────────────────────────────────────────────────

pub fn resize_debounce_ms() -> u64 {
    300
}

pub fn initial_fit_delay_ms() -> u64 {
    300
}

// ── Input sequences ────────────────────────────────────────────────────────

pub fn chord_settle_ms() -> u64 {
    50
}

pub fn combo_first_settle_ms() -> u64 {
    500
}

pub fn combo_second_settle_ms() -> u64 {
    300
}

// ── Clipboard ──────────────────────────────────────────────────────────────

/// Minimum accepted inbound clipboard size (256KB)
pub const CLIPBOARD_MIN_BYTES: usize = 256 * 1024;

/// Maximum accepted inbound clipboard size (50MB)
pub const CLIPBOARD_MAX_BYTES: usize = 50 * 1024 * 1024;

pub fn clipboard_max_inbound_bytes() -> usize {
    CLIPBOARD_MIN_BYTES
}

/// 6KB blobs stay well under the 64KB data-channel frame limit
pub fn clipboard_chunk_size() -> usize {
    6144
}

// ── Session ────────────────────────────────────────────────────────────────

pub fn connect_guard_ms() -> u64 {
    100
}

// ── Preview ────────────────────────────────────────────────────────────────

pub fn preview_poll_interval_secs() -> u64 {
    10
}

// ── Text sessions ──────────────────────────────────────────────────────────

pub fn text_cell_width() -> u32 {
    9
}

pub fn text_cell_height() -> u32 {
    18
}
