//! Core `Config` struct definition.
//!
//! Settings are grouped into sections that map one-to-one onto YAML
//! mappings. Every field carries a serde default so partial config files
//! load cleanly.
//!
//! # Sub-modules
//!
//! - [`persistence`] — `load` / `save`, path helpers, path validation

mod persistence;

use crate::defaults;
use crate::types::LogLevel;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway (guacd-style proxy) address used by gateway-mediated sessions
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Viewport scaling and dynamic resize
    #[serde(default)]
    pub viewport: ViewportConfig,

    /// Keyboard / pointer forwarding and synthetic key sequences
    #[serde(default)]
    pub input: InputConfig,

    /// Clipboard stream limits
    #[serde(default)]
    pub clipboard: ClipboardConfig,

    /// Session lifecycle timing
    #[serde(default)]
    pub session: SessionConfig,

    /// Preview polling for non-live sessions
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Terminal-mode (text session) metrics
    #[serde(default)]
    pub text_session: TextSessionConfig,

    /// Log level for the debug log file
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Address of the remote-desktop gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "crate::defaults::gateway_host")]
    pub host: String,

    #[serde(default = "crate::defaults::gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: defaults::gateway_host(),
            port: defaults::gateway_port(),
        }
    }
}

/// Settings controlling how the remote framebuffer fits the local surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Fit the remote display into the container (aspect preserving).
    /// When disabled the scale factor stays at 1.0.
    #[serde(default = "crate::defaults::bool_true")]
    pub auto_scale: bool,

    /// Ask the remote side to adopt the container size, when the transport
    /// supports it
    #[serde(default = "crate::defaults::bool_true")]
    pub dynamic_resize: bool,

    /// Quiet period before the latest container size is sent to the remote
    #[serde(default = "crate::defaults::resize_debounce_ms")]
    pub resize_debounce_ms: u64,

    /// Delay after first connect before forcing a scale recompute
    #[serde(default = "crate::defaults::initial_fit_delay_ms")]
    pub initial_fit_delay_ms: u64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            auto_scale: defaults::bool_true(),
            dynamic_resize: defaults::bool_true(),
            resize_debounce_ms: defaults::resize_debounce_ms(),
            initial_fit_delay_ms: defaults::initial_fit_delay_ms(),
        }
    }
}

/// Input forwarding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Open new sessions in view-only mode
    #[serde(default = "crate::defaults::bool_false")]
    pub view_only_by_default: bool,

    /// Pause between press and release of a synthetic chord
    #[serde(default = "crate::defaults::chord_settle_ms")]
    pub chord_settle_ms: u64,

    /// Pause after stage 1 of a three-stage system combo
    #[serde(default = "crate::defaults::combo_first_settle_ms")]
    pub combo_first_settle_ms: u64,

    /// Pause after stage 2 of a three-stage system combo
    #[serde(default = "crate::defaults::combo_second_settle_ms")]
    pub combo_second_settle_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            view_only_by_default: defaults::bool_false(),
            chord_settle_ms: defaults::chord_settle_ms(),
            combo_first_settle_ms: defaults::combo_first_settle_ms(),
            combo_second_settle_ms: defaults::combo_second_settle_ms(),
        }
    }
}

/// Clipboard synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// Write inbound remote clipboard text to the local system clipboard
    #[serde(default = "crate::defaults::bool_true")]
    pub sync_inbound: bool,

    /// Largest inbound stream accepted, in decoded bytes
    #[serde(default = "crate::defaults::clipboard_max_inbound_bytes")]
    pub max_inbound_bytes: usize,

    /// Size of each outbound base64 blob
    #[serde(default = "crate::defaults::clipboard_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            sync_inbound: defaults::bool_true(),
            max_inbound_bytes: defaults::clipboard_max_inbound_bytes(),
            chunk_size: defaults::clipboard_chunk_size(),
        }
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Window in which repeated open requests for one target collapse
    #[serde(default = "crate::defaults::connect_guard_ms")]
    pub connect_guard_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_guard_ms: defaults::connect_guard_ms(),
        }
    }
}

/// Preview (non-live snapshot) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "crate::defaults::preview_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::preview_poll_interval_secs(),
        }
    }
}

/// Cell metrics used to turn container pixels into terminal cols/rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSessionConfig {
    #[serde(default = "crate::defaults::text_cell_width")]
    pub cell_width: u32,

    #[serde(default = "crate::defaults::text_cell_height")]
    pub cell_height: u32,
}

impl Default for TextSessionConfig {
    fn default() -> Self {
        Self {
            cell_width: defaults::text_cell_width(),
            cell_height: defaults::text_cell_height(),
        }
    }
}

impl Config {
    /// Clamp out-of-range values in place, logging a warning for each fix.
    pub fn validate(&mut self) {
        if self.gateway.host.trim().is_empty() {
            log::warn!("gateway.host is empty, using {}", defaults::gateway_host());
            self.gateway.host = defaults::gateway_host();
        }

        let debounce = self.viewport.resize_debounce_ms.clamp(50, 5_000);
        if debounce != self.viewport.resize_debounce_ms {
            log::warn!(
                "viewport.resize_debounce_ms {} out of range, using {}",
                self.viewport.resize_debounce_ms,
                debounce
            );
            self.viewport.resize_debounce_ms = debounce;
        }

        let max_inbound = self
            .clipboard
            .max_inbound_bytes
            .clamp(defaults::CLIPBOARD_MIN_BYTES, defaults::CLIPBOARD_MAX_BYTES);
        if max_inbound != self.clipboard.max_inbound_bytes {
            log::warn!(
                "clipboard.max_inbound_bytes {} out of range, using {}",
                self.clipboard.max_inbound_bytes,
                max_inbound
            );
            self.clipboard.max_inbound_bytes = max_inbound;
        }

        // Base64 chunks must be a multiple of 4 so every blob decodes on its own
        let chunk = (self.clipboard.chunk_size.clamp(1024, 65_536) / 4) * 4;
        if chunk != self.clipboard.chunk_size {
            log::warn!(
                "clipboard.chunk_size {} adjusted to {}",
                self.clipboard.chunk_size,
                chunk
            );
            self.clipboard.chunk_size = chunk;
        }

        if self.preview.poll_interval_secs == 0 {
            log::warn!("preview.poll_interval_secs must be positive, using 1");
            self.preview.poll_interval_secs = 1;
        }

        if self.text_session.cell_width == 0 || self.text_session.cell_height == 0 {
            log::warn!("text_session cell metrics must be positive, using defaults");
            self.text_session = TextSessionConfig::default();
        }
    }
}
