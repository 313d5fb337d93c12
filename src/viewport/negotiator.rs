//! Viewport scale and remote-resize negotiation for one session.

use super::{RenderSurface, ScaleMode, Size, compute_scale, map_to_remote};
use crate::session::LiveTransport;
use par_remote_config::ViewportConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

struct ViewportState {
    container: Option<Size>,
    display: Option<Size>,
    scale: f64,
    mode: ScaleMode,
    attached: bool,
    surface: Option<Arc<dyn RenderSurface>>,
    /// Latest container size waiting for the debounce window to close
    pending_resize: Option<Size>,
    resize_timer: Option<JoinHandle<()>>,
    initial_fit: Option<JoinHandle<()>>,
}

impl ViewportState {
    fn abort_timers(&mut self) {
        if let Some(timer) = self.resize_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.initial_fit.take() {
            timer.abort();
        }
        self.pending_resize = None;
    }
}

/// Keeps one session's framebuffer scaled to its container.
///
/// Cloning yields another handle to the same state. Surface and transport
/// calls are made after the state lock is released.
#[derive(Clone)]
pub struct ViewportNegotiator {
    state: Arc<Mutex<ViewportState>>,
    transport: LiveTransport,
    config: ViewportConfig,
    runtime: Handle,
}

impl ViewportNegotiator {
    pub fn new(config: ViewportConfig, transport: LiveTransport, runtime: Handle) -> Self {
        let mode = if config.auto_scale {
            ScaleMode::Fit
        } else {
            ScaleMode::Native
        };
        Self {
            state: Arc::new(Mutex::new(ViewportState {
                container: None,
                display: None,
                scale: 1.0,
                mode,
                attached: false,
                surface: None,
                pending_resize: None,
                resize_timer: None,
                initial_fit: None,
            })),
            transport,
            config,
            runtime,
        }
    }

    /// Bind a surface and start observing. Re-attaching the same surface is a no-op.
    pub fn attach(&self, surface: Arc<dyn RenderSurface>) {
        {
            let mut state = self.state.lock();
            if state.attached
                && state
                    .surface
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &surface))
            {
                return;
            }
            state.surface = Some(surface);
            state.attached = true;
        }
        crate::debug_info!("VIEWPORT", "Surface attached");
        self.recompute();
    }

    /// Stop observing and cancel pending timers. Idempotent.
    pub fn detach(&self) {
        let mut state = self.state.lock();
        if !state.attached && state.resize_timer.is_none() && state.initial_fit.is_none() {
            return;
        }
        state.attached = false;
        state.surface = None;
        state.abort_timers();
        crate::debug_info!("VIEWPORT", "Surface detached");
    }

    /// Cancel pending resize and fit timers, keeping the surface attached
    pub fn cancel_timers(&self) {
        self.state.lock().abort_timers();
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    /// Current scale factor (1.0 until both sizes are known)
    pub fn scale(&self) -> f64 {
        self.state.lock().scale
    }

    pub fn mode(&self) -> ScaleMode {
        self.state.lock().mode
    }

    pub fn display_size(&self) -> Option<Size> {
        self.state.lock().display
    }

    pub fn container_size(&self) -> Option<Size> {
        self.state.lock().container
    }

    /// Local container coordinate to remote framebuffer coordinate,
    /// clamped to the display when its size is known
    pub fn to_remote(&self, x: f64, y: f64) -> (u32, u32) {
        let (scale, display) = {
            let state = self.state.lock();
            (state.scale, state.display)
        };
        let (rx, ry) = map_to_remote(x, y, scale);
        match display {
            Some(d) if !d.is_empty() => (rx.min(d.width - 1), ry.min(d.height - 1)),
            _ => (rx, ry),
        }
    }

    /// Host UI measured a new container size
    pub fn on_container_resized(&self, size: Size) {
        {
            let mut state = self.state.lock();
            if !state.attached {
                crate::debug_trace!("VIEWPORT", "Container resize {} ignored while detached", size);
                return;
            }
            state.container = Some(size);
        }
        crate::debug_log!("VIEWPORT", "Container resized to {}", size);
        self.recompute();
        self.schedule_remote_resize(size);
    }

    /// Transport reported the remote display size
    pub fn on_display_resized(&self, size: Size) {
        self.state.lock().display = Some(size);
        crate::debug_log!("VIEWPORT", "Remote display is {}", size);
        self.recompute();
    }

    pub fn set_mode(&self, mode: ScaleMode) {
        self.state.lock().mode = mode;
        self.recompute();
    }

    /// One-shot refit after the first `Connected`, once layout has settled
    pub fn schedule_initial_fit(&self) {
        let delay = Duration::from_millis(self.config.initial_fit_delay_ms);
        let this = self.clone();
        let mut state = self.state.lock();
        if let Some(previous) = state.initial_fit.take() {
            previous.abort();
        }
        state.initial_fit = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            this.refit();
        }));
    }

    /// Toggle the fit mode off and on again to force a recompute
    fn refit(&self) {
        let auto = {
            let mut state = self.state.lock();
            state.initial_fit = None;
            if !state.attached {
                return;
            }
            state.mode == ScaleMode::Fit
        };
        if auto {
            self.set_mode(ScaleMode::Native);
            self.set_mode(ScaleMode::Fit);
            // The remote may still be at its connect-time size
            if let Some(container) = self.container_size() {
                self.schedule_remote_resize(container);
            }
        }
    }

    fn recompute(&self) {
        let (scale, surface) = {
            let mut state = self.state.lock();
            if !state.attached {
                return;
            }
            let scale = match state.mode {
                ScaleMode::Native => 1.0,
                ScaleMode::Fit => {
                    let (Some(container), Some(display)) = (state.container, state.display)
                    else {
                        // Display size not reported yet
                        return;
                    };
                    match compute_scale(container, display) {
                        Some(scale) => scale,
                        None => return,
                    }
                }
            };
            state.scale = scale;
            (scale, state.surface.clone())
        };
        crate::debug_log!("VIEWPORT", "Scale set to {:.5}", scale);
        if let Some(surface) = surface {
            surface.apply_scale(scale);
        }
    }

    /// Trailing debounce: each call restarts the window, the last size wins
    fn schedule_remote_resize(&self, size: Size) {
        if !self.config.auto_scale || !self.config.dynamic_resize || size.is_empty() {
            return;
        }
        let delay = Duration::from_millis(self.config.resize_debounce_ms);
        let state_ref = Arc::clone(&self.state);
        let transport = self.transport.clone();

        let mut state = self.state.lock();
        state.pending_resize = Some(size);
        if let Some(previous) = state.resize_timer.take() {
            previous.abort();
        }
        state.resize_timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let pending = {
                let mut state = state_ref.lock();
                state.resize_timer = None;
                if !state.attached {
                    return;
                }
                state.pending_resize.take()
            };
            let Some(size) = pending else { return };
            let sent = transport.with(|t| {
                if !t.capabilities().dynamic_resize {
                    return false;
                }
                if let Err(e) = t.send_size(size) {
                    log::warn!("Remote resize to {} failed: {}", size, e);
                }
                true
            });
            match sent {
                Some(true) => log::debug!("Requested remote resize to {}", size),
                Some(false) => crate::debug_trace!("VIEWPORT", "Transport has no dynamic resize"),
                None => crate::debug_trace!("VIEWPORT", "No live transport for resize"),
            }
        }));
    }
}

impl std::fmt::Debug for ViewportNegotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ViewportNegotiator")
            .field("container", &state.container)
            .field("display", &state.display)
            .field("scale", &state.scale)
            .field("mode", &state.mode)
            .field("attached", &state.attached)
            .finish()
    }
}
