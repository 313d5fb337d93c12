//! Viewport scaling: remote framebuffer pixels to local container pixels.

mod negotiator;

pub use negotiator::ViewportNegotiator;

use std::fmt;

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How the remote display is fitted into the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Scale down or up to fit, preserving aspect ratio
    #[default]
    Fit,
    /// 1:1 pixels
    Native,
}

/// Scale that fits `display` inside `container` preserving aspect ratio.
///
/// `None` when either size has a zero dimension.
pub fn compute_scale(container: Size, display: Size) -> Option<f64> {
    if container.is_empty() || display.is_empty() {
        return None;
    }
    let sx = container.width as f64 / display.width as f64;
    let sy = container.height as f64 / display.height as f64;
    Some(sx.min(sy))
}

/// Map a local container coordinate into remote framebuffer space
pub fn map_to_remote(x: f64, y: f64, scale: f64) -> (u32, u32) {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    let rx = (x / scale).round().max(0.0);
    let ry = (y / scale).round().max(0.0);
    (rx as u32, ry as u32)
}

/// The local surface a session's framebuffer is drawn into.
///
/// Implemented by the host UI. Calls arrive from tokio tasks, never while
/// any session lock is held.
pub trait RenderSurface: Send + Sync {
    /// Draw the remote framebuffer at `scale`
    fn apply_scale(&self, scale: f64);

    /// Raw output for terminal-mode sessions
    fn text_output(&self, _data: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_scale_uses_tighter_axis() {
        let scale = compute_scale(Size::new(800, 600), Size::new(1920, 1080)).unwrap();
        assert!((scale - 0.416_67).abs() < 1e-4);

        let scale = compute_scale(Size::new(1000, 400), Size::new(1000, 1000)).unwrap();
        assert!((scale - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dimension_has_no_scale() {
        assert_eq!(compute_scale(Size::new(0, 600), Size::new(1920, 1080)), None);
        assert_eq!(compute_scale(Size::new(800, 600), Size::new(1920, 0)), None);
    }

    #[test]
    fn test_map_to_remote() {
        let scale = compute_scale(Size::new(800, 600), Size::new(1920, 1080)).unwrap();
        assert_eq!(map_to_remote(400.0, 300.0, scale), (960, 720));
        assert_eq!(map_to_remote(-3.0, 10.0, 1.0), (0, 10));
        assert_eq!(map_to_remote(12.0, 12.0, 0.0), (12, 12));
    }
}
