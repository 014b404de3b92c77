//! Rendering surface – the host capability the capture pipeline runs on.
//!
//! Two things live behind the [`RenderingSurface`] trait:
//!
//! 1. Colour resolution: painting a CSS colour on a 1×1 pixmap and reading
//!    the channels back. This resolves colour functions the capture styling
//!    layer cannot parse (it only speaks the legacy sRGB forms).
//! 2. Container bookkeeping: staging areas attach an off-screen container
//!    for the duration of a capture and must detach it afterwards.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tiny_skia::Pixmap;

use crate::color::{self, Color};

/// Handle to a container attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

pub trait RenderingSurface {
    /// Resolve any CSS colour value to sRGB channels, or `None` when the
    /// value is not a colour this surface understands.
    fn resolve_css_color(&self, value: &str) -> Option<Color>;

    /// Register an off-screen container. The caller owns the id and must
    /// pass it back to [`detach_container`](Self::detach_container).
    fn attach_container(&self) -> ContainerId;

    /// Remove a previously attached container. Unknown ids are ignored.
    fn detach_container(&self, id: ContainerId);

    /// Number of containers currently attached.
    fn attached_count(&self) -> usize;
}

/// Software surface backed by tiny-skia. This is the only implementation in
/// the crate; the trait exists so tests can observe or fake the bookkeeping.
pub struct PixelSurface {
    next_id: AtomicU64,
    containers: Mutex<HashSet<ContainerId>>,
}

impl PixelSurface {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            containers: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for PixelSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingSurface for PixelSurface {
    fn resolve_css_color(&self, value: &str) -> Option<Color> {
        let parsed = color::parse_css(value)?;
        if parsed.is_transparent() {
            return Some(Color::TRANSPARENT);
        }
        // Paint on a 1×1 pixmap and read the channels back, so the value we
        // report is exactly what this surface would put on screen.
        let mut pixmap = Pixmap::new(1, 1)?;
        let paint_color = tiny_skia::Color::from_rgba(
            parsed.r.clamp(0.0, 1.0),
            parsed.g.clamp(0.0, 1.0),
            parsed.b.clamp(0.0, 1.0),
            parsed.a.clamp(0.0, 1.0),
        )?;
        pixmap.fill(paint_color);
        let px = pixmap.pixels()[0].demultiply();
        Some(Color {
            r: px.red() as f32 / 255.0,
            g: px.green() as f32 / 255.0,
            b: px.blue() as f32 / 255.0,
            a: px.alpha() as f32 / 255.0,
        })
    }

    fn attach_container(&self) -> ContainerId {
        let id = ContainerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut containers) = self.containers.lock() {
            containers.insert(id);
        }
        id
    }

    fn detach_container(&self, id: ContainerId) {
        if let Ok(mut containers) = self.containers.lock() {
            containers.remove(&id);
        }
    }

    fn attached_count(&self) -> usize {
        self.containers.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_legacy_and_modern_colors() {
        let surface = PixelSurface::new();
        let red = surface.resolve_css_color("rgb(255, 0, 0)").unwrap();
        assert!(red.r > 0.99 && red.g < 0.01);

        let oklch_red = surface.resolve_css_color("oklch(0.628 0.2577 29.23)").unwrap();
        assert!(oklch_red.r > 0.95);
        assert!(oklch_red.g < 0.1);
    }

    #[test]
    fn transparent_resolves_to_sentinel() {
        let surface = PixelSurface::new();
        let c = surface.resolve_css_color("transparent").unwrap();
        assert!(c.is_transparent());
        assert_eq!(c.to_css_string(), "transparent");
    }

    #[test]
    fn non_color_values_are_rejected() {
        let surface = PixelSurface::new();
        assert!(surface.resolve_css_color("12px solid").is_none());
        assert!(surface.resolve_css_color("url(foo.png)").is_none());
    }

    #[test]
    fn container_attach_detach_roundtrip() {
        let surface = PixelSurface::new();
        assert_eq!(surface.attached_count(), 0);
        let a = surface.attach_container();
        let b = surface.attach_container();
        assert_ne!(a, b);
        assert_eq!(surface.attached_count(), 2);
        surface.detach_container(a);
        // Detaching twice is harmless.
        surface.detach_container(a);
        assert_eq!(surface.attached_count(), 1);
        surface.detach_container(b);
        assert_eq!(surface.attached_count(), 0);
    }
}
