//! Capture staging area – an off-screen clone with guaranteed teardown.
//!
//! Capturing mutates styles (the colour normaliser rewrites declarations),
//! so it never runs on the caller's tree. [`stage`] deep-clones the source
//! into a white-backed off-screen container, normalises the clone against
//! the original, and registers the container with the surface. The returned
//! [`StagedCapture`] detaches the container when released or dropped, so
//! teardown happens on every exit path, including `?` and panics.

use log::debug;

use crate::dom::{DomNode, ElementNode, Tag};
use crate::normalize::normalize_colors;
use crate::surface::{ContainerId, RenderingSurface};

/// Fixed width of the staging container, in CSS pixels. Captures are laid
/// out at this width regardless of the caller's viewport.
pub const CAPTURE_WIDTH: f32 = 800.0;

/// A staged clone ready for rasterisation. Holds the surface registration
/// for the off-screen container until released.
pub struct StagedCapture<'a> {
    surface: &'a dyn RenderingSurface,
    container: Option<ContainerId>,
    root: ElementNode,
    width: f32,
}

/// Clone `source` into an off-screen container on `surface` and normalise
/// the clone's colours.
pub fn stage<'a>(surface: &'a dyn RenderingSurface, source: &ElementNode) -> StagedCapture<'a> {
    let mut clone = source.clone();
    normalize_colors(surface, source, &mut clone);

    let mut container = ElementNode::new(Tag::Div);
    container.set_style_value("background-color", "#ffffff");
    container.set_style_value("width", &format!("{CAPTURE_WIDTH}px"));
    container.children.push(DomNode::Element(clone));

    let id = surface.attach_container();
    debug!("staged capture container {:?}", id);

    StagedCapture {
        surface,
        container: Some(id),
        root: container,
        width: CAPTURE_WIDTH,
    }
}

impl<'a> StagedCapture<'a> {
    /// The container element wrapping the normalised clone.
    pub fn root(&self) -> &ElementNode {
        &self.root
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    /// Detach the container from the surface. Safe to call more than once;
    /// only the first call does anything.
    pub fn release(&mut self) {
        if let Some(id) = self.container.take() {
            self.surface.detach_container(id);
            debug!("released capture container {:?}", id);
        }
    }
}

impl<'a> Drop for StagedCapture<'a> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{first_element, parse_html};
    use crate::surface::PixelSurface;

    fn sample_source() -> ElementNode {
        first_element(&parse_html(
            r#"<div style="color: oklch(0.628 0.2577 29.23)"><p>hi</p></div>"#,
        ))
        .unwrap()
        .clone()
    }

    #[test]
    fn staging_normalizes_the_clone_and_keeps_the_source() {
        let surface = PixelSurface::new();
        let source = sample_source();
        let staged = stage(&surface, &source);

        let clone = staged.root().child_elements()[0];
        assert!(clone.style_value("color").unwrap().starts_with("rgb("));
        assert!(source.style_value("color").unwrap().starts_with("oklch("));

        // The container itself carries the white backdrop.
        assert_eq!(staged.root().style_value("background-color"), Some("#ffffff"));
    }

    #[test]
    fn drop_detaches_the_container() {
        let surface = PixelSurface::new();
        let source = sample_source();
        {
            let _staged = stage(&surface, &source);
            assert_eq!(surface.attached_count(), 1);
        }
        assert_eq!(surface.attached_count(), 0);
    }

    #[test]
    fn release_is_idempotent() {
        let surface = PixelSurface::new();
        let source = sample_source();
        let mut staged = stage(&surface, &source);
        staged.release();
        staged.release();
        assert_eq!(surface.attached_count(), 0);
        drop(staged);
        assert_eq!(surface.attached_count(), 0);
    }

    #[test]
    fn panic_during_capture_still_detaches() {
        let surface = PixelSurface::new();
        let source = sample_source();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _staged = stage(&surface, &source);
            panic!("capture blew up");
        }));
        assert!(result.is_err());
        assert_eq!(surface.attached_count(), 0);
    }
}
