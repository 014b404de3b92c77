//! Rasteriser – paints a staged capture into an RGBA bitmap.
//!
//! The capture is laid out at CSS-pixel width and painted at a fixed 2×
//! scale onto an opaque white pixmap: backgrounds first, then borders,
//! text glyphs, list markers, and data-URI images. Glyphs are filled from
//! system font outlines; when no real face is available the text is left
//! as measured blank boxes so dimensions stay deterministic.

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use log::{debug, warn};
use tiny_skia::{
    FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect as SkRect, Transform,
};

use crate::color::Color;
use crate::fonts::{FontKey, FontManager};
use crate::layout::{compute_layout, content_height, BoxContent, PositionedBox};
use crate::staging::StagedCapture;
use crate::style::{build_styled_tree, FontStyle, FontWeight, TextAlign, TextDecoration};

/// Device pixels per CSS pixel in captured bitmaps.
pub const CAPTURE_SCALE: f32 = 2.0;

/// An opaque RGBA bitmap produced by a capture.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// Straight (non-premultiplied) RGBA, row-major.
    pub data: Vec<u8>,
}

impl Bitmap {
    /// Encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, String> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| "bitmap buffer size mismatch".to_string())?;
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| format!("PNG encode failed: {e}"))?;
        Ok(out.into_inner())
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

/// Rasterise a staged capture. Deterministic: the same staged tree and
/// fonts always produce identical dimensions and pixels.
pub fn rasterize(staged: &StagedCapture, fonts: &FontManager) -> Result<Bitmap, String> {
    let root = crate::dom::DomNode::Element(staged.root().clone());
    let styled = build_styled_tree(std::slice::from_ref(&root), None);
    let boxes = compute_layout(&styled, staged.width(), fonts);

    let doc_height = content_height(&boxes).ceil().max(1.0);
    let px_w = (staged.width() * CAPTURE_SCALE).round() as u32;
    let px_h = (doc_height * CAPTURE_SCALE).round() as u32;

    let mut pixmap = Pixmap::new(px_w.max(1), px_h.max(1))
        .ok_or_else(|| format!("cannot allocate {px_w}x{px_h} pixmap"))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    if !fonts.has_real_fonts() {
        debug!("no real fonts loaded; text renders as measured boxes");
    }

    let mut painter = Painter { pixmap, fonts };
    for b in &boxes {
        painter.paint_box(b);
    }

    let pixmap = painter.pixmap;
    let mut data = Vec::with_capacity((px_w * px_h * 4) as usize);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    Ok(Bitmap {
        width: pixmap.width(),
        height: pixmap.height(),
        data,
    })
}

struct Painter<'a> {
    pixmap: Pixmap,
    fonts: &'a FontManager,
}

impl<'a> Painter<'a> {
    fn paint_box(&mut self, b: &PositionedBox) {
        self.paint_background(b);
        self.paint_borders(b);

        match &b.content {
            BoxContent::Text { lines, .. } => self.paint_text(b, lines, None),
            BoxContent::ListItem { marker } => {
                // The marker sits in the gutter; the item's own children carry
                // the text content.
                self.paint_marker(b, marker);
            }
            BoxContent::Image { src } => self.paint_image(b, src),
            BoxContent::None => {}
        }

        for child in &b.children {
            self.paint_box(child);
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        if w <= 0.0 || h <= 0.0 || color.is_transparent() {
            return;
        }
        let Some(rect) = SkRect::from_xywh(
            x * CAPTURE_SCALE,
            y * CAPTURE_SCALE,
            w * CAPTURE_SCALE,
            h * CAPTURE_SCALE,
        ) else {
            return;
        };
        let mut paint = Paint::default();
        paint.anti_alias = true;
        if let Some(c) = tiny_skia::Color::from_rgba(
            color.r.clamp(0.0, 1.0),
            color.g.clamp(0.0, 1.0),
            color.b.clamp(0.0, 1.0),
            color.a.clamp(0.0, 1.0),
        ) {
            paint.set_color(c);
            self.pixmap
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    fn paint_background(&mut self, b: &PositionedBox) {
        self.fill_rect(b.x, b.y, b.width, b.height, b.style.background_color);
    }

    fn paint_borders(&mut self, b: &PositionedBox) {
        let c = b.style.border_color;
        let w = b.style.border_width;
        if w > 0.0 {
            self.fill_rect(b.x, b.y, b.width, w, c);
            self.fill_rect(b.x, b.y + b.height - w, b.width, w, c);
            self.fill_rect(b.x, b.y, w, b.height, c);
            self.fill_rect(b.x + b.width - w, b.y, w, b.height, c);
        }
        let bw = b.style.border_bottom_width;
        if bw > 0.0 {
            self.fill_rect(b.x, b.y + b.height - bw, b.width, bw, c);
        }
    }

    fn paint_text(&mut self, b: &PositionedBox, lines: &[String], x_override: Option<f32>) {
        let s = &b.style;
        let bold = s.font_weight == FontWeight::Bold;
        let italic = s.font_style == FontStyle::Italic;
        let line_height = self.fonts.line_height_px(s.font_size, s.line_height);
        let ascender = self
            .fonts
            .ascender_px(s.font_size, bold, italic, &s.font_family);
        let content_x = x_override.unwrap_or(b.x + s.padding_left);
        let content_w = b.width - s.padding_left - s.padding_right;

        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_w = self
                .fonts
                .measure_text_width(line, s.font_size, bold, italic, &s.font_family);
            let x = match s.text_align {
                TextAlign::Left => content_x,
                TextAlign::Center => content_x + ((content_w - line_w) / 2.0).max(0.0),
                TextAlign::Right => content_x + (content_w - line_w).max(0.0),
            };
            let line_top = b.y + s.padding_top + i as f32 * line_height;
            // Centre the glyph box within the line box.
            let baseline = line_top + (line_height - s.font_size) / 2.0 + ascender;

            self.paint_line(line, x, baseline, s.font_size, bold, italic, s);

            if s.text_decoration == TextDecoration::Underline {
                self.fill_rect(x, baseline + 2.0, line_w, 1.0, s.color);
            }
        }
    }

    fn paint_marker(&mut self, b: &PositionedBox, marker: &str) {
        let s = &b.style;
        let bold = s.font_weight == FontWeight::Bold;
        let marker_w =
            self.fonts
                .measure_text_width(marker, s.font_size, bold, false, &s.font_family);
        let ascender = self
            .fonts
            .ascender_px(s.font_size, bold, false, &s.font_family);
        let line_height = self.fonts.line_height_px(s.font_size, s.line_height);
        let baseline = b.y + (line_height - s.font_size) / 2.0 + ascender;
        self.paint_line(
            marker,
            b.x - marker_w,
            baseline,
            s.font_size,
            bold,
            false,
            s,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_line(
        &mut self,
        text: &str,
        x: f32,
        baseline: f32,
        font_size: f32,
        bold: bool,
        italic: bool,
        style: &crate::style::ComputedStyle,
    ) {
        let key = FontKey {
            family: style.font_family.clone(),
            bold,
            italic,
        };
        let Some(bytes) = self.fonts.font_bytes(&key) else {
            // Measured-box fallback: leave the line blank.
            return;
        };
        let Ok(face) = ttf_parser::Face::parse(bytes, 0) else {
            return;
        };
        let units_per_em = face.units_per_em() as f32;
        let glyph_scale = font_size * CAPTURE_SCALE / units_per_em;

        let mut pen_x = x * CAPTURE_SCALE;
        let pen_y = baseline * CAPTURE_SCALE;
        let mut pb = PathBuilder::new();

        for ch in text.chars() {
            let Some(gid) = face.glyph_index(ch) else {
                pen_x += font_size * 0.5 * CAPTURE_SCALE;
                continue;
            };
            let mut outline = GlyphOutline {
                builder: &mut pb,
                scale: glyph_scale,
                offset_x: pen_x,
                offset_y: pen_y,
            };
            face.outline_glyph(gid, &mut outline);
            let advance = face.glyph_hor_advance(gid).unwrap_or(0) as f32;
            pen_x += advance * glyph_scale;
        }

        let Some(path) = pb.finish() else {
            return;
        };
        let mut paint = Paint::default();
        paint.anti_alias = true;
        if let Some(c) = tiny_skia::Color::from_rgba(
            style.color.r.clamp(0.0, 1.0),
            style.color.g.clamp(0.0, 1.0),
            style.color.b.clamp(0.0, 1.0),
            style.color.a.clamp(0.0, 1.0),
        ) {
            paint.set_color(c);
            self.pixmap
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    fn paint_image(&mut self, b: &PositionedBox, src: &str) {
        if !src.starts_with("data:") {
            warn!("skipping non-data-URI image source during capture");
            return;
        }
        let Some(src_pixmap) = decode_data_uri(src) else {
            warn!("could not decode data-URI image during capture");
            return;
        };
        if b.width <= 0.0 || b.height <= 0.0 {
            return;
        }
        let sx = b.width * CAPTURE_SCALE / src_pixmap.width() as f32;
        let sy = b.height * CAPTURE_SCALE / src_pixmap.height() as f32;
        let transform = Transform::from_row(
            sx,
            0.0,
            0.0,
            sy,
            b.x * CAPTURE_SCALE,
            b.y * CAPTURE_SCALE,
        );
        self.pixmap.draw_pixmap(
            0,
            0,
            src_pixmap.as_ref(),
            &PixmapPaint::default(),
            transform,
            None,
        );
    }
}

/// Translates ttf-parser outline callbacks into a tiny-skia path. Font
/// coordinates are y-up; the pixmap is y-down, so y is mirrored around the
/// baseline.
struct GlyphOutline<'a> {
    builder: &'a mut PathBuilder,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl<'a> GlyphOutline<'a> {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.offset_x + x * self.scale,
            self.offset_y - y * self.scale,
        )
    }
}

impl<'a> ttf_parser::OutlineBuilder for GlyphOutline<'a> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Decode a `data:<mime>;base64,<payload>` URI into a premultiplied pixmap.
fn decode_data_uri(src: &str) -> Option<Pixmap> {
    let comma = src.find(',')?;
    if !src[..comma].contains(";base64") {
        return None;
    }
    let bytes = BASE64_STD.decode(src[comma + 1..].trim()).ok()?;
    let img = image::load_from_memory(&bytes).ok()?.to_rgba8();
    let (w, h) = (img.width(), img.height());
    let mut pixmap = Pixmap::new(w, h)?;
    for (dst, src_px) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src_px.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{first_element, parse_html};
    use crate::staging::{stage, CAPTURE_WIDTH};
    use crate::surface::PixelSurface;

    fn capture(html: &str) -> Bitmap {
        let surface = PixelSurface::new();
        let source = first_element(&parse_html(html)).unwrap().clone();
        let staged = stage(&surface, &source);
        let fonts = FontManager::default();
        rasterize(&staged, &fonts).unwrap()
    }

    #[test]
    fn bitmap_is_double_scale_and_white_backed() {
        let bmp = capture("<div><p>Hello</p></div>");
        assert_eq!(bmp.width, (CAPTURE_WIDTH * CAPTURE_SCALE) as u32);
        assert!(bmp.height > 0);
        // Corner pixel is the opaque white backdrop.
        assert_eq!(bmp.pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn rasterization_is_deterministic() {
        let html = r#"<div style="background-color: #336699"><p>Jane Doe</p></div>"#;
        let a = capture(html);
        let b = capture(html);
        assert_eq!(a.width, b.width);
        assert_eq!(a.height, b.height);
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn background_color_is_painted() {
        let bmp =
            capture(r#"<div style="background-color: #ff0000; height: 50px; width: 100px"></div>"#);
        let px = bmp.pixel(10, 10);
        assert_eq!(px[0], 255);
        assert_eq!(px[1], 0);
    }

    #[test]
    fn excluded_subtree_changes_nothing() {
        let with_toolbar = capture(
            r#"<div><p>Content</p><div class="no-export" style="background-color: #00ff00; height: 40px">x</div></div>"#,
        );
        let without = capture("<div><p>Content</p></div>");
        assert_eq!(with_toolbar.height, without.height);
        assert_eq!(with_toolbar.data, without.data);
    }

    #[test]
    fn png_encoding_roundtrips_dimensions() {
        let bmp = capture("<div><p>Hi</p></div>");
        let png = bmp.to_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), bmp.width);
        assert_eq!(decoded.height(), bmp.height);
    }
}
