//! PDF paginator – slices one tall capture bitmap into A4 pages.
//!
//! The capture is scaled to the full page width and the pages are produced
//! by windowing: every page places the *same* full image, shifted upward by
//! a negative offset, so page n shows the band `[(n-1)·297, n·297)` mm.
//! Content below the page bottom is clipped by the page boundary itself.

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;

use crate::raster::Bitmap;
use crate::record::sanitize_base_name;

pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

const MM_PER_PT: f32 = 0.352_778;

/// Height of the capture in page-space millimetres once scaled to the full
/// A4 width.
pub fn scaled_image_height_mm(bitmap_width: u32, bitmap_height: u32) -> f32 {
    if bitmap_width == 0 {
        return 0.0;
    }
    bitmap_height as f32 * A4_WIDTH_MM / bitmap_width as f32
}

/// Number of pages the windowing produces. Always at least 1.
pub fn page_count(img_height_mm: f32) -> usize {
    (img_height_mm / A4_HEIGHT_MM).ceil().max(1.0) as usize
}

/// Top offset (mm, in page coordinates) of the full image on each page.
/// Page 1 draws at offset 0; every later page draws at `remaining −
/// img_height`, which is negative and shifts the already-shown bands above
/// the page top.
pub fn page_offsets_mm(img_height_mm: f32) -> Vec<f32> {
    let mut offsets = vec![0.0];
    let mut remaining = img_height_mm - A4_HEIGHT_MM;
    while remaining > 0.0 {
        offsets.push(remaining - img_height_mm);
        remaining -= A4_HEIGHT_MM;
    }
    offsets
}

/// Assemble the paginated PDF from a capture bitmap.
pub fn paginate_to_pdf(bitmap: &Bitmap, title: &str) -> Result<Vec<u8>, String> {
    let png = bitmap.to_png()?;

    let mut doc = PdfDocument::new(title);
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();
    let raw = RawImage::decode_from_bytes(&png, &mut img_warnings)
        .map_err(|e| format!("PDF image registration failed: {e}"))?;
    let xobj_id = doc.add_image(&raw);

    let img_h_mm = scaled_image_height_mm(bitmap.width, bitmap.height);
    let img_w_pt = A4_WIDTH_MM / MM_PER_PT;
    let img_h_pt = img_h_mm / MM_PER_PT;
    let page_h_pt = A4_HEIGHT_MM / MM_PER_PT;

    // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px_dim.
    let scale_x = if bitmap.width > 0 {
        img_w_pt / bitmap.width as f32
    } else {
        1.0
    };
    let scale_y = if bitmap.height > 0 {
        img_h_pt / bitmap.height as f32
    } else {
        1.0
    };

    let mut pages = Vec::new();
    for offset_mm in page_offsets_mm(img_h_mm) {
        // PDF origin is bottom-left; the offset is the image's top edge in
        // top-left page coordinates. translate_y = bottom edge of the image.
        let img_bottom_pt = page_h_pt - (offset_mm + img_h_mm) / MM_PER_PT;

        let ops = vec![Op::UseXobject {
            id: xobj_id.clone(),
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(img_bottom_pt)),
                dpi: Some(72.0),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                rotate: None,
            },
        }];
        pages.push(PdfPage::new(Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), ops));
    }

    doc.with_pages(pages);
    Ok(doc.save(&PdfSaveOptions::default(), &mut Vec::new()))
}

/// Download name for a PDF export.
pub fn pdf_file_name(base: &str) -> String {
    format!("{}_resume.pdf", sanitize_base_name(base))
}

/// Base64 payload for attaching a PDF to an email.
pub fn pdf_to_base64(pdf_bytes: &[u8]) -> String {
    BASE64_STD.encode(pdf_bytes)
}
