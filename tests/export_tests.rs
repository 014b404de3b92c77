//! Integration tests for the resume export pipeline.
//!
//! These tests validate:
//! - The full view → PDF capture path, including teardown
//! - Capture determinism and exclusion of `no-export` content
//! - A4 pagination windowing
//! - DOCX composition from the record
//! - Email dispatch pre-flight and payload shape

use sha2::{Digest, Sha256};

use resume_export::dom::{first_element, parse_html, ElementNode};
use resume_export::fonts::FontManager;
use resume_export::mailer::{EmailReceipt, EmailRequest, EmailService, MailError};
use resume_export::outcome::ExportErrorCode;
use resume_export::paginate::{page_count, page_offsets_mm, scaled_image_height_mm};
use resume_export::raster::rasterize;
use resume_export::record::{ExperienceEntry, ResumeRecord};
use resume_export::staging::stage;
use resume_export::{export_docx, export_pdf, samples, send_resume_email, PixelSurface, RenderingSurface};

// =====================================================================
// Helpers
// =====================================================================

fn view_element(html: &str) -> ElementNode {
    let nodes = parse_html(html);
    first_element(&nodes).expect("view HTML must contain an element").clone()
}

fn sample_view() -> ElementNode {
    let record = samples::sample_record();
    view_element(&samples::resume_view(&record))
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

// =====================================================================
// PDF export
// =====================================================================

#[test]
fn export_pdf_from_sample_view() {
    let surface = PixelSurface::new();
    let fonts = FontManager::default();
    let record = samples::sample_record();
    let source = sample_view();

    let outcome = export_pdf(&surface, &source, &record, &fonts);
    assert!(outcome.success, "export failed: {:?}", outcome.error);
    let pdf = outcome.data.unwrap();
    assert_valid_pdf(&pdf.bytes);
    assert!(pdf.pages >= 1);
    assert_eq!(pdf.file_name, "jane_doe_resume.pdf");
}

#[test]
fn export_pdf_detaches_the_staging_container() {
    let surface = PixelSurface::new();
    let fonts = FontManager::default();
    let record = samples::sample_record();
    let source = sample_view();

    let outcome = export_pdf(&surface, &source, &record, &fonts);
    assert!(outcome.success);
    assert_eq!(surface.attached_count(), 0, "staging container leaked");
}

#[test]
fn export_pdf_does_not_mutate_the_source_view() {
    let surface = PixelSurface::new();
    let fonts = FontManager::default();
    let record = samples::sample_record();
    let source = sample_view();
    let before = format!("{source:?}");

    let outcome = export_pdf(&surface, &source, &record, &fonts);
    assert!(outcome.success);
    assert_eq!(format!("{source:?}"), before);
}

// =====================================================================
// Capture determinism and exclusion
// =====================================================================

#[test]
fn capture_is_deterministic() {
    let surface = PixelSurface::new();
    let fonts = FontManager::default();
    let source = sample_view();

    let first = rasterize(&stage(&surface, &source), &fonts).unwrap();
    let second = rasterize(&stage(&surface, &source), &fonts).unwrap();
    assert_eq!(first.width, second.width);
    assert_eq!(first.height, second.height);
    assert_eq!(sha256(&first.data), sha256(&second.data));
}

#[test]
fn excluded_toolbar_does_not_affect_the_capture() {
    let surface = PixelSurface::new();
    let fonts = FontManager::default();

    let with_toolbar = view_element(
        r#"<div><div class="no-export" style="background-color: #ff0000"><p>Edit</p></div><h1>Jane</h1></div>"#,
    );
    let without = view_element("<div><h1>Jane</h1></div>");

    let a = rasterize(&stage(&surface, &with_toolbar), &fonts).unwrap();
    let b = rasterize(&stage(&surface, &without), &fonts).unwrap();
    assert_eq!(sha256(&a.data), sha256(&b.data));
}

#[test]
fn modern_color_functions_do_not_break_the_capture() {
    let surface = PixelSurface::new();
    let fonts = FontManager::default();
    let source = view_element(
        r#"<div style="background-color: oklch(0.7 0.1 200)"><p style="color: lab(30 10 -20)">Text</p></div>"#,
    );

    let bitmap = rasterize(&stage(&surface, &source), &fonts).unwrap();
    assert!(bitmap.width > 0 && bitmap.height > 0);
    assert_eq!(surface.attached_count(), 0);
}

// =====================================================================
// Pagination windowing
// =====================================================================

#[test]
fn short_capture_fits_one_page() {
    // 800x400 at a 210mm target width scales to 105mm of content.
    let height_mm = scaled_image_height_mm(800, 400);
    assert!((height_mm - 105.0).abs() < 0.01);
    assert_eq!(page_count(height_mm), 1);
    assert_eq!(page_offsets_mm(height_mm), vec![0.0]);
}

#[test]
fn offsets_step_one_page_height_at_a_time() {
    let height_mm = 1000.0;
    let offsets = page_offsets_mm(height_mm);
    assert_eq!(offsets.len(), page_count(height_mm));
    assert_eq!(offsets[0], 0.0);
    for pair in offsets.windows(2) {
        assert!((pair[0] - pair[1] - 297.0).abs() < 0.01, "offsets: {offsets:?}");
    }
}

#[test]
fn page_count_matches_ceiling_of_height_over_a4() {
    for height_mm in [1.0f32, 296.9, 297.0, 297.1, 500.0, 594.0, 594.1, 2000.0] {
        let expected = (height_mm / 297.0).ceil().max(1.0) as usize;
        assert_eq!(
            page_count(height_mm),
            expected,
            "height {height_mm}mm"
        );
        assert_eq!(page_offsets_mm(height_mm).len(), expected);
    }
}

// =====================================================================
// DOCX composition
// =====================================================================

#[test]
fn docx_contains_the_populated_sections() {
    let outcome = export_docx(&samples::sample_record());
    assert!(outcome.success);
    let docx = outcome.data.unwrap();
    assert_eq!(docx.file_name, "jane_doe_resume.docx");

    let document_xml = read_zip_part(&docx.bytes, "word/document.xml");
    assert!(document_xml.contains("Jane Doe"));
    for heading in [
        "PROFESSIONAL SUMMARY",
        "WORK EXPERIENCE",
        "EDUCATION",
        "SKILLS",
        "CERTIFICATIONS",
    ] {
        assert!(document_xml.contains(heading), "missing {heading}");
    }
}

#[test]
fn docx_omits_sections_with_empty_leading_entries() {
    let record = ResumeRecord {
        full_name: "Jane Doe".to_string(),
        experience: vec![ExperienceEntry::default()],
        ..Default::default()
    };
    let outcome = export_docx(&record);
    assert!(outcome.success);
    let docx = outcome.data.unwrap();

    let document_xml = read_zip_part(&docx.bytes, "word/document.xml");
    assert!(!document_xml.contains("WORK EXPERIENCE"));
    assert!(!document_xml.contains("SKILLS"));
}

fn read_zip_part(bytes: &[u8], name: &str) -> String {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut content = String::new();
    part.read_to_string(&mut content).unwrap();
    content
}

// =====================================================================
// Email dispatch
// =====================================================================

struct CapturingService {
    sent: std::sync::Mutex<Vec<EmailRequest>>,
}

impl CapturingService {
    fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl EmailService for CapturingService {
    async fn send(&self, request: &EmailRequest) -> Result<EmailReceipt, MailError> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(EmailReceipt {
            message_id: "msg-1".to_string(),
        })
    }
}

#[tokio::test]
async fn email_carries_the_pdf_as_base64() {
    let surface = PixelSurface::new();
    let fonts = FontManager::default();
    let record = samples::sample_record();
    let source = sample_view();
    let service = CapturingService::new();

    let outcome = send_resume_email(
        &surface,
        Some(&source),
        &record,
        "hiring@example.com",
        &fonts,
        &service,
    )
    .await;
    assert!(outcome.success, "dispatch failed: {:?}", outcome.error);
    assert_eq!(outcome.data.unwrap().message_id, "msg-1");

    let sent = service.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let request = &sent[0];
    assert_eq!(request.to, "hiring@example.com");
    assert_eq!(request.subject, "Resume - Jane Doe");
    assert_eq!(request.file_name, "jane_doe_resume.pdf");
    use base64::Engine;
    let pdf = base64::engine::general_purpose::STANDARD
        .decode(&request.pdf_base64)
        .unwrap();
    assert_valid_pdf(&pdf);
}

#[tokio::test]
async fn email_preflight_rejects_bad_recipient_without_capturing() {
    let surface = PixelSurface::new();
    let fonts = FontManager::default();
    let record = samples::sample_record();
    let source = sample_view();
    let service = CapturingService::new();

    let outcome = send_resume_email(
        &surface,
        Some(&source),
        &record,
        "not-an-address",
        &fonts,
        &service,
    )
    .await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.unwrap().code, ExportErrorCode::EmailSend);
    assert!(service.sent.lock().unwrap().is_empty());
    assert_eq!(surface.attached_count(), 0);
}

#[tokio::test]
async fn email_failure_is_classified_as_send_error() {
    struct Refusing;
    #[async_trait::async_trait]
    impl EmailService for Refusing {
        async fn send(&self, _request: &EmailRequest) -> Result<EmailReceipt, MailError> {
            Err(MailError::Delivery("mailbox unavailable".to_string()))
        }
    }

    let surface = PixelSurface::new();
    let fonts = FontManager::default();
    let record = samples::sample_record();
    let source = sample_view();

    let outcome = send_resume_email(
        &surface,
        Some(&source),
        &record,
        "hiring@example.com",
        &fonts,
        &Refusing,
    )
    .await;
    assert!(!outcome.success);
    let error = outcome.error.unwrap();
    assert_eq!(error.code, ExportErrorCode::EmailSend);
    assert!(error.details.unwrap().contains("mailbox unavailable"));
    assert_eq!(surface.attached_count(), 0);
}
