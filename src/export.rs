//! Export pipeline – ties staging, rasterisation, pagination, composition,
//! and dispatch together into the three public operations.
//!
//! Every operation returns an [`ExportOutcome`]: stage failures propagate
//! internally as [`ExportFault`] and are normalised at this boundary, so
//! callers always get the envelope, never a raw error.

use log::{debug, info};

use crate::docx::{docx_file_name, write_docx};
use crate::dom::ElementNode;
use crate::fonts::FontManager;
use crate::mailer::{EmailReceipt, EmailRequest, EmailService};
use crate::outcome::{ExportFault, ExportOutcome};
use crate::paginate::{
    page_count, paginate_to_pdf, pdf_file_name, pdf_to_base64, scaled_image_height_mm,
};
use crate::raster::rasterize;
use crate::record::ResumeRecord;
use crate::staging::stage;
use crate::surface::RenderingSurface;

/// A finished PDF export.
#[derive(Debug, Clone)]
pub struct PdfExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// A finished DOCX export.
#[derive(Debug, Clone)]
pub struct DocxExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Acknowledged email delivery.
#[derive(Debug, Clone)]
pub struct EmailDelivery {
    pub message_id: String,
    pub file_name: String,
}

/// Capture the rendered view and produce the paginated PDF.
pub fn export_pdf(
    surface: &dyn RenderingSurface,
    source: &ElementNode,
    record: &ResumeRecord,
    fonts: &FontManager,
) -> ExportOutcome<PdfExport> {
    match build_pdf(surface, source, record, fonts) {
        Ok(export) => ExportOutcome::ok(export),
        Err(fault) => ExportOutcome::from_fault(fault),
    }
}

fn build_pdf(
    surface: &dyn RenderingSurface,
    source: &ElementNode,
    record: &ResumeRecord,
    fonts: &FontManager,
) -> Result<PdfExport, ExportFault> {
    let staged = stage(surface, source);
    let bitmap = rasterize(&staged, fonts).map_err(ExportFault::PdfGeneration)?;
    debug!("captured {}x{} bitmap", bitmap.width, bitmap.height);

    let title = format!("Resume - {}", record.display_name());
    let bytes = paginate_to_pdf(&bitmap, &title).map_err(ExportFault::PdfBlob)?;
    let pages = page_count(scaled_image_height_mm(bitmap.width, bitmap.height));
    info!("exported {pages}-page PDF for {}", record.display_name());

    Ok(PdfExport {
        file_name: pdf_file_name(record.display_name()),
        bytes,
        pages,
    })
}

/// Recompose the record as a structured DOCX.
pub fn export_docx(record: &ResumeRecord) -> ExportOutcome<DocxExport> {
    match write_docx(record).map_err(ExportFault::DocxGeneration) {
        Ok(bytes) => {
            info!("exported DOCX for {}", record.display_name());
            ExportOutcome::ok(DocxExport {
                file_name: docx_file_name(record),
                bytes,
            })
        }
        Err(fault) => ExportOutcome::from_fault(fault),
    }
}

/// Render the PDF and submit it to the email collaborator.
///
/// Pre-flight checks run before any capture work: a recipient without `@`
/// or a missing source element fails fast with no side effects.
pub async fn send_resume_email(
    surface: &dyn RenderingSurface,
    source: Option<&ElementNode>,
    record: &ResumeRecord,
    recipient: &str,
    fonts: &FontManager,
    service: &dyn EmailService,
) -> ExportOutcome<EmailDelivery> {
    match dispatch_email(surface, source, record, recipient, fonts, service).await {
        Ok(delivery) => ExportOutcome::ok(delivery),
        Err(fault) => ExportOutcome::from_fault(fault),
    }
}

async fn dispatch_email(
    surface: &dyn RenderingSurface,
    source: Option<&ElementNode>,
    record: &ResumeRecord,
    recipient: &str,
    fonts: &FontManager,
    service: &dyn EmailService,
) -> Result<EmailDelivery, ExportFault> {
    let recipient = recipient.trim();
    if !recipient.contains('@') {
        return Err(ExportFault::EmailSend(format!(
            "invalid recipient address: {recipient}"
        )));
    }
    let source = source.ok_or_else(|| {
        ExportFault::EmailSend("resume view is not available for capture".to_string())
    })?;

    let pdf = build_pdf(surface, source, record, fonts)
        .map_err(|fault| ExportFault::EmailSend(fault.to_string()))?;

    let name = record.display_name();
    let request = EmailRequest {
        to: recipient.to_string(),
        subject: format!("Resume - {name}"),
        text: format!("Please find attached the resume for {name}."),
        html: Some(email_html_body(record)),
        pdf_base64: pdf_to_base64(&pdf.bytes),
        file_name: pdf.file_name.clone(),
    };

    let EmailReceipt { message_id } = service
        .send(&request)
        .await
        .map_err(|e| ExportFault::EmailSend(e.to_string()))?;
    info!("emailed resume for {name} to {recipient}");

    Ok(EmailDelivery {
        message_id,
        file_name: pdf.file_name,
    })
}

/// Fallback HTML body for clients that render it instead of the text part.
fn email_html_body(record: &ResumeRecord) -> String {
    let name = record.display_name();
    let mut body = format!(
        "<div><h2>Resume - {name}</h2><p>Please find attached the resume for {name} as a PDF.</p>"
    );
    let contact = record.contact_fields().join(" | ");
    if !contact.is_empty() {
        body.push_str(&format!("<p>Contact: {contact}</p>"));
    }
    body.push_str("</div>");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{first_element, parse_html};
    use crate::outcome::ExportErrorCode;
    use crate::surface::PixelSurface;

    fn record() -> ResumeRecord {
        ResumeRecord {
            full_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            ..Default::default()
        }
    }

    fn view() -> ElementNode {
        first_element(&parse_html("<div><h1>Jane Doe</h1><p>Engineer</p></div>"))
            .unwrap()
            .clone()
    }

    #[test]
    fn pdf_export_produces_document_and_filename() {
        let surface = PixelSurface::new();
        let fonts = FontManager::default();
        let outcome = export_pdf(&surface, &view(), &record(), &fonts);
        assert!(outcome.success);
        let pdf = outcome.data.unwrap();
        assert_eq!(pdf.file_name, "jane_doe_resume.pdf");
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert!(pdf.pages >= 1);
        // Teardown happened on the success path too.
        assert_eq!(surface.attached_count(), 0);
    }

    #[test]
    fn docx_export_produces_package() {
        let outcome = export_docx(&record());
        assert!(outcome.success);
        let docx = outcome.data.unwrap();
        assert_eq!(docx.file_name, "jane_doe_resume.docx");
        assert_eq!(&docx.bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn email_rejects_recipient_without_at_sign() {
        struct Unreachable;
        #[async_trait::async_trait]
        impl EmailService for Unreachable {
            async fn send(
                &self,
                _request: &EmailRequest,
            ) -> Result<EmailReceipt, crate::mailer::MailError> {
                panic!("send must not be reached for an invalid recipient");
            }
        }

        let surface = PixelSurface::new();
        let fonts = FontManager::default();
        let source = view();
        let outcome = send_resume_email(
            &surface,
            Some(&source),
            &record(),
            "not-an-address",
            &fonts,
            &Unreachable,
        )
        .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.unwrap().code, ExportErrorCode::EmailSend);
        assert_eq!(surface.attached_count(), 0);
    }

    #[tokio::test]
    async fn email_requires_a_source_element() {
        struct Unreachable;
        #[async_trait::async_trait]
        impl EmailService for Unreachable {
            async fn send(
                &self,
                _request: &EmailRequest,
            ) -> Result<EmailReceipt, crate::mailer::MailError> {
                panic!("send must not be reached without a source element");
            }
        }

        let surface = PixelSurface::new();
        let fonts = FontManager::default();
        let outcome = send_resume_email(
            &surface,
            None,
            &record(),
            "jane@example.com",
            &fonts,
            &Unreachable,
        )
        .await;
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert_eq!(error.code, ExportErrorCode::EmailSend);
        assert!(error.details.unwrap().contains("not available"));
    }
}
