//! # resume-export – Resume view → PDF / DOCX / email pipeline
//!
//! This crate captures an HTML resume view as a paginated PDF, recomposes
//! the underlying record as a structured DOCX, and dispatches the PDF by
//! email. The PDF capture stages are:
//!
//! 1. **Parse** – view HTML string → DOM tree ([`dom`])
//! 2. **Stage** – off-screen clone with normalised colours ([`normalize`], [`staging`])
//! 3. **Style & layout** – inline styles and utility classes, flexbox via Taffy ([`style`], [`layout`])
//! 4. **Rasterise** – 2x RGBA bitmap on a white backdrop ([`raster`])
//! 5. **Paginate** – window the bitmap across A4 pages via printpdf ([`paginate`])
//!
//! The DOCX path ([`docx`]) composes WordprocessingML straight from the
//! record, no pixels involved. Every public operation returns the same
//! [`ExportOutcome`] envelope; the email path ([`mailer`]) reuses the PDF
//! capture and submits it to an HTTP collaborator.

pub mod color;
pub mod docx;
pub mod dom;
pub mod export;
pub mod fonts;
pub mod layout;
pub mod mailer;
pub mod normalize;
pub mod outcome;
pub mod paginate;
pub mod raster;
pub mod record;
pub mod samples;
pub mod staging;
pub mod style;
pub mod surface;

// Re-exports for convenience
pub use export::{export_docx, export_pdf, send_resume_email, DocxExport, EmailDelivery, PdfExport};
pub use mailer::{EmailRequest, EmailService, HttpEmailService};
pub use outcome::{ExportError, ExportErrorCode, ExportOutcome};
pub use record::ResumeRecord;
pub use surface::{PixelSurface, RenderingSurface};
