//! Export result protocol – the uniform envelope every export path returns.
//!
//! Internally stages propagate [`ExportFault`] with `?`; the public entry
//! points catch every fault and normalise it into an [`ExportOutcome`], so
//! callers never see a raw error escape the boundary. The `message` field
//! is stable and user-safe; the underlying failure text is preserved in
//! `details`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed taxonomy of export failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportErrorCode {
    #[serde(rename = "PDF_GENERATION_ERROR")]
    PdfGeneration,
    #[serde(rename = "PDF_BLOB_ERROR")]
    PdfBlob,
    #[serde(rename = "DOCX_GENERATION_ERROR")]
    DocxGeneration,
    #[serde(rename = "EMAIL_SEND_ERROR")]
    EmailSend,
}

impl ExportErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfGeneration => "PDF_GENERATION_ERROR",
            Self::PdfBlob => "PDF_BLOB_ERROR",
            Self::DocxGeneration => "DOCX_GENERATION_ERROR",
            Self::EmailSend => "EMAIL_SEND_ERROR",
        }
    }
}

/// A classified export failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportError {
    pub code: ExportErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Envelope for every export operation. Exactly one of `data` and `error`
/// is meaningful, selected by `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOutcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExportError>,
}

impl<T> ExportOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: ExportError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn from_fault(fault: ExportFault) -> Self {
        Self::err(fault.into())
    }
}

/// Internal fault type threaded through the pipeline stages with `?`.
#[derive(Debug, Error)]
pub enum ExportFault {
    #[error("PDF capture failed: {0}")]
    PdfGeneration(String),
    #[error("PDF assembly failed: {0}")]
    PdfBlob(String),
    #[error("DOCX composition failed: {0}")]
    DocxGeneration(String),
    #[error("email dispatch failed: {0}")]
    EmailSend(String),
}

impl ExportFault {
    pub fn code(&self) -> ExportErrorCode {
        match self {
            Self::PdfGeneration(_) => ExportErrorCode::PdfGeneration,
            Self::PdfBlob(_) => ExportErrorCode::PdfBlob,
            Self::DocxGeneration(_) => ExportErrorCode::DocxGeneration,
            Self::EmailSend(_) => ExportErrorCode::EmailSend,
        }
    }

    /// Stable, user-safe description for the code.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PdfGeneration(_) => "Could not generate the PDF document",
            Self::PdfBlob(_) => "Could not serialize the PDF document",
            Self::DocxGeneration(_) => "Could not generate the Word document",
            Self::EmailSend(_) => "Could not send the resume email",
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::PdfGeneration(d)
            | Self::PdfBlob(d)
            | Self::DocxGeneration(d)
            | Self::EmailSend(d) => d.clone(),
        }
    }
}

impl From<ExportFault> for ExportError {
    fn from(fault: ExportFault) -> Self {
        ExportError {
            code: fault.code(),
            message: fault.user_message().to_string(),
            details: Some(fault.detail()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_screaming() {
        let err = ExportError {
            code: ExportErrorCode::PdfGeneration,
            message: "m".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("PDF_GENERATION_ERROR"));
        assert!(!json.contains("details"));
    }

    #[test]
    fn fault_maps_to_code_and_preserves_detail() {
        let fault = ExportFault::EmailSend("connection refused".to_string());
        let err: ExportError = fault.into();
        assert_eq!(err.code, ExportErrorCode::EmailSend);
        assert_eq!(err.details.as_deref(), Some("connection refused"));
        assert!(!err.message.contains("refused"));
    }

    #[test]
    fn outcome_sides_are_exclusive() {
        let ok: ExportOutcome<u32> = ExportOutcome::ok(7);
        assert!(ok.success && ok.data == Some(7) && ok.error.is_none());

        let err: ExportOutcome<u32> =
            ExportOutcome::from_fault(ExportFault::DocxGeneration("boom".to_string()));
        assert!(!err.success && err.data.is_none());
        assert_eq!(
            err.error.unwrap().code.as_str(),
            "DOCX_GENERATION_ERROR"
        );
    }

    #[test]
    fn outcome_json_shape() {
        let ok: ExportOutcome<String> = ExportOutcome::ok("file.pdf".to_string());
        let json = serde_json::to_string(&ok).unwrap();
        assert_eq!(json, r#"{"success":true,"data":"file.pdf"}"#);
    }
}
