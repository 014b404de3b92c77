//! Email dispatcher – submits a rendered PDF to the mail collaborator.
//!
//! The collaborator is an HTTP endpoint accepting one JSON document per
//! send; the PDF travels inside it as a base64 string. [`EmailService`] is
//! the seam: the pipeline depends on the trait, the binary wires in
//! [`HttpEmailService`], tests substitute a recording fake.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Basic shape check; full deliverability is the collaborator's problem.
static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// One send request on the wire. Field names follow the collaborator's
/// JSON contract, which uses camelCase for the compound names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to: String,
    pub subject: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(rename = "pdfBase64")]
    pub pdf_base64: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// Collaborator acknowledgement of an accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailReceipt {
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    /// The dispatcher itself is misconfigured; nothing was sent.
    #[error("email service not configured: {0}")]
    Config(String),
    /// The request failed shape validation; nothing was sent.
    #[error("invalid email request: {0}")]
    Invalid(String),
    /// The collaborator refused or the transport failed.
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// Validate the request shape the collaborator enforces, in its order:
/// required fields first, then the address format.
pub fn validate_request(request: &EmailRequest) -> Result<(), MailError> {
    if request.to.trim().is_empty() {
        return Err(MailError::Invalid("missing recipient".to_string()));
    }
    if request.subject.trim().is_empty() {
        return Err(MailError::Invalid("missing subject".to_string()));
    }
    if request.text.trim().is_empty() {
        return Err(MailError::Invalid("missing message text".to_string()));
    }
    if request.pdf_base64.is_empty() {
        return Err(MailError::Invalid("missing PDF attachment".to_string()));
    }
    if !EMAIL_REGEX.is_match(request.to.trim()) {
        return Err(MailError::Invalid(format!(
            "invalid email address: {}",
            request.to
        )));
    }
    Ok(())
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, request: &EmailRequest) -> Result<EmailReceipt, MailError>;
}

/// HTTP submission to the collaborator endpoint.
pub struct HttpEmailService {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SendAccepted {
    #[allow(dead_code)]
    success: bool,
    #[serde(rename = "messageId")]
    message_id: Option<String>,
}

#[derive(Deserialize)]
struct SendRejected {
    error: String,
    details: Option<String>,
}

impl HttpEmailService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Endpoint from `RESUME_MAILER_URL`, empty when unset. An empty
    /// endpoint is reported as a configuration error at send time.
    pub fn from_env() -> Self {
        Self::new(std::env::var("RESUME_MAILER_URL").unwrap_or_default())
    }
}

#[async_trait]
impl EmailService for HttpEmailService {
    async fn send(&self, request: &EmailRequest) -> Result<EmailReceipt, MailError> {
        if self.endpoint.trim().is_empty() {
            return Err(MailError::Config(
                "no mail endpoint configured".to_string(),
            ));
        }
        validate_request(request)?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        if response.status().is_success() {
            let accepted: SendAccepted = response
                .json()
                .await
                .map_err(|e| MailError::Delivery(format!("malformed acknowledgement: {e}")))?;
            Ok(EmailReceipt {
                message_id: accepted.message_id.unwrap_or_default(),
            })
        } else {
            let status = response.status();
            let rejected = response.json::<SendRejected>().await.ok();
            let message = match rejected {
                Some(SendRejected {
                    error,
                    details: Some(details),
                }) => format!("{error}: {details}"),
                Some(SendRejected { error, .. }) => error,
                None => format!("collaborator returned {status}"),
            };
            Err(MailError::Delivery(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EmailRequest {
        EmailRequest {
            to: "jane@example.com".to_string(),
            subject: "Resume - Jane Doe".to_string(),
            text: "Please find my resume attached.".to_string(),
            html: None,
            pdf_base64: "JVBERi0=".to_string(),
            file_name: "jane_doe_resume.pdf".to_string(),
        }
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let json = serde_json::to_string(&request()).unwrap();
        assert!(json.contains("\"pdfBase64\""));
        assert!(json.contains("\"fileName\""));
        assert!(!json.contains("pdf_base64"));
        // html is omitted entirely when absent.
        assert!(!json.contains("html"));
    }

    #[test]
    fn validation_accepts_a_complete_request() {
        assert!(validate_request(&request()).is_ok());
    }

    #[test]
    fn validation_checks_required_fields_before_format() {
        let mut r = request();
        r.to = String::new();
        r.subject = String::new();
        let err = validate_request(&r).unwrap_err();
        assert!(matches!(err, MailError::Invalid(ref m) if m.contains("recipient")));
    }

    #[test]
    fn validation_rejects_malformed_addresses() {
        for bad in ["no-at-sign", "two@@example.com ", "a@b", "a b@c.com"] {
            let mut r = request();
            r.to = bad.to_string();
            assert!(
                validate_request(&r).is_err(),
                "accepted bad address {bad:?}"
            );
        }
    }

    #[test]
    fn validation_requires_attachment() {
        let mut r = request();
        r.pdf_base64 = String::new();
        let err = validate_request(&r).unwrap_err();
        assert!(matches!(err, MailError::Invalid(ref m) if m.contains("attachment")));
    }

    #[tokio::test]
    async fn empty_endpoint_is_a_config_error_without_network() {
        let service = HttpEmailService::new("");
        let err = service.send(&request()).await.unwrap_err();
        assert!(matches!(err, MailError::Config(_)));
    }
}
