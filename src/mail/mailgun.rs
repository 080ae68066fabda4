//! Mailgun HTTP API backend.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{Mailer, OutgoingPayslip, PDF_MIME};
use crate::config::SenderIdentity;
use crate::error::MailError;

const DEFAULT_API_BASE: &str = "https://api.mailgun.net/v3";

pub struct MailgunMailer {
    api_key: SecretString,
    domain: String,
    sender: SenderIdentity,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl MailgunMailer {
    pub fn new(api_key: SecretString, domain: String, sender: SenderIdentity) -> Self {
        Self {
            api_key,
            domain,
            sender,
            api_base: DEFAULT_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different API host (EU region, test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.api_base, self.domain)
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.sender.name, self.sender.email)
    }

    fn build_form(&self, payslip: &OutgoingPayslip) -> Result<Form, MailError> {
        let attachment = Part::bytes(payslip.document.clone())
            .file_name(payslip.filename.clone())
            .mime_str(PDF_MIME)
            .map_err(|e| MailError::Build(format!("attachment part: {e}")))?;

        Ok(Form::new()
            .text("from", self.from_header())
            .text("to", payslip.recipient_contact.clone())
            .text("subject", payslip.subject())
            .text("html", payslip.html_body(&self.sender.name))
            .part("attachment", attachment))
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    fn name(&self) -> &str {
        "mailgun"
    }

    async fn send(&self, payslip: &OutgoingPayslip) -> Result<String, MailError> {
        let form = self.build_form(payslip)?;

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MailError::SendFailed {
                backend: "mailgun".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Http {
                backend: "mailgun".into(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MailgunResponse = resp.json().await.map_err(|e| MailError::SendFailed {
            backend: "mailgun".into(),
            reason: format!("unreadable response: {e}"),
        })?;

        tracing::info!(
            recipient = %payslip.recipient_contact,
            file = %payslip.filename,
            "Payslip sent via Mailgun"
        );
        Ok(match (parsed.id, parsed.message) {
            (Some(id), _) => format!("Email sent successfully (id {id})"),
            (None, Some(message)) => message,
            (None, None) => "Email sent successfully".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> MailgunMailer {
        MailgunMailer::new(
            SecretString::from("key-test"),
            "mg.example.com".into(),
            SenderIdentity {
                name: "Payroll".into(),
                email: "payroll@example.com".into(),
            },
        )
    }

    #[test]
    fn url_uses_domain() {
        assert_eq!(
            mailer().messages_url(),
            "https://api.mailgun.net/v3/mg.example.com/messages"
        );
        assert_eq!(
            mailer().with_api_base("http://localhost:9/v3/").messages_url(),
            "http://localhost:9/v3/mg.example.com/messages"
        );
    }

    #[test]
    fn from_header_combines_name_and_address() {
        assert_eq!(mailer().from_header(), "Payroll <payroll@example.com>");
    }

    #[tokio::test]
    async fn unreachable_host_is_send_failure() {
        let mailer = mailer().with_api_base("http://127.0.0.1:9/v3");
        let payslip = OutgoingPayslip {
            recipient_contact: "a@x.com".into(),
            recipient_name: "Aname".into(),
            document: b"%PDF-1.5".to_vec(),
            filename: "main_Aname_page_1.pdf".into(),
        };
        let err = mailer.send(&payslip).await.unwrap_err();
        assert!(matches!(err, MailError::SendFailed { .. }));
    }
}
