//! SMTP backend via lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use super::{Mailer, OutgoingPayslip, PDF_MIME};
use crate::config::SenderIdentity;
use crate::error::MailError;

pub struct SmtpMailer {
    transport: SmtpTransport,
    sender: SenderIdentity,
}

impl SmtpMailer {
    pub fn new(
        host: String,
        port: u16,
        username: String,
        password: SecretString,
        sender: SenderIdentity,
    ) -> Result<Self, MailError> {
        let mut builder = SmtpTransport::starttls_relay(&host)
            .map_err(|e| MailError::SendFailed {
                backend: "smtp".into(),
                reason: format!("SMTP relay error: {e}"),
            })?
            .port(port);

        if !username.is_empty() {
            builder = builder.credentials(Credentials::new(
                username,
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }

    fn build_message(&self, payslip: &OutgoingPayslip) -> Result<Message, MailError> {
        let from = mailbox(&self.sender.name, &self.sender.email)?;
        let to = mailbox(&payslip.recipient_name, &payslip.recipient_contact)?;

        let content_type = ContentType::parse(PDF_MIME)
            .map_err(|e| MailError::Build(format!("content type: {e}")))?;
        let attachment =
            Attachment::new(payslip.filename.clone()).body(payslip.document.clone(), content_type);

        Message::builder()
            .from(from)
            .to(to)
            .subject(payslip.subject())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(payslip.html_body(&self.sender.name)))
                    .singlepart(attachment),
            )
            .map_err(|e| MailError::Build(format!("Failed to build email: {e}")))
    }
}

fn mailbox(name: &str, address: &str) -> Result<Mailbox, MailError> {
    let email = address.parse().map_err(|e| MailError::InvalidAddress {
        address: address.to_string(),
        reason: format!("{e}"),
    })?;
    Ok(Mailbox::new(Some(name.to_string()), email))
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, payslip: &OutgoingPayslip) -> Result<String, MailError> {
        let message = self.build_message(payslip)?;
        let transport = self.transport.clone();

        let response = tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::SendFailed {
                backend: "smtp".into(),
                reason: format!("send task panicked: {e}"),
            })?
            .map_err(|e| MailError::SendFailed {
                backend: "smtp".into(),
                reason: format!("SMTP send failed: {e}"),
            })?;

        tracing::info!(
            recipient = %payslip.recipient_contact,
            file = %payslip.filename,
            "Payslip sent via SMTP"
        );
        Ok(format!(
            "Email sent successfully ({})",
            response.code()
        ))
    }
}
