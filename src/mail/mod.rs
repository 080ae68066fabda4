//! Outbound mail: the send contract consumed by dispatch.
//!
//! Each backend delivers one payslip per call and reports a free-form
//! detail string on success. Failures are returned, never retried.

pub mod mailgun;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::MailConfig;
use crate::error::MailError;

pub use mailgun::MailgunMailer;
pub use smtp::SmtpMailer;

/// MIME type of every attachment.
pub const PDF_MIME: &str = "application/pdf";

/// One single-page payslip on its way to one recipient.
#[derive(Debug, Clone)]
pub struct OutgoingPayslip {
    pub recipient_contact: String,
    pub recipient_name: String,
    pub document: Vec<u8>,
    pub filename: String,
}

impl OutgoingPayslip {
    pub fn subject(&self) -> String {
        format!("Your Payslip is Ready - {}", self.recipient_name)
    }

    /// HTML body greeting the recipient, signed by `sender_name`.
    pub fn html_body(&self, sender_name: &str) -> String {
        format!(
            "<html><body>\
             <p>Hello {name},</p>\
             <p>Your payslip is attached to this email as a PDF document.</p>\
             <p>If you have any questions about your payslip, please reply to this email.</p>\
             <p>Best regards,<br>{sender}</p>\
             </body></html>",
            name = escape_html(&self.recipient_name),
            sender = escape_html(sender_name),
        )
    }
}

/// Send contract. `Ok` carries a diagnostic detail for the caller.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Backend name for logs and error messages.
    fn name(&self) -> &str;

    async fn send(&self, payslip: &OutgoingPayslip) -> Result<String, MailError>;
}

/// Build the configured backend.
pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config {
        MailConfig::Mailgun {
            api_key,
            domain,
            sender,
        } => Ok(Arc::new(MailgunMailer::new(
            api_key.clone(),
            domain.clone(),
            sender.clone(),
        ))),
        MailConfig::Smtp {
            host,
            port,
            username,
            password,
            sender,
        } => Ok(Arc::new(SmtpMailer::new(
            host.clone(),
            *port,
            username.clone(),
            password.clone(),
            sender.clone(),
        )?)),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
