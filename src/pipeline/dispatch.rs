//! Phase 2: split matched pages out of the stored document and mail them.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::safe_file_component;
use super::types::{DispatchOutcome, DispatchReport, PageExtraction, ProcessRecord};
use crate::document::PdfDocument;
use crate::error::PipelineError;
use crate::mail::{Mailer, OutgoingPayslip};
use crate::store::ProcessStore;

pub struct DispatchCoordinator {
    store: Arc<dyn ProcessStore>,
    mailer: Arc<dyn Mailer>,
    company_id: String,
}

impl DispatchCoordinator {
    pub fn new(store: Arc<dyn ProcessStore>, mailer: Arc<dyn Mailer>, company_id: impl Into<String>) -> Self {
        Self {
            store,
            mailer,
            company_id: company_id.into(),
        }
    }

    /// Send every matched page of a stored process, then delete the process.
    ///
    /// The record is deleted once the attempts are over, whatever their
    /// outcome. Unknown, expired and already-dispatched ids fail with
    /// `NotFound` before anything is sent.
    pub async fn dispatch(&self, id: Uuid) -> Result<DispatchReport, PipelineError> {
        let record = self.store.get(id).await?;
        info!(
            process_id = %id,
            matched = record.result_set.matched_count(),
            backend = self.mailer.name(),
            "Dispatching payslips"
        );

        let result = self.send_all(&record).await;

        if let Err(e) = self.store.delete(id).await {
            error!(process_id = %id, error = %e, "Failed to delete process record after dispatch");
        }

        let report = DispatchReport::from_outcomes(result?);
        info!(
            process_id = %id,
            sent = report.sent_count,
            failed = report.failed_count,
            "Dispatch complete"
        );
        Ok(report)
    }

    async fn send_all(&self, record: &ProcessRecord) -> Result<Vec<DispatchOutcome>, PipelineError> {
        if record.result_set.matched_count() == 0 {
            return Ok(Vec::new());
        }

        // Removed on drop, on every exit path.
        let workspace = tempfile::Builder::new()
            .prefix("payslip-dispatch-")
            .tempdir()?;

        let document = PdfDocument::load(&record.source_document)?;

        let mut outcomes = Vec::with_capacity(record.result_set.matched_count());
        for page in record.result_set.matched() {
            outcomes.push(self.send_page(&document, page, workspace.path()).await);
        }
        Ok(outcomes)
    }

    async fn send_page(&self, document: &PdfDocument, page: &PageExtraction, workspace: &Path) -> DispatchOutcome {
        let recipient_name = page.matched_name.clone().unwrap_or_default();
        let recipient_contact = page.matched_contact.clone().unwrap_or_default();
        let mut outcome = DispatchOutcome {
            page_number: page.page_number,
            recipient_name: recipient_name.clone(),
            recipient_contact: recipient_contact.clone(),
            sent: false,
            detail: String::new(),
        };

        let filename = attachment_filename(&self.company_id, &recipient_name, page.page_number);
        let bytes = match self.stage_page(document, page.page_number, &workspace.join(&filename)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(page = page.page_number, error = %e, "Failed to split page");
                outcome.detail = e.to_string();
                return outcome;
            }
        };

        let payslip = OutgoingPayslip {
            recipient_contact,
            recipient_name,
            document: bytes,
            filename,
        };

        match self.mailer.send(&payslip).await {
            Ok(detail) => {
                info!(page = page.page_number, recipient = %payslip.recipient_contact, "Payslip sent");
                outcome.sent = true;
                outcome.detail = detail;
            }
            Err(e) => {
                error!(page = page.page_number, recipient = %payslip.recipient_contact, error = %e, "Payslip send failed");
                outcome.detail = e.to_string();
            }
        }
        outcome
    }

    /// Split one page into the workspace and read it back as the attachment.
    async fn stage_page(&self, document: &PdfDocument, page: u32, path: &Path) -> Result<Vec<u8>, PipelineError> {
        let bytes = document.extract_page(page)?;
        tokio::fs::write(path, &bytes).await?;
        Ok(tokio::fs::read(path).await?)
    }
}

/// `{company_id}_{recipient_name}_page_{n}.pdf`, safe to use as a file name.
pub fn attachment_filename(company_id: &str, recipient_name: &str, page: u32) -> String {
    format!(
        "{}_{}_page_{}.pdf",
        safe_file_component(company_id),
        safe_file_component(recipient_name),
        page
    )
}
