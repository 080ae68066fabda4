//! Two-phase entry points: preview (extract + store) and dispatch.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::dispatch::DispatchCoordinator;
use super::extraction::ExtractionCoordinator;
use super::types::{DispatchReport, Preview};
use crate::document::{CropArea, looks_like_pdf};
use crate::error::PipelineError;
use crate::matching::Registry;
use crate::store::ProcessStore;

pub struct PayslipService {
    extraction: ExtractionCoordinator,
    dispatch: DispatchCoordinator,
    store: Arc<dyn ProcessStore>,
    max_upload_bytes: usize,
}

impl PayslipService {
    pub fn new(
        extraction: ExtractionCoordinator,
        dispatch: DispatchCoordinator,
        store: Arc<dyn ProcessStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            extraction,
            dispatch,
            store,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Phase 1. Extract every page and keep the document for a later dispatch.
    pub async fn start_extraction(
        &self,
        document: Vec<u8>,
        crop: &CropArea,
        registry: &Registry,
    ) -> Result<Preview, PipelineError> {
        self.validate_upload(&document)?;

        let results = self.extraction.extract(&document, crop, registry).await?;
        let correlation_id = self.store.create(document, results.clone()).await?;
        info!(
            process_id = %correlation_id,
            pages = results.len(),
            matched = results.matched_count(),
            "Preview ready"
        );

        Ok(Preview {
            correlation_id,
            results,
        })
    }

    /// Phase 2. Fails with `NotFound` for unknown or already-used ids.
    pub async fn dispatch(&self, correlation_id: Uuid) -> Result<DispatchReport, PipelineError> {
        self.dispatch.dispatch(correlation_id).await
    }

    fn validate_upload(&self, document: &[u8]) -> Result<(), PipelineError> {
        if document.is_empty() {
            return Err(PipelineError::InvalidUpload("empty file".into()));
        }
        if document.len() > self.max_upload_bytes {
            return Err(PipelineError::InvalidUpload(format!(
                "file is {} bytes, limit is {} bytes",
                document.len(),
                self.max_upload_bytes
            )));
        }
        if !looks_like_pdf(document) {
            return Err(PipelineError::InvalidUpload("not a PDF document".into()));
        }
        Ok(())
    }
}
