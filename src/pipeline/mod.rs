//! Two-phase payslip pipeline.
//!
//! 1. Preview: rasterize → crop → oracle → match for every page, then store
//!    the document and results under a fresh correlation id.
//! 2. Dispatch: look the id up, mail each matched page as its own PDF, then
//!    delete the stored process whatever the send outcomes.

pub mod dispatch;
pub mod extraction;
pub mod service;
pub mod types;

use std::sync::LazyLock;

use regex::Regex;

pub use dispatch::{DispatchCoordinator, attachment_filename};
pub use extraction::{ExtractionCoordinator, ExtractionSettings};
pub use service::PayslipService;
pub use types::{DispatchOutcome, DispatchReport, PageExtraction, Preview, ProcessRecord, ResultSet};

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f]"#).unwrap());

/// Replace characters that are not allowed in file names with `_`.
pub(crate) fn safe_file_component(s: &str) -> String {
    let cleaned = UNSAFE_FILE_CHARS.replace_all(s.trim(), "_");
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.into_owned()
    }
}
