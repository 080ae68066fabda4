//! Vision oracle integration.
//!
//! The oracle is an external, costly and possibly unreliable service that
//! reads a cropped image and returns the name it sees. [`NameExtractor`] wraps
//! one call per page with a fixed timeout and no retry, and turns every kind
//! of failure into data so one bad page never aborts the batch.

pub mod extractor;
pub mod openrouter;

pub use extractor::{NameExtraction, NameExtractor};
pub use openrouter::OpenRouterOracle;

use async_trait::async_trait;

use crate::error::OracleError;

/// Fixed instruction sent with every cropped region.
pub const EXTRACT_NAME_PROMPT: &str = "Please extract the full name from this payslip image. \
     The name may be in Hebrew. Return only the name, with no extra text or labels.";

/// Request/response contract of the external vision service.
#[async_trait]
pub trait VisionOracle: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Send a PNG image with an instruction and return the raw text reply.
    async fn read_image(&self, png: &[u8], instruction: &str) -> Result<String, OracleError>;
}
