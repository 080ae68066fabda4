//! Page rasterization.
//!
//! The production rasterizer shells out to poppler's `pdftoppm`, which renders
//! every page of the document to PNG in one pass. The document is parsed with
//! lopdf first so that malformed input is reported as a decode error instead
//! of an opaque renderer failure.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::DynamicImage;
use tokio::process::Command;
use tracing::{debug, info};

use super::split::page_count;
use crate::error::DocumentError;

/// Converts a document into one image per page, in page order.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, document: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, DocumentError>;
}

/// `pdftoppm`-backed rasterizer.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
        }
    }
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `pdftoppm` binary instead of the one on `PATH`.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, document: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, DocumentError> {
        let pages = page_count(document)?;
        if pages == 0 {
            return Ok(Vec::new());
        }

        let scratch = tempfile::Builder::new()
            .prefix("payslip-raster-")
            .tempdir()?;
        let input = scratch.path().join("input.pdf");
        tokio::fs::write(&input, document).await?;

        let output = Command::new(&self.binary)
            .args(["-png", "-r", &dpi.to_string()])
            .arg(&input)
            .arg(scratch.path().join("page"))
            .output()
            .await
            .map_err(|e| {
                DocumentError::Rasterize(format!("failed to run {}: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocumentError::Rasterize(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let dir = scratch.path().to_path_buf();
        let images = tokio::task::spawn_blocking(move || load_page_images(&dir, pages))
            .await
            .map_err(|e| DocumentError::Rasterize(format!("page decode task failed: {e}")))??;

        info!(pages = images.len(), dpi, "Rasterized document");
        Ok(images)
    }
}

/// Decode `page-N.png` files written by pdftoppm, in page order.
fn load_page_images(dir: &Path, pages: u32) -> Result<Vec<DynamicImage>, DocumentError> {
    let mut images = Vec::with_capacity(pages as usize);
    for page in 1..=pages {
        let path = find_page_image(dir, page, pages).ok_or_else(|| {
            DocumentError::Rasterize(format!("pdftoppm produced no image for page {page}"))
        })?;
        let bytes = std::fs::read(&path)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| DocumentError::Rasterize(format!("page {page}: {e}")))?;
        debug!(page, width = image.width(), height = image.height(), "Decoded page image");
        images.push(image);
    }
    Ok(images)
}

/// pdftoppm zero-pads page numbers to the width of the last page number
/// (page-1.png for short documents, page-01.png past nine pages, ...).
fn find_page_image(dir: &Path, page: u32, pages: u32) -> Option<PathBuf> {
    let expected = pages.to_string().len();
    std::iter::once(expected)
        .chain(1..=6)
        .map(|width| dir.join(format!("page-{page:0width$}.png")))
        .find(|path| path.exists())
}
