//! Document handling: page rasterization, region cropping and page splitting.

pub mod crop;
pub mod rasterize;
pub mod split;

pub use crop::{CropArea, crop_region, encode_png};
pub use rasterize::{PdftoppmRasterizer, Rasterizer};
pub use split::PdfDocument;

/// Magic bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Cheap format sniff used before any parsing.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}
