// Export: visual tree + plan → downloadable artifact.
// Sequencing lives in `pipeline`; the two ways of producing output (raster PDF,
// native print document) are `ExportStrategy` implementations.

pub mod assets;
pub mod filename;
pub mod handlers;
pub mod inflight;
pub mod pdf;
pub mod pipeline;
pub mod print;
pub mod raster;
pub mod strategy;
pub mod surface;
pub mod text;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("There is no content to export")]
    NothingToExport,

    #[error("Raster error: {0}")]
    Raster(String),

    #[error("Canvas {width}x{height} exceeds the {limit} pixel limit")]
    CanvasTooLarge { width: u32, height: u32, limit: u64 },

    #[error("Image encode error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("PDF assembly error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Print handoff error: {0}")]
    Print(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error("Export worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
