//! Error types for annotation, composition and export operations.

use thiserror::Error;

/// Error types that can occur while annotating regions, composing images,
/// or exporting question crops.
#[derive(Error, Debug)]
pub enum AnnotateError {
    /// File I/O error (progress save, image export, directory scan).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Image encode/decode error while writing a composed crop.
    #[error("image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// A required operator input was absent ("draw a rectangle first",
    /// "select a subject").
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// Multi-region operations called with no pending question open.
    #[error("no multi-region question in progress")]
    NoPending,

    /// Lookup of an annotation id that does not exist in the store.
    #[error("unknown annotation: {0}")]
    UnknownAnnotation(String),

    /// Page index beyond the loaded document.
    #[error("page {page} out of range (document has {pages} pages)")]
    PageOutOfRange { page: usize, pages: usize },

    /// Page rasterization failure from the PDF backend.
    #[error("render error: {0}")]
    RenderError(String),

    /// Exam paper download failure.
    #[error("download error: {0}")]
    DownloadError(String),
}

impl From<reqwest::Error> for AnnotateError {
    fn from(err: reqwest::Error) -> Self {
        Self::DownloadError(err.to_string())
    }
}

/// Type alias for [`Result<T, AnnotateError>`].
pub type Result<T> = std::result::Result<T, AnnotateError>;
