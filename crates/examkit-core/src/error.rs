//! Error types for review-session and answer-collection operations.

use std::path::PathBuf;
use thiserror::Error;

/// Error types that can occur while loading datasets, saving checkpoints,
/// or running the consensus workflow.
#[derive(Error, Debug)]
pub enum ExamkitError {
    /// File I/O error (dataset load, checkpoint write, CSV export).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// The source dataset file contained no question records.
    #[error("no questions found in dataset: {0}")]
    EmptyDataset(PathBuf),

    /// A checkpoint references a dataset file that no longer exists and no
    /// replacement was supplied. The caller should re-prompt the operator
    /// and resume again with an explicit path.
    #[error("dataset file referenced by checkpoint is missing: {0}")]
    DatasetMissing(PathBuf),

    /// Navigation or lookup with an index outside the question list.
    #[error("question index {index} out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Accepting a majority vote when no consensus answer exists.
    #[error("no consensus answer to accept for {0}")]
    NoConsensusAnswer(String),

    /// A required operator input was absent (empty custom answer, …).
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// Every clipboard strategy in the chain failed.
    #[error("all clipboard strategies failed: {0}")]
    ClipboardUnavailable(String),
}

/// Type alias for [`Result<T, ExamkitError>`].
pub type Result<T> = std::result::Result<T, ExamkitError>;
