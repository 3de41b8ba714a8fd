//! Headless core for exam-question dataset annotation and review.
//!
//! This crate holds everything the annotation workstations share that does
//! not need a display: stable question keys, the answer consensus engine,
//! evaluation/checkpoint persistence, review-session navigation, the
//! answer-collection workflow, the image-requirement sheet, image lookup and
//! the clipboard fallback chain. Rendering layers read and write only
//! through these types, so the whole workflow is testable without a GUI.
//!
//! Data-integrity rules that hold throughout:
//!
//! - Source datasets are read-only; review tools never mutate them.
//! - Checkpoints and progress files are rewritten wholesale on every save —
//!   a crash between saves loses only the unsaved in-progress form.
//! - Malformed filenames are skipped with a logged warning, never fatal.

pub mod checkpoint;
pub mod clipboard;
pub mod collection;
pub mod consensus;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod filenames;
pub mod image_req;
pub mod images;
pub mod key;
pub mod record;
pub mod session;

pub use checkpoint::{Checkpoint, CheckpointInfo};
pub use consensus::{analyze, AnswerSet, Confidence, ConsensusReport, ConsensusResult};
pub use error::{ExamkitError, Result};
pub use evaluation::{Evaluation, EvaluationForm, EvaluationSummary};
pub use key::QuestionKey;
pub use record::{load_dataset, QuestionRecord, QuestionType};
pub use session::{Jump, KeyScheme, Session, Step};
