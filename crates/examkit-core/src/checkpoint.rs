//! Whole-file checkpoint persistence for review sessions.
//!
//! A checkpoint is the sole durability point: it is rewritten in full on
//! every save and never appended to. New sessions embed a creation timestamp
//! in the filename so a re-run cannot silently clobber an older, unrelated
//! session unless the operator explicitly resumes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::evaluation::{Evaluation, EvaluationSummary};

/// Metadata needed to resume a session from a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    /// Source dataset this session was evaluating. Must remain resolvable
    /// for resume; when missing the operator is asked to relocate it.
    pub original_questions_file: PathBuf,
    pub total_questions: usize,
    pub evaluated_questions: usize,
    /// Rounded to one decimal place.
    pub completion_percentage: f64,
    pub last_updated: DateTime<Utc>,
    pub current_question_index: usize,
}

/// Persisted snapshot of a review session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_info: CheckpointInfo,
    pub evaluation_summary: EvaluationSummary,
    pub evaluations: BTreeMap<String, Evaluation>,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Whole-file overwrite. Either the write completes and the file is
    /// consistent, or it errors and the previous file is untouched; partial
    /// corruption is limited to process termination mid-write.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!(
            "checkpoint saved: {} ({}/{} evaluated)",
            path.display(),
            self.checkpoint_info.evaluated_questions,
            self.checkpoint_info.total_questions
        );
        Ok(())
    }

    /// Locate the session's dataset file: the referenced path if it still
    /// exists, otherwise the supplied replacement (operator re-prompt),
    /// otherwise `None`.
    pub fn resolve_dataset(&self, replacement: Option<&Path>) -> Option<PathBuf> {
        let referenced = &self.checkpoint_info.original_questions_file;
        if referenced.exists() {
            return Some(referenced.clone());
        }
        replacement
            .filter(|p| p.exists())
            .map(Path::to_path_buf)
    }
}

/// Filename for a fresh session's checkpoint, embedding the creation time.
pub fn new_checkpoint_filename(created: DateTime<Utc>) -> String {
    format!("manual_evaluations_{}.json", created.format("%Y%m%d_%H%M%S"))
}

/// Completion percentage rounded to one decimal place.
pub fn completion_percentage(evaluated: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (evaluated as f64 / total as f64 * 1000.0).round() / 10.0
}
