//! Review session state: the question list, the cursor, and the judged set.
//!
//! The session owns all mutable review state so the rendering layer only
//! reads and writes through these methods; nothing here needs a display.

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::checkpoint::{
    completion_percentage, new_checkpoint_filename, Checkpoint, CheckpointInfo,
};
use crate::error::{ExamkitError, Result};
use crate::evaluation::{Evaluation, EvaluationForm, EvaluationSummary};
use crate::key::QuestionKey;
use crate::record::{load_dataset, QuestionRecord};

/// Which fields make up a record's unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScheme {
    /// `{id, subject, language, year, paper}` — single-language review.
    Question,
    /// The natural key plus the model name — cross-lingual review, where
    /// the same question is judged once per model.
    QuestionModel,
}

/// Result of a plain next/prev step. Never wraps: boundary steps leave the
/// cursor in place and say so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved(usize),
    AtFirst,
    AtLast,
}

/// Result of a jump-to-unevaluated scan, which does wrap the full list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    Moved(usize),
    AllEvaluated,
}

/// Outcome summary of a resume, for operator display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeReport {
    pub evaluated: usize,
    pub total: usize,
    pub all_evaluated: bool,
}

#[derive(Debug)]
pub struct Session {
    records: Vec<QuestionRecord>,
    keys: Vec<String>,
    index: usize,
    evaluations: BTreeMap<String, Evaluation>,
    dataset_path: PathBuf,
    checkpoint_path: PathBuf,
    scheme: KeyScheme,
}

impl Session {
    /// Start a fresh session over a dataset file. The checkpoint is created
    /// in `checkpoint_dir` on first save, under a timestamped name.
    pub fn new(dataset_path: &Path, checkpoint_dir: &Path, scheme: KeyScheme) -> Result<Self> {
        let records = load_dataset(dataset_path)?;
        let checkpoint_path = checkpoint_dir.join(new_checkpoint_filename(Utc::now()));
        Ok(Self::assemble(
            records,
            dataset_path.to_path_buf(),
            checkpoint_path,
            BTreeMap::new(),
            scheme,
        ))
    }

    /// Resume from a checkpoint. When the referenced dataset file is gone
    /// the caller must supply `dataset_override` (the operator's re-picked
    /// path); without one this fails with [`ExamkitError::DatasetMissing`]
    /// so the caller knows to prompt.
    ///
    /// The cursor lands on the first unevaluated record, or on index 0 with
    /// `all_evaluated` set when every record is already judged.
    pub fn resume(
        checkpoint_path: &Path,
        dataset_override: Option<&Path>,
    ) -> Result<(Self, ResumeReport)> {
        let checkpoint = Checkpoint::load(checkpoint_path)?;
        let dataset_path = checkpoint.resolve_dataset(dataset_override).ok_or_else(|| {
            ExamkitError::DatasetMissing(checkpoint.checkpoint_info.original_questions_file.clone())
        })?;
        let records = load_dataset(&dataset_path)?;

        // Keys that parse with a sixth field mean this checkpoint came from
        // a model-keyed (cross-lingual) session.
        let scheme = if checkpoint
            .evaluations
            .keys()
            .filter_map(|k| QuestionKey::parse(k))
            .any(|k| k.model_name.is_some())
        {
            KeyScheme::QuestionModel
        } else {
            KeyScheme::Question
        };

        let mut session = Self::assemble(
            records,
            dataset_path,
            checkpoint_path.to_path_buf(),
            checkpoint.evaluations,
            scheme,
        );

        let report = match session.first_unevaluated() {
            Some(index) => {
                session.index = index;
                ResumeReport {
                    evaluated: session.evaluations.len(),
                    total: session.len(),
                    all_evaluated: false,
                }
            }
            None => {
                session.index = 0;
                ResumeReport {
                    evaluated: session.evaluations.len(),
                    total: session.len(),
                    all_evaluated: true,
                }
            }
        };
        Ok((session, report))
    }

    fn assemble(
        records: Vec<QuestionRecord>,
        dataset_path: PathBuf,
        checkpoint_path: PathBuf,
        evaluations: BTreeMap<String, Evaluation>,
        scheme: KeyScheme,
    ) -> Self {
        let keys = records
            .iter()
            .map(|r| Self::key_for(r, scheme).canonical())
            .collect();
        Self {
            records,
            keys,
            index: 0,
            evaluations,
            dataset_path,
            checkpoint_path,
            scheme,
        }
    }

    fn key_for(record: &QuestionRecord, scheme: KeyScheme) -> QuestionKey {
        match scheme {
            KeyScheme::Question => record.key(),
            KeyScheme::QuestionModel => record.key_with_model(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn current(&self) -> &QuestionRecord {
        &self.records[self.index]
    }

    /// Canonical key of the record at `index`.
    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    pub fn is_evaluated(&self, index: usize) -> bool {
        self.keys
            .get(index)
            .is_some_and(|key| self.evaluations.contains_key(key))
    }

    /// Any existing judgment for the current record, for form pre-fill.
    pub fn current_evaluation(&self) -> Option<&Evaluation> {
        self.evaluations.get(&self.keys[self.index])
    }

    pub fn evaluations(&self) -> &BTreeMap<String, Evaluation> {
        &self.evaluations
    }

    pub fn next(&mut self) -> Step {
        if self.index + 1 < self.records.len() {
            self.index += 1;
            Step::Moved(self.index)
        } else {
            Step::AtLast
        }
    }

    pub fn prev(&mut self) -> Step {
        if self.index > 0 {
            self.index -= 1;
            Step::Moved(self.index)
        } else {
            Step::AtFirst
        }
    }

    pub fn jump_to(&mut self, index: usize) -> Result<()> {
        if index >= self.records.len() {
            return Err(ExamkitError::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    /// First unevaluated index scanning from the top, if any.
    pub fn first_unevaluated(&self) -> Option<usize> {
        (0..self.records.len()).find(|&i| !self.is_evaluated(i))
    }

    /// Jump forward to the next unevaluated record, wrapping past the end
    /// back around to the cursor. The cursor stays put when every record is
    /// evaluated.
    pub fn next_unevaluated(&mut self) -> Jump {
        let n = self.records.len();
        for offset in 1..=n {
            let i = (self.index + offset) % n;
            if !self.is_evaluated(i) {
                self.index = i;
                return Jump::Moved(i);
            }
        }
        Jump::AllEvaluated
    }

    /// Jump backward to the previous unevaluated record, wrapping past the
    /// start back around to the cursor.
    pub fn prev_unevaluated(&mut self) -> Jump {
        let n = self.records.len();
        for offset in 1..=n {
            let i = (self.index + n - offset) % n;
            if !self.is_evaluated(i) {
                self.index = i;
                return Jump::Moved(i);
            }
        }
        Jump::AllEvaluated
    }

    /// Save the operator's judgment of the current record.
    ///
    /// Overwrites any prior judgment under the same key, recomputes the
    /// aggregate summary over the whole set, and rewrites the checkpoint
    /// file in full. This is the sole durability point; a crash between
    /// saves loses only the unsaved form.
    pub fn save(&mut self, form: &EvaluationForm) -> Result<&Evaluation> {
        let key = self.keys[self.index].clone();
        let evaluation = Evaluation::from_form(&key, self.current(), form, Utc::now());
        self.evaluations.insert(key.clone(), evaluation);
        self.write_checkpoint()?;
        Ok(&self.evaluations[&key])
    }

    fn write_checkpoint(&self) -> Result<()> {
        let checkpoint = Checkpoint {
            checkpoint_info: CheckpointInfo {
                original_questions_file: self.dataset_path.clone(),
                total_questions: self.records.len(),
                evaluated_questions: self.evaluations.len(),
                completion_percentage: completion_percentage(
                    self.evaluations.len(),
                    self.records.len(),
                ),
                last_updated: Utc::now(),
                current_question_index: self.index,
            },
            evaluation_summary: EvaluationSummary::from_evaluations(self.evaluations.values()),
            evaluations: self.evaluations.clone(),
        };
        checkpoint.save(&self.checkpoint_path)
    }

    /// Key scheme this session derives record keys with.
    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dataset(dir: &Path, n: usize) -> PathBuf {
        let path = dir.join("questions.json");
        let records: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{"question_id": "q{i}", "subject": "Physics", "language": "English", "year": "2023", "paper": "1"}}"#
                )
            })
            .collect();
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"selected_questions": [{}]}}"#,
            records.join(",")
        )
        .unwrap();
        path
    }

    fn session(dir: &Path, n: usize) -> Session {
        let data = dataset(dir, n);
        Session::new(&data, dir, KeyScheme::Question).unwrap()
    }

    #[test]
    fn test_next_blocked_at_last_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), 2);
        assert_eq!(s.next(), Step::Moved(1));
        assert_eq!(s.next(), Step::AtLast);
        assert_eq!(s.index(), 1);
        assert_eq!(s.prev(), Step::Moved(0));
        assert_eq!(s.prev(), Step::AtFirst);
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn test_next_unevaluated_wraps() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), 3);
        // Evaluate q1 and q2, stand on q2; the only unevaluated record is
        // q0, behind the cursor.
        s.jump_to(1).unwrap();
        s.save(&EvaluationForm::default()).unwrap();
        s.jump_to(2).unwrap();
        s.save(&EvaluationForm::default()).unwrap();
        assert_eq!(s.next_unevaluated(), Jump::Moved(0));
    }

    #[test]
    fn test_prev_unevaluated_wraps_backward() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), 3);
        s.save(&EvaluationForm::default()).unwrap(); // evaluates q0
        assert_eq!(s.index(), 0);
        assert_eq!(s.prev_unevaluated(), Jump::Moved(2));
    }

    #[test]
    fn test_all_evaluated_leaves_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), 2);
        s.save(&EvaluationForm::default()).unwrap();
        s.next();
        s.save(&EvaluationForm::default()).unwrap();
        assert_eq!(s.next_unevaluated(), Jump::AllEvaluated);
        assert_eq!(s.index(), 1);
        assert_eq!(s.prev_unevaluated(), Jump::AllEvaluated);
        assert_eq!(s.index(), 1);
    }

    #[test]
    fn test_save_overwrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), 2);
        let mut form = EvaluationForm::default();
        form.flags.conceptual_errors = true;
        s.save(&form).unwrap();
        assert_eq!(s.evaluations().len(), 1);

        form.flags.conceptual_errors = false;
        form.notes = "second pass".into();
        s.save(&form).unwrap();
        assert_eq!(s.evaluations().len(), 1);
        assert_eq!(s.current_evaluation().unwrap().notes, "second pass");
        assert!(!s.current_evaluation().unwrap().flags.conceptual_errors);
    }

    #[test]
    fn test_resume_roundtrip_positions_on_first_unevaluated() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), 3);
        s.save(&EvaluationForm::default()).unwrap(); // q0 judged
        let checkpoint_path = s.checkpoint_path().to_path_buf();
        let saved = s.evaluations().clone();

        let (resumed, report) = Session::resume(&checkpoint_path, None).unwrap();
        assert_eq!(resumed.evaluations(), &saved);
        assert_eq!(resumed.index(), 1);
        assert_eq!(report.evaluated, 1);
        assert_eq!(report.total, 3);
        assert!(!report.all_evaluated);
    }

    #[test]
    fn test_resume_missing_dataset_requires_override() {
        let dir = tempfile::tempdir().unwrap();
        let data = dataset(dir.path(), 2);
        let mut s = Session::new(&data, dir.path(), KeyScheme::Question).unwrap();
        s.save(&EvaluationForm::default()).unwrap();
        let checkpoint_path = s.checkpoint_path().to_path_buf();

        // Simulate the dataset moving between sessions.
        let moved = dir.path().join("relocated.json");
        std::fs::rename(&data, &moved).unwrap();

        match Session::resume(&checkpoint_path, None) {
            Err(ExamkitError::DatasetMissing(p)) => assert_eq!(p, data),
            other => panic!("expected DatasetMissing, got {other:?}"),
        }

        let (resumed, report) = Session::resume(&checkpoint_path, Some(&moved)).unwrap();
        assert_eq!(report.evaluated, 1);
        assert_eq!(resumed.index(), 1);
    }

    #[test]
    fn test_resume_fully_evaluated_reports_and_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), 2);
        s.save(&EvaluationForm::default()).unwrap();
        s.next();
        s.save(&EvaluationForm::default()).unwrap();
        let checkpoint_path = s.checkpoint_path().to_path_buf();

        let (resumed, report) = Session::resume(&checkpoint_path, None).unwrap();
        assert!(report.all_evaluated);
        assert_eq!(resumed.index(), 0);
    }

    #[test]
    fn test_key_survives_record_reordering() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), 3);
        s.jump_to(2).unwrap();
        let key = s.key_at(2).unwrap().to_string();
        s.save(&EvaluationForm::default()).unwrap();
        let checkpoint_path = s.checkpoint_path().to_path_buf();

        // Re-export "the same" data in reverse order.
        let path = dir.path().join("questions.json");
        let reversed: Vec<String> = (0..3)
            .rev()
            .map(|i| {
                format!(
                    r#"{{"question_id": "q{i}", "subject": "Physics", "language": "English", "year": "2023", "paper": "1"}}"#
                )
            })
            .collect();
        std::fs::write(
            &path,
            format!(r#"{{"selected_questions": [{}]}}"#, reversed.join(",")),
        )
        .unwrap();

        let (resumed, _) = Session::resume(&checkpoint_path, None).unwrap();
        // q2 is now at index 0 and still counts as evaluated.
        assert_eq!(resumed.key_at(0).unwrap(), key);
        assert!(resumed.is_evaluated(0));
        assert_eq!(resumed.index(), 1);
    }
}
