//! Human judgments and their aggregated summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::QuestionRecord;

/// Maximum value of a cross-lingual severity scale.
pub const MAX_SEVERITY: u8 = 10;

/// The four error categories every review tool scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFlags {
    #[serde(default)]
    pub conceptual_errors: bool,
    #[serde(default)]
    pub grounding_errors: bool,
    #[serde(default)]
    pub computation_errors: bool,
    #[serde(default)]
    pub instruction_errors: bool,
}

impl ErrorFlags {
    /// True when any category is marked.
    pub fn any(&self) -> bool {
        self.conceptual_errors
            || self.grounding_errors
            || self.computation_errors
            || self.instruction_errors
    }
}

/// Denormalized snapshot of the record fields needed for later export, so
/// exports never have to re-read the source dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub question_type: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub image_filename: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub paper: String,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub predicted_answer: String,
}

impl RecordSnapshot {
    pub fn from_record(record: &QuestionRecord) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            subject: text(&record.subject),
            language: text(&record.language),
            question_type: record
                .question_type
                .map(|qt| qt.label().to_string())
                .unwrap_or_default(),
            is_correct: record.is_correct.unwrap_or(false),
            image_filename: text(&record.image_filename),
            year: text(&record.year),
            paper: text(&record.paper),
            correct_answer: text(&record.correct_answer),
            predicted_answer: text(&record.predicted_answer),
        }
    }
}

/// Operator form state captured on save.
///
/// Single-language review uses the boolean flags and notes; cross-lingual
/// review additionally fills the 0–10 severity scales and extra yes/no
/// questions. Severity values are clamped to [`MAX_SEVERITY`] on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationForm {
    pub flags: ErrorFlags,
    #[serde(default)]
    pub severity_scores: BTreeMap<String, u8>,
    #[serde(default)]
    pub crosslingual_answers: BTreeMap<String, bool>,
    #[serde(default)]
    pub notes: String,
}

impl EvaluationForm {
    pub fn set_severity(&mut self, scale: &str, score: u8) {
        self.severity_scores
            .insert(scale.to_string(), score.min(MAX_SEVERITY));
    }

    pub fn set_answer(&mut self, question: &str, value: bool) {
        self.crosslingual_answers.insert(question.to_string(), value);
    }
}

/// One saved human judgment, keyed by the record's unique question key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub unique_question_id: String,
    pub original_question_id: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(flatten)]
    pub flags: ErrorFlags,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub severity_scores: BTreeMap<String, u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub crosslingual_answers: BTreeMap<String, bool>,
    #[serde(default)]
    pub notes: String,
    pub evaluation_timestamp: DateTime<Utc>,
    pub question_metadata: RecordSnapshot,
}

impl Evaluation {
    /// Build a judgment from the current record and the operator's form.
    pub fn from_form(
        key: &str,
        record: &QuestionRecord,
        form: &EvaluationForm,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            unique_question_id: key.to_string(),
            original_question_id: record
                .question_id
                .clone()
                .unwrap_or_else(|| crate::key::MISSING_FIELD.to_string()),
            model_name: record.model_name.clone().unwrap_or_default(),
            flags: form.flags,
            severity_scores: form
                .severity_scores
                .iter()
                .map(|(k, v)| (k.clone(), (*v).min(MAX_SEVERITY)))
                .collect(),
            crosslingual_answers: form.crosslingual_answers.clone(),
            notes: form.notes.trim().to_string(),
            evaluation_timestamp: timestamp,
            question_metadata: RecordSnapshot::from_record(record),
        }
    }
}

/// Aggregated counts over the whole evaluation set, recomputed from scratch
/// on every save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total_errors: usize,
    pub conceptual_errors: usize,
    pub grounding_errors: usize,
    pub computation_errors: usize,
    pub instruction_errors: usize,
    pub questions_with_notes: usize,
}

impl EvaluationSummary {
    pub fn from_evaluations<'a, I>(evaluations: I) -> Self
    where
        I: IntoIterator<Item = &'a Evaluation>,
    {
        let mut summary = Self::default();
        for eval in evaluations {
            if eval.flags.any() {
                summary.total_errors += 1;
            }
            if eval.flags.conceptual_errors {
                summary.conceptual_errors += 1;
            }
            if eval.flags.grounding_errors {
                summary.grounding_errors += 1;
            }
            if eval.flags.computation_errors {
                summary.computation_errors += 1;
            }
            if eval.flags.instruction_errors {
                summary.instruction_errors += 1;
            }
            if !eval.notes.trim().is_empty() {
                summary.questions_with_notes += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> QuestionRecord {
        QuestionRecord {
            question_id: Some("q7".into()),
            subject: Some("Chemistry".into()),
            language: Some("Hindi".into()),
            year: Some("2021".into()),
            paper: Some("2".into()),
            correct_answer: Some("B".into()),
            predicted_answer: Some("C".into()),
            model_name: Some("m1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_captures_export_fields() {
        let snap = RecordSnapshot::from_record(&record());
        assert_eq!(snap.subject, "Chemistry");
        assert_eq!(snap.correct_answer, "B");
        assert_eq!(snap.predicted_answer, "C");
        assert!(!snap.is_correct);
    }

    #[test]
    fn test_severity_clamped() {
        let mut form = EvaluationForm::default();
        form.set_severity("translation_quality", 14);
        assert_eq!(form.severity_scores["translation_quality"], MAX_SEVERITY);
    }

    #[test]
    fn test_summary_counts() {
        let mut form_a = EvaluationForm::default();
        form_a.flags.conceptual_errors = true;
        form_a.flags.computation_errors = true;
        form_a.notes = "misread diagram".into();
        let mut form_b = EvaluationForm::default();
        form_b.flags.grounding_errors = true;
        let form_c = EvaluationForm::default();

        let now = Utc::now();
        let evals: Vec<Evaluation> = [form_a, form_b, form_c]
            .iter()
            .enumerate()
            .map(|(i, form)| Evaluation::from_form(&format!("k{i}"), &record(), form, now))
            .collect();

        let summary = EvaluationSummary::from_evaluations(&evals);
        assert_eq!(summary.total_errors, 2);
        assert_eq!(summary.conceptual_errors, 1);
        assert_eq!(summary.grounding_errors, 1);
        assert_eq!(summary.computation_errors, 1);
        assert_eq!(summary.instruction_errors, 0);
        assert_eq!(summary.questions_with_notes, 1);
    }
}
