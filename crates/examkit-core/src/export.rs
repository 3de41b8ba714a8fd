//! Flattened CSV export of an evaluation set.
//!
//! One row per evaluation, scalar columns only. The CSV is consumed by
//! humans and spreadsheets; nothing in this system reads it back.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::Result;
use crate::evaluation::Evaluation;

/// Write every evaluation as one CSV row.
///
/// Severity scales and extra cross-lingual questions vary per session, so
/// their columns are the union of the keys seen across all evaluations, in
/// sorted order after the fixed columns. Absent values render as `0` /
/// `false`.
pub fn write_evaluations_csv(
    path: &Path,
    evaluations: &BTreeMap<String, Evaluation>,
) -> Result<usize> {
    let severity_columns: BTreeSet<&str> = evaluations
        .values()
        .flat_map(|e| e.severity_scores.keys().map(String::as_str))
        .collect();
    let answer_columns: BTreeSet<&str> = evaluations
        .values()
        .flat_map(|e| e.crosslingual_answers.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![
        "unique_question_id",
        "original_question_id",
        "model_name",
        "subject",
        "language",
        "year",
        "paper",
        "question_type",
        "correct_answer",
        "predicted_answer",
        "is_correct",
        "conceptual_errors",
        "grounding_errors",
        "computation_errors",
        "instruction_errors",
    ];
    header.extend(severity_columns.iter().copied());
    header.extend(answer_columns.iter().copied());
    header.push("notes");
    header.push("evaluation_timestamp");
    writer.write_record(&header)?;

    for eval in evaluations.values() {
        let meta = &eval.question_metadata;
        let mut row: Vec<String> = vec![
            eval.unique_question_id.clone(),
            eval.original_question_id.clone(),
            eval.model_name.clone(),
            meta.subject.clone(),
            meta.language.clone(),
            meta.year.clone(),
            meta.paper.clone(),
            meta.question_type.clone(),
            meta.correct_answer.clone(),
            meta.predicted_answer.clone(),
            meta.is_correct.to_string(),
            eval.flags.conceptual_errors.to_string(),
            eval.flags.grounding_errors.to_string(),
            eval.flags.computation_errors.to_string(),
            eval.flags.instruction_errors.to_string(),
        ];
        for column in &severity_columns {
            row.push(
                eval.severity_scores
                    .get(*column)
                    .copied()
                    .unwrap_or(0)
                    .to_string(),
            );
        }
        for column in &answer_columns {
            row.push(
                eval.crosslingual_answers
                    .get(*column)
                    .copied()
                    .unwrap_or(false)
                    .to_string(),
            );
        }
        row.push(eval.notes.clone());
        row.push(eval.evaluation_timestamp.to_rfc3339());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(evaluations.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationForm;
    use crate::record::QuestionRecord;
    use chrono::Utc;

    #[test]
    fn test_csv_has_union_of_dynamic_columns() {
        let record = QuestionRecord {
            question_id: Some("q1".into()),
            subject: Some("Physics".into()),
            ..Default::default()
        };

        let mut form_a = EvaluationForm::default();
        form_a.set_severity("translation_quality", 7);
        let mut form_b = EvaluationForm::default();
        form_b.set_answer("meaning_preserved", true);

        let mut evaluations = BTreeMap::new();
        evaluations.insert(
            "k1".to_string(),
            Evaluation::from_form("k1", &record, &form_a, Utc::now()),
        );
        evaluations.insert(
            "k2".to_string(),
            Evaluation::from_form("k2", &record, &form_b, Utc::now()),
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = write_evaluations_csv(&path, &evaluations).unwrap();
        assert_eq!(rows, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert!(header.contains("translation_quality"));
        assert!(header.contains("meaning_preserved"));
        // 2 evaluations + header
        assert_eq!(content.lines().count(), 3);
    }
}
