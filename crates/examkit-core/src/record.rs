//! Question records and dataset loading.
//!
//! Records are read-only within a session: the review tools look at them and
//! key them, but never write them back to the source file.

use crate::error::{ExamkitError, Result};
use crate::key::QuestionKey;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Exam question format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ-Single")]
    McqSingle,
    #[serde(rename = "MCQ-Multiple")]
    McqMultiple,
    Numerical,
    Matching,
}

impl QuestionType {
    /// All known types, in exam section order.
    pub const ALL: [QuestionType; 4] = [
        Self::McqSingle,
        Self::McqMultiple,
        Self::Numerical,
        Self::Matching,
    ];

    /// Label used in filenames and question ids.
    pub fn label(self) -> &'static str {
        match self {
            Self::McqSingle => "MCQ-Single",
            Self::McqMultiple => "MCQ-Multiple",
            Self::Numerical => "Numerical",
            Self::Matching => "Matching",
        }
    }

    /// Exam section number for the type.
    pub fn section(self) -> u8 {
        match self {
            Self::McqSingle => 1,
            Self::McqMultiple => 2,
            Self::Numerical => 3,
            Self::Matching => 4,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "MCQ-Single" => Ok(Self::McqSingle),
            "MCQ-Multiple" => Ok(Self::McqMultiple),
            "Numerical" => Ok(Self::Numerical),
            "Matching" => Ok(Self::Matching),
            _ => Err(format!("unknown question type: '{s}'")),
        }
    }
}

/// One exam question under review, as loaded from the source dataset file.
///
/// Every field is optional at the serialization boundary; dataset re-exports
/// vary in which columns they carry, and a missing optional field must never
/// fail the load. Year and paper accept either JSON strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(default, alias = "original_question_id")]
    pub question_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "stringly")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "stringly")]
    pub paper: Option<String>,
    #[serde(default)]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default, alias = "predicted_answers")]
    pub predicted_answer: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub image_filename: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub full_response: Option<String>,
    #[serde(default)]
    pub is_correct: Option<bool>,
}

impl QuestionRecord {
    /// Natural key of this record (no model suffix).
    pub fn key(&self) -> QuestionKey {
        QuestionKey::new(
            self.question_id.as_deref(),
            self.subject.as_deref(),
            self.language.as_deref(),
            self.year.as_deref(),
            self.paper.as_deref(),
        )
    }

    /// Natural key including the model name (cross-lingual review).
    pub fn key_with_model(&self) -> QuestionKey {
        self.key()
            .with_model(self.model_name.as_deref().unwrap_or_default())
    }
}

/// Accept a JSON string, integer or float for fields like `year`/`paper`.
fn stringly<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stringly {
        Str(String),
        Int(i64),
        Float(f64),
        None,
    }

    Ok(match Stringly::deserialize(deserializer)? {
        Stringly::Str(s) => Some(s),
        Stringly::Int(n) => Some(n.to_string()),
        Stringly::Float(f) => Some(f.to_string()),
        Stringly::None => None,
    })
}

#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    selected_questions: Vec<QuestionRecord>,
}

/// Load the ordered question list from a source dataset file.
///
/// Accepts either an object with a `selected_questions` list or a bare JSON
/// array of records. Fails on an empty list: a session over zero questions
/// has nothing to navigate.
pub fn load_dataset(path: &Path) -> Result<Vec<QuestionRecord>> {
    let content = std::fs::read_to_string(path)?;
    let records = match serde_json::from_str::<DatasetFile>(&content) {
        Ok(file) if !file.selected_questions.is_empty() => file.selected_questions,
        _ => serde_json::from_str::<Vec<QuestionRecord>>(&content).unwrap_or_default(),
    };
    if records.is_empty() {
        return Err(ExamkitError::EmptyDataset(path.to_path_buf()));
    }
    log::info!("loaded {} questions from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_question_type_labels_roundtrip() {
        for qt in QuestionType::ALL {
            assert_eq!(qt.label().parse::<QuestionType>().unwrap(), qt);
        }
    }

    #[test]
    fn test_record_key_uses_placeholders() {
        let record = QuestionRecord {
            question_id: Some("MCQ-Single_q3".into()),
            subject: Some("Physics".into()),
            ..Default::default()
        };
        assert_eq!(
            record.key().canonical(),
            "MCQ-Single%5Fq3_Physics_unknown_unknown_unknown"
        );
    }

    #[test]
    fn test_numeric_year_and_paper_accepted() {
        let json = r#"{"question_id": "q1", "year": 2023, "paper": 1}"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.year.as_deref(), Some("2023"));
        assert_eq!(record.paper.as_deref(), Some("1"));
    }

    #[test]
    fn test_load_dataset_wrapped_and_bare() {
        let mut wrapped = tempfile::NamedTempFile::new().unwrap();
        write!(
            wrapped,
            r#"{{"selected_questions": [{{"question_id": "q1"}}]}}"#
        )
        .unwrap();
        assert_eq!(load_dataset(wrapped.path()).unwrap().len(), 1);

        let mut bare = tempfile::NamedTempFile::new().unwrap();
        write!(bare, r#"[{{"question_id": "q1"}}, {{"question_id": "q2"}}]"#).unwrap();
        assert_eq!(load_dataset(bare.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_load_dataset_empty_is_error() {
        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, r#"{{"selected_questions": []}}"#).unwrap();
        assert!(matches!(
            load_dataset(empty.path()),
            Err(ExamkitError::EmptyDataset(_))
        ));
    }
}
