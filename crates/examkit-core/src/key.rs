//! Stable unique keys for question records.
//!
//! Every review tool detects "already evaluated" state by looking the current
//! record up in a map keyed by its natural-key fields. The key must therefore
//! be identical at save-time and load-time, even when the underlying dataset
//! file has been re-exported with a different record order in between.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder substituted for an absent natural-key field.
pub const MISSING_FIELD: &str = "unknown";

const DELIMITER: char = '_';

/// Structured natural key of one question instance.
///
/// Field-wise equality over `{original_question_id, subject, language, year,
/// paper}` plus an optional model name (cross-lingual review keys include the
/// model under evaluation, so the same question judged against two models
/// yields two keys).
///
/// The canonical string form joins the fields with `_`, percent-escaping `%`
/// and `_` inside each field first. The encoding is injective: two keys
/// render to the same string only if all fields are equal. Fields that
/// contain neither character render exactly as the historical unescaped
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct QuestionKey {
    pub original_question_id: String,
    pub subject: String,
    pub language: String,
    pub year: String,
    pub paper: String,
    pub model_name: Option<String>,
}

impl QuestionKey {
    /// Build a key from the five natural-key fields, substituting
    /// [`MISSING_FIELD`] for any that are absent. Never fails.
    pub fn new(
        original_question_id: Option<&str>,
        subject: Option<&str>,
        language: Option<&str>,
        year: Option<&str>,
        paper: Option<&str>,
    ) -> Self {
        let field = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(MISSING_FIELD)
                .to_string()
        };
        Self {
            original_question_id: field(original_question_id),
            subject: field(subject),
            language: field(language),
            year: field(year),
            paper: field(paper),
            model_name: None,
        }
    }

    /// Append the model name to the key (cross-lingual review).
    #[must_use]
    pub fn with_model(mut self, model_name: &str) -> Self {
        let trimmed = model_name.trim();
        self.model_name = if trimmed.is_empty() {
            Some(MISSING_FIELD.to_string())
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Canonical string form, used as the checkpoint JSON map key.
    pub fn canonical(&self) -> String {
        let mut parts: Vec<String> = vec![
            escape(&self.original_question_id),
            escape(&self.subject),
            escape(&self.language),
            escape(&self.year),
            escape(&self.paper),
        ];
        if let Some(model) = &self.model_name {
            parts.push(escape(model));
        }
        parts.join("_")
    }

    /// Invert [`QuestionKey::canonical`]. Returns `None` when the string does
    /// not split into five or six fields.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(DELIMITER).collect();
        if parts.len() != 5 && parts.len() != 6 {
            return None;
        }
        Some(Self {
            original_question_id: unescape(parts[0]),
            subject: unescape(parts[1]),
            language: unescape(parts[2]),
            year: unescape(parts[3]),
            paper: unescape(parts[4]),
            model_name: parts.get(5).map(|p| unescape(p)),
        })
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl From<QuestionKey> for String {
    fn from(key: QuestionKey) -> Self {
        key.canonical()
    }
}

impl TryFrom<String> for QuestionKey {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("malformed question key: '{s}'"))
    }
}

/// Escape `%` and the join delimiter so fields cannot collide with it.
fn escape(field: &str) -> String {
    field.replace('%', "%25").replace(DELIMITER, "%5F")
}

fn unescape(field: &str) -> String {
    field.replace("%5F", "_").replace("%25", "%")
}
