//! The exported region-image filename template.
//!
//! `{year}_P{paper}_{language}_{subject}_{question_id}_{question_type}_page{n}.png`
//! where `question_id` is `{question_type}_q{n}`. The template is load-bearing:
//! it is the only mechanism for recovering per-type sequence counters across
//! restarts and for locating a question's image from its record, so the
//! delimiter placement must parse back unambiguously.

use crate::record::QuestionType;

/// Parsed form of an exported image filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImageName {
    pub year: String,
    /// Paper number without the `P` prefix.
    pub paper: String,
    pub language: String,
    pub subject: String,
    /// Full id, e.g. `MCQ-Single_q3`.
    pub question_id: String,
    pub question_type: QuestionType,
    pub question_number: u32,
    /// 1-based page number, when the trailing `page{n}` part is present.
    pub page: Option<u32>,
}

/// Render the template. `question_id` should already be a generated
/// `{type}_q{n}` id; slashes and dots are replaced so the id cannot escape
/// the filename, and spaces in the type label are underscored.
pub fn format_image_filename(
    year: &str,
    paper: &str,
    language: &str,
    subject: &str,
    question_id: &str,
    question_type: QuestionType,
    page_number: u32,
) -> String {
    let question_id = question_id.replace('/', "_").replace('.', "_");
    let type_label = question_type.label().replace(' ', "_");
    format!("{year}_P{paper}_{language}_{subject}_{question_id}_{type_label}_page{page_number}.png")
}

/// Parse an exported image filename back into its parts.
///
/// Returns `None` for names that do not match the template; callers treat
/// that as a skippable condition (§ malformed-filename policy), never an
/// error.
pub fn parse_image_filename(name: &str) -> Option<ExportedImageName> {
    let stem = name
        .strip_suffix(".png")
        .or_else(|| name.strip_suffix(".PNG"))
        .unwrap_or(name);

    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 6 {
        return None;
    }

    // The question type label appears verbatim in the name; substring
    // matching tolerates historical variation in the trailing parts.
    let question_type = QuestionType::ALL
        .into_iter()
        .find(|qt| stem.contains(qt.label()))?;

    let number_part = parts[5];
    let question_number = number_part.strip_prefix('q')?.parse::<u32>().ok()?;

    let page = parts
        .last()
        .and_then(|p| p.strip_prefix("page"))
        .and_then(|n| n.parse::<u32>().ok());

    Some(ExportedImageName {
        year: parts[0].to_string(),
        paper: parts[1].strip_prefix('P').unwrap_or(parts[1]).to_string(),
        language: parts[2].to_string(),
        subject: parts[3].to_string(),
        question_id: format!("{}_{}", parts[4], number_part),
        question_type,
        question_number,
        page,
    })
}
