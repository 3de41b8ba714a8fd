//! Image-requirement annotation over a tabular question sheet.
//!
//! One reviewer pass marks, per question, whether the text alone is enough
//! or an accompanying image is required. The sheet is a CSV with one row per
//! question; the `requires_image` column is added on first save if absent.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExamkitError, Result};
use crate::session::Step;

/// One row of the sheet. Unannotated rows carry `requires_image: None`,
/// which is distinct from an explicit "no".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    #[serde(default)]
    pub question_id: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub paper: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub question_type: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub image_path: String,
    #[serde(default, deserialize_with = "optional_bool")]
    pub requires_image: Option<bool>,
}

/// Accept blank cells, `true`/`false`, and `0`/`1` for the annotation column.
fn optional_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::trim) {
        None | Some("") => None,
        Some("true") | Some("True") | Some("1") => Some(true),
        Some("false") | Some("False") | Some("0") => Some(false),
        Some(_) => None,
    })
}

/// A CSV-backed image-requirement annotation session.
#[derive(Debug, Default)]
pub struct ImageRequirementSheet {
    rows: Vec<SheetRow>,
    index: usize,
}

impl ImageRequirementSheet {
    /// Load the sheet; existing `requires_image` values are kept so a
    /// partially annotated sheet resumes where it left off.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for result in reader.deserialize() {
            let row: SheetRow = result?;
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(ExamkitError::EmptyDataset(path.to_path_buf()));
        }
        log::info!("loaded {} rows from {}", rows.len(), path.display());
        Ok(Self { rows, index: 0 })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }

    pub fn current(&self) -> Option<&SheetRow> {
        self.rows.get(self.index)
    }

    /// Annotate the current row and advance to the next one (stays put at
    /// the end of the sheet, matching plain navigation).
    pub fn annotate(&mut self, requires_image: bool) -> Step {
        if let Some(row) = self.rows.get_mut(self.index) {
            row.requires_image = Some(requires_image);
        }
        self.next()
    }

    pub fn next(&mut self) -> Step {
        if self.index + 1 < self.rows.len() {
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
        if index >= self.rows.len() {
            return Err(ExamkitError::IndexOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    pub fn annotated_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.requires_image.is_some())
            .count()
    }

    /// Whole-file rewrite of the sheet with the current annotations.
    pub fn save(&self, path: &Path) -> Result<usize> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(self.annotated_count())
    }
}
