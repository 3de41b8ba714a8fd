//! Answer-collection sessions over a directory of exported question images.
//!
//! The question list is derived entirely from exported image filenames, in
//! subject → question-type → question-number order, and the operator fills
//! in per-question answer sets that the consensus engine analyzes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::consensus::{self, AnswerSet, ConsensusReport, ConsensusState};
use crate::error::{ExamkitError, Result};
use crate::filenames::parse_image_filename;
use crate::record::QuestionType;
use crate::session::Step;

/// Subjects in their canonical collection order; any other subject sorts
/// after these, alphabetically.
pub const SUBJECT_ORDER: [&str; 3] = ["Mathematics", "Physics", "Chemistry"];

/// One question awaiting answer collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedQuestion {
    /// Generated id, e.g. `MCQ-Single_q3`.
    pub question_id: String,
    pub filename: String,
    pub file_path: PathBuf,
    pub year: String,
    pub paper: String,
    pub language: String,
    pub subject: String,
    pub question_type: QuestionType,
    pub question_number: u32,
    #[serde(default)]
    pub answers: AnswerSet,
    #[serde(flatten)]
    pub state: ConsensusState,
    /// Excluded from the final dataset by the operator.
    #[serde(default)]
    pub removed: bool,
}

impl CollectedQuestion {
    /// Re-run the consensus procedure over the current answers and adopt
    /// the result. Returns the report for display, or `None` when no
    /// answers have been collected yet.
    pub fn analyze(&mut self) -> Option<ConsensusReport> {
        let report = consensus::analyze(&self.answers)?;
        self.state.apply(&report.result);
        Some(report)
    }
}

/// Progress file shape: the whole question list, rewritten on every save.
#[derive(Debug, Serialize, Deserialize)]
struct ProgressFile {
    timestamp: DateTime<Utc>,
    total_questions: usize,
    completed_questions: usize,
    flagged_questions: usize,
    questions: Vec<CollectedQuestion>,
}

/// One entry of the generated final dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub question_id: String,
    pub image_filename: String,
    pub image_path: PathBuf,
    pub subject: String,
    pub question_type: QuestionType,
    pub year: String,
    pub paper: String,
    pub language: String,
    pub answer: String,
    pub confidence: crate::consensus::Confidence,
    pub sources: AnswerSet,
    #[serde(default)]
    pub review_notes: String,
}

/// Aggregate statistics over a generated dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub total_questions: usize,
    pub flagged_questions: usize,
    pub by_subject: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_year: BTreeMap<String, usize>,
    pub by_confidence: BTreeMap<String, usize>,
}

/// The generated dataset plus its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDataset {
    pub created_at: DateTime<Utc>,
    pub questions: Vec<DatasetEntry>,
    pub statistics: DatasetStatistics,
}

/// An answer-collection session.
#[derive(Debug, Default)]
pub struct AnswerCollection {
    questions: Vec<CollectedQuestion>,
    index: usize,
}

impl AnswerCollection {
    /// Build the ordered question list from exported image paths.
    ///
    /// Files that do not match the filename template are skipped with a
    /// logged warning (they never corrupt other entries). Ordering is
    /// subject (canonical order, then others alphabetically), then question
    /// type in section order, then question number.
    pub fn from_image_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut questions: Vec<CollectedQuestion> = Vec::new();
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match parse_image_filename(name) {
                Some(parsed) => questions.push(CollectedQuestion {
                    question_id: parsed.question_id,
                    filename: name.to_string(),
                    file_path: path.clone(),
                    year: parsed.year,
                    paper: parsed.paper,
                    language: parsed.language,
                    subject: parsed.subject,
                    question_type: parsed.question_type,
                    question_number: parsed.question_number,
                    answers: AnswerSet::new(),
                    state: ConsensusState::default(),
                    removed: false,
                }),
                None => {
                    log::warn!("skipping image with unrecognized filename: {name}");
                }
            }
        }

        questions.sort_by(|a, b| {
            subject_rank(&a.subject)
                .cmp(&subject_rank(&b.subject))
                .then_with(|| a.subject.cmp(&b.subject))
                .then_with(|| a.question_type.section().cmp(&b.question_type.section()))
                .then_with(|| a.question_number.cmp(&b.question_number))
        });

        Self {
            questions,
            index: 0,
        }
    }

    /// Recursively collect `.png` files under `dir`.
    pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        collect_pngs(dir, &mut found)?;
        found.sort();
        Ok(found)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn questions(&self) -> &[CollectedQuestion] {
        &self.questions
    }

    pub fn current(&self) -> Option<&CollectedQuestion> {
        self.questions.get(self.index)
    }

    pub fn current_mut(&mut self) -> Option<&mut CollectedQuestion> {
        self.questions.get_mut(self.index)
    }

    pub fn next(&mut self) -> Step {
        if self.index + 1 < self.questions.len() {
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
        if index >= self.questions.len() {
            return Err(ExamkitError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    /// Indices of questions currently flagged for review.
    pub fn flagged(&self) -> Vec<usize> {
        self.questions
            .iter()
            .enumerate()
            .filter(|(_, q)| q.state.flagged)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of questions for one subject, preserving list order.
    pub fn by_subject(&self, subject: &str) -> Vec<usize> {
        self.questions
            .iter()
            .enumerate()
            .filter(|(_, q)| q.subject == subject)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| q.state.final_answer.is_some())
            .count()
    }

    /// Whole-file rewrite of the progress JSON.
    pub fn save_progress(&self, path: &Path) -> Result<()> {
        let file = ProgressFile {
            timestamp: Utc::now(),
            total_questions: self.questions.len(),
            completed_questions: self.completed_count(),
            flagged_questions: self.flagged().len(),
            questions: self.questions.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, json)?;
        log::info!(
            "answer progress saved: {} ({}/{} completed)",
            path.display(),
            file.completed_questions,
            file.total_questions
        );
        Ok(())
    }

    pub fn load_progress(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: ProgressFile = serde_json::from_str(&content)?;
        Ok(Self {
            questions: file.questions,
            index: 0,
        })
    }

    /// Timestamped default name for a progress file.
    pub fn progress_filename(created: DateTime<Utc>) -> String {
        format!(
            "answer_collection_progress_{}.json",
            created.format("%Y%m%d_%H%M%S")
        )
    }

    /// Build the final dataset from every non-removed question with a final
    /// answer, plus aggregate statistics.
    pub fn generate_final_dataset(&self) -> FinalDataset {
        let mut entries = Vec::new();
        let mut stats = DatasetStatistics::default();

        for question in &self.questions {
            if question.removed {
                continue;
            }
            if question.state.flagged {
                stats.flagged_questions += 1;
            }
            let (Some(answer), Some(confidence)) = (
                question.state.final_answer.clone(),
                question.state.confidence,
            ) else {
                continue;
            };

            *stats
                .by_subject
                .entry(question.subject.clone())
                .or_insert(0) += 1;
            *stats
                .by_type
                .entry(question.question_type.label().to_string())
                .or_insert(0) += 1;
            *stats.by_year.entry(question.year.clone()).or_insert(0) += 1;
            *stats
                .by_confidence
                .entry(format!("{confidence:?}").to_uppercase())
                .or_insert(0) += 1;

            entries.push(DatasetEntry {
                question_id: question.question_id.clone(),
                image_filename: question.filename.clone(),
                image_path: question.file_path.clone(),
                subject: question.subject.clone(),
                question_type: question.question_type,
                year: question.year.clone(),
                paper: question.paper.clone(),
                language: question.language.clone(),
                answer,
                confidence,
                sources: question.answers.clone(),
                review_notes: question.state.review_notes.clone(),
            });
        }

        stats.total_questions = entries.len();
        FinalDataset {
            created_at: Utc::now(),
            questions: entries,
            statistics: stats,
        }
    }
}

fn subject_rank(subject: &str) -> usize {
    SUBJECT_ORDER
        .iter()
        .position(|s| *s == subject)
        .unwrap_or(SUBJECT_ORDER.len())
}

fn collect_pngs(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_pngs(&path, found)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        {
            found.push(path);
        }
    }
    Ok(())
}
