//! Answer consensus over independently collected reference answers.
//!
//! Answers are compared by exact string equality; case, whitespace and
//! formatting differences count as different answers, so "2.5" and "2.50"
//! never merge. This mirrors how the collected keys are published and is a
//! documented limitation, not a bug to fix here.

use crate::error::{ExamkitError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Fraction of sources that must agree for a majority recommendation.
pub const MAJORITY_THRESHOLD: f64 = 0.6;

/// Reference sources commonly used for answer collection.
pub const KNOWN_SOURCES: [&str; 6] = [
    "FIITJEE",
    "Aakash",
    "Allen Kota",
    "Resonance",
    "Motion Education",
    "Official Key",
];

/// How confident the consensus procedure is in its recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    /// Every source gave the same answer.
    High,
    /// A plurality answer reached the majority threshold.
    Medium,
    /// No answer reached the threshold; no recommendation.
    Low,
    /// An operator overrode the algorithm with a custom answer.
    Manual,
}

/// Source-name → answer-text pairs for one question, in collection order.
///
/// Insertion order is semantic: frequency ties are broken by the
/// first-encountered answer, so the map must not reorder entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    entries: IndexMap<String, String>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one source's answer. Blank source names or answers are
    /// dropped; re-answering from the same source overwrites in place.
    pub fn insert(&mut self, source: &str, answer: &str) {
        let source = source.trim();
        let answer = answer.trim();
        if !source.is_empty() && !answer.is_empty() {
            self.entries.insert(source.to_string(), answer.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, a)| (s.as_str(), a.as_str()))
    }
}

/// One row of the frequency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub answer: String,
    pub count: usize,
}

impl Tally {
    /// Share of sources that gave this answer, as a percentage.
    pub fn percentage(&self, total_sources: usize) -> f64 {
        if total_sources == 0 {
            0.0
        } else {
            self.count as f64 / total_sources as f64 * 100.0
        }
    }
}

/// The algorithmic recommendation for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub final_answer: Option<String>,
    pub confidence: Confidence,
    pub flagged: bool,
}

/// Full analysis output: the frequency table plus the recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusReport {
    pub total_sources: usize,
    /// Frequency table, most common first; ties keep collection order.
    pub tallies: Vec<Tally>,
    pub result: ConsensusResult,
}

/// Analyze the collected answers from scratch.
///
/// Returns `None` for an empty set (the explicit "no input" outcome).
/// Classification:
/// - exactly one distinct answer → HIGH, not flagged;
/// - top answer at ≥ [`MAJORITY_THRESHOLD`] of sources → MEDIUM, flagged
///   (a recommendation exists but still needs an explicit operator accept);
/// - otherwise → LOW, no recommendation, flagged.
///
/// Frequency ties resolve to the first-encountered answer in the set's
/// collection order.
pub fn analyze(answers: &AnswerSet) -> Option<ConsensusReport> {
    if answers.is_empty() {
        return None;
    }

    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for (_, answer) in answers.iter() {
        *counts.entry(answer).or_insert(0) += 1;
    }
    let total = answers.len();

    let mut tallies: Vec<Tally> = counts
        .iter()
        .map(|(answer, count)| Tally {
            answer: (*answer).to_string(),
            count: *count,
        })
        .collect();
    // Stable sort keeps first-encountered order within equal counts.
    tallies.sort_by(|a, b| b.count.cmp(&a.count));

    let top = &tallies[0];
    let result = if tallies.len() == 1 {
        ConsensusResult {
            final_answer: Some(top.answer.clone()),
            confidence: Confidence::High,
            flagged: false,
        }
    } else if top.count as f64 >= total as f64 * MAJORITY_THRESHOLD {
        ConsensusResult {
            final_answer: Some(top.answer.clone()),
            confidence: Confidence::Medium,
            flagged: true,
        }
    } else {
        ConsensusResult {
            final_answer: None,
            confidence: Confidence::Low,
            flagged: true,
        }
    };

    Some(ConsensusReport {
        total_sources: total,
        tallies,
        result,
    })
}

/// Mutable per-question consensus state driven by the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusState {
    #[serde(default)]
    pub final_answer: Option<String>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub review_notes: String,
}

impl ConsensusState {
    /// Adopt an analysis result, replacing any previous state except notes.
    pub fn apply(&mut self, result: &ConsensusResult) {
        self.final_answer = result.final_answer.clone();
        self.confidence = Some(result.confidence);
        self.flagged = result.flagged;
    }

    /// Accept the algorithmic recommendation, clearing the review flag.
    ///
    /// Rejected when there is no recommendation (LOW confidence): a
    /// no-consensus question needs a custom answer instead.
    pub fn accept_majority(&mut self, question_id: &str) -> Result<()> {
        if self.final_answer.is_none() {
            return Err(ExamkitError::NoConsensusAnswer(question_id.to_string()));
        }
        self.flagged = false;
        Ok(())
    }

    /// Operator override: set the answer by hand, bypassing the algorithm.
    /// Always clears the flag and marks the confidence MANUAL.
    pub fn set_custom_answer(&mut self, answer: &str, notes: &str) -> Result<()> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(ExamkitError::MissingInput("custom answer"));
        }
        self.final_answer = Some(answer.to_string());
        self.confidence = Some(Confidence::Manual);
        self.flagged = false;
        self.review_notes = notes.trim().to_string();
        Ok(())
    }

    /// Mark the question as needing human review, keeping any notes.
    pub fn flag_for_review(&mut self, notes: &str) {
        self.flagged = true;
        if !notes.trim().is_empty() {
            self.review_notes = notes.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, &str)]) -> AnswerSet {
        let mut answers = AnswerSet::new();
        for (source, answer) in pairs {
            answers.insert(source, answer);
        }
        answers
    }

    #[test]
    fn test_unanimous_is_high_and_unflagged() {
        let report = analyze(&set(&[("A", "x"), ("B", "x"), ("C", "x")])).unwrap();
        assert_eq!(report.result.final_answer.as_deref(), Some("x"));
        assert_eq!(report.result.confidence, Confidence::High);
        assert!(!report.result.flagged);
    }

    #[test]
    fn test_two_thirds_is_medium_and_flagged() {
        let report = analyze(&set(&[("A", "x"), ("B", "x"), ("C", "y")])).unwrap();
        assert_eq!(report.result.final_answer.as_deref(), Some("x"));
        assert_eq!(report.result.confidence, Confidence::Medium);
        assert!(report.result.flagged);
    }

    #[test]
    fn test_three_way_split_is_low_with_no_answer() {
        let report = analyze(&set(&[("A", "x"), ("B", "y"), ("C", "z")])).unwrap();
        assert_eq!(report.result.final_answer, None);
        assert_eq!(report.result.confidence, Confidence::Low);
        assert!(report.result.flagged);
    }

    #[test]
    fn test_empty_set_yields_no_report() {
        assert!(analyze(&AnswerSet::new()).is_none());
    }

    #[test]
    fn test_tie_broken_by_first_encountered() {
        let report = analyze(&set(&[("A", "x"), ("B", "y"), ("C", "x"), ("D", "y")])).unwrap();
        // 2-2 tie at 50% < 60%: no recommendation, but the tally order
        // still puts the first-encountered answer on top.
        assert_eq!(report.tallies[0].answer, "x");
        assert_eq!(report.result.final_answer, None);
    }

    #[test]
    fn test_exact_string_equality_no_normalization() {
        let report = analyze(&set(&[("A", "2.5"), ("B", "2.50"), ("C", "2.5")])).unwrap();
        assert_eq!(report.tallies.len(), 2);
        assert_eq!(report.result.final_answer.as_deref(), Some("2.5"));
        assert_eq!(report.result.confidence, Confidence::Medium);
    }

    #[test]
    fn test_accept_majority_requires_recommendation() {
        let mut state = ConsensusState::default();
        let low = analyze(&set(&[("A", "x"), ("B", "y"), ("C", "z")])).unwrap();
        state.apply(&low.result);
        assert!(state.accept_majority("q1").is_err());
        assert!(state.flagged);

        let medium = analyze(&set(&[("A", "x"), ("B", "x"), ("C", "y")])).unwrap();
        state.apply(&medium.result);
        state.accept_majority("q1").unwrap();
        assert!(!state.flagged);
    }

    #[test]
    fn test_custom_answer_is_manual_and_unflagged() {
        let mut state = ConsensusState::default();
        let low = analyze(&set(&[("A", "x"), ("B", "y"), ("C", "z")])).unwrap();
        state.apply(&low.result);
        state.set_custom_answer("B,D", "checked official key").unwrap();
        assert_eq!(state.final_answer.as_deref(), Some("B,D"));
        assert_eq!(state.confidence, Some(Confidence::Manual));
        assert!(!state.flagged);
        assert_eq!(state.review_notes, "checked official key");
    }

    #[test]
    fn test_blank_entries_dropped() {
        let mut answers = AnswerSet::new();
        answers.insert("  ", "x");
        answers.insert("A", "   ");
        answers.insert("A", "x");
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn test_tally_percentage() {
        let tally = Tally {
            answer: "x".into(),
            count: 2,
        };
        assert!((tally.percentage(3) - 66.666).abs() < 0.01);
    }
}
