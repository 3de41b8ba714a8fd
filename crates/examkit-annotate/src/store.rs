//! The region annotation store: drag state, committed annotations and
//! per-type sequence counters.
//!
//! Per-page state machine:
//! `idle → drawing (drag start) → candidate (drag end, minimum size met)
//! → {committed single-region | pending multi-region}`.
//! All mutation happens through these methods; the canvas layer only draws
//! what the store reports.

use chrono::{DateTime, Utc};
use examkit_core::record::QuestionType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::counters::counters_from_filenames;
use crate::error::{AnnotateError, Result};
use crate::geometry::{DeviceRect, DocRect};

/// One annotated rectangle, recorded with the page it was drawn on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub page: usize,
    pub device: DeviceRect,
    pub doc: DocRect,
}

/// A finalized question annotation: one region, or several collected in
/// reading order for a question that spans a page break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Generated `{type}_q{n}` id, stable once assigned.
    pub question_id: String,
    pub subject: String,
    pub question_type: QuestionType,
    pub regions: Vec<Region>,
    pub created: DateTime<Utc>,
}

impl Annotation {
    /// Page of the first region; used in the export filename.
    pub fn page(&self) -> usize {
        self.regions.first().map_or(0, |r| r.page)
    }

    pub fn is_multi_region(&self) -> bool {
        self.regions.len() > 1
    }

    /// Sequence number embedded in the id, when parseable.
    fn sequence_number(&self) -> Option<u32> {
        self.question_id.rsplit("_q").next()?.parse().ok()
    }
}

/// Metadata of the paper being annotated, stamped into exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub year: String,
    pub paper: String,
    pub language: String,
}

impl PaperMetadata {
    /// True when all parts are known, which selects the structured output
    /// directory layout over the `custom_pdf` fallback.
    pub fn is_complete(&self) -> bool {
        !self.year.is_empty() && !self.paper.is_empty() && !self.language.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging { start: (f64, f64) },
}

/// In-memory annotation session for one source document.
#[derive(Debug)]
pub struct RegionStore {
    metadata: PaperMetadata,
    zoom: f64,
    current_page: usize,
    drag: DragState,
    preview: Option<DeviceRect>,
    candidate: Option<Region>,
    pending: Option<Annotation>,
    annotations: Vec<Annotation>,
    counters: HashMap<QuestionType, u32>,
}

impl RegionStore {
    pub fn new(metadata: PaperMetadata) -> Self {
        Self {
            metadata,
            zoom: 1.0,
            current_page: 0,
            drag: DragState::Idle,
            preview: None,
            candidate: None,
            pending: None,
            annotations: Vec::new(),
            counters: HashMap::new(),
        }
    }

    pub fn metadata(&self) -> &PaperMetadata {
        &self.metadata
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom > 0.0 {
            self.zoom = zoom;
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn set_page(&mut self, page: usize) {
        self.current_page = page;
        self.drag = DragState::Idle;
        self.preview = None;
    }

    // --- drag state machine -------------------------------------------------

    /// Begin a drag at a device-space point, discarding any preview.
    pub fn start_drag(&mut self, x: f64, y: f64) {
        self.drag = DragState::Dragging { start: (x, y) };
        self.preview = None;
    }

    /// Update the drag, replacing the previous transient preview rectangle.
    /// Returns the preview for the canvas to draw, or `None` when no drag
    /// is in progress.
    pub fn update_drag(&mut self, x: f64, y: f64) -> Option<DeviceRect> {
        let DragState::Dragging { start } = self.drag else {
            return None;
        };
        let preview = DeviceRect::from_corners(start, (x, y));
        self.preview = Some(preview);
        Some(preview)
    }

    /// Finish the drag. A rectangle meeting the minimum size becomes the
    /// candidate (converted to document space at the current zoom); anything
    /// smaller is discarded silently and a previous candidate survives.
    pub fn end_drag(&mut self, x: f64, y: f64) -> Option<&Region> {
        let DragState::Dragging { start } = self.drag else {
            return None;
        };
        self.drag = DragState::Idle;
        self.preview = None;

        let device = DeviceRect::from_corners(start, (x, y));
        if !device.meets_minimum_size() {
            return None;
        }
        self.candidate = Some(Region {
            page: self.current_page,
            doc: device.to_doc(self.zoom),
            device,
        });
        self.candidate.as_ref()
    }

    pub fn candidate(&self) -> Option<&Region> {
        self.candidate.as_ref()
    }

    // --- committing ---------------------------------------------------------

    /// Commit the candidate as a single-region question. Requires a drawn
    /// candidate and a selected subject.
    pub fn commit_single(&mut self, question_type: QuestionType, subject: &str) -> Result<String> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(AnnotateError::MissingInput("subject"));
        }
        let region = self
            .candidate
            .take()
            .ok_or(AnnotateError::MissingInput("rectangle"))?;

        let number = self.counters.get(&question_type).copied().unwrap_or(0) + 1;
        let question_id = format!("{}_q{number}", question_type.label());
        self.counters.insert(question_type, number);

        self.annotations.push(Annotation {
            question_id: question_id.clone(),
            subject: subject.to_string(),
            question_type,
            regions: vec![region],
            created: Utc::now(),
        });
        log::info!("committed {question_id} ({subject})");
        Ok(question_id)
    }

    /// Re-open the most recently committed annotation as a pending
    /// multi-region question; its region becomes the first of the group.
    pub fn begin_multi(&mut self) -> Result<String> {
        if self.pending.is_some() {
            return Err(AnnotateError::MissingInput(
                "finish the current multi-region question first",
            ));
        }
        let last = self
            .annotations
            .pop()
            .ok_or(AnnotateError::MissingInput("a committed question"))?;
        let id = last.question_id.clone();
        self.pending = Some(last);
        Ok(id)
    }

    /// Append the current candidate to the pending multi-region question.
    /// Returns the new region count.
    pub fn add_region_to_pending(&mut self) -> Result<usize> {
        let pending = self.pending.as_mut().ok_or(AnnotateError::NoPending)?;
        let region = self
            .candidate
            .take()
            .ok_or(AnnotateError::MissingInput("rectangle"))?;
        pending.regions.push(region);
        Ok(pending.regions.len())
    }

    /// Finalize the pending multi-region question with its regions in
    /// collection order.
    pub fn complete_multi(&mut self) -> Result<String> {
        let pending = self.pending.take().ok_or(AnnotateError::NoPending)?;
        if pending.regions.is_empty() {
            return Err(AnnotateError::MissingInput("at least one rectangle"));
        }
        let id = pending.question_id.clone();
        log::info!("completed {id} with {} regions", pending.regions.len());
        self.annotations.push(pending);
        Ok(id)
    }

    pub fn pending(&self) -> Option<&Annotation> {
        self.pending.as_ref()
    }

    // --- deletion & counters ------------------------------------------------

    /// Delete an annotation and drop its type counter to the highest
    /// sequence number still present (not simply minus one, so ids stay
    /// collision-free after non-sequential deletes).
    pub fn delete(&mut self, question_id: &str) -> Result<Annotation> {
        let index = self
            .annotations
            .iter()
            .position(|a| a.question_id == question_id)
            .ok_or_else(|| AnnotateError::UnknownAnnotation(question_id.to_string()))?;
        let removed = self.annotations.remove(index);
        self.recompute_counter(removed.question_type);
        log::info!("deleted {question_id}");
        Ok(removed)
    }

    /// Remove every annotation on one page. Counters drop to the remaining
    /// maxima.
    pub fn clear_page(&mut self, page: usize) -> usize {
        let before = self.annotations.len();
        self.annotations.retain(|a| a.page() != page);
        let removed = before - self.annotations.len();
        if removed > 0 {
            self.recompute_all_counters();
        }
        removed
    }

    /// Remove everything, resetting counters to the remaining maxima (zero).
    pub fn clear_all(&mut self) -> usize {
        let removed = self.annotations.len();
        self.annotations.clear();
        self.pending = None;
        self.candidate = None;
        self.recompute_all_counters();
        removed
    }

    fn recompute_counter(&mut self, question_type: QuestionType) {
        let max = self
            .annotations
            .iter()
            .chain(self.pending.iter())
            .filter(|a| a.question_type == question_type)
            .filter_map(Annotation::sequence_number)
            .max()
            .unwrap_or(0);
        self.counters.insert(question_type, max);
    }

    fn recompute_all_counters(&mut self) {
        for question_type in QuestionType::ALL {
            self.recompute_counter(question_type);
        }
    }

    /// Merge counters recovered from exported filenames, never lowering a
    /// counter already advanced in this session.
    pub fn rescan_counters<'a, I>(&mut self, filenames: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for (question_type, scanned) in counters_from_filenames(filenames) {
            let entry = self.counters.entry(question_type).or_insert(0);
            *entry = (*entry).max(scanned);
        }
    }

    /// Current counter value for a type (0 when nothing committed yet).
    pub fn counter(&self, question_type: QuestionType) -> u32 {
        self.counters.get(&question_type).copied().unwrap_or(0)
    }

    /// Id the next commit of this type would receive, for display.
    pub fn next_question_id(&self, question_type: QuestionType) -> String {
        format!(
            "{}_q{}",
            question_type.label(),
            self.counter(question_type) + 1
        )
    }

    // --- queries & edits ----------------------------------------------------

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn annotations_on_page(&self, page: usize) -> Vec<&Annotation> {
        self.annotations.iter().filter(|a| a.page() == page).collect()
    }

    pub fn annotations_for_subject(&self, subject: &str) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.subject == subject)
            .collect()
    }

    pub fn find(&self, question_id: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.question_id == question_id)
    }

    /// Update an annotation's subject and/or type in place. The id is
    /// stable once assigned and is not re-keyed.
    pub fn edit(
        &mut self,
        question_id: &str,
        subject: Option<&str>,
        question_type: Option<QuestionType>,
    ) -> Result<()> {
        let annotation = self
            .annotations
            .iter_mut()
            .find(|a| a.question_id == question_id)
            .ok_or_else(|| AnnotateError::UnknownAnnotation(question_id.to_string()))?;
        if let Some(subject) = subject {
            let subject = subject.trim();
            if subject.is_empty() {
                return Err(AnnotateError::MissingInput("subject"));
            }
            annotation.subject = subject.to_string();
        }
        let old_type = annotation.question_type;
        if let Some(question_type) = question_type {
            annotation.question_type = question_type;
        }
        if question_type.is_some_and(|qt| qt != old_type) {
            self.recompute_all_counters();
        }
        Ok(())
    }

    /// Replace the annotation list wholesale (restore after an undone
    /// export, or reload from a progress file). Counters recompute to the
    /// restored maxima.
    pub fn restore(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
        self.pending = None;
        self.candidate = None;
        self.recompute_all_counters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RegionStore {
        RegionStore::new(PaperMetadata {
            year: "2023".into(),
            paper: "1".into(),
            language: "English".into(),
        })
    }

    fn draw(store: &mut RegionStore, x: f64, y: f64) {
        store.start_drag(x, y);
        store.update_drag(x + 60.0, y + 20.0);
        assert!(store.end_drag(x + 120.0, y + 40.0).is_some());
    }

    #[test]
    fn test_small_drag_discarded_silently() {
        let mut s = store();
        s.start_drag(10.0, 10.0);
        assert!(s.end_drag(18.0, 30.0).is_none());
        assert!(s.candidate().is_none());
    }

    #[test]
    fn test_small_drag_keeps_previous_candidate() {
        let mut s = store();
        draw(&mut s, 0.0, 0.0);
        let kept = s.candidate().unwrap().doc;
        s.start_drag(5.0, 5.0);
        assert!(s.end_drag(9.0, 9.0).is_none());
        assert_eq!(s.candidate().unwrap().doc, kept);
    }

    #[test]
    fn test_preview_replaced_on_each_update() {
        let mut s = store();
        s.start_drag(0.0, 0.0);
        let first = s.update_drag(50.0, 50.0).unwrap();
        let second = s.update_drag(80.0, 40.0).unwrap();
        assert_ne!(first, second);
        assert_eq!(second.x1, 80.0);
    }

    #[test]
    fn test_commit_requires_candidate_and_subject() {
        let mut s = store();
        assert!(matches!(
            s.commit_single(QuestionType::McqSingle, "Physics"),
            Err(AnnotateError::MissingInput("rectangle"))
        ));
        draw(&mut s, 0.0, 0.0);
        assert!(matches!(
            s.commit_single(QuestionType::McqSingle, "  "),
            Err(AnnotateError::MissingInput("subject"))
        ));
        let id = s.commit_single(QuestionType::McqSingle, "Physics").unwrap();
        assert_eq!(id, "MCQ-Single_q1");
        assert!(s.candidate().is_none());
    }

    #[test]
    fn test_counters_increment_per_type() {
        let mut s = store();
        draw(&mut s, 0.0, 0.0);
        assert_eq!(
            s.commit_single(QuestionType::McqSingle, "Physics").unwrap(),
            "MCQ-Single_q1"
        );
        draw(&mut s, 0.0, 100.0);
        assert_eq!(
            s.commit_single(QuestionType::McqSingle, "Physics").unwrap(),
            "MCQ-Single_q2"
        );
        draw(&mut s, 0.0, 200.0);
        assert_eq!(
            s.commit_single(QuestionType::Numerical, "Physics").unwrap(),
            "Numerical_q1"
        );
    }

    #[test]
    fn test_delete_highest_reuses_number() {
        let mut s = store();
        for i in 0..3 {
            draw(&mut s, 0.0, i as f64 * 100.0);
            s.commit_single(QuestionType::McqSingle, "Physics").unwrap();
        }
        s.delete("MCQ-Single_q3").unwrap();
        assert_eq!(s.counter(QuestionType::McqSingle), 2);
        draw(&mut s, 0.0, 300.0);
        assert_eq!(
            s.commit_single(QuestionType::McqSingle, "Physics").unwrap(),
            "MCQ-Single_q3"
        );
    }

    #[test]
    fn test_delete_middle_keeps_counter_at_max() {
        let mut s = store();
        for i in 0..3 {
            draw(&mut s, 0.0, i as f64 * 100.0);
            s.commit_single(QuestionType::McqSingle, "Physics").unwrap();
        }
        s.delete("MCQ-Single_q2").unwrap();
        // q3 survives, so the next id must be q4, not a colliding q3.
        assert_eq!(s.counter(QuestionType::McqSingle), 3);
        draw(&mut s, 0.0, 300.0);
        assert_eq!(
            s.commit_single(QuestionType::McqSingle, "Physics").unwrap(),
            "MCQ-Single_q4"
        );
    }

    #[test]
    fn test_multi_region_flow_spanning_pages() {
        let mut s = store();
        draw(&mut s, 0.0, 500.0);
        let id = s.commit_single(QuestionType::Matching, "Chemistry").unwrap();

        assert_eq!(s.begin_multi().unwrap(), id);
        assert!(s.pending().is_some());
        assert!(s.annotations().is_empty());

        s.set_page(1);
        draw(&mut s, 0.0, 0.0);
        assert_eq!(s.add_region_to_pending().unwrap(), 2);

        let completed = s.complete_multi().unwrap();
        assert_eq!(completed, id);
        let annotation = s.find(&completed).unwrap();
        assert!(annotation.is_multi_region());
        assert_eq!(annotation.regions[0].page, 0);
        assert_eq!(annotation.regions[1].page, 1);
        // Filename page is the first region's page.
        assert_eq!(annotation.page(), 0);
    }

    #[test]
    fn test_add_region_requires_begin_multi() {
        let mut s = store();
        draw(&mut s, 0.0, 0.0);
        assert!(matches!(
            s.add_region_to_pending(),
            Err(AnnotateError::NoPending)
        ));
        assert!(matches!(s.complete_multi(), Err(AnnotateError::NoPending)));
    }

    #[test]
    fn test_rescan_is_monotonic() {
        let mut s = store();
        draw(&mut s, 0.0, 0.0);
        s.commit_single(QuestionType::McqSingle, "Physics").unwrap();
        draw(&mut s, 0.0, 100.0);
        s.commit_single(QuestionType::McqSingle, "Physics").unwrap();

        // Directory scan finds older exports: q5 single, q3 numerical.
        s.rescan_counters([
            "2023_P1_English_Physics_MCQ-Single_q5_MCQ-Single_page1.png",
            "2023_P1_English_Physics_Numerical_q3_Numerical_page2.png",
        ]);
        assert_eq!(s.counter(QuestionType::McqSingle), 5);
        assert_eq!(s.counter(QuestionType::Numerical), 3);

        // A rescan showing lower numbers never regresses a live counter.
        s.rescan_counters(["2023_P1_English_Physics_MCQ-Single_q2_MCQ-Single_page1.png"]);
        assert_eq!(s.counter(QuestionType::McqSingle), 5);
    }

    #[test]
    fn test_clear_page_is_scoped() {
        let mut s = store();
        draw(&mut s, 0.0, 0.0);
        s.commit_single(QuestionType::McqSingle, "Physics").unwrap();
        s.set_page(1);
        draw(&mut s, 0.0, 0.0);
        s.commit_single(QuestionType::McqSingle, "Physics").unwrap();

        assert_eq!(s.clear_page(0), 1);
        assert_eq!(s.annotations().len(), 1);
        // q2 survives on page 1, so the counter stays at 2.
        assert_eq!(s.counter(QuestionType::McqSingle), 2);
    }

    #[test]
    fn test_edit_updates_subject_in_place() {
        let mut s = store();
        draw(&mut s, 0.0, 0.0);
        let id = s.commit_single(QuestionType::McqSingle, "Physics").unwrap();
        s.edit(&id, Some("Chemistry"), None).unwrap();
        assert_eq!(s.find(&id).unwrap().subject, "Chemistry");
        assert_eq!(s.find(&id).unwrap().question_id, id);
    }
}
