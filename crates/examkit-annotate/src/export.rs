//! Export of finalized annotations to question-crop images.
//!
//! Output layout: `{base}/{year}/Paper_{paper}_{language}/{subject}/` with
//! one PNG per question named by the filename template, plus a per-subject
//! `annotations_metadata.json`. The returned manifest records exactly what
//! was written so an export can be undone.

use chrono::{DateTime, Utc};
use examkit_core::filenames::format_image_filename;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::compose::{compose, PageRasterizer};
use crate::error::Result;
use crate::store::{Annotation, PaperMetadata, RegionStore};

/// Everything one export run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub exported_at: DateTime<Utc>,
    /// Image files written, in export order.
    pub files: Vec<PathBuf>,
    /// The annotations that were exported (and cleared from the store).
    pub annotations: Vec<Annotation>,
}

/// Per-subject metadata file written next to the images.
#[derive(Debug, Serialize, Deserialize)]
struct SubjectMetadata {
    pdf_metadata: PaperMetadata,
    export_timestamp: DateTime<Utc>,
    subject: String,
    total_annotations: usize,
    annotations: Vec<ExportedAnnotation>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExportedAnnotation {
    #[serde(flatten)]
    annotation: Annotation,
    exported_filename: String,
}

/// Progress file: the full annotation list, for resuming before export.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnotationProgress {
    pub pdf_metadata: PaperMetadata,
    pub pdf_path: PathBuf,
    pub total_pages: usize,
    pub saved_at: DateTime<Utc>,
    pub annotations: Vec<Annotation>,
}

/// Output directory for one subject's images.
pub fn subject_output_dir(base: &Path, metadata: &PaperMetadata, subject: &str) -> PathBuf {
    if metadata.is_complete() {
        base.join(&metadata.year)
            .join(format!("Paper_{}_{}", metadata.paper, metadata.language))
            .join(subject)
    } else {
        base.join("custom_pdf").join(subject)
    }
}

/// Filename for one annotation under this paper's metadata.
pub fn export_filename(metadata: &PaperMetadata, annotation: &Annotation) -> String {
    let or_unknown = |s: &str| {
        if s.is_empty() {
            "unknown".to_string()
        } else {
            s.to_string()
        }
    };
    format_image_filename(
        &or_unknown(&metadata.year),
        &or_unknown(&metadata.paper),
        &or_unknown(&metadata.language),
        &annotation.subject,
        &annotation.question_id,
        annotation.question_type,
        annotation.page() as u32 + 1,
    )
}

/// Compose and write every finalized annotation, grouped by subject.
///
/// On success the store is cleared and rescanned against the written
/// filenames so subsequent ids continue past the export. The manifest holds
/// the cleared annotations for [`undo_last_export`].
pub fn export_annotations<R>(
    store: &mut RegionStore,
    rasterizer: &R,
    base: &Path,
) -> Result<ExportManifest>
where
    R: PageRasterizer + ?Sized,
{
    let exported_at = Utc::now();
    let metadata = store.metadata().clone();
    let mut files = Vec::new();

    let mut by_subject: BTreeMap<String, Vec<Annotation>> = BTreeMap::new();
    for annotation in store.annotations() {
        by_subject
            .entry(annotation.subject.clone())
            .or_default()
            .push(annotation.clone());
    }

    for (subject, annotations) in &by_subject {
        let dir = subject_output_dir(base, &metadata, subject);
        std::fs::create_dir_all(&dir)?;

        let mut exported = Vec::new();
        for annotation in annotations {
            let filename = export_filename(&metadata, annotation);
            let path = dir.join(&filename);
            if let Some(image) = compose(rasterizer, &annotation.regions)? {
                image.save(&path)?;
                files.push(path);
                exported.push(ExportedAnnotation {
                    annotation: annotation.clone(),
                    exported_filename: filename,
                });
            }
        }

        let metadata_file = SubjectMetadata {
            pdf_metadata: metadata.clone(),
            export_timestamp: exported_at,
            subject: subject.clone(),
            total_annotations: exported.len(),
            annotations: exported,
        };
        let metadata_path = dir.join("annotations_metadata.json");
        std::fs::write(
            &metadata_path,
            serde_json::to_string_pretty(&metadata_file)?,
        )?;
        files.push(metadata_path);
    }

    let annotations: Vec<Annotation> = store.annotations().to_vec();
    store.clear_all();
    let names: Vec<String> = files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    store.rescan_counters(names.iter().map(String::as_str));

    log::info!("exported {} annotations to {}", annotations.len(), base.display());
    Ok(ExportManifest {
        exported_at,
        files,
        annotations,
    })
}

/// Delete the files a previous export created and restore its annotations
/// into the store. Files already gone are logged and skipped.
pub fn undo_last_export(store: &mut RegionStore, manifest: &ExportManifest) -> Result<usize> {
    let mut removed = 0;
    for file in &manifest.files {
        match std::fs::remove_file(file) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("undo: file already gone: {}", file.display());
            }
            Err(e) => return Err(e.into()),
        }
    }
    store.restore(manifest.annotations.clone());
    log::info!("undo removed {removed} files, restored {} annotations", manifest.annotations.len());
    Ok(removed)
}

/// Timestamped progress filename.
pub fn progress_filename(created: DateTime<Utc>) -> String {
    format!("annotations_progress_{}.json", created.format("%Y%m%d_%H%M%S"))
}

/// Whole-file rewrite of the annotation progress JSON.
pub fn save_progress(
    store: &RegionStore,
    dir: &Path,
    pdf_path: &Path,
    total_pages: usize,
) -> Result<PathBuf> {
    let saved_at = Utc::now();
    let progress = AnnotationProgress {
        pdf_metadata: store.metadata().clone(),
        pdf_path: pdf_path.to_path_buf(),
        total_pages,
        saved_at,
        annotations: store.annotations().to_vec(),
    };
    let path = dir.join(progress_filename(saved_at));
    std::fs::write(&path, serde_json::to_string_pretty(&progress)?)?;
    Ok(path)
}

/// Load a progress file back into a fresh store.
pub fn load_progress(path: &Path) -> Result<(AnnotationProgress, RegionStore)> {
    let content = std::fs::read_to_string(path)?;
    let progress: AnnotationProgress = serde_json::from_str(&content)?;
    let mut store = RegionStore::new(progress.pdf_metadata.clone());
    store.restore(progress.annotations.clone());
    Ok((progress, store))
}
