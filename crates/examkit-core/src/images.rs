//! Locating a question's exported image on disk.
//!
//! Lookup outcomes are data, not exceptions: the renderer shows a
//! placeholder for [`ImageLookup::NotFound`] and navigation/saving are
//! never blocked by a missing image.

use std::path::{Path, PathBuf};

use crate::filenames::parse_image_filename;

/// Valid paper identifiers in exported paths.
const PAPERS: [&str; 2] = ["1", "2"];
/// Languages the exported directory tree is organized by.
const LANGUAGES: [&str; 2] = ["English", "Hindi"];
/// Subjects the exported directory tree is organized by.
const SUBJECTS: [&str; 3] = ["Physics", "Chemistry", "Mathematics"];

/// Outcome of an image lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLookup {
    Found(PathBuf),
    NotFound(String),
}

impl ImageLookup {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Found(path) => Some(path),
            Self::NotFound(_) => None,
        }
    }
}

/// Resolve an exported image filename against the image base directory.
///
/// The directory layout is `{base}/{year}/P{paper}/{language}/{subject}/`,
/// reconstructed from the filename's own parts. Malformed filenames are
/// reported (and logged) as [`ImageLookup::NotFound`]; they never fail the
/// caller.
pub fn construct_image_path(base: &Path, image_filename: &str) -> ImageLookup {
    let trimmed = image_filename.trim();
    if trimmed.is_empty() || trimmed == "N/A" {
        return ImageLookup::NotFound("no image filename in record".to_string());
    }

    let Some(parsed) = parse_image_filename(trimmed) else {
        log::warn!("malformed image filename: {trimmed}");
        return ImageLookup::NotFound(format!("malformed image filename: {trimmed}"));
    };

    if !parsed.year.chars().all(|c| c.is_ascii_digit()) {
        return ImageLookup::NotFound(format!("invalid year in filename: {}", parsed.year));
    }
    if !PAPERS.contains(&parsed.paper.as_str()) {
        return ImageLookup::NotFound(format!("invalid paper in filename: P{}", parsed.paper));
    }
    if !LANGUAGES.contains(&parsed.language.as_str()) {
        return ImageLookup::NotFound(format!("invalid language in filename: {}", parsed.language));
    }
    if !SUBJECTS.contains(&parsed.subject.as_str()) {
        return ImageLookup::NotFound(format!("invalid subject in filename: {}", parsed.subject));
    }

    let path = base
        .join(&parsed.year)
        .join(format!("P{}", parsed.paper))
        .join(&parsed.language)
        .join(&parsed.subject)
        .join(trimmed);

    if path.exists() {
        ImageLookup::Found(path)
    } else {
        ImageLookup::NotFound(format!("image not on disk: {}", path.display()))
    }
}
