//! Exam paper source URLs and the download helper.
//!
//! Past papers are published under two URL schemes: a `{year}_{paper}_{lang}`
//! archive for 2019–2024 and a `p{paper}_{lang}` documents path for 2025.
//! URL generation is pure and testable offline; fetching is a thin blocking
//! HTTP helper that skips files already on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AnnotateError, Result};

const ARCHIVE_BASE_URL: &str = "https://jeeadv.ac.in/past_qps/";
const DOCUMENTS_BASE_URL: &str = "https://jeeadv.ac.in/documents/";
const ARCHIVE_YEARS: std::ops::RangeInclusive<u16> = 2019..=2024;
const CURRENT_YEAR: u16 = 2025;

/// Papers per exam sitting.
pub const PAPERS: [u8; 2] = [1, 2];
/// Published languages.
pub const LANGUAGES: [&str; 2] = ["English", "Hindi"];

/// One downloadable paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperSource {
    pub url: String,
    pub year: u16,
    pub paper: u8,
    pub language: String,
    /// Local filename, always `{year}_{paper}_{language}.pdf` regardless of
    /// which URL scheme served it.
    pub filename: String,
}

/// Every known paper URL across both schemes.
pub fn generate_sources() -> Vec<PaperSource> {
    let mut sources = Vec::new();

    for year in ARCHIVE_YEARS {
        for paper in PAPERS {
            for language in LANGUAGES {
                sources.push(PaperSource {
                    url: format!("{ARCHIVE_BASE_URL}{year}_{paper}_{language}.pdf"),
                    year,
                    paper,
                    language: language.to_string(),
                    filename: format!("{year}_{paper}_{language}.pdf"),
                });
            }
        }
    }

    for paper in PAPERS {
        for language in LANGUAGES {
            sources.push(PaperSource {
                url: format!(
                    "{DOCUMENTS_BASE_URL}p{paper}_{}.pdf",
                    language.to_lowercase()
                ),
                year: CURRENT_YEAR,
                paper,
                language: language.to_string(),
                filename: format!("{CURRENT_YEAR}_{paper}_{language}.pdf"),
            });
        }
    }

    sources
}

/// Parse `{year}_{paper}_{language}.pdf` back into its parts. Returns
/// `None` for anything else (custom PDFs annotate fine without metadata).
pub fn parse_paper_filename(name: &str) -> Option<(u16, u8, &str)> {
    let stem = name.strip_suffix(".pdf")?;
    let mut parts = stem.splitn(3, '_');
    let year: u16 = parts.next()?.parse().ok()?;
    let paper_part = parts.next()?;
    if paper_part.len() != 1 {
        return None;
    }
    let paper: u8 = paper_part.parse().ok()?;
    let language = parts.next()?;
    if !(1000..=9999).contains(&year) || !LANGUAGES.contains(&language) {
        return None;
    }
    Some((year, paper, language))
}

/// Download one paper into `dir` under its canonical filename.
///
/// A file already present is left untouched and its path returned; the
/// operator deletes and re-fetches explicitly when needed.
pub fn download(source: &PaperSource, dir: &Path) -> Result<PathBuf> {
    let target = dir.join(&source.filename);
    if target.exists() {
        log::info!("already downloaded: {}", target.display());
        return Ok(target);
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let response = client.get(&source.url).send()?;
    if !response.status().is_success() {
        return Err(AnnotateError::DownloadError(format!(
            "{}: HTTP {}",
            source.url,
            response.status()
        )));
    }
    let bytes = response.bytes()?;
    std::fs::create_dir_all(dir)?;
    std::fs::write(&target, &bytes)?;
    log::info!("downloaded {} ({} bytes)", target.display(), bytes.len());
    Ok(target)
}
