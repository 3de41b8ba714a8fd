//! Pdfium-backed page rasterization.
//!
//! The document is kept as owned bytes and reopened per render call; pdfium
//! documents borrow both the binding and the byte slice, and render calls
//! are operator-paced, so reopening is simpler than holding the borrow
//! across the session.

use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

use crate::compose::PageRasterizer;
use crate::error::{AnnotateError, Result};
use crate::geometry::DocRect;

/// Size of one page in document points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Rasterizer over a PDF file via the system pdfium library.
pub struct PdfiumRasterizer {
    path: PathBuf,
    pdf_bytes: Vec<u8>,
    page_sizes: Vec<PageSize>,
}

impl PdfiumRasterizer {
    /// Load a PDF and cache its page geometry.
    pub fn open(path: &Path) -> Result<Self> {
        let pdf_bytes = std::fs::read(path)?;
        let pdfium = Self::bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&pdf_bytes, None)
            .map_err(|e| AnnotateError::RenderError(format!("failed to parse PDF: {e}")))?;
        let page_sizes: Vec<PageSize> = document
            .pages()
            .iter()
            .map(|page| PageSize {
                width: page.width().value,
                height: page.height().value,
            })
            .collect();
        drop(document);
        log::info!(
            "opened {} ({} pages)",
            path.display(),
            page_sizes.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            pdf_bytes,
            page_sizes,
        })
    }

    fn bind() -> Result<Pdfium> {
        let bindings = Pdfium::bind_to_system_library()
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            })
            .map_err(|e| AnnotateError::RenderError(format!("failed to bind pdfium: {e}")))?;
        Ok(Pdfium::new(bindings))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    pub fn page_size(&self, page: usize) -> Option<PageSize> {
        self.page_sizes.get(page).copied()
    }

    /// Render a whole page at `scale` pixels per point.
    pub fn render_page(&self, page_index: usize, scale: f32) -> Result<RgbImage> {
        if page_index >= self.page_sizes.len() {
            return Err(AnnotateError::PageOutOfRange {
                page: page_index,
                pages: self.page_sizes.len(),
            });
        }
        let pdfium = Self::bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&self.pdf_bytes, None)
            .map_err(|e| AnnotateError::RenderError(format!("failed to parse PDF: {e}")))?;
        let page = document
            .pages()
            .get(page_index as u16)
            .map_err(|e| AnnotateError::RenderError(format!("page {page_index}: {e}")))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| AnnotateError::RenderError(format!("render page {page_index}: {e}")))?;
        Ok(bitmap.as_image().to_rgb8())
    }
}

impl PageRasterizer for PdfiumRasterizer {
    /// Render the page at `scale` and crop to the clip rectangle, clamped
    /// to the page bounds.
    fn rasterize_region(&self, page: usize, clip: &DocRect, scale: f32) -> Result<RgbImage> {
        let full = self.render_page(page, scale)?;

        let x = ((clip.x0 as f32 * scale).max(0.0) as u32).min(full.width());
        let y = ((clip.y0 as f32 * scale).max(0.0) as u32).min(full.height());
        let width = ((clip.width() as f32 * scale) as u32).min(full.width() - x);
        let height = ((clip.height() as f32 * scale) as u32).min(full.height() - y);
        if width == 0 || height == 0 {
            return Err(AnnotateError::RenderError(format!(
                "empty clip rectangle on page {page}"
            )));
        }

        Ok(image::imageops::crop_imm(&full, x, y, width, height).to_image())
    }
}
