//! Region annotation and image export for exam papers.
//!
//! An operator draws rectangles over rasterized pages; this crate owns the
//! drag state machine, the committed annotation list with its per-type
//! sequence counters (recoverable by rescanning exported filenames), the
//! multi-region image compositor, and the export pipeline that turns
//! finalized annotations into cropped question images.
//!
//! PDF rasterization lives behind the `pdf` feature ([`pdfium::PdfiumRasterizer`]);
//! everything else runs headless against the [`compose::PageRasterizer`] trait.

pub mod compose;
pub mod counters;
pub mod download;
pub mod error;
pub mod export;
pub mod geometry;
#[cfg(feature = "pdf")]
pub mod pdfium;
pub mod store;

pub use compose::{compose, PageRasterizer, RENDER_SCALE};
pub use counters::counters_from_filenames;
pub use error::{AnnotateError, Result};
pub use export::{export_annotations, undo_last_export, ExportManifest};
pub use geometry::{DeviceRect, DocRect, MIN_REGION_DEVICE_PX};
#[cfg(feature = "pdf")]
pub use pdfium::PdfiumRasterizer;
pub use store::{Annotation, PaperMetadata, Region, RegionStore};
