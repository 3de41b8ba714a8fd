//! Multi-region image composition.
//!
//! Each region rasterizes at a fixed oversampling scale, independent of the
//! on-screen zoom, and the rasters stack vertically in collection order —
//! the operator's intended reading order, never re-sorted by page or
//! position.

use image::{Rgb, RgbImage};

use crate::error::Result;
use crate::geometry::DocRect;
use crate::store::Region;

/// Fixed oversampling factor for exported crops. Export quality does not
/// follow the display zoom.
pub const RENDER_SCALE: f32 = 2.0;

/// Page access as the compositor needs it: rasterize one document-space
/// rectangle of one page at a given scale.
///
/// The pdfium backend implements this for real PDFs; tests use synthetic
/// rasterizers so composition logic runs headless.
pub trait PageRasterizer {
    fn rasterize_region(&self, page: usize, clip: &DocRect, scale: f32) -> Result<RgbImage>;
}

/// Compose the regions of one question into a single image.
///
/// Returns `Ok(None)` for an empty region list. A single region's raster is
/// returned unchanged. Multiple rasters stack vertically on a white canvas
/// as wide as the widest raster, each centered horizontally.
pub fn compose<R>(rasterizer: &R, regions: &[Region]) -> Result<Option<RgbImage>>
where
    R: PageRasterizer + ?Sized,
{
    if regions.is_empty() {
        return Ok(None);
    }

    let mut rasters = Vec::with_capacity(regions.len());
    for region in regions {
        rasters.push(rasterizer.rasterize_region(region.page, &region.doc, RENDER_SCALE)?);
    }

    if rasters.len() == 1 {
        return Ok(rasters.pop());
    }

    let max_width = rasters.iter().map(RgbImage::width).max().unwrap_or(0);
    let total_height: u32 = rasters.iter().map(RgbImage::height).sum();

    let mut canvas = RgbImage::from_pixel(max_width, total_height, Rgb([255, 255, 255]));
    let mut y_offset: i64 = 0;
    for raster in &rasters {
        let x_offset = i64::from((max_width - raster.width()) / 2);
        image::imageops::replace(&mut canvas, raster, x_offset, y_offset);
        y_offset += i64::from(raster.height());
    }

    Ok(Some(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DeviceRect;

    /// Rasterizes each region as a solid color keyed by page index, sized
    /// from the clip rectangle and scale.
    struct SolidRasterizer;

    impl PageRasterizer for SolidRasterizer {
        fn rasterize_region(&self, page: usize, clip: &DocRect, scale: f32) -> Result<RgbImage> {
            let width = (clip.width() as f32 * scale) as u32;
            let height = (clip.height() as f32 * scale) as u32;
            let shade = 40 * (page as u8 + 1);
            Ok(RgbImage::from_pixel(width, height, Rgb([shade, 0, 0])))
        }
    }

    fn region(page: usize, width: f64, height: f64) -> Region {
        let device = DeviceRect::from_corners((0.0, 0.0), (width, height));
        Region {
            page,
            doc: device.to_doc(1.0),
            device,
        }
    }

    #[test]
    fn test_empty_input_is_none() {
        let composed = compose(&SolidRasterizer, &[]).unwrap();
        assert!(composed.is_none());
    }

    #[test]
    fn test_single_region_is_identity() {
        let composed = compose(&SolidRasterizer, &[region(0, 100.0, 40.0)])
            .unwrap()
            .unwrap();
        // 2x oversampling, no canvas, no padding.
        assert_eq!(composed.dimensions(), (200, 80));
        assert_eq!(*composed.get_pixel(0, 0), Rgb([40, 0, 0]));
    }

    #[test]
    fn test_stacked_dimensions_and_centering() {
        let composed = compose(
            &SolidRasterizer,
            &[region(0, 100.0, 40.0), region(1, 60.0, 30.0)],
        )
        .unwrap()
        .unwrap();

        // Width = max(200, 120), height = 80 + 60.
        assert_eq!(composed.dimensions(), (200, 140));

        // First raster fills its full row.
        assert_eq!(*composed.get_pixel(0, 0), Rgb([40, 0, 0]));
        // Second raster is centered: (200 - 120) / 2 = 40 px margin.
        assert_eq!(*composed.get_pixel(39, 100), Rgb([255, 255, 255]));
        assert_eq!(*composed.get_pixel(40, 100), Rgb([80, 0, 0]));
        assert_eq!(*composed.get_pixel(159, 100), Rgb([80, 0, 0]));
        assert_eq!(*composed.get_pixel(160, 100), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_collection_order_preserved_not_page_order() {
        // Region from page 1 collected first must land on top.
        let composed = compose(
            &SolidRasterizer,
            &[region(1, 50.0, 20.0), region(0, 50.0, 20.0)],
        )
        .unwrap()
        .unwrap();
        assert_eq!(*composed.get_pixel(0, 0), Rgb([80, 0, 0]));
        assert_eq!(*composed.get_pixel(0, 40), Rgb([40, 0, 0]));
    }
}
