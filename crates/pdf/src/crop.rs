//! Cropping regions out of rendered pages.
//!
//! A [`Cropper`] renders each page at most once per document and cuts
//! region boxes out of the cached bitmap. Nothing here fails: a bad box or a
//! render error yields [`CropOutcome::Blank`] with the reason, and the caller
//! writes a placeholder.

use std::collections::HashMap;
use std::io::Cursor;

use examcrop_core::plan::BlankReason;
use examcrop_core::BoundingBox;
use image::{imageops, ImageFormat, Rgb, RgbImage};

use crate::raster::Rasterizer;
use crate::PdfError;

/// Default placeholder size in pixels.
pub const BLANK_WIDTH: u32 = 800;
pub const BLANK_HEIGHT: u32 = 600;

#[derive(Debug, Clone)]
pub enum CropOutcome {
    Image(RgbImage),
    Blank(BlankReason),
}

/// Integer pixel window `(x, y, width, height)` of `bbox` on a page rendered
/// at `zoom` into an `image_w` x `image_h` bitmap.
///
/// Coordinates are scaled, truncated toward zero and clamped to the image.
/// Returns `None` when nothing of the box survives.
pub fn pixel_window(
    bbox: &BoundingBox,
    zoom: f32,
    image_w: u32,
    image_h: u32,
) -> Option<(u32, u32, u32, u32)> {
    if !bbox.is_finite() || !bbox.has_area() {
        return None;
    }

    let scaled = bbox.scale(zoom);
    let clamp = |v: f32, max: u32| -> u32 {
        if v <= 0.0 {
            0
        } else {
            (v as u32).min(max)
        }
    };

    let x0 = clamp(scaled.x0, image_w);
    let y0 = clamp(scaled.y0, image_h);
    let x1 = clamp(scaled.x1, image_w);
    let y1 = clamp(scaled.y1, image_h);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}

/// A white `width` x `height` image.
pub fn blank_placeholder(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width.max(1), height.max(1), Rgb([255, 255, 255]))
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, PdfError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| PdfError::Render(format!("PNG encoding failed: {}", e)))?;
    Ok(buf.into_inner())
}

/// Crops regions out of one document's pages.
pub struct Cropper<'a> {
    rasterizer: &'a dyn Rasterizer,
    pdf: &'a [u8],
    zoom: f32,
    /// Rendered pages, or the render error message, by 0-based index.
    pages: HashMap<usize, Result<RgbImage, String>>,
}

impl<'a> Cropper<'a> {
    pub fn new(rasterizer: &'a dyn Rasterizer, pdf: &'a [u8], zoom: f32) -> Self {
        Cropper {
            rasterizer,
            pdf,
            zoom,
            pages: HashMap::new(),
        }
    }

    fn page(&mut self, page: usize) -> &Result<RgbImage, String> {
        let (rasterizer, pdf, zoom) = (self.rasterizer, self.pdf, self.zoom);
        self.pages.entry(page).or_insert_with(|| {
            rasterizer.render_page(pdf, page, zoom).map_err(|e| {
                log::warn!("rendering page {} failed: {}", page, e);
                e.to_string()
            })
        })
    }

    pub fn crop(&mut self, page: usize, bbox: &BoundingBox) -> CropOutcome {
        if !bbox.is_finite() || !bbox.has_area() {
            return CropOutcome::Blank(BlankReason::InvalidBox);
        }

        let zoom = self.zoom;
        let image = match self.page(page) {
            Ok(image) => image,
            Err(msg) => return CropOutcome::Blank(BlankReason::RenderFailed(msg.clone())),
        };

        match pixel_window(bbox, zoom, image.width(), image.height()) {
            Some((x, y, w, h)) => CropOutcome::Image(imageops::crop_imm(image, x, y, w, h).to_image()),
            None => {
                log::debug!("box {:?} falls outside page {}", bbox, page);
                CropOutcome::Blank(BlankReason::InvalidBox)
            }
        }
    }
}
