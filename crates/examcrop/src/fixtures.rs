//! Test fixtures: sample exam PDFs and a rasterizer that never touches
//! pdfium.

use image::{Rgb, RgbImage};
use pdf::raster::Rasterizer;
use pdf::PdfError;

pub use pdf::fixtures::build_pdf;
use pdf::fixtures::{PAGE_HEIGHT, PAGE_WIDTH};

/// The canonical one-question test and its solution.
pub fn sample_test_pdf() -> Vec<u8> {
    build_pdf(&[&["1. What is 2+2?", "A) 3", "B) 4", "C) 5", "D) 6"]])
}

pub fn sample_solution_pdf() -> Vec<u8> {
    build_pdf(&[&["1. Answer: B"]])
}

/// Renders every page as a grey A4 sheet at the requested zoom.
pub struct MockRasterizer;

impl Rasterizer for MockRasterizer {
    fn render_page(&self, _pdf: &[u8], _page_index: usize, zoom: f32) -> Result<RgbImage, PdfError> {
        Ok(RgbImage::from_pixel(
            (PAGE_WIDTH * zoom) as u32,
            (PAGE_HEIGHT * zoom) as u32,
            Rgb([200, 200, 200]),
        ))
    }
}
