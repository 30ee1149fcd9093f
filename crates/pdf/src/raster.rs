//! Page rasterization.
//!
//! Rendering goes through the [`Rasterizer`] trait so the crop and packaging
//! code can be exercised without the pdfium shared library. The pixel grid of
//! a rendered page is the page's point grid multiplied by `zoom`, with the
//! origin at the top-left corner, the same space [`examcrop_core::Word`]
//! boxes live in before scaling.

use std::path::Path;

use image::RgbImage;

use crate::PdfError;

/// Render one page of a PDF to an RGB bitmap.
pub trait Rasterizer {
    /// `page_index` is 0-based. The returned image is
    /// `page_width * zoom` by `page_height * zoom` pixels.
    fn render_page(&self, pdf: &[u8], page_index: usize, zoom: f32)
        -> Result<RgbImage, PdfError>;
}

/// Stand-in used when no rendering library could be bound. Every render
/// fails, so every crop degrades to a blank placeholder.
#[derive(Debug, Clone)]
pub struct UnavailableRasterizer {
    pub reason: String,
}

impl Rasterizer for UnavailableRasterizer {
    fn render_page(&self, _pdf: &[u8], _page_index: usize, _zoom: f32) -> Result<RgbImage, PdfError> {
        Err(PdfError::Render(self.reason.clone()))
    }
}

#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRasterizer;

#[cfg(feature = "pdfium")]
mod pdfium {
    use std::path::Path;

    use image::RgbImage;
    use pdfium_render::prelude::*;

    use super::Rasterizer;
    use crate::PdfError;

    pub struct PdfiumRasterizer {
        pdfium: Pdfium,
    }

    impl PdfiumRasterizer {
        /// Bind pdfium from `dir` when given, falling back to the system
        /// library.
        pub fn bind(dir: Option<&Path>) -> Result<Self, PdfError> {
            let bindings = match dir {
                Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                    .or_else(|_| Pdfium::bind_to_system_library()),
                None => Pdfium::bind_to_system_library(),
            }
            .map_err(|e| PdfError::Render(format!("failed to bind pdfium: {}", e)))?;

            Ok(PdfiumRasterizer {
                pdfium: Pdfium::new(bindings),
            })
        }
    }

    impl Rasterizer for PdfiumRasterizer {
        fn render_page(&self, pdf: &[u8], page_index: usize, zoom: f32) -> Result<RgbImage, PdfError> {
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(|e| PdfError::Parse(e.to_string()))?;

            let pages = document.pages();
            let count = pages.len() as usize;
            let page = pages
                .iter()
                .nth(page_index)
                .ok_or(PdfError::PageOutOfRange {
                    page: page_index,
                    count,
                })?;

            let pixel_width = (page.width().value * zoom).round() as i32;
            let pixel_height = (page.height().value * zoom).round() as i32;

            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(pixel_width)
                        .set_target_height(pixel_height)
                        .render_form_data(true)
                        .render_annotations(true),
                )
                .map_err(|e| PdfError::Render(e.to_string()))?;

            // Go through raw bytes so the image version pdfium-render links
            // against does not have to match ours.
            let rgb = bitmap.as_image().to_rgb8();
            let (width, height) = rgb.dimensions();
            RgbImage::from_raw(width, height, rgb.into_raw())
                .ok_or_else(|| PdfError::Render("bitmap size mismatch".to_string()))
        }
    }
}

/// The best rasterizer available on this machine.
///
/// Never fails: when pdfium cannot be bound, a warning is logged and an
/// [`UnavailableRasterizer`] is returned so conversion still produces an
/// archive (of blanks).
pub fn system_rasterizer(pdfium_dir: Option<&Path>) -> Box<dyn Rasterizer> {
    #[cfg(feature = "pdfium")]
    let rasterizer: Box<dyn Rasterizer> = match PdfiumRasterizer::bind(pdfium_dir) {
        Ok(r) => Box::new(r),
        Err(e) => {
            log::warn!("{}; crops will be blank placeholders", e);
            Box::new(UnavailableRasterizer {
                reason: e.to_string(),
            })
        }
    };

    #[cfg(not(feature = "pdfium"))]
    let rasterizer: Box<dyn Rasterizer> = {
        let _ = pdfium_dir;
        log::warn!("built without pdfium; crops will be blank placeholders");
        Box::new(UnavailableRasterizer {
            reason: "built without pdfium support".to_string(),
        })
    };

    rasterizer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_rasterizer_reports_reason() {
        let r = UnavailableRasterizer {
            reason: "no library".to_string(),
        };
        match r.render_page(b"%PDF-1.5", 0, 2.0) {
            Err(PdfError::Render(msg)) => assert_eq!(msg, "no library"),
            other => panic!("expected render error, got {:?}", other.map(|i| i.dimensions())),
        }
    }
}
