//! PDF access for examcrop: word extraction, page rendering and cropping.
//!
//! Parsing goes through lopdf behind the [`parser::backend::PdfBackend`]
//! trait; rendering goes through pdfium behind [`raster::Rasterizer`]. Both
//! seams have in-memory stand-ins in tests.

use examcrop_core::lines::group_words_into_lines;
use examcrop_core::regions::{extract_question_regions, extract_solution_regions, PageWords};
use examcrop_core::{QuestionRegion, SolutionRegion, Word};
use thiserror::Error;

use parser::backend::{LopdfBackend, PageId, PdfBackend};

pub mod crop;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod parser;
pub mod raster;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
    #[error("Render error: {0}")]
    Render(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A loaded PDF whose pages are addressed by 0-based index.
pub struct PdfDocument {
    backend: LopdfBackend,
    /// Page object ids in page order.
    page_ids: Vec<PageId>,
}

impl PdfDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let backend = LopdfBackend::load_bytes(bytes)?;
        let page_ids = backend.pages().into_values().collect();
        Ok(PdfDocument { backend, page_ids })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, page_index: usize) -> Result<PageId, PdfError> {
        self.page_ids
            .get(page_index)
            .copied()
            .ok_or(PdfError::PageOutOfRange {
                page: page_index,
                count: self.page_ids.len(),
            })
    }

    /// Words on one page, in top-left page coordinates.
    pub fn words(&self, page_index: usize) -> Result<Vec<Word>, PdfError> {
        parser::words::extract_page_words(&self.backend, self.page_id(page_index)?)
    }

    /// Plain text of one page, one line per row of words.
    pub fn page_text(&self, page_index: usize) -> Result<String, PdfError> {
        let lines = group_words_into_lines(self.words(page_index)?);
        Ok(lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Text of the first `pages` pages joined by newlines. Unreadable pages
    /// contribute nothing.
    pub fn leading_text(&self, pages: usize) -> String {
        (0..self.page_count().min(pages))
            .filter_map(|i| self.page_text(i).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every page's words. A page whose content cannot be decoded is logged
    /// and treated as empty so one bad page does not sink the document.
    pub fn all_page_words(&self) -> Vec<PageWords> {
        (0..self.page_count())
            .map(|i| match self.words(i) {
                Ok(words) => (i, words),
                Err(e) => {
                    log::warn!("skipping page {}: {}", i, e);
                    (i, Vec::new())
                }
            })
            .collect()
    }

    pub fn question_regions(&self) -> Vec<QuestionRegion> {
        extract_question_regions(self.all_page_words())
    }

    pub fn solution_regions(&self) -> Vec<SolutionRegion> {
        extract_solution_regions(self.all_page_words())
    }
}

// ---------------------------------------------------------------------------
// Convenience free functions (stateless, re-parse each call)
// ---------------------------------------------------------------------------

/// Question regions of a test document.
pub fn question_regions(bytes: &[u8]) -> Result<Vec<QuestionRegion>, PdfError> {
    Ok(PdfDocument::from_bytes(bytes)?.question_regions())
}

/// Solution regions of a solutions document.
pub fn solution_regions(bytes: &[u8]) -> Result<Vec<SolutionRegion>, PdfError> {
    Ok(PdfDocument::from_bytes(bytes)?.solution_regions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{build_pdf, build_pdf_with_crop_box};

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            PdfDocument::from_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_page_text_round_trips_lines() {
        let pdf = build_pdf(&[&["1. What is 2+2?", "A) 3"]]);
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_text(0).unwrap(), "1. What is 2+2?\nA) 3");
    }

    #[test]
    fn test_words_use_media_box_height() {
        let pdf = build_pdf(&[&["1."]]);
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let words = doc.words(0).unwrap();
        // Baseline 750 on an 842pt page, 12pt font.
        assert!((words[0].top - (842.0 - 759.6)).abs() < 0.01);
        assert!((words[0].left - 72.0).abs() < 0.01);
    }

    #[test]
    fn test_words_measured_from_crop_box_corner() {
        // Renderers draw only the CropBox, so that is where pixel row 0 is.
        let pdf = build_pdf_with_crop_box(&[&["1."]], [36, 0, 595, 800]);
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let words = doc.words(0).unwrap();
        assert!((words[0].top - (800.0 - 759.6)).abs() < 0.01);
        assert!((words[0].left - 36.0).abs() < 0.01);
    }

    #[test]
    fn test_crop_box_is_clipped_to_media_box() {
        let pdf = build_pdf_with_crop_box(&[&["1."]], [0, 0, 700, 900]);
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let words = doc.words(0).unwrap();
        assert!((words[0].top - (842.0 - 759.6)).abs() < 0.01);
    }

    #[test]
    fn test_page_out_of_range() {
        let pdf = build_pdf(&[&["x"]]);
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        assert!(matches!(
            doc.words(5),
            Err(PdfError::PageOutOfRange { page: 5, count: 1 })
        ));
    }

    #[test]
    fn test_question_regions_across_pages() {
        let pdf = build_pdf(&[
            &["1. First?", "A) a", "B) b", "C) c", "D) d"],
            &["2. Second?", "A) e", "B) f"],
        ]);
        let questions = question_regions(&pdf).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].page, 0);
        assert_eq!(questions[0].choices.len(), 4);
        assert_eq!(questions[1].number, 2);
        assert_eq!(questions[1].page, 1);
        assert_eq!(questions[1].choices.len(), 2);
    }

    #[test]
    fn test_solution_regions() {
        let pdf = build_pdf(&[&["1. Answer: B", "because 2+2=4", "2. Answer: D"]]);
        let solutions = solution_regions(&pdf).unwrap();
        assert_eq!(solutions.len(), 2);
        assert_eq!(solutions[0].content_lines, vec!["1. Answer: B", "because 2+2=4"]);
    }

    #[test]
    fn test_leading_text_limits_pages() {
        let pdf = build_pdf(&[&["2024 February"], &["Geometry"], &["x"], &["Team"]]);
        let doc = PdfDocument::from_bytes(&pdf).unwrap();
        let text = doc.leading_text(3);
        assert!(text.contains("Geometry"));
        assert!(!text.contains("Team"));
    }
}
