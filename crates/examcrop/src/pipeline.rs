//! One conversion run: two PDFs in, one zip of slot images out.
//!
//! ```text
//! test.pdf ----> question regions --+
//!                                   +--> plan_slots --> crop / blank --> PNGs --> zip
//! solution.pdf -> solution regions -+
//! ```
//!
//! Each run writes its images into its own temporary directory, so
//! concurrent runs never see each other's files.

use std::fs;
use std::path::{Path, PathBuf};

use examcrop_core::metadata::{Metadata, MetadataOverrides};
use examcrop_core::plan::{plan_slots, BlankReason, DocumentKind, SlotJob, SlotTarget};
use examcrop_core::slots::Slot;
use pdf::crop::{blank_placeholder, encode_png, CropOutcome, Cropper};
use pdf::raster::Rasterizer;
use pdf::PdfDocument;
use serde::Serialize;

use crate::archive;
use crate::config::Config;
use crate::prelude::*;

/// Pages scanned for metadata inference, per document.
const METADATA_PAGES: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    pub test_pdf: Vec<u8>,
    pub solution_pdf: Vec<u8>,
    pub overrides: MetadataOverrides,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub index: u32,
    pub file_name: String,
    pub question: u32,
    pub slot: String,
    /// Why the slot is blank; `None` for a real crop.
    pub blank: Option<BlankReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub base_name: String,
    pub metadata: Metadata,
    pub archive: PathBuf,
    pub questions: usize,
    pub solutions: usize,
    pub matched_solutions: usize,
    /// Blank slots other than fillers.
    pub blank_slots: usize,
    pub slots: Vec<SlotReport>,
}

fn open(document: &str, bytes: &[u8]) -> Result<PdfDocument, Error> {
    PdfDocument::from_bytes(bytes).map_err(|e| Error::SourcePdf {
        document: document.to_string(),
        reason: e.to_string(),
    })
}

/// Run the whole conversion and write `<archive_dir>/<base_name>.zip`.
///
/// Only an unopenable source PDF or a failed archive write is an error.
/// Every other problem turns into a blank slot recorded in the report.
pub fn convert(
    config: &Config,
    rasterizer: &dyn Rasterizer,
    request: &ConversionRequest,
    archive_dir: &Path,
) -> Result<RunReport, Error> {
    let test_doc = open("test", &request.test_pdf)?;
    let solution_doc = open("solution", &request.solution_pdf)?;

    let questions = test_doc.question_regions();
    let solutions = solution_doc.solution_regions();
    log::info!(
        "found {} questions and {} solutions",
        questions.len(),
        solutions.len()
    );

    let text = format!(
        "{}\n{}",
        test_doc.leading_text(METADATA_PAGES),
        solution_doc.leading_text(METADATA_PAGES)
    );
    let metadata = Metadata::resolve(&request.overrides, &text);
    let base_name = metadata.base_name();

    let jobs = plan_slots(&questions, &solutions, &base_name, config.plan_options());

    let work_dir = tempfile::Builder::new().prefix("examcrop-").tempdir()?;
    let mut test_cropper = Cropper::new(rasterizer, &request.test_pdf, config.zoom);
    let mut solution_cropper = Cropper::new(rasterizer, &request.solution_pdf, config.zoom);

    let mut slots = Vec::with_capacity(jobs.len());
    for job in &jobs {
        let outcome = match &job.target {
            SlotTarget::Crop {
                document,
                page,
                bbox,
            } => match document {
                DocumentKind::Test => test_cropper.crop(*page, bbox),
                DocumentKind::Solution => solution_cropper.crop(*page, bbox),
            },
            SlotTarget::Blank(reason) => CropOutcome::Blank(reason.clone()),
        };

        let (image, blank) = match outcome {
            CropOutcome::Image(image) => (image, None),
            CropOutcome::Blank(reason) => {
                if reason != BlankReason::Filler {
                    log::debug!("{} is blank: {}", job.file_name, reason);
                }
                (
                    blank_placeholder(config.blank_width, config.blank_height),
                    Some(reason),
                )
            }
        };

        let png = encode_png(&image).map_err(|e| Error::Archive(e.to_string()))?;
        fs::write(work_dir.path().join(&job.file_name), png)?;
        slots.push(slot_report(job, blank));
    }

    let archive_path = archive_dir.join(format!("{}.zip", base_name));
    archive::write_archive(work_dir.path(), &archive_path)?;

    let matched_solutions = jobs
        .iter()
        .filter(|j| j.slot == Slot::Solution && matches!(j.target, SlotTarget::Crop { .. }))
        .count();
    let blank_slots = slots
        .iter()
        .filter(|s| matches!(&s.blank, Some(reason) if *reason != BlankReason::Filler))
        .count();

    log::info!(
        "{}: {} slots, {} blank, {}/{} solutions matched",
        base_name,
        slots.len(),
        blank_slots,
        matched_solutions,
        questions.len()
    );

    Ok(RunReport {
        base_name,
        metadata,
        archive: archive_path,
        questions: questions.len(),
        solutions: solutions.len(),
        matched_solutions,
        blank_slots,
        slots,
    })
}

fn slot_report(job: &SlotJob, blank: Option<BlankReason>) -> SlotReport {
    SlotReport {
        index: job.index,
        file_name: job.file_name.clone(),
        question: job.question,
        slot: job.slot.to_string(),
        blank,
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Read;

    use image::{GenericImageView, Rgb};
    use pdf::raster::UnavailableRasterizer;

    use super::*;
    use crate::fixtures::{build_pdf, sample_solution_pdf, sample_test_pdf, MockRasterizer};

    fn overrides() -> MetadataOverrides {
        MetadataOverrides {
            year: Some("2024".into()),
            month: Some("Feb".into()),
            exam_type: Some("Reg".into()),
            level: Some("Geometry".into()),
            division: Some("Indiv".into()),
        }
    }

    fn request(test_pdf: Vec<u8>, solution_pdf: Vec<u8>) -> ConversionRequest {
        ConversionRequest {
            test_pdf,
            solution_pdf,
            overrides: overrides(),
        }
    }

    /// `(name, width, height, is_white)` for every archive entry, in
    /// archive order.
    fn archive_images(path: &Path) -> Vec<(String, u32, u32, bool)> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes).unwrap();
                let img = image::load_from_memory(&bytes).unwrap();
                let white = img.to_rgb8().pixels().all(|p| *p == Rgb([255, 255, 255]));
                let (w, h) = img.dimensions();
                (entry.name().to_string(), w, h, white)
            })
            .collect()
    }

    #[test]
    fn test_end_to_end_single_question() {
        let out = tempfile::tempdir().unwrap();
        let report = convert(
            &Config::default(),
            &MockRasterizer,
            &request(sample_test_pdf(), sample_solution_pdf()),
            out.path(),
        )
        .unwrap();

        assert_eq!(report.base_name, "2024_Feb_Reg_Geometry_Indiv");
        assert_eq!(report.questions, 1);
        assert_eq!(report.matched_solutions, 1);
        assert_eq!(report.blank_slots, 0);
        assert_eq!(
            report.archive,
            out.path().join("2024_Feb_Reg_Geometry_Indiv.zip")
        );

        let images = archive_images(&report.archive);
        assert_eq!(images.len(), 10);
        let names: Vec<&str> = images.iter().map(|(n, ..)| n.as_str()).collect();
        assert_eq!(names[0], "000010_2024_Feb_Reg_Geometry_Indiv.png");
        assert_eq!(names[9], "000019_2024_Feb_Reg_Geometry_Indiv.png");

        // Question, four choices and the solution are real crops.
        for (name, _, _, white) in &images[..6] {
            assert!(!white, "{name} should be a crop");
        }
        // "1. What is 2+2?" is 15 Courier glyphs at 12pt, zoom 2.
        assert_eq!((images[0].1, images[0].2), (180, 24));
        for (name, w, h, white) in &images[6..] {
            assert!(*white && (*w, *h) == (800, 600), "{name} should be a filler");
        }
    }

    #[test]
    fn test_missing_choice_d_is_blank() {
        let test_pdf = build_pdf(&[&["1. What is 2+2?", "A) 3", "B) 4", "C) 5"]]);
        let out = tempfile::tempdir().unwrap();
        let report = convert(
            &Config::default(),
            &MockRasterizer,
            &request(test_pdf, sample_solution_pdf()),
            out.path(),
        )
        .unwrap();

        assert_eq!(report.blank_slots, 1);
        assert_eq!(report.slots[4].slot, "choice D");
        assert!(matches!(report.slots[4].blank, Some(BlankReason::MissingChoice(_))));

        let images = archive_images(&report.archive);
        for (name, _, _, white) in &images[1..4] {
            assert!(!white, "{name} should be a crop");
        }
        assert_eq!(images[4].1, 800);
        assert!(images[4].3);
    }

    #[test]
    fn test_missing_solution_seven_only() {
        let test_pdf = build_pdf(&[&[
            "6. Six?", "A) a", "B) b", "C) c", "D) d", "7. Seven?", "A) a", "B) b", "C) c", "D) d",
        ]]);
        let solution_pdf = build_pdf(&[&["6. Answer: A"]]);
        let out = tempfile::tempdir().unwrap();
        let report = convert(
            &Config::default(),
            &MockRasterizer,
            &request(test_pdf, solution_pdf),
            out.path(),
        )
        .unwrap();

        let slot = |index: u32| report.slots.iter().find(|s| s.index == index).unwrap();
        assert_eq!(slot(65).blank, None);
        assert_eq!(slot(75).blank, Some(BlankReason::MissingSolution));
        assert_eq!(report.blank_slots, 1);
        assert_eq!(report.matched_solutions, 1);
    }

    #[test]
    fn test_repeated_question_number_keeps_report_and_archive_in_step() {
        let test_pdf = build_pdf(&[
            &["1. First?", "A) a", "B) b", "C) c", "D) d"],
            &["1. Renumbered?", "A) a"],
        ]);
        let out = tempfile::tempdir().unwrap();
        let report = convert(
            &Config::default(),
            &MockRasterizer,
            &request(test_pdf, sample_solution_pdf()),
            out.path(),
        )
        .unwrap();

        assert_eq!(report.questions, 2);
        assert_eq!(report.matched_solutions, 1);
        let images = archive_images(&report.archive);
        assert_eq!(report.slots.len(), images.len());
        assert_eq!(images.len(), 10);
        for (slot, (name, ..)) in report.slots.iter().zip(&images) {
            assert_eq!(&slot.file_name, name);
        }
        // Choice D comes from the first page, where it exists.
        assert_eq!(report.slots[4].blank, None);
        assert!(!images[4].3);
    }

    #[test]
    fn test_without_fillers() {
        let out = tempfile::tempdir().unwrap();
        let config = Config {
            fillers: false,
            ..Config::default()
        };
        let report = convert(
            &config,
            &MockRasterizer,
            &request(sample_test_pdf(), sample_solution_pdf()),
            out.path(),
        )
        .unwrap();
        assert_eq!(archive_images(&report.archive).len(), 6);
    }

    #[test]
    fn test_unrenderable_pages_still_package_blanks() {
        let out = tempfile::tempdir().unwrap();
        let rasterizer = UnavailableRasterizer {
            reason: "no pdfium".to_string(),
        };
        let report = convert(
            &Config::default(),
            &rasterizer,
            &request(sample_test_pdf(), sample_solution_pdf()),
            out.path(),
        )
        .unwrap();

        assert_eq!(report.blank_slots, 6);
        assert!(matches!(
            &report.slots[0].blank,
            Some(BlankReason::RenderFailed(msg)) if msg.contains("no pdfium")
        ));
        let images = archive_images(&report.archive);
        assert_eq!(images.len(), 10);
        assert!(images.iter().all(|(_, w, h, white)| *white && (*w, *h) == (800, 600)));
    }

    #[test]
    fn test_unopenable_test_pdf_is_fatal() {
        let out = tempfile::tempdir().unwrap();
        let err = convert(
            &Config::default(),
            &MockRasterizer,
            &request(b"%PDF-1.5 broken".to_vec(), sample_solution_pdf()),
            out.path(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SourcePdf { ref document, .. } if document == "test"));
        assert!(fs::read_dir(out.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_metadata_inferred_when_not_supplied() {
        let test_pdf = build_pdf(&[
            &["2024 March Regional", "Algebra 2 Team Test"],
            &["1. What is 2+2?", "A) 3"],
        ]);
        let out = tempfile::tempdir().unwrap();
        let report = convert(
            &Config::default(),
            &MockRasterizer,
            &ConversionRequest {
                test_pdf,
                solution_pdf: sample_solution_pdf(),
                overrides: MetadataOverrides::default(),
            },
            out.path(),
        )
        .unwrap();
        assert_eq!(report.base_name, "2024_Mar_Reg_Algebra2_Team");
        assert_eq!(report.slots[0].index, 10);
    }
}
