use std::path::PathBuf;

use colored::Colorize;
use examcrop_core::metadata::MetadataOverrides;
use examcrop_core::plan::BlankReason;

use crate::config::Config;
use crate::pipeline::{self, ConversionRequest, RunReport};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct ConvertOptions {
    /// Path to the test (questions) PDF
    pub test_pdf: PathBuf,

    /// Path to the solutions PDF
    pub solution_pdf: PathBuf,

    /// Exam year (inferred from the documents when omitted)
    #[arg(long)]
    pub year: Option<String>,

    /// Exam month
    #[arg(long)]
    pub month: Option<String>,

    /// Exam type, e.g. Reg or Inv
    #[arg(long = "type")]
    pub exam_type: Option<String>,

    /// Course level, e.g. Geometry
    #[arg(long)]
    pub level: Option<String>,

    /// Indiv or Team
    #[arg(long)]
    pub division: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConvertOptions {
    fn overrides(&self) -> MetadataOverrides {
        MetadataOverrides {
            year: self.year.clone(),
            month: self.month.clone(),
            exam_type: self.exam_type.clone(),
            level: self.level.clone(),
            division: self.division.clone(),
        }
    }
}

pub fn run(options: ConvertOptions, config: &Config, global: &crate::Global) -> Result<()> {
    let read = |path: &PathBuf| {
        std::fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))
    };
    let request = ConversionRequest {
        test_pdf: read(&options.test_pdf)?,
        solution_pdf: read(&options.solution_pdf)?,
        overrides: options.overrides(),
    };

    if global.verbose {
        println!(
            "Converting {} + {}...",
            options.test_pdf.display(),
            options.solution_pdf.display()
        );
    }

    let rasterizer = pdf::raster::system_rasterizer(config.pdfium_path.as_deref());
    let report = pipeline::convert(config, rasterizer.as_ref(), &request, &config.output_dir)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_report_text(&report));
    }

    Ok(())
}

fn format_report_text(report: &RunReport) -> String {
    let mut result = String::new();

    result.push_str(&format!(
        "{} {}\n",
        "Wrote".green().bold(),
        report.archive.display().to_string().cyan()
    ));
    result.push_str(&format!(
        "  {} questions, {} of them with a solution\n",
        report.questions, report.matched_solutions
    ));

    if report.blank_slots == 0 {
        result.push_str(&format!("  {}\n", "no blank slots".green()));
    } else {
        result.push_str(&format!(
            "  {}\n",
            format!("{} blank slots", report.blank_slots).yellow()
        ));
        for slot in &report.slots {
            match &slot.blank {
                Some(BlankReason::Filler) | None => {}
                Some(reason) => {
                    result.push_str(&format!("    {} ({})\n", slot.file_name, reason));
                }
            }
        }
    }

    result
}
