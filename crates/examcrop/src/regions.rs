//! `examcrop regions`: print what the layout engine finds in one PDF.

use std::path::PathBuf;

use colored::Colorize;
use examcrop_core::{BoundingBox, QuestionRegion, SolutionRegion};
use pdf::PdfDocument;
use serde::Serialize;

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct RegionsOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Treat the document as a solutions PDF
    #[arg(long)]
    pub solutions: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RegionsOutput {
    Questions(Vec<QuestionRegion>),
    Solutions(Vec<SolutionRegion>),
}

pub fn regions_data(bytes: &[u8], solutions: bool) -> Result<RegionsOutput> {
    let doc = PdfDocument::from_bytes(bytes).map_err(|e| eyre!(e))?;
    Ok(if solutions {
        RegionsOutput::Solutions(doc.solution_regions())
    } else {
        RegionsOutput::Questions(doc.question_regions())
    })
}

pub fn run(options: RegionsOptions, global: &crate::Global) -> Result<()> {
    if global.verbose {
        println!("Reading {}...", options.path.display());
    }

    let bytes = std::fs::read(&options.path)
        .wrap_err_with(|| format!("failed to read {}", options.path.display()))?;
    let output = regions_data(&bytes, options.solutions)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", format_regions_text(&output));
    }

    Ok(())
}

fn format_bbox(b: &BoundingBox) -> String {
    if b.is_finite() {
        format!("({:.1}, {:.1}) - ({:.1}, {:.1})", b.x0, b.y0, b.x1, b.y1)
    } else {
        "(empty)".to_string()
    }
}

fn format_regions_text(output: &RegionsOutput) -> String {
    let mut table = new_table();

    match output {
        RegionsOutput::Questions(questions) => {
            if questions.is_empty() {
                return "No questions found.".yellow().to_string();
            }
            table.add_row(prettytable::row!["#", "Page", "Box", "Choices"]);
            for q in questions {
                let letters: Vec<String> = q.choices.iter().map(|c| c.letter.to_string()).collect();
                table.add_row(prettytable::row![
                    q.number,
                    q.page,
                    format_bbox(&q.bbox),
                    letters.join(" ")
                ]);
            }
        }
        RegionsOutput::Solutions(solutions) => {
            if solutions.is_empty() {
                return "No solutions found.".yellow().to_string();
            }
            table.add_row(prettytable::row!["#", "Page", "Box", "Lines"]);
            for s in solutions {
                table.add_row(prettytable::row![
                    s.number,
                    s.page,
                    format_bbox(&s.bbox),
                    s.content_lines.len()
                ]);
            }
        }
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_solution_pdf, sample_test_pdf};

    #[test]
    fn test_regions_data_questions() {
        let RegionsOutput::Questions(questions) = regions_data(&sample_test_pdf(), false).unwrap()
        else {
            panic!("expected questions");
        };
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].choices.len(), 4);
    }

    #[test]
    fn test_regions_data_solutions() {
        let RegionsOutput::Solutions(solutions) = regions_data(&sample_solution_pdf(), true).unwrap()
        else {
            panic!("expected solutions");
        };
        assert_eq!(solutions[0].content_lines, vec!["1. Answer: B"]);
    }

    #[test]
    fn test_text_table_lists_choices() {
        let output = regions_data(&sample_test_pdf(), false).unwrap();
        let text = format_regions_text(&output);
        assert!(text.contains("A B C D"));
        assert!(text.contains("(72.0, "));
    }

    #[test]
    fn test_json_is_untagged_list() {
        let output = regions_data(&sample_solution_pdf(), true).unwrap();
        let json: serde_json::Value = serde_json::to_value(&output).unwrap();
        assert_eq!(json[0]["number"], 1);
    }

    #[test]
    fn test_format_empty_bbox() {
        assert_eq!(format_bbox(&BoundingBox::EMPTY), "(empty)");
    }
}
