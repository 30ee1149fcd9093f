//! Region accumulation: the single-pass state machines that turn classified
//! lines into question, choice and solution regions.
//!
//! Each page gets its own accumulator. Lines are fed top to bottom; a marker
//! line closes whatever is open and opens a new region, a continuation line
//! grows the open regions. Nothing carries over from one page to the next,
//! so a question whose choices spill onto the following page is cut at the
//! page boundary.
//!
//! ```text
//! Word[] -> Line[] -> classify -> QuestionAccumulator -> QuestionRegion[]
//!                              -> SolutionAccumulator -> SolutionRegion[]
//! ```

use log::debug;

use crate::lines::{group_words_into_lines, Line};
use crate::marker::{classify, question_number, Marker};
use crate::types::{ChoiceRegion, QuestionRegion, SolutionRegion, Word};

/// The words of one page, keyed by its 0-based page index.
pub type PageWords = (usize, Vec<Word>);

// ---------------------------------------------------------------------------
// Question mode
// ---------------------------------------------------------------------------

/// Per-page state machine for the test document.
#[derive(Debug)]
pub struct QuestionAccumulator {
    page: usize,
    current_question: Option<QuestionRegion>,
    current_choice: Option<ChoiceRegion>,
    finished: Vec<QuestionRegion>,
}

impl QuestionAccumulator {
    pub fn new(page: usize) -> Self {
        QuestionAccumulator {
            page,
            current_question: None,
            current_choice: None,
            finished: Vec::new(),
        }
    }

    pub fn push_line(&mut self, line: &Line) {
        let text = line.text();
        let extent = line.bbox();

        match classify(&text) {
            Marker::Question(number) => {
                self.close_question();
                debug!("page {}: question {} opens", self.page, number);
                self.current_question = Some(QuestionRegion {
                    number,
                    page: self.page,
                    bbox: extent,
                    choices: Vec::new(),
                });
            }
            Marker::Choice(letter) => {
                if self.current_question.is_none() {
                    debug!("page {}: choice {} before any question, dropped", self.page, letter);
                    return;
                }
                self.close_choice();
                self.current_choice = Some(ChoiceRegion {
                    letter,
                    bbox: extent,
                });
            }
            Marker::Continuation => {
                let Some(question) = self.current_question.as_mut() else {
                    return;
                };
                question.bbox.extend(&extent);
                if let Some(choice) = self.current_choice.as_mut() {
                    choice.bbox.extend(&extent);
                }
            }
        }
    }

    fn close_choice(&mut self) {
        if let Some(choice) = self.current_choice.take() {
            if let Some(question) = self.current_question.as_mut() {
                question.choices.push(choice);
            }
        }
    }

    fn close_question(&mut self) {
        self.close_choice();
        if let Some(question) = self.current_question.take() {
            self.finished.push(question);
        }
    }

    /// Close everything still open and hand over the page's regions.
    pub fn finish(mut self) -> Vec<QuestionRegion> {
        self.close_question();
        self.finished
    }
}

/// Segment one page of the test document.
pub fn segment_question_page(page: usize, words: Vec<Word>) -> Vec<QuestionRegion> {
    let mut acc = QuestionAccumulator::new(page);
    for line in group_words_into_lines(words) {
        acc.push_line(&line);
    }
    acc.finish()
}

/// Run question segmentation over every page, then drop any choice that is
/// not `A`-`D`.
pub fn extract_question_regions<I>(pages: I) -> Vec<QuestionRegion>
where
    I: IntoIterator<Item = PageWords>,
{
    let mut questions: Vec<QuestionRegion> = pages
        .into_iter()
        .flat_map(|(page, words)| segment_question_page(page, words))
        .collect();

    for question in &mut questions {
        retain_standard_choices(&mut question.choices);
    }
    questions
}

/// Keep only choices lettered `A`-`D`, preserving their order.
pub fn retain_standard_choices(choices: &mut Vec<ChoiceRegion>) {
    choices.retain(|c| c.letter.is_standard());
}

// ---------------------------------------------------------------------------
// Solution mode
// ---------------------------------------------------------------------------

/// Per-page state machine for the solution document. Only numbered markers
/// open regions; everything else, lettered lines included, is content.
#[derive(Debug)]
pub struct SolutionAccumulator {
    page: usize,
    current: Option<SolutionRegion>,
    finished: Vec<SolutionRegion>,
}

impl SolutionAccumulator {
    pub fn new(page: usize) -> Self {
        SolutionAccumulator {
            page,
            current: None,
            finished: Vec::new(),
        }
    }

    pub fn push_line(&mut self, line: &Line) {
        let text = line.text();
        let extent = line.bbox();

        if let Some(number) = question_number(&text) {
            self.close();
            debug!("page {}: solution {} opens", self.page, number);
            self.current = Some(SolutionRegion {
                number,
                page: self.page,
                bbox: extent,
                content_lines: vec![text],
            });
        } else if let Some(solution) = self.current.as_mut() {
            solution.bbox.extend(&extent);
            solution.content_lines.push(text);
        }
    }

    fn close(&mut self) {
        if let Some(solution) = self.current.take() {
            self.finished.push(solution);
        }
    }

    pub fn finish(mut self) -> Vec<SolutionRegion> {
        self.close();
        self.finished
    }
}

pub fn segment_solution_page(page: usize, words: Vec<Word>) -> Vec<SolutionRegion> {
    let mut acc = SolutionAccumulator::new(page);
    for line in group_words_into_lines(words) {
        acc.push_line(&line);
    }
    acc.finish()
}

pub fn extract_solution_regions<I>(pages: I) -> Vec<SolutionRegion>
where
    I: IntoIterator<Item = PageWords>,
{
    pages
        .into_iter()
        .flat_map(|(page, words)| segment_solution_page(page, words))
        .collect()
}

/// First solution entry numbered `number`.
pub fn find_solution(solutions: &[SolutionRegion], number: u32) -> Option<&SolutionRegion> {
    solutions.iter().find(|s| s.number == number)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
