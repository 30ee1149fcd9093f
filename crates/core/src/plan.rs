//! Assembly plan: which image goes into which numbered slot.
//!
//! The plan is pure data. The shell walks it, asks the cropper for every
//! [`SlotTarget::Crop`], and writes a blank placeholder for everything else.

use std::collections::HashSet;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::regions::find_solution;
use crate::slots::{slot_file_name, slot_index, Slot, FILLER_SLOTS, MAX_QUESTION_NUMBER};
use crate::types::{BoundingBox, ChoiceLetter, QuestionRegion, SolutionRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Test,
    Solution,
}

/// Why a slot holds a blank placeholder instead of a crop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlankReason {
    MissingChoice(ChoiceLetter),
    MissingSolution,
    Filler,
    /// The region's box was non-finite or had no area once clamped to the
    /// rendered page.
    InvalidBox,
    RenderFailed(String),
}

impl fmt::Display for BlankReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlankReason::MissingChoice(letter) => write!(f, "choice {} not detected", letter),
            BlankReason::MissingSolution => write!(f, "no matching solution"),
            BlankReason::Filler => write!(f, "filler"),
            BlankReason::InvalidBox => write!(f, "invalid bounding box"),
            BlankReason::RenderFailed(msg) => write!(f, "render failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlotTarget {
    Crop {
        document: DocumentKind,
        page: usize,
        bbox: BoundingBox,
    },
    Blank(BlankReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotJob {
    pub question: u32,
    pub slot: Slot,
    pub index: u32,
    pub file_name: String,
    pub target: SlotTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Emit the trailing blank filler slots (offsets 6-9).
    pub fillers: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions { fillers: true }
    }
}

/// Lay out every slot for every question, in question order.
///
/// Each question yields its stem, exactly four choice slots, one solution
/// slot and, when enabled, the filler run. Unmatched choices and solutions
/// become blanks; they never fail the plan.
///
/// A question number seen earlier in the document would reuse the earlier
/// question's file names, so only the first occurrence is planned. Every
/// file name in the result is unique.
pub fn plan_slots(
    questions: &[QuestionRegion],
    solutions: &[SolutionRegion],
    base_name: &str,
    options: PlanOptions,
) -> Vec<SlotJob> {
    let mut jobs = Vec::new();
    let mut planned = HashSet::new();

    for question in questions {
        let n = question.number;
        if n > MAX_QUESTION_NUMBER {
            warn!("question {} on page {} is past the slot range; skipped", n, question.page + 1);
            continue;
        }
        if !planned.insert(n) {
            warn!(
                "question {} repeats on page {}; keeping the first occurrence",
                n,
                question.page + 1
            );
            continue;
        }
        let job = |slot: Slot, target: SlotTarget| SlotJob {
            question: n,
            slot,
            index: slot_index(n, slot),
            file_name: slot_file_name(n, slot, base_name),
            target,
        };

        jobs.push(job(
            Slot::Question,
            SlotTarget::Crop {
                document: DocumentKind::Test,
                page: question.page,
                bbox: question.bbox,
            },
        ));

        for letter in ChoiceLetter::STANDARD {
            let target = match question.choice(letter) {
                Some(choice) => SlotTarget::Crop {
                    document: DocumentKind::Test,
                    page: question.page,
                    bbox: choice.bbox,
                },
                None => SlotTarget::Blank(BlankReason::MissingChoice(letter)),
            };
            jobs.push(job(Slot::Choice(letter), target));
        }

        let solution_target = match find_solution(solutions, n) {
            Some(solution) => SlotTarget::Crop {
                document: DocumentKind::Solution,
                page: solution.page,
                bbox: solution.bbox,
            },
            None => SlotTarget::Blank(BlankReason::MissingSolution),
        };
        jobs.push(job(Slot::Solution, solution_target));

        if options.fillers {
            for i in 0..FILLER_SLOTS {
                jobs.push(job(Slot::Filler(i), SlotTarget::Blank(BlankReason::Filler)));
            }
        }
    }

    jobs
}
