//! Output slot numbering.
//!
//! Every question owns a block of ten numbered image slots so consumers can
//! address any asset by arithmetic from the question's base index:
//!
//! | offset | slot |
//! |--------|------|
//! | 0      | question stem |
//! | 1-4    | choices A-D |
//! | 5      | worked solution |
//! | 6-9    | blank fillers |
//!
//! The base index is `n * 10` for questions 1-9 and `n * 100` from question
//! 10 on. File names are the slot index zero-padded to six digits followed
//! by the archive's base name: `000015_2024_Feb_Reg_Geometry_Indiv.png`.
//! Question numbers above [`MAX_QUESTION_NUMBER`] would need a seventh digit,
//! so the marker classifier never produces them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ChoiceLetter;

pub const SLOTS_PER_QUESTION: u32 = 10;
pub const FILLER_SLOTS: u8 = 4;
const INDEX_WIDTH: usize = 6;

/// Largest question number whose slots still fit in six digits.
pub const MAX_QUESTION_NUMBER: u32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Question,
    Choice(ChoiceLetter),
    Solution,
    /// 0-based filler position, `0..FILLER_SLOTS`.
    Filler(u8),
}

impl Slot {
    pub fn offset(&self) -> u32 {
        match self {
            Slot::Question => 0,
            Slot::Choice(letter) => match letter {
                ChoiceLetter::A => 1,
                ChoiceLetter::B => 2,
                ChoiceLetter::C => 3,
                ChoiceLetter::D => 4,
                // E never gets a slot; it shares D's position if forced.
                ChoiceLetter::E => 4,
            },
            Slot::Solution => 5,
            Slot::Filler(i) => 6 + u32::from(*i),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Question => write!(f, "question"),
            Slot::Choice(letter) => write!(f, "choice {}", letter),
            Slot::Solution => write!(f, "solution"),
            Slot::Filler(i) => write!(f, "filler {}", i + 1),
        }
    }
}

pub fn base_index(question_number: u32) -> u32 {
    if question_number < 10 {
        question_number * 10
    } else {
        question_number * 100
    }
}

/// Callers keep `question_number` at or below [`MAX_QUESTION_NUMBER`].
pub fn slot_index(question_number: u32, slot: Slot) -> u32 {
    base_index(question_number) + slot.offset()
}

pub fn slot_file_name(question_number: u32, slot: Slot, base_name: &str) -> String {
    format!(
        "{:0width$}_{}.png",
        slot_index(question_number, slot),
        base_name,
        width = INDEX_WIDTH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_index_switches_at_ten() {
        assert_eq!(base_index(1), 10);
        assert_eq!(base_index(9), 90);
        assert_eq!(base_index(10), 1000);
        assert_eq!(base_index(25), 2500);
    }

    #[test]
    fn test_slot_offsets() {
        assert_eq!(Slot::Question.offset(), 0);
        assert_eq!(Slot::Choice(ChoiceLetter::A).offset(), 1);
        assert_eq!(Slot::Choice(ChoiceLetter::D).offset(), 4);
        assert_eq!(Slot::Solution.offset(), 5);
        assert_eq!(Slot::Filler(0).offset(), 6);
        assert_eq!(Slot::Filler(FILLER_SLOTS - 1).offset(), SLOTS_PER_QUESTION - 1);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            slot_file_name(1, Slot::Question, "2024_Feb_Reg_Geometry_Indiv"),
            "000010_2024_Feb_Reg_Geometry_Indiv.png"
        );
        assert_eq!(
            slot_file_name(1, Slot::Solution, "x"),
            "000015_x.png"
        );
        assert_eq!(
            slot_file_name(12, Slot::Choice(ChoiceLetter::C), "x"),
            "001203_x.png"
        );
    }

    #[test]
    fn test_largest_question_keeps_six_digits() {
        let name = slot_file_name(MAX_QUESTION_NUMBER, Slot::Filler(FILLER_SLOTS - 1), "x");
        assert_eq!(name, "999909_x.png");
    }

    #[test]
    fn test_no_collisions_across_questions() {
        let mut seen = std::collections::HashSet::new();
        for n in 1..=60 {
            for offset in 0..SLOTS_PER_QUESTION {
                assert!(seen.insert(base_index(n) + offset), "collision at q{n}+{offset}");
            }
        }
    }
}
