use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single text token and its rectangle on the page.
///
/// Coordinates are in page space with the origin at the top-left corner and
/// `y` growing downward, the same convention every region uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Word {
    pub fn new(text: impl Into<String>, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Word {
            text: text.into(),
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Axis-aligned rectangle `(x0, y0)`-`(x1, y1)` in page coordinates.
///
/// An accumulation starts from [`BoundingBox::EMPTY`], whose infinite
/// sentinels make the first folded word become the box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub const EMPTY: Self = BoundingBox {
        x0: f32::INFINITY,
        y0: f32::INFINITY,
        x1: f32::NEG_INFINITY,
        y1: f32::NEG_INFINITY,
    };

    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        BoundingBox { x0, y0, x1, y1 }
    }

    /// Tightest box around every word in `words`. Empty input yields
    /// [`BoundingBox::EMPTY`].
    pub fn of_words<'a>(words: impl IntoIterator<Item = &'a Word>) -> Self {
        words.into_iter().fold(Self::EMPTY, |mut acc, w| {
            acc.include_word(w);
            acc
        })
    }

    pub fn include_word(&mut self, word: &Word) {
        self.x0 = self.x0.min(word.left);
        self.y0 = self.y0.min(word.top);
        self.x1 = self.x1.max(word.right);
        self.y1 = self.y1.max(word.bottom);
    }

    /// Grow `self` to also cover `other`.
    pub fn extend(&mut self, other: &BoundingBox) {
        self.x0 = self.x0.min(other.x0);
        self.y0 = self.y0.min(other.y0);
        self.x1 = self.x1.max(other.x1);
        self.y1 = self.y1.max(other.y1);
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    /// `true` when the box encloses a strictly positive area.
    pub fn has_area(&self) -> bool {
        self.is_finite() && self.x1 > self.x0 && self.y1 > self.y0
    }

    pub fn scale(&self, factor: f32) -> BoundingBox {
        BoundingBox {
            x0: self.x0 * factor,
            y0: self.y0 * factor,
            x1: self.x1 * factor,
            y1: self.y1 * factor,
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Answer choice letter recognised at the start of a line.
///
/// `E` is recognised so that "E) None of the above" does not get folded into
/// choice `D`, but only `A`-`D` survive into the final output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChoiceLetter {
    A,
    B,
    C,
    D,
    E,
}

impl ChoiceLetter {
    /// The letters that get an output slot, in slot order.
    pub const STANDARD: [ChoiceLetter; 4] = [
        ChoiceLetter::A,
        ChoiceLetter::B,
        ChoiceLetter::C,
        ChoiceLetter::D,
    ];

    pub fn is_standard(&self) -> bool {
        !matches!(self, ChoiceLetter::E)
    }

    pub fn as_char(&self) -> char {
        match self {
            ChoiceLetter::A => 'A',
            ChoiceLetter::B => 'B',
            ChoiceLetter::C => 'C',
            ChoiceLetter::D => 'D',
            ChoiceLetter::E => 'E',
        }
    }
}

impl TryFrom<char> for ChoiceLetter {
    type Error = InvalidChoiceLetter;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'A' => Ok(ChoiceLetter::A),
            'B' => Ok(ChoiceLetter::B),
            'C' => Ok(ChoiceLetter::C),
            'D' => Ok(ChoiceLetter::D),
            'E' => Ok(ChoiceLetter::E),
            other => Err(InvalidChoiceLetter(other)),
        }
    }
}

impl fmt::Display for ChoiceLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Choice letter must be one of A-E, got '{0}'")]
pub struct InvalidChoiceLetter(pub char);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceRegion {
    pub letter: ChoiceLetter,
    pub bbox: BoundingBox,
}

/// A numbered question found on one page, with the answer choices that
/// followed it before the next question marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRegion {
    pub number: u32,
    /// 0-based page index.
    pub page: usize,
    pub bbox: BoundingBox,
    pub choices: Vec<ChoiceRegion>,
}

impl QuestionRegion {
    /// First choice carrying `letter`, if one was detected.
    pub fn choice(&self, letter: ChoiceLetter) -> Option<&ChoiceRegion> {
        self.choices.iter().find(|c| c.letter == letter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRegion {
    pub number: u32,
    /// 0-based page index.
    pub page: usize,
    pub bbox: BoundingBox,
    pub content_lines: Vec<String>,
}
