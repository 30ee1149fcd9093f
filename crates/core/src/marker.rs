use std::sync::OnceLock;

use regex::Regex;

use crate::slots::MAX_QUESTION_NUMBER;
use crate::types::ChoiceLetter;

/// What a line's leading token says about where it belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `"12."` or `"12)"`: a new question (or solution entry) starts here.
    Question(u32),
    /// `"B."` or `"B)"`: a new answer choice starts here.
    Choice(ChoiceLetter),
    Continuation,
}

fn question_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([0-9]+)[.)]\s*").unwrap())
}

fn choice_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-E])[.)]\s*").unwrap())
}

/// Leading question number of `text`, if the line opens with one.
///
/// Numbers above [`MAX_QUESTION_NUMBER`] are not markers; their slot
/// indices would not fit the six-digit file names.
pub fn question_number(text: &str) -> Option<u32> {
    question_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|&n| n <= MAX_QUESTION_NUMBER)
}

/// Leading choice letter of `text`, if the line opens with one.
pub fn choice_letter(text: &str) -> Option<ChoiceLetter> {
    choice_pattern()
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
        .and_then(|c| ChoiceLetter::try_from(c).ok())
}

/// Classify a line by its leading marker. Question markers win over choice
/// markers.
pub fn classify(text: &str) -> Marker {
    if let Some(n) = question_number(text) {
        return Marker::Question(n);
    }
    if let Some(letter) = choice_letter(text) {
        return Marker::Choice(letter);
    }
    Marker::Continuation
}
