//! Line grouping: collapse a page's word list into text lines.
//!
//! Words are clustered on their `top` coordinate rounded to the nearest
//! integer. Lines come out ordered top to bottom; inside a line, words are
//! ordered left to right before their text is joined, so extraction order
//! never decides whether a line starts with a marker.

use std::collections::BTreeMap;

use crate::types::{BoundingBox, Word};

/// Words that share the same rounded `top`.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Clustering key: `round(top)` of every word in the line.
    pub top: i64,
    pub words: Vec<Word>,
}

impl Line {
    /// Space-joined text of the line's words, trimmed.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::of_words(&self.words)
    }
}

fn line_key(top: f32) -> i64 {
    top.round() as i64
}

/// Group a page's words into [`Line`]s ordered by ascending rounded `top`.
///
/// Within a line the sort by `left` is stable, so words with identical
/// `left` keep their extraction order.
pub fn group_words_into_lines(words: Vec<Word>) -> Vec<Line> {
    let mut by_top: BTreeMap<i64, Vec<Word>> = BTreeMap::new();
    for word in words {
        by_top.entry(line_key(word.top)).or_default().push(word);
    }

    by_top
        .into_iter()
        .map(|(top, mut words)| {
            words.sort_by(|a, b| a.left.total_cmp(&b.left));
            Line { top, words }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, left: f32, top: f32) -> Word {
        Word::new(text, left, top, left + 10.0 * text.len() as f32, top + 12.0)
    }

    #[test]
    fn test_empty_input() {
        assert!(group_words_into_lines(vec![]).is_empty());
    }

    #[test]
    fn test_same_rounded_top_forms_one_line() {
        let lines = group_words_into_lines(vec![word("1.", 72.0, 100.2), word("Hi", 90.0, 99.7)]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].top, 100);
        assert_eq!(lines[0].text(), "1. Hi");
    }

    #[test]
    fn test_lines_ordered_top_to_bottom() {
        let lines = group_words_into_lines(vec![
            word("bottom", 72.0, 300.0),
            word("top", 72.0, 100.0),
            word("middle", 72.0, 200.0),
        ]);
        let texts: Vec<String> = lines.iter().map(Line::text).collect();
        assert_eq!(texts, vec!["top", "middle", "bottom"]);
    }

    #[test]
    fn test_words_sorted_left_to_right_before_joining() {
        let lines = group_words_into_lines(vec![
            word("is", 130.0, 50.0),
            word("What", 90.0, 50.0),
            word("1.", 72.0, 50.0),
        ]);
        assert_eq!(lines[0].text(), "1. What is");
    }

    #[test]
    fn test_half_point_apart_rounds_into_separate_lines() {
        // 100.4 rounds to 100, 100.6 rounds to 101.
        let lines = group_words_into_lines(vec![word("a", 0.0, 100.4), word("b", 0.0, 100.6)]);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_line_bbox_covers_all_words() {
        let lines = group_words_into_lines(vec![
            Word::new("A)", 72.0, 100.0, 84.0, 112.0),
            Word::new("3", 90.0, 100.2, 96.0, 113.0),
        ]);
        assert_eq!(lines[0].bbox(), BoundingBox::new(72.0, 100.0, 96.0, 113.0));
    }
}
