//! Exam metadata used to name the output archive and its images.
//!
//! Values supplied by the caller always win. Anything missing is inferred
//! from the opening pages' text, and every field is reduced to
//! filename-safe characters.

use serde::{Deserialize, Serialize};

const MONTHS: [(&str, &str); 12] = [
    ("January", "Jan"),
    ("February", "Feb"),
    ("March", "Mar"),
    ("April", "Apr"),
    ("May", "May"),
    ("June", "Jun"),
    ("July", "Jul"),
    ("August", "Aug"),
    ("September", "Sep"),
    ("October", "Oct"),
    ("November", "Nov"),
    ("December", "Dec"),
];

const LEVELS: [&str; 6] = [
    "Algebra 1",
    "Geometry",
    "Algebra 2",
    "Precalculus",
    "Calculus",
    "Statistics",
];

pub const UNKNOWN_YEAR: &str = "UnknownYear";
pub const UNKNOWN_MONTH: &str = "UnknownMonth";
pub const UNKNOWN_LEVEL: &str = "UnknownLevel";
pub const DEFAULT_TYPE: &str = "Inv";
pub const DEFAULT_DIVISION: &str = "Indiv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub year: String,
    pub month: String,
    pub exam_type: String,
    pub level: String,
    pub division: String,
}

/// Caller-supplied metadata. `None` or blank fields get inferred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOverrides {
    pub year: Option<String>,
    pub month: Option<String>,
    pub exam_type: Option<String>,
    pub level: Option<String>,
    pub division: Option<String>,
}

impl Metadata {
    /// Guess every field from free text (typically the first pages of both
    /// documents).
    pub fn infer(text: &str) -> Self {
        Metadata {
            year: infer_year(text),
            month: infer_month(text),
            exam_type: infer_exam_type(text),
            level: infer_level(text),
            division: infer_division(text),
        }
    }

    /// Merge caller overrides over values inferred from `text`, then
    /// sanitize.
    pub fn resolve(overrides: &MetadataOverrides, text: &str) -> Self {
        let inferred = Metadata::infer(text);
        let pick = |given: &Option<String>, fallback: String| {
            given
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(fallback)
        };

        Metadata {
            year: pick(&overrides.year, inferred.year),
            month: pick(&overrides.month, inferred.month),
            exam_type: pick(&overrides.exam_type, inferred.exam_type),
            level: pick(&overrides.level, inferred.level),
            division: pick(&overrides.division, inferred.division),
        }
        .sanitized()
    }

    pub fn sanitized(&self) -> Self {
        Metadata {
            year: sanitize_field(&self.year, UNKNOWN_YEAR),
            month: sanitize_field(&self.month, UNKNOWN_MONTH),
            exam_type: sanitize_field(&self.exam_type, DEFAULT_TYPE),
            level: sanitize_field(&self.level, UNKNOWN_LEVEL),
            division: sanitize_field(&self.division, DEFAULT_DIVISION),
        }
    }

    /// `{year}_{month}_{type}_{level}_{division}`.
    pub fn base_name(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.year, self.month, self.exam_type, self.level, self.division
        )
    }
}

/// Keep ASCII alphanumerics, `-` and `_`. An empty result becomes
/// `fallback`.
pub fn sanitize_field(value: &str, fallback: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

fn infer_year(text: &str) -> String {
    let four_digit = |w: &&str| w.len() == 4 && w.chars().all(|c| c.is_ascii_digit());
    let words: Vec<&str> = text.split_whitespace().collect();

    words
        .iter()
        .copied()
        .filter(four_digit)
        .find(|w| w.starts_with("20"))
        .or_else(|| words.iter().copied().find(four_digit))
        .map(|w| w.to_string())
        .unwrap_or_else(|| UNKNOWN_YEAR.to_string())
}

fn infer_month(text: &str) -> String {
    MONTHS
        .iter()
        .find(|(full, short)| text.contains(full) || text.contains(short))
        .map(|(_, short)| short.to_string())
        .unwrap_or_else(|| UNKNOWN_MONTH.to_string())
}

fn infer_exam_type(text: &str) -> String {
    if text.contains("Regional") {
        "Reg".to_string()
    } else {
        DEFAULT_TYPE.to_string()
    }
}

fn infer_level(text: &str) -> String {
    LEVELS
        .iter()
        .find(|lvl| text.contains(*lvl))
        .map(|lvl| lvl.replace(' ', ""))
        .unwrap_or_else(|| UNKNOWN_LEVEL.to_string())
}

fn infer_division(text: &str) -> String {
    if text.contains("Individual") {
        "Indiv".to_string()
    } else if text.contains("Team") {
        "Team".to_string()
    } else {
        DEFAULT_DIVISION.to_string()
    }
}
