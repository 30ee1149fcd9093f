//! Core library for examcrop
//!
//! This crate implements the **Functional Core** of examcrop, following the
//! Functional Core - Imperative Shell pattern used across the workspace.
//!
//! # Architecture Overview
//!
//! - **`examcrop_core`** (this crate): document layout segmentation and output
//!   planning as pure functions over word tokens. Zero I/O.
//! - **`pdf`**: word extraction from PDF content streams, page rasterization
//!   and cropping.
//! - **`examcrop`**: CLI, upload server, pipeline execution and packaging
//!   (the Imperative Shell).
//!
//! # Pipeline
//!
//! ```text
//! Word[] --lines--> Line[] --marker--> Marker --regions--> QuestionRegion[]
//!                                                          SolutionRegion[]
//!                                     --plan--> SlotJob[]  (crop or blank per slot)
//! ```
//!
//! # Module Organization
//!
//! - [`types`]: words, bounding boxes and region records
//! - [`lines`]: clustering words into text lines
//! - [`marker`]: question / choice / continuation classification
//! - [`regions`]: the per-page accumulators and document-level extractors
//! - [`slots`]: the numbered output slot scheme
//! - [`metadata`]: exam metadata inference and filename sanitizing
//! - [`plan`]: joining questions with solutions into an ordered slot plan
//!
//! # Example Usage
//!
//! ```rust
//! use examcrop_core::regions::extract_question_regions;
//! use examcrop_core::types::Word;
//!
//! let words = vec![
//!     Word::new("1.", 72.0, 100.0, 84.0, 112.0),
//!     Word::new("Why?", 90.0, 100.0, 114.0, 112.0),
//!     Word::new("A)", 72.0, 120.0, 84.0, 132.0),
//!     Word::new("Because", 90.0, 120.0, 132.0, 132.0),
//! ];
//!
//! let questions = extract_question_regions(vec![(0, words)]);
//! assert_eq!(questions.len(), 1);
//! assert_eq!(questions[0].choices.len(), 1);
//! ```

pub mod lines;
pub mod marker;
pub mod metadata;
pub mod plan;
pub mod regions;
pub mod slots;
pub mod types;

pub use types::*;
