//! Word extraction from page content streams.
//!
//! Walks a page's content operators with a simplified text-rendering state
//! machine and emits [`Word`]s: whitespace-delimited tokens with a
//! rectangle in top-left-origin page coordinates (the MediaBox top edge is
//! `y = 0`, `y` grows downward).
//!
//! Glyph metrics are not available here, so every glyph is assumed to be
//! [`APPROX_CHAR_WIDTH_RATIO`] of the font size wide. Boxes are therefore
//! approximate horizontally, which is fine for cropping whole lines.
//!
//! ```text
//! content ops -> glyph positions -> WordSink -> Word[]
//! ```

use examcrop_core::Word;
use unicode_normalization::UnicodeNormalization;

use super::backend::{
    decode_text_simple, get_number_from_value, PageBounds, PageId, PdfBackend,
    PdfValue,
};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Approximate glyph width as a fraction of font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Portion of the font size drawn above the baseline.
const ASCENT_RATIO: f32 = 0.8;

/// Portion of the font size drawn below the baseline.
const DESCENT_RATIO: f32 = 0.2;

/// A horizontal gap wider than this fraction of the font size splits a word,
/// whether it comes from a `TJ` kerning adjustment or from two separate
/// show operators.
const WORD_GAP_RATIO: f32 = 0.15;

/// Glyphs whose baselines differ by more than this fraction of the font size
/// never join the same word.
const BASELINE_TOLERANCE_RATIO: f32 = 0.2;

/// The identity 2x3 matrix: [a, b, c, d, e, f].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m1 x m2` for PDF 2x3 affine matrices.
fn multiply(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn apply(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn six_numbers(operands: &[PdfValue]) -> Option<[f32; 6]> {
    let vals: Vec<f32> = operands.iter().take(6).filter_map(get_number_from_value).collect();
    (vals.len() == 6).then(|| [vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]])
}

// ---------------------------------------------------------------------------
// Text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    /// Current transformation matrix (`cm`), saved and restored by `q`/`Q`.
    ctm: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            ctm: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Text-space to user-space transform: text matrix then CTM.
    fn rendering_matrix(&self) -> [f32; 6] {
        multiply(&self.text_matrix, &self.ctm)
    }

    /// User-space point `dx` text-space units along the current baseline.
    fn point_at(&self, dx: f32) -> (f32, f32) {
        apply(&self.rendering_matrix(), dx, self.text_rise)
    }

    /// Rendered font size, scaled by the vertical axis of the rendering
    /// matrix.
    fn effective_font_size(&self) -> f32 {
        let m = self.rendering_matrix();
        (self.font_size * (m[2].powi(2) + m[3].powi(2)).sqrt()).abs()
    }

    fn glyph_width(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }
}

// ---------------------------------------------------------------------------
// Word assembly
// ---------------------------------------------------------------------------

/// A word being built, still in user space (`y` up).
#[derive(Debug, Clone)]
struct PendingWord {
    text: String,
    left: f32,
    right: f32,
    baseline: f32,
    size: f32,
}

/// Collects glyphs into words and flips them into top-left page space.
struct WordSink {
    bounds: PageBounds,
    pending: Option<PendingWord>,
    words: Vec<Word>,
}

impl WordSink {
    fn new(bounds: PageBounds) -> Self {
        WordSink {
            bounds,
            pending: None,
            words: Vec::new(),
        }
    }

    /// Add one visible glyph spanning `x0..x1` on `baseline`.
    fn push_glyph(&mut self, ch: char, x0: f32, x1: f32, baseline: f32, size: f32) {
        let (left, right) = (x0.min(x1), x0.max(x1));

        if let Some(word) = self.pending.as_mut() {
            let same_baseline = (word.baseline - baseline).abs() <= size * BASELINE_TOLERANCE_RATIO;
            let gap = left - word.right;
            if same_baseline && gap <= size * WORD_GAP_RATIO && gap > -size {
                word.text.push(ch);
                word.right = word.right.max(right);
                word.left = word.left.min(left);
                word.size = word.size.max(size);
                return;
            }
        }

        self.break_word();
        self.pending = Some(PendingWord {
            text: ch.to_string(),
            left,
            right,
            baseline,
            size,
        });
    }

    fn break_word(&mut self) {
        let Some(word) = self.pending.take() else {
            return;
        };
        let top = word.baseline + word.size * ASCENT_RATIO;
        let bottom = word.baseline - word.size * DESCENT_RATIO;
        self.words.push(Word {
            text: word.text,
            left: word.left - self.bounds.llx,
            top: self.bounds.ury - top,
            right: word.right - self.bounds.llx,
            bottom: self.bounds.ury - bottom,
        });
    }

    fn finish(mut self) -> Vec<Word> {
        self.break_word();
        self.words
    }
}

// ---------------------------------------------------------------------------
// Operator handling
// ---------------------------------------------------------------------------

struct PageWalker<'a> {
    backend: &'a dyn PdfBackend,
    page_id: PageId,
    state: TextState,
    saved: Vec<[f32; 6]>,
    sink: WordSink,
}

impl<'a> PageWalker<'a> {
    fn decode(&self, val: &PdfValue) -> String {
        let PdfValue::Str(bytes) = val else {
            return String::new();
        };
        let decoded = self.backend.decode_text(self.page_id, &self.state.font_key, bytes);
        let decoded = if decoded.is_empty() {
            decode_text_simple(bytes)
        } else {
            decoded
        };
        // Fold full-width digits/letters and compatibility forms so markers
        // like "１．" still classify.
        decoded.nfkc().collect()
    }

    /// Render `text` glyph by glyph at the current position.
    fn show_text(&mut self, text: &str) {
        for ch in text.chars() {
            let glyph_w = self.state.glyph_width();
            if ch.is_whitespace() {
                self.sink.break_word();
            } else if !ch.is_control() {
                let (x0, baseline) = self.state.point_at(0.0);
                let (x1, _) = self.state.point_at(glyph_w);
                let size = self.state.effective_font_size();
                self.sink.push_glyph(ch, x0, x1, baseline, size);
            }

            let mut dx = glyph_w + self.state.char_spacing;
            if ch == ' ' {
                dx += self.state.word_spacing;
            }
            self.state.advance_x(dx);
        }
    }

    fn show_operand(&mut self, operand: &PdfValue) {
        let text = self.decode(operand);
        self.show_text(&text);
    }

    /// `TJ`: strings interleaved with kerning adjustments in thousandths of
    /// a text-space unit.
    fn show_array(&mut self, arr: &[PdfValue]) {
        for elem in arr {
            match elem {
                PdfValue::Str(_) => self.show_operand(elem),
                val => {
                    let Some(adj) = get_number_from_value(val) else {
                        continue;
                    };
                    let dx = -adj / 1000.0 * self.state.font_size * self.state.horiz_scale;
                    if dx > self.state.font_size * WORD_GAP_RATIO {
                        self.sink.break_word();
                    }
                    self.state.advance_x(dx);
                }
            }
        }
    }

    fn set_font(&mut self, operands: &[PdfValue]) {
        if operands.len() < 2 {
            return;
        }
        let key = match &operands[0] {
            PdfValue::Name(n) | PdfValue::Str(n) => n.clone(),
            _ => return,
        };
        self.state.font_key = key;
        self.state.font_size = get_number_from_value(&operands[1]).unwrap_or(0.0);
    }

    fn number(operands: &[PdfValue], i: usize) -> Option<f32> {
        operands.get(i).and_then(get_number_from_value)
    }

    fn apply_op(&mut self, operator: &str, operands: &[PdfValue]) {
        match operator {
            // -- Graphics state -------------------------------------------
            "q" => self.saved.push(self.state.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.state.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = six_numbers(operands) {
                    self.state.ctm = multiply(&m, &self.state.ctm);
                }
            }

            // -- Text objects ---------------------------------------------
            "BT" => {
                self.state.text_matrix = IDENTITY_MATRIX;
                self.state.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {}
            "Tf" => self.set_font(operands),
            "Tm" => {
                if let Some(m) = six_numbers(operands) {
                    self.state.text_matrix = m;
                    self.state.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (Self::number(operands, 0), Self::number(operands, 1)) {
                    self.state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (Self::number(operands, 0), Self::number(operands, 1)) {
                    self.state.leading = -ty;
                    self.state.translate_line(tx, ty);
                }
            }
            "T*" => self.state.next_line(),
            "TL" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = Self::number(operands, 0) {
                    self.state.text_rise = v;
                }
            }

            // -- Show text ------------------------------------------------
            "Tj" => {
                if let Some(first) = operands.first() {
                    self.show_operand(first);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = operands.first() {
                    self.show_array(arr);
                }
            }
            "'" => {
                self.state.next_line();
                self.sink.break_word();
                if let Some(first) = operands.first() {
                    self.show_operand(first);
                }
            }
            "\"" => {
                if operands.len() >= 3 {
                    if let Some(aw) = Self::number(operands, 0) {
                        self.state.word_spacing = aw;
                    }
                    if let Some(ac) = Self::number(operands, 1) {
                        self.state.char_spacing = ac;
                    }
                    self.state.next_line();
                    self.sink.break_word();
                    self.show_operand(&operands[2]);
                }
            }

            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extract the words of one page, in content-stream order.
///
/// Handles the text operators `BT ET Tf Tm Td TD T* TL Tc Tw Tz Ts Tj TJ ' "`
/// and the graphics-state operators `q Q cm`. Everything else is ignored.
pub fn extract_page_words(backend: &dyn PdfBackend, page_id: PageId) -> Result<Vec<Word>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let bounds = backend.page_bounds(page_id)?;

    let mut walker = PageWalker {
        backend,
        page_id,
        state: TextState::default(),
        saved: Vec::new(),
        sink: WordSink::new(bounds),
    };

    for op in &ops {
        walker.apply_op(&op.operator, &op.operands);
    }

    Ok(walker.sink.finish())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
