//! Static font-metric tables for the two résumé typeface groups.
//!
//! Character widths are in em units (relative to font size). Layout uses these
//! tables, never the loaded font files, so the natural height of a document is a
//! pure function of its content and settings and does not depend on which font
//! bytes happened to load.
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};

/// Bold runs are measured this much wider than regular ones.
const BOLD_WIDTH_FACTOR: f32 = 1.06;

// ────────────────────────────────────────────────────────────────────────────
// Typeface and weight
// ────────────────────────────────────────────────────────────────────────────

/// The typefaces behind the `sans-serif` and `serif` font groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Typeface {
    /// Sans-serif group, humanist sans.
    Lato,
    /// Serif group, wide screen serif.
    Merriweather,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weight {
    Regular,
    Bold,
}

/// Identifies one font file the asset gate must load before rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontKey {
    pub typeface: Typeface,
    pub weight: Weight,
}

impl FontKey {
    /// File stem looked up in the font directory, e.g. `Lato-Bold`.
    pub fn file_stem(&self) -> String {
        let family = match self.typeface {
            Typeface::Lato => "Lato",
            Typeface::Merriweather => "Merriweather",
        };
        let weight = match self.weight {
            Weight::Regular => "Regular",
            Weight::Bold => "Bold",
        };
        format!("{family}-{weight}")
    }
}

impl Typeface {
    /// CSS font stack used by the print document.
    pub fn css_family(self) -> &'static str {
        match self {
            Typeface::Lato => "'Lato', 'Helvetica Neue', Arial, sans-serif",
            Typeface::Merriweather => "'Merriweather', Georgia, 'Times New Roman', serif",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for a typeface.
///
/// `widths[i]` = width of ASCII character `(i + 32)` at 1em.
pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters (codepoints > 0x7E).
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Measures the rendered width of a string in em units.
    ///
    /// Non-ASCII characters fall back to `average_char_width`.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Width of `s` in pixels at `font_px`.
    pub fn width_px(&self, s: &str, font_px: f32, weight: Weight) -> f32 {
        let factor = match weight {
            Weight::Regular => 1.0,
            Weight::Bold => BOLD_WIDTH_FACTOR,
        };
        self.measure_str(s) * font_px * factor
    }

    /// Greedy word-wrap of `text` into lines no wider than `max_width_px`.
    ///
    /// Words wider than a full line are hard-broken by character. Whitespace runs
    /// collapse to one space. Empty input yields no lines.
    pub fn wrap(&self, text: &str, max_width_px: f32, font_px: f32, weight: Weight) -> Vec<String> {
        let space_w = self.space_width * font_px;
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for word in text.split_whitespace() {
            for piece in self.break_long_word(word, max_width_px, font_px, weight) {
                let piece_w = self.width_px(&piece, font_px, weight);
                if current.is_empty() {
                    current_width = piece_w;
                    current = piece;
                } else if current_width + space_w + piece_w > max_width_px {
                    lines.push(std::mem::take(&mut current));
                    current_width = piece_w;
                    current = piece;
                } else {
                    current.push(' ');
                    current.push_str(&piece);
                    current_width += space_w + piece_w;
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    fn break_long_word(
        &self,
        word: &str,
        max_width_px: f32,
        font_px: f32,
        weight: Weight,
    ) -> Vec<String> {
        if self.width_px(word, font_px, weight) <= max_width_px {
            return vec![word.to_string()];
        }
        let mut pieces = Vec::new();
        let mut piece = String::new();
        for ch in word.chars() {
            let mut candidate = piece.clone();
            candidate.push(ch);
            if !piece.is_empty() && self.width_px(&candidate, font_px, weight) > max_width_px {
                pieces.push(std::mem::take(&mut piece));
                piece.push(ch);
            } else {
                piece = candidate;
            }
        }
        if !piece.is_empty() {
            pieces.push(piece);
        }
        pieces
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

static LATO_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.26, 0.32, 0.40, 0.59, 0.59, 0.94, 0.70, 0.23, 0.35, 0.35, 0.41, 0.62, 0.29, 0.35, 0.29, 0.33,
        // 0     1     2     3     4     5     6     7     8     9
        0.59, 0.59, 0.59, 0.59, 0.59, 0.59, 0.59, 0.59, 0.59, 0.59,
        // :     ;     <     =     >     ?     @
        0.29, 0.29, 0.62, 0.62, 0.62, 0.53, 1.07,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.70, 0.64, 0.64, 0.70, 0.59, 0.53, 0.70, 0.70, 0.26, 0.41, 0.64, 0.56, 0.82,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.70, 0.76, 0.59, 0.76, 0.64, 0.53, 0.59, 0.70, 0.70, 0.94, 0.64, 0.64, 0.59,
        // [     \     ]     ^     _     `
        0.29, 0.33, 0.29, 0.49, 0.59, 0.36,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.59, 0.59, 0.53, 0.59, 0.59, 0.33, 0.59, 0.59, 0.23, 0.23, 0.56, 0.23, 0.87,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.59, 0.59, 0.59, 0.59, 0.35, 0.46, 0.41, 0.59, 0.53, 0.76, 0.53, 0.53, 0.46,
        // {     |     }     ~
        0.35, 0.27, 0.35, 0.62,
    ],
    average_char_width: 0.55,
    space_width: 0.26,
};

/// Merriweather runs wide: roughly 110% of a neutral humanist sans.
static MERRIWEATHER_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.28, 0.33, 0.42, 0.62, 0.62, 0.98, 0.74, 0.24, 0.36, 0.36, 0.43, 0.65, 0.31, 0.36, 0.31, 0.34,
        // 0     1     2     3     4     5     6     7     8     9
        0.62, 0.62, 0.62, 0.62, 0.62, 0.62, 0.62, 0.62, 0.62, 0.62,
        // :     ;     <     =     >     ?     @
        0.31, 0.31, 0.65, 0.65, 0.65, 0.55, 1.12,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.74, 0.67, 0.67, 0.74, 0.62, 0.55, 0.74, 0.74, 0.28, 0.43, 0.67, 0.58, 0.86,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.74, 0.79, 0.62, 0.79, 0.67, 0.55, 0.62, 0.74, 0.74, 0.98, 0.67, 0.67, 0.62,
        // [     \     ]     ^     _     `
        0.31, 0.34, 0.31, 0.52, 0.62, 0.37,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.62, 0.62, 0.55, 0.62, 0.62, 0.34, 0.62, 0.62, 0.24, 0.24, 0.58, 0.24, 0.91,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.62, 0.62, 0.62, 0.62, 0.36, 0.48, 0.43, 0.62, 0.55, 0.79, 0.55, 0.55, 0.48,
        // {     |     }     ~
        0.36, 0.29, 0.36, 0.65,
    ],
    average_char_width: 0.57,
    space_width: 0.28,
};

/// Returns the static metric table for a typeface.
pub fn get_metrics(typeface: Typeface) -> &'static FontMetricTable {
    match typeface {
        Typeface::Lato => &LATO_TABLE,
        Typeface::Merriweather => &MERRIWEATHER_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
