//! Page geometry: the physical page every scale and slice computation is anchored to.
//!
//! Pixels are CSS reference pixels (96 per inch). A4 is 210 × 297 mm, which is
//! 794 × 1123 px nominal. The geometry is a configuration value injected into the
//! renderer, the fit estimator and the export strategies; it is never inferred
//! from a viewport.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const REFERENCE_DPI: f32 = 96.0;
pub const MM_PER_INCH: f32 = 25.4;
pub const PT_PER_INCH: f32 = 72.0;

pub fn mm_to_px(mm: f32) -> f32 {
    mm / MM_PER_INCH * REFERENCE_DPI
}

pub fn px_to_mm(px: f32) -> f32 {
    px / REFERENCE_DPI * MM_PER_INCH
}

pub fn mm_to_pt(mm: f32) -> f32 {
    mm / MM_PER_INCH * PT_PER_INCH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    A4,
    Letter,
}

impl FromStr for PaperSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PaperSize::A4),
            "letter" | "us-letter" => Ok(PaperSize::Letter),
            other => Err(format!("unknown paper size '{other}' (expected a4 or letter)")),
        }
    }
}

/// Immutable physical page description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub paper: PaperSize,
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PageGeometry {
    pub const A4: PageGeometry = PageGeometry {
        paper: PaperSize::A4,
        width_mm: 210.0,
        height_mm: 297.0,
    };

    pub const LETTER: PageGeometry = PageGeometry {
        paper: PaperSize::Letter,
        width_mm: 215.9,
        height_mm: 279.4,
    };

    pub fn for_paper(paper: PaperSize) -> Self {
        match paper {
            PaperSize::A4 => Self::A4,
            PaperSize::Letter => Self::LETTER,
        }
    }

    /// Nominal page width in reference pixels (794 for A4).
    pub fn width_px(&self) -> f32 {
        mm_to_px(self.width_mm).round()
    }

    /// Nominal page height in reference pixels (1123 for A4).
    pub fn height_px(&self) -> f32 {
        mm_to_px(self.height_mm).round()
    }

    pub fn width_pt(&self) -> f32 {
        mm_to_pt(self.width_mm)
    }

    pub fn height_pt(&self) -> f32 {
        mm_to_pt(self.height_mm)
    }

    /// CSS `@page size` keyword.
    pub fn css_size(&self) -> &'static str {
        match self.paper {
            PaperSize::A4 => "A4",
            PaperSize::Letter => "letter",
        }
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_nominal_pixels() {
        assert_eq!(PageGeometry::A4.width_px(), 794.0);
        assert_eq!(PageGeometry::A4.height_px(), 1123.0);
    }

    #[test]
    fn test_letter_nominal_pixels() {
        assert_eq!(PageGeometry::LETTER.width_px(), 816.0);
        assert_eq!(PageGeometry::LETTER.height_px(), 1056.0);
    }

    #[test]
    fn test_mm_px_round_trip_is_stable() {
        let px = mm_to_px(19.05);
        assert!((px - 72.0).abs() < 1e-3);
        assert!((px_to_mm(px) - 19.05).abs() < 1e-3);
    }

    #[test]
    fn test_paper_size_parse() {
        assert_eq!("A4".parse::<PaperSize>(), Ok(PaperSize::A4));
        assert_eq!(" letter ".parse::<PaperSize>(), Ok(PaperSize::Letter));
        assert!("legal".parse::<PaperSize>().is_err());
    }

    #[test]
    fn test_a4_points() {
        assert!((PageGeometry::A4.width_pt() - 595.28).abs() < 0.01);
        assert!((PageGeometry::A4.height_pt() - 841.89).abs() < 0.01);
    }
}
