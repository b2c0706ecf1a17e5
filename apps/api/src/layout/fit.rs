//! Fit Estimator: decides how a tree of natural height H goes onto fixed pages.
//!
//! Two plans exist:
//!   - scale-to-fit: one page, uniform shrink `available / H`, never below the
//!     readability floor;
//!   - paginated: consecutive source slices in raster units, each at most one
//!     page of content tall, covering `[0, H)` exactly.
//!
//! Raster units are reference pixels multiplied by the raster scale and rounded
//! to whole pixels, so slice arithmetic is exact integer arithmetic.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::layout::geometry::{px_to_mm, PageGeometry};
use crate::layout::visual_tree::VisualTree;
use crate::models::settings::DocumentKind;

/// Share of the page (from the bottom) searched for a block boundary when
/// slicing in block-aware mode.
const BREAK_SEARCH_WINDOW: f32 = 0.25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceMode {
    /// Cut at exact page-content multiples. Lines may be split across pages.
    #[default]
    Fixed,
    /// Move each cut up to the nearest block boundary in the lower quarter of
    /// the page, if there is one.
    BlockAware,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    pub readability_floor: f32,
    /// Safety buffer subtracted from the page height before scaling.
    pub buffer_px: f32,
    /// Raster pixels per reference pixel.
    pub raster_scale: f32,
    pub slice_mode: SliceMode,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            readability_floor: 0.65,
            buffer_px: 20.0,
            raster_scale: 2.0,
            slice_mode: SliceMode::Fixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    ScaleToFit,
    Paginated,
}

impl PlanKind {
    /// Résumés are squeezed onto one page; cover letters flow across pages.
    pub fn for_document(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Resume => PlanKind::ScaleToFit,
            DocumentKind::CoverLetter => PlanKind::Paginated,
        }
    }
}

/// One source rectangle, full content width, in raster units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub source_y_start: u32,
    pub source_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportPlan {
    SinglePageScaled {
        scale_factor: f32,
        natural_height: f32,
        below_floor: bool,
    },
    Paginated {
        /// Content width W in raster units.
        raster_width: u32,
        /// Content height H in raster units.
        raster_height: u32,
        /// Slice step: one page of content in raster units.
        page_content_height: u32,
        slices: Vec<Slice>,
    },
}

impl ExportPlan {
    pub fn page_count(&self) -> usize {
        match self {
            ExportPlan::SinglePageScaled { .. } => 1,
            ExportPlan::Paginated { slices, .. } => slices.len(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Estimation
// ────────────────────────────────────────────────────────────────────────────

pub fn estimate(tree: &VisualTree, geometry: PageGeometry, kind: PlanKind, config: &FitConfig) -> ExportPlan {
    let plan = match kind {
        PlanKind::ScaleToFit => scale_to_fit(tree.height, geometry, config),
        PlanKind::Paginated => paginate(tree, geometry, config),
    };
    debug!(?kind, pages = plan.page_count(), "Estimated export plan");
    plan
}

/// Uniform shrink so a tree of `natural_height` fits one page.
pub fn scale_to_fit(natural_height: f32, geometry: PageGeometry, config: &FitConfig) -> ExportPlan {
    let available = (geometry.height_px() - config.buffer_px).max(1.0);
    let raw = if natural_height <= available {
        1.0
    } else {
        available / natural_height
    };
    let below_floor = raw < config.readability_floor;
    if below_floor {
        warn!(
            natural_height,
            available,
            raw_scale = raw,
            floor = config.readability_floor,
            "Content exceeds the readability floor; export will overflow the page"
        );
    }
    ExportPlan::SinglePageScaled {
        scale_factor: raw.clamp(config.readability_floor, 1.0),
        natural_height,
        below_floor,
    }
}

/// Slices the tree's content box into page-sized source rectangles.
pub fn paginate(tree: &VisualTree, geometry: PageGeometry, config: &FitConfig) -> ExportPlan {
    let raster_width = (tree.content_width() * config.raster_scale).round() as u32;
    let raster_height = (tree.content_height() * config.raster_scale).ceil() as u32;
    let page_content_height = page_content_height(tree, geometry, raster_width);

    let breaks: Vec<u32> = match config.slice_mode {
        SliceMode::Fixed => Vec::new(),
        SliceMode::BlockAware => tree
            .safe_break_points()
            .into_iter()
            .map(|p| (p * config.raster_scale).round() as u32)
            .collect(),
    };
    let slices = slice_range(raster_height, page_content_height, &breaks);

    ExportPlan::Paginated {
        raster_width,
        raster_height,
        page_content_height,
        slices,
    }
}

/// `(page_height_mm - 2·margin_mm) · (W / content_width_mm)`, floored, never 0.
fn page_content_height(tree: &VisualTree, geometry: PageGeometry, raster_width: u32) -> u32 {
    let margin_mm = px_to_mm(tree.margin);
    let content_width_mm = px_to_mm(tree.content_width());
    if content_width_mm <= 0.0 {
        return 1;
    }
    let page_content_mm = (geometry.height_mm - 2.0 * margin_mm).max(0.0);
    ((page_content_mm * raster_width as f32 / content_width_mm).floor() as u32).max(1)
}

/// Walks `0..height` in steps of at most `step`. With sorted `breaks`, a cut is
/// pulled up to the last break inside the lower window of the page.
pub fn slice_range(height: u32, step: u32, breaks: &[u32]) -> Vec<Slice> {
    let step = step.max(1);
    let window = (step as f32 * BREAK_SEARCH_WINDOW) as u32;
    let mut slices = Vec::new();
    let mut y = 0u32;
    while y < height {
        let full_cut = y + step;
        let cut = if full_cut >= height {
            height
        } else {
            breaks
                .iter()
                .copied()
                .filter(|&b| b > y && b <= full_cut && b >= full_cut - window)
                .max()
                .unwrap_or(full_cut)
        };
        slices.push(Slice {
            source_y_start: y,
            source_height: cut - y,
        });
        y = cut;
    }
    slices
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::renderer::render_cover_letter;
    use crate::layout::renderer::tests::{long_document, sample_document};
    use crate::layout::renderer::render;
    use crate::models::settings::RenderSettings;
    use chrono::NaiveDate;

    fn assert_covers(slices: &[Slice], height: u32, step: u32) {
        let mut expected_start = 0;
        for slice in slices {
            assert_eq!(slice.source_y_start, expected_start, "gap or overlap");
            assert!(slice.source_height > 0);
            assert!(slice.source_height <= step);
            expected_start += slice.source_height;
        }
        assert_eq!(expected_start, height);
    }

    #[test]
    fn test_fixed_slices_cover_height_exactly() {
        for height in [1, 99, 100, 101, 2_245, 10_000, 31_337] {
            for step in [1, 7, 100, 2_245] {
                let slices = slice_range(height, step, &[]);
                assert_covers(&slices, height, step);
                assert_eq!(slices.len() as u32, height.div_ceil(step));
            }
        }
    }

    #[test]
    fn test_zero_height_has_no_slices() {
        assert!(slice_range(0, 100, &[]).is_empty());
    }

    #[test]
    fn test_block_aware_slices_cover_height_exactly() {
        let breaks: Vec<u32> = (1..200).map(|i| i * 37).collect();
        for height in [1, 500, 999, 5_000] {
            let slices = slice_range(height, 400, &breaks);
            assert_covers(&slices, height, 400);
        }
    }

    #[test]
    fn test_block_aware_moves_cut_to_break_in_window() {
        let slices = slice_range(1_000, 400, &[100, 350, 390]);
        assert_eq!(slices[0].source_height, 390);
        assert_eq!(slices[1].source_y_start, 390);
    }

    #[test]
    fn test_block_aware_ignores_break_outside_window() {
        // 250 is above the lower quarter (300..=400) of the first page.
        let slices = slice_range(1_000, 400, &[250]);
        assert_eq!(slices[0].source_height, 400);
    }

    #[test]
    fn test_short_content_scales_to_one() {
        let plan = scale_to_fit(900.0, PageGeometry::A4, &FitConfig::default());
        assert_eq!(
            plan,
            ExportPlan::SinglePageScaled {
                scale_factor: 1.0,
                natural_height: 900.0,
                below_floor: false
            }
        );
    }

    #[test]
    fn test_tall_content_shrinks_proportionally() {
        let config = FitConfig::default();
        let plan = scale_to_fit(1_323.0, PageGeometry::A4, &config);
        let ExportPlan::SinglePageScaled { scale_factor, below_floor, .. } = plan else {
            panic!("expected single page plan");
        };
        assert!((scale_factor - 1_103.0 / 1_323.0).abs() < 1e-5);
        assert!(!below_floor);
        assert!(1_323.0 * scale_factor <= 1_103.0 + 1e-3);
    }

    #[test]
    fn test_scale_never_below_floor() {
        let config = FitConfig::default();
        for height in [1_200.0, 2_000.0, 5_000.0, 50_000.0] {
            let ExportPlan::SinglePageScaled { scale_factor, below_floor, .. } =
                scale_to_fit(height, PageGeometry::A4, &config)
            else {
                panic!("expected single page plan");
            };
            assert!(scale_factor >= config.readability_floor);
            assert!(scale_factor <= 1.0);
            assert_eq!(below_floor, height * 0.65 > 1_103.0);
        }
    }

    #[test]
    fn test_scenario_single_page_resume() {
        let tree = render(&sample_document(), RenderSettings::default(), PageGeometry::A4);
        assert!(tree.height < 1_103.0);
        let plan = estimate(&tree, PageGeometry::A4, PlanKind::ScaleToFit, &FitConfig::default());
        let ExportPlan::SinglePageScaled { scale_factor, .. } = plan else {
            panic!("expected single page plan");
        };
        assert_eq!(scale_factor, 1.0);
        assert_eq!(plan.page_count(), 1);
    }

    #[test]
    fn test_scenario_long_document_paginates() {
        let tree = render(&long_document(), RenderSettings::default(), PageGeometry::A4);
        let plan = estimate(&tree, PageGeometry::A4, PlanKind::Paginated, &FitConfig::default());
        let ExportPlan::Paginated {
            raster_height,
            page_content_height,
            slices,
            ..
        } = &plan
        else {
            panic!("expected paginated plan");
        };
        // Twelve long entries on A4 at the default scale run just under four pages.
        assert_eq!(slices.len(), 4);
        assert_eq!(plan.page_count(), 4);
        assert_eq!(slices.len() as u32, raster_height.div_ceil(*page_content_height));
        assert_covers(slices, *raster_height, *page_content_height);
    }

    #[test]
    fn test_page_content_height_matches_page_ratio() {
        // Standard margins on A4: 171.9 mm content width, 258.9 mm content height.
        let tree = render(&long_document(), RenderSettings::default(), PageGeometry::A4);
        let plan = paginate(&tree, PageGeometry::A4, &FitConfig::default());
        let ExportPlan::Paginated {
            raster_width,
            page_content_height,
            ..
        } = plan
        else {
            panic!("expected paginated plan");
        };
        let ratio = page_content_height as f32 / raster_width as f32;
        assert!((ratio - 258.9 / 171.9).abs() < 0.01);
    }

    #[test]
    fn test_cover_letter_defaults_to_paginated() {
        assert_eq!(PlanKind::for_document(DocumentKind::CoverLetter), PlanKind::Paginated);
        assert_eq!(PlanKind::for_document(DocumentKind::Resume), PlanKind::ScaleToFit);

        let letter = "A paragraph of the letter body that keeps going. ".repeat(30);
        let letter = vec![letter; 10].join("\n\n");
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let tree = render_cover_letter(
            &letter,
            &sample_document(),
            date,
            RenderSettings::default(),
            PageGeometry::A4,
        );
        let config = FitConfig {
            slice_mode: SliceMode::BlockAware,
            ..FitConfig::default()
        };
        let ExportPlan::Paginated {
            raster_height,
            page_content_height,
            slices,
            ..
        } = paginate(&tree, PageGeometry::A4, &config)
        else {
            panic!("expected paginated plan");
        };
        assert!(slices.len() >= 2);
        assert_covers(&slices, raster_height, page_content_height);
    }
}
