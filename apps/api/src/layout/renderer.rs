//! Template Renderer: the single entry point from document data to a visual tree.
//!
//! Trees are always materialized from (Document, RenderSettings, PageGeometry).
//! The result is one page wide with an unconstrained natural height; nothing
//! here clips, scales or paginates.

use chrono::NaiveDate;
use tracing::debug;

use crate::layout::geometry::PageGeometry;
use crate::layout::templates::{cover_letter, strategy_for, LayoutContext};
use crate::layout::visual_tree::VisualTree;
use crate::models::document::Document;
use crate::models::settings::RenderSettings;

pub fn render(document: &Document, settings: RenderSettings, geometry: PageGeometry) -> VisualTree {
    let ctx = LayoutContext::new(settings, geometry);
    let strategy = strategy_for(settings.template);
    let tree = strategy.layout(document, &ctx);
    debug!(
        template = strategy.name(),
        blocks = tree.blocks.len(),
        natural_height = tree.height,
        "Rendered document"
    );
    tree
}

pub fn render_cover_letter(
    letter: &str,
    sender: &Document,
    date: NaiveDate,
    settings: RenderSettings,
    geometry: PageGeometry,
) -> VisualTree {
    let ctx = LayoutContext::new(settings, geometry);
    let tree = cover_letter::layout(letter, sender, date, &ctx);
    debug!(
        blocks = tree.blocks.len(),
        natural_height = tree.height,
        "Rendered cover letter"
    );
    tree
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
