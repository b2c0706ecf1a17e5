//! Template layouts. Each variant is a `LayoutStrategy` that turns a Document
//! into a `VisualTree` one page wide and as tall as its content needs.
//!
//! Layout is pure: no clock, no I/O, no randomness. Text is measured against the
//! static metric tables so two renders of the same input are identical.

pub mod classic;
pub mod cover_letter;
pub mod modern_alt;
pub mod modern_compact;

use crate::layout::font_metrics::{get_metrics, FontMetricTable, Typeface, Weight};
use crate::layout::geometry::{mm_to_px, PageGeometry, PT_PER_INCH, REFERENCE_DPI};
use crate::layout::visual_tree::{Block, Color, Node, TextRun, VisualTree};
use crate::models::document::Document;
use crate::models::settings::{RenderSettings, TemplateName};

/// 10pt body text in reference pixels.
pub const BASE_FONT_PX: f32 = 10.0 * REFERENCE_DPI / PT_PER_INCH;

const BULLET: &str = "•";

pub trait LayoutStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn layout(&self, document: &Document, ctx: &LayoutContext) -> VisualTree;
}

pub fn strategy_for(template: TemplateName) -> &'static dyn LayoutStrategy {
    match template {
        TemplateName::Classic => &classic::Classic,
        TemplateName::ModernCompact => &modern_compact::ModernCompact,
        TemplateName::ModernAlt => &modern_alt::ModernAlt,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Layout context
// ────────────────────────────────────────────────────────────────────────────

/// Resolved page and typography parameters for one render.
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext {
    pub page_width: f32,
    pub margin: f32,
    pub typeface: Typeface,
    pub base_px: f32,
    pub line_factor: f32,
}

impl LayoutContext {
    pub fn new(settings: RenderSettings, geometry: PageGeometry) -> Self {
        Self {
            page_width: geometry.width_px(),
            margin: mm_to_px(settings.margin.margin_mm()),
            typeface: settings.font_group.typeface(),
            base_px: BASE_FONT_PX * settings.font_scale.factor(),
            line_factor: settings.line_height.factor(),
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.page_width - 2.0 * self.margin).max(0.0)
    }

    /// Font size in pixels for a size multiplier of the base.
    pub fn px(&self, size: f32) -> f32 {
        self.base_px * size
    }

    pub fn line_px(&self, size: f32) -> f32 {
        self.px(size) * self.line_factor
    }

    pub fn metrics(&self) -> &'static FontMetricTable {
        get_metrics(self.typeface)
    }

    /// Wraps finished blocks into a tree. `bottom` is the lowest content edge.
    pub fn tree(&self, blocks: Vec<Block>, bottom: f32) -> VisualTree {
        VisualTree {
            width: self.page_width,
            height: bottom.max(self.margin) + self.margin,
            margin: self.margin,
            blocks,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text style
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Multiplier of the base font size.
    pub size: f32,
    pub weight: Weight,
    pub italic: bool,
    pub color: Color,
    pub align: Align,
}

impl TextStyle {
    pub const fn body() -> Self {
        Self {
            size: 1.0,
            weight: Weight::Regular,
            italic: false,
            color: Color::BODY,
            align: Align::Left,
        }
    }

    pub const fn sized(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub const fn bold(mut self) -> Self {
        self.weight = Weight::Bold;
        self
    }

    pub const fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub const fn colored(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub const fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Column builder
// ────────────────────────────────────────────────────────────────────────────

/// Vertical flow of blocks inside a fixed horizontal band.
///
/// Drawing calls append to the open block, opening one at the cursor if needed.
/// Blocks that end up with no nodes are dropped.
pub struct Column<'a> {
    ctx: &'a LayoutContext,
    x: f32,
    width: f32,
    y: f32,
    blocks: Vec<Block>,
    open: Option<(f32, Vec<Node>)>,
}

impl<'a> Column<'a> {
    pub fn new(ctx: &'a LayoutContext, x: f32, width: f32, top: f32) -> Self {
        Self {
            ctx,
            x,
            width,
            y: top,
            blocks: Vec::new(),
            open: None,
        }
    }

    pub fn ctx(&self) -> &LayoutContext {
        self.ctx
    }

    pub fn begin_block(&mut self) {
        self.end_block();
        self.open = Some((self.y, Vec::new()));
    }

    pub fn end_block(&mut self) {
        if let Some((top, nodes)) = self.open.take() {
            if !nodes.is_empty() {
                self.blocks.push(Block {
                    y: top,
                    height: self.y - top,
                    nodes,
                });
            }
        }
    }

    fn push(&mut self, node: Node) {
        let y = self.y;
        self.open.get_or_insert_with(|| (y, Vec::new())).1.push(node);
    }

    fn run(&self, x: f32, text: String, style: TextStyle) -> TextRun {
        let font_px = self.ctx.px(style.size);
        TextRun {
            x,
            y: self.y,
            width: self.ctx.metrics().width_px(&text, font_px, style.weight),
            line_height: self.ctx.line_px(style.size),
            font_px,
            typeface: self.ctx.typeface,
            weight: style.weight,
            italic: style.italic,
            color: style.color,
            text,
        }
    }

    fn aligned_x(&self, x: f32, width: f32, line_width: f32, align: Align) -> f32 {
        match align {
            Align::Left => x,
            Align::Center => x + ((width - line_width) / 2.0).max(0.0),
        }
    }

    fn wrapped_at(&mut self, x: f32, width: f32, text: &str, style: TextStyle) {
        let font_px = self.ctx.px(style.size);
        let lines = self.ctx.metrics().wrap(text, width, font_px, style.weight);
        for line in lines {
            let mut run = self.run(x, line, style);
            run.x = self.aligned_x(x, width, run.width, style.align);
            self.y += run.line_height;
            self.push(Node::Text(run));
        }
    }

    /// Wrapped paragraph across the full column width. Blank text draws nothing.
    pub fn text(&mut self, text: &str, style: TextStyle) {
        self.wrapped_at(self.x, self.width, text, style);
    }

    /// `left` wrapped on the left, `right` kept on the first line flush right.
    pub fn row(&mut self, left: &str, left_style: TextStyle, right: &str, right_style: TextStyle) {
        let right = right.trim();
        if right.is_empty() {
            self.text(left, left_style);
            return;
        }
        let top = self.y;
        let right_font = self.ctx.px(right_style.size);
        let right_width = self
            .ctx
            .metrics()
            .width_px(right, right_font, right_style.weight)
            .min(self.width * 0.45);
        let gutter = self.ctx.px(1.0);

        let mut right_run = self.run(0.0, right.to_string(), right_style);
        right_run.x = self.x + (self.width - right_run.width).max(0.0);
        let right_height = right_run.line_height;

        self.wrapped_at(
            self.x,
            (self.width - right_width - gutter).max(gutter),
            left,
            left_style,
        );
        let left_bottom = self.y;
        self.push(Node::Text(right_run));
        self.y = left_bottom.max(top + right_height);
    }

    /// Bulleted list with a hanging indent.
    pub fn bullets(&mut self, items: &[String], style: TextStyle) {
        let indent = self.ctx.px(style.size) * 1.2;
        for item in items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let bullet = self.run(self.x, BULLET.to_string(), style);
            self.push(Node::Text(bullet));
            self.wrapped_at(self.x + indent, (self.width - indent).max(indent), item, style);
        }
    }

    pub fn rule(&mut self, color: Color, thickness: f32) {
        self.push(Node::Rule {
            x: self.x,
            y: self.y,
            width: self.width,
            thickness,
            color,
        });
        self.y += thickness;
    }

    pub fn gap(&mut self, px: f32) {
        self.y += px;
    }

    /// Labels drawn as rounded tags, flowing onto new rows as needed.
    pub fn pills(&mut self, labels: &[String], style: TextStyle, fill: Color) {
        let font_px = self.ctx.px(style.size);
        let pad_x = font_px * 0.6;
        let spacing = font_px * 0.4;
        let pill_height = font_px * 1.7;
        let mut cursor_x = self.x;
        let mut placed_in_row = 0;

        for label in labels.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let text_width = self.ctx.metrics().width_px(label, font_px, style.weight);
            let pill_width = (text_width + 2.0 * pad_x).min(self.width);
            if placed_in_row > 0 && cursor_x + pill_width > self.x + self.width {
                self.y += pill_height + spacing;
                cursor_x = self.x;
                placed_in_row = 0;
            }
            self.push(Node::Rect {
                x: cursor_x,
                y: self.y,
                width: pill_width,
                height: pill_height,
                radius: pill_height / 2.0,
                color: fill,
            });
            let mut run = self.run(cursor_x + pad_x, label.to_string(), style);
            run.line_height = pill_height;
            self.push(Node::Text(run));
            cursor_x += pill_width + spacing;
            placed_in_row += 1;
        }
        if placed_in_row > 0 {
            self.y += pill_height;
        }
    }

    /// Square image centered in the column.
    pub fn image(&mut self, source: &str, size: f32) {
        let size = size.min(self.width);
        self.push(Node::Image {
            x: self.x + (self.width - size) / 2.0,
            y: self.y,
            width: size,
            height: size,
            source: source.to_string(),
        });
        self.y += size;
    }

    /// Closes the open block and returns the blocks with the cursor position.
    pub fn finish(mut self) -> (Vec<Block>, f32) {
        self.end_block();
        let bottom = self
            .blocks
            .last()
            .map(Block::bottom)
            .unwrap_or(self.y)
            .min(self.y);
        (self.blocks, bottom)
    }
}

/// Lays out a titled section. The title shares a block with the first entry so
/// a block-aware page break never strands a heading at the foot of a page.
///
/// Callers pass entries already filtered for blanks. Returns whether anything
/// was drawn; the section gap follows only a drawn section.
pub fn section<T>(
    col: &mut Column<'_>,
    items: impl IntoIterator<Item = T>,
    spacing: f32,
    title: impl Fn(&mut Column<'_>),
    entry: impl Fn(&mut Column<'_>, T),
) -> bool {
    let mut items = items.into_iter();
    let Some(first) = items.next() else {
        return false;
    };
    col.begin_block();
    title(col);
    entry(col, first);
    col.end_block();
    for item in items {
        col.gap(spacing);
        col.begin_block();
        entry(col, item);
        col.end_block();
    }
    true
}

/// Non-blank summary as a one-element slice, for use with `section`.
pub fn summary_items(document: &Document) -> Vec<&str> {
    let summary = document.summary.trim();
    if summary.is_empty() {
        Vec::new()
    } else {
        vec![summary]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::{FontScale, MarginDensity};

    fn ctx() -> LayoutContext {
        LayoutContext::new(RenderSettings::default(), PageGeometry::A4)
    }

    #[test]
    fn test_base_font_is_ten_points() {
        assert!((BASE_FONT_PX - 13.333).abs() < 0.01);
    }

    #[test]
    fn test_context_margin_and_scale() {
        let settings = RenderSettings {
            margin: MarginDensity::Generous,
            font_scale: FontScale::Large,
            ..Default::default()
        };
        let c = LayoutContext::new(settings, PageGeometry::A4);
        assert!((c.margin - 96.0).abs() < 1e-3);
        assert!((c.base_px - BASE_FONT_PX * 1.1).abs() < 1e-3);
        assert!((c.content_width() - (794.0 - 192.0)).abs() < 1e-3);
    }

    #[test]
    fn test_blank_text_opens_no_block() {
        let c = ctx();
        let mut col = Column::new(&c, c.margin, c.content_width(), c.margin);
        col.begin_block();
        col.text("   ", TextStyle::body());
        let (blocks, bottom) = col.finish();
        assert!(blocks.is_empty());
        assert_eq!(bottom, c.margin);
    }

    #[test]
    fn test_row_keeps_right_text_flush_right() {
        let c = ctx();
        let mut col = Column::new(&c, c.margin, c.content_width(), c.margin);
        col.row("Engineer", TextStyle::body().bold(), "2020 - 2024", TextStyle::body());
        let (blocks, _) = col.finish();
        let right = blocks[0]
            .nodes
            .iter()
            .find_map(|n| match n {
                Node::Text(run) if run.text == "2020 - 2024" => Some(run.clone()),
                _ => None,
            })
            .unwrap();
        assert!((right.x + right.width - (c.margin + c.content_width())).abs() < 1e-3);
    }

    #[test]
    fn test_pills_wrap_within_column() {
        let c = ctx();
        let width = 150.0;
        let mut col = Column::new(&c, c.margin, width, c.margin);
        let labels: Vec<String> = ["Rust", "Kubernetes", "PostgreSQL", "Terraform", "gRPC"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        col.pills(&labels, TextStyle::body().sized(0.9), Color::PILL);
        let (blocks, _) = col.finish();
        for node in &blocks[0].nodes {
            if let Node::Rect { x, width: w, .. } = node {
                assert!(*x + *w <= c.margin + width + 1e-3);
            }
        }
        assert!(blocks[0].height > c.px(0.9) * 1.7);
    }

    #[test]
    fn test_section_skips_empty_items() {
        let c = ctx();
        let mut col = Column::new(&c, c.margin, c.content_width(), c.margin);
        let items: Vec<&str> = Vec::new();
        let drawn = section(
            &mut col,
            &items,
            4.0,
            |col| col.text("TITLE", TextStyle::body()),
            |col, item| col.text(item, TextStyle::body()),
        );
        assert!(!drawn);
        let (blocks, _) = col.finish();
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_section_title_shares_first_block() {
        let c = ctx();
        let mut col = Column::new(&c, c.margin, c.content_width(), c.margin);
        let drawn = section(
            &mut col,
            &["one", "two"],
            4.0,
            |col| col.text("TITLE", TextStyle::body()),
            |col, item| col.text(item, TextStyle::body()),
        );
        assert!(drawn);
        let (blocks, _) = col.finish();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].nodes.len(), 2);
    }
}
