//! Visual tree: the renderer-independent result of laying out a document.
//!
//! All coordinates are absolute reference pixels from the top-left corner of an
//! unbounded page that is exactly one page wide. The tree carries its own page
//! margin so the paginator can map the content box onto physical pages.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::{FontKey, Typeface, Weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const INK: Color = Color::rgb(0x1f, 0x29, 0x37);
    pub const BODY: Color = Color::rgb(0x37, 0x41, 0x51);
    pub const MUTED: Color = Color::rgb(0x6b, 0x72, 0x80);
    pub const ACCENT: Color = Color::rgb(0x02, 0x84, 0xc7);
    pub const RULE: Color = Color::rgb(0xd1, 0xd5, 0xdb);
    pub const PILL: Color = Color::rgb(0xe0, 0xf2, 0xfe);
    pub const PLACEHOLDER: Color = Color::rgb(0xe5, 0xe7, 0xeb);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub x: f32,
    /// Top of the line box.
    pub y: f32,
    pub width: f32,
    pub line_height: f32,
    pub font_px: f32,
    pub typeface: Typeface,
    pub weight: Weight,
    pub italic: bool,
    pub color: Color,
    pub text: String,
}

impl TextRun {
    /// Baseline position, with the glyph box centred in the line box.
    pub fn baseline(&self) -> f32 {
        self.y + (self.line_height - self.font_px) / 2.0 + self.font_px * 0.8
    }

    pub fn font_key(&self) -> FontKey {
        FontKey {
            typeface: self.typeface,
            weight: self.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Text(TextRun),
    Rule {
        x: f32,
        y: f32,
        width: f32,
        thickness: f32,
        color: Color,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        color: Color,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        source: String,
    },
}

#[cfg(test)]
impl Node {
    /// Vertical extent `(top, bottom)` of the node.
    pub fn extent(&self) -> (f32, f32) {
        match self {
            Node::Text(run) => (run.y, run.y + run.line_height),
            Node::Rule { y, thickness, .. } => (*y, *y + *thickness),
            Node::Rect { y, height, .. } | Node::Image { y, height, .. } => (*y, *y + *height),
        }
    }
}

/// A block-level group (a header, one experience entry, one paragraph). Block
/// edges are the only places a page break never cuts through a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub y: f32,
    pub height: f32,
    pub nodes: Vec<Node>,
}

impl Block {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualTree {
    /// Page width in reference pixels.
    pub width: f32,
    /// Natural (unconstrained) height, margins included.
    pub height: f32,
    /// Page margin applied on every side of the content box.
    pub margin: f32,
    pub blocks: Vec<Block>,
}

impl VisualTree {
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.nodes.is_empty())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.blocks.iter().flat_map(|b| b.nodes.iter())
    }

    pub fn content_width(&self) -> f32 {
        (self.width - 2.0 * self.margin).max(0.0)
    }

    pub fn content_height(&self) -> f32 {
        (self.height - 2.0 * self.margin).max(0.0)
    }

    /// Every font the tree draws with.
    pub fn font_keys(&self) -> BTreeSet<FontKey> {
        self.nodes()
            .filter_map(|n| match n {
                Node::Text(run) => Some(run.font_key()),
                _ => None,
            })
            .collect()
    }

    /// Every image source the tree embeds.
    pub fn image_sources(&self) -> BTreeSet<String> {
        self.nodes()
            .filter_map(|n| match n {
                Node::Image { source, .. } => Some(source.clone()),
                _ => None,
            })
            .collect()
    }

    /// Block bottoms (relative to the content box top) that no other block
    /// straddles. Sorted and deduplicated.
    pub fn safe_break_points(&self) -> Vec<f32> {
        let mut points: Vec<f32> = self
            .blocks
            .iter()
            .filter(|b| !b.nodes.is_empty())
            .map(Block::bottom)
            .filter(|&cut| {
                !self
                    .blocks
                    .iter()
                    .any(|other| other.y < cut && other.bottom() > cut && !other.nodes.is_empty())
            })
            .map(|cut| cut - self.margin)
            .filter(|&cut| cut > 0.0)
            .collect();
        points.sort_by(|a, b| a.total_cmp(b));
        points.dedup_by(|a, b| (*a - *b).abs() < 0.5);
        points
    }
}
