//! Cover-letter layout: sender block, date line, placeholder recipient block,
//! then the letter body. Each body line is its own block; blank lines become
//! paragraph gaps.

use chrono::NaiveDate;

use crate::layout::templates::{Column, LayoutContext, TextStyle};
use crate::layout::visual_tree::{Color, VisualTree};
use crate::models::document::Document;

/// Date line format, e.g. `March 4, 2025`.
pub const DATE_FORMAT: &str = "%B %-d, %Y";

const RECIPIENT: [&str; 3] = ["Hiring Manager", "[Company Name]", "[Company Address]"];

/// Lays out a cover letter. A blank body yields an empty tree: the header alone
/// is not a letter worth exporting.
pub fn layout(letter: &str, sender: &Document, date: NaiveDate, ctx: &LayoutContext) -> VisualTree {
    if letter.trim().is_empty() {
        return ctx.tree(Vec::new(), ctx.margin);
    }

    let mut col = Column::new(ctx, ctx.margin, ctx.content_width(), ctx.margin);
    let block_gap = ctx.line_px(1.0);
    let detail = TextStyle::body().sized(0.9).colored(Color::MUTED);

    col.begin_block();
    col.text(sender.name.trim(), TextStyle::body().sized(1.3).bold().colored(Color::ACCENT));
    for line in [&sender.contact.location, &sender.contact.phone, &sender.contact.email]
        .into_iter()
        .flatten()
    {
        col.text(line, detail);
    }
    col.end_block();
    col.gap(block_gap);

    col.begin_block();
    col.text(&date.format(DATE_FORMAT).to_string(), TextStyle::body());
    col.end_block();
    col.gap(block_gap);

    col.begin_block();
    col.text(RECIPIENT[0], TextStyle::body().bold().colored(Color::INK));
    for line in &RECIPIENT[1..] {
        col.text(line, TextStyle::body().italic().colored(Color::MUTED));
    }
    col.end_block();
    col.gap(block_gap);

    for line in letter.trim_matches('\n').lines() {
        if line.trim().is_empty() {
            col.gap(block_gap);
            continue;
        }
        col.begin_block();
        col.text(line, TextStyle::body());
        col.end_block();
    }

    let (blocks, bottom) = col.finish();
    ctx.tree(blocks, bottom)
}
