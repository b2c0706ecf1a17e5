use crate::layout::templates::classic::{certification_entry, experience_entry};
use crate::layout::templates::{section, summary_items, Column, LayoutContext, LayoutStrategy, TextStyle};
use crate::layout::visual_tree::{Color, VisualTree};
use crate::models::document::{Document, EducationItem};

/// Sidebar share of the content width.
const SIDEBAR_RATIO: f32 = 0.32;
const HEADSHOT_PX: f32 = 110.0;

/// Two columns: a sidebar with portrait, contact, skills and education, and a
/// main column with header, summary, experience and certifications.
pub struct ModernAlt;

fn title(col: &mut Column<'_>, text: &str) {
    col.text(&text.to_uppercase(), TextStyle::body().sized(1.0).bold().colored(Color::ACCENT));
    col.rule(Color::ACCENT, 1.5);
    col.gap(col.ctx().px(0.4));
}

fn sidebar_education(col: &mut Column<'_>, item: &EducationItem) {
    col.text(&item.degree, TextStyle::body().sized(0.9).bold().colored(Color::INK));
    col.text(&item.institution, TextStyle::body().sized(0.9));
    col.text(&item.details, TextStyle::body().sized(0.8).colored(Color::MUTED));
}

impl LayoutStrategy for ModernAlt {
    fn name(&self) -> &'static str {
        "modern-alt"
    }

    fn layout(&self, document: &Document, ctx: &LayoutContext) -> VisualTree {
        let gutter = ctx.px(1.5);
        let sidebar_width = ctx.content_width() * SIDEBAR_RATIO;
        let main_x = ctx.margin + sidebar_width + gutter;
        let main_width = (ctx.content_width() - sidebar_width - gutter).max(0.0);
        let spacing = ctx.px(0.7);
        let section_gap = ctx.px(1.1);

        // ── Sidebar ───────────────────────────────────────────────────────────
        let mut side = Column::new(ctx, ctx.margin, sidebar_width, ctx.margin);
        if let Some(headshot) = &document.headshot {
            side.begin_block();
            side.image(headshot, HEADSHOT_PX);
            side.end_block();
            side.gap(section_gap);
        }
        let channels = document.contact.channels();
        if section(&mut side, channels, spacing * 0.5, |c| title(c, "Contact"), |c, (label, value)| {
            c.text(label, TextStyle::body().sized(0.75).bold().colored(Color::MUTED));
            c.text(value, TextStyle::body().sized(0.85));
        }) {
            side.gap(section_gap);
        }
        let skills = document.skill_labels();
        let rows = if skills.is_empty() { Vec::new() } else { vec![skills] };
        if section(&mut side, &rows, spacing, |c| title(c, "Skills"), |c, labels| {
            c.bullets(labels, TextStyle::body().sized(0.85))
        }) {
            side.gap(section_gap);
        }
        section(
            &mut side,
            document.education_entries(),
            spacing,
            |c| title(c, "Education"),
            |c, e| sidebar_education(c, e),
        );
        let (mut blocks, side_bottom) = side.finish();

        // ── Main column ───────────────────────────────────────────────────────
        let mut main = Column::new(ctx, main_x, main_width, ctx.margin);
        main.begin_block();
        main.text(document.name.trim(), TextStyle::body().sized(2.0).bold().colored(Color::INK));
        if let Some(job_title) = &document.job_title {
            main.text(job_title, TextStyle::body().sized(1.15).colored(Color::ACCENT));
        }
        main.end_block();
        main.gap(section_gap);
        if section(&mut main, summary_items(document), spacing, |c| title(c, "Summary"), |c, s| {
            c.text(s, TextStyle::body())
        }) {
            main.gap(section_gap);
        }
        if section(
            &mut main,
            document.experience_entries(),
            spacing,
            |c| title(c, "Experience"),
            |c, e| experience_entry(c, e),
        ) {
            main.gap(section_gap);
        }
        section(
            &mut main,
            document.certification_entries(),
            spacing,
            |c| title(c, "Certifications"),
            |c, e| certification_entry(c, e),
        );
        let (main_blocks, main_bottom) = main.finish();

        blocks.extend(main_blocks);
        blocks.sort_by(|a, b| a.y.total_cmp(&b.y));
        ctx.tree(blocks, side_bottom.max(main_bottom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::PageGeometry;
    use crate::layout::visual_tree::Node;
    use crate::models::settings::RenderSettings;
    use serde_json::json;

    fn layout(doc: &Document) -> (LayoutContext, VisualTree) {
        let ctx = LayoutContext::new(RenderSettings::default(), PageGeometry::A4);
        let tree = ModernAlt.layout(doc, &ctx);
        (ctx, tree)
    }

    #[test]
    fn test_blank_entries_draw_no_headings() {
        let doc: Document = serde_json::from_value(json!({
            "experience": [{}],
            "education": [{ "institution": "" }],
            "licensesCertifications": [{}]
        }))
        .unwrap();
        let (_, tree) = layout(&doc);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_missing_contact_leaves_no_sidebar_gap() {
        let doc: Document = serde_json::from_value(json!({ "skills": "Rust" })).unwrap();
        let (ctx, tree) = layout(&doc);
        let skills_title = tree
            .nodes()
            .find_map(|n| match n {
                Node::Text(run) if run.text == "SKILLS" => Some(run.y),
                _ => None,
            })
            .unwrap();
        assert!((skills_title - ctx.margin).abs() < 0.01);
    }
}
