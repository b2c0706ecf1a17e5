use crate::layout::templates::classic::{certification_entry, education_entry};
use crate::layout::templates::{section, summary_items, Column, LayoutContext, LayoutStrategy, TextStyle};
use crate::layout::visual_tree::{Color, VisualTree};
use crate::models::document::{Document, ExperienceItem};

/// Single column with accent titles, skill pills and tight item spacing.
pub struct ModernCompact;

fn title(col: &mut Column<'_>, text: &str) {
    col.text(&text.to_uppercase(), TextStyle::body().sized(1.05).bold().colored(Color::ACCENT));
    col.gap(col.ctx().px(0.25));
}

fn experience_entry(col: &mut Column<'_>, item: &ExperienceItem) {
    let heading = match (item.role.trim(), item.company.trim()) {
        ("", company) => company.to_string(),
        (role, "") => role.to_string(),
        (role, company) => format!("{role}, {company}"),
    };
    col.row(
        &heading,
        TextStyle::body().bold().colored(Color::INK),
        &item.dates,
        TextStyle::body().sized(0.85).colored(Color::MUTED),
    );
    col.bullets(&item.responsibilities, TextStyle::body().sized(0.95));
}

impl LayoutStrategy for ModernCompact {
    fn name(&self) -> &'static str {
        "modern-compact"
    }

    fn layout(&self, document: &Document, ctx: &LayoutContext) -> VisualTree {
        let mut col = Column::new(ctx, ctx.margin, ctx.content_width(), ctx.margin);
        let spacing = ctx.px(0.5);
        let section_gap = ctx.px(0.9);

        col.begin_block();
        col.text(document.name.trim(), TextStyle::body().sized(1.8).bold().colored(Color::INK));
        if let Some(job_title) = &document.job_title {
            col.text(job_title, TextStyle::body().sized(1.1).colored(Color::ACCENT));
        }
        let contact: Vec<&str> = document.contact.channels().into_iter().map(|(_, v)| v).collect();
        col.text(&contact.join("  ·  "), TextStyle::body().sized(0.85).colored(Color::MUTED));
        col.end_block();
        col.gap(section_gap);

        if section(&mut col, summary_items(document), spacing, |c| title(c, "Profile"), |c, s| {
            c.text(s, TextStyle::body())
        }) {
            col.gap(section_gap);
        }
        if section(
            &mut col,
            document.experience_entries(),
            spacing,
            |c| title(c, "Experience"),
            |c, e| experience_entry(c, e),
        ) {
            col.gap(section_gap);
        }

        let skills = document.skill_labels();
        let rows = if skills.is_empty() { Vec::new() } else { vec![skills] };
        if section(&mut col, &rows, spacing, |c| title(c, "Skills"), |c, labels| {
            c.pills(labels, TextStyle::body().sized(0.85).colored(Color::ACCENT), Color::PILL)
        }) {
            col.gap(section_gap);
        }
        if section(
            &mut col,
            document.education_entries(),
            spacing,
            |c| title(c, "Education"),
            |c, e| education_entry(c, e),
        ) {
            col.gap(section_gap);
        }
        section(
            &mut col,
            document.certification_entries(),
            spacing,
            |c| title(c, "Certifications"),
            |c, e| certification_entry(c, e),
        );

        let (blocks, bottom) = col.finish();
        ctx.tree(blocks, bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::PageGeometry;
    use crate::models::settings::RenderSettings;
    use serde_json::json;

    #[test]
    fn test_blank_entries_draw_no_headings() {
        let doc: Document = serde_json::from_value(json!({
            "experience": [{}, { "responsibilities": ["  "] }],
            "education": [{}],
            "certifications": [{}]
        }))
        .unwrap();
        let ctx = LayoutContext::new(RenderSettings::default(), PageGeometry::A4);
        let tree = ModernCompact.layout(&doc, &ctx);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_partial_entry_keeps_its_heading() {
        let doc: Document = serde_json::from_value(json!({
            "experience": [{}, { "company": "Acme" }]
        }))
        .unwrap();
        let ctx = LayoutContext::new(RenderSettings::default(), PageGeometry::A4);
        let tree = ModernCompact.layout(&doc, &ctx);
        let texts: Vec<&str> = tree
            .nodes()
            .filter_map(|n| match n {
                crate::layout::visual_tree::Node::Text(run) => Some(run.text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["EXPERIENCE", "Acme"]);
        assert_eq!(tree.blocks.len(), 1);
    }
}
