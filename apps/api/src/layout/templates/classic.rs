use crate::layout::templates::{section, summary_items, Column, LayoutContext, LayoutStrategy, TextStyle};
use crate::layout::visual_tree::{Color, VisualTree};
use crate::models::document::{CertificationItem, Document, EducationItem, ExperienceItem};

/// Single column, centered header, ruled section titles, bullet-joined skills
/// and a name footer.
pub struct Classic;

fn title(col: &mut Column<'_>, text: &str) {
    col.text(&text.to_uppercase(), TextStyle::body().sized(1.1).bold().colored(Color::INK));
    col.gap(2.0);
    col.rule(Color::RULE, 1.0);
    col.gap(col.ctx().px(0.4));
}

pub(crate) fn experience_entry(col: &mut Column<'_>, item: &ExperienceItem) {
    let muted = TextStyle::body().sized(0.9).colored(Color::MUTED);
    col.row(&item.role, TextStyle::body().bold().colored(Color::INK), &item.dates, muted);
    col.text(&item.company, muted.italic());
    col.bullets(&item.responsibilities, TextStyle::body());
}

pub(crate) fn education_entry(col: &mut Column<'_>, item: &EducationItem) {
    col.text(&item.degree, TextStyle::body().bold().colored(Color::INK));
    col.text(&item.institution, TextStyle::body());
    col.text(&item.details, TextStyle::body().sized(0.9).colored(Color::MUTED));
}

pub(crate) fn certification_entry(col: &mut Column<'_>, item: &CertificationItem) {
    let muted = TextStyle::body().sized(0.9).colored(Color::MUTED);
    col.row(
        &item.name,
        TextStyle::body().bold().colored(Color::INK),
        item.date.as_deref().unwrap_or_default(),
        muted,
    );
    col.text(&item.issuer, muted);
}

impl LayoutStrategy for Classic {
    fn name(&self) -> &'static str {
        "classic"
    }

    fn layout(&self, document: &Document, ctx: &LayoutContext) -> VisualTree {
        let mut col = Column::new(ctx, ctx.margin, ctx.content_width(), ctx.margin);
        let spacing = ctx.px(0.8);
        let section_gap = ctx.px(1.2);

        // ── Header ────────────────────────────────────────────────────────────
        col.begin_block();
        col.text(
            document.name.trim(),
            TextStyle::body().sized(2.0).bold().colored(Color::INK).centered(),
        );
        if let Some(job_title) = &document.job_title {
            col.text(job_title, TextStyle::body().sized(1.15).colored(Color::MUTED).centered());
        }
        let contact: Vec<&str> = document.contact.channels().into_iter().map(|(_, v)| v).collect();
        col.text(
            &contact.join(" | "),
            TextStyle::body().sized(0.9).colored(Color::MUTED).centered(),
        );
        col.end_block();
        col.gap(section_gap);

        if section(&mut col, summary_items(document), spacing, |c| title(c, "Summary"), |c, s| {
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
        if section(
            &mut col,
            document.education_entries(),
            spacing,
            |c| title(c, "Education"),
            |c, e| education_entry(c, e),
        ) {
            col.gap(section_gap);
        }
        if section(
            &mut col,
            document.certification_entries(),
            spacing,
            |c| title(c, "Licenses & Certifications"),
            |c, e| certification_entry(c, e),
        ) {
            col.gap(section_gap);
        }

        let skills = document.skill_labels();
        let joined = if skills.is_empty() {
            Vec::new()
        } else {
            vec![skills.join(" • ")]
        };
        if section(&mut col, &joined, spacing, |c| title(c, "Skills"), |c, s| {
            c.text(s, TextStyle::body())
        }) {
            col.gap(section_gap);
        }

        // ── Footer ────────────────────────────────────────────────────────────
        let name = document.name.trim();
        if !name.is_empty() {
            col.begin_block();
            col.text(
                &format!("{name} - Page 1 of 1"),
                TextStyle::body().sized(0.8).colored(Color::MUTED).centered(),
            );
            col.end_block();
        }

        let (blocks, bottom) = col.finish();
        ctx.tree(blocks, bottom)
    }
}
