//! Plain-text rendering of a résumé, for "copy text".

use std::fmt::Write as _;

use crate::models::document::Document;

pub fn format_resume_text(doc: &Document) -> String {
    let mut text = String::new();

    let name = doc.name.trim();
    if !name.is_empty() {
        let _ = writeln!(text, "{}", name.to_uppercase());
    }
    if let Some(job_title) = &doc.job_title {
        let _ = writeln!(text, "{}", job_title.trim());
    }
    text.push('\n');

    let channels = doc.contact.channels();
    if !channels.is_empty() {
        text.push_str("CONTACT\n");
        for (label, value) in channels {
            let _ = writeln!(text, "{label}: {value}");
        }
        text.push('\n');
    }

    let summary = doc.summary.trim();
    if !summary.is_empty() {
        let _ = write!(text, "SUMMARY\n{summary}\n\n");
    }

    let experience = doc.experience_entries();
    if !experience.is_empty() {
        text.push_str("EXPERIENCE\n");
        for item in experience {
            let _ = writeln!(text, "{} | {}", item.role.to_uppercase(), item.company);
            let _ = writeln!(text, "{}", item.dates);
            for line in &item.responsibilities {
                let _ = writeln!(text, "- {line}");
            }
            text.push('\n');
        }
    }

    let education = doc.education_entries();
    if !education.is_empty() {
        text.push_str("EDUCATION\n");
        for item in education {
            let _ = write!(text, "{} | {}\n{}\n\n", item.degree, item.institution, item.details);
        }
    }

    let certifications = doc.certification_entries();
    if !certifications.is_empty() {
        text.push_str("LICENSES & CERTIFICATIONS\n");
        for cert in certifications {
            let _ = writeln!(text, "{} | {}", cert.name, cert.issuer);
            if let Some(date) = &cert.date {
                let _ = writeln!(text, "Date: {date}");
            }
            text.push('\n');
        }
    }

    let skills = doc.skill_labels();
    if !skills.is_empty() {
        let _ = writeln!(text, "SKILLS\n{}", skills.join(" • "));
    }

    text.trim().to_string()
}
