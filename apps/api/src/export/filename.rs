//! Download filename sanitization.
//!
//! Filenames are derived from the candidate's name, which is free text from a
//! generative backend. Whitespace runs become `_`, everything except letters,
//! digits, `-` and `_` is dropped (so no separators or `..` survive), and the
//! suffix is fixed per document type.

use crate::models::settings::DocumentKind;

const MAX_STEM_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Pdf,
    PrintHtml,
    Text,
}

pub fn sanitize_stem(raw: &str) -> String {
    let mut out = String::new();
    let mut pending_sep = false;
    for ch in raw.chars() {
        if ch.is_whitespace() || ch == '_' {
            pending_sep = !out.is_empty();
        } else if ch.is_alphanumeric() || ch == '-' {
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.push(ch);
        }
    }
    out.chars()
        .take(MAX_STEM_CHARS)
        .collect::<String>()
        .trim_matches(|c| c == '_' || c == '-')
        .to_string()
}

/// Drops one trailing extension this service produces, so a requested
/// `"cv.pdf"` does not become `cvpdf.pdf`.
pub fn requested_stem(raw: &str) -> &str {
    let trimmed = raw.trim();
    for ext in [".pdf", ".html", ".txt"] {
        let cut = trimmed.len().saturating_sub(ext.len());
        if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(ext) {
            return &trimmed[..cut];
        }
    }
    trimmed
}

/// Full download filename for a document.
pub fn artifact_filename(name: &str, kind: DocumentKind, format: ArtifactFormat) -> String {
    let stem = sanitize_stem(name);
    let stem = if stem.is_empty() {
        match kind {
            DocumentKind::Resume => "Resume".to_string(),
            DocumentKind::CoverLetter => "Cover_Letter".to_string(),
        }
    } else {
        stem
    };
    let suffix = match (kind, format) {
        (DocumentKind::Resume, ArtifactFormat::Pdf) => ".pdf",
        (DocumentKind::CoverLetter, ArtifactFormat::Pdf) => "_CL.pdf",
        (DocumentKind::Resume, ArtifactFormat::PrintHtml) => ".html",
        (DocumentKind::CoverLetter, ArtifactFormat::PrintHtml) => "_CL.html",
        (DocumentKind::Resume, ArtifactFormat::Text) => ".txt",
        (DocumentKind::CoverLetter, ArtifactFormat::Text) => "_CL.txt",
    };
    format!("{stem}{suffix}")
}
