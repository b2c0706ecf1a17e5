//! Document Model: the structured résumé produced by the generation collaborator.
//!
//! Every field is optional on the wire. The collaborator has no schema guarantee,
//! so deserialization coerces `null`, missing keys, and mistyped scalars into
//! empty values instead of failing. Skills in particular may arrive as one
//! delimited string; they are always normalized to a sequence of trimmed labels.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Delimiters accepted when the skills field arrives as a single string.
const SKILL_DELIMITERS: &[char] = &[',', ';', '|', '•', '\n'];

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub job_title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact: ContactInfo,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experience: Vec<ExperienceItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub education: Vec<EducationItem>,
    #[serde(
        default,
        rename = "licensesCertifications",
        alias = "certifications",
        deserialize_with = "null_as_default"
    )]
    pub certifications: Vec<CertificationItem>,
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub skills: Vec<String>,

    /// Portrait image reference (URL or `data:` URI). Tracked by the asset gate.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub headshot: Option<String>,

    // Analytical payload, displayed by clients, never read by the export core.
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub tailoring_keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub tailoring_strength: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub job_match_analysis: Option<JobMatchAnalysis>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub suggested_headshot_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub linkedin: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub portfolio: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dates: String,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub responsibilities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub institution: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub degree: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificationItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub issuer: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMatchAnalysis {
    #[serde(default)]
    pub match_score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub gaps: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Accessors used by the renderers
// ────────────────────────────────────────────────────────────────────────────

impl Document {
    /// Skill labels, re-normalized. Documents built in code bypass serde, so the
    /// renderer never trusts `skills` to already be trimmed.
    pub fn skill_labels(&self) -> Vec<String> {
        self.skills
            .iter()
            .flat_map(|s| normalize_skills(s))
            .collect()
    }

    /// Experience entries with at least one drawable field.
    pub fn experience_entries(&self) -> Vec<&ExperienceItem> {
        self.experience.iter().filter(|e| !e.is_blank()).collect()
    }

    pub fn education_entries(&self) -> Vec<&EducationItem> {
        self.education.iter().filter(|e| !e.is_blank()).collect()
    }

    pub fn certification_entries(&self) -> Vec<&CertificationItem> {
        self.certifications.iter().filter(|c| !c.is_blank()).collect()
    }

    /// True when there is nothing a renderer could draw. Uses the same entry
    /// filters as the templates, so `[{}]` counts as empty.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
            && self.job_title.as_deref().map_or(true, |t| t.trim().is_empty())
            && self.summary.trim().is_empty()
            && self.experience_entries().is_empty()
            && self.education_entries().is_empty()
            && self.certification_entries().is_empty()
            && self.skill_labels().is_empty()
    }
}

fn blank(text: &str) -> bool {
    text.trim().is_empty()
}

impl ExperienceItem {
    pub fn is_blank(&self) -> bool {
        blank(&self.company)
            && blank(&self.role)
            && blank(&self.dates)
            && self.responsibilities.iter().all(|r| blank(r))
    }
}

impl EducationItem {
    pub fn is_blank(&self) -> bool {
        blank(&self.institution) && blank(&self.degree) && blank(&self.details)
    }
}

impl CertificationItem {
    pub fn is_blank(&self) -> bool {
        blank(&self.name) && blank(&self.issuer) && self.date.as_deref().map_or(true, blank)
    }
}

impl ContactInfo {
    /// Labeled contact points in display order. The generic website is only
    /// shown when no portfolio link is present.
    pub fn channels(&self) -> Vec<(&'static str, &str)> {
        let website = if self.portfolio.is_none() {
            self.website.as_deref()
        } else {
            None
        };
        [
            ("Email", self.email.as_deref()),
            ("Phone", self.phone.as_deref()),
            ("Location", self.location.as_deref()),
            ("LinkedIn", self.linkedin.as_deref()),
            ("Portfolio", self.portfolio.as_deref()),
            ("Website", website),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (label, v))
        })
        .collect()
    }
}

/// Splits a delimited skills string into trimmed, non-empty labels.
///
/// `"Python, SQL , Docker"` → `["Python", "SQL", "Docker"]`.
pub fn normalize_skills(raw: &str) -> Vec<String> {
    raw.split(SKILL_DELIMITERS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient deserializers
// ────────────────────────────────────────────────────────────────────────────

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).filter(|s| !s.trim().is_empty()))
}

/// Accepts a string or an array of scalars; `split` decides how a lone string is cut.
fn text_list(value: Value, split: fn(&str) -> Vec<String>) -> Vec<String> {
    match value {
        Value::String(s) => split(&s),
        Value::Array(items) => items
            .into_iter()
            .filter_map(scalar_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn deserialize_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_list(Value::deserialize(deserializer)?, normalize_skills))
}

fn deserialize_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn split_lines(raw: &str) -> Vec<String> {
        raw.lines()
            .map(|l| l.trim().trim_start_matches(['-', '•', '*']).trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
    Ok(text_list(Value::deserialize(deserializer)?, split_lines))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_skills_string_is_split_and_trimmed() {
        let doc: Document =
            serde_json::from_value(json!({ "name": "Ada", "skills": "Python, SQL , Docker" }))
                .unwrap();
        assert_eq!(doc.skills, vec!["Python", "SQL", "Docker"]);
    }

    #[test]
    fn test_skills_string_matches_presplit_sequence() {
        let from_string: Document =
            serde_json::from_value(json!({ "skills": "Python, SQL , Docker" })).unwrap();
        let from_list: Document =
            serde_json::from_value(json!({ "skills": ["Python", "SQL", "Docker"] })).unwrap();
        assert_eq!(from_string.skill_labels(), from_list.skill_labels());
    }

    #[test]
    fn test_skills_list_drops_blank_entries() {
        let doc: Document =
            serde_json::from_value(json!({ "skills": ["  Rust ", "", null, 42] })).unwrap();
        assert_eq!(doc.skills, vec!["Rust", "42"]);
    }

    #[test]
    fn test_skill_labels_renormalizes_code_built_documents() {
        let doc = Document {
            skills: vec![" Go ; Kafka".to_string(), "   ".to_string()],
            ..Default::default()
        };
        assert_eq!(doc.skill_labels(), vec!["Go", "Kafka"]);
    }

    #[test]
    fn test_empty_object_deserializes_to_blank_document() {
        let doc: Document = serde_json::from_value(json!({})).unwrap();
        assert!(doc.is_blank());
        assert!(doc.experience.is_empty());
    }

    #[test]
    fn test_nulls_and_wrong_types_are_tolerated() {
        let doc: Document = serde_json::from_value(json!({
            "name": "Ada",
            "jobTitle": null,
            "contact": null,
            "summary": 7,
            "experience": null,
            "education": [{ "institution": "MIT" }],
            "licensesCertifications": null,
            "skills": { "unexpected": true },
            "jobMatchAnalysis": { "matchScore": 88, "gaps": "Kubernetes; Terraform" }
        }))
        .unwrap();
        assert_eq!(doc.summary, "7");
        assert!(doc.job_title.is_none());
        assert!(doc.skills.is_empty());
        assert_eq!(doc.education[0].degree, "");
        let analysis = doc.job_match_analysis.unwrap();
        assert_eq!(analysis.gaps, vec!["Kubernetes", "Terraform"]);
    }

    #[test]
    fn test_responsibilities_string_is_split_into_bullets() {
        let doc: Document = serde_json::from_value(json!({
            "experience": [{
                "company": "Acme",
                "role": "Engineer",
                "dates": "2020 - Present",
                "responsibilities": "- Built things\n- Shipped things\n\n"
            }]
        }))
        .unwrap();
        assert_eq!(
            doc.experience[0].responsibilities,
            vec!["Built things", "Shipped things"]
        );
    }

    #[test]
    fn test_certifications_alias_accepted() {
        let doc: Document = serde_json::from_value(json!({
            "certifications": [{ "name": "CKA", "issuer": "CNCF" }]
        }))
        .unwrap();
        assert_eq!(doc.certifications.len(), 1);
        assert!(doc.certifications[0].date.is_none());
    }

    #[test]
    fn test_empty_entries_leave_document_blank() {
        let doc: Document = serde_json::from_value(json!({
            "experience": [{}],
            "education": [{ "details": "  " }],
            "licensesCertifications": [{ "date": null }]
        }))
        .unwrap();
        assert_eq!(doc.experience.len(), 1);
        assert!(doc.experience_entries().is_empty());
        assert!(doc.education_entries().is_empty());
        assert!(doc.certification_entries().is_empty());
        assert!(doc.is_blank());
    }

    #[test]
    fn test_partial_entry_is_kept() {
        let doc: Document = serde_json::from_value(json!({
            "experience": [{}, { "responsibilities": ["Ran payroll"] }]
        }))
        .unwrap();
        assert_eq!(doc.experience_entries().len(), 1);
        assert!(!doc.is_blank());
    }

    #[test]
    fn test_website_hidden_when_portfolio_present() {
        let contact = ContactInfo {
            email: Some("ada@example.com".to_string()),
            portfolio: Some("ada.dev".to_string()),
            website: Some("example.org".to_string()),
            ..Default::default()
        };
        let labels: Vec<&str> = contact.channels().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Email", "Portfolio"]);
    }

    #[test]
    fn test_blank_contact_values_are_skipped() {
        let contact = ContactInfo {
            phone: Some("   ".to_string()),
            website: Some("example.org".to_string()),
            ..Default::default()
        };
        assert_eq!(contact.channels(), vec![("Website", "example.org")]);
    }
}
