//! Résumé, cover-letter and coaching generation.
//!
//! Everything goes through `llm_client`: the résumé, ATS audit and interview
//! questions as JSON calls, gap suggestions and trend research as short text
//! calls, and the cover letter as a streamed text call.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::generation::prompts::{
    ANALYST_SYSTEM, ATS_AUDIT_TEMPLATE, ATS_JOB_DESCRIPTION_CHARS, COACH_SYSTEM, COVER_LETTER_HIGHLIGHTS,
    COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM, COVER_LETTER_TEMPERATURE, GAP_SUGGESTION_SKILLS,
    GAP_SUGGESTION_TEMPERATURE, GAP_SUGGESTION_TEMPLATE, INTERVIEW_JOB_DESCRIPTION_CHARS,
    INTERVIEW_QUESTIONS_TEMPERATURE, INTERVIEW_QUESTIONS_TEMPLATE, JOB_DESCRIPTION_TEMPLATE, RESUME_INTRO,
    RESUME_PROMPT_TEMPLATE, RESUME_SYSTEM, REVISION_TEMPLATE, TRENDS_RESEARCH_TEMPLATE, TRENDS_TEMPLATE,
};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::document::Document;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A previously surfaced gap and the suggestion the user chose to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionContext {
    pub original_gap: String,
    pub ai_suggestion: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResumeRequest {
    pub raw_text: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub applied_suggestion: Option<SuggestionContext>,
    #[serde(default)]
    pub industry_trends: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverLetterTone {
    #[default]
    Professional,
    Enthusiastic,
    Formal,
}

impl CoverLetterTone {
    pub fn instruction(self) -> &'static str {
        match self {
            CoverLetterTone::Professional => "Confident, competent, and polished.",
            CoverLetterTone::Enthusiastic => "Energetic, forward-looking, and eager.",
            CoverLetterTone::Formal => "Respectful, traditional, and reserved.",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoverLetterRequest {
    /// The generated résumé the letter is written from.
    pub document: Document,
    pub job_description: String,
    #[serde(default)]
    pub tone: CoverLetterTone,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GapSuggestionRequest {
    pub document: Document,
    /// One of the gaps from `jobMatchAnalysis`.
    pub gap: String,
}

/// Shared by the ATS audit and interview question endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct JobContextRequest {
    pub document: Document,
    pub job_description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndustryTrendsRequest {
    pub job_title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderCheck {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    #[serde(rename = "Auto-Reject")]
    AutoReject,
    Review,
    Priority,
}

/// Machine-readability audit of a résumé against a job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsAuditResult {
    pub parseability_score: f64,
    #[serde(default)]
    pub missing_critical_keywords: Vec<String>,
    #[serde(default)]
    pub formatting_issues: Vec<String>,
    pub section_header_standardization: HeaderCheck,
    pub estimated_human_review_status: ReviewStatus,
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt builders
// ────────────────────────────────────────────────────────────────────────────

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub fn build_resume_prompt(request: &GenerateResumeRequest) -> String {
    let intro = match &request.applied_suggestion {
        Some(s) => REVISION_TEMPLATE
            .replace("{original_gap}", s.original_gap.trim())
            .replace("{ai_suggestion}", s.ai_suggestion.trim()),
        None => RESUME_INTRO.to_string(),
    };
    let job_description = non_blank(&request.job_description)
        .map(|jd| JOB_DESCRIPTION_TEMPLATE.replace("{job_description}", jd))
        .unwrap_or_default();
    let trends = non_blank(&request.industry_trends)
        .map(|t| TRENDS_TEMPLATE.replace("{industry_trends}", t))
        .unwrap_or_default();

    // Raw text goes in last so its content is never scanned for placeholders.
    RESUME_PROMPT_TEMPLATE
        .replace("{intro}", &intro)
        .replace("{job_description}", &job_description)
        .replace("{industry_trends}", &trends)
        .replace("{raw_text}", request.raw_text.trim())
}

fn candidate_summary(doc: &Document) -> String {
    let mut lines = vec![format!("Name: {}", doc.name.trim())];
    if let Some(title) = non_blank(&doc.job_title) {
        lines.push(format!("Title: {title}"));
    }
    lines.push(format!("Summary: {}", doc.summary.trim()));
    lines.push(format!("Skills: {}", doc.skill_labels().join(", ")));
    lines.push("Experience Highlights:".to_string());
    lines.extend(
        doc.experience_entries()
            .into_iter()
            .take(COVER_LETTER_HIGHLIGHTS)
            .map(|exp| format!("- {} at {} ({})", exp.role, exp.company, exp.dates)),
    );
    lines.join("\n")
}

pub fn build_cover_letter_prompt(request: &CoverLetterRequest) -> String {
    COVER_LETTER_PROMPT_TEMPLATE
        .replace("{tone}", request.tone.instruction())
        .replace("{candidate}", &candidate_summary(&request.document))
        .replace("{job_description}", request.job_description.trim())
}

/// First `max` characters, with an ellipsis when anything was cut.
fn excerpt(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn build_gap_suggestion_prompt(request: &GapSuggestionRequest) -> String {
    let doc = &request.document;
    let skills = doc.skill_labels();
    let skills: Vec<&str> = skills.iter().take(GAP_SUGGESTION_SKILLS).map(String::as_str).collect();
    let resume_context = match non_blank(&doc.job_title) {
        Some(title) => format!("{title} - {}", skills.join(", ")),
        None => skills.join(", "),
    };
    GAP_SUGGESTION_TEMPLATE
        .replace("{resume_context}", &resume_context)
        .replace("{gap}", request.gap.trim())
}

pub fn build_ats_audit_prompt(request: &JobContextRequest) -> Result<String, LlmError> {
    let resume_json = serde_json::to_string(&request.document)?;
    Ok(ATS_AUDIT_TEMPLATE
        .replace("{job_description}", &excerpt(&request.job_description, ATS_JOB_DESCRIPTION_CHARS))
        .replace("{resume_json}", &resume_json))
}

pub fn build_interview_questions_prompt(request: &JobContextRequest) -> String {
    let doc = &request.document;
    INTERVIEW_QUESTIONS_TEMPLATE
        .replace("{job_title}", non_blank(&doc.job_title).unwrap_or("Candidate"))
        .replace("{skills}", &doc.skill_labels().join(", "))
        .replace(
            "{job_description}",
            &excerpt(&request.job_description, INTERVIEW_JOB_DESCRIPTION_CHARS),
        )
}

pub fn build_trends_prompt(job_title: &str, year: i32) -> String {
    TRENDS_RESEARCH_TEMPLATE
        .replace("{year}", &year.to_string())
        .replace("{job_title}", job_title.trim())
}

// ────────────────────────────────────────────────────────────────────────────
// Generation
// ────────────────────────────────────────────────────────────────────────────

pub async fn generate_resume(request: &GenerateResumeRequest, llm: &LlmClient) -> Result<Document, LlmError> {
    let prompt = build_resume_prompt(request);
    let document: Document = llm.call_json(&prompt, RESUME_SYSTEM, None).await?;

    info!(
        experience = document.experience.len(),
        skills = document.skills.len(),
        revision = request.applied_suggestion.is_some(),
        "Generated resume"
    );
    Ok(document)
}

/// Streams the letter; `on_delta` sees each chunk as it arrives and the
/// trimmed full letter is returned at the end.
pub async fn stream_cover_letter<F>(
    request: &CoverLetterRequest,
    llm: &LlmClient,
    mut on_delta: F,
) -> Result<String, LlmError>
where
    F: FnMut(&str) + Send,
{
    let prompt = build_cover_letter_prompt(request);
    let mut received = 0usize;
    let letter = llm
        .stream_text(&prompt, COVER_LETTER_SYSTEM, COVER_LETTER_TEMPERATURE, |delta| {
            received += delta.len();
            debug!(received, "Cover letter chunk");
            on_delta(delta);
        })
        .await?;

    info!(chars = letter.len(), tone = ?request.tone, "Generated cover letter");
    Ok(letter.trim().to_string())
}

pub async fn suggest_for_gap(request: &GapSuggestionRequest, llm: &LlmClient) -> Result<String, LlmError> {
    let prompt = build_gap_suggestion_prompt(request);
    let suggestion = llm
        .call_text(&prompt, COACH_SYSTEM, Some(GAP_SUGGESTION_TEMPERATURE))
        .await?;
    debug!(chars = suggestion.len(), "Generated gap suggestion");
    Ok(suggestion)
}

pub async fn run_ats_audit(request: &JobContextRequest, llm: &LlmClient) -> Result<AtsAuditResult, LlmError> {
    let prompt = build_ats_audit_prompt(request)?;
    let mut audit: AtsAuditResult = llm.call_json(&prompt, ANALYST_SYSTEM, None).await?;
    audit.parseability_score = if audit.parseability_score.is_finite() {
        audit.parseability_score.clamp(0.0, 100.0)
    } else {
        0.0
    };
    info!(
        score = audit.parseability_score,
        missing = audit.missing_critical_keywords.len(),
        status = ?audit.estimated_human_review_status,
        "ATS audit complete"
    );
    Ok(audit)
}

pub async fn generate_interview_questions(
    request: &JobContextRequest,
    llm: &LlmClient,
) -> Result<Vec<String>, LlmError> {
    let prompt = build_interview_questions_prompt(request);
    let questions: Vec<String> = llm
        .call_json(&prompt, ANALYST_SYSTEM, Some(INTERVIEW_QUESTIONS_TEMPERATURE))
        .await?;
    let questions: Vec<String> = questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();
    if questions.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    Ok(questions)
}

pub async fn research_industry_trends(job_title: &str, year: i32, llm: &LlmClient) -> Result<String, LlmError> {
    let prompt = build_trends_prompt(job_title, year);
    llm.call_text(&prompt, COACH_SYSTEM, None).await
}
