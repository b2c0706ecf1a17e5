//! Axum route handlers for the Generation API.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Datelike;
use futures::{channel::mpsc, Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::generation::generator::{
    generate_interview_questions, generate_resume, research_industry_trends, run_ats_audit, stream_cover_letter,
    suggest_for_gap, AtsAuditResult, CoverLetterRequest, GapSuggestionRequest, GenerateResumeRequest,
    IndustryTrendsRequest, JobContextRequest,
};
use crate::llm_client::LlmError;
use crate::models::document::Document;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestion: String,
}

#[derive(Debug, Serialize)]
pub struct InterviewQuestionsResponse {
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IndustryTrendsResponse {
    pub trends: String,
}

fn require_job_description(job_description: &str) -> Result<(), AppError> {
    if job_description.trim().is_empty() {
        return Err(AppError::Validation("job_description cannot be empty".to_string()));
    }
    Ok(())
}

fn require_document(document: &Document, action: &str) -> Result<(), AppError> {
    if document.is_blank() {
        return Err(AppError::Validation(format!("Generate a resume before {action}")));
    }
    Ok(())
}

/// POST /api/v1/resumes/generate
///
/// Turns raw résumé text (plus optional job description, applied suggestion
/// and trend hints) into a structured `Document`.
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    Json(request): Json<GenerateResumeRequest>,
) -> Result<Json<Document>, AppError> {
    if request.raw_text.trim().is_empty() {
        return Err(AppError::Validation("raw_text cannot be empty".to_string()));
    }

    let document = generate_resume(&request, &state.llm).await?;
    Ok(Json(document))
}

/// POST /api/v1/cover-letters/generate
///
/// Server-sent events: one `delta` per text chunk (`{"text"}`), then either
/// `done` (`{"letter", "tone"}`) or `error` (`{"code", "message"}`).
/// Validation and a missing API key are still reported as plain JSON errors
/// before the stream opens.
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    Json(request): Json<CoverLetterRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    require_job_description(&request.job_description)?;
    require_document(&request.document, "writing a cover letter")?;
    if !state.llm.has_credential() {
        return Err(LlmError::MissingCredential.into());
    }

    let (tx, rx) = mpsc::unbounded::<Event>();
    tokio::spawn(async move {
        let deltas = tx.clone();
        let result = stream_cover_letter(&request, &state.llm, |text| {
            if let Some(event) = sse_event("delta", json!({ "text": text })) {
                // A closed channel means the client went away; the letter still completes.
                let _ = deltas.unbounded_send(event);
            }
        })
        .await;

        let last = match result {
            Ok(letter) => sse_event("done", json!({ "letter": letter, "tone": request.tone })),
            Err(e) => {
                let (_, code, message) = AppError::from(e).parts();
                sse_event("error", json!({ "code": code, "message": message }))
            }
        };
        if let Some(event) = last {
            let _ = tx.unbounded_send(event);
        }
        debug!("Cover letter stream closed");
    });

    Ok(Sse::new(rx.map(Ok::<_, Infallible>)).keep_alive(KeepAlive::default()))
}

fn sse_event(name: &str, payload: serde_json::Value) -> Option<Event> {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(event = name, error = %e, "Dropping unserializable SSE event");
            None
        }
    }
}

/// POST /api/v1/resumes/suggestion
pub async fn handle_gap_suggestion(
    State(state): State<AppState>,
    Json(request): Json<GapSuggestionRequest>,
) -> Result<Json<SuggestionResponse>, AppError> {
    if request.gap.trim().is_empty() {
        return Err(AppError::Validation("gap cannot be empty".to_string()));
    }
    require_document(&request.document, "asking for a suggestion")?;

    let suggestion = suggest_for_gap(&request, &state.llm).await?;
    Ok(Json(SuggestionResponse { suggestion }))
}

/// POST /api/v1/resumes/ats-audit
pub async fn handle_ats_audit(
    State(state): State<AppState>,
    Json(request): Json<JobContextRequest>,
) -> Result<Json<AtsAuditResult>, AppError> {
    require_job_description(&request.job_description)?;
    require_document(&request.document, "running an ATS audit")?;

    let audit = run_ats_audit(&request, &state.llm).await?;
    Ok(Json(audit))
}

/// POST /api/v1/interview-questions
pub async fn handle_interview_questions(
    State(state): State<AppState>,
    Json(request): Json<JobContextRequest>,
) -> Result<Json<InterviewQuestionsResponse>, AppError> {
    require_job_description(&request.job_description)?;
    require_document(&request.document, "preparing interview questions")?;

    let questions = generate_interview_questions(&request, &state.llm).await?;
    Ok(Json(InterviewQuestionsResponse { questions }))
}

/// POST /api/v1/industry-trends
///
/// Trends are an optional hint for résumé generation, so any failure other
/// than a rejected key yields an empty string instead of an error.
pub async fn handle_industry_trends(
    State(state): State<AppState>,
    Json(request): Json<IndustryTrendsRequest>,
) -> Result<Json<IndustryTrendsResponse>, AppError> {
    if request.job_title.trim().is_empty() {
        return Err(AppError::Validation("job_title cannot be empty".to_string()));
    }

    let year = chrono::Utc::now().year();
    let trends = match research_industry_trends(&request.job_title, year, &state.llm).await {
        Ok(trends) => trends,
        Err(e) if e.is_credential() => return Err(e.into()),
        Err(e) => {
            warn!(job_title = %request.job_title, error = %e, "Industry trend research failed");
            String::new()
        }
    };
    Ok(Json(IndustryTrendsResponse { trends }))
}
