pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::export::handlers as export;
use crate::generation::handlers as generation;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation API
        .route(
            "/api/v1/resumes/generate",
            post(generation::handle_generate_resume),
        )
        .route(
            "/api/v1/cover-letters/generate",
            post(generation::handle_generate_cover_letter),
        )
        .route(
            "/api/v1/resumes/suggestion",
            post(generation::handle_gap_suggestion),
        )
        .route("/api/v1/resumes/ats-audit", post(generation::handle_ats_audit))
        .route(
            "/api/v1/interview-questions",
            post(generation::handle_interview_questions),
        )
        .route(
            "/api/v1/industry-trends",
            post(generation::handle_industry_trends),
        )
        // Export API
        .route("/api/v1/export/plan", post(export::handle_plan))
        .route("/api/v1/export/resume", post(export::handle_export_resume))
        .route(
            "/api/v1/export/cover-letter",
            post(export::handle_export_cover_letter),
        )
        // Preview and copy
        .route("/api/v1/preview/scale", post(export::handle_preview_scale))
        .route("/api/v1/resumes/text", post(export::handle_resume_text))
        .with_state(state)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
