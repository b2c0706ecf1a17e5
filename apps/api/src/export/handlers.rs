//! Axum route handlers for export, preview and plain-text copy.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::filename::{artifact_filename, ArtifactFormat};
use crate::export::inflight::InFlightGuard;
use crate::export::pipeline::ExportOrder;
use crate::export::strategy::{Artifact, CancelFlag, StrategyKind};
use crate::export::text::format_resume_text;
use crate::layout::fit::{estimate, ExportPlan, PlanKind};
use crate::layout::geometry::PageGeometry;
use crate::layout::preview::{PreviewAction, PreviewScaler, PreviewState};
use crate::layout::renderer::{render, render_cover_letter};
use crate::layout::visual_tree::VisualTree;
use crate::models::document::Document;
use crate::models::settings::{DocumentKind, RenderSettings};
use crate::state::AppState;

/// Characters left unescaped in an RFC 5987 `filename*` value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const PAGE_COUNT_HEADER: HeaderName = HeaderName::from_static("x-page-count");

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PlanRequestBody {
    pub document: Document,
    #[serde(default)]
    pub settings: RenderSettings,
    #[serde(default)]
    pub kind: DocumentKind,
    /// Letter body, required when `kind` is `cover-letter`.
    #[serde(default)]
    pub letter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan: ExportPlan,
    pub natural_height: f32,
    pub page_width: f32,
    pub page_height: f32,
}

#[derive(Debug, Deserialize)]
pub struct ResumeExportRequest {
    pub document_id: Uuid,
    pub document: Document,
    #[serde(default)]
    pub settings: RenderSettings,
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Overrides the résumé default of scale-to-fit.
    #[serde(default)]
    pub plan: Option<PlanKind>,
    /// Download name; sanitized like the candidate name it replaces.
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoverLetterExportRequest {
    pub document_id: Uuid,
    /// Supplies the sender block and the filename.
    pub document: Document,
    pub letter: String,
    #[serde(default)]
    pub settings: RenderSettings,
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub state: Option<PreviewState>,
    #[serde(flatten)]
    pub action: PreviewAction,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub document: Document,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Renders off the async threads; layout measures every run of text.
async fn render_tree(
    document: Document,
    letter: Option<String>,
    settings: RenderSettings,
    geometry: PageGeometry,
) -> Result<VisualTree, AppError> {
    let tree = tokio::task::spawn_blocking(move || match letter {
        Some(letter) => {
            let today = chrono::Local::now().date_naive();
            render_cover_letter(&letter, &document, today, settings, geometry)
        }
        None => render(&document, settings, geometry),
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?;
    Ok(tree)
}

/// `attachment` with a quoted ASCII fallback and the exact UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(filename, ATTR_CHAR);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Runs the export on its own task. Dropping the request future (client gone)
/// trips the cancel flag, and the task stops at the next slice and releases
/// the surface and the in-flight claim.
async fn run_detached(
    state: &AppState,
    order: ExportOrder,
    strategy: StrategyKind,
    claim: InFlightGuard,
) -> Result<Artifact, AppError> {
    let _cancel = order.cancel.cancel_on_drop();
    let pipeline = state.pipeline.clone();
    let strategy = state.strategy(strategy);
    let artifact = tokio::spawn(async move {
        let _claim = claim;
        pipeline.export(order, strategy.as_ref()).await
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))??;
    Ok(artifact)
}

fn artifact_response(artifact: Artifact) -> Result<Response, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(artifact.content_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&artifact.filename))
            .map_err(|e| AppError::Internal(e.into()))?,
    );
    headers.insert(PAGE_COUNT_HEADER, HeaderValue::from(artifact.pages));
    Ok((headers, artifact.bytes).into_response())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/export/plan
///
/// Measures the unscaled tree and returns the plan an export would use.
pub async fn handle_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequestBody>,
) -> Result<Json<PlanResponse>, AppError> {
    let geometry = state.pipeline.geometry;
    let letter = match request.kind {
        DocumentKind::Resume => None,
        DocumentKind::CoverLetter => Some(request.letter.ok_or_else(|| {
            AppError::Validation("letter is required for a cover letter plan".to_string())
        })?),
    };
    let tree = render_tree(request.document, letter, request.settings, geometry).await?;
    if tree.is_empty() {
        return Err(AppError::NothingToExport(
            "The document has no content to export".to_string(),
        ));
    }

    let plan = estimate(&tree, geometry, PlanKind::for_document(request.kind), &state.pipeline.fit);
    Ok(Json(PlanResponse {
        plan,
        natural_height: tree.height,
        page_width: geometry.width_px(),
        page_height: geometry.height_px(),
    }))
}

/// POST /api/v1/export/resume
///
/// Single page scaled to fit by default. Raster returns a PDF; print returns
/// the print document after handing it to the print host.
pub async fn handle_export_resume(
    State(state): State<AppState>,
    Json(request): Json<ResumeExportRequest>,
) -> Result<Response, AppError> {
    let claim = state
        .in_flight
        .try_begin(request.document_id)
        .ok_or(AppError::ExportInProgress)?;

    info!(
        document_id = %request.document_id,
        strategy = ?request.strategy,
        template = ?request.settings.template,
        "Resume export requested"
    );

    let name = request.document.name.clone();
    let tree = render_tree(request.document, None, request.settings, state.pipeline.geometry).await?;
    let plan = request.plan.unwrap_or(PlanKind::for_document(DocumentKind::Resume));

    let order = ExportOrder {
        tree,
        plan,
        name,
        file_name: request.filename,
        kind: DocumentKind::Resume,
        cancel: CancelFlag::default(),
    };
    let artifact = run_detached(&state, order, request.strategy, claim).await?;
    artifact_response(artifact)
}

/// POST /api/v1/export/cover-letter
///
/// Always paginated; a letter is never shrunk.
pub async fn handle_export_cover_letter(
    State(state): State<AppState>,
    Json(request): Json<CoverLetterExportRequest>,
) -> Result<Response, AppError> {
    if request.letter.trim().is_empty() {
        return Err(AppError::NothingToExport(
            "Generate a cover letter before exporting".to_string(),
        ));
    }
    let claim = state
        .in_flight
        .try_begin(request.document_id)
        .ok_or(AppError::ExportInProgress)?;

    info!(
        document_id = %request.document_id,
        strategy = ?request.strategy,
        "Cover letter export requested"
    );

    let name = request.document.name.clone();
    let tree = render_tree(
        request.document,
        Some(request.letter),
        request.settings,
        state.pipeline.geometry,
    )
    .await?;

    let order = ExportOrder {
        tree,
        plan: PlanKind::for_document(DocumentKind::CoverLetter),
        name,
        file_name: request.filename,
        kind: DocumentKind::CoverLetter,
        cancel: CancelFlag::default(),
    };
    let artifact = run_detached(&state, order, request.strategy, claim).await?;
    artifact_response(artifact)
}

/// POST /api/v1/preview/scale
///
/// One preview zoom step. The client carries the returned state into the next call.
pub async fn handle_preview_scale(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewState>, AppError> {
    if let PreviewAction::Fit { container_width } | PreviewAction::Reset { container_width } = request.action {
        if !container_width.is_finite() || container_width <= 0.0 {
            return Err(AppError::Validation(
                "container_width must be a positive number".to_string(),
            ));
        }
    }

    let page_width = state.pipeline.geometry.width_px();
    let mut scaler = match request.state {
        Some(current) => PreviewScaler::from_state(state.preview, page_width, current),
        None => PreviewScaler::new(state.preview, page_width),
    };
    Ok(Json(scaler.apply(request.action)))
}

/// POST /api/v1/resumes/text
pub async fn handle_resume_text(Json(request): Json<TextRequest>) -> Result<Response, AppError> {
    if request.document.is_blank() {
        return Err(AppError::NothingToExport(
            "The document has no content to copy".to_string(),
        ));
    }
    let text = format_resume_text(&request.document);
    let filename = artifact_filename(&request.document.name, DocumentKind::Resume, ArtifactFormat::Text);
    let disposition =
        HeaderValue::from_str(&content_disposition(&filename)).map_err(|e| AppError::Internal(e.into()))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
    )
        .into_response())
}
