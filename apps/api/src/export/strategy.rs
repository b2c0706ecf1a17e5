//! Export strategies: how a plan turns into an artifact.
//!
//! `RasterStrategy` draws pages with tiny-skia and assembles a PDF.
//! `PrintStrategy` builds a print document and hands it to a `PrintHost`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::export::assets::ReadyAssets;
use crate::export::filename::{artifact_filename, requested_stem, ArtifactFormat};
use crate::export::pdf::{PageImage, PdfBuilder};
use crate::export::print::{build_print_document, PrintHost, PrintJob};
use crate::export::raster::{encode_jpeg, render_scaled_page, render_slice_page, RasterParams};
use crate::export::surface::SurfaceLease;
use crate::export::ExportError;
use crate::layout::fit::ExportPlan;
use crate::layout::geometry::PageGeometry;
use crate::layout::visual_tree::VisualTree;
use crate::models::settings::DocumentKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Raster,
    Print,
}

/// Cooperative cancellation, checked between slices.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Guard that cancels the flag when dropped. Held by the request future,
    /// so a client that goes away stops a detached export at the next slice.
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

pub struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Everything a strategy needs, owned by the export.
pub struct ExportJob {
    pub export_id: Uuid,
    pub tree: Arc<VisualTree>,
    pub plan: ExportPlan,
    pub assets: Arc<ReadyAssets>,
    pub geometry: PageGeometry,
    pub name: String,
    /// Caller-chosen download name; the candidate name is used otherwise.
    pub file_name: Option<String>,
    pub kind: DocumentKind,
    pub cancel: CancelFlag,
}

impl ExportJob {
    pub fn filename(&self, format: ArtifactFormat) -> String {
        let stem = match &self.file_name {
            Some(requested) => requested_stem(requested),
            None => self.name.as_str(),
        };
        artifact_filename(stem, self.kind, format)
    }
}

#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
    pub pages: usize,
}

#[async_trait]
pub trait ExportStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Executes the plan. The strategy owns `lease` and must release it (drop
    /// counts) on every path.
    async fn execute(&self, job: ExportJob, lease: SurfaceLease) -> Result<Artifact, ExportError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Raster
// ────────────────────────────────────────────────────────────────────────────

pub struct RasterStrategy {
    pub params: RasterParams,
    pub jpeg_quality: u8,
}

impl RasterStrategy {
    pub fn new(raster_scale: f32) -> Self {
        Self {
            params: RasterParams {
                raster_scale,
                max_canvas_pixels: 40_000_000,
            },
            jpeg_quality: 92,
        }
    }
}

#[async_trait]
impl ExportStrategy for RasterStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Raster
    }

    async fn execute(&self, job: ExportJob, lease: SurfaceLease) -> Result<Artifact, ExportError> {
        let params = self.params;
        let quality = self.jpeg_quality;
        let mut pages: Vec<PageImage> = Vec::new();

        match &job.plan {
            ExportPlan::SinglePageScaled { scale_factor, .. } => {
                let (tree, assets, geometry, scale) =
                    (Arc::clone(&job.tree), Arc::clone(&job.assets), job.geometry, *scale_factor);
                let page = tokio::task::spawn_blocking(move || {
                    let pixmap = render_scaled_page(&tree, &assets, geometry, scale, &params)?;
                    Ok::<_, ExportError>(PageImage {
                        jpeg: encode_jpeg(&pixmap, quality)?,
                        width: pixmap.width(),
                        height: pixmap.height(),
                    })
                })
                .await??;
                pages.push(page);
            }
            ExportPlan::Paginated { slices, .. } => {
                for (index, slice) in slices.iter().copied().enumerate() {
                    if job.cancel.is_cancelled() {
                        debug!(export_id = %job.export_id, index, "Export cancelled between slices");
                        return Err(ExportError::Cancelled);
                    }
                    let (tree, assets, geometry) =
                        (Arc::clone(&job.tree), Arc::clone(&job.assets), job.geometry);
                    let page = tokio::task::spawn_blocking(move || {
                        let pixmap = render_slice_page(&tree, &assets, geometry, slice, &params)?;
                        Ok::<_, ExportError>(PageImage {
                            jpeg: encode_jpeg(&pixmap, quality)?,
                            width: pixmap.width(),
                            height: pixmap.height(),
                        })
                    })
                    .await??;
                    pages.push(page);
                    tokio::task::yield_now().await;
                }
            }
        }

        let filename = job.filename(ArtifactFormat::Pdf);
        let title = filename.trim_end_matches(".pdf").to_string();
        let geometry = job.geometry;
        let (bytes, count) = tokio::task::spawn_blocking(move || {
            let mut pdf = PdfBuilder::new(geometry);
            for page in pages {
                pdf.add_page(page)?;
            }
            let count = pdf.page_count();
            Ok::<_, ExportError>((pdf.finish(&title)?, count))
        })
        .await??;

        lease.release();
        Ok(Artifact {
            filename,
            content_type: "application/pdf",
            bytes: Bytes::from(bytes),
            pages: count,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Print
// ────────────────────────────────────────────────────────────────────────────

pub struct PrintStrategy {
    pub host: Arc<dyn PrintHost>,
    /// How long the surface outlives the handoff when the host never reports back.
    pub cleanup_after: Duration,
}

#[async_trait]
impl ExportStrategy for PrintStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Print
    }

    async fn execute(&self, job: ExportJob, lease: SurfaceLease) -> Result<Artifact, ExportError> {
        let (scale, pages) = match &job.plan {
            ExportPlan::SinglePageScaled { scale_factor, .. } => (Some(*scale_factor), 1),
            ExportPlan::Paginated { slices, .. } => (None, slices.len()),
        };
        let filename = job.filename(ArtifactFormat::PrintHtml);
        let html = build_print_document(&job.tree, job.geometry, scale, job.name.trim());

        let receipt = match self
            .host
            .submit(PrintJob {
                export_id: lease.export_id(),
                filename: filename.clone(),
                html: html.clone(),
            })
            .await
        {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                warn!(export_id = %lease.export_id(), "Print host rejected the document: {e}");
                None
            }
        };

        // The host may never signal completion; surface and spooled copy go
        // after the timeout either way.
        let export_id = lease.export_id();
        let released = lease.release_after(self.cleanup_after);
        if let Some(receipt) = receipt {
            let host = Arc::clone(&self.host);
            tokio::spawn(async move {
                if released.await.is_err() {
                    warn!(%export_id, "Print surface release task failed");
                }
                if let Err(e) = host.discard(&receipt).await {
                    warn!(%export_id, "Could not discard print document: {e}");
                }
            });
        }

        Ok(Artifact {
            filename,
            content_type: "text/html; charset=utf-8",
            bytes: Bytes::from(html),
            pages,
        })
    }
}
