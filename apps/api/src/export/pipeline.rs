//! Export pipeline: tree → asset gate → plan → strategy → artifact.
//!
//! The pipeline owns the detached tree for the whole export, acquires the
//! offscreen surface before any work and hands it to the strategy, which
//! releases it on every exit path. Errors are logged here with their cause;
//! callers only see the typed error.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::export::assets::{await_ready, AssetSource, Outcome};
use crate::export::strategy::{Artifact, CancelFlag, ExportJob, ExportStrategy, StrategyKind};
use crate::export::surface::SurfaceRegistry;
use crate::export::ExportError;
use crate::layout::fit::{estimate, FitConfig, PlanKind};
use crate::layout::geometry::PageGeometry;
use crate::layout::visual_tree::VisualTree;
use crate::models::settings::DocumentKind;

pub struct ExportOrder {
    pub tree: VisualTree,
    /// Measured after the asset gate.
    pub plan: PlanKind,
    /// Candidate name, used for the document title and the default filename.
    pub name: String,
    pub file_name: Option<String>,
    pub kind: DocumentKind,
    pub cancel: CancelFlag,
}

#[derive(Clone)]
pub struct ExportPipeline {
    pub assets: Arc<dyn AssetSource>,
    pub surfaces: SurfaceRegistry,
    pub geometry: PageGeometry,
    pub fit: FitConfig,
    pub asset_ceiling: Duration,
}

impl ExportPipeline {
    pub async fn export(&self, order: ExportOrder, strategy: &dyn ExportStrategy) -> Result<Artifact, ExportError> {
        let export_id = Uuid::new_v4();
        let ExportOrder {
            tree,
            plan,
            name,
            file_name,
            kind,
            cancel,
        } = order;

        if tree.is_empty() {
            info!(%export_id, "Export requested for an empty document");
            return Err(ExportError::NothingToExport);
        }

        let purpose = match strategy.kind() {
            StrategyKind::Raster => "raster",
            StrategyKind::Print => "print",
        };
        let lease = self.surfaces.acquire(export_id, purpose);
        let tree = Arc::new(tree);

        let assets = await_ready(Arc::clone(&self.assets), &tree, self.asset_ceiling).await;
        if !assets.all_loaded() {
            let missing: Vec<&str> = assets
                .settlements
                .iter()
                .filter(|s| s.outcome != Outcome::Loaded)
                .map(|s| s.asset.as_str())
                .collect();
            warn!(%export_id, ?missing, "Exporting with placeholder assets");
        }

        let (measured, geometry, fit) = (Arc::clone(&tree), self.geometry, self.fit);
        let plan = tokio::task::spawn_blocking(move || estimate(&measured, geometry, plan, &fit)).await?;

        info!(
            %export_id,
            strategy = purpose,
            pages = plan.page_count(),
            natural_height = tree.height,
            "Executing export plan"
        );

        let job = ExportJob {
            export_id,
            tree,
            plan,
            assets: Arc::new(assets),
            geometry: self.geometry,
            name,
            file_name,
            kind,
            cancel,
        };
        match strategy.execute(job, lease).await {
            Ok(artifact) => {
                info!(%export_id, filename = %artifact.filename, pages = artifact.pages, "Export complete");
                Ok(artifact)
            }
            Err(e) => {
                error!(%export_id, "Export failed: {e}");
                Err(e)
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::assets::tests::{tree_with_images, ScriptedSource};
    use crate::export::print::{PrintHost, PrintJob, PrintReceipt, SpoolPrintHost};
    use crate::export::raster::RasterParams;
    use crate::export::strategy::{PrintStrategy, RasterStrategy};
    use crate::export::surface::SurfaceLease;
    use crate::layout::renderer::render;
    use crate::layout::renderer::tests::{long_document, sample_document};
    use crate::models::document::Document;
    use crate::models::settings::RenderSettings;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn pipeline(source: Arc<dyn AssetSource>) -> ExportPipeline {
        ExportPipeline {
            assets: source,
            surfaces: SurfaceRegistry::new(),
            geometry: PageGeometry::A4,
            fit: FitConfig {
                raster_scale: 1.0,
                ..FitConfig::default()
            },
            asset_ceiling: Duration::from_secs(10),
        }
    }

    fn quiet_source() -> Arc<dyn AssetSource> {
        Arc::new(ScriptedSource {
            delays: HashMap::new(),
            events: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn order(tree: VisualTree, plan: PlanKind) -> ExportOrder {
        ExportOrder {
            tree,
            plan,
            name: "Ada Lovelace".to_string(),
            file_name: None,
            kind: DocumentKind::Resume,
            cancel: CancelFlag::default(),
        }
    }

    /// Records when it runs relative to asset settlement.
    struct RecordingStrategy {
        events: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ExportStrategy for RecordingStrategy {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Raster
        }

        async fn execute(&self, job: ExportJob, lease: SurfaceLease) -> Result<Artifact, ExportError> {
            self.events.lock().unwrap().push("raster".to_string());
            assert_eq!(job.assets.images.len(), 1);
            lease.release();
            Ok(Artifact {
                filename: "x.pdf".to_string(),
                content_type: "application/pdf",
                bytes: bytes::Bytes::new(),
                pages: job.plan.page_count(),
            })
        }
    }

    struct FailingHost;

    #[async_trait]
    impl PrintHost for FailingHost {
        async fn submit(&self, _job: PrintJob) -> Result<PrintReceipt, ExportError> {
            Err(ExportError::Print("no printer attached".to_string()))
        }

        async fn discard(&self, _receipt: &PrintReceipt) -> Result<(), ExportError> {
            panic!("nothing was submitted");
        }
    }

    #[tokio::test]
    async fn test_empty_tree_fails_fast_without_surface() {
        let p = pipeline(quiet_source());
        let tree = render(&Document::default(), RenderSettings::default(), PageGeometry::A4);
        let err = p
            .export(order(tree, PlanKind::ScaleToFit), &RasterStrategy::new(1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NothingToExport));
        assert_eq!(p.surfaces.released_count(), 0);
        assert_eq!(p.surfaces.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_image_settles_before_raster() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let source = Arc::new(ScriptedSource {
            delays: HashMap::from([("https://slow.example/a.png".to_string(), Duration::from_secs(5))]),
            events: Arc::clone(&events),
        });
        let p = pipeline(source);
        let strategy = RecordingStrategy {
            events: Arc::clone(&events),
        };
        let tree = tree_with_images(&["https://slow.example/a.png"]);
        p.export(order(tree, PlanKind::ScaleToFit), &strategy)
            .await
            .unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec!["settled:https://slow.example/a.png", "raster"]
        );
    }

    #[tokio::test]
    async fn test_single_page_resume_exports_one_page() {
        let p = pipeline(quiet_source());
        let tree = render(&sample_document(), RenderSettings::default(), PageGeometry::A4);
        let artifact = p
            .export(order(tree, PlanKind::ScaleToFit), &RasterStrategy::new(1.0))
            .await
            .unwrap();
        assert_eq!(artifact.pages, 1);
        assert_eq!(artifact.filename, "Ada_Lovelace.pdf");
        assert!(artifact.bytes.starts_with(b"%PDF"));
        assert_eq!(p.surfaces.released_count(), 1);
        assert_eq!(p.surfaces.live_count(), 0);
    }

    #[tokio::test]
    async fn test_paginated_export_emits_one_page_per_slice() {
        let p = pipeline(quiet_source());
        let tree = render(&long_document(), RenderSettings::default(), PageGeometry::A4);
        let plan = estimate(&tree, PageGeometry::A4, PlanKind::Paginated, &p.fit);
        assert_eq!(plan.page_count(), 4);
        let mut o = order(tree, PlanKind::Paginated);
        o.kind = DocumentKind::CoverLetter;
        let artifact = p.export(o, &RasterStrategy::new(1.0)).await.unwrap();
        assert_eq!(artifact.pages, 4);
        assert_eq!(artifact.filename, "Ada_Lovelace_CL.pdf");
        let pdf = lopdf::Document::load_mem(&artifact.bytes).unwrap();
        assert_eq!(pdf.get_pages().len(), 4);
    }

    #[tokio::test]
    async fn test_requested_filename_is_sanitized() {
        let p = pipeline(quiet_source());
        let tree = render(&sample_document(), RenderSettings::default(), PageGeometry::A4);
        let mut o = order(tree, PlanKind::ScaleToFit);
        o.file_name = Some("../My CV (final).pdf".to_string());
        let artifact = p.export(o, &RasterStrategy::new(1.0)).await.unwrap();
        assert_eq!(artifact.filename, "My_CV_final.pdf");
    }

    #[tokio::test]
    async fn test_raster_failure_releases_surface_exactly_once() {
        let p = pipeline(quiet_source());
        let tree = render(&sample_document(), RenderSettings::default(), PageGeometry::A4);
        let strategy = RasterStrategy {
            params: RasterParams {
                raster_scale: 1.0,
                max_canvas_pixels: 100,
            },
            jpeg_quality: 90,
        };
        let err = p
            .export(order(tree, PlanKind::ScaleToFit), &strategy)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::CanvasTooLarge { .. }));
        assert_eq!(p.surfaces.released_count(), 1);
        assert_eq!(p.surfaces.live_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_export_stops_and_cleans_up() {
        let p = pipeline(quiet_source());
        let tree = render(&long_document(), RenderSettings::default(), PageGeometry::A4);
        let o = order(tree, PlanKind::Paginated);
        o.cancel.cancel();
        let err = p.export(o, &RasterStrategy::new(1.0)).await.unwrap_err();
        assert!(matches!(err, ExportError::Cancelled));
        assert_eq!(p.surfaces.released_count(), 1);
        assert_eq!(p.surfaces.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_print_host_failure_is_non_blocking() {
        let p = pipeline(quiet_source());
        let tree = render(&long_document(), RenderSettings::default(), PageGeometry::A4);
        let strategy = PrintStrategy {
            host: Arc::new(FailingHost),
            cleanup_after: Duration::from_secs(60),
        };
        let artifact = p
            .export(order(tree, PlanKind::ScaleToFit), &strategy)
            .await
            .unwrap();
        assert_eq!(artifact.filename, "Ada_Lovelace.html");
        let html = std::str::from_utf8(&artifact.bytes).unwrap();
        assert!(html.contains("transform: scale(0."));
        assert_eq!(p.surfaces.live_count(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(p.surfaces.live_count(), 0);
        assert_eq!(p.surfaces.released_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spooled_print_document_removed_after_cleanup_window() {
        let spool = tempfile::tempdir().unwrap();
        let p = pipeline(quiet_source());
        let tree = render(&sample_document(), RenderSettings::default(), PageGeometry::A4);
        let strategy = PrintStrategy {
            host: Arc::new(SpoolPrintHost::new(spool.path().to_path_buf())),
            cleanup_after: Duration::from_secs(60),
        };
        p.export(order(tree, PlanKind::ScaleToFit), &strategy).await.unwrap();
        let spooled = || std::fs::read_dir(spool.path()).unwrap().count();
        assert_eq!(spooled(), 1);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(spooled(), 1);
        assert_eq!(p.surfaces.live_count(), 1);

        // Removal runs on the blocking pool; give it a few turns after the window.
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if spooled() == 0 {
                break;
            }
        }
        assert_eq!(spooled(), 0);
        assert_eq!(p.surfaces.live_count(), 0);
    }
}
