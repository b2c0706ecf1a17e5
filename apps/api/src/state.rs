use std::sync::Arc;

use crate::export::inflight::InFlightRegistry;
use crate::export::pipeline::ExportPipeline;
use crate::export::strategy::{ExportStrategy, PrintStrategy, RasterStrategy, StrategyKind};
use crate::layout::preview::PreviewConfig;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub pipeline: ExportPipeline,
    pub raster: Arc<RasterStrategy>,
    pub print: Arc<PrintStrategy>,
    /// One export per document id at a time.
    pub in_flight: InFlightRegistry,
    pub preview: PreviewConfig,
}

impl AppState {
    /// Owned handle, so an export can run detached from the request future.
    pub fn strategy(&self, kind: StrategyKind) -> Arc<dyn ExportStrategy> {
        match kind {
            StrategyKind::Raster => self.raster.clone(),
            StrategyKind::Print => self.print.clone(),
        }
    }
}
