mod config;
mod errors;
mod export;
mod generation;
mod layout;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::export::assets::FileAssetSource;
use crate::export::inflight::InFlightRegistry;
use crate::export::pipeline::ExportPipeline;
use crate::export::print::SpoolPrintHost;
use crate::export::strategy::{PrintStrategy, RasterStrategy};
use crate::export::surface::SurfaceRegistry;
use crate::layout::geometry::PageGeometry;
use crate::layout::preview::PreviewConfig;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Artisan API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let mut llm = LlmClient::new(config.anthropic_api_key.clone())?;
    if let Some(url) = &config.anthropic_api_url {
        info!("LLM endpoint: {url}");
        llm = llm.with_api_url(url.clone());
    }
    if llm.has_credential() {
        info!("LLM client initialized (model: {})", llm_client::MODEL);
    } else {
        warn!("ANTHROPIC_API_KEY is not set; generation endpoints will return credential errors");
    }

    let geometry = PageGeometry::for_paper(config.paper);
    info!(
        paper = ?config.paper,
        width_px = geometry.width_px(),
        height_px = geometry.height_px(),
        floor = config.fit.readability_floor,
        slice_mode = ?config.fit.slice_mode,
        "Export geometry configured"
    );

    // Print spool directory must exist before the first handoff
    tokio::fs::create_dir_all(&config.print_spool_dir).await?;
    info!("Print spool: {}", config.print_spool_dir.display());

    let assets = Arc::new(FileAssetSource::new(config.font_dir.clone()));
    let pipeline = ExportPipeline {
        assets,
        surfaces: SurfaceRegistry::new(),
        geometry,
        fit: config.fit,
        asset_ceiling: config.asset_timeout,
    };

    // Build app state
    let state = AppState {
        llm,
        pipeline,
        raster: Arc::new(RasterStrategy::new(config.fit.raster_scale)),
        print: Arc::new(PrintStrategy {
            host: Arc::new(SpoolPrintHost::new(config.print_spool_dir.clone())),
            cleanup_after: config.print_cleanup,
        }),
        in_flight: InFlightRegistry::default(),
        preview: PreviewConfig::default(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
