//! Asset-readiness gate.
//!
//! Every font and image a tree references is requested concurrently, and the
//! gate only returns once each one has *settled*: loaded, failed, or run past
//! the ceiling. A failed asset never blocks an export; the rasterizer falls
//! back to placeholder drawing for anything missing.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use thiserror::Error;
use tiny_skia::Pixmap;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::layout::font_metrics::{FontKey, Typeface, Weight};
use crate::layout::visual_tree::VisualTree;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Unsupported image source: {0}")]
    Unsupported(String),

    #[error("Malformed data URI")]
    MalformedDataUri,

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Refused image host: {0}")]
    RefusedHost(String),

    #[error("Image exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("Fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where asset bytes come from. The pipeline only sees this trait.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn load_font(&self, key: FontKey) -> Result<Arc<Vec<u8>>, AssetError>;
    async fn load_image(&self, source: &str) -> Result<Vec<u8>, AssetError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Settled assets
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Loaded,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub asset: String,
    pub outcome: Outcome,
}

/// Everything the gate managed to load, plus how each request settled.
#[derive(Default)]
pub struct ReadyAssets {
    pub fonts: HashMap<FontKey, Arc<Vec<u8>>>,
    pub images: HashMap<String, Arc<Pixmap>>,
    pub settlements: Vec<Settlement>,
}

impl ReadyAssets {
    pub fn all_loaded(&self) -> bool {
        self.settlements.iter().all(|s| s.outcome == Outcome::Loaded)
    }
}

enum Loaded {
    Font(FontKey, Arc<Vec<u8>>),
    Image(String, Arc<Pixmap>),
}

/// Awaits every asset referenced by `tree`. Each request is bounded by
/// `ceiling`; the gate itself never fails.
pub async fn await_ready(source: Arc<dyn AssetSource>, tree: &VisualTree, ceiling: Duration) -> ReadyAssets {
    let mut set: JoinSet<(String, Result<Option<Loaded>, AssetError>)> = JoinSet::new();

    for key in tree.font_keys() {
        let source = Arc::clone(&source);
        set.spawn(async move {
            let label = format!("font:{}", key.file_stem());
            match tokio::time::timeout(ceiling, source.load_font(key)).await {
                Ok(result) => (label, result.map(|bytes| Some(Loaded::Font(key, bytes)))),
                Err(_) => (label, Ok(None)),
            }
        });
    }

    for image in tree.image_sources() {
        let source = Arc::clone(&source);
        set.spawn(async move {
            let label = format!("image:{}", truncate_source(&image));
            let load = async {
                let bytes = source.load_image(&image).await?;
                let pixmap = tokio::task::spawn_blocking(move || decode_image(&bytes))
                    .await
                    .map_err(|e| AssetError::Decode(e.to_string()))??;
                Ok::<_, AssetError>(Loaded::Image(image.clone(), Arc::new(pixmap)))
            };
            match tokio::time::timeout(ceiling, load).await {
                Ok(result) => (label, result.map(Some)),
                Err(_) => (label, Ok(None)),
            }
        });
    }

    let mut ready = ReadyAssets::default();
    while let Some(joined) = set.join_next().await {
        let (asset, result) = match joined {
            Ok(settled) => settled,
            Err(e) => {
                warn!("Asset task failed to join: {e}");
                continue;
            }
        };
        let outcome = match result {
            Ok(Some(Loaded::Font(key, bytes))) => {
                ready.fonts.insert(key, bytes);
                Outcome::Loaded
            }
            Ok(Some(Loaded::Image(src, pixmap))) => {
                ready.images.insert(src, pixmap);
                Outcome::Loaded
            }
            Ok(None) => {
                warn!(asset = %asset, "Asset did not settle before the ceiling");
                Outcome::TimedOut
            }
            Err(e) => {
                warn!(asset = %asset, "Asset failed to load: {e}");
                Outcome::Failed(e.to_string())
            }
        };
        ready.settlements.push(Settlement { asset, outcome });
    }

    ready.settlements.sort_by(|a, b| a.asset.cmp(&b.asset));
    debug!(
        fonts = ready.fonts.len(),
        images = ready.images.len(),
        settled = ready.settlements.len(),
        "Asset gate settled"
    );
    ready
}

fn truncate_source(source: &str) -> String {
    if source.starts_with("data:") {
        source.split(',').next().unwrap_or("data:").to_string()
    } else {
        source.chars().take(96).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Image decoding
// ────────────────────────────────────────────────────────────────────────────

/// Decodes PNG or JPEG bytes into a premultiplied pixmap.
pub fn decode_image(data: &[u8]) -> Result<Pixmap, AssetError> {
    let decoded = image::load_from_memory(data).map_err(|e| AssetError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| AssetError::Decode("zero-sized image".to_string()))?;
    for (src, dst) in rgba.as_raw().chunks_exact(4).zip(pixmap.data_mut().chunks_exact_mut(4)) {
        let alpha = src[3];
        dst[0] = premultiply(src[0], alpha);
        dst[1] = premultiply(src[1], alpha);
        dst[2] = premultiply(src[2], alpha);
        dst[3] = alpha;
    }
    Ok(pixmap)
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

/// Decodes a base64 or plain `data:` URI payload.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or(AssetError::MalformedDataUri)?;
    if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|_| AssetError::MalformedDataUri)
    } else {
        Ok(percent_encoding::percent_decode_str(payload).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Remote image limits
// ────────────────────────────────────────────────────────────────────────────

/// Upper bound on a fetched image body.
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

/// False for loopback, private, link-local, shared (CGNAT), unspecified,
/// broadcast and documentation ranges. IPv4-mapped IPv6 is judged as IPv4.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || (a == 100 && (64..128).contains(&b))
                || a == 0)
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_public_ip(IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80)
        }
    }
}

/// Rejects a body whose declared length is already over `limit`.
fn check_declared_length(declared: Option<u64>, limit: usize) -> Result<(), AssetError> {
    match declared {
        Some(len) if len > limit as u64 => Err(AssetError::TooLarge { limit }),
        _ => Ok(()),
    }
}

/// Appends `chunk`, failing as soon as the body would pass `limit`.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], limit: usize) -> Result<(), AssetError> {
    if body.len() + chunk.len() > limit {
        return Err(AssetError::TooLarge { limit });
    }
    body.extend_from_slice(chunk);
    Ok(())
}

/// Resolves the URL's host and returns one public address to connect to.
/// Every resolved address must be public, so a name that maps to both a public
/// and an internal address is refused.
async fn resolve_public(url: &reqwest::Url) -> Result<SocketAddr, AssetError> {
    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AssetError::RefusedHost(truncate_source(url.as_str())))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| AssetError::RefusedHost(host.to_string()))?;

    let addrs: Vec<SocketAddr> = match host.parse::<IpAddr>() {
        Ok(ip) => vec![SocketAddr::new(ip, port)],
        Err(_) => tokio::net::lookup_host((host, port)).await?.collect(),
    };
    match addrs.first() {
        Some(first) if addrs.iter().all(|a| is_public_ip(a.ip())) => Ok(*first),
        _ => Err(AssetError::RefusedHost(host.to_string())),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// File / network source
// ────────────────────────────────────────────────────────────────────────────

/// Fonts from `FONT_DIR` (falling back to common system locations), images
/// from `data:` URIs or http(s) URLs. Local image paths are refused: image
/// references arrive in request bodies. Remote hosts must resolve to public
/// addresses, redirects are not followed and bodies are capped at
/// `MAX_IMAGE_BYTES`.
#[derive(Clone)]
pub struct FileAssetSource {
    font_dir: Option<PathBuf>,
    max_image_bytes: usize,
}

impl FileAssetSource {
    pub fn new(font_dir: Option<PathBuf>) -> Self {
        Self {
            font_dir,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }

    async fn fetch_image(&self, source: &str) -> Result<Vec<u8>, AssetError> {
        let url = reqwest::Url::parse(source)
            .map_err(|_| AssetError::Unsupported(truncate_source(source)))?;
        let addr = resolve_public(&url).await?;

        // Pin the checked address so the connection cannot re-resolve elsewhere.
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(domain) = url.domain() {
            builder = builder.resolve(domain, addr);
        }
        let client = builder.build()?;

        let mut response = client.get(url).send().await?.error_for_status()?;
        check_declared_length(response.content_length(), self.max_image_bytes)?;
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            append_capped(&mut body, &chunk, self.max_image_bytes)?;
        }
        debug!(bytes = body.len(), source = %truncate_source(source), "Fetched image");
        Ok(body)
    }

    fn font_candidates(&self, key: FontKey) -> Vec<PathBuf> {
        let stem = key.file_stem();
        let mut candidates = Vec::new();
        if let Some(dir) = &self.font_dir {
            candidates.push(dir.join(format!("{stem}.ttf")));
            candidates.push(dir.join(format!("{stem}.otf")));
        }
        let fallback = match (key.typeface, key.weight) {
            (Typeface::Lato, Weight::Regular) => "DejaVuSans.ttf",
            (Typeface::Lato, Weight::Bold) => "DejaVuSans-Bold.ttf",
            (Typeface::Merriweather, Weight::Regular) => "DejaVuSerif.ttf",
            (Typeface::Merriweather, Weight::Bold) => "DejaVuSerif-Bold.ttf",
        };
        for dir in ["/usr/share/fonts/truetype/dejavu", "/usr/share/fonts/TTF", "/usr/share/fonts/dejavu"] {
            candidates.push(PathBuf::from(dir).join(fallback));
        }
        candidates
    }
}

#[async_trait]
impl AssetSource for FileAssetSource {
    async fn load_font(&self, key: FontKey) -> Result<Arc<Vec<u8>>, AssetError> {
        for path in self.font_candidates(key) {
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    debug!(font = %key.file_stem(), path = %path.display(), "Loaded font");
                    return Ok(Arc::new(bytes));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(AssetError::NotFound(key.file_stem()))
    }

    async fn load_image(&self, source: &str) -> Result<Vec<u8>, AssetError> {
        if source.starts_with("data:") {
            return decode_data_uri(source);
        }
        if source.starts_with("http://") || source.starts_with("https://") {
            return self.fetch_image(source).await;
        }
        Err(AssetError::Unsupported(truncate_source(source)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
