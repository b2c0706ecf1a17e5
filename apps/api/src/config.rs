use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::layout::fit::{FitConfig, SliceMode};
use crate::layout::geometry::PaperSize;

/// Application configuration loaded from environment variables.
/// Everything has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional: a missing key surfaces as a credential error on the first LLM call.
    pub anthropic_api_key: Option<String>,
    /// Messages endpoint override, for gateways and proxies.
    pub anthropic_api_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub paper: PaperSize,
    pub fit: FitConfig,
    /// Ceiling on the asset gate, per asset.
    pub asset_timeout: Duration,
    /// How long a print surface outlives its handoff.
    pub print_cleanup: Duration,
    pub font_dir: Option<PathBuf>,
    pub print_spool_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FitConfig::default();

        let fit = FitConfig {
            readability_floor: parse_or(&lookup, "READABILITY_FLOOR", defaults.readability_floor)?,
            buffer_px: parse_or(&lookup, "FIT_BUFFER_PX", defaults.buffer_px)?,
            raster_scale: parse_or(&lookup, "RASTER_SCALE", defaults.raster_scale)?,
            slice_mode: match lookup("SLICE_MODE").as_deref().map(str::trim) {
                None | Some("") | Some("fixed") => SliceMode::Fixed,
                Some("block_aware") | Some("block-aware") => SliceMode::BlockAware,
                Some(other) => bail!("SLICE_MODE must be 'fixed' or 'block_aware', got '{other}'"),
            },
        };
        if !(fit.readability_floor > 0.0 && fit.readability_floor <= 1.0) {
            bail!("READABILITY_FLOOR must be in (0, 1], got {}", fit.readability_floor);
        }
        if fit.buffer_px < 0.0 {
            bail!("FIT_BUFFER_PX must not be negative");
        }
        if !(fit.raster_scale > 0.0 && fit.raster_scale <= 4.0) {
            bail!("RASTER_SCALE must be in (0, 4], got {}", fit.raster_scale);
        }

        let paper = match lookup("PAGE_SIZE") {
            Some(value) => PaperSize::from_str(&value).map_err(|e| anyhow!(e)).context("PAGE_SIZE")?,
            None => PaperSize::A4,
        };

        Ok(Config {
            anthropic_api_key: lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()),
            anthropic_api_url: lookup("ANTHROPIC_API_URL")
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            port: parse_or(&lookup, "PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            paper,
            fit,
            asset_timeout: Duration::from_millis(parse_or(&lookup, "ASSET_TIMEOUT_MS", 10_000u64)?),
            print_cleanup: Duration::from_secs(parse_or(&lookup, "PRINT_CLEANUP_SECS", 60u64)?),
            font_dir: lookup("FONT_DIR").map(PathBuf::from),
            print_spool_dir: lookup("PRINT_SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("artisan-print")),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.paper, PaperSize::A4);
        assert_eq!(config.fit, FitConfig::default());
        assert_eq!(config.asset_timeout, Duration::from_secs(10));
        assert!(config.anthropic_api_key.is_none());
        assert!(config.anthropic_api_url.is_none());
    }

    #[test]
    fn test_api_url_override_is_trimmed() {
        let gateway = config(&[("ANTHROPIC_API_URL", " http://gateway.internal/v1/messages ")]).unwrap();
        assert_eq!(
            gateway.anthropic_api_url.as_deref(),
            Some("http://gateway.internal/v1/messages")
        );
        let blank = config(&[("ANTHROPIC_API_URL", "  ")]).unwrap();
        assert!(blank.anthropic_api_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PAGE_SIZE", "letter"),
            ("READABILITY_FLOOR", "0.7"),
            ("SLICE_MODE", "block_aware"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ])
        .unwrap();
        assert_eq!(config.paper, PaperSize::Letter);
        assert_eq!(config.fit.readability_floor, 0.7);
        assert_eq!(config.fit.slice_mode, SliceMode::BlockAware);
        assert_eq!(config.anthropic_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_invalid_values_fail_startup() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("READABILITY_FLOOR", "1.5")]).is_err());
        assert!(config(&[("PAGE_SIZE", "tabloid")]).is_err());
        assert!(config(&[("SLICE_MODE", "smart")]).is_err());
    }
}
