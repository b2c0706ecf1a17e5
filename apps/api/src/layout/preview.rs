//! Interactive Preview Scaler: on-screen zoom math for the document preview.
//!
//! Presentation only. Nothing computed here reaches an export plan; exports
//! always re-measure the unscaled tree.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewConfig {
    /// Horizontal padding around the page inside the container.
    pub padding_px: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub step: f32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            padding_px: 48.0,
            min_zoom: 0.3,
            max_zoom: 2.0,
            step: 0.1,
        }
    }
}

/// Zoom state carried by the client between steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewState {
    pub scale: f32,
    /// Sticky once the user zooms by hand; cleared only by `reset`.
    #[serde(default)]
    pub manual_override: bool,
}

impl Default for PreviewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            manual_override: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PreviewAction {
    Fit { container_width: f32 },
    ZoomIn,
    ZoomOut,
    Reset { container_width: f32 },
}

#[derive(Debug, Clone, Copy)]
pub struct PreviewScaler {
    config: PreviewConfig,
    page_width: f32,
    state: PreviewState,
}

impl PreviewScaler {
    pub fn new(config: PreviewConfig, page_width: f32) -> Self {
        Self::from_state(config, page_width, PreviewState::default())
    }

    pub fn from_state(config: PreviewConfig, page_width: f32, state: PreviewState) -> Self {
        let mut scaler = Self {
            config,
            page_width,
            state,
        };
        scaler.state.scale = scaler.clamp(state.scale);
        scaler
    }

    #[cfg(test)]
    pub fn state(&self) -> PreviewState {
        self.state
    }

    fn clamp(&self, scale: f32) -> f32 {
        if scale.is_finite() {
            scale.clamp(self.config.min_zoom, self.config.max_zoom)
        } else {
            1.0_f32.clamp(self.config.min_zoom, self.config.max_zoom)
        }
    }

    /// Refits to the container unless the user has taken manual control.
    pub fn fit_to_container(&mut self, container_width: f32) -> f32 {
        if !self.state.manual_override {
            let raw = (container_width - self.config.padding_px) / self.page_width;
            self.state.scale = self.clamp(raw);
        }
        self.state.scale
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.zoom_by(self.config.step)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.zoom_by(-self.config.step)
    }

    /// Moves exactly one step from the current scale, then clamps. The result
    /// is rounded to four decimals so repeated steps carry no float noise; an
    /// off-grid scale such as a fitted 0.73 stays off-grid (0.83, 0.93, ...).
    fn zoom_by(&mut self, delta: f32) -> f32 {
        let next = ((self.state.scale + delta) * 10_000.0).round() / 10_000.0;
        self.state.scale = self.clamp(next);
        self.state.manual_override = true;
        self.state.scale
    }

    /// Clears the manual override and refits.
    pub fn reset(&mut self, container_width: f32) -> f32 {
        self.state.manual_override = false;
        self.fit_to_container(container_width)
    }

    pub fn apply(&mut self, action: PreviewAction) -> PreviewState {
        match action {
            PreviewAction::Fit { container_width } => self.fit_to_container(container_width),
            PreviewAction::ZoomIn => self.zoom_in(),
            PreviewAction::ZoomOut => self.zoom_out(),
            PreviewAction::Reset { container_width } => self.reset(container_width),
        };
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler() -> PreviewScaler {
        PreviewScaler::new(PreviewConfig::default(), 794.0)
    }

    #[test]
    fn test_fit_to_container() {
        let mut s = scaler();
        assert!((s.fit_to_container(842.0) - 1.0).abs() < 1e-6);
        assert!((s.fit_to_container(445.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fit_clamps_to_bounds() {
        let mut s = scaler();
        assert_eq!(s.fit_to_container(10.0), 0.3);
        assert_eq!(s.fit_to_container(10_000.0), 2.0);
    }

    #[test]
    fn test_manual_zoom_is_sticky_until_reset() {
        let mut s = scaler();
        s.fit_to_container(842.0);
        let zoomed = s.zoom_in();
        assert!((zoomed - 1.1).abs() < 1e-5);
        assert!((s.fit_to_container(445.0) - 1.1).abs() < 1e-5);
        assert!((s.reset(445.0) - 0.5).abs() < 1e-6);
        assert!(!s.state().manual_override);
    }

    #[test]
    fn test_zoom_steps_from_fitted_scale() {
        let mut s = PreviewScaler::from_state(
            PreviewConfig::default(),
            794.0,
            PreviewState {
                scale: 0.73,
                manual_override: false,
            },
        );
        assert!((s.zoom_in() - 0.83).abs() < 1e-5);
        assert!((s.zoom_in() - 0.93).abs() < 1e-5);
        assert!((s.zoom_out() - 0.83).abs() < 1e-5);
        for _ in 0..20 {
            s.zoom_in();
            s.zoom_out();
        }
        assert_eq!(s.state().scale, 0.83);
    }

    #[test]
    fn test_zoom_stays_within_bounds() {
        let mut s = scaler();
        for _ in 0..50 {
            s.zoom_out();
        }
        assert!((s.state().scale - 0.3).abs() < 1e-5);
        for _ in 0..50 {
            s.zoom_in();
        }
        assert!((s.state().scale - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_apply_round_trips_state() {
        let state = PreviewState {
            scale: 0.8,
            manual_override: true,
        };
        let mut s = PreviewScaler::from_state(PreviewConfig::default(), 794.0, state);
        let next = s.apply(PreviewAction::Fit {
            container_width: 2_000.0,
        });
        assert_eq!(next, state);
    }

    #[test]
    fn test_from_state_sanitizes_scale() {
        let s = PreviewScaler::from_state(
            PreviewConfig::default(),
            794.0,
            PreviewState {
                scale: f32::NAN,
                manual_override: false,
            },
        );
        assert_eq!(s.state().scale, 1.0);
    }
}
