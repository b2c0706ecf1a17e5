use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::Typeface;

/// Visual template variant. Each maps to one `LayoutStrategy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateName {
    #[default]
    Classic,
    ModernCompact,
    ModernAlt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontGroup {
    #[default]
    SansSerif,
    Serif,
}

impl FontGroup {
    pub fn typeface(self) -> Typeface {
        match self {
            FontGroup::SansSerif => Typeface::Lato,
            FontGroup::Serif => Typeface::Merriweather,
        }
    }
}

/// Page margin density, mapped to fixed physical sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarginDensity {
    Compact,
    #[default]
    Standard,
    Generous,
}

impl MarginDensity {
    /// 0.5", 0.75" and 1" respectively.
    pub fn margin_mm(self) -> f32 {
        match self {
            MarginDensity::Compact => 12.7,
            MarginDensity::Standard => 19.05,
            MarginDensity::Generous => 25.4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineHeight {
    Tight,
    #[default]
    Normal,
    Relaxed,
}

impl LineHeight {
    pub fn factor(self) -> f32 {
        match self {
            LineHeight::Tight => 1.3,
            LineHeight::Normal => 1.5,
            LineHeight::Relaxed => 1.7,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontScale {
    Small,
    #[default]
    Medium,
    Large,
}

impl FontScale {
    pub fn factor(self) -> f32 {
        match self {
            FontScale::Small => 0.9,
            FontScale::Medium => 1.0,
            FontScale::Large => 1.1,
        }
    }
}

/// User-chosen presentation parameters. Independent of the document content and
/// passed by value into every render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub template: TemplateName,
    pub font_group: FontGroup,
    pub margin: MarginDensity,
    pub line_height: LineHeight,
    pub font_scale: FontScale,
}

/// What is being exported. Decides the default fit strategy and the filename suffix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    #[default]
    Resume,
    CoverLetter,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_default_when_fields_missing() {
        let settings: RenderSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings, RenderSettings::default());
        assert_eq!(settings.margin, MarginDensity::Standard);
    }

    #[test]
    fn test_settings_kebab_case_wire_names() {
        let settings: RenderSettings = serde_json::from_value(json!({
            "template": "modern-compact",
            "font_group": "serif",
            "margin": "generous"
        }))
        .unwrap();
        assert_eq!(settings.template, TemplateName::ModernCompact);
        assert_eq!(settings.font_group.typeface(), Typeface::Merriweather);
        assert!((settings.margin.margin_mm() - 25.4).abs() < 1e-4);
    }

    #[test]
    fn test_margins_grow_with_density() {
        assert!(MarginDensity::Compact.margin_mm() < MarginDensity::Standard.margin_mm());
        assert!(MarginDensity::Standard.margin_mm() < MarginDensity::Generous.margin_mm());
    }
}
