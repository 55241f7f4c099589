//! Dashboard configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides:
//!
//! ```json
//! {
//!   "window": { "width": 1600.0 },
//!   "gender_colors": { "domain": ["Female", "Male"], "range": ["#e377c2", "#1f77b4"] },
//!   "service_salary": { "width": 900.0 }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Outer margins of a chart, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self::new(10.0, 50.0, 30.0, 50.0)
    }
}

impl Margins {
    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Size and margins of one chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartLayout {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
}

impl ChartLayout {
    pub const fn new(width: f32, height: f32, margins: Margins) -> Self {
        Self {
            width,
            height,
            margins,
        }
    }
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self::new(350.0, 250.0, Margins::default())
    }
}

/// Ordinal colour scale definition: `domain[i]` is drawn in `range[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScaleConfig {
    pub domain: Vec<String>,
    pub range: Vec<String>,
}

impl Default for ColorScaleConfig {
    fn default() -> Self {
        Self {
            domain: vec!["Female".into(), "Male".into()],
            range: vec!["pink".into(), "blue".into()],
        }
    }
}

/// Native window settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 900.0,
        }
    }
}

/// Top-level dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub window: WindowConfig,
    pub gender_colors: ColorScaleConfig,
    pub gender_balance: ChartLayout,
    pub average_salary: ChartLayout,
    pub rank_distribution: ChartLayout,
    pub service_salary: ChartLayout,
    pub phd_salary: ChartLayout,
    /// Scatter plot symbol size.
    pub symbol_size: f32,
    /// Rows shown in the selected-records table.
    pub table_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let scatter = ChartLayout::new(800.0, 400.0, Margins::new(10.0, 50.0, 75.0, 75.0));
        Self {
            window: WindowConfig::default(),
            gender_colors: ColorScaleConfig::default(),
            gender_balance: ChartLayout::new(350.0, 250.0, Margins::new(10.0, 50.0, 30.0, 50.0)),
            average_salary: ChartLayout::new(350.0, 250.0, Margins::new(10.0, 50.0, 30.0, 100.0)),
            rank_distribution: ChartLayout::new(
                350.0,
                250.0,
                Margins::new(10.0, 100.0, 40.0, 50.0),
            ),
            service_salary: scatter,
            phd_salary: scatter,
            symbol_size: 8.0,
            table_rows: 10,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string. The parsed keys are laid over
    /// the defaults, so a partial chart layout keeps that chart's own sizes.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let parse = |e: serde_json::Error| ConfigError::Parse(e.to_string());
        let overrides: Value = serde_json::from_str(content).map_err(parse)?;
        let mut merged = serde_json::to_value(Self::default()).map_err(parse)?;
        merge(&mut merged, overrides);
        serde_json::from_value(merged).map_err(parse)
    }
}

/// Recursively overwrite `base` with the keys present in `overrides`.
fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_chart_sizes() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.gender_balance.width, 350.0);
        assert_eq!(cfg.average_salary.margins.left, 100.0);
        assert_eq!(cfg.rank_distribution.margins.right, 100.0);
        assert_eq!(cfg.service_salary.height, 400.0);
        assert_eq!(cfg.phd_salary.margins.bottom, 75.0);
        assert_eq!(cfg.gender_colors.range, vec!["pink", "blue"]);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = DashboardConfig::from_json(
            r#"{ "service_salary": { "width": 900.0 }, "symbol_size": 5.0 }"#,
        )
        .unwrap();
        let defaults = DashboardConfig::default();
        assert_eq!(cfg.service_salary.width, 900.0);
        assert_eq!(cfg.service_salary.height, 400.0);
        assert_eq!(cfg.service_salary.margins, defaults.service_salary.margins);
        assert_eq!(cfg.symbol_size, 5.0);
        assert_eq!(cfg.average_salary, defaults.average_salary);
        assert_eq!(cfg.phd_salary, defaults.phd_salary);
    }

    #[test]
    fn partial_margins_keep_chart_defaults() {
        let cfg = DashboardConfig::from_json(
            r#"{ "average_salary": { "margins": { "left": 80.0 } } }"#,
        )
        .unwrap();
        assert_eq!(cfg.average_salary.margins, Margins::new(10.0, 50.0, 30.0, 80.0));
        assert_eq!(cfg.average_salary.width, 350.0);

        let margins: Margins = serde_json::from_str(r#"{ "top": 5.0 }"#).unwrap();
        assert_eq!(margins, Margins::new(5.0, 50.0, 30.0, 50.0));
    }

    #[test]
    fn wrongly_typed_override_is_a_parse_error() {
        assert!(matches!(
            DashboardConfig::from_json(r#"{ "table_rows": "ten" }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        assert!(matches!(
            DashboardConfig::from_json("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            DashboardConfig::load("/nonexistent/dashboard.json"),
            Err(ConfigError::Io(..))
        ));
    }
}
