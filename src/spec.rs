// Declarative plot specifications, deserialized from JSON.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::frame::Frame;

/// Complete plot specification, dispatched on the top-level `type` tag.
/// A spec without a tag is the generic xy form; unknown tags are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PlotSpec {
    #[serde(rename = "xy")]
    Xy(XySpec),
    #[serde(rename = "heatMap")]
    HeatMap(HeatMapSpec),
    #[serde(rename = "sankey")]
    Sankey(SankeySpec),
    #[serde(rename = "box")]
    Box(BoxSpec),
    #[serde(rename = "horizon", alias = "cubism")]
    Horizon(HorizonSpec),
}

impl PlotSpec {
    /// Parse a spec from a JSON value, defaulting a missing `type` tag to
    /// the generic xy form.
    pub fn from_value(mut value: Value) -> Result<Self> {
        let obj = value
            .as_object_mut()
            .ok_or_else(|| anyhow!("plot spec must be a JSON object"))?;
        obj.entry("type").or_insert_with(|| Value::from("xy"));
        serde_json::from_value(value).context("invalid plot spec")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).context("plot spec is not valid JSON")?;
        Self::from_value(value)
    }
}

/// Generic xy plot: one or more data specs sharing a layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct XySpec {
    pub title: Option<String>,
    /// Series name used by the OHLC path (falls back to the index column).
    pub name: Option<String>,
    /// Caller-supplied layout object, extended rather than replaced.
    pub layout: Option<Value>,
    /// Caller-supplied margin object, applied last (replaces any default).
    pub margin: Option<Value>,
    pub x: Option<AxisSpec>,
    pub y: Option<AxisSpec>,
    pub y2: Option<AxisSpec>,
    #[serde(rename = "typeX")]
    pub type_x: Option<XAxisType>,
    pub data: Vec<DataSpec>,
    /// Per-trace overrides, positional by dependent column. With several
    /// data specs these nest one level by frame index.
    pub markers: Option<Vec<Value>>,
    pub lines: Option<Vec<Value>>,
    pub widths: Option<Vec<Value>>,
    pub opacities: Option<Vec<Value>>,
    pub static_plot: Option<bool>,
    pub display_mode_bar: Option<bool>,
}

/// Axis options referenced by the generic path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AxisSpec {
    pub label: Option<String>,
    /// Bin descriptor copied onto 2d-histogram traces.
    pub bins: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum XAxisType {
    #[serde(rename = "timestamp")]
    Timestamp,
    #[serde(rename = "none")]
    None,
}

/// One frame of data plus how to draw it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataSpec {
    #[serde(rename = "type")]
    pub kind: SeriesKind,
    #[serde(alias = "df")]
    pub frame: Frame,
    /// Overrides the per-column trace name.
    pub name: Option<String>,
    pub orientation: Option<Orientation>,
    pub error_bars: Option<ErrorBarSpec>,
    /// Plot this frame's traces against the secondary y axis.
    pub y2: bool,
    pub fillcolor: Option<String>,
    /// Donut hole fraction (pie only).
    pub hole: Option<f64>,
    /// Categorical cross-axis values (box only).
    pub groups: Option<Vec<Value>>,
    pub legendgroup: Option<String>,
    /// Attributes applied identically to every trace of the frame.
    pub data_static: Option<Map<String, Value>>,
    /// Attribute arrays indexed by dependent-column position.
    pub data_per_column: Option<Map<String, Value>>,
    /// Arbitrary renderer attributes; carried wholesale by the histogram path.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Closed set of series kinds handled by the generic path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SeriesKind {
    #[default]
    #[serde(rename = "scatter")]
    Scatter,
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "bar")]
    Bar,
    #[serde(rename = "stackedBar")]
    StackedBar,
    #[serde(rename = "overlayBar")]
    OverlayBar,
    #[serde(rename = "histogram")]
    Histogram,
    #[serde(rename = "histogram2d")]
    Histogram2d,
    #[serde(rename = "continuousErrorBars")]
    ContinuousErrorBars,
    #[serde(rename = "pie")]
    Pie,
    #[serde(rename = "ohlc")]
    Ohlc,
    #[serde(rename = "box")]
    Box,
}

impl SeriesKind {
    /// Wire name as carried onto traces.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scatter => "scatter",
            Self::Line => "line",
            Self::Bar => "bar",
            Self::StackedBar => "stackedBar",
            Self::OverlayBar => "overlayBar",
            Self::Histogram => "histogram",
            Self::Histogram2d => "histogram2d",
            Self::ContinuousErrorBars => "continuousErrorBars",
            Self::Pie => "pie",
            Self::Ohlc => "ohlc",
            Self::Box => "box",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Orientation {
    #[serde(rename = "v")]
    Vertical,
    #[serde(rename = "h")]
    Horizontal,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vertical => "v",
            Self::Horizontal => "h",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ErrorBarSpec {
    #[serde(default = "default_symmetric")]
    pub symmetric: bool,
}

fn default_symmetric() -> bool {
    true
}

/// Heat map: a z matrix over optional x/y ranges.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeatMapSpec {
    pub title: Option<String>,
    pub margin: Option<Value>,
    pub range_x: Option<Value>,
    pub range_y: Option<Value>,
    pub z: Option<Value>,
    pub label_x: Option<String>,
    pub label_y: Option<String>,
    pub colorscale: Option<Value>,
    pub reversescale: Option<bool>,
    pub showscale: Option<bool>,
    pub static_plot: Option<bool>,
    pub display_mode_bar: Option<bool>,
}

/// Sankey diagram: link source/target/value pulled positionally from frame
/// columns 1..3.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SankeySpec {
    pub title: Option<String>,
    pub layout: Option<Value>,
    #[serde(alias = "df")]
    pub frame: Frame,
    pub orientation: Option<Orientation>,
    /// Node labels; synthesized as "0".."N-1" when omitted.
    pub node_labels: Option<Vec<String>>,
    pub link_labels: Option<Vec<String>>,
    pub static_plot: Option<bool>,
    pub display_mode_bar: Option<bool>,
}

/// Box plot over a single frame: one trace per dependent column.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoxSpec {
    pub title: Option<String>,
    pub layout: Option<Value>,
    #[serde(alias = "df")]
    pub frame: Frame,
    pub orientation: Option<Orientation>,
    /// Shared categorical cross-axis values.
    pub groups: Option<Vec<Value>>,
    /// Per-column marker / boxpoints overrides.
    pub markers: Option<Vec<Value>>,
    pub boxpoints: Option<Vec<Value>>,
    pub static_plot: Option<bool>,
    pub display_mode_bar: Option<bool>,
}

/// Horizon (cubism) time-series strips. Thin bridge to the external
/// streaming widget; see [`crate::horizon`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HorizonSpec {
    pub title: Option<String>,
    /// ISO timestamp of the first sample.
    pub start_timestamp: String,
    /// Seconds between samples.
    pub time_step: f64,
    pub tick_count: Option<u32>,
    /// strftime-style axis tick format.
    pub timestamp_format: Option<String>,
    pub plots: Vec<HorizonStripSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HorizonStripSpec {
    pub label: Option<String>,
    pub data: Vec<f64>,
    pub height: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_tag_defaults_to_xy() {
        let spec = PlotSpec::from_value(json!({
            "data": [{"type": "line", "frame": [
                {"name": "t", "values": [1, 2]},
                {"name": "v", "values": [3, 4]},
            ]}],
            "title": "demo",
        }))
        .unwrap();
        match spec {
            PlotSpec::Xy(xy) => {
                assert_eq!(xy.title.as_deref(), Some("demo"));
                assert_eq!(xy.data.len(), 1);
                assert_eq!(xy.data[0].kind, SeriesKind::Line);
            }
            other => panic!("expected xy spec, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let result = PlotSpec::from_value(json!({"type": "starfield"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_heat_map_tag() {
        let spec = PlotSpec::from_value(json!({
            "type": "heatMap",
            "z": [[1, 2], [3, 4]],
            "labelX": "col",
            "reversescale": true,
        }))
        .unwrap();
        match spec {
            PlotSpec::HeatMap(hm) => {
                assert_eq!(hm.label_x.as_deref(), Some("col"));
                assert_eq!(hm.reversescale, Some(true));
            }
            other => panic!("expected heatMap spec, got {other:?}"),
        }
    }

    #[test]
    fn test_cubism_alias() {
        let spec = PlotSpec::from_value(json!({
            "type": "cubism",
            "startTimestamp": "2024-01-01T00:00:00Z",
            "timeStep": 60.0,
            "plots": [{"label": "cpu", "data": [0.1, 0.2]}],
        }))
        .unwrap();
        assert!(matches!(spec, PlotSpec::Horizon(_)));
    }

    #[test]
    fn test_data_spec_passthrough_attributes() {
        let spec = PlotSpec::from_value(json!({
            "data": [{
                "type": "histogram",
                "frame": [{"name": "v", "values": [1, 2, 3]}],
                "opacity": 0.5,
                "nbinsx": 20,
            }],
        }))
        .unwrap();
        let PlotSpec::Xy(xy) = spec else {
            panic!("expected xy spec");
        };
        assert_eq!(xy.data[0].extra.get("opacity"), Some(&json!(0.5)));
        assert_eq!(xy.data[0].extra.get("nbinsx"), Some(&json!(20)));
    }

    #[test]
    fn test_error_bars_default_symmetric() {
        let spec: ErrorBarSpec = serde_json::from_value(json!({})).unwrap();
        assert!(spec.symmetric);
        let spec: ErrorBarSpec = serde_json::from_value(json!({"symmetric": false})).unwrap();
        assert!(!spec.symmetric);
    }
}
