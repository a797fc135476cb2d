// Thin bridge to the external horizon/streaming widget. The widget itself
// (context, scales, focus rule) stays on the rendering side; this module
// only validates the spec and precomputes the values the embed needs.

use anyhow::{anyhow, bail, Result};
use serde::Serialize;

use crate::spec::{HorizonSpec, HorizonStripSpec};
use crate::time::parse_instant_ms;

/// Prepared horizon plot, serialized verbatim into the HTML embed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonPlot {
    /// Epoch milliseconds of the first sample.
    pub start_instant_ms: i64,
    /// Seconds between samples.
    pub time_step: f64,
    /// Samples per strip, taken from the first strip.
    pub size: usize,
    pub tick_count: Option<u32>,
    pub timestamp_format: Option<String>,
    pub strips: Vec<HorizonStrip>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HorizonStrip {
    pub label: Option<String>,
    pub data: Vec<f64>,
    pub height: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl HorizonPlot {
    pub fn prepare(spec: &HorizonSpec) -> Result<Self> {
        if spec.plots.is_empty() {
            bail!("horizon plot requires at least one series");
        }
        if spec.time_step <= 0.0 {
            bail!("horizon plot requires a positive timeStep");
        }
        let start_instant_ms = parse_instant_ms(&spec.start_timestamp).ok_or_else(|| {
            anyhow!(
                "horizon plot startTimestamp '{}' is not a valid timestamp",
                spec.start_timestamp
            )
        })?;
        let size = spec.plots[0].data.len();

        Ok(Self {
            start_instant_ms,
            time_step: spec.time_step,
            size,
            tick_count: spec.tick_count,
            timestamp_format: spec.timestamp_format.clone(),
            strips: spec.plots.iter().map(HorizonStrip::from_spec).collect(),
        })
    }
}

impl HorizonStrip {
    fn from_spec(spec: &HorizonStripSpec) -> Self {
        Self {
            label: spec.label.clone(),
            data: spec.data.clone(),
            height: spec.height,
            min: spec.min,
            max: spec.max,
        }
    }
}
