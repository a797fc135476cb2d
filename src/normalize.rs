use anyhow::{bail, Context, Result};
use serde_json::{json, Map, Value};

use crate::figure::{Figure, Layout, Trace};
use crate::frame::Frame;
use crate::horizon::HorizonPlot;
use crate::spec::{
    BoxSpec, DataSpec, HeatMapSpec, Orientation, PlotSpec, SankeySpec, SeriesKind, XAxisType,
    XySpec,
};
use crate::time::parse_instant_ms;

/// Allocator for legend-group ids, owned by the enclosing report/session and
/// threaded explicitly. Ids are allocated once per data frame processed and
/// never reset, so two plots in one session get distinct groups.
#[derive(Debug, Default)]
pub struct LegendGroups {
    next: u64,
}

impl LegendGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> String {
        self.next += 1;
        format!("lg{}", self.next)
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next
    }
}

/// Output of [`normalize`]: a figure for the renderer, or a prepared horizon
/// plot for the streaming-widget bridge.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum Normalized {
    Figure(Figure),
    Horizon(HorizonPlot),
}

impl Normalized {
    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Figure(figure) => &figure.warnings,
            Self::Horizon(_) => &[],
        }
    }
}

/// Main entry point: translate one plot spec into renderer-ready structures.
/// The spec is read-only; everything returned is freshly allocated.
pub fn normalize(spec: &PlotSpec, legend: &mut LegendGroups) -> Result<Normalized> {
    match spec {
        PlotSpec::Xy(xy) => normalize_xy(xy, legend).map(Normalized::Figure),
        PlotSpec::HeatMap(hm) => normalize_heat_map(hm).map(Normalized::Figure),
        PlotSpec::Sankey(sk) => normalize_sankey(sk, legend).map(Normalized::Figure),
        PlotSpec::Box(bx) => normalize_box(bx, legend).map(Normalized::Figure),
        PlotSpec::Horizon(hz) => HorizonPlot::prepare(hz).map(Normalized::Horizon),
    }
}

/// Shared mutable pieces of one normalization pass: the legend allocator and
/// the warning sink (log and continue; see the error-handling contract).
struct Ctx<'a> {
    legend: &'a mut LegendGroups,
    warnings: Vec<String>,
}

impl<'a> Ctx<'a> {
    fn new(legend: &'a mut LegendGroups) -> Self {
        Self {
            legend,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    fn finish(self) -> Vec<String> {
        self.warnings
    }
}

// =============================================================================
// Generic xy path
// =============================================================================

fn normalize_xy(spec: &XySpec, legend: &mut LegendGroups) -> Result<Figure> {
    let mut ctx = Ctx::new(legend);
    let mut layout = base_layout(spec, &mut ctx)?;
    let mut traces = Vec::new();
    let frame_count = spec.data.len();

    for (frame_idx, series) in spec.data.iter().enumerate() {
        check_frame(series, frame_idx)?;
        let group = ctx.legend.allocate();

        match series.kind {
            SeriesKind::Pie => {
                let trace = pie_trace(spec, series, frame_idx, frame_count, &mut ctx)?;
                traces.push(trace);
                layout.remove("xaxis");
                layout.remove("yaxis");
            }
            SeriesKind::Ohlc => {
                traces.push(ohlc_trace(spec, series, frame_idx, frame_count, &mut ctx)?);
            }
            SeriesKind::Box => {
                traces.push(xy_box_trace(spec, series, frame_idx, frame_count, &mut ctx)?);
            }
            _ => xy_series_traces(
                spec,
                series,
                frame_idx,
                frame_count,
                &group,
                &mut layout,
                &mut traces,
                &mut ctx,
            )?,
        }
    }

    if spec.type_x == Some(XAxisType::Timestamp) {
        convert_timestamps(&mut traces, &mut layout, &mut ctx);
    }
    if let Some(title) = &spec.title {
        layout.set("title", title.as_str());
    }
    if let Some(margin) = &spec.margin {
        layout.set("margin", margin.clone());
    }

    Ok(Figure {
        data: traces,
        layout,
        warnings: ctx.finish(),
    })
}

fn check_frame(series: &DataSpec, frame_idx: usize) -> Result<()> {
    if series.frame.is_empty() {
        bail!("data[{frame_idx}] has no frame");
    }
    series
        .frame
        .validate()
        .with_context(|| format!("data[{frame_idx}]"))
}

/// Default layout: start from the caller's, make sure the axis objects
/// exist, default the left margin, and copy axis labels in.
fn base_layout(spec: &XySpec, ctx: &mut Ctx) -> Result<Layout> {
    let mut layout = Layout::from_caller(spec.layout.as_ref())?;
    for key in ["xaxis", "yaxis", "margin"] {
        if layout.has_non_object(key) {
            ctx.warn(format!("layout.{key} is not an object; replacing it"));
        }
        layout.object_mut(key);
    }
    layout
        .object_mut("margin")
        .entry("l")
        .or_insert_with(|| Value::from(50));

    if let Some(label) = spec.x.as_ref().and_then(|axis| axis.label.as_deref()) {
        layout.object_mut("xaxis").insert("title".into(), label.into());
    }
    if let Some(label) = spec.y.as_ref().and_then(|axis| axis.label.as_deref()) {
        layout.object_mut("yaxis").insert("title".into(), label.into());
    }
    Ok(layout)
}

/// Build the column-j trace skeleton: x from column 0, y from column j, name
/// from the column (or the data spec), then the static, per-column, and
/// positional overlays in that order.
fn base_trace(
    spec: &XySpec,
    series: &DataSpec,
    frame_idx: usize,
    frame_count: usize,
    j: usize,
    ctx: &mut Ctx,
) -> Trace {
    let frame = &series.frame;
    let mut trace = Trace::new();
    trace.set("x", frame.columns[0].values.clone());
    trace.set("y", frame.columns[j].values.clone());
    if let Some(name) = series.name.as_deref().or(frame.columns[j].name.as_deref()) {
        trace.set("name", name);
    }

    if let Some(static_attrs) = &series.data_static {
        for (key, value) in static_attrs {
            trace.set(key, value.clone());
        }
    }
    if let Some(per_column) = &series.data_per_column {
        for (key, value) in per_column {
            match value.as_array() {
                Some(entries) if entries.len() >= j => trace.set(key, entries[j - 1].clone()),
                Some(_) => ctx.warn(format!(
                    "dataPerColumn entry '{key}' has fewer values than dependent columns"
                )),
                None => ctx.warn(format!("dataPerColumn entry '{key}' is not an array")),
            }
        }
    }

    positional_override(&mut trace, "marker", &spec.markers, frame_idx, frame_count, j, ctx);
    positional_override(&mut trace, "line", &spec.lines, frame_idx, frame_count, j, ctx);
    positional_override(&mut trace, "width", &spec.widths, frame_idx, frame_count, j, ctx);
    positional_override(&mut trace, "opacity", &spec.opacities, frame_idx, frame_count, j, ctx);
    trace
}

/// Apply one positional override array. With several frames the array nests
/// one level by frame index; a null entry means "no override here".
fn positional_override(
    trace: &mut Trace,
    key: &str,
    values: &Option<Vec<Value>>,
    frame_idx: usize,
    frame_count: usize,
    j: usize,
    ctx: &mut Ctx,
) {
    let Some(values) = values else {
        return;
    };
    let picked = if frame_count > 1 {
        match values.get(frame_idx) {
            None | Some(Value::Null) => None,
            Some(Value::Array(per_frame)) => {
                if per_frame.len() < j {
                    ctx.warn(format!(
                        "{key} overrides for data[{frame_idx}] have fewer entries than dependent columns"
                    ));
                    None
                } else {
                    Some(per_frame[j - 1].clone())
                }
            }
            Some(_) => {
                ctx.warn(format!(
                    "{key} overrides for data[{frame_idx}] are not an array"
                ));
                None
            }
        }
    } else {
        match values.get(j - 1) {
            None => {
                ctx.warn(format!(
                    "{key} overrides have fewer entries than dependent columns"
                ));
                None
            }
            Some(value) => Some(value.clone()),
        }
    };
    if let Some(value) = picked {
        if !value.is_null() {
            trace.set(key, value);
        }
    }
}

/// The per-column loop for all non-short-circuit series kinds.
#[allow(clippy::too_many_arguments)]
fn xy_series_traces(
    spec: &XySpec,
    series: &DataSpec,
    frame_idx: usize,
    frame_count: usize,
    group: &str,
    layout: &mut Layout,
    traces: &mut Vec<Trace>,
    ctx: &mut Ctx,
) -> Result<()> {
    let frame = &series.frame;
    let column_count = frame.columns.len();
    if column_count < 2 {
        ctx.warn(format!("data[{frame_idx}] has no dependent columns"));
        return Ok(());
    }
    if series.kind == SeriesKind::ContinuousErrorBars && column_count < 3 {
        bail!("data[{frame_idx}]: continuous error bars need mean and deviation columns");
    }

    for j in 1..column_count {
        let mut trace = base_trace(spec, series, frame_idx, frame_count, j, ctx);
        let mut last = false;

        // error-bar frames are single-series
        if let Some(error_bars) = &series.error_bars {
            attach_error_bars(&mut trace, series, frame_idx, error_bars.symmetric)?;
            last = true;
        }

        // formatting carried from the data spec unless an overlay set it
        if let Some(orientation) = series.orientation {
            trace.set_if_absent("orientation", orientation.as_str());
        }
        if let Some(fillcolor) = &series.fillcolor {
            trace.set_if_absent("fillcolor", fillcolor.as_str());
        }
        if series.kind != SeriesKind::Line {
            trace.set_if_absent("type", series.kind.as_str());
        }

        if series.kind == SeriesKind::ContinuousErrorBars {
            let group_id = series.legendgroup.as_deref().unwrap_or(group);
            trace.set_if_absent("legendgroup", group_id);
            if j == 2 {
                let (upper, lower) = band_bounds(frame, frame_idx)?;
                trace.set("y", upper);
                trace.set("fill", "tonexty");
                trace.set("line", json!({"color": "transparent"}));
                trace.set("showlegend", false);
                trace.set("type", "scatter");

                // the lower bound goes first so the upper fills down onto it
                let mut lower_trace = trace.clone();
                lower_trace.remove("fill");
                lower_trace.set("y", lower);
                traces.push(lower_trace);
            } else {
                trace.set("type", "scatter");
                trace.set("mode", "lines");
            }
        }

        if series.y2 {
            trace.set("yaxis", "y2");
            merge_secondary_axis(spec, layout);
        }

        // horizontal orientation: swap after error-bar and y2 handling so
        // both operate on the vertical convention
        if trace.get("orientation").and_then(Value::as_str) == Some("h") {
            let x = trace.remove("x");
            let y = trace.remove("y");
            if let Some(y) = y {
                trace.set("x", y);
            }
            if let Some(x) = x {
                trace.set("y", x);
            }
        }

        if series.kind == SeriesKind::Histogram {
            trace = histogram_trace(spec, series, j);
        }

        if trace.kind() == Some("histogram2d") {
            if let Some(bins) = spec.x.as_ref().and_then(|axis| axis.bins.as_ref()) {
                trace.set("xbins", bins.clone());
            }
            if let Some(bins) = spec.y.as_ref().and_then(|axis| axis.bins.as_ref()) {
                trace.set("ybins", bins.clone());
            }
        }

        if trace.kind() == Some("stackedBar") {
            trace.set("type", "bar");
            layout.set("barmode", "stack");
        }
        if trace.kind() == Some("overlayBar") {
            trace.set("type", "bar");
            layout.set("barmode", "overlay");
        }

        if trace.kind() == Some("scatter")
            && !trace.is_set("mode")
            && series.kind != SeriesKind::ContinuousErrorBars
        {
            trace.set("mode", "markers");
        }
        if series.kind == SeriesKind::Line && !trace.is_set("mode") {
            trace.set("mode", "lines");
        }

        traces.push(trace);
        if last {
            break;
        }
    }
    Ok(())
}

fn attach_error_bars(
    trace: &mut Trace,
    series: &DataSpec,
    frame_idx: usize,
    symmetric: bool,
) -> Result<()> {
    let frame = &series.frame;
    if frame.columns.len() < 3 {
        bail!("data[{frame_idx}]: error bars need a deviation column");
    }
    let mut descriptor = Map::new();
    descriptor.insert("type".into(), "data".into());
    descriptor.insert("array".into(), frame.columns[2].values.clone().into());
    descriptor.insert("visible".into(), true.into());
    if !symmetric {
        if frame.columns.len() < 4 {
            bail!("data[{frame_idx}]: asymmetric error bars need a minus column");
        }
        descriptor.insert("symmetric".into(), false.into());
        descriptor.insert("arrayminus".into(), frame.columns[3].values.clone().into());
    }
    let key = if series.orientation == Some(Orientation::Horizontal) {
        "error_x"
    } else {
        "error_y"
    };
    trace.set(key, Value::Object(descriptor));
    Ok(())
}

/// Element-wise mean ± deviation over columns 1 and 2.
fn band_bounds(frame: &Frame, frame_idx: usize) -> Result<(Vec<Value>, Vec<Value>)> {
    let means = &frame.columns[1].values;
    let devs = &frame.columns[2].values;
    let mut upper = Vec::with_capacity(means.len());
    let mut lower = Vec::with_capacity(means.len());
    for (k, (mean, dev)) in means.iter().zip(devs.iter()).enumerate() {
        let (Some(mean), Some(dev)) = (mean.as_f64(), dev.as_f64()) else {
            bail!("data[{frame_idx}]: continuous error bars need numeric mean/deviation values (row {k})");
        };
        upper.push(Value::from(mean + dev));
        lower.push(Value::from(mean - dev));
    }
    Ok((upper, lower))
}

fn merge_secondary_axis(spec: &XySpec, layout: &mut Layout) {
    let label = spec.y2.as_ref().and_then(|axis| axis.label.clone());
    let axis = layout.object_mut("yaxis2");
    if let Some(label) = label {
        // an explicit y2 label wins over a caller-supplied title
        axis.insert("title".into(), label.into());
    }
    axis.entry("overlaying").or_insert_with(|| "y".into());
    axis.entry("side").or_insert_with(|| "right".into());
}

fn pie_trace(
    spec: &XySpec,
    series: &DataSpec,
    frame_idx: usize,
    frame_count: usize,
    ctx: &mut Ctx,
) -> Result<Trace> {
    let frame = &series.frame;
    if frame.columns.len() < 2 {
        bail!("data[{frame_idx}]: pie needs a label column and a value column");
    }
    let mut trace = base_trace(spec, series, frame_idx, frame_count, 1, ctx);
    trace.remove("x");
    trace.remove("y");
    trace.set("labels", frame.columns[0].values.clone());
    trace.set("values", frame.columns[1].values.clone());
    trace.set("type", "pie");
    if let Some(hole) = series.hole {
        trace.set("hole", hole);
    }
    Ok(trace)
}

fn ohlc_trace(
    spec: &XySpec,
    series: &DataSpec,
    frame_idx: usize,
    frame_count: usize,
    ctx: &mut Ctx,
) -> Result<Trace> {
    let frame = &series.frame;
    if frame.columns.len() < 2 {
        bail!("data[{frame_idx}]: ohlc needs an index column and at least one value column");
    }
    let mut trace = base_trace(spec, series, frame_idx, frame_count, 1, ctx);
    trace.remove("y");
    for column in &frame.columns[1..] {
        match &column.name {
            Some(name) => trace.set(name, column.values.clone()),
            None => ctx.warn(format!("data[{frame_idx}]: unnamed ohlc column skipped")),
        }
    }
    match spec.name.as_deref().or(frame.columns[0].name.as_deref()) {
        Some(name) => trace.set("name", name),
        None => {
            trace.remove("name");
        }
    }
    trace.set("type", "ohlc");
    Ok(trace)
}

/// In-xy box series: one trace for the frame, values on the axis picked by
/// the orientation flag, groups (when given) on the other.
fn xy_box_trace(
    spec: &XySpec,
    series: &DataSpec,
    frame_idx: usize,
    frame_count: usize,
    ctx: &mut Ctx,
) -> Result<Trace> {
    let frame = &series.frame;
    if frame.columns.len() < 2 {
        bail!("data[{frame_idx}]: box needs a value column");
    }
    let mut trace = base_trace(spec, series, frame_idx, frame_count, 1, ctx);
    trace.remove("x");
    trace.remove("y");
    trace.set("type", "box");
    let horizontal = series.orientation == Some(Orientation::Horizontal);
    let values = frame.columns[1].values.clone();
    if horizontal {
        trace.set("x", values);
    } else {
        trace.set("y", values);
    }
    if let Some(groups) = &series.groups {
        if horizontal {
            trace.set("y", groups.clone());
        } else {
            trace.set("x", groups.clone());
        }
    }
    Ok(trace)
}

/// Histogram traces replace the column trace with a copy of the data spec's
/// renderer attributes (the frame itself stays behind).
fn histogram_trace(spec: &XySpec, series: &DataSpec, j: usize) -> Trace {
    let frame = &series.frame;
    let mut trace = Trace::new();
    for (key, value) in &series.extra {
        trace.set(key, value.clone());
    }
    trace.set("type", series.kind.as_str());
    if let Some(orientation) = series.orientation {
        trace.set("orientation", orientation.as_str());
    }
    if let Some(fillcolor) = &series.fillcolor {
        trace.set("fillcolor", fillcolor.as_str());
    }
    if let Some(group) = &series.legendgroup {
        trace.set("legendgroup", group.as_str());
    }
    trace.set("x", frame.columns[j].values.clone());
    if let Some(name) = series.name.as_deref().or(frame.columns[j].name.as_deref()) {
        trace.set("name", name);
    }
    // flat marker indexing, even with several frames
    if let Some(markers) = &spec.markers {
        if let Some(marker) = markers.get(j - 1) {
            if !marker.is_null() {
                trace.set("marker", marker.clone());
            }
        }
    }
    trace
}

/// Parse every trace's x values into epoch-millisecond instants and mark the
/// x axis as a date axis. Unparseable entries become null (the renderer's
/// gap marker) with a warning.
fn convert_timestamps(traces: &mut [Trace], layout: &mut Layout, ctx: &mut Ctx) {
    let mut converted_any = false;
    for trace in traces.iter_mut() {
        let Some(values) = trace.get("x").and_then(Value::as_array).cloned() else {
            continue;
        };
        let converted: Vec<Value> = values
            .iter()
            .map(|value| match value {
                Value::String(s) => match parse_instant_ms(s) {
                    Some(ms) => Value::from(ms),
                    None => {
                        ctx.warn(format!("unparseable timestamp '{s}' on the x axis"));
                        Value::Null
                    }
                },
                Value::Number(_) => value.clone(),
                other => {
                    ctx.warn(format!("non-timestamp x value {other} with typeX timestamp"));
                    Value::Null
                }
            })
            .collect();
        trace.set("x", converted);
        converted_any = true;
    }
    if converted_any {
        layout.object_mut("xaxis").insert("type".into(), "date".into());
    }
}

// =============================================================================
// Dedicated paths: heat map, sankey, box
// =============================================================================

fn normalize_heat_map(spec: &HeatMapSpec) -> Result<Figure> {
    let z = spec
        .z
        .as_ref()
        .filter(|z| z.as_array().is_some_and(|rows| !rows.is_empty()))
        .ok_or_else(|| anyhow::anyhow!("heat map requires a non-empty z matrix"))?;

    let mut trace = Trace::new();
    trace.set("type", "heatmap");
    if let Some(range_x) = &spec.range_x {
        trace.set("x", range_x.clone());
    }
    if let Some(range_y) = &spec.range_y {
        trace.set("y", range_y.clone());
    }
    trace.set("z", z.clone());
    if let Some(colorscale) = &spec.colorscale {
        trace.set("colorscale", colorscale.clone());
    }
    if spec.reversescale == Some(true) {
        trace.set("reversescale", true);
    }
    if spec.showscale == Some(true) {
        trace.set("showscale", true);
    }

    let mut layout = Layout::new();
    layout.object_mut("xaxis");
    layout.object_mut("yaxis");
    if let Some(label) = &spec.label_x {
        layout.object_mut("xaxis").insert("title".into(), label.as_str().into());
    }
    if let Some(label) = &spec.label_y {
        layout.object_mut("yaxis").insert("title".into(), label.as_str().into());
    }
    if let Some(margin) = &spec.margin {
        layout.set("margin", margin.clone());
    }
    if let Some(title) = &spec.title {
        layout.set("title", title.as_str());
    }

    Ok(Figure {
        data: vec![trace],
        layout,
        warnings: Vec::new(),
    })
}

fn normalize_sankey(spec: &SankeySpec, legend: &mut LegendGroups) -> Result<Figure> {
    let frame = &spec.frame;
    if frame.is_empty() {
        bail!("sankey requires a data frame");
    }
    frame.validate()?;
    if frame.columns.len() < 4 {
        bail!("sankey frame needs source, target, and value columns after the index");
    }
    legend.allocate();

    let mut link = Map::new();
    link.insert("source".into(), frame.columns[1].values.clone().into());
    link.insert("target".into(), frame.columns[2].values.clone().into());
    link.insert("value".into(), frame.columns[3].values.clone().into());
    if let Some(labels) = &spec.link_labels {
        link.insert("label".into(), labels.clone().into());
    }

    let node_labels: Vec<String> = match &spec.node_labels {
        Some(labels) => labels.clone(),
        None => (0..frame.columns[3].values.len())
            .map(|i| i.to_string())
            .collect(),
    };

    let mut trace = Trace::new();
    trace.set("type", "sankey");
    if let Some(orientation) = spec.orientation {
        trace.set("orientation", orientation.as_str());
    }
    trace.set("node", json!({ "label": node_labels }));
    trace.set("link", Value::Object(link));

    let mut layout = Layout::from_caller(spec.layout.as_ref())?;
    if let Some(title) = &spec.title {
        layout.set("title", title.as_str());
    }

    Ok(Figure {
        data: vec![trace],
        layout,
        warnings: Vec::new(),
    })
}

fn normalize_box(spec: &BoxSpec, legend: &mut LegendGroups) -> Result<Figure> {
    let frame = &spec.frame;
    if frame.is_empty() {
        bail!("box plot requires a data frame");
    }
    frame.validate()?;
    if frame.columns.len() < 2 {
        bail!("box plot frame needs at least one value column");
    }
    let mut ctx = Ctx::new(legend);
    ctx.legend.allocate();

    let horizontal = spec.orientation == Some(Orientation::Horizontal);
    let mut traces = Vec::new();
    for (i, column) in frame.columns[1..].iter().enumerate() {
        let mut trace = Trace::new();
        trace.set("type", "box");
        if horizontal {
            trace.set("x", column.values.clone());
        } else {
            trace.set("y", column.values.clone());
        }
        if let Some(name) = &column.name {
            trace.set("name", name.as_str());
        }
        per_column_value(&mut trace, "marker", &spec.markers, i, &mut ctx);
        per_column_value(&mut trace, "boxpoints", &spec.boxpoints, i, &mut ctx);
        if let Some(groups) = &spec.groups {
            if horizontal {
                trace.set("y", groups.clone());
            } else {
                trace.set("x", groups.clone());
            }
        }
        traces.push(trace);
    }

    let mut layout = Layout::from_caller(spec.layout.as_ref())?;
    if let Some(title) = &spec.title {
        layout.set("title", title.as_str());
    }

    Ok(Figure {
        data: traces,
        layout,
        warnings: ctx.finish(),
    })
}

fn per_column_value(
    trace: &mut Trace,
    key: &str,
    values: &Option<Vec<Value>>,
    i: usize,
    ctx: &mut Ctx,
) {
    let Some(values) = values else {
        return;
    };
    match values.get(i) {
        Some(value) if !value.is_null() => trace.set(key, value.clone()),
        Some(_) => {}
        None => ctx.warn(format!("{key} has no entry for column {}", i + 1)),
    }
}
