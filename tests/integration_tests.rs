use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use tracegraph::normalize::{normalize, LegendGroups, Normalized};
use tracegraph::spec::PlotSpec;

/// Normalize a spec given as JSON and return (traces, layout) as JSON values.
fn run(spec: Value) -> (Vec<Value>, Value) {
    let mut legend = LegendGroups::new();
    run_with(spec, &mut legend)
}

fn run_with(spec: Value, legend: &mut LegendGroups) -> (Vec<Value>, Value) {
    let spec = PlotSpec::from_value(spec).expect("spec should parse");
    let normalized = normalize(&spec, legend).expect("normalization should succeed");
    let Normalized::Figure(figure) = normalized else {
        panic!("expected a figure");
    };
    let traces = figure
        .data
        .iter()
        .map(|t| serde_json::to_value(t).unwrap())
        .collect();
    let layout = serde_json::to_value(&figure.layout).unwrap();
    (traces, layout)
}

#[test]
fn scatter_defaults_to_marker_mode() {
    let (traces, layout) = run(json!({
        "data": [{"type": "scatter", "frame": [
            {"name": "t", "values": [1, 2, 3]},
            {"name": "v", "values": [10, 20, 30]},
        ]}],
    }));
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0]["x"], json!([1, 2, 3]));
    assert_eq!(traces[0]["y"], json!([10, 20, 30]));
    assert_eq!(traces[0]["mode"], json!("markers"));
    assert_eq!(traces[0]["name"], json!("v"));
    assert_eq!(layout["margin"]["l"], json!(50));
}

#[test]
fn line_defaults_to_line_mode() {
    let (traces, _) = run(json!({
        "data": [{"type": "line", "frame": [
            {"name": "t", "values": [1, 2]},
            {"name": "v", "values": [3, 4]},
        ]}],
    }));
    assert_eq!(traces[0]["mode"], json!("lines"));
    assert!(traces[0].get("type").is_none());
}

#[test]
fn stacked_bar_sets_barmode() {
    let (traces, layout) = run(json!({
        "data": [{"type": "stackedBar", "frame": [
            {"name": "q", "values": ["q1", "q2"]},
            {"name": "east", "values": [1, 2]},
            {"name": "west", "values": [3, 4]},
        ]}],
    }));
    assert_eq!(traces.len(), 2);
    for trace in &traces {
        assert_eq!(trace["type"], json!("bar"));
    }
    assert_eq!(layout["barmode"], json!("stack"));
}

#[test]
fn overlay_bar_sets_barmode() {
    let (_, layout) = run(json!({
        "data": [{"type": "overlayBar", "frame": [
            {"name": "q", "values": ["q1"]},
            {"name": "east", "values": [1]},
        ]}],
    }));
    assert_eq!(layout["barmode"], json!("overlay"));
}

#[test]
fn continuous_error_bars_band() {
    let (traces, _) = run(json!({
        "data": [{"type": "continuousErrorBars", "frame": [
            {"name": "t", "values": [0, 1, 2]},
            {"name": "mean", "values": [10, 20, 30]},
            {"name": "dev", "values": [1, 2, 3]},
        ]}],
    }));
    // mean line, then the lower bound, then the upper filling down onto it
    assert_eq!(traces.len(), 3);
    let mean = &traces[0];
    let lower = &traces[1];
    let upper = &traces[2];

    assert_eq!(mean["mode"], json!("lines"));
    assert_eq!(mean["type"], json!("scatter"));

    assert_eq!(upper["y"], json!([11.0, 22.0, 33.0]));
    assert_eq!(upper["fill"], json!("tonexty"));
    assert_eq!(upper["showlegend"], json!(false));
    assert_eq!(upper["line"], json!({"color": "transparent"}));

    assert_eq!(lower["y"], json!([9.0, 18.0, 27.0]));
    assert!(lower.get("fill").is_none());

    let group = &mean["legendgroup"];
    assert!(group.is_string());
    assert_eq!(&upper["legendgroup"], group);
    assert_eq!(&lower["legendgroup"], group);
}

#[test]
fn horizontal_orientation_swaps_axes() {
    let columns = json!([
        {"name": "cat", "values": ["a", "b"]},
        {"name": "count", "values": [5, 7]},
    ]);
    let (vertical, _) = run(json!({
        "data": [{"type": "bar", "frame": columns, "orientation": "v"}],
    }));
    let (horizontal, _) = run(json!({
        "data": [{"type": "bar", "frame": columns, "orientation": "h"}],
    }));
    assert_eq!(vertical[0]["x"], horizontal[0]["y"]);
    assert_eq!(vertical[0]["y"], horizontal[0]["x"]);
}

#[test]
fn timestamp_axis_converts_x_values() {
    let (traces, layout) = run(json!({
        "typeX": "timestamp",
        "data": [{"type": "line", "frame": [
            {"name": "t", "values": ["1970-01-01T00:00:00Z", "1970-01-01T00:00:01Z"]},
            {"name": "v", "values": [1, 2]},
        ]}],
    }));
    assert_eq!(traces[0]["x"], json!([0, 1000]));
    assert_eq!(layout["xaxis"]["type"], json!("date"));
}

#[test]
fn non_timestamp_axis_leaves_x_untouched() {
    let (traces, layout) = run(json!({
        "data": [{"type": "line", "frame": [
            {"name": "t", "values": ["1970-01-01T00:00:00Z"]},
            {"name": "v", "values": [1]},
        ]}],
    }));
    assert_eq!(traces[0]["x"], json!(["1970-01-01T00:00:00Z"]));
    assert!(layout["xaxis"].get("type").is_none());
}

#[test]
fn pie_yields_single_trace_without_axes() {
    let (traces, layout) = run(json!({
        "title": "share",
        "data": [{"type": "pie", "hole": 0.4, "frame": [
            {"name": "label", "values": ["a", "b", "c"]},
            {"name": "amount", "values": [5, 3, 2]},
            {"name": "ignored", "values": [1, 1, 1]},
        ]}],
    }));
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0]["type"], json!("pie"));
    assert_eq!(traces[0]["labels"], json!(["a", "b", "c"]));
    assert_eq!(traces[0]["values"], json!([5, 3, 2]));
    assert_eq!(traces[0]["hole"], json!(0.4));
    assert!(traces[0].get("x").is_none());
    assert!(traces[0].get("y").is_none());
    assert!(layout.get("xaxis").is_none());
    assert!(layout.get("yaxis").is_none());
    assert_eq!(layout["title"], json!("share"));
}

#[test]
fn legend_groups_advance_across_plots() {
    let pie = json!({
        "data": [{"type": "pie", "frame": [
            {"name": "label", "values": ["a"]},
            {"name": "amount", "values": [1]},
        ]}],
    });
    let mut legend = LegendGroups::new();
    run_with(pie.clone(), &mut legend);
    run_with(pie, &mut legend);
    // allocated per frame even though pie traces never reference a group
    assert_eq!(legend.allocated(), 2);
}

#[test]
fn ohlc_maps_columns_by_name() {
    let (traces, _) = run(json!({
        "name": "AAPL",
        "data": [{"type": "ohlc", "frame": [
            {"name": "date", "values": ["2024-01-01", "2024-01-02"]},
            {"name": "open", "values": [10, 11]},
            {"name": "high", "values": [12, 13]},
            {"name": "low", "values": [9, 10]},
            {"name": "close", "values": [11, 12]},
        ]}],
    }));
    assert_eq!(traces.len(), 1);
    let trace = &traces[0];
    assert_eq!(trace["type"], json!("ohlc"));
    assert_eq!(trace["x"], json!(["2024-01-01", "2024-01-02"]));
    assert_eq!(trace["open"], json!([10, 11]));
    assert_eq!(trace["close"], json!([11, 12]));
    assert_eq!(trace["name"], json!("AAPL"));
    assert!(trace.get("y").is_none());
}

#[test]
fn ohlc_name_falls_back_to_index_column() {
    let (traces, _) = run(json!({
        "data": [{"type": "ohlc", "frame": [
            {"name": "date", "values": ["2024-01-01"]},
            {"name": "open", "values": [10]},
        ]}],
    }));
    assert_eq!(traces[0]["name"], json!("date"));
}

#[test]
fn axis_labels_land_in_layout() {
    let (_, layout) = run(json!({
        "x": {"label": "time"},
        "y": {"label": "value"},
        "data": [],
    }));
    assert_eq!(layout["xaxis"]["title"], json!("time"));
    assert_eq!(layout["yaxis"]["title"], json!("value"));
}

#[test]
fn heat_map_single_trace() {
    let (traces, layout) = run(json!({
        "type": "heatMap",
        "title": "intensity",
        "rangeX": ["a", "b"],
        "rangeY": [0, 1],
        "z": [[1, 2], [3, 4]],
        "labelX": "col",
        "showscale": true,
    }));
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0]["type"], json!("heatmap"));
    assert_eq!(traces[0]["z"], json!([[1, 2], [3, 4]]));
    assert_eq!(traces[0]["showscale"], json!(true));
    assert_eq!(layout["xaxis"]["title"], json!("col"));
    assert!(layout["yaxis"].get("title").is_none());
    assert_eq!(layout["title"], json!("intensity"));
}

#[test]
fn sankey_links_from_columns() {
    let (traces, layout) = run(json!({
        "type": "sankey",
        "title": "flows",
        "frame": [
            {"name": "idx", "values": [0, 1]},
            {"name": "source", "values": [0, 0]},
            {"name": "target", "values": [1, 2]},
            {"name": "value", "values": [8, 2]},
        ],
        "nodeLabels": ["in", "out", "loss"],
        "linkLabels": ["main", "waste"],
    }));
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0]["type"], json!("sankey"));
    assert_eq!(traces[0]["node"]["label"], json!(["in", "out", "loss"]));
    assert_eq!(traces[0]["link"]["label"], json!(["main", "waste"]));
    assert_eq!(layout["title"], json!("flows"));
}

#[test]
fn box_one_trace_per_column() {
    let (traces, _) = run(json!({
        "type": "box",
        "frame": [
            {"name": "idx", "values": [0, 1, 2]},
            {"name": "a", "values": [1, 2, 3]},
            {"name": "b", "values": [4, 5, 6]},
        ],
    }));
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0]["type"], json!("box"));
    assert_eq!(traces[0]["y"], json!([1, 2, 3]));
    assert_eq!(traces[1]["name"], json!("b"));
}

#[test]
fn missing_frame_is_fatal() {
    let spec = PlotSpec::from_value(json!({
        "data": [{"type": "line"}],
    }))
    .unwrap();
    let mut legend = LegendGroups::new();
    assert!(normalize(&spec, &mut legend).is_err());
}

#[test]
fn mismatched_column_lengths_are_fatal() {
    let spec = PlotSpec::from_value(json!({
        "data": [{"type": "line", "frame": [
            {"name": "t", "values": [1, 2, 3]},
            {"name": "v", "values": [1]},
        ]}],
    }))
    .unwrap();
    let mut legend = LegendGroups::new();
    assert!(normalize(&spec, &mut legend).is_err());
}

#[test]
fn short_override_array_warns_but_continues() {
    let spec = PlotSpec::from_value(json!({
        "markers": [{"color": "red"}],
        "data": [{"type": "bar", "frame": [
            {"name": "t", "values": [1]},
            {"name": "a", "values": [2]},
            {"name": "b", "values": [3]},
        ]}],
    }))
    .unwrap();
    let mut legend = LegendGroups::new();
    let Normalized::Figure(figure) = normalize(&spec, &mut legend).unwrap() else {
        panic!("expected a figure");
    };
    assert_eq!(figure.data.len(), 2);
    let first = serde_json::to_value(&figure.data[0]).unwrap();
    assert_eq!(first["marker"], json!({"color": "red"}));
    let second = serde_json::to_value(&figure.data[1]).unwrap();
    assert!(second.get("marker").is_none());
    assert_eq!(figure.warnings.len(), 1);
}

#[test]
fn multi_frame_specs_share_one_layout() {
    let (traces, layout) = run(json!({
        "y2": {"label": "volume"},
        "data": [
            {"type": "line", "frame": [
                {"name": "t", "values": [1, 2]},
                {"name": "price", "values": [10, 11]},
            ]},
            {"type": "bar", "y2": true, "frame": [
                {"name": "t", "values": [1, 2]},
                {"name": "volume", "values": [100, 200]},
            ]},
        ],
    }));
    assert_eq!(traces.len(), 2);
    assert!(traces[0].get("yaxis").is_none());
    assert_eq!(traces[1]["yaxis"], json!("y2"));
    assert_eq!(layout["yaxis2"]["overlaying"], json!("y"));
    assert_eq!(layout["yaxis2"]["side"], json!("right"));
    assert_eq!(layout["yaxis2"]["title"], json!("volume"));
}

#[test]
fn horizon_spec_prepares_widget_bridge() {
    let spec = PlotSpec::from_value(json!({
        "type": "horizon",
        "startTimestamp": "2024-01-01T00:00:00Z",
        "timeStep": 60.0,
        "tickCount": 12,
        "plots": [
            {"label": "cpu", "data": [0.1, 0.2, 0.3], "min": 0.0, "max": 1.0},
            {"label": "mem", "data": [0.5, 0.6, 0.7], "min": 0.0, "max": 1.0},
        ],
    }))
    .unwrap();
    let mut legend = LegendGroups::new();
    let Normalized::Horizon(plot) = normalize(&spec, &mut legend).unwrap() else {
        panic!("expected a horizon plot");
    };
    assert_eq!(plot.size, 3);
    assert_eq!(plot.strips.len(), 2);
    assert_eq!(plot.strips[1].label.as_deref(), Some("mem"));
}
