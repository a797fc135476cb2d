// Convenience constructors for the standard plot styles. Callers with more
// exotic needs build the spec structures (or JSON) directly.

use serde_json::Value;

use crate::frame::Frame;
use crate::spec::{
    AxisSpec, BoxSpec, DataSpec, ErrorBarSpec, HeatMapSpec, Orientation, PlotSpec, SankeySpec,
    SeriesKind, XAxisType, XySpec,
};

/// Plot labels (title, axes).
#[derive(Debug, Clone, Default)]
pub struct Labels {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub y2_label: Option<String>,
}

impl Labels {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    fn apply(self, spec: &mut XySpec) {
        spec.title = self.title;
        if let Some(label) = self.x_label {
            spec.x = Some(AxisSpec {
                label: Some(label),
                bins: None,
            });
        }
        if let Some(label) = self.y_label {
            spec.y = Some(AxisSpec {
                label: Some(label),
                bins: None,
            });
        }
        if let Some(label) = self.y2_label {
            spec.y2 = Some(AxisSpec {
                label: Some(label),
                bins: None,
            });
        }
    }
}

fn series(kind: SeriesKind, frame: Frame) -> DataSpec {
    DataSpec {
        kind,
        frame,
        ..Default::default()
    }
}

fn xy(data: Vec<DataSpec>, labels: Labels) -> XySpec {
    let mut spec = XySpec {
        data,
        ..Default::default()
    };
    labels.apply(&mut spec);
    spec
}

fn orientation(horizontal: bool) -> Orientation {
    if horizontal {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    }
}

pub fn line(frame: Frame, labels: Labels) -> PlotSpec {
    PlotSpec::Xy(xy(vec![series(SeriesKind::Line, frame)], labels))
}

pub fn scatter(frame: Frame, labels: Labels) -> PlotSpec {
    PlotSpec::Xy(xy(vec![series(SeriesKind::Scatter, frame)], labels))
}

/// Line plot over a timestamp index.
pub fn time(frame: Frame, labels: Labels) -> PlotSpec {
    let mut spec = xy(vec![series(SeriesKind::Line, frame)], labels);
    spec.type_x = Some(XAxisType::Timestamp);
    PlotSpec::Xy(spec)
}

pub fn bar(frame: Frame, stacked: bool, horizontal: bool, labels: Labels) -> PlotSpec {
    let kind = if stacked {
        SeriesKind::StackedBar
    } else {
        SeriesKind::Bar
    };
    let mut data = series(kind, frame);
    data.orientation = Some(orientation(horizontal));
    PlotSpec::Xy(xy(vec![data], labels))
}

pub fn bar_overlay(frame: Frame, horizontal: bool, labels: Labels) -> PlotSpec {
    let mut data = series(SeriesKind::OverlayBar, frame);
    data.orientation = Some(orientation(horizontal));
    PlotSpec::Xy(xy(vec![data], labels))
}

pub fn histogram(frame: Frame, labels: Labels) -> PlotSpec {
    PlotSpec::Xy(xy(vec![series(SeriesKind::Histogram, frame)], labels))
}

pub fn pie(frame: Frame, hole: Option<f64>, labels: Labels) -> PlotSpec {
    let mut data = series(SeriesKind::Pie, frame);
    data.hole = hole;
    PlotSpec::Xy(xy(vec![data], labels))
}

pub fn ohlc(frame: Frame, labels: Labels) -> PlotSpec {
    PlotSpec::Xy(xy(vec![series(SeriesKind::Ohlc, frame)], labels))
}

/// Scatter with error bars from columns 2 (and 3 for the asymmetric form).
pub fn error_bars(frame: Frame, symmetric: bool, labels: Labels) -> PlotSpec {
    let mut data = series(SeriesKind::Scatter, frame);
    data.error_bars = Some(ErrorBarSpec { symmetric });
    PlotSpec::Xy(xy(vec![data], labels))
}

/// Continuous error band around a mean line (mean and deviation columns).
pub fn error_line(frame: Frame, fillcolor: Option<String>, labels: Labels) -> PlotSpec {
    let mut data = series(SeriesKind::ContinuousErrorBars, frame);
    data.fillcolor = Some(fillcolor.unwrap_or_else(|| "rgba(0,100,80,0.2)".to_string()));
    PlotSpec::Xy(xy(vec![data], labels))
}

pub fn box_plot(
    frame: Frame,
    groups: Option<Vec<Value>>,
    horizontal: bool,
    labels: Labels,
) -> PlotSpec {
    PlotSpec::Box(BoxSpec {
        title: labels.title,
        frame,
        orientation: Some(orientation(horizontal)),
        groups,
        ..Default::default()
    })
}

pub fn sankey(
    frame: Frame,
    link_labels: Option<Vec<String>>,
    horizontal: bool,
    labels: Labels,
) -> PlotSpec {
    PlotSpec::Sankey(SankeySpec {
        title: labels.title,
        frame,
        orientation: Some(orientation(horizontal)),
        link_labels,
        ..Default::default()
    })
}

pub fn heat_map(
    z: Value,
    range_x: Option<Value>,
    range_y: Option<Value>,
    labels: Labels,
) -> PlotSpec {
    PlotSpec::HeatMap(HeatMapSpec {
        title: labels.title,
        z: Some(z),
        range_x,
        range_y,
        label_x: labels.x_label,
        label_y: labels.y_label,
        ..Default::default()
    })
}

/// Several frames with their own styles on one plot; `y2` flags series onto
/// the secondary axis.
pub fn multi(frames: Vec<(Frame, SeriesKind)>, y2: Option<Vec<bool>>, labels: Labels) -> PlotSpec {
    let data = frames
        .into_iter()
        .enumerate()
        .map(|(i, (frame, kind))| {
            let mut data = series(kind, frame);
            data.y2 = y2
                .as_ref()
                .and_then(|flags| flags.get(i).copied())
                .unwrap_or(false);
            data
        })
        .collect();
    PlotSpec::Xy(xy(data, labels))
}
