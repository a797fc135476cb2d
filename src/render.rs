//! Report assembly: hand the normalized structures to the external renderer.
//!
//! The renderer lives in the browser, so "calling" it means emitting an HTML
//! page with one container div per plot and a script invoking the library's
//! create-plot entry point on the embedded figure JSON.

use anyhow::Result;
use serde::Serialize;

use crate::normalize::{normalize, LegendGroups, Normalized};
use crate::spec::PlotSpec;

/// Options forwarded to the renderer's create-plot call.
///
/// Both historical flags are surfaced explicitly: `static_plot` disables all
/// interaction, `display_mode_bar` toggles the toolbar. Defaults depend on
/// the plot form (xy and heat maps render static, sankey and box plots stay
/// interactive); the mode bar defaults to the opposite of the resolved
/// static flag. Explicit spec values win over both defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    pub static_plot: bool,
    pub display_mode_bar: bool,
}

impl RenderConfig {
    pub fn resolve(spec: &PlotSpec) -> Self {
        let (static_default, explicit_static, explicit_bar) = match spec {
            PlotSpec::Xy(s) => (true, s.static_plot, s.display_mode_bar),
            PlotSpec::HeatMap(s) => (true, s.static_plot, s.display_mode_bar),
            PlotSpec::Sankey(s) => (false, s.static_plot, s.display_mode_bar),
            PlotSpec::Box(s) => (false, s.static_plot, s.display_mode_bar),
            PlotSpec::Horizon(_) => (false, None, None),
        };
        let static_plot = explicit_static.unwrap_or(static_default);
        let display_mode_bar = explicit_bar.unwrap_or(!static_plot);
        Self {
            static_plot,
            display_mode_bar,
        }
    }
}

/// One page session: owns the legend-group allocator and assigns sequential
/// container ids, so several plots on one page never collide.
pub struct Report {
    title: String,
    legend: LegendGroups,
    plots: Vec<ReportPlot>,
}

struct ReportPlot {
    id: String,
    normalized: Normalized,
    config: RenderConfig,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            legend: LegendGroups::new(),
            plots: Vec::new(),
        }
    }

    /// Normalize `spec` and queue it for the page. Returns the validation
    /// warnings collected while normalizing.
    pub fn add_plot(&mut self, spec: &PlotSpec) -> Result<Vec<String>> {
        let normalized = normalize(spec, &mut self.legend)?;
        let warnings = normalized.warnings().to_vec();
        let id = format!("plot{}", self.plots.len() + 1);
        self.plots.push(ReportPlot {
            id,
            normalized,
            config: RenderConfig::resolve(spec),
        });
        Ok(warnings)
    }

    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    /// Render the whole page.
    ///
    /// Note: the page body is assembled with string replacement rather than
    /// `format!` because the template is full of CSS/JS braces.
    pub fn to_html(&self) -> Result<String> {
        let mut body = String::new();
        let mut needs_horizon = false;

        for plot in &self.plots {
            body.push_str(&format!("<div id=\"{}\" class=\"plot\"></div>\n", plot.id));
            match &plot.normalized {
                Normalized::Figure(figure) => {
                    let data = embed_json(serde_json::to_string(&figure.data)?);
                    let layout = embed_json(serde_json::to_string(&figure.layout)?);
                    let config = embed_json(serde_json::to_string(&plot.config)?);
                    body.push_str(&format!(
                        "<script>Plotly.newPlot(\"{}\", {data}, {layout}, {config});</script>\n",
                        plot.id
                    ));
                }
                Normalized::Horizon(horizon) => {
                    needs_horizon = true;
                    let spec = embed_json(serde_json::to_string(horizon)?);
                    body.push_str(&format!(
                        "<script>renderHorizonPlot(\"{}\", {spec});</script>\n",
                        plot.id
                    ));
                }
            }
        }

        let head_extra = if needs_horizon { HORIZON_HEAD } else { "" };
        Ok(TEMPLATE
            .replace("__TITLE__", &escape_html(&self.title))
            .replace("__HEAD_EXTRA__", head_extra)
            .replace("__BODY__", &body))
    }
}

/// Make a JSON string safe to embed inside a `<script>` element.
fn embed_json(json: String) -> String {
    json.replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>__TITLE__</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js" charset="utf-8"></script>
__HEAD_EXTRA__<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  header { padding: 12px 16px; border-bottom: 1px solid #ddd; }
  .plot { margin: 16px auto; }
</style>
</head>
<body>
<header><h1>__TITLE__</h1></header>
__BODY__</body>
</html>
"#;

/// Bridge for the streaming horizon widget: axis on top, one horizon strip
/// per series, a focus rule echoing values under the cursor.
const HORIZON_HEAD: &str = r#"<script src="https://cdnjs.cloudflare.com/ajax/libs/d3/3.5.17/d3.min.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/cubism/1.6.0/cubism.v1.min.js"></script>
<style>
  .axis { font: 10px sans-serif; }
  .horizon { border-bottom: solid 1px #000; overflow: hidden; position: relative; }
  .horizon + .horizon { border-top: none; }
  .horizon canvas { display: block; }
  .horizon .title, .horizon .value { bottom: 0; line-height: 30px; margin: 0 6px; position: absolute; font-family: sans-serif; }
  .horizon .title { left: 0; }
  .horizon .value { right: 0; }
  .rule { background: #000; opacity: .2; position: absolute; top: 0; bottom: 0; width: 1px; pointer-events: none; }
</style>
<script>
function renderHorizonPlot(id, spec) {
  var div = d3.select('#' + id);
  var context = cubism.context()
      .serverDelay(Date.now() - spec.startInstantMs - spec.timeStep * 1000 * spec.size)
      .clientDelay(0)
      .step(spec.timeStep * 1000)
      .size(spec.size)
      .stop();
  div.attr('style', 'width:' + spec.size + 'px;position:relative');
  div.append('div')
      .attr('class', 'axis')
      .call(context.axis().orient('top')
          .ticks(spec.tickCount || 6)
          .tickFormat(d3.time.format(spec.timestampFormat || '%H:%M')));
  spec.strips.forEach(function(strip) {
    var metric = context.metric(function(start, stop, step, callback) {
      callback(null, strip.data);
    }, strip.label);
    var horizon = context.horizon();
    if (strip.height != null) { horizon.height(strip.height); }
    if (strip.min != null && strip.max != null) { horizon.extent([strip.min, strip.max]); }
    div.append('div').datum(metric).attr('class', 'horizon').call(horizon);
  });
  div.append('div').attr('class', 'rule').call(context.rule());
  context.on('focus', function(i) {
    d3.selectAll('.value').style('right', i == null ? null : context.size() - i + 'px');
  });
}
</script>
"#;
