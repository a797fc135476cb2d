// Library exports for tracegraph

pub mod builder;
pub mod figure;
pub mod frame;
pub mod horizon;
pub mod normalize;
pub mod render;
pub mod spec;
pub mod time;

pub use figure::{Figure, Layout, Trace};
pub use frame::{Column, Frame};
pub use normalize::{normalize, LegendGroups, Normalized};
pub use render::{RenderConfig, Report};
pub use spec::PlotSpec;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum OutputFormat {
    #[serde(rename = "json")]
    #[default]
    Json,
    #[serde(rename = "html")]
    Html,
}
