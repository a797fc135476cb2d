use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use tracegraph::builder::{self, Labels};
use tracegraph::frame::Frame;
use tracegraph::normalize::{normalize, LegendGroups};
use tracegraph::render::Report;
use tracegraph::spec::PlotSpec;
use tracegraph::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "tracegraph")]
#[command(about = "Normalize declarative plot specs into renderer-ready figures", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a plot spec (JSON file, or '-' for stdin)
    Render {
        /// Path to the spec JSON, or '-' to read stdin
        spec: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Page title for HTML output
        #[arg(long)]
        title: Option<String>,
    },
    /// Build a plot from CSV data (file, or stdin when omitted)
    Quick {
        #[arg(long, value_enum)]
        kind: QuickKind,
        /// CSV input path; reads stdin when omitted
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        x_label: Option<String>,
        #[arg(long)]
        y_label: Option<String>,
        /// Stack bars (bar kind only)
        #[arg(long)]
        stacked: bool,
        /// Horizontal orientation (bar and box kinds)
        #[arg(long)]
        horizontal: bool,
        /// Donut hole fraction (pie kind only)
        #[arg(long)]
        hole: Option<f64>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum QuickKind {
    Line,
    Scatter,
    Time,
    Bar,
    BarOverlay,
    Histogram,
    Pie,
    Ohlc,
    Box,
    ErrorBars,
    ErrorLine,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Render {
            spec,
            format,
            output,
            title,
        } => {
            let text = read_input(&spec).context("failed to read plot spec")?;
            let spec = PlotSpec::from_json(&text)?;
            emit(&spec, format, output, title)
        }
        Command::Quick {
            kind,
            csv,
            title,
            x_label,
            y_label,
            stacked,
            horizontal,
            hole,
            format,
            output,
        } => {
            let frame = read_frame(csv.as_deref()).context("failed to read CSV data")?;
            let labels = Labels {
                title: title.clone(),
                x_label,
                y_label,
                y2_label: None,
            };
            let spec = build_quick(kind, frame, labels, stacked, horizontal, hole);
            emit(&spec, format, output, title)
        }
    }
}

fn build_quick(
    kind: QuickKind,
    frame: Frame,
    labels: Labels,
    stacked: bool,
    horizontal: bool,
    hole: Option<f64>,
) -> PlotSpec {
    match kind {
        QuickKind::Line => builder::line(frame, labels),
        QuickKind::Scatter => builder::scatter(frame, labels),
        QuickKind::Time => builder::time(frame, labels),
        QuickKind::Bar => builder::bar(frame, stacked, horizontal, labels),
        QuickKind::BarOverlay => builder::bar_overlay(frame, horizontal, labels),
        QuickKind::Histogram => builder::histogram(frame, labels),
        QuickKind::Pie => builder::pie(frame, hole, labels),
        QuickKind::Ohlc => builder::ohlc(frame, labels),
        QuickKind::Box => builder::box_plot(frame, None, horizontal, labels),
        QuickKind::ErrorBars => builder::error_bars(frame, true, labels),
        QuickKind::ErrorLine => builder::error_line(frame, None, labels),
    }
}

fn emit(
    spec: &PlotSpec,
    format: OutputFormat,
    output: Option<PathBuf>,
    title: Option<String>,
) -> Result<()> {
    let text = match format {
        OutputFormat::Json => {
            let mut legend = LegendGroups::new();
            let normalized = normalize(spec, &mut legend)?;
            let mut json = serde_json::to_string_pretty(&normalized)
                .context("failed to serialize figure")?;
            json.push('\n');
            json
        }
        OutputFormat::Html => {
            let mut report = Report::new(title.unwrap_or_else(|| "tracegraph report".to_string()));
            report.add_plot(spec)?;
            report.to_html()?
        }
    };
    write_output(output.as_deref(), &text)
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
    }
}

fn read_frame(path: Option<&std::path::Path>) -> Result<Frame> {
    match path {
        Some(path) => {
            let file = fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Frame::from_csv_reader(file)
        }
        None => Frame::from_csv_reader(io::stdin().lock()),
    }
}

fn write_output(path: Option<&std::path::Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(text.as_bytes())?;
            handle.flush().context("failed to flush stdout")
        }
    }
}
