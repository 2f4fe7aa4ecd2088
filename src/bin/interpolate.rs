//! eegrasp-interpolate: rebuild missing EEG channels from a safetensors
//! recording.
//!
//! Input keys:
//!   data        [C, T]  F32/F64  missing channels as NaN rows (or use --missing)
//!   chan_pos    [C, D]  F32/F64  electrode positions, D ∈ {2, 3}
//!   ch_names    U8               optional, newline-separated
//!
//! Output keys:
//!   data        [C, T]  F64  reconstructed recording
//!   distance    [C, C]  F64  distances the graph was built from
//!   adjacency   [C, C]  F64  Gaussian graph weights
//!   missing     [M]     I32  reconstructed channel indices
//!   filled      [K]     I32  channels left at the fill value (unreachable)
//!   epsilon, sigma [1]  F64  parameters used
use anyhow::{ensure, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use eegrasp::{
    io::{RawData, StWriter},
    ChannelInterpolator, DistanceGraphBuilder, GraphConfig,
};

#[derive(Parser, Debug)]
#[command(name = "eegrasp-interpolate", version, about = "Graph-based EEG channel interpolation")]
struct Args {
    /// raw.safetensors with `data`, `chan_pos` and optionally `ch_names`.
    #[arg(long)]
    input: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Channel names to reconstruct (comma-separated).  Default: NaN rows.
    #[arg(long, default_value = "")]
    missing: String,

    /// Distance threshold.  Estimated from the montage when omitted.
    #[arg(long)]
    epsilon: Option<f64>,

    /// Gaussian kernel width.  Estimated from the montage when omitted.
    #[arg(long)]
    sigma: Option<f64>,

    /// Use raw distances instead of distances scaled to [0, 1].
    #[arg(long, default_value_t = false)]
    no_normalize: bool,

    /// Value for channels with no path to an observed channel.
    #[arg(long, default_value_t = 0.0)]
    fill_value: f64,

    /// Log level: trace, debug, info, warn, error.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(
            args.log_level
                .parse::<tracing_subscriber::filter::LevelFilter>()
                .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO),
        )
        .with_target(false)
        .init();

    let raw = RawData::load(&args.input)?;
    info!(channels = raw.data.nrows(), samples = raw.data.ncols(), "loaded recording");
    let sensors = raw.sensors()?;

    let cfg = GraphConfig {
        epsilon: args.epsilon,
        sigma: args.sigma,
        normalize_distances: !args.no_normalize,
        fill_value: args.fill_value,
        ..GraphConfig::default()
    };

    let missing: Vec<usize> = if args.missing.is_empty() {
        eegrasp::missing_rows(raw.data.view(), cfg.missing_marker)
    } else {
        let names: Vec<&str> = args.missing.split(',').map(str::trim).collect();
        sensors.indices_of(&names)?
    };
    ensure!(!missing.is_empty(), "no missing channels: pass --missing or mark rows with NaN");
    info!(
        missing = ?missing.iter().map(|&i| sensors.names()[i].as_str()).collect::<Vec<_>>(),
        "reconstructing"
    );

    let graph = DistanceGraphBuilder::new(cfg.clone()).build(&sensors)?;
    info!(
        epsilon = graph.params.epsilon,
        sigma = graph.params.sigma,
        edges = graph.adjacency.n_edges(),
        "graph built"
    );

    let result = ChannelInterpolator::default()
        .with_fill_value(cfg.fill_value)
        .interpolate(&raw.data, &graph.adjacency, &missing)?;
    for w in &result.warnings {
        warn!(channel = %sensors.names()[w.channel], "{w}");
    }

    let mut out = StWriter::new();
    out.add_f64_arr2("data", &result.data);
    out.add_f64_arr2("distance", &graph.distance.view().to_owned());
    out.add_f64_arr2("adjacency", &graph.adjacency.view().to_owned());
    let idx: Vec<i32> = result.missing.iter().map(|&i| i as i32).collect();
    out.add_i32("missing", &idx, &[idx.len()]);
    let filled: Vec<i32> = result.warnings.iter().map(|w| w.channel as i32).collect();
    out.add_i32("filled", &filled, &[filled.len()]);
    out.add_f64("epsilon", &[graph.params.epsilon], &[1]);
    out.add_f64("sigma", &[graph.params.sigma], &[1]);
    out.add_f64_arr2("chan_pos", &sensors.positions().to_owned());
    out.add_names("ch_names", sensors.names());
    out.write(&args.output)?;
    info!(path = %args.output.display(), "written");

    Ok(())
}
