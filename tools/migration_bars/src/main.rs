/// Per-scenario bar chart of ensemble-mean climate-class transitions.
///
/// For every scenario × time slice, reads each model's canonical CHELSA
/// Köppen–Geiger raster, counts origin-class pixels that change class inside
/// the bounding box, and plots the most frequent transitions with their
/// across-model standard deviation. A JSON summary is written next to each PNG.
mod chart;

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use koppen_core::progress::ModelProgress;
use koppen_core::summary::{write_json, EnsembleReport};
use koppen_core::{aggregate, collect_ensemble, logging, Baseline, BoundingBox, ModelSource, RunConfig, ZeroPolicy};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "migration_bars",
    about = "Bar chart of Köppen-Geiger transitions away from one class, per scenario and time slice"
)]
struct Args {
    /// JSON run configuration (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only this scenario, e.g. ssp126
    #[arg(long)]
    scenario: Option<String>,

    /// Only this time slice, e.g. 2071-2100
    #[arg(long)]
    time_slice: Option<String>,

    /// Bounding box as W,S,E,N degrees, or `alps` / `central-asia`
    #[arg(long)]
    bbox: Option<BoundingBox>,

    /// Root of the CHELSA climatologies tree
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Output directory (created if absent)
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// zero-fill or observed-only
    #[arg(long)]
    zero_policy: Option<ZeroPolicy>,

    /// Number of transitions to plot
    #[arg(long)]
    top_n: Option<usize>,

    /// Default tracing filter; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Hide progress bars
    #[arg(short, long)]
    quiet: bool,
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(scenario) = &args.scenario {
        config.scenarios = vec![scenario.clone()];
    }
    if let Some(time_slice) = &args.time_slice {
        config.time_slices = vec![time_slice.clone()];
    }
    if let Some(bbox) = args.bbox {
        config.bbox = bbox;
    }
    if let Some(base_dir) = &args.base_dir {
        config.base_dir = base_dir.clone();
    }
    if let Some(policy) = args.zero_policy {
        config.zero_policy = policy;
    }
    if let Some(top_n) = args.top_n {
        config.display.top_n = top_n;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let classes = config.class_table();
    let layout = config.layout();
    let origin = config.origin_class;
    let origin_label = classes.label(origin);

    fs::create_dir_all(&args.output)
        .with_context(|| format!("cannot create output directory {}", args.output.display()))?;

    let historical = layout.historical_path();
    let baseline = Baseline::load(&historical, config.bbox)
        .with_context(|| format!("loading baseline {}", historical.display()))?;
    let origin_pixels = baseline.origin_count(origin);
    info!(origin = origin_label, origin_pixels, bbox = %config.bbox, "baseline ready");
    if origin_pixels == 0 {
        warn!(origin = origin_label, "no origin-class pixels inside the bounding box");
    }

    let progress = if args.quiet { ModelProgress::hidden() } else { ModelProgress::new() };

    for scenario in &config.scenarios {
        for time_slice in &config.time_slices {
            let inputs = collect_ensemble(
                &layout,
                &baseline,
                scenario,
                time_slice,
                &config.models,
                origin,
                ModelSource::Named,
                &progress,
            )
            .with_context(|| format!("collecting {scenario} {time_slice}"))?;
            let summary = aggregate(&inputs.tallies, config.zero_policy);
            let bars = chart::top_bars(&summary, origin, config.display.top_n, &classes);

            let stem = format!("{origin_label}_classification_aggregated_migrations_{time_slice}_{scenario}");
            let png = args.output.join(format!("{stem}.png"));
            let title = format!(
                "{origin_label} transitions, {scenario} {time_slice} ({} models)",
                summary.model_count
            );
            chart::render(&png, &bars, &title, config.display.x_max)
                .map_err(|e| anyhow!("rendering {}: {e}", png.display()))?;

            let report = EnsembleReport::new(
                scenario,
                time_slice,
                origin,
                origin_pixels,
                &inputs.contributors,
                &summary,
                &classes,
            );
            let json = args.output.join(format!("{stem}.json"));
            write_json(&json, &report).with_context(|| format!("writing {}", json.display()))?;

            info!(png = %png.display(), bars = bars.len(), "wrote chart");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);
    run(&args)
}
