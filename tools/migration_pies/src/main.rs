/// Where do origin-class pixels go? One pie per scenario × time slice.
///
/// Scans each model directory for Köppen–Geiger rasters, averages the
/// destination counts over the ensemble, and draws a grid of pie charts
/// (rows = scenarios, columns = time slices) with the unchanged remainder of
/// the historical origin class as its own slice. All cells are also written
/// to `aggregated_changes.json`.
mod grid;

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use koppen_core::progress::ModelProgress;
use koppen_core::slices::{compose_pie, PieComposition};
use koppen_core::summary::{write_json, EnsembleReport};
use koppen_core::{aggregate_over_models, collect_ensemble, logging, Baseline, BoundingBox, ModelSource, RunConfig};
use serde::Serialize;
use tracing::{info, warn};

use grid::PieCell;

#[derive(Parser, Debug)]
#[command(
    name = "migration_pies",
    about = "Grid of pie charts showing where one Köppen-Geiger class ends up, per scenario and time slice"
)]
struct Args {
    /// JSON run configuration (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only this scenario, e.g. ssp585
    #[arg(long)]
    scenario: Option<String>,

    /// Only this time slice, e.g. 2041-2070
    #[arg(long)]
    time_slice: Option<String>,

    /// Bounding box as W,S,E,N degrees, or `alps` / `central-asia`
    #[arg(long)]
    bbox: Option<BoundingBox>,

    /// Region name used in the output file name
    #[arg(long)]
    region: Option<String>,

    /// Root of the CHELSA climatologies tree
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Output directory (created if absent)
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Default tracing filter; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Hide progress bars
    #[arg(short, long)]
    quiet: bool,
}

/// One grid cell as written to `aggregated_changes.json`.
#[derive(Serialize)]
struct CellOutput {
    #[serde(flatten)]
    report: EnsembleReport,
    pie: Option<PieComposition>,
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
    if let Some(region) = &args.region {
        config.region = region.clone();
    }
    if let Some(base_dir) = &args.base_dir {
        config.base_dir = base_dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let classes = config.class_table();
    let layout = config.layout();
    let origin = config.origin_class;
    let display = &config.display;

    fs::create_dir_all(&args.output)
        .with_context(|| format!("cannot create output directory {}", args.output.display()))?;

    let historical = layout.historical_path();
    let baseline = Baseline::load(&historical, config.bbox)
        .with_context(|| format!("loading baseline {}", historical.display()))?;
    let origin_pixels = baseline.origin_count(origin);
    info!(region = %config.region, origin_pixels, bbox = %config.bbox, "baseline ready");
    if origin_pixels == 0 {
        warn!(origin = classes.label(origin), "no origin-class pixels inside the bounding box, pies show changes only");
    }

    let progress = if args.quiet { ModelProgress::hidden() } else { ModelProgress::new() };
    let mut cells = Vec::new();
    let mut outputs = Vec::new();

    for scenario in &config.scenarios {
        for time_slice in &config.time_slices {
            let inputs = collect_ensemble(
                &layout,
                &baseline,
                scenario,
                time_slice,
                &config.models,
                origin,
                ModelSource::Discover,
                &progress,
            )
            .with_context(|| format!("collecting {scenario} {time_slice}"))?;
            let summary = aggregate_over_models(&inputs.tallies, config.zero_policy, config.models.len());

            let pie = (!inputs.is_empty()).then(|| {
                compose_pie(&summary, origin, origin_pixels, display.min_slice_pct, display.min_unchanged_pct)
            });
            cells.push(PieCell { title: format!("{scenario} {time_slice}"), pie: pie.clone() });
            outputs.push(CellOutput {
                report: EnsembleReport::new(
                    scenario,
                    time_slice,
                    origin,
                    origin_pixels,
                    &inputs.contributors,
                    &summary,
                    &classes,
                ),
                pie,
            });
        }
    }

    let png = args
        .output
        .join(format!("aggregated_migrations_by_scenario_adjusted_{}.png", config.region));
    grid::render(&png, &cells, config.scenarios.len(), config.time_slices.len(), &classes)
        .map_err(|e| anyhow!("rendering {}: {e}", png.display()))?;

    let json = args.output.join("aggregated_changes.json");
    write_json(&json, &outputs).with_context(|| format!("writing {}", json.display()))?;

    info!(png = %png.display(), json = %json.display(), cells = cells.len(), "wrote pie grid");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);
    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_and_bbox_flags_override_defaults() {
        let args = Args::parse_from([
            "migration_pies",
            "--bbox",
            "central-asia",
            "--region",
            "CENTRAL_ASIA",
            "--time-slice",
            "2071-2100",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.bbox, BoundingBox::CENTRAL_ASIA);
        assert_eq!(config.region, "CENTRAL_ASIA");
        assert_eq!(config.time_slices, vec!["2071-2100"]);
        assert_eq!(config.scenarios.len(), 3);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = Args::parse_from(["migration_pies", "--config", "/nonexistent/run.json"]);
        assert!(load_config(&args).is_err());
    }
}
