//! zonalreg CLI - relate gridded point samples to per-zone responses

mod input;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use zonalreg_algorithms::interpolation::IdwSearch;
use zonalreg_algorithms::pipeline::{Pipeline, PipelineConfig, PipelineOutput};
use zonalreg_algorithms::statistics::TouchMode;
use zonalreg_core::raster::{GridSpec, DEFAULT_MARGIN_FRACTION};
use zonalreg_core::PointStore;

use input::{read_dataset, Dataset};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "zonalreg")]
#[command(author, version, about = "IDW gridding, zonal means and OLS residuals", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of an input file and the grid it would use
    Info {
        /// Input JSON file with points and zones
        input: PathBuf,
        /// Cells along the longer axis of the grid
        #[arg(long, default_value = "256")]
        cells: usize,
    },
    /// Run the pipeline for one IDW power
    Run {
        /// Input JSON file with points and zones
        input: PathBuf,
        /// IDW power, 0 to 4
        #[arg(short, long, default_value = "1.0")]
        power: f64,
        #[command(flatten)]
        options: PipelineArgs,
        /// Write the full result as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the pipeline for several IDW powers
    Sweep {
        /// Input JSON file with points and zones
        input: PathBuf,
        /// Comma-separated IDW powers
        #[arg(long, value_delimiter = ',', default_value = "0,0.5,1,1.5,2,2.5,3,3.5,4")]
        powers: Vec<f64>,
        #[command(flatten)]
        options: PipelineArgs,
        /// Write the successful results as a JSON array to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TouchArg {
    /// Cells whose center is inside the zone
    Center,
    /// Every cell the zone overlaps
    AllTouched,
}

impl From<TouchArg> for TouchMode {
    fn from(arg: TouchArg) -> Self {
        match arg {
            TouchArg::Center => TouchMode::Center,
            TouchArg::AllTouched => TouchMode::AllTouched,
        }
    }
}

#[derive(Args)]
struct PipelineArgs {
    /// Cell selection for zonal means
    #[arg(short, long, value_enum, default_value = "all-touched")]
    touch: TouchArg,
    /// Cells along the longer axis of the grid
    #[arg(long, default_value = "256")]
    cells: usize,
    /// Use at most this many nearest points per cell
    #[arg(long)]
    max_points: Option<usize>,
    /// Ignore points farther than this from a cell center
    #[arg(long)]
    max_radius: Option<f64>,
    /// Leave cells with fewer contributing points empty
    #[arg(long, default_value = "0")]
    min_points: usize,
    /// Distance smoothing term
    #[arg(long, default_value = "0.0")]
    smoothing: f64,
}

impl PipelineArgs {
    fn config(&self, power: f64) -> PipelineConfig {
        PipelineConfig {
            power,
            touch_mode: self.touch.into(),
            max_cells: self.cells,
            search: IdwSearch {
                smoothing: self.smoothing,
                max_radius: self.max_radius,
                max_points: self.max_points,
                min_points: self.min_points,
            },
            ..PipelineConfig::default()
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Setting default subscriber failed")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn load(path: &Path) -> Result<Dataset> {
    let pb = spinner("Reading input...")?;
    let data = read_dataset(path)?;
    pb.finish_and_clear();
    info!("Input: {} points, {} zones", data.points.len(), data.zones.len());
    Ok(data)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).context("Failed to write JSON report")?;
    println!("Report saved to: {}", path.display());
    Ok(())
}

fn print_grid(grid: &GridSpec) {
    let e = grid.extent();
    println!(
        "Grid: {} x {} cells of {:.6} x {:.6}",
        grid.cols, grid.rows, grid.cell_width, grid.cell_height
    );
    println!(
        "  Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        e.min_x, e.min_y, e.max_x, e.max_y
    );
}

fn print_output(output: &PipelineOutput) {
    let fit = &output.regression;

    println!();
    println!(
        "{:<16} {:>12} {:>12} {:>12} {:>10}",
        "zone", "response", "mean", "residual", "std.resid"
    );
    for z in &output.zones {
        println!(
            "{:<16} {:>12.4} {:>12.4} {:>12.4} {:>10.3}",
            z.zone_id, z.response, z.mean_value, z.residual, z.standardized_residual
        );
    }

    println!();
    println!("OLS: response ~ zonal mean (n = {}, df = {})", fit.n_samples, fit.df_residual);
    println!(
        "  {:<10} {:>12} {:>12} {:>10} {:>10}",
        "", "estimate", "std.error", "t", "p"
    );
    for (i, name) in ["intercept", "slope"].iter().enumerate() {
        println!(
            "  {:<10} {:>12.6} {:>12.6} {:>10.3} {:>10.4}",
            name,
            fit.coefficients()[i],
            fit.std_errors[i],
            fit.t_statistics[i],
            fit.p_values[i]
        );
    }
    println!("  R²: {:.6}  adj. R²: {:.6}", fit.r_squared, fit.adj_r_squared);
    println!("  F: {:.4}  p: {:.4}", fit.f_statistic, fit.f_p_value);

    if !output.unmatched.is_empty() {
        println!("Dropped zones without grid cells: {}", output.unmatched.join(", "));
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input, cells } => {
            let data = load(&input)?;
            let store = PointStore::load(data.points).context("Invalid sample points")?;

            println!("File: {}", input.display());
            println!("Points: {}", store.len());
            if let Some(e) = store.extent() {
                println!(
                    "  Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    e.min_x, e.min_y, e.max_x, e.max_y
                );
                if let Some(mean) = store.mean_value() {
                    println!("  Mean value: {:.6}", mean);
                }
                let grid = GridSpec::covering(&e, cells, DEFAULT_MARGIN_FRACTION)?;
                print_grid(&grid);
            }

            println!("Zones: {}", data.zones.len());
            if let Some(e) = data
                .zones
                .iter()
                .filter_map(|z| z.extent())
                .reduce(|a, b| a.union(&b))
            {
                println!(
                    "  Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    e.min_x, e.min_y, e.max_x, e.max_y
                );
            }
        }

        Commands::Run {
            input,
            power,
            options,
            output,
        } => {
            let data = load(&input)?;
            let mut pipeline = Pipeline::new(data.points, data.zones)?;
            let config = options.config(power);

            let pb = spinner(&format!("Running pipeline (power {})...", power))?;
            let start = Instant::now();
            let result = pipeline.run(&config);
            let elapsed = start.elapsed();
            pb.finish_and_clear();
            let result = result?;

            print_grid(&result.grid);
            let stats = &result.surface;
            if let (Some(min), Some(max)) = (stats.min, stats.max) {
                println!("  Surface range: {:.4} - {:.4} ({} empty cells)", min, max, stats.nodata_count);
            }
            print_output(&result);
            println!("  Processing time: {:.2?}", elapsed);

            if let Some(path) = output {
                write_json(&path, &result)?;
            }
        }

        Commands::Sweep {
            input,
            powers,
            options,
            output,
        } => {
            let data = load(&input)?;
            let mut pipeline = Pipeline::new(data.points, data.zones)?;

            let pb = spinner(&format!("Sweeping {} powers...", powers.len()))?;
            let start = Instant::now();
            let results = pipeline.sweep(&options.config(0.0), &powers);
            pb.finish_and_clear();

            println!(
                "{:>6} {:>12} {:>12} {:>10} {:>10} {:>6}",
                "power", "intercept", "slope", "R²", "p(slope)", "zones"
            );
            let mut succeeded = Vec::new();
            for (power, result) in results {
                match result {
                    Ok(out) => {
                        let fit = &out.regression;
                        println!(
                            "{:>6.2} {:>12.6} {:>12.6} {:>10.6} {:>10.4} {:>6}",
                            power,
                            fit.intercept,
                            fit.slope,
                            fit.r_squared,
                            fit.p_values[1],
                            out.zones.len()
                        );
                        succeeded.push(out);
                    }
                    Err(e) => println!("{:>6.2} {}", power, e),
                }
            }
            println!("  Processing time: {:.2?}", start.elapsed());

            if let Some(path) = output {
                write_json(&path, &succeeded)?;
            }
        }
    }

    Ok(())
}
