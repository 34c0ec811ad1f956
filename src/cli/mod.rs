//! Command-line parsing for the land-use / ES accessibility analysis.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the raster/modeling code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Criterion, CurveSpec, LandUseClass, ResampleMethod};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "lues",
    version,
    about = "Land use vs ecosystem-service accessibility: curve fitting and land-use probability models"
)]
pub struct Cli {
    /// Log filter (e.g. `info`, `debug`, `landuse_es=trace`); `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info", env = "LUES_LOG")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit accessibility vs land-use density curves, print diagnostics, optionally plot/export.
    Curve(CurveArgs),
    /// Train logistic regression and boosted trees on the driver layers and evaluate them.
    Predict(PredictArgs),
    /// Run both analyses and optionally write a markdown report.
    Run(RunArgs),
    /// Write a synthetic study area (all input layers) as GeoTIFF.
    Synth(SynthArgs),
    /// Plot a previously exported curve JSON.
    Plot(PlotArgs),
}

/// Where the input layers live and how they are aligned.
#[derive(Debug, Args, Clone)]
pub struct LayerArgs {
    /// Directory holding the input rasters.
    #[arg(long, default_value = "data", env = "LUES_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Land-use raster (NLCD codes); defines the reference grid.
    #[arg(long, default_value = "landuse.tif")]
    pub land_use: String,

    /// Road density raster.
    #[arg(long, default_value = "road_density.tif")]
    pub road_density: String,

    /// Ecosystem-service index raster.
    #[arg(long, default_value = "es_index.tif")]
    pub es_index: String,

    /// Population attraction raster.
    #[arg(long, default_value = "pop_attraction.tif")]
    pub pop_attraction: String,

    /// Employment attraction raster.
    #[arg(long, default_value = "emp_attraction.tif")]
    pub emp_attraction: String,

    /// Transportation attraction raster.
    #[arg(long, default_value = "trans_attraction.tif")]
    pub trans_attraction: String,

    /// Resampling method for continuous layers.
    #[arg(long, value_enum, default_value_t = ResampleMethod::Bilinear)]
    pub resample: ResampleMethod,
}

/// Options of the accessibility/density curve analysis.
#[derive(Debug, Args, Clone)]
pub struct CurveOpts {
    /// Developed land-use class to analyse.
    #[arg(long, value_enum, default_value_t = LandUseClass::Residential)]
    pub class: LandUseClass,

    /// Number of accessibility groups (the zero group comes on top).
    #[arg(long, default_value_t = 20)]
    pub bins: usize,

    /// Which curve(s) to fit.
    #[arg(long, value_enum, default_value_t = CurveSpec::Auto)]
    pub curve: CurveSpec,

    /// Information criterion for curve selection.
    #[arg(long, value_enum, default_value_t = Criterion::Aic)]
    pub criterion: Criterion,

    /// Weight each group by its cell count when fitting.
    #[arg(long)]
    pub weight_by_count: bool,

    /// Focal window radius (cells) for land-use density; 0 uses the raw indicator.
    #[arg(long, default_value_t = 2)]
    pub density_window: usize,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the binned table to CSV.
    #[arg(long = "export-bins", value_name = "CSV")]
    pub export_bins: Option<PathBuf>,

    /// Export the selected curve (coefficients + bins + fitted grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,

    /// Render the curve chart to SVG.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,
}

/// Options of the predictive models.
#[derive(Debug, Args, Clone)]
pub struct PredictOpts {
    /// Share of cells held out for evaluation.
    #[arg(long, default_value_t = 0.3)]
    pub test_fraction: f64,

    /// Seed for the train/test split and tree subsampling.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Maximum IRLS iterations for logistic regression.
    #[arg(long, default_value_t = 100)]
    pub max_iter: usize,

    /// IRLS convergence tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub tol: f64,

    /// Ridge penalty on logistic slopes.
    #[arg(long, default_value_t = 1e-6)]
    pub l2: f64,

    /// Number of boosted trees.
    #[arg(long, default_value_t = 100)]
    pub trees: usize,

    /// Boosting learning rate.
    #[arg(long, default_value_t = 0.1)]
    pub learning_rate: f64,

    /// Maximum tree depth.
    #[arg(long, default_value_t = 3)]
    pub max_depth: usize,

    /// Minimum cells per leaf.
    #[arg(long, default_value_t = 20)]
    pub min_samples_leaf: usize,

    /// Row share sampled for each tree.
    #[arg(long, default_value_t = 0.8)]
    pub subsample: f64,

    /// Write probability rasters (GeoTIFF) and metrics CSV here.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Also render probability maps to SVG (requires --out-dir).
    #[arg(long, requires = "out_dir")]
    pub maps: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CurveArgs {
    #[command(flatten)]
    pub layers: LayerArgs,

    #[command(flatten)]
    pub curve: CurveOpts,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub layers: LayerArgs,

    #[command(flatten)]
    pub predict: PredictOpts,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub layers: LayerArgs,

    #[command(flatten)]
    pub curve: CurveOpts,

    #[command(flatten)]
    pub predict: PredictOpts,

    /// Write a markdown report of both analyses.
    #[arg(long, value_name = "MD")]
    pub report: Option<PathBuf>,
}

/// Options of the synthetic study-area generator.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output directory for the generated layers.
    #[arg(long, default_value = "data", env = "LUES_DATA_DIR")]
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = 120)]
    pub rows: usize,

    #[arg(long, default_value_t = 120)]
    pub cols: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of urban cores.
    #[arg(long, default_value_t = 3)]
    pub cores: usize,

    /// Land-use cell size in map units.
    #[arg(long, default_value_t = 30.0)]
    pub cell_size: f64,

    /// Distance-decay exponent of the attraction layers.
    #[arg(long, default_value_t = 1.5)]
    pub beta: f64,
}

/// Options for plotting a saved curve.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Curve JSON file produced by `lues curve --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Also render the curve to SVG.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,
}
