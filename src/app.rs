//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initialises logging
//! - runs the curve / predictive pipelines
//! - prints reports/plots
//! - writes optional exports

use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, CurveOpts, LayerArgs, PlotArgs, PredictOpts, SynthArgs};
use crate::data::{LayerFiles, SynthConfig, generate_study_area, write_study_area};
use crate::domain::{AnalysisConfig, FitResult, PredictConfig};
use crate::error::AppError;
use crate::io::{curve_file, read_curve_json, write_bins_csv, write_curve_json, write_metrics_csv, write_raster};
use crate::plot::{render_curve_file_plot, render_curve_plot, write_curve_svg, write_raster_svg};
use crate::report::{format_bins_table, format_curve_summary, format_predict_summary, write_markdown_report};

use self::pipeline::{CurveRun, PredictRun};

pub mod pipeline;

/// SVG chart size in pixels.
const SVG_SIZE: (u32, u32) = (900, 600);

/// Entry point for the `lues` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Curve(args) => {
            let config = analysis_config_from_args(&args.layers, &args.curve);
            handle_curve(&config).map(|_| ())
        }
        Command::Predict(args) => {
            let config = predict_config_from_args(&args.layers, &args.predict);
            handle_predict(&config).map(|_| ())
        }
        Command::Run(args) => {
            let analysis = analysis_config_from_args(&args.layers, &args.curve);
            let predict = predict_config_from_args(&args.layers, &args.predict);
            let curve_run = handle_curve(&analysis)?;
            let predict_run = handle_predict(&predict)?;
            if let Some(path) = &args.report {
                write_markdown_report(path, Some(&curve_run), Some(&predict_run))?;
                info!(path = %path.display(), "wrote report");
            }
            Ok(())
        }
        Command::Synth(args) => handle_synth(&args),
        Command::Plot(args) => handle_plot(&args),
    }
}

/// `RUST_LOG` wins over `--log-level`/`LUES_LOG`; logs go to stderr so stdout stays a clean report.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn handle_curve(config: &AnalysisConfig) -> Result<CurveRun, AppError> {
    let run = pipeline::run_curve(config)?;

    println!("{}", format_curve_summary(&run));
    println!("{}", format_bins_table(&run.bins));

    if config.plot {
        let plot = render_curve_plot(
            &run.bins,
            &run.selection.best.model,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_bins {
        write_bins_csv(path, &run.bins)?;
        info!(path = %path.display(), "exported bins");
    }
    if let Some(path) = &config.export_curve {
        let curve = curve_file(&run.selection.best, &run.bins, run.class, run.selection.criterion);
        write_curve_json(path, &curve)?;
        info!(path = %path.display(), "exported curve");
    }
    if let Some(path) = &config.svg {
        write_curve_svg(path, &run.bins, &run.selection.best, run.class, SVG_SIZE)?;
        info!(path = %path.display(), "rendered curve chart");
    }

    Ok(run)
}

fn handle_predict(config: &PredictConfig) -> Result<PredictRun, AppError> {
    let run = pipeline::run_predict(config)?;

    println!("{}", format_predict_summary(&run));

    if let Some(dir) = &config.out_dir {
        write_predict_outputs(dir, &run, config.maps)?;
    }

    Ok(run)
}

fn write_predict_outputs(dir: &Path, run: &PredictRun, maps: bool) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::input(format!("Failed to create output directory '{}': {e}", dir.display())))?;

    write_metrics_csv(&dir.join("metrics.csv"), &run.metrics())?;
    let surfaces = [
        ("logistic_probability", &run.logistic.probability),
        ("gbt_probability", &run.gbt.probability),
    ];
    for (name, raster) in surfaces {
        write_raster(raster, &dir.join(format!("{name}.tif")))?;
        if maps {
            write_raster_svg(&dir.join(format!("{name}.svg")), raster, name, 0)?;
        }
    }
    info!(dir = %dir.display(), maps, "wrote prediction outputs");
    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        rows: args.rows,
        cols: args.cols,
        seed: args.seed,
        cores: args.cores,
        cell_size: args.cell_size,
        beta: args.beta,
    };
    let area = generate_study_area(&config)?;
    let files = LayerFiles::from_dir(&args.out_dir);
    write_study_area(&area, &files)?;
    println!(
        "Wrote synthetic study area ({} x {} cells) to {}",
        args.rows,
        args.cols,
        args.out_dir.display()
    );
    Ok(())
}

fn handle_plot(args: &PlotArgs) -> Result<(), AppError> {
    let curve = read_curve_json(&args.curve)?;
    println!("{}", render_curve_file_plot(&curve, args.width, args.height));

    if let Some(path) = &args.svg {
        let fit = FitResult {
            model: curve.model.clone(),
            quality: curve.fit_quality.clone(),
        };
        write_curve_svg(path, &curve.bins, &fit, curve.class, SVG_SIZE)?;
    }
    Ok(())
}

pub fn layer_files_from_args(args: &LayerArgs) -> LayerFiles {
    LayerFiles {
        data_dir: args.data_dir.clone(),
        land_use: args.land_use.clone(),
        road_density: args.road_density.clone(),
        es_index: args.es_index.clone(),
        pop_attraction: args.pop_attraction.clone(),
        emp_attraction: args.emp_attraction.clone(),
        trans_attraction: args.trans_attraction.clone(),
    }
}

pub fn analysis_config_from_args(layers: &LayerArgs, args: &CurveOpts) -> AnalysisConfig {
    AnalysisConfig {
        layers: layer_files_from_args(layers),
        resample: layers.resample,
        class: args.class,
        bins: args.bins,
        curve_spec: args.curve,
        criterion: args.criterion,
        weight_by_count: args.weight_by_count,
        density_window: args.density_window,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_bins: args.export_bins.clone(),
        export_curve: args.export_curve.clone(),
        svg: args.svg.clone(),
    }
}

pub fn predict_config_from_args(layers: &LayerArgs, args: &PredictOpts) -> PredictConfig {
    PredictConfig {
        layers: layer_files_from_args(layers),
        resample: layers.resample,
        test_fraction: args.test_fraction,
        seed: args.seed,
        logistic_max_iter: args.max_iter,
        logistic_tol: args.tol,
        logistic_l2: args.l2,
        trees: args.trees,
        learning_rate: args.learning_rate,
        max_depth: args.max_depth,
        min_samples_leaf: args.min_samples_leaf,
        subsample: args.subsample,
        out_dir: args.out_dir.clone(),
        maps: args.maps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configs_carry_layer_overrides() {
        let cli = Cli::try_parse_from([
            "lues",
            "run",
            "--data-dir",
            "study",
            "--es-index",
            "services.tif",
            "--resample",
            "nearest",
            "--no-plot",
            "--seed",
            "7",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let analysis = analysis_config_from_args(&args.layers, &args.curve);
        let predict = predict_config_from_args(&args.layers, &args.predict);
        assert!(!analysis.plot);
        assert_eq!(
            analysis.layers.path(crate::data::Layer::EsIndex),
            Path::new("study").join("services.tif")
        );
        assert_eq!(predict.resample, crate::domain::ResampleMethod::Nearest);
        assert_eq!(predict.seed, 7);
    }
}
