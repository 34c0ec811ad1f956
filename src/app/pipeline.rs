//! Shared analysis pipelines used by the `curve`, `predict` and `run` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//!
//! - curve:   layers -> accessibility + density -> samples -> bins -> fit/select
//! - predict: layers -> drivers + target -> split -> logistic / boosted trees -> metrics + maps
//!
//! The command handlers can then focus on presentation (printing, exports).

use tracing::{info, warn};

use crate::data::{AccessibilityLayers, DriverLayers, density_layer, load_accessibility, load_drivers};
use crate::domain::{AnalysisConfig, Bin, LandUseClass, PredictConfig};
use crate::error::AppError;
use crate::fit::{FitSelection, fit_and_select};
use crate::models::{
    ClassificationMetrics, Classifier, GbtParams, GradientBoostedTrees, LogisticModel, LogisticParams,
    fit_gbt, fit_logistic, predict_grid, predict_table, train_test_split,
};
use crate::raster::Raster;
use crate::sample::{FeatureTable, bin_samples};

/// All computed outputs of one accessibility/density curve analysis.
#[derive(Debug, Clone)]
pub struct CurveRun {
    pub class: LandUseClass,
    pub grid_shape: (usize, usize),
    /// Cells with both an accessibility value and a density value.
    pub n_samples: usize,
    /// Samples with zero accessibility (collapsed into one group).
    pub n_zero: usize,
    pub bins: Vec<Bin>,
    pub selection: FitSelection,
    pub accessibility: Raster,
    pub density: Raster,
}

/// Execute the curve analysis from the files named in `config`.
pub fn run_curve(config: &AnalysisConfig) -> Result<CurveRun, AppError> {
    let layers = load_accessibility(&config.layers, config.resample)?;
    run_curve_on(&layers, config)
}

/// Execute the curve analysis on already loaded layers.
pub fn run_curve_on(layers: &AccessibilityLayers, config: &AnalysisConfig) -> Result<CurveRun, AppError> {
    let density = density_layer(&layers.land_use, config.class, config.density_window)?;
    let table = FeatureTable::from_layers(&[("accessibility", &layers.accessibility), ("density", &density)])?;
    if table.is_empty() {
        return Err(AppError::data("No cell has both an accessibility and a land-use value."));
    }

    let samples: Vec<(f64, f64)> = table.rows().map(|row| (row[0], row[1])).collect();
    let n_zero = samples.iter().filter(|(x, _)| *x == 0.0).count();
    let bins = bin_samples(&samples, config.bins)?;
    let selection = fit_and_select(&bins, config.curve_spec, config.criterion, config.weight_by_count)?;

    info!(
        class = config.class.display_name(),
        samples = samples.len(),
        zero = n_zero,
        bins = bins.len(),
        best = selection.best.model.display_name.as_str(),
        "curve analysis finished"
    );

    Ok(CurveRun {
        class: config.class,
        grid_shape: layers.land_use.shape(),
        n_samples: samples.len(),
        n_zero,
        bins,
        selection,
        accessibility: layers.accessibility.clone(),
        density,
    })
}

/// Fitted model plus its hold-out metrics and probability surface.
#[derive(Debug, Clone)]
pub struct ModelRun<M> {
    pub model: M,
    pub metrics: ClassificationMetrics,
    pub probability: Raster,
}

/// All computed outputs of one predictive-model run.
#[derive(Debug, Clone)]
pub struct PredictRun {
    pub feature_names: Vec<String>,
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Developed share among all usable cells.
    pub positive_rate: f64,
    pub logistic: ModelRun<LogisticModel>,
    pub gbt: ModelRun<GradientBoostedTrees>,
    pub land_use: Raster,
}

impl PredictRun {
    pub fn metrics(&self) -> Vec<ClassificationMetrics> {
        vec![self.logistic.metrics.clone(), self.gbt.metrics.clone()]
    }
}

/// Train and evaluate both predictors from the files named in `config`.
pub fn run_predict(config: &PredictConfig) -> Result<PredictRun, AppError> {
    let drivers = load_drivers(&config.layers, config.resample)?;
    run_predict_on(&drivers, config)
}

/// Train and evaluate both predictors on already loaded driver layers.
pub fn run_predict_on(drivers: &DriverLayers, config: &PredictConfig) -> Result<PredictRun, AppError> {
    let (table, target) = drivers.training_table()?;
    let split = train_test_split(table.n_rows(), config.test_fraction, config.seed)?;

    let x_train = table.select_rows(&split.train);
    let y_train: Vec<f64> = split.train.iter().map(|&i| target[i]).collect();
    let x_test = table.select_rows(&split.test);
    let y_test: Vec<f64> = split.test.iter().map(|&i| target[i]).collect();

    let train_positives = y_train.iter().filter(|&&y| y > 0.5).count();
    if train_positives == 0 || train_positives == y_train.len() {
        return Err(AppError::data(
            "Training split contains a single land-use outcome; both developed and undeveloped cells are needed.",
        ));
    }
    if y_test.iter().all(|&y| y > 0.5) || y_test.iter().all(|&y| y <= 0.5) {
        warn!("test split contains a single outcome; AUC is undefined");
    }

    info!(
        rows = table.n_rows(),
        train = x_train.n_rows(),
        test = x_test.n_rows(),
        features = ?table.names(),
        "training land-use predictors"
    );

    let logistic = fit_logistic(
        &x_train,
        &y_train,
        &LogisticParams {
            max_iter: config.logistic_max_iter,
            tol: config.logistic_tol,
            l2: config.logistic_l2,
        },
    )?;
    let gbt = fit_gbt(
        &x_train,
        &y_train,
        &GbtParams {
            n_trees: config.trees,
            learning_rate: config.learning_rate,
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            subsample: config.subsample,
            seed: config.seed,
            ..GbtParams::default()
        },
    )?;

    let logistic = evaluate(logistic, &x_test, &y_test, &table, &drivers.land_use)?;
    let gbt = evaluate(gbt, &x_test, &y_test, &table, &drivers.land_use)?;

    Ok(PredictRun {
        feature_names: table.names().to_vec(),
        n_rows: table.n_rows(),
        n_train: x_train.n_rows(),
        n_test: x_test.n_rows(),
        positive_rate: target.iter().sum::<f64>() / target.len() as f64,
        logistic,
        gbt,
        land_use: drivers.land_use.clone(),
    })
}

fn evaluate<M: Classifier>(
    model: M,
    x_test: &FeatureTable,
    y_test: &[f64],
    table: &FeatureTable,
    template: &Raster,
) -> Result<ModelRun<M>, AppError> {
    let proba = predict_table(&model, x_test);
    if proba.iter().any(|p| !p.is_finite()) {
        return Err(AppError::numeric(format!("{} produced non-finite probabilities.", model.name())));
    }
    let metrics = ClassificationMetrics::evaluate(model.name(), y_test, &proba);
    info!(
        model = model.name(),
        accuracy = metrics.accuracy,
        log_loss = metrics.log_loss,
        auc = metrics.auc,
        "hold-out evaluation"
    );
    let probability = predict_grid(&model, table, template)?;
    Ok(ModelRun {
        model,
        metrics,
        probability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SynthConfig, accessibility_on, align_to, generate_study_area};
    use crate::domain::{Criterion, CurveSpec, ResampleMethod};
    use crate::data::LayerFiles;

    fn layers() -> AccessibilityLayers {
        let area = generate_study_area(&SynthConfig {
            rows: 48,
            cols: 48,
            ..SynthConfig::default()
        })
        .unwrap();
        let roads = align_to(&area.road_density, &area.land_use, ResampleMethod::Bilinear).unwrap();
        let es = align_to(&area.es_index, &area.land_use, ResampleMethod::Bilinear).unwrap();
        let accessibility = accessibility_on(&area.land_use, &es, &roads).unwrap();
        AccessibilityLayers {
            land_use: area.land_use,
            accessibility,
        }
    }

    fn config(bins: usize) -> AnalysisConfig {
        AnalysisConfig {
            layers: LayerFiles::default(),
            resample: ResampleMethod::Bilinear,
            class: LandUseClass::Residential,
            bins,
            curve_spec: CurveSpec::Auto,
            criterion: Criterion::Aic,
            weight_by_count: false,
            density_window: 2,
            plot: false,
            plot_width: 60,
            plot_height: 16,
            export_bins: None,
            export_curve: None,
            svg: None,
        }
    }

    #[test]
    fn curve_run_bins_every_sample() {
        let run = run_curve_on(&layers(), &config(10)).unwrap();
        assert_eq!(run.grid_shape, (48, 48));
        let non_zero = run.bins.iter().filter(|b| !b.zero_group).count();
        assert_eq!(non_zero, 10);
        let binned: usize = run.bins.iter().map(|b| b.count).sum();
        assert_eq!(binned, run.n_samples);
        assert!(run.selection.best.quality.rmse.is_finite());
    }

    #[test]
    fn too_many_bins_is_a_data_error() {
        let err = run_curve_on(&layers(), &config(1_000_000)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
