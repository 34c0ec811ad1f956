use std::path::Path;

use landuse_es::app::pipeline::{run_curve, run_predict};
use landuse_es::data::{LayerFiles, SYNTHETIC_CRS, SynthConfig, generate_study_area, write_study_area};
use landuse_es::domain::{AnalysisConfig, Criterion, CurveSpec, LandUseClass, PredictConfig, ResampleMethod};
use landuse_es::io::{curve_file, read_curve_json, read_raster, write_curve_json, write_raster};

fn synthetic_files(dir: &Path) -> LayerFiles {
    let area = generate_study_area(&SynthConfig {
        rows: 60,
        cols: 60,
        seed: 7,
        ..SynthConfig::default()
    })
    .unwrap();
    let files = LayerFiles::from_dir(dir);
    write_study_area(&area, &files).unwrap();
    files
}

fn analysis(files: LayerFiles, class: LandUseClass) -> AnalysisConfig {
    AnalysisConfig {
        layers: files,
        resample: ResampleMethod::Bilinear,
        class,
        bins: 15,
        curve_spec: CurveSpec::Auto,
        criterion: Criterion::Aic,
        weight_by_count: true,
        density_window: 2,
        plot: false,
        plot_width: 80,
        plot_height: 20,
        export_bins: None,
        export_curve: None,
        svg: None,
    }
}

fn predict(files: LayerFiles) -> PredictConfig {
    PredictConfig {
        layers: files,
        resample: ResampleMethod::Bilinear,
        test_fraction: 0.3,
        seed: 11,
        logistic_max_iter: 100,
        logistic_tol: 1e-8,
        logistic_l2: 1e-6,
        trees: 30,
        learning_rate: 0.2,
        max_depth: 3,
        min_samples_leaf: 10,
        subsample: 0.8,
        out_dir: None,
        maps: false,
    }
}

#[test]
fn curve_analysis_on_synthetic_area() {
    let dir = tempfile::tempdir().unwrap();
    let files = synthetic_files(dir.path());

    for class in LandUseClass::ALL {
        let run = run_curve(&analysis(files.clone(), class)).unwrap();
        assert_eq!(run.grid_shape, (60, 60));

        let non_zero: Vec<_> = run.bins.iter().filter(|b| !b.zero_group).collect();
        assert_eq!(non_zero.len(), 15);
        assert!(non_zero.windows(2).all(|w| w[0].x_mean <= w[1].x_mean));
        assert!(run.bins.iter().all(|b| (0.0..=1.0).contains(&b.y_mean)));
        assert_eq!(run.selection.fits.len(), 3);

        // The border ring of the land-use grid is missing and must stay out of the samples.
        assert!(run.n_samples <= 58 * 58);
        assert!(run.accessibility.get(0, 0).unwrap().is_nan());
    }
}

#[test]
fn exported_curve_can_be_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let files = synthetic_files(dir.path());
    let run = run_curve(&analysis(files, LandUseClass::Residential)).unwrap();

    let path = dir.path().join("curve.json");
    let curve = curve_file(&run.selection.best, &run.bins, run.class, run.selection.criterion);
    write_curve_json(&path, &curve).unwrap();
    let back = read_curve_json(&path).unwrap();
    assert_eq!(back.model.kind, run.selection.best.model.kind);
    assert_eq!(back.bins.len(), run.bins.len());
}

#[test]
fn predictors_beat_chance_and_map_the_grid() {
    let dir = tempfile::tempdir().unwrap();
    let files = synthetic_files(dir.path());
    let run = run_predict(&predict(files)).unwrap();

    assert_eq!(run.feature_names.len(), 4);
    assert_eq!(run.n_train + run.n_test, run.n_rows);
    for metrics in run.metrics() {
        assert!(metrics.auc > 0.7, "{} auc {}", metrics.model, metrics.auc);
        assert!(metrics.log_loss.is_finite());
    }

    for surface in [&run.logistic.probability, &run.gbt.probability] {
        assert_eq!(surface.shape(), (60, 60));
        assert_eq!(surface.crs(), Some(SYNTHETIC_CRS));
        assert!(surface.get(0, 0).unwrap().is_nan());
        assert!(surface.values().filter(|v| v.is_finite()).all(|p| (0.0..=1.0).contains(&p)));
    }

    let path = dir.path().join("gbt.tif");
    write_raster(&run.gbt.probability, &path).unwrap();
    let back = read_raster(&path).unwrap();
    assert_eq!(back.shape(), (60, 60));
    assert_eq!(back.transform(), run.gbt.probability.transform());
    assert_eq!(back.crs(), Some(SYNTHETIC_CRS));
}

#[test]
fn missing_layers_fail_with_input_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_curve(&analysis(LayerFiles::from_dir(dir.path()), LandUseClass::Commercial)).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
