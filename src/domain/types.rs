//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during binning and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::LayerFiles;

/// Developed land-use class correlated against accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LandUseClass {
    /// NLCD developed open space / low intensity (codes 21, 22).
    Residential,
    /// NLCD developed medium intensity (code 23).
    Commercial,
}

impl LandUseClass {
    pub const ALL: [LandUseClass; 2] = [LandUseClass::Residential, LandUseClass::Commercial];

    pub fn display_name(self) -> &'static str {
        match self {
            LandUseClass::Residential => "residential",
            LandUseClass::Commercial => "commercial",
        }
    }
}

/// Resampling method used to bring a layer onto the reference grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    /// Value of the source cell containing the target cell centre.
    ///
    /// Use for categorical layers (land-use codes).
    Nearest,
    /// Bilinear blend of the four surrounding source cell centres.
    #[default]
    Bilinear,
}

/// Information criterion used to compare trend curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Akaike: `n ln(SSE/n) + 2k`.
    #[default]
    Aic,
    /// Bayesian: `n ln(SSE/n) + k ln(n)`.
    Bic,
}

impl Criterion {
    pub fn label(self) -> &'static str {
        match self {
            Criterion::Aic => "AIC",
            Criterion::Bic => "BIC",
        }
    }
}

/// Which trend curve(s) the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CurveSpec {
    /// Fit degrees 1–3, report each, select by information criterion.
    Auto,
    Linear,
    Quadratic,
    Cubic,
}

/// Concrete polynomial trend curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    Linear,
    Quadratic,
    Cubic,
}

impl CurveKind {
    /// Ordered by increasing complexity.
    pub const ALL: [CurveKind; 3] = [CurveKind::Linear, CurveKind::Quadratic, CurveKind::Cubic];

    pub fn degree(self) -> usize {
        match self {
            CurveKind::Linear => 1,
            CurveKind::Quadratic => 2,
            CurveKind::Cubic => 3,
        }
    }

    /// Number of coefficients (intercept included).
    pub fn param_count(self) -> usize {
        self.degree() + 1
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CurveKind::Linear => "linear",
            CurveKind::Quadratic => "quadratic",
            CurveKind::Cubic => "cubic",
        }
    }
}

/// One group of binned samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    /// Position of the group (zero group first when present).
    pub index: usize,
    /// `true` for the single group collecting every zero-accessibility row.
    pub zero_group: bool,
    pub count: usize,
    pub x_mean: f64,
    pub x_min: f64,
    pub x_max: f64,
    /// Mean dependent variable (land-use density) of the group.
    pub y_mean: f64,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub r2: f64,
    pub aic: f64,
    pub bic: f64,
    pub n: usize,
}

impl FitQuality {
    pub fn criterion(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Aic => self.aic,
            Criterion::Bic => self.bic,
        }
    }
}

/// Fitted polynomial parameters.
///
/// `coefficients[i]` multiplies `x^i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveModel {
    pub kind: CurveKind,
    pub display_name: String,
    pub coefficients: Vec<f64>,
}

/// Fit output for a single curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub model: CurveModel,
    pub quality: FitQuality,
}

/// Configuration of the accessibility vs density analysis.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub layers: LayerFiles,
    pub resample: ResampleMethod,
    pub class: LandUseClass,
    /// Number of non-zero groups produced by binning.
    pub bins: usize,
    pub curve_spec: CurveSpec,
    pub criterion: Criterion,
    /// Weight each bin by its row count in the least-squares objective.
    pub weight_by_count: bool,
    /// Focal window radius for the density layer (0 = raw indicator).
    pub density_window: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_bins: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
    pub svg: Option<PathBuf>,
}

/// Configuration of the predictive-model stage.
#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub layers: LayerFiles,
    pub resample: ResampleMethod,
    /// Share of labelled rows held out for evaluation.
    pub test_fraction: f64,
    pub seed: u64,

    pub logistic_max_iter: usize,
    pub logistic_tol: f64,
    pub logistic_l2: f64,

    pub trees: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub subsample: f64,

    /// Where probability rasters (GeoTIFF) and maps (SVG) are written.
    pub out_dir: Option<PathBuf>,
    pub maps: bool,
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub class: LandUseClass,
    pub criterion: Criterion,
    pub model: CurveModel,
    pub fit_quality: FitQuality,
    pub bins: Vec<Bin>,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}
