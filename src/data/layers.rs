//! Layer catalogue and alignment onto the land-use reference grid.
//!
//! The land-use raster defines the study grid. Every other layer is read,
//! resampled onto that grid when its shape or georeferencing differs, and
//! masked to the land-use extent.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{LandUseClass, ResampleMethod};
use crate::error::AppError;
use crate::io::read_raster;
use crate::raster::{
    Raster, developed_indicator, ecosystem_accessibility, focal_mean, mask_nulls, normalize,
    reclassify_class, resample, to_indicator,
};
use crate::sample::FeatureTable;

/// Feature name of the derived accessibility driver.
pub const ACCESSIBILITY: &str = "es_accessibility";

/// Column name of the prediction target.
pub const DEVELOPED: &str = "developed";

/// Input layers of the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    LandUse,
    RoadDensity,
    EsIndex,
    PopAttraction,
    EmpAttraction,
    TransAttraction,
}

impl Layer {
    pub const ALL: [Layer; 6] = [
        Layer::LandUse,
        Layer::RoadDensity,
        Layer::EsIndex,
        Layer::PopAttraction,
        Layer::EmpAttraction,
        Layer::TransAttraction,
    ];

    /// Attraction layers used directly as model drivers.
    pub const ATTRACTIONS: [Layer; 3] = [Layer::PopAttraction, Layer::EmpAttraction, Layer::TransAttraction];

    pub fn name(self) -> &'static str {
        match self {
            Layer::LandUse => "land_use",
            Layer::RoadDensity => "road_density",
            Layer::EsIndex => "es_index",
            Layer::PopAttraction => "pop_attraction",
            Layer::EmpAttraction => "emp_attraction",
            Layer::TransAttraction => "trans_attraction",
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            Layer::LandUse => "landuse.tif",
            Layer::RoadDensity => "road_density.tif",
            Layer::EsIndex => "es_index.tif",
            Layer::PopAttraction => "pop_attraction.tif",
            Layer::EmpAttraction => "emp_attraction.tif",
            Layer::TransAttraction => "trans_attraction.tif",
        }
    }
}

/// Where each layer lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerFiles {
    pub data_dir: PathBuf,
    pub land_use: String,
    pub road_density: String,
    pub es_index: String,
    pub pop_attraction: String,
    pub emp_attraction: String,
    pub trans_attraction: String,
}

impl LayerFiles {
    /// Default file names inside `data_dir`.
    pub fn from_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            land_use: Layer::LandUse.default_file_name().to_string(),
            road_density: Layer::RoadDensity.default_file_name().to_string(),
            es_index: Layer::EsIndex.default_file_name().to_string(),
            pop_attraction: Layer::PopAttraction.default_file_name().to_string(),
            emp_attraction: Layer::EmpAttraction.default_file_name().to_string(),
            trans_attraction: Layer::TransAttraction.default_file_name().to_string(),
        }
    }

    pub fn file_name(&self, layer: Layer) -> &str {
        match layer {
            Layer::LandUse => &self.land_use,
            Layer::RoadDensity => &self.road_density,
            Layer::EsIndex => &self.es_index,
            Layer::PopAttraction => &self.pop_attraction,
            Layer::EmpAttraction => &self.emp_attraction,
            Layer::TransAttraction => &self.trans_attraction,
        }
    }

    /// File names are joined onto `data_dir` unless they are absolute.
    pub fn path(&self, layer: Layer) -> PathBuf {
        let name = Path::new(self.file_name(layer));
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.data_dir.join(name)
        }
    }

    /// Fail early, naming every missing file at once.
    pub fn ensure_exist(&self, layers: &[Layer]) -> Result<(), AppError> {
        let missing: Vec<String> = layers
            .iter()
            .map(|&l| self.path(l))
            .filter(|p| !p.is_file())
            .map(|p| p.display().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::input(format!("Missing input raster(s): {}", missing.join(", "))))
        }
    }
}

impl Default for LayerFiles {
    fn default() -> Self {
        Self::from_dir("data")
    }
}

fn same_grid(a: &Raster, b: &Raster) -> bool {
    a.shape() == b.shape() && a.transform() == b.transform()
}

/// Bring `source` onto the reference grid and mask it to the reference extent.
pub fn align_to(source: &Raster, reference: &Raster, method: ResampleMethod) -> Result<Raster, AppError> {
    let on_grid = if same_grid(source, reference) {
        source.clone()
    } else {
        resample(source, reference, method)?
    };
    mask_nulls(&on_grid, reference)
}

/// Read the land-use reference grid.
pub fn load_land_use(files: &LayerFiles) -> Result<Raster, AppError> {
    let land_use = read_raster(&files.path(Layer::LandUse))?;
    if land_use.is_empty() {
        return Err(AppError::data("Land-use raster has no cells."));
    }
    info!(
        rows = land_use.rows(),
        cols = land_use.cols(),
        missing = land_use.count_missing(),
        "loaded land-use reference grid"
    );
    Ok(land_use)
}

/// Read one continuous layer and align it to the reference grid.
pub fn load_aligned(
    files: &LayerFiles,
    layer: Layer,
    reference: &Raster,
    method: ResampleMethod,
) -> Result<Raster, AppError> {
    let raw = read_raster(&files.path(layer))?;
    let aligned = align_to(&raw, reference, method)?;
    debug!(
        layer = layer.name(),
        from = ?raw.shape(),
        missing = aligned.count_missing(),
        "aligned layer"
    );
    Ok(aligned)
}

/// Land use plus the derived accessibility surface on its grid.
#[derive(Debug, Clone)]
pub struct AccessibilityLayers {
    pub land_use: Raster,
    pub accessibility: Raster,
}

pub fn load_accessibility(files: &LayerFiles, method: ResampleMethod) -> Result<AccessibilityLayers, AppError> {
    files.ensure_exist(&[Layer::LandUse, Layer::RoadDensity, Layer::EsIndex])?;
    let land_use = load_land_use(files)?;
    let roads = load_aligned(files, Layer::RoadDensity, &land_use, method)?;
    let es = load_aligned(files, Layer::EsIndex, &land_use, method)?;
    let accessibility = accessibility_on(&land_use, &es, &roads)?;
    Ok(AccessibilityLayers {
        land_use,
        accessibility,
    })
}

/// Accessibility from already aligned inputs, masked to the land-use extent.
pub fn accessibility_on(land_use: &Raster, es_index: &Raster, road_density: &Raster) -> Result<Raster, AppError> {
    let accessibility = ecosystem_accessibility(es_index, road_density)?;
    if let Some(mean) = accessibility.finite_mean() {
        info!(mean, missing = accessibility.count_missing(), "ecosystem-service accessibility");
    }
    mask_nulls(&accessibility, land_use)
}

/// Land-use density of one class.
///
/// With `window == 0` this is the 0/1 class indicator, otherwise the share of
/// class cells in the `(2w+1)²` neighbourhood.
pub fn density_layer(land_use: &Raster, class: LandUseClass, window: usize) -> Result<Raster, AppError> {
    let indicator = to_indicator(&reclassify_class(land_use, class));
    let density = if window == 0 {
        indicator
    } else {
        focal_mean(&indicator, window)?
    };
    mask_nulls(&density, land_use)
}

/// Land use plus the four normalized model drivers on its grid.
#[derive(Debug, Clone)]
pub struct DriverLayers {
    pub land_use: Raster,
    /// `(feature name, layer)` in model column order.
    pub drivers: Vec<(String, Raster)>,
}

pub fn load_drivers(files: &LayerFiles, method: ResampleMethod) -> Result<DriverLayers, AppError> {
    files.ensure_exist(&Layer::ALL)?;
    let AccessibilityLayers {
        land_use,
        accessibility,
    } = load_accessibility(files, method)?;

    let mut drivers = Vec::with_capacity(Layer::ATTRACTIONS.len() + 1);
    for layer in Layer::ATTRACTIONS {
        let aligned = load_aligned(files, layer, &land_use, method)?;
        drivers.push((layer.name().to_string(), normalize(&aligned)));
    }
    drivers.push((ACCESSIBILITY.to_string(), accessibility));

    Ok(DriverLayers { land_use, drivers })
}

impl DriverLayers {
    /// Feature table of the drivers and the developed/undeveloped target.
    ///
    /// Cells missing any driver or the land-use code are dropped.
    pub fn training_table(&self) -> Result<(FeatureTable, Vec<f64>), AppError> {
        let target = developed_indicator(&self.land_use);
        let mut columns: Vec<(&str, &Raster)> = self
            .drivers
            .iter()
            .map(|(name, layer)| (name.as_str(), layer))
            .collect();
        columns.push((DEVELOPED, &target));
        let table = FeatureTable::from_layers(&columns)?;
        if table.is_empty() {
            return Err(AppError::data("No cell has all driver values and a land-use code."));
        }
        table.split_off_column(DEVELOPED)
    }
}
