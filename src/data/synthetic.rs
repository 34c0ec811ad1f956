//! Synthetic study-area generation.
//!
//! Produces a full set of input layers with realistic structure so the whole
//! pipeline can be exercised without external data:
//!
//! - a few urban cores drive an "urbanity" surface
//! - land-use codes follow urbanity (commercial in the cores, residential
//!   around them, forest/pasture/water outside), with a missing border ring
//! - ecosystem services grow away from the cores, road density towards them
//! - attraction layers are gravity-style (`magnitude / travel_time^beta`)
//!
//! Road density and the ecosystem-service index are generated on a grid with
//! twice the cell size, so loading them exercises resampling.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::info;

use crate::data::layers::{Layer, LayerFiles};
use crate::error::AppError;
use crate::io::write_raster;
use crate::raster::{GeoTransform, Raster, gravity_attraction};

/// UTM zone 33N; the synthetic origin sits at typical UTM easting/northing.
pub const SYNTHETIC_CRS: &str = "EPSG:32633";

/// Configuration of the synthetic study area.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub rows: usize,
    pub cols: usize,
    pub seed: u64,
    /// Number of urban cores.
    pub cores: usize,
    /// Cell size of the land-use grid in map units (metres).
    pub cell_size: f64,
    /// Distance-decay exponent for the attraction layers.
    pub beta: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            rows: 120,
            cols: 120,
            seed: 42,
            cores: 3,
            cell_size: 30.0,
            beta: 1.5,
        }
    }
}

/// All six layers of a generated study area.
#[derive(Debug, Clone)]
pub struct SyntheticArea {
    pub land_use: Raster,
    pub road_density: Raster,
    pub es_index: Raster,
    pub pop_attraction: Raster,
    pub emp_attraction: Raster,
    pub trans_attraction: Raster,
}

impl SyntheticArea {
    pub fn layer(&self, layer: Layer) -> &Raster {
        match layer {
            Layer::LandUse => &self.land_use,
            Layer::RoadDensity => &self.road_density,
            Layer::EsIndex => &self.es_index,
            Layer::PopAttraction => &self.pop_attraction,
            Layer::EmpAttraction => &self.emp_attraction,
            Layer::TransAttraction => &self.trans_attraction,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Core {
    row: f64,
    col: f64,
    weight: f64,
}

/// Urban cores plus the spread of their influence (in cells).
struct Urbanity {
    cores: Vec<Core>,
    sigma: f64,
}

impl Urbanity {
    /// Sum of Gaussian bumps at a fractional cell position.
    fn at(&self, row: f64, col: f64) -> f64 {
        let two_s2 = 2.0 * self.sigma * self.sigma;
        self.cores
            .iter()
            .map(|c| {
                let d2 = (row - c.row).powi(2) + (col - c.col).powi(2);
                c.weight * (-d2 / two_s2).exp()
            })
            .sum()
    }

    /// Distance in cells to the nearest core.
    fn nearest(&self, row: f64, col: f64) -> f64 {
        self.cores
            .iter()
            .map(|c| ((row - c.row).powi(2) + (col - c.col).powi(2)).sqrt())
            .fold(f64::INFINITY, f64::min)
    }
}

fn validate(config: &SynthConfig) -> Result<(), AppError> {
    if config.rows < 8 || config.cols < 8 {
        return Err(AppError::input(format!(
            "Synthetic study area must be at least 8x8 cells, got {}x{}.",
            config.rows, config.cols
        )));
    }
    if config.cores == 0 {
        return Err(AppError::input("Synthetic study area needs at least one urban core."));
    }
    if !(config.cell_size.is_finite() && config.cell_size > 0.0) {
        return Err(AppError::input(format!("Invalid cell size {}.", config.cell_size)));
    }
    Ok(())
}

pub fn generate_study_area(config: &SynthConfig) -> Result<SyntheticArea, AppError> {
    validate(config)?;
    let (rows, cols) = (config.rows, config.cols);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, 0.08).map_err(|e| AppError::numeric(format!("Noise distribution error: {e}")))?;

    let cores: Vec<Core> = (0..config.cores)
        .map(|_| Core {
            row: rng.gen_range(0.2..0.8) * rows as f64,
            col: rng.gen_range(0.2..0.8) * cols as f64,
            weight: rng.gen_range(1.0..1.3),
        })
        .collect();
    let urbanity = Urbanity {
        cores,
        sigma: rows.min(cols) as f64 / 8.0,
    };

    let transform = GeoTransform::new(500_000.0, 4_200_000.0, config.cell_size, -config.cell_size);
    let grid = |values: Vec<f64>, r: usize, c: usize, t: GeoTransform| -> Result<Raster, AppError> {
        let mut raster = Raster::from_vec(values, r, c)?;
        raster.set_transform(Some(t));
        raster.set_crs(Some(SYNTHETIC_CRS.to_string()));
        Ok(raster)
    };

    // Land use.
    let mut codes = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            if row == 0 || col == 0 || row == rows - 1 || col == cols - 1 {
                codes.push(f64::NAN);
                continue;
            }
            let u = urbanity.at(row as f64 + 0.5, col as f64 + 0.5) + noise.sample(&mut rng);
            let code = if u > 0.85 {
                23.0
            } else if u > 0.6 {
                22.0
            } else if u > 0.4 {
                21.0
            } else if rng.gen_bool(0.08) {
                11.0
            } else if rng.gen_bool(0.6) {
                41.0
            } else {
                81.0
            };
            codes.push(code);
        }
    }
    let land_use = grid(codes, rows, cols, transform)?;

    // Coarse continuous layers.
    let (c_rows, c_cols) = (rows.div_ceil(2), cols.div_ceil(2));
    let coarse = GeoTransform::new(
        transform.origin_x,
        transform.origin_y,
        2.0 * config.cell_size,
        -2.0 * config.cell_size,
    );
    let mut roads = Vec::with_capacity(c_rows * c_cols);
    let mut es = Vec::with_capacity(c_rows * c_cols);
    for row in 0..c_rows {
        for col in 0..c_cols {
            let (fr, fc) = (2.0 * row as f64 + 1.0, 2.0 * col as f64 + 1.0);
            let u = urbanity.at(fr, fc).min(1.5);
            roads.push((0.2 + 2.0 * u + noise.sample(&mut rng)).max(0.01));
            es.push((1.6 - u + 2.0 * noise.sample(&mut rng)).max(0.01));
        }
    }
    let road_density = grid(roads, c_rows, c_cols, coarse)?;
    let es_index = grid(es, c_rows, c_cols, coarse)?;

    // Travel time (minutes) to the nearest core, and gravity magnitudes.
    let minutes_per_cell = config.cell_size / 500.0;
    let mut travel = Vec::with_capacity(rows * cols);
    let mut population = Vec::with_capacity(rows * cols);
    let mut employment = Vec::with_capacity(rows * cols);
    let mut transport = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let (fr, fc) = (row as f64 + 0.5, col as f64 + 0.5);
            let u = urbanity.at(fr, fc);
            travel.push(1.0 + urbanity.nearest(fr, fc) * minutes_per_cell * rng.gen_range(0.8..1.2));
            population.push((1_000.0 * u * (1.0 + noise.sample(&mut rng))).max(0.0));
            employment.push((800.0 * u * u * (1.0 + noise.sample(&mut rng))).max(0.0));
            transport.push((50.0 + 400.0 * u + 40.0 * noise.sample(&mut rng)).max(0.0));
        }
    }
    let travel_time = grid(travel, rows, cols, transform)?;
    let pop_attraction = gravity_attraction(&grid(population, rows, cols, transform)?, &travel_time, config.beta)?;
    let emp_attraction = gravity_attraction(&grid(employment, rows, cols, transform)?, &travel_time, config.beta)?;
    let trans_attraction = gravity_attraction(&grid(transport, rows, cols, transform)?, &travel_time, config.beta)?;

    info!(
        rows,
        cols,
        cores = config.cores,
        seed = config.seed,
        "generated synthetic study area"
    );

    Ok(SyntheticArea {
        land_use,
        road_density,
        es_index,
        pop_attraction,
        emp_attraction,
        trans_attraction,
    })
}

/// Write every layer of the area under the names in `files`.
pub fn write_study_area(area: &SyntheticArea, files: &LayerFiles) -> Result<(), AppError> {
    std::fs::create_dir_all(&files.data_dir).map_err(|e| {
        AppError::input(format!(
            "Failed to create data directory '{}': {e}",
            files.data_dir.display()
        ))
    })?;
    for layer in Layer::ALL {
        let path = files.path(layer);
        write_raster(area.layer(layer), &path)?;
        info!(layer = layer.name(), path = %path.display(), "wrote layer");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SynthConfig {
        SynthConfig {
            rows: 40,
            cols: 36,
            ..SynthConfig::default()
        }
    }

    #[test]
    fn layers_have_expected_grids() {
        let area = generate_study_area(&small()).unwrap();
        assert_eq!(area.land_use.shape(), (40, 36));
        assert_eq!(area.road_density.shape(), (20, 18));
        assert_eq!(area.es_index.shape(), (20, 18));
        assert_eq!(area.pop_attraction.shape(), (40, 36));
        assert!(area.land_use.transform().is_some());
        assert_eq!(area.es_index.crs(), Some(SYNTHETIC_CRS));
    }

    #[test]
    fn land_use_has_border_gap_and_all_developed_classes() {
        let area = generate_study_area(&small()).unwrap();
        assert!(area.land_use.get(0, 0).unwrap().is_nan());
        assert!(area.land_use.get(39, 20).unwrap().is_nan());
        let codes: Vec<f64> = area.land_use.values().filter(|v| v.is_finite()).collect();
        for code in [21.0, 22.0, 23.0] {
            assert!(codes.contains(&code), "no cell with code {code}");
        }
        assert!(codes.iter().any(|&c| c == 41.0 || c == 81.0 || c == 11.0));
    }

    #[test]
    fn same_seed_same_area() {
        let a = generate_study_area(&small()).unwrap();
        let b = generate_study_area(&small()).unwrap();
        let va: Vec<f64> = a.emp_attraction.values().collect();
        let vb: Vec<f64> = b.emp_attraction.values().collect();
        assert_eq!(va, vb);
    }

    #[test]
    fn too_small_area_is_rejected() {
        let cfg = SynthConfig {
            rows: 4,
            ..SynthConfig::default()
        };
        assert_eq!(generate_study_area(&cfg).unwrap_err().exit_code(), 2);
    }
}
