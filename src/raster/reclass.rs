//! Land-use reclassification.
//!
//! Land-use rasters carry NLCD class codes. The analysis needs per-class layers
//! in which a cell keeps its class code when it belongs to the class and is `0`
//! otherwise, so both the class and its presence stay visible on a map.

use crate::domain::LandUseClass;
use crate::raster::Raster;

/// Inclusive code range mapped to an output value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReclassRule {
    pub min: f64,
    pub max: f64,
    pub value: f64,
}

impl ReclassRule {
    pub const fn new(min: f64, max: f64, value: f64) -> Self {
        Self { min, max, value }
    }

    fn matches(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Developed, open space (21) and low intensity (22).
pub const RESIDENTIAL_RULES: [ReclassRule; 1] = [ReclassRule::new(21.0, 22.0, 21.0)];

/// Developed, medium intensity (23).
pub const COMMERCIAL_RULES: [ReclassRule; 1] = [ReclassRule::new(23.0, 23.0, 23.0)];

/// Map each finite cell to the value of the first matching rule, else `default`.
///
/// Missing cells stay missing.
pub fn reclassify(raster: &Raster, rules: &[ReclassRule], default: f64) -> Raster {
    raster.map(|v| {
        if !v.is_finite() {
            return f64::NAN;
        }
        rules
            .iter()
            .find(|rule| rule.matches(v))
            .map_or(default, |rule| rule.value)
    })
}

pub fn rules_for(class: LandUseClass) -> &'static [ReclassRule] {
    match class {
        LandUseClass::Residential => &RESIDENTIAL_RULES,
        LandUseClass::Commercial => &COMMERCIAL_RULES,
    }
}

pub fn reclassify_class(land_use: &Raster, class: LandUseClass) -> Raster {
    reclassify(land_use, rules_for(class), 0.0)
}

/// `1` where a reclassified layer is positive, `0` elsewhere, missing preserved.
pub fn to_indicator(layer: &Raster) -> Raster {
    layer.map(|v| {
        if !v.is_finite() {
            f64::NAN
        } else if v > 0.0 {
            1.0
        } else {
            0.0
        }
    })
}

/// `1` where a cell is residential or commercial.
pub fn developed_indicator(land_use: &Raster) -> Raster {
    let mut rules = Vec::with_capacity(RESIDENTIAL_RULES.len() + COMMERCIAL_RULES.len());
    rules.extend_from_slice(&RESIDENTIAL_RULES);
    rules.extend_from_slice(&COMMERCIAL_RULES);
    to_indicator(&reclassify(land_use, &rules, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes() -> Raster {
        Raster::from_vec(vec![10.0, 21.0, 22.0, 23.0, f64::NAN], 1, 5).unwrap()
    }

    fn assert_cells(r: &Raster, expected: &[f64]) {
        let got: Vec<f64> = r.values().collect();
        assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(expected) {
            assert!((g.is_nan() && e.is_nan()) || g == e, "got {got:?}, expected {expected:?}");
        }
    }

    #[test]
    fn residential_keeps_code_21() {
        let r = reclassify_class(&codes(), LandUseClass::Residential);
        assert_cells(&r, &[0.0, 21.0, 21.0, 0.0, f64::NAN]);
    }

    #[test]
    fn commercial_keeps_code_23() {
        let r = reclassify_class(&codes(), LandUseClass::Commercial);
        assert_cells(&r, &[0.0, 0.0, 0.0, 23.0, f64::NAN]);
    }

    #[test]
    fn other_codes_map_to_zero() {
        let r = Raster::from_vec(vec![11.0, 24.0, 41.0, 82.0, 20.9], 1, 5).unwrap();
        for class in LandUseClass::ALL {
            assert_cells(&reclassify_class(&r, class), &[0.0; 5]);
        }
    }

    #[test]
    fn indicators_are_binary() {
        let res = reclassify_class(&codes(), LandUseClass::Residential);
        assert_cells(&to_indicator(&res), &[0.0, 1.0, 1.0, 0.0, f64::NAN]);
        assert_cells(&developed_indicator(&codes()), &[0.0, 1.0, 1.0, 1.0, f64::NAN]);
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = [ReclassRule::new(0.0, 10.0, 1.0), ReclassRule::new(5.0, 20.0, 2.0)];
        let r = Raster::from_vec(vec![7.0, 15.0, 30.0], 1, 3).unwrap();
        assert_cells(&reclassify(&r, &rules, -1.0), &[1.0, 2.0, -1.0]);
    }
}
