//! Per-step scalar extraction from a decoded dataset.
//!
//! Extraction selects a variable, locates the nearest grid cell to the
//! target, collapses extra leading axes, and converts the value into the
//! published unit.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Field, GriddedDataset};
use crate::error::{PointSeriesError, Result};
use crate::grid::{nearest_index, GridIndex, TargetPoint};
use crate::units::UnitConversion;

/// Name pattern recognizing a physical quantity, compared case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasPattern {
    /// Name contains the pattern.
    Contains(&'static str),
    /// Name equals the pattern.
    Exact(&'static str),
}

impl AliasPattern {
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        match self {
            AliasPattern::Contains(p) => lower.contains(p),
            AliasPattern::Exact(p) => lower == *p,
        }
    }
}

/// Physical quantities the pipeline knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalQuantity {
    SnowDepth,
    Temperature,
    PrecipitationRate,
    CategoricalSnow,
}

impl PhysicalQuantity {
    /// Ordered alias patterns; a variable matches if any pattern does.
    pub fn aliases(self) -> &'static [AliasPattern] {
        use AliasPattern::*;
        match self {
            PhysicalQuantity::SnowDepth => &[Contains("sno"), Contains("sde"), Contains("snod")],
            PhysicalQuantity::Temperature => &[Contains("temp"), Exact("t"), Contains("tmp")],
            PhysicalQuantity::PrecipitationRate => &[Contains("prate")],
            PhysicalQuantity::CategoricalSnow => &[Contains("csnow")],
        }
    }

    pub fn conversion(self) -> UnitConversion {
        match self {
            PhysicalQuantity::SnowDepth => UnitConversion::MetersToInches,
            PhysicalQuantity::Temperature => UnitConversion::KelvinToFahrenheit,
            PhysicalQuantity::PrecipitationRate | PhysicalQuantity::CategoricalSnow => {
                UnitConversion::PerSecondToPerHour
            }
        }
    }

    /// Whether negative converted values are grid noise and clamp to zero.
    pub fn clamps_negative(self) -> bool {
        matches!(self, PhysicalQuantity::SnowDepth)
    }
}

/// How the extractor picks its variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSelector {
    /// Use exactly this variable; absence is an error.
    Pinned(String),
    /// Use the first variable matching the quantity's aliases.
    Alias(PhysicalQuantity),
}

/// Outcome of variable selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableMatch {
    /// The pinned name was present.
    Pinned(String),
    /// A variable matched one of the quantity's aliases.
    Alias(String),
    /// Nothing matched; the first variable of the dataset was used.
    Fallback(String),
}

impl VariableMatch {
    pub fn name(&self) -> &str {
        match self {
            VariableMatch::Pinned(n) | VariableMatch::Alias(n) | VariableMatch::Fallback(n) => n,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, VariableMatch::Fallback(_))
    }
}

/// First name matching any of `patterns`, in the order given by `names`.
pub fn match_alias<'a>(names: &[&'a str], patterns: &[AliasPattern]) -> Option<&'a str> {
    names
        .iter()
        .copied()
        .find(|name| patterns.iter().any(|p| p.matches(name)))
}

/// Choose the variable to extract from `dataset`.
pub fn select_variable(
    dataset: &dyn GriddedDataset,
    selector: &VariableSelector,
) -> Result<VariableMatch> {
    match selector {
        VariableSelector::Pinned(name) => {
            if dataset.field(name).is_some() {
                Ok(VariableMatch::Pinned(name.clone()))
            } else {
                Err(PointSeriesError::VariableNotFound(name.clone()))
            }
        }
        VariableSelector::Alias(quantity) => {
            let names = dataset.variable_names();
            if let Some(name) = match_alias(&names, quantity.aliases()) {
                return Ok(VariableMatch::Alias(name.to_string()));
            }
            names
                .first()
                .map(|name| VariableMatch::Fallback(name.to_string()))
                .ok_or(PointSeriesError::NoVariables)
        }
    }
}

/// Read the field value at `index`.
///
/// Leading axes beyond the trailing `[lat, lon]` pair are collapsed by
/// taking index 0, which is exact for singleton time/level axes. A 0-D
/// field yields its only value. A 1-D field runs along whichever grid axis
/// its length matches, given the grid's `(rows, cols)`; latitude wins when
/// both match, and the row is used when neither does.
pub fn value_at(field: &Field, index: GridIndex, dims: Option<(usize, usize)>) -> Result<f64> {
    let out_of_bounds = || PointSeriesError::IndexOutOfBounds {
        name: field.name.clone(),
        index: vec![index.row, index.col],
        shape: field.shape.clone(),
    };

    let flat = match field.shape.as_slice() {
        [] => 0,
        [len] => {
            let i = match dims {
                Some((rows, _)) if rows == *len => index.row,
                Some((_, cols)) if cols == *len => index.col,
                _ => index.row,
            };
            if i >= *len {
                return Err(out_of_bounds());
            }
            i
        }
        shape => {
            let rows = shape[shape.len() - 2];
            let cols = shape[shape.len() - 1];
            if index.row >= rows || index.col >= cols {
                return Err(out_of_bounds());
            }
            // Leading axes fixed at 0, so the offset is within the first slice.
            index.row * cols + index.col
        }
    };

    field
        .values
        .get(flat)
        .map(|&v| f64::from(v))
        .ok_or_else(|| PointSeriesError::field_shape(&field.name, "field has no values"))
}

/// Result of one successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub variable: VariableMatch,
    pub index: GridIndex,
    /// Value in the decoder's native unit.
    pub raw: f64,
    /// Converted (and clamped where applicable) value.
    pub value: f64,
}

/// Extracts one physical quantity at a fixed target point.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    quantity: PhysicalQuantity,
    selector: VariableSelector,
    target: TargetPoint,
}

impl FieldExtractor {
    /// Extractor selecting its variable by the quantity's aliases.
    pub fn new(quantity: PhysicalQuantity, target: TargetPoint) -> Self {
        Self {
            quantity,
            selector: VariableSelector::Alias(quantity),
            target,
        }
    }

    /// Pin an exact variable name instead of alias matching.
    pub fn pinned(mut self, name: impl Into<String>) -> Self {
        self.selector = VariableSelector::Pinned(name.into());
        self
    }

    pub fn quantity(&self) -> PhysicalQuantity {
        self.quantity
    }

    pub fn selector(&self) -> &VariableSelector {
        &self.selector
    }

    pub fn extract(&self, dataset: &dyn GriddedDataset) -> Result<Extraction> {
        let variable = select_variable(dataset, &self.selector)?;
        let field = dataset
            .field(variable.name())
            .ok_or_else(|| PointSeriesError::VariableNotFound(variable.name().to_string()))?;

        let grid = dataset.grid()?;
        let index = nearest_index(&grid, self.target)?;
        let raw = value_at(field, index, grid.dims())?;

        let mut value = self.quantity.conversion().apply(raw);
        if !value.is_finite() {
            return Err(PointSeriesError::MissingValue {
                name: field.name.clone(),
                row: index.row,
                col: index.col,
            });
        }
        if self.quantity.clamps_negative() {
            value = value.max(0.0);
        }

        debug!(
            variable = %variable.name(),
            fallback = variable.is_fallback(),
            row = index.row,
            col = index.col,
            raw = raw,
            value = value,
            "Extracted point value"
        );

        Ok(Extraction {
            variable,
            index,
            raw,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DecodedDataset;
    use crate::grid::CoordinateArray;

    fn grid_dataset() -> DecodedDataset {
        DecodedDataset::new(
            CoordinateArray::axis(vec![44.5, 44.25]),
            CoordinateArray::axis(vec![286.0, 286.25, 286.5]),
        )
    }

    fn whiteface() -> TargetPoint {
        TargetPoint::new(44.3659, -73.9023)
    }

    #[test]
    fn test_alias_matching_is_ordered_and_case_insensitive() {
        let names = ["u10", "SDE_surface", "snod"];
        assert_eq!(
            match_alias(&names, PhysicalQuantity::SnowDepth.aliases()),
            Some("SDE_surface")
        );
        assert_eq!(match_alias(&names, PhysicalQuantity::Temperature.aliases()), None);
    }

    #[test]
    fn test_temperature_exact_alias() {
        assert_eq!(
            match_alias(&["gh", "t"], PhysicalQuantity::Temperature.aliases()),
            Some("t")
        );
        // "gust" contains a 't' but is neither "t" nor contains "temp"/"tmp"
        assert_eq!(
            match_alias(&["gust"], PhysicalQuantity::Temperature.aliases()),
            None
        );
    }

    #[test]
    fn test_select_variable_outcomes() {
        let ds = grid_dataset()
            .with_field(Field::new("gh", vec![2, 3], vec![0.0; 6]).unwrap())
            .with_field(Field::new("t", vec![2, 3], vec![0.0; 6]).unwrap());

        let alias = select_variable(&ds, &VariableSelector::Alias(PhysicalQuantity::Temperature));
        assert_eq!(alias.unwrap(), VariableMatch::Alias("t".into()));

        let fallback = select_variable(&ds, &VariableSelector::Alias(PhysicalQuantity::SnowDepth));
        assert_eq!(fallback.unwrap(), VariableMatch::Fallback("gh".into()));

        let pinned = select_variable(&ds, &VariableSelector::Pinned("sde".into()));
        assert!(matches!(pinned, Err(PointSeriesError::VariableNotFound(_))));

        let empty = grid_dataset();
        assert!(matches!(
            select_variable(&empty, &VariableSelector::Alias(PhysicalQuantity::SnowDepth)),
            Err(PointSeriesError::NoVariables)
        ));
    }

    #[test]
    fn test_value_at_collapses_leading_axes() {
        // (time=2, lat=2, lon=3): only the first time slice is read
        let mut values: Vec<f32> = (0..6).map(|v| v as f32).collect();
        values.extend((0..6).map(|v| 100.0 + v as f32));
        let field = Field::new("t", vec![2, 2, 3], values).unwrap();

        let dims = Some((2, 3));
        assert_eq!(value_at(&field, GridIndex { row: 1, col: 2 }, dims).unwrap(), 5.0);
        assert!(value_at(&field, GridIndex { row: 2, col: 0 }, dims).is_err());
    }

    #[test]
    fn test_value_at_low_dimensions() {
        let index = GridIndex { row: 3, col: 3 };
        let scalar = Field::new("x", vec![], vec![7.0]).unwrap();
        assert_eq!(value_at(&scalar, index, Some((4, 4))).unwrap(), 7.0);

        let column = Field::new("x", vec![3], vec![1.0, 2.0, 3.0]).unwrap();
        let index = GridIndex { row: 2, col: 0 };
        assert_eq!(value_at(&column, index, Some((3, 5))).unwrap(), 3.0);
        assert_eq!(value_at(&column, index, None).unwrap(), 3.0);
    }

    #[test]
    fn test_value_at_1d_follows_matching_axis() {
        // Single latitude row: the field runs along longitude
        let along_lon = Field::new("x", vec![4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let index = GridIndex { row: 0, col: 2 };
        assert_eq!(value_at(&along_lon, index, Some((1, 4))).unwrap(), 3.0);

        // Single longitude column: the field runs along latitude
        let along_lat = Field::new("x", vec![3], vec![1.0, 2.0, 3.0]).unwrap();
        let index = GridIndex { row: 1, col: 0 };
        assert_eq!(value_at(&along_lat, index, Some((3, 1))).unwrap(), 2.0);

        // Square grid prefers latitude
        let square = Field::new("x", vec![2], vec![1.0, 2.0]).unwrap();
        let index = GridIndex { row: 1, col: 0 };
        assert_eq!(value_at(&square, index, Some((2, 2))).unwrap(), 2.0);
    }

    #[test]
    fn test_single_row_grid_extraction() {
        let ds = DecodedDataset::new(
            CoordinateArray::axis(vec![44.25]),
            CoordinateArray::axis(vec![285.75, 286.0, 286.25]),
        )
        .with_field(Field::new("t", vec![3], vec![250.0, 273.15, 300.0]).unwrap());
        let ex = FieldExtractor::new(PhysicalQuantity::Temperature, whiteface())
            .extract(&ds)
            .unwrap();
        assert_eq!(ex.index, GridIndex { row: 0, col: 1 });
        assert!((ex.value - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_missing_value_is_an_error() {
        let mut values = vec![0.1; 6];
        values[3] = f32::NAN;
        let ds = grid_dataset().with_field(Field::new("sde", vec![2, 3], values).unwrap());
        let err = FieldExtractor::new(PhysicalQuantity::SnowDepth, whiteface())
            .extract(&ds)
            .unwrap_err();
        assert!(matches!(
            err,
            PointSeriesError::MissingValue { row: 1, col: 0, .. }
        ));

        let ds = grid_dataset()
            .with_field(Field::new("t", vec![2, 3], vec![f32::INFINITY; 6]).unwrap());
        assert!(FieldExtractor::new(PhysicalQuantity::Temperature, whiteface())
            .extract(&ds)
            .is_err());
    }

    #[test]
    fn test_snow_depth_extraction() {
        // nearest cell is row 1 (44.25), col 0 (286.0 → -74.0)
        let ds = grid_dataset().with_field(
            Field::new("sde", vec![1, 2, 3], vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]).unwrap(),
        );
        let extractor = FieldExtractor::new(PhysicalQuantity::SnowDepth, whiteface());
        let ex = extractor.extract(&ds).unwrap();

        assert_eq!(ex.index, GridIndex { row: 1, col: 0 });
        assert_eq!(ex.variable, VariableMatch::Alias("sde".into()));
        assert!((ex.value - 39.3701).abs() < 1e-4);
    }

    #[test]
    fn test_negative_snow_depth_clamped() {
        let ds = grid_dataset()
            .with_field(Field::new("sde", vec![2, 3], vec![-0.01; 6]).unwrap());
        let ex = FieldExtractor::new(PhysicalQuantity::SnowDepth, whiteface())
            .extract(&ds)
            .unwrap();
        assert_eq!(ex.value, 0.0);
        assert!(ex.raw < 0.0);
    }

    #[test]
    fn test_temperature_not_clamped() {
        let ds = grid_dataset()
            .with_field(Field::new("t", vec![2, 3], vec![250.0; 6]).unwrap());
        let ex = FieldExtractor::new(PhysicalQuantity::Temperature, whiteface())
            .extract(&ds)
            .unwrap();
        // 250 K = -9.67 °F
        assert!((ex.value - (-9.67)).abs() < 1e-2);
    }

    #[test]
    fn test_pinned_missing_variable() {
        let ds = grid_dataset()
            .with_field(Field::new("snod", vec![2, 3], vec![0.0; 6]).unwrap());
        let extractor =
            FieldExtractor::new(PhysicalQuantity::SnowDepth, whiteface()).pinned("sde");
        assert!(matches!(
            extractor.extract(&ds),
            Err(PointSeriesError::VariableNotFound(_))
        ));
    }
}
