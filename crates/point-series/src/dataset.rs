//! Decoded dataset capability interface.
//!
//! The pipeline never touches a decoder library directly. It only needs
//! named field lookup, coordinate lookup and shape queries, which any
//! decoder output can provide through [`GriddedDataset`].

use serde::{Deserialize, Serialize};

use crate::error::{PointSeriesError, Result};
use crate::grid::{CoordinateArray, Grid};

/// Coordinate names accepted for latitude, in lookup order.
const LATITUDE_NAMES: &[&str] = &["latitude", "lat"];
/// Coordinate names accepted for longitude, in lookup order.
const LONGITUDE_NAMES: &[&str] = &["longitude", "lon"];

/// One physical variable on a grid at one forecast step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl Field {
    /// Create a field, checking that the shape matches the value count.
    pub fn new(name: impl Into<String>, shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        let field = Self {
            name: name.into(),
            shape,
            values,
        };
        field.validate()?;
        Ok(field)
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let expected: usize = self.shape.iter().product();
        if expected != self.values.len() {
            return Err(PointSeriesError::field_shape(
                &self.name,
                format!(
                    "shape {:?} implies {} values, found {}",
                    self.shape,
                    expected,
                    self.values.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Minimal view of a decoded gridded dataset.
pub trait GriddedDataset: Send + Sync {
    /// Data variable names in dataset order.
    fn variable_names(&self) -> Vec<&str>;

    /// Look up a data variable by exact name.
    fn field(&self, name: &str) -> Option<&Field>;

    /// Look up a coordinate array by exact name.
    fn coordinate(&self, name: &str) -> Option<&CoordinateArray>;

    /// The latitude/longitude grid shared by all variables.
    fn grid(&self) -> Result<Grid<'_>> {
        let latitude = LATITUDE_NAMES
            .iter()
            .find_map(|name| self.coordinate(name))
            .ok_or_else(|| PointSeriesError::MissingCoordinate("latitude".into()))?;
        let longitude = LONGITUDE_NAMES
            .iter()
            .find_map(|name| self.coordinate(name))
            .ok_or_else(|| PointSeriesError::MissingCoordinate("longitude".into()))?;
        Ok(Grid::new(latitude, longitude))
    }
}

/// An owned, fully decoded dataset.
///
/// This is also the on-disk JSON layout read by the forecaster service.
/// Variables are kept as an ordered list so alias matching is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedDataset {
    pub latitude: CoordinateArray,
    pub longitude: CoordinateArray,
    #[serde(default)]
    pub variables: Vec<Field>,
}

impl DecodedDataset {
    pub fn new(latitude: CoordinateArray, longitude: CoordinateArray) -> Self {
        Self {
            latitude,
            longitude,
            variables: Vec::new(),
        }
    }

    /// Add a variable, builder style.
    pub fn with_field(mut self, field: Field) -> Self {
        self.variables.push(field);
        self
    }

    /// Parse and validate a dataset from its JSON representation.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let dataset: Self = serde_json::from_slice(bytes)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Check every array's shape against its value count.
    pub fn validate(&self) -> Result<()> {
        self.latitude.validate("latitude")?;
        self.longitude.validate("longitude")?;
        for field in &self.variables {
            field.validate()?;
        }
        Ok(())
    }
}

impl GriddedDataset for DecodedDataset {
    fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|f| f.name.as_str()).collect()
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.variables.iter().find(|f| f.name == name)
    }

    fn coordinate(&self, name: &str) -> Option<&CoordinateArray> {
        if LATITUDE_NAMES.contains(&name) {
            Some(&self.latitude)
        } else if LONGITUDE_NAMES.contains(&name) {
            Some(&self.longitude)
        } else {
            None
        }
    }
}

/// Two co-registered datasets viewed as one.
///
/// Variables of `primary` come first; a variable in `secondary` whose name
/// is already present in `primary` is hidden. Coordinates come from `primary`.
pub struct MergedDataset<'a> {
    primary: &'a dyn GriddedDataset,
    secondary: &'a dyn GriddedDataset,
}

impl<'a> MergedDataset<'a> {
    pub fn new(primary: &'a dyn GriddedDataset, secondary: &'a dyn GriddedDataset) -> Self {
        Self { primary, secondary }
    }
}

impl GriddedDataset for MergedDataset<'_> {
    fn variable_names(&self) -> Vec<&str> {
        let mut names = self.primary.variable_names();
        for name in self.secondary.variable_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.primary
            .field(name)
            .or_else(|| self.secondary.field(name))
    }

    fn coordinate(&self, name: &str) -> Option<&CoordinateArray> {
        self.primary
            .coordinate(name)
            .or_else(|| self.secondary.coordinate(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dataset(var: &str, value: f32) -> DecodedDataset {
        DecodedDataset::new(
            CoordinateArray::axis(vec![44.5, 44.25]),
            CoordinateArray::axis(vec![286.0, 286.25]),
        )
        .with_field(Field::new(var, vec![2, 2], vec![value; 4]).unwrap())
    }

    #[test]
    fn test_field_shape_validation() {
        assert!(Field::new("sde", vec![1, 2, 2], vec![0.0; 4]).is_ok());
        assert!(Field::new("sde", vec![2, 2], vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_grid_lookup() {
        let ds = small_dataset("sde", 1.0);
        let grid = ds.grid().unwrap();
        assert_eq!(grid.latitude.values, vec![44.5, 44.25]);
        assert_eq!(grid.longitude.shape(), &[2]);
    }

    #[test]
    fn test_variable_order_preserved() {
        let ds = small_dataset("b", 1.0)
            .with_field(Field::new("a", vec![2, 2], vec![0.0; 4]).unwrap());
        assert_eq!(ds.variable_names(), vec!["b", "a"]);
    }

    #[test]
    fn test_merged_dataset_first_wins() {
        let prate = small_dataset("prate", 0.001);
        let csnow = small_dataset("csnow", 1.0)
            .with_field(Field::new("prate", vec![2, 2], vec![9.0; 4]).unwrap());
        let merged = MergedDataset::new(&prate, &csnow);

        assert_eq!(merged.variable_names(), vec!["prate", "csnow"]);
        assert_eq!(merged.field("prate").unwrap().values[0], 0.001);
        assert_eq!(merged.field("csnow").unwrap().values[0], 1.0);
        assert!(merged.grid().is_ok());
    }

    #[test]
    fn test_from_json_slice() {
        let json = br#"{
            "latitude": {"shape": [2], "values": [44.5, 44.25]},
            "longitude": {"shape": [2], "values": [286.0, 286.25]},
            "variables": [{"name": "sde", "shape": [1, 2, 2], "values": [0.1, 0.2, 0.3, 0.4]}]
        }"#;
        let ds = DecodedDataset::from_json_slice(json).unwrap();
        assert_eq!(ds.variable_names(), vec!["sde"]);

        let bad = br#"{
            "latitude": {"shape": [3], "values": [44.5, 44.25]},
            "longitude": {"shape": [2], "values": [286.0, 286.25]}
        }"#;
        assert!(DecodedDataset::from_json_slice(bad).is_err());
    }
}
