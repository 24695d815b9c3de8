//! Nearest grid point search over 1-D or 2-D latitude/longitude arrays.

use serde::{Deserialize, Serialize};

use crate::error::{PointSeriesError, Result};

/// A coordinate array (latitude or longitude) with its shape.
///
/// Values are stored flat in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateArray {
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl CoordinateArray {
    /// Create a coordinate array, checking that the shape matches the value count.
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let array = Self { shape, values };
        array.validate("coordinate")?;
        Ok(array)
    }

    /// Create a 1-D coordinate axis.
    pub fn axis(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub(crate) fn validate(&self, name: &str) -> Result<()> {
        let expected: usize = self.shape.iter().product();
        if expected != self.values.len() {
            return Err(PointSeriesError::field_shape(
                name,
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

/// The coordinate space of one decoded field.
#[derive(Debug, Clone, Copy)]
pub struct Grid<'a> {
    pub latitude: &'a CoordinateArray,
    pub longitude: &'a CoordinateArray,
}

impl<'a> Grid<'a> {
    pub fn new(latitude: &'a CoordinateArray, longitude: &'a CoordinateArray) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Number of (rows, columns) of the grid.
    ///
    /// 1-D axes give their lengths; 2-D arrays give their shape. `None` for
    /// any other layout.
    pub fn dims(&self) -> Option<(usize, usize)> {
        match (self.latitude.shape.as_slice(), self.longitude.shape.as_slice()) {
            ([rows], [cols]) => Some((*rows, *cols)),
            ([rows, cols], [_, _]) => Some((*rows, *cols)),
            _ => None,
        }
    }
}

/// Geographic target location in degrees, longitude in [-180, 180).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPoint {
    pub lat: f64,
    pub lon: f64,
}

impl TargetPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Index of the nearest grid cell as (row, col) into a `[lat, lon]` field.
///
/// For 1-D grids `row` indexes the latitude axis and `col` the longitude
/// axis. For 2-D grids both index the shared coordinate shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridIndex {
    pub row: usize,
    pub col: usize,
}

/// Map longitudes greater than 180 into the western hemisphere.
pub fn normalize_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// Find the grid cell nearest to `target`.
///
/// 2-D grids use flat Euclidean distance in degree space. 1-D grids select
/// the latitude and longitude indices independently. Ties resolve to the
/// lowest index.
pub fn nearest_index(grid: &Grid<'_>, target: TargetPoint) -> Result<GridIndex> {
    let lat = grid.latitude;
    let lon = grid.longitude;
    lat.validate("latitude")?;
    lon.validate("longitude")?;

    match (lat.ndim(), lon.ndim()) {
        (1, 1) => {
            let row = argmin(lat.values.iter().map(|&v| (v - target.lat).abs()))
                .ok_or(PointSeriesError::EmptyGrid)?;
            let col = argmin(
                lon.values
                    .iter()
                    .map(|&v| (normalize_longitude(v) - target.lon).abs()),
            )
            .ok_or(PointSeriesError::EmptyGrid)?;
            Ok(GridIndex { row, col })
        }
        (2, 2) => {
            if lat.shape != lon.shape {
                return Err(PointSeriesError::GridShapeMismatch {
                    lat: lat.shape.clone(),
                    lon: lon.shape.clone(),
                });
            }
            let ncols = lat.shape[1];
            let distances = lat.values.iter().zip(&lon.values).map(|(&la, &lo)| {
                let dlat = la - target.lat;
                let dlon = normalize_longitude(lo) - target.lon;
                (dlat * dlat + dlon * dlon).sqrt()
            });
            let flat = argmin(distances).ok_or(PointSeriesError::EmptyGrid)?;
            Ok(GridIndex {
                row: flat / ncols,
                col: flat % ncols,
            })
        }
        (lat_ndim, lon_ndim) => Err(PointSeriesError::UnsupportedGridShape { lat_ndim, lon_ndim }),
    }
}

/// Index of the smallest value. NaN entries never win; ties keep the first index.
fn argmin(values: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
