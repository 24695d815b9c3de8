//! Synthetic grids and datasets with predictable values.
//!
//! The default window is a 5x5 slice of the GFS 0.25° grid around
//! Whiteface Mountain, with longitudes in the 0-360 convention the model
//! publishes. The site's nearest cell is [`crate::WHITEFACE_CELL`].

use point_series::{CoordinateArray, DecodedDataset, Field, GridIndex};

/// Latitudes of the default window, north to south.
pub const WINDOW_LATS: [f64; 5] = [45.0, 44.75, 44.5, 44.25, 44.0];

/// Longitudes of the default window, degrees east.
pub const WINDOW_LONS: [f64; 5] = [285.5, 285.75, 286.0, 286.25, 286.5];

/// Value written to every cell other than the one under test.
pub const DECOY_VALUE: f32 = 999.0;

/// 1-D latitude and longitude axes of the default window.
pub fn gfs_window() -> (CoordinateArray, CoordinateArray) {
    (
        CoordinateArray::axis(WINDOW_LATS.to_vec()),
        CoordinateArray::axis(WINDOW_LONS.to_vec()),
    )
}

/// The default window expanded to 2-D coordinate arrays.
pub fn curvilinear_window() -> (CoordinateArray, CoordinateArray) {
    let rows = WINDOW_LATS.len();
    let cols = WINDOW_LONS.len();
    let mut lats = Vec::with_capacity(rows * cols);
    let mut lons = Vec::with_capacity(rows * cols);
    for lat in WINDOW_LATS {
        for lon in WINDOW_LONS {
            lats.push(lat);
            lons.push(lon);
        }
    }
    (
        CoordinateArray {
            shape: vec![rows, cols],
            values: lats,
        },
        CoordinateArray {
            shape: vec![rows, cols],
            values: lons,
        },
    )
}

/// A `[1, rows, cols]` field holding `value` at `cell` and the decoy elsewhere.
pub fn point_field(name: &str, rows: usize, cols: usize, cell: GridIndex, value: f32) -> Field {
    let mut values = vec![DECOY_VALUE; rows * cols];
    values[cell.row * cols + cell.col] = value;
    Field {
        name: name.to_string(),
        shape: vec![1, rows, cols],
        values,
    }
}

/// A field with the same value in every cell.
pub fn constant_field(name: &str, rows: usize, cols: usize, value: f32) -> Field {
    Field {
        name: name.to_string(),
        shape: vec![rows, cols],
        values: vec![value; rows * cols],
    }
}

/// Dataset on the default window with one variable set at the site cell.
pub fn point_dataset(variable: &str, value: f32) -> DecodedDataset {
    let (lat, lon) = gfs_window();
    DecodedDataset::new(lat, lon).with_field(point_field(
        variable,
        WINDOW_LATS.len(),
        WINDOW_LONS.len(),
        crate::WHITEFACE_CELL,
        value,
    ))
}

/// Surface snow depth in meters, named as cfgrib names it.
pub fn snow_depth_dataset(meters: f32) -> DecodedDataset {
    point_dataset("sde", meters)
}

/// 975 mb temperature in Kelvin.
pub fn temperature_dataset(kelvin: f32) -> DecodedDataset {
    point_dataset("t", kelvin)
}

/// Precipitation rate in kg m-2 s-1.
pub fn precip_rate_dataset(per_second: f32) -> DecodedDataset {
    point_dataset("prate", per_second)
}

/// Categorical snow indicator (0 or 1).
pub fn categorical_snow_dataset(flag: f32) -> DecodedDataset {
    point_dataset("csnow", flag)
}

/// Snow depths in meters for a sequence of depths given in inches.
pub fn inches_to_meters(inches: &[f64]) -> Vec<f32> {
    inches
        .iter()
        .map(|i| (i / point_series::units::INCHES_PER_METER) as f32)
        .collect()
}
