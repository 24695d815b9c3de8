//! Nearest-cell extraction over realistic GFS grid windows.

use point_series::{
    nearest_index, DecodedDataset, FieldExtractor, Grid, GriddedDataset, PhysicalQuantity,
    TargetPoint, VariableMatch,
};
use test_utils::{
    assert_approx_eq, curvilinear_window, gfs_window, point_field, snow_depth_dataset,
    whiteface_target, DECOY_VALUE, WHITEFACE_CELL, WINDOW_LATS, WINDOW_LONS,
};

#[test]
fn test_whiteface_maps_to_expected_cell() {
    let (lat, lon) = gfs_window();
    let index = nearest_index(&Grid::new(&lat, &lon), whiteface_target()).unwrap();
    assert_eq!(index, WHITEFACE_CELL);

    let (lat, lon) = curvilinear_window();
    let index = nearest_index(&Grid::new(&lat, &lon), whiteface_target()).unwrap();
    assert_eq!(index, WHITEFACE_CELL);
}

#[test]
fn test_grid_points_map_to_themselves() {
    let (lat, lon) = gfs_window();
    let grid = Grid::new(&lat, &lon);
    for (row, la) in WINDOW_LATS.iter().enumerate() {
        for (col, lo) in WINDOW_LONS.iter().enumerate() {
            // Targets are given in [-180, 180)
            let target = TargetPoint::new(*la, lo - 360.0);
            let index = nearest_index(&grid, target).unwrap();
            assert_eq!((index.row, index.col), (row, col));
        }
    }
}

#[test]
fn test_extracts_site_cell_not_neighbors() {
    let dataset = snow_depth_dataset(0.5);
    let extraction = FieldExtractor::new(PhysicalQuantity::SnowDepth, whiteface_target())
        .extract(&dataset)
        .unwrap();

    assert_eq!(extraction.variable, VariableMatch::Alias("sde".to_string()));
    assert_eq!(extraction.index, WHITEFACE_CELL);
    assert_approx_eq!(extraction.value, 0.5 * 39.3701, 1e-4);
    assert!(extraction.raw != f64::from(DECOY_VALUE));
}

#[test]
fn test_curvilinear_dataset_extraction() {
    let (lat, lon) = curvilinear_window();
    let dataset = DecodedDataset::new(lat, lon).with_field(point_field(
        "t",
        WINDOW_LATS.len(),
        WINDOW_LONS.len(),
        WHITEFACE_CELL,
        273.15,
    ));

    assert_eq!(dataset.variable_names(), vec!["t"]);
    let extraction = FieldExtractor::new(PhysicalQuantity::Temperature, whiteface_target())
        .extract(&dataset)
        .unwrap();
    assert_approx_eq!(extraction.value, 32.0, 1e-3);
}

#[test]
fn test_decoded_dataset_from_json() {
    let json = serde_json::json!({
        "latitude": { "shape": [2], "values": [44.5, 44.25] },
        "longitude": { "shape": [2], "values": [285.75, 286.0] },
        "variables": [
            { "name": "prate", "shape": [1, 2, 2], "values": [0.0, 0.0, 0.0, 0.001] }
        ]
    });
    let dataset = DecodedDataset::from_json_slice(json.to_string().as_bytes()).unwrap();

    let extraction = FieldExtractor::new(PhysicalQuantity::PrecipitationRate, whiteface_target())
        .pinned("prate")
        .extract(&dataset)
        .unwrap();
    assert_eq!((extraction.index.row, extraction.index.col), (1, 1));
    assert_approx_eq!(extraction.value, 3.6, 1e-4);
}
