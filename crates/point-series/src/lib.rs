//! Point forecast series from gridded NWP fields.
//!
//! Extracts a scalar per forecast step at a fixed site from decoded
//! gridded datasets and derives secondary series from it.
//!
//! # Architecture
//!
//! ```text
//! DatasetSource::fetch(step)        decoded dataset per (step, variable)
//!      │
//!      ▼
//! grid::nearest_index               nearest cell to the site
//!      │
//!      ▼
//! FieldExtractor::extract           variable selection + unit conversion
//!      │
//!      ▼
//! SeriesBuilder::build              failed steps become gaps
//!      │
//!      ├─► ResetAccumulator         storm total / hourly rate
//!      └─► precip::classify         snow / rain / none
//!               │
//!               ▼
//!          OutputSink::publish      only when a series is non-empty
//! ```
//!
//! GRIB decoding and HTTP transport live outside this crate, behind
//! [`DatasetSource`].

pub mod accumulate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod grid;
pub mod output;
pub mod pipeline;
pub mod precip;
pub mod schedule;
pub mod series;
pub mod units;

// Re-exports
pub use accumulate::{ResetAccumulator, ResetPolicy};
pub use config::{CycleConfig, ForecasterConfig, ProductToggles, SiteConfig};
pub use dataset::{DecodedDataset, Field, GriddedDataset, MergedDataset};
pub use error::{PointSeriesError, Result};
pub use extract::{
    AliasPattern, Extraction, FieldExtractor, PhysicalQuantity, VariableMatch, VariableSelector,
};
pub use grid::{nearest_index, normalize_longitude, CoordinateArray, Grid, GridIndex, TargetPoint};
pub use output::{
    JsonFileSink, OutputSink, PrecipTypeRecord, SnowAccumulationRecord, SnowRateRecord,
    TemperatureRecord,
};
pub use pipeline::{ForecastPipeline, Product, ProductRun, ProductSummary};
pub use precip::{classify, PrecipType};
pub use schedule::{DatasetRequest, ForecastSchedule, Level, ModelCycle};
pub use series::{
    DatasetHandle, DatasetSource, ForecastStep, Sample, Series, SeriesBuilder, SeriesReport,
    SkippedStep, StepExtractor,
};
pub use units::UnitConversion;
