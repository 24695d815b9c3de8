//! Published JSON records and the sink that persists them.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::precip::PrecipType;
use crate::series::ForecastStep;

/// Running storm-total snow accumulation, inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowAccumulationRecord {
    pub forecast_hours: Vec<ForecastStep>,
    pub running_positive_accum_in: Vec<f64>,
}

/// Incremental snowfall rate, inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowRateRecord {
    pub forecast_hours: Vec<ForecastStep>,
    pub hourly_snowfall_rates: Vec<f64>,
}

/// 975 mb temperature, degrees Fahrenheit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    pub forecast_hours: Vec<ForecastStep>,
    #[serde(rename = "temps_975mb_F")]
    pub temps_975mb_f: Vec<f64>,
}

/// Precipitation type per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipTypeRecord {
    pub forecast_hours: Vec<ForecastStep>,
    pub precipitation_types: Vec<PrecipType>,
}

/// Destination for published documents.
pub trait OutputSink: Send + Sync {
    fn publish(&self, file_name: &str, document: &serde_json::Value) -> Result<()>;
}

/// Serialize a record and hand it to the sink.
pub fn publish_record<R: Serialize>(
    sink: &dyn OutputSink,
    file_name: &str,
    record: &R,
) -> Result<()> {
    let document = serde_json::to_value(record)?;
    sink.publish(file_name, &document)
}

/// Writes pretty-printed JSON files into a directory.
///
/// Each file is written to a temporary file in the same directory and then
/// renamed over the target, so readers never observe a partial document.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for JsonFileSink {
    fn publish(&self, file_name: &str, document: &serde_json::Value) -> Result<()> {
        let path = self.dir.join(file_name);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, document)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        info!(path = %path.display(), "Published JSON");
        Ok(())
    }
}
