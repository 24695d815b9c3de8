//! Forecaster configuration.
//!
//! Loaded from YAML, or built from defaults with environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PointSeriesError, Result};
use crate::grid::TargetPoint;
use crate::schedule::ForecastSchedule;

/// Fixed geographic point the series are extracted for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    /// Prefix of published file names.
    pub slug: String,
    pub latitude: f64,
    /// Degrees east in [-180, 180).
    pub longitude: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Whiteface Mountain".to_string(),
            slug: "whiteface".to_string(),
            latitude: 44.3659,
            longitude: -73.9023,
        }
    }
}

impl SiteConfig {
    pub fn target(&self) -> TargetPoint {
        TargetPoint::new(self.latitude, self.longitude)
    }
}

/// Model cycle timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Hours between model runs.
    pub interval_hours: u32,
    /// Hours after initialization before a run is used.
    pub availability_delay_hours: u32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            interval_hours: 6,
            availability_delay_hours: 6,
        }
    }
}

/// Which products a run publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductToggles {
    #[serde(default = "default_enabled")]
    pub snow_accumulation: bool,
    #[serde(default = "default_enabled")]
    pub snow_rate: bool,
    #[serde(default = "default_enabled")]
    pub temperature: bool,
    #[serde(default = "default_enabled")]
    pub precip_type: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for ProductToggles {
    fn default() -> Self {
        Self {
            snow_accumulation: true,
            snow_rate: true,
            temperature: true,
            precip_type: true,
        }
    }
}

/// Top-level forecaster configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecasterConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub schedule: ForecastSchedule,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub products: ProductToggles,
    /// Root of the decoded dataset tree.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory published JSON files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/decoded")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/var/data")
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            schedule: ForecastSchedule::default(),
            cycle: CycleConfig::default(),
            products: ProductToggles::default(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl ForecasterConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading forecaster config");
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `SITE_LAT`, `SITE_LON`, `FORECAST_END_HOUR`,
    /// `FORECAST_INTERVAL_HOURS`, `DATA_DIR` and `OUTPUT_DIR` when set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(lat) = env_parse::<f64>("SITE_LAT")? {
            self.site.latitude = lat;
        }
        if let Some(lon) = env_parse::<f64>("SITE_LON")? {
            self.site.longitude = lon;
        }
        if let Some(end) = env_parse::<u32>("FORECAST_END_HOUR")? {
            self.schedule.end_hour = end;
        }
        if let Some(interval) = env_parse::<u32>("FORECAST_INTERVAL_HOURS")? {
            self.schedule.interval_hours = interval;
        }
        if let Ok(dir) = std::env::var("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()?;

        if !(-90.0..=90.0).contains(&self.site.latitude) {
            return Err(PointSeriesError::config(format!(
                "site latitude {} out of range",
                self.site.latitude
            )));
        }
        if !(-180.0..180.0).contains(&self.site.longitude) {
            return Err(PointSeriesError::config(format!(
                "site longitude {} must be in [-180, 180)",
                self.site.longitude
            )));
        }
        if self.site.slug.is_empty() {
            return Err(PointSeriesError::config("site slug must not be empty"));
        }
        if self.cycle.interval_hours == 0 || 24 % self.cycle.interval_hours != 0 {
            return Err(PointSeriesError::config(
                "cycle interval_hours must divide 24",
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                PointSeriesError::config(format!("{} has invalid value '{}'", key, val))
            }),
        Err(_) => Ok(None),
    }
}
