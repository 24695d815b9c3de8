//! Forecast schedule, model cycle selection and per-step request naming.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PointSeriesError, Result};
use crate::series::ForecastStep;

/// NOMADS GRIB filter endpoint for GFS 0.25°.
pub const NOMADS_GFS_FILTER_URL: &str = "https://nomads.ncep.noaa.gov/cgi-bin/filter_gfs_0p25.pl";

/// Regularly spaced forecast offsets, inclusive of both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSchedule {
    pub start_hour: u32,
    pub end_hour: u32,
    pub interval_hours: u32,
}

impl Default for ForecastSchedule {
    fn default() -> Self {
        // f000..f384 every 6 hours, 65 steps
        Self {
            start_hour: 0,
            end_hour: 384,
            interval_hours: 6,
        }
    }
}

impl ForecastSchedule {
    pub fn validate(&self) -> Result<()> {
        if self.interval_hours == 0 {
            return Err(PointSeriesError::config("interval_hours must be > 0"));
        }
        if self.end_hour < self.start_hour {
            return Err(PointSeriesError::config(format!(
                "end_hour {} is before start_hour {}",
                self.end_hour, self.start_hour
            )));
        }
        Ok(())
    }

    /// All scheduled steps in increasing order.
    pub fn steps(&self) -> Vec<ForecastStep> {
        if self.interval_hours == 0 || self.end_hour < self.start_hour {
            return Vec::new();
        }
        (self.start_hour..=self.end_hour)
            .step_by(self.interval_hours as usize)
            .collect()
    }
}

/// One model initialization (run) time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelCycle {
    pub date: NaiveDate,
    pub hour: u32,
}

impl ModelCycle {
    /// The newest cycle that is at least `delay_hours` old at `now`.
    pub fn latest_available(now: DateTime<Utc>, delay_hours: u32, interval_hours: u32) -> Self {
        let t = now - Duration::hours(i64::from(delay_hours));
        let interval = interval_hours.max(1);
        Self {
            date: t.date_naive(),
            hour: t.hour() / interval * interval,
        }
    }

    /// Parse a `YYYYMMDDHH` cycle string.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid =
            || PointSeriesError::config(format!("invalid cycle '{}', expected YYYYMMDDHH", s));
        if s.len() != 10 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(&s[..8], "%Y%m%d").map_err(|_| invalid())?;
        let hour: u32 = s[8..].parse().map_err(|_| invalid())?;
        if hour > 23 {
            return Err(invalid());
        }
        Ok(Self { date, hour })
    }

    /// Date component, `YYYYMMDD`.
    pub fn date_str(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// Zero-padded cycle hour, `HH`.
    pub fn hour_str(&self) -> String {
        format!("{:02}", self.hour)
    }
}

impl std::fmt::Display for ModelCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.date_str(), self.hour_str())
    }
}

/// Vertical level of a requested field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Surface,
    /// Isobaric level in millibars.
    Isobaric(u32),
}

impl Level {
    /// NOMADS filter level key, e.g. `surface` or `975_mb`.
    pub fn filter_key(&self) -> String {
        match self {
            Level::Surface => "surface".to_string(),
            Level::Isobaric(mb) => format!("{}_mb", mb),
        }
    }
}

/// One (step, variable) dataset request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRequest {
    pub cycle: ModelCycle,
    pub step: ForecastStep,
    /// GRIB2 short name, e.g. `SNOD`.
    pub variable: String,
    pub level: Level,
}

impl DatasetRequest {
    pub fn new(
        cycle: ModelCycle,
        step: ForecastStep,
        variable: impl Into<String>,
        level: Level,
    ) -> Self {
        Self {
            cycle,
            step,
            variable: variable.into(),
            level,
        }
    }

    /// GFS 0.25° file name for this step.
    pub fn file_name(&self) -> String {
        format!(
            "gfs.t{}z.pgrb2.0p25.f{:03}",
            self.cycle.hour_str(),
            self.step
        )
    }

    /// NOMADS filter URL selecting only this variable and level.
    pub fn nomads_url(&self) -> String {
        format!(
            "{}?dir=%2Fgfs.{}%2F{}%2Fatmos&file={}&var_{}=on&lev_{}=on",
            NOMADS_GFS_FILTER_URL,
            self.cycle.date_str(),
            self.cycle.hour_str(),
            self.file_name(),
            self.variable,
            self.level.filter_key()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_schedule_has_65_steps() {
        let steps = ForecastSchedule::default().steps();
        assert_eq!(steps.len(), 65);
        assert_eq!(steps.first(), Some(&0));
        assert_eq!(steps.last(), Some(&384));
        assert!(steps.windows(2).all(|w| w[1] - w[0] == 6));
    }

    #[test]
    fn test_schedule_validation() {
        let zero = ForecastSchedule {
            interval_hours: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
        assert!(zero.steps().is_empty());

        let backwards = ForecastSchedule {
            start_hour: 12,
            end_hour: 6,
            interval_hours: 3,
        };
        assert!(backwards.validate().is_err());
    }

    #[test]
    fn test_latest_available_cycle() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 17, 30, 0).unwrap();
        let cycle = ModelCycle::latest_available(now, 6, 6);
        assert_eq!(cycle.date_str(), "20250115");
        assert_eq!(cycle.hour_str(), "06");

        // Crossing midnight goes back a day
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 3, 0, 0).unwrap();
        let cycle = ModelCycle::latest_available(now, 6, 6);
        assert_eq!(cycle.to_string(), "2025011418");
    }

    #[test]
    fn test_parse_cycle() {
        let cycle = ModelCycle::parse("2025112512").unwrap();
        assert_eq!(cycle.hour, 12);
        assert_eq!(cycle.to_string(), "2025112512");

        assert!(ModelCycle::parse("20251125").is_err());
        assert!(ModelCycle::parse("2025112524").is_err());
        assert!(ModelCycle::parse("2025x12512").is_err());
    }

    #[test]
    fn test_request_naming() {
        let cycle = ModelCycle::parse("2025112500").unwrap();
        let request = DatasetRequest::new(cycle, 6, "TMP", Level::Isobaric(975));

        assert_eq!(request.file_name(), "gfs.t00z.pgrb2.0p25.f006");
        assert_eq!(
            request.nomads_url(),
            "https://nomads.ncep.noaa.gov/cgi-bin/filter_gfs_0p25.pl\
             ?dir=%2Fgfs.20251125%2F00%2Fatmos\
             &file=gfs.t00z.pgrb2.0p25.f006&var_TMP=on&lev_975_mb=on"
        );
    }
}
