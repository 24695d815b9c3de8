//! Per-step precipitation type classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Precipitation type at one forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipType {
    Snow,
    Rain,
    None,
}

impl PrecipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecipType::Snow => "snow",
            PrecipType::Rain => "rain",
            PrecipType::None => "none",
        }
    }
}

impl fmt::Display for PrecipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify from per-hour precipitation rate and categorical snow indicator.
///
/// The snow indicator takes precedence. A missing indicator should be
/// passed as 0.
pub fn classify(precip_rate: f64, snow_indicator: f64) -> PrecipType {
    if snow_indicator > 0.0 {
        PrecipType::Snow
    } else if precip_rate > 0.0 {
        PrecipType::Rain
    } else {
        PrecipType::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(0.5, 0.0), PrecipType::Rain);
        assert_eq!(classify(0.0, 1.0), PrecipType::Snow);
        assert_eq!(classify(0.0, 0.0), PrecipType::None);
        assert_eq!(classify(0.5, 1.0), PrecipType::Snow);
    }

    #[test]
    fn test_nan_is_none() {
        assert_eq!(classify(f64::NAN, f64::NAN), PrecipType::None);
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&[PrecipType::Snow, PrecipType::None]).unwrap();
        assert_eq!(json, r#"["snow","none"]"#);
        assert_eq!(PrecipType::Rain.to_string(), "rain");
    }
}
