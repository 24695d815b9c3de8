//! Unit conversions applied at the extraction boundary.

use serde::{Deserialize, Serialize};

/// Inches per meter.
pub const INCHES_PER_METER: f64 = 39.3701;

/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

pub fn meters_to_inches(meters: f64) -> f64 {
    meters * INCHES_PER_METER
}

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    celsius_to_fahrenheit(kelvin_to_celsius(kelvin))
}

/// Convert a per-second rate to a per-hour rate.
pub fn per_second_to_per_hour(rate: f64) -> f64 {
    rate * SECONDS_PER_HOUR
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Conversion from the decoder's native unit to the published unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitConversion {
    /// Snow depth, meters to inches.
    MetersToInches,
    /// Temperature, Kelvin to degrees Fahrenheit.
    KelvinToFahrenheit,
    /// Rates and categorical indicators, per second to per hour.
    PerSecondToPerHour,
}

impl UnitConversion {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            UnitConversion::MetersToInches => meters_to_inches(value),
            UnitConversion::KelvinToFahrenheit => kelvin_to_fahrenheit(value),
            UnitConversion::PerSecondToPerHour => per_second_to_per_hour(value),
        }
    }

}
