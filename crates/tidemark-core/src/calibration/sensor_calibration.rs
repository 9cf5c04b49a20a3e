//! Fifth-order polynomial calibration of a single sensor.

use super::CalibrationCoefficient;

pub const TYPE_CODE: &str = "SENSOR_CALIBRATION";

pub const COEFFICIENT_NAMES: [&str; 6] = ["x⁵", "x⁴", "x³", "x²", "x", "Intercept"];

pub fn coefficient_names() -> Vec<String> {
    COEFFICIENT_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Coefficients are ordered from the highest power down to the intercept.
pub fn apply_polynomial(coefficients: &[CalibrationCoefficient], raw: f64) -> f64 {
    coefficients
        .iter()
        .fold(0.0, |acc, coefficient| acc * raw + coefficient.value)
}
