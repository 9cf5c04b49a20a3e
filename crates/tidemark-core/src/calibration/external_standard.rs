//! Reference gases of known concentration used to characterise drift.
//!
//! The coefficient names are the instrument's internal-calibration targets
//! (sorted by name), so the same stored row can map to a different schema
//! as the instrument configuration changes. The first coefficient is the
//! concentration; the second is the water vapour term and must be zero.

use super::{Calibration, CalibrationCoefficient, CalibrationKind, CalibrationTargets};
use crate::error::CalibrationError;

pub const TYPE_CODE: &str = "EXTERNAL_STANDARD";

pub fn coefficient_names<T>(
    instrument_id: i64,
    targets: &T,
) -> Result<Vec<String>, CalibrationError>
where
    T: CalibrationTargets + ?Sized,
{
    targets.internal_calibration_targets(instrument_id)
}

pub fn coefficients_valid(coefficients: &[CalibrationCoefficient]) -> bool {
    match coefficients {
        [concentration, water_vapour] => concentration.value >= 0.0 && water_vapour.value == 0.0,
        _ => false,
    }
}

/// Only the concentration is user-editable.
pub fn editable(coefficients: &[CalibrationCoefficient]) -> &[CalibrationCoefficient] {
    &coefficients[..coefficients.len().min(1)]
}

impl Calibration {
    pub fn external_standard<T>(
        instrument_id: i64,
        standard: impl Into<String>,
        targets: &T,
    ) -> Self
    where
        T: CalibrationTargets + ?Sized,
    {
        Calibration::new(CalibrationKind::ExternalStandard, instrument_id, targets)
            .for_target(standard)
    }

    /// Concentration of an external standard, if coefficients are set.
    pub fn concentration(&self) -> Option<f64> {
        match self.kind() {
            CalibrationKind::ExternalStandard => self.coefficients()?.first().map(|c| c.value),
            _ => None,
        }
    }

    pub fn set_concentration(&mut self, concentration: f64) -> Result<(), CalibrationError> {
        if self.kind() != CalibrationKind::ExternalStandard {
            return Err(CalibrationError::KindMismatch {
                operation: "set_concentration",
                expected: TYPE_CODE,
                actual: self.type_code(),
            });
        }

        if self.coefficient_names().is_empty() {
            return Err(CalibrationError::SchemaUnavailable {
                instrument_id: self.instrument_id(),
                reason: "no internal calibration targets configured".to_string(),
            });
        }

        let mut values: Vec<f64> = match self.coefficients() {
            Some(current) if current.len() == self.coefficient_names().len() => {
                current.iter().map(|c| c.value).collect()
            }
            _ => vec![0.0; self.coefficient_names().len()],
        };
        if let Some(first) = values.first_mut() {
            *first = concentration;
        }
        self.set_coefficients(&values)
    }
}
