//! Calibration deployments and their coefficients.
//!
//! All calibration kinds share one record shape, distinguished by a type
//! code. Ordering compares instrument, type and target in that order;
//! equality is by database id, so unsaved calibrations never compare equal.

pub mod external_standard;
pub mod sensor_calibration;

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CalibrationError;

/// Supplies the internal-calibration targets currently configured for an
/// instrument.
pub trait CalibrationTargets {
    fn internal_calibration_targets(
        &self,
        instrument_id: i64,
    ) -> Result<Vec<String>, CalibrationError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCoefficient {
    pub name: String,
    pub value: f64,
}

impl CalibrationCoefficient {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn zero(name: impl Into<String>) -> Self {
        Self::new(name, 0.0)
    }
}

impl fmt::Display for CalibrationCoefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalibrationKind {
    ExternalStandard,
    SensorCalibration,
}

impl CalibrationKind {
    pub fn type_code(self) -> &'static str {
        match self {
            CalibrationKind::ExternalStandard => external_standard::TYPE_CODE,
            CalibrationKind::SensorCalibration => sensor_calibration::TYPE_CODE,
        }
    }

    pub fn from_type_code(code: &str) -> Result<Self, CalibrationError> {
        match code {
            external_standard::TYPE_CODE => Ok(CalibrationKind::ExternalStandard),
            sensor_calibration::TYPE_CODE => Ok(CalibrationKind::SensorCalibration),
            other => Err(CalibrationError::UnknownType(other.to_string())),
        }
    }

    /// Coefficient names in force for this kind on `instrument_id`.
    pub fn coefficient_names<T>(
        self,
        instrument_id: i64,
        targets: &T,
    ) -> Result<Vec<String>, CalibrationError>
    where
        T: CalibrationTargets + ?Sized,
    {
        match self {
            CalibrationKind::ExternalStandard => {
                external_standard::coefficient_names(instrument_id, targets)
            }
            CalibrationKind::SensorCalibration => Ok(sensor_calibration::coefficient_names()),
        }
    }

    pub fn coefficients_valid(self, coefficients: &[CalibrationCoefficient]) -> bool {
        match self {
            CalibrationKind::ExternalStandard => {
                external_standard::coefficients_valid(coefficients)
            }
            CalibrationKind::SensorCalibration => true,
        }
    }

    pub fn editable_coefficients(
        self,
        coefficients: &[CalibrationCoefficient],
    ) -> &[CalibrationCoefficient] {
        match self {
            CalibrationKind::ExternalStandard => external_standard::editable(coefficients),
            CalibrationKind::SensorCalibration => coefficients,
        }
    }

    pub fn calibrate(
        self,
        coefficients: Option<&[CalibrationCoefficient]>,
        raw: f64,
    ) -> Option<f64> {
        match self {
            CalibrationKind::ExternalStandard => Some(raw),
            CalibrationKind::SensorCalibration => {
                coefficients.map(|c| sensor_calibration::apply_polynomial(c, raw))
            }
        }
    }
}

impl fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_code())
    }
}

/// A calibration as held by the calibration store.
#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub instrument_id: i64,
    #[serde(rename = "type")]
    pub calibration_type: String,
    #[serde(default)]
    pub target: Option<String>,
    pub deployment_date: NaiveDateTime,
    #[serde(default)]
    pub coefficients: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Calibration {
    id: Option<i64>,
    instrument_id: i64,
    kind: CalibrationKind,
    target: Option<String>,
    deployment_date: Option<NaiveDateTime>,
    coefficient_names: Vec<String>,
    coefficients: Option<Vec<CalibrationCoefficient>>,
}

/// Midnight UTC today.
pub fn default_deployment_date() -> NaiveDateTime {
    Utc::now().date_naive().and_time(NaiveTime::MIN)
}

impl Calibration {
    /// Empty, unsaved calibration. The coefficient schema is resolved from
    /// `targets` now; an unresolvable schema leaves it empty.
    pub fn new<T>(kind: CalibrationKind, instrument_id: i64, targets: &T) -> Self
    where
        T: CalibrationTargets + ?Sized,
    {
        let names = resolve_names(kind, instrument_id, targets);
        Self::with_coefficient_names(kind, instrument_id, names)
    }

    /// Empty, unsaved calibration using an already resolved schema.
    pub fn with_coefficient_names(
        kind: CalibrationKind,
        instrument_id: i64,
        coefficient_names: Vec<String>,
    ) -> Self {
        Self {
            id: None,
            instrument_id,
            kind,
            target: None,
            deployment_date: Some(default_deployment_date()),
            coefficient_names,
            coefficients: None,
        }
    }

    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Rebuild a stored calibration. Fails if the stored values do not
    /// match the current schema or do not validate.
    pub fn from_record<T>(record: CalibrationRecord, targets: &T) -> Result<Self, CalibrationError>
    where
        T: CalibrationTargets + ?Sized,
    {
        let kind = CalibrationKind::from_type_code(&record.calibration_type)?;
        let mut calibration = Self::new(kind, record.instrument_id, targets);
        calibration.id = record.id;
        calibration.target = record.target;

        if calibration.target.is_some() {
            calibration.set_deployment_date(record.deployment_date);
            calibration.set_coefficients(&record.coefficients)?;
            if !calibration.validate() {
                return Err(CalibrationError::InvalidDeployment {
                    id: calibration.id,
                    instrument_id: calibration.instrument_id,
                    reason: "Calibration deployment is invalid".to_string(),
                });
            }
        }

        Ok(calibration)
    }

    /// Re-resolve the coefficient schema after the instrument configuration
    /// has changed. Existing coefficients are kept only if they still fit.
    /// If the schema cannot be resolved the current state is left as is.
    pub fn refresh_coefficient_names<T>(&mut self, targets: &T)
    where
        T: CalibrationTargets + ?Sized,
    {
        let names = match self.kind.coefficient_names(self.instrument_id, targets) {
            Ok(names) => names,
            Err(err) => {
                warn!(
                    instrument_id = self.instrument_id,
                    calibration_type = self.type_code(),
                    error = %err,
                    "coefficient names unavailable; keeping current schema"
                );
                return;
            }
        };

        let still_fits = self
            .coefficients
            .as_ref()
            .is_some_and(|current| current.len() == names.len());

        self.coefficients = if still_fits {
            self.coefficients.take().map(|current| {
                names
                    .iter()
                    .zip(current)
                    .map(|(name, c)| CalibrationCoefficient::new(name.clone(), c.value))
                    .collect()
            })
        } else {
            None
        };
        self.coefficient_names = names;
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn instrument_id(&self) -> i64 {
        self.instrument_id
    }

    pub fn kind(&self) -> CalibrationKind {
        self.kind
    }

    pub fn type_code(&self) -> &'static str {
        self.kind.type_code()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = Some(target.into());
    }

    pub fn deployment_date(&self) -> Option<NaiveDateTime> {
        self.deployment_date
    }

    /// Setting the date initialises the coefficients to zero if they have
    /// never been set.
    pub fn set_deployment_date(&mut self, deployment_date: NaiveDateTime) {
        self.deployment_date = Some(deployment_date);
        if self.coefficients.is_none() {
            self.initialise_coefficients();
        }
    }

    pub fn clear_deployment_date(&mut self) {
        self.deployment_date = None;
    }

    /// Empty when the schema could not be resolved.
    pub fn coefficient_names(&self) -> &[String] {
        &self.coefficient_names
    }

    pub fn coefficients(&self) -> Option<&[CalibrationCoefficient]> {
        self.coefficients.as_deref()
    }

    /// Coefficients, zero-initialised first if they were never set.
    pub fn ensure_coefficients(&mut self) -> &[CalibrationCoefficient] {
        if self.coefficients.as_ref().map_or(true, Vec::is_empty) {
            self.initialise_coefficients();
        }
        self.coefficients.as_deref().unwrap_or_default()
    }

    pub fn set_coefficients(&mut self, values: &[f64]) -> Result<(), CalibrationError> {
        if values.len() != self.coefficient_names.len() {
            return Err(CalibrationError::CoefficientCount {
                expected: self.coefficient_names.len(),
                actual: values.len(),
            });
        }

        self.coefficients = Some(
            self.coefficient_names
                .iter()
                .zip(values)
                .map(|(name, &value)| CalibrationCoefficient::new(name.clone(), value))
                .collect(),
        );
        Ok(())
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.coefficients
            .as_deref()?
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value)
    }

    pub fn editable_coefficients(&self) -> &[CalibrationCoefficient] {
        self.kind
            .editable_coefficients(self.coefficients.as_deref().unwrap_or_default())
    }

    pub fn coefficients_valid(&self) -> bool {
        self.coefficients
            .as_deref()
            .map_or(true, |c| self.kind.coefficients_valid(c))
    }

    pub fn validate(&self) -> bool {
        self.deployment_date.is_some() && self.coefficients.is_some() && self.coefficients_valid()
    }

    pub fn calibrate_value(&self, raw: f64) -> Option<f64> {
        self.kind.calibrate(self.coefficients.as_deref(), raw)
    }

    pub fn human_readable_coefficients(&self) -> String {
        if self.deployment_date.is_none() || self.coefficients.is_none() {
            return "Not set".to_string();
        }

        self.editable_coefficients()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Coefficient values joined with `;`; zeros for every schema name when
    /// the coefficients were never set.
    pub fn coefficients_as_delimited_list(&self) -> String {
        match &self.coefficients {
            Some(coefficients) => coefficients
                .iter()
                .map(|c| c.value.to_string())
                .collect::<Vec<_>>()
                .join(";"),
            None => vec!["0"; self.coefficient_names.len()].join(";"),
        }
    }

    pub fn cmp_by_target(&self, other: &Calibration) -> Ordering {
        self.instrument_id
            .cmp(&other.instrument_id)
            .then_with(|| self.type_code().cmp(other.type_code()))
            .then_with(|| self.target.cmp(&other.target))
    }

    /// No-op without a schema, so the calibration still reads "Not set".
    fn initialise_coefficients(&mut self) {
        if self.coefficient_names.is_empty() {
            return;
        }
        self.coefficients = Some(
            self.coefficient_names
                .iter()
                .map(CalibrationCoefficient::zero)
                .collect(),
        );
    }
}

impl PartialEq for Calibration {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.map_or_else(|| "new".to_string(), |id| id.to_string());
        write!(
            f,
            "{};{};{}",
            id,
            self.type_code(),
            self.target.as_deref().unwrap_or("")
        )
    }
}

fn resolve_names<T>(kind: CalibrationKind, instrument_id: i64, targets: &T) -> Vec<String>
where
    T: CalibrationTargets + ?Sized,
{
    match kind.coefficient_names(instrument_id, targets) {
        Ok(names) => names,
        Err(err) => {
            warn!(
                instrument_id,
                calibration_type = kind.type_code(),
                error = %err,
                "coefficient names unavailable; calibration is read-only"
            );
            Vec::new()
        }
    }
}
