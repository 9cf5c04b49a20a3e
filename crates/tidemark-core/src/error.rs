// crates/tidemark-core/src/error.rs

use thiserror::Error;

use crate::sensors::SensorTypeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    #[error("unrecognised flag code {0}")]
    UnknownCode(i32),
}

/// Problems in the sensor/variable configuration. These are fatal at load time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorConfigError {
    #[error("sensor type {0} not found")]
    SensorTypeNotFound(SensorTypeId),

    #[error("sensor type {child} refers to unknown parent {parent}")]
    UnknownParent {
        child: SensorTypeId,
        parent: SensorTypeId,
    },

    #[error("sensor type {sensor_type} depends on unknown sensor type {depends_on}")]
    UnknownDependency {
        sensor_type: SensorTypeId,
        depends_on: SensorTypeId,
    },

    #[error("duplicate sensor type id {0}")]
    DuplicateSensorType(SensorTypeId),

    #[error("variable {variable}: core sensor type cannot be a child (ID {sensor_type})")]
    ChildCoreSensorType {
        variable: String,
        sensor_type: SensorTypeId,
    },

    #[error("variable {variable}: sensor type {sensor_type} is required more than once")]
    DuplicateRequiredSensorType {
        variable: String,
        sensor_type: SensorTypeId,
    },

    #[error("variable {variable}: required sensor type cannot be a child (ID {sensor_type})")]
    ChildRequiredSensorType {
        variable: String,
        sensor_type: SensorTypeId,
    },

    #[error("variable {variable}: {cascades} {kind} cascades for {required} required sensors")]
    CascadeLengthMismatch {
        variable: String,
        kind: &'static str,
        cascades: usize,
        required: usize,
    },

    #[error("variable {variable}: invalid cascade flag: {source}")]
    InvalidCascadeFlag {
        variable: String,
        #[source]
        source: FlagError,
    },

    #[error("duplicate variable id {0}")]
    DuplicateVariable(i64),

    #[error("variable {0} not found")]
    VariableNotFound(i64),

    #[error("duplicate instrument id {0}")]
    DuplicateInstrument(i64),

    #[error("instrument {0} not found")]
    InstrumentNotFound(i64),

    #[error("sensor dependency cycle detected: {path:?}")]
    DependencyCycle { path: Vec<SensorTypeId> },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Incorrect number of coefficients: expected {expected}, got {actual}")]
    CoefficientCount { expected: usize, actual: usize },

    #[error("unknown calibration type {0}")]
    UnknownType(String),

    #[error("calibration {id:?} for instrument {instrument_id} is invalid: {reason}")]
    InvalidDeployment {
        id: Option<i64>,
        instrument_id: i64,
        reason: String,
    },

    #[error("{operation} requires a {expected} calibration, found {actual}")]
    KindMismatch {
        operation: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("coefficient names for instrument {instrument_id} could not be resolved: {reason}")]
    SchemaUnavailable { instrument_id: i64, reason: String },
}
