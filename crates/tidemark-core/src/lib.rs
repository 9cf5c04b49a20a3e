pub mod calibration;
pub mod cascade;
pub mod error;
pub mod flag;
pub mod hierarchy;
pub mod instrument;
pub mod manifest;
pub mod reduction;
pub mod sensors;
pub mod variable;

pub use calibration::{
    Calibration, CalibrationCoefficient, CalibrationKind, CalibrationRecord, CalibrationTargets,
};
pub use error::{CalibrationError, FlagError, SensorConfigError};
pub use flag::Flag;
pub use hierarchy::{DependencyGraph, SensorHierarchy};
pub use instrument::{Instrument, InstrumentCatalog, InstrumentDefinition, SensorAssignments};
pub use manifest::LoadedConfiguration;
pub use sensors::{SensorType, SensorTypeId, SensorsConfiguration, LATITUDE_ID, LONGITUDE_ID};
pub use variable::{Variable, VariableDefinition};
