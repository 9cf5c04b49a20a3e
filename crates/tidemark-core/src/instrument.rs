use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use tracing::info;

use crate::calibration::CalibrationTargets;
use crate::error::{CalibrationError, SensorConfigError};
use crate::hierarchy::DependencyGraph;
use crate::sensors::{SensorTypeId, SensorsConfiguration};
use crate::variable::Variable;

/// Sensor types actually fitted to one instrument.
#[derive(Debug, Clone, Default)]
pub struct SensorAssignments {
    assigned: BTreeSet<SensorTypeId>,
    dependents: BTreeMap<SensorTypeId, BTreeSet<SensorTypeId>>,
}

impl SensorAssignments {
    pub fn new<I>(config: &SensorsConfiguration, assigned: I) -> Result<Self, SensorConfigError>
    where
        I: IntoIterator<Item = SensorTypeId>,
    {
        let mut result = Self::default();
        for id in assigned {
            let sensor_type = config.sensor_type(id)?;
            if let Some(depends_on) = sensor_type.depends_on {
                result.dependents.entry(depends_on).or_default().insert(id);
            }
            result.assigned.insert(id);
        }
        Ok(result)
    }

    pub fn is_assigned(&self, sensor_type: SensorTypeId) -> bool {
        self.assigned.contains(&sensor_type)
    }

    pub fn assigned(&self) -> impl Iterator<Item = SensorTypeId> + '_ {
        self.assigned.iter().copied()
    }
}

impl DependencyGraph for SensorAssignments {
    fn dependents(&self, sensor_type: SensorTypeId) -> BTreeSet<SensorTypeId> {
        self.dependents
            .get(&sensor_type)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentDefinition {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<i64>,
    #[serde(default)]
    pub sensors: Vec<SensorTypeId>,
}

#[derive(Debug, Clone)]
pub struct Instrument {
    id: i64,
    name: String,
    variables: Vec<i64>,
    assignments: SensorAssignments,
    internal_calibrations: BTreeSet<String>,
}

impl Instrument {
    pub fn new(
        config: &SensorsConfiguration,
        definition: InstrumentDefinition,
    ) -> Result<Self, SensorConfigError> {
        for &variable_id in &definition.variables {
            config.variable(variable_id)?;
        }

        let assignments = SensorAssignments::new(config, definition.sensors)?;

        let mut internal_calibrations = BTreeSet::new();
        for id in assignments.assigned() {
            let sensor_type = config.sensor_type(id)?;
            if sensor_type.has_internal_calibration {
                internal_calibrations.insert(sensor_type.name.clone());
            }
        }

        Ok(Self {
            id: definition.id,
            name: definition.name,
            variables: definition.variables,
            assignments,
            internal_calibrations,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable_ids(&self) -> &[i64] {
        &self.variables
    }

    pub fn variables<'a>(
        &self,
        config: &'a SensorsConfiguration,
    ) -> Result<Vec<&'a Variable>, SensorConfigError> {
        self.variables.iter().map(|&id| config.variable(id)).collect()
    }

    pub fn assignments(&self) -> &SensorAssignments {
        &self.assignments
    }

    pub fn has_internal_calibrations(&self) -> bool {
        !self.internal_calibrations.is_empty()
    }

    /// Names of the assigned sensor types calibrated against internal
    /// standards, sorted by name.
    pub fn internal_calibrations(&self) -> &BTreeSet<String> {
        &self.internal_calibrations
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalog {
    instruments: BTreeMap<i64, Instrument>,
}

impl InstrumentCatalog {
    pub fn new(
        config: &SensorsConfiguration,
        definitions: Vec<InstrumentDefinition>,
    ) -> Result<Self, SensorConfigError> {
        let mut instruments = BTreeMap::new();
        for definition in definitions {
            let instrument = Instrument::new(config, definition)?;
            if instruments.contains_key(&instrument.id()) {
                return Err(SensorConfigError::DuplicateInstrument(instrument.id()));
            }
            instruments.insert(instrument.id(), instrument);
        }
        info!(instruments = instruments.len(), "instrument catalog loaded");
        Ok(Self { instruments })
    }

    pub fn instrument(&self, id: i64) -> Result<&Instrument, SensorConfigError> {
        self.instruments
            .get(&id)
            .ok_or(SensorConfigError::InstrumentNotFound(id))
    }

    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }
}

impl CalibrationTargets for InstrumentCatalog {
    fn internal_calibration_targets(
        &self,
        instrument_id: i64,
    ) -> Result<Vec<String>, CalibrationError> {
        self.instrument(instrument_id)
            .map(|instrument| instrument.internal_calibrations().iter().cloned().collect())
            .map_err(|err| CalibrationError::SchemaUnavailable {
                instrument_id,
                reason: err.to_string(),
            })
    }
}
