use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Deserialize;

use crate::error::SensorConfigError;
use crate::flag::Flag;
use crate::sensors::{SensorTypeId, SensorsConfiguration, LATITUDE_ID, LONGITUDE_ID};

/// Raw variable entry as it appears in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VariableDefinition {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub core: Option<SensorTypeId>,
    #[serde(default)]
    pub required: Vec<SensorTypeId>,
    #[serde(default)]
    pub questionable_cascades: Vec<i32>,
    #[serde(default)]
    pub bad_cascades: Vec<i32>,
}

/// A calculated quantity and the sensors needed to reduce it.
///
/// `core` measures the variable itself; `required` are the additional
/// sensors used during data reduction. Sensors the core/required types
/// depend on are not listed here and are resolved through sensor
/// assignments when cascading flags.
#[derive(Debug, Clone)]
pub struct Variable {
    id: i64,
    name: String,
    attributes: BTreeMap<String, String>,
    core: Option<SensorTypeId>,
    required: Vec<SensorTypeId>,
    pub(crate) questionable_cascades: HashMap<SensorTypeId, Flag>,
    pub(crate) bad_cascades: HashMap<SensorTypeId, Flag>,
    internal_calibrations: BTreeSet<String>,
}

impl Variable {
    pub fn new(
        config: &SensorsConfiguration,
        definition: VariableDefinition,
    ) -> Result<Self, SensorConfigError> {
        let VariableDefinition {
            id,
            name,
            attributes,
            core,
            required,
            questionable_cascades,
            bad_cascades,
        } = definition;

        if let Some(core_id) = core {
            if config.sensor_type(core_id)?.has_parent() {
                return Err(SensorConfigError::ChildCoreSensorType {
                    variable: name,
                    sensor_type: core_id,
                });
            }
        }

        if questionable_cascades.len() != required.len() {
            return Err(SensorConfigError::CascadeLengthMismatch {
                variable: name,
                kind: "questionable",
                cascades: questionable_cascades.len(),
                required: required.len(),
            });
        }

        if bad_cascades.len() != required.len() {
            return Err(SensorConfigError::CascadeLengthMismatch {
                variable: name,
                kind: "bad",
                cascades: bad_cascades.len(),
                required: required.len(),
            });
        }

        let mut questionable = HashMap::with_capacity(required.len());
        let mut bad = HashMap::with_capacity(required.len());
        let mut internal_calibrations = BTreeSet::new();

        for ((&sensor_id, &questionable_code), &bad_code) in required
            .iter()
            .zip(&questionable_cascades)
            .zip(&bad_cascades)
        {
            if questionable.contains_key(&sensor_id) {
                return Err(SensorConfigError::DuplicateRequiredSensorType {
                    variable: name,
                    sensor_type: sensor_id,
                });
            }

            let sensor_type = config.sensor_type(sensor_id)?;
            if sensor_type.has_parent() {
                return Err(SensorConfigError::ChildRequiredSensorType {
                    variable: name,
                    sensor_type: sensor_id,
                });
            }

            let to_flag = |code: i32| {
                Flag::from_code(code).map_err(|source| SensorConfigError::InvalidCascadeFlag {
                    variable: name.clone(),
                    source,
                })
            };
            questionable.insert(sensor_id, to_flag(questionable_code)?);
            bad.insert(sensor_id, to_flag(bad_code)?);

            if sensor_type.has_internal_calibration {
                internal_calibrations.insert(sensor_type.name.clone());
            }
        }

        if let Some(core_id) = core {
            let core_type = config.sensor_type(core_id)?;
            if core_type.has_internal_calibration {
                internal_calibrations.insert(core_type.name.clone());
            }
        }

        Ok(Self {
            id,
            name,
            attributes,
            core,
            required,
            questionable_cascades: questionable,
            bad_cascades: bad,
            internal_calibrations,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn core_sensor_type(&self) -> Option<SensorTypeId> {
        self.core
    }

    pub fn required_sensor_types(&self) -> &[SensorTypeId] {
        &self.required
    }

    pub fn questionable_cascade(&self, sensor_type: SensorTypeId) -> Option<Flag> {
        self.questionable_cascades.get(&sensor_type).copied()
    }

    pub fn bad_cascade(&self, sensor_type: SensorTypeId) -> Option<Flag> {
        self.bad_cascades.get(&sensor_type).copied()
    }

    /// Required types, then the core type, then (optionally) the two
    /// position types.
    pub fn all_sensor_types(&self, include_position: bool) -> Vec<SensorTypeId> {
        let mut result = self.required.clone();
        result.extend(self.core);
        if include_position {
            result.push(LONGITUDE_ID);
            result.push(LATITUDE_ID);
        }
        result
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn has_internal_calibrations(&self) -> bool {
        !self.internal_calibrations.is_empty()
    }

    /// Names of the contributing sensor types that are calibrated against
    /// internal standards, sorted by name.
    pub fn internal_calibrations(&self) -> &BTreeSet<String> {
        &self.internal_calibrations
    }

    pub fn ids(variables: &[Variable]) -> Vec<i64> {
        variables.iter().map(Variable::id).collect()
    }

    pub fn sensor_type_required(variables: &[Variable], sensor_type: SensorTypeId) -> bool {
        variables.iter().any(|v| v.required.contains(&sensor_type))
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
