use std::collections::{btree_map::Entry, BTreeMap};
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SensorConfigError;
use crate::variable::{Variable, VariableDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorTypeId(pub i64);

impl fmt::Display for SensorTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const LONGITUDE_ID: SensorTypeId = SensorTypeId(-1001);
pub const LATITUDE_ID: SensorTypeId = SensorTypeId(-1002);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorType {
    pub id: SensorTypeId,
    pub name: String,
    #[serde(default)]
    pub parent: Option<SensorTypeId>,
    /// Sensor type whose value this one is derived from.
    #[serde(default)]
    pub depends_on: Option<SensorTypeId>,
    #[serde(default, rename = "internal_calibration")]
    pub has_internal_calibration: bool,
    #[serde(default, rename = "diagnostic")]
    pub is_diagnostic: bool,
}

impl SensorType {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: SensorTypeId(id),
            name: name.into(),
            parent: None,
            depends_on: None,
            has_internal_calibration: false,
            is_diagnostic: false,
        }
    }

    pub fn with_parent(mut self, parent: i64) -> Self {
        self.parent = Some(SensorTypeId(parent));
        self
    }

    pub fn with_depends_on(mut self, depends_on: i64) -> Self {
        self.depends_on = Some(SensorTypeId(depends_on));
        self
    }

    pub fn with_internal_calibration(mut self) -> Self {
        self.has_internal_calibration = true;
        self
    }

    pub fn diagnostic(mut self) -> Self {
        self.is_diagnostic = true;
        self
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_position(&self) -> bool {
        is_position(self.id)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

static POSITION_SENSOR_TYPES: Lazy<Vec<SensorType>> = Lazy::new(|| {
    vec![
        SensorType::new(LONGITUDE_ID.0, "Longitude"),
        SensorType::new(LATITUDE_ID.0, "Latitude"),
    ]
});

pub fn position_sensor_types() -> &'static [SensorType] {
    POSITION_SENSOR_TYPES.as_slice()
}

pub fn is_position(id: SensorTypeId) -> bool {
    id == LONGITUDE_ID || id == LATITUDE_ID
}

/// Process-wide sensor type and variable catalog.
///
/// Built once at startup and read-only afterwards; share it by reference
/// (or behind an `Arc`) with whatever needs it.
#[derive(Debug, Clone)]
pub struct SensorsConfiguration {
    sensor_types: BTreeMap<SensorTypeId, SensorType>,
    variables: BTreeMap<i64, Variable>,
}

impl SensorsConfiguration {
    pub fn new(
        sensor_types: Vec<SensorType>,
        variables: Vec<VariableDefinition>,
    ) -> Result<Self, SensorConfigError> {
        let mut types = BTreeMap::new();
        for sensor_type in position_sensor_types().iter().cloned().chain(sensor_types) {
            match types.entry(sensor_type.id) {
                Entry::Occupied(_) => {
                    return Err(SensorConfigError::DuplicateSensorType(sensor_type.id))
                }
                Entry::Vacant(slot) => {
                    slot.insert(sensor_type);
                }
            }
        }

        for sensor_type in types.values() {
            if let Some(parent) = sensor_type.parent {
                if !types.contains_key(&parent) {
                    return Err(SensorConfigError::UnknownParent {
                        child: sensor_type.id,
                        parent,
                    });
                }
            }
            if let Some(depends_on) = sensor_type.depends_on {
                if !types.contains_key(&depends_on) {
                    return Err(SensorConfigError::UnknownDependency {
                        sensor_type: sensor_type.id,
                        depends_on,
                    });
                }
            }
        }

        let mut config = Self {
            sensor_types: types,
            variables: BTreeMap::new(),
        };

        let mut built = BTreeMap::new();
        for definition in variables {
            let variable = Variable::new(&config, definition)?;
            if built.contains_key(&variable.id()) {
                return Err(SensorConfigError::DuplicateVariable(variable.id()));
            }
            built.insert(variable.id(), variable);
        }
        config.variables = built;

        info!(
            sensor_types = config.sensor_types.len(),
            variables = config.variables.len(),
            "sensors configuration loaded"
        );

        Ok(config)
    }

    pub fn sensor_type(&self, id: SensorTypeId) -> Result<&SensorType, SensorConfigError> {
        self.sensor_types
            .get(&id)
            .ok_or(SensorConfigError::SensorTypeNotFound(id))
    }

    pub fn get(&self, id: SensorTypeId) -> Option<&SensorType> {
        self.sensor_types.get(&id)
    }

    pub fn sensor_type_by_name(&self, name: &str) -> Option<&SensorType> {
        self.sensor_types.values().find(|t| t.name == name)
    }

    pub fn sensor_types(&self) -> impl Iterator<Item = &SensorType> {
        self.sensor_types.values()
    }

    pub fn parent_of(&self, id: SensorTypeId) -> Option<&SensorType> {
        self.sensor_types
            .get(&id)
            .and_then(|t| t.parent)
            .and_then(|parent| self.sensor_types.get(&parent))
    }

    pub fn children_of(&self, id: SensorTypeId) -> Vec<&SensorType> {
        self.sensor_types
            .values()
            .filter(|t| t.parent == Some(id))
            .collect()
    }

    pub fn variable(&self, id: i64) -> Result<&Variable, SensorConfigError> {
        self.variables
            .get(&id)
            .ok_or(SensorConfigError::VariableNotFound(id))
    }

    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.variables.values().find(|v| v.name() == name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }
}
