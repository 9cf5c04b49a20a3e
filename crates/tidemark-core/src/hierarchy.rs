//! Read-only lookups the cascade engine needs from the wider configuration.

use std::collections::{BTreeMap, BTreeSet};

use crate::sensors::{SensorTypeId, SensorsConfiguration};

pub trait SensorHierarchy {
    fn parent(&self, sensor_type: SensorTypeId) -> Option<SensorTypeId>;
}

/// Sensors whose derivation consumes another sensor's value.
pub trait DependencyGraph {
    fn dependents(&self, sensor_type: SensorTypeId) -> BTreeSet<SensorTypeId>;
}

impl SensorHierarchy for SensorsConfiguration {
    fn parent(&self, sensor_type: SensorTypeId) -> Option<SensorTypeId> {
        self.parent_of(sensor_type).map(|parent| parent.id)
    }
}

impl DependencyGraph for BTreeMap<SensorTypeId, BTreeSet<SensorTypeId>> {
    fn dependents(&self, sensor_type: SensorTypeId) -> BTreeSet<SensorTypeId> {
        self.get(&sensor_type).cloned().unwrap_or_default()
    }
}
