//! Flag cascading from contributing sensors onto a calculated variable.

use std::collections::HashMap;

use tracing::debug;

use crate::error::SensorConfigError;
use crate::flag::Flag;
use crate::hierarchy::{DependencyGraph, SensorHierarchy};
use crate::sensors::{is_position, SensorTypeId};
use crate::variable::Variable;

impl Variable {
    /// Flag the calculated value should inherit when `sensor_type` carries
    /// `flag`.
    ///
    /// `Ok(None)` means the sensor type has no bearing on this variable and
    /// no flag should be applied. Errors only when the dependency graph
    /// contains a cycle.
    pub fn cascade<H, G>(
        &self,
        hierarchy: &H,
        sensor_type: SensorTypeId,
        flag: Flag,
        graph: &G,
    ) -> Result<Option<Flag>, SensorConfigError>
    where
        H: SensorHierarchy + ?Sized,
        G: DependencyGraph + ?Sized,
    {
        let mut path = Vec::new();
        self.resolve_cascade(hierarchy, graph, sensor_type, flag, &mut path)
    }

    /// Cascade every `(sensor type, flag)` contribution and keep the most
    /// significant result.
    pub fn merged_cascade<H, G>(
        &self,
        hierarchy: &H,
        contributions: &[(SensorTypeId, Flag)],
        graph: &G,
    ) -> Result<Option<Flag>, SensorConfigError>
    where
        H: SensorHierarchy + ?Sized,
        G: DependencyGraph + ?Sized,
    {
        let mut cascaded = Vec::with_capacity(contributions.len());
        for &(sensor_type, flag) in contributions {
            if let Some(result) = self.cascade(hierarchy, sensor_type, flag, graph)? {
                cascaded.push(result);
            }
        }
        Ok(Flag::most_significant(cascaded))
    }

    fn resolve_cascade<H, G>(
        &self,
        hierarchy: &H,
        graph: &G,
        sensor_type: SensorTypeId,
        flag: Flag,
        path: &mut Vec<SensorTypeId>,
    ) -> Result<Option<Flag>, SensorConfigError>
    where
        H: SensorHierarchy + ?Sized,
        G: DependencyGraph + ?Sized,
    {
        if self.core_sensor_type() == Some(sensor_type) || is_position(sensor_type) {
            return Ok(Some(flag));
        }

        let direct = match flag {
            Flag::Good | Flag::AssumedGood => Some(Flag::AssumedGood),
            Flag::Questionable => {
                configured_cascade(&self.questionable_cascades, hierarchy, sensor_type)
            }
            Flag::Bad => configured_cascade(&self.bad_cascades, hierarchy, sensor_type),
            other => Some(other),
        };

        if direct.is_some() {
            return Ok(direct);
        }

        // Not core, position, required or a required type's child: look for
        // the sensors that are derived from this one.
        if path.contains(&sensor_type) {
            let mut cycle = path.clone();
            cycle.push(sensor_type);
            return Err(SensorConfigError::DependencyCycle { path: cycle });
        }

        let dependents = graph.dependents(sensor_type);
        path.push(sensor_type);

        let mut result: Option<Flag> = None;
        for &dependent in &dependents {
            if let Some(cascaded) = self.resolve_cascade(hierarchy, graph, dependent, flag, path)? {
                if result.map_or(true, |worst| cascaded.more_significant_than(worst)) {
                    result = Some(cascaded);
                }
            }
        }

        path.pop();

        if result.is_none() {
            debug!(
                variable = self.name(),
                sensor_type = sensor_type.0,
                dependents = dependents.len(),
                "sensor type has no bearing on variable"
            );
        }

        Ok(result)
    }
}

/// Direct lookup, falling back to the parent type (one level only).
fn configured_cascade<H>(
    cascades: &HashMap<SensorTypeId, Flag>,
    hierarchy: &H,
    sensor_type: SensorTypeId,
) -> Option<Flag>
where
    H: SensorHierarchy + ?Sized,
{
    cascades.get(&sensor_type).copied().or_else(|| {
        hierarchy
            .parent(sensor_type)
            .and_then(|parent| cascades.get(&parent).copied())
    })
}
