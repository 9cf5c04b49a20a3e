use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::calibration::{Calibration, CalibrationRecord, CalibrationTargets};
use crate::instrument::{InstrumentCatalog, InstrumentDefinition};
use crate::sensors::{SensorType, SensorsConfiguration};
use crate::variable::VariableDefinition;

#[derive(Debug, Default, Deserialize)]
pub struct SensorManifest {
    #[serde(default)]
    pub sensor_types: Vec<SensorType>,
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
    #[serde(default)]
    pub instruments: Vec<InstrumentDefinition>,
}

impl SensorManifest {
    pub fn is_empty(&self) -> bool {
        self.sensor_types.is_empty() && self.variables.is_empty() && self.instruments.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CalibrationManifest {
    #[serde(default)]
    pub calibrations: Vec<CalibrationRecord>,
}

/// Sensor configuration and instruments, validated and frozen.
#[derive(Debug, Clone)]
pub struct LoadedConfiguration {
    pub sensors: SensorsConfiguration,
    pub instruments: InstrumentCatalog,
}

impl LoadedConfiguration {
    pub fn from_manifest(manifest: SensorManifest) -> Result<Self> {
        ensure!(!manifest.is_empty(), "sensor manifest does not define anything");

        let sensors = SensorsConfiguration::new(manifest.sensor_types, manifest.variables)
            .context("invalid sensor configuration")?;
        let instruments = InstrumentCatalog::new(&sensors, manifest.instruments)
            .context("invalid instrument configuration")?;

        Ok(Self {
            sensors,
            instruments,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Self::from_manifest(parse_manifest(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_manifest(load_manifest(path)?)
    }
}

pub fn parse_manifest(text: &str) -> Result<SensorManifest> {
    toml::from_str(text).context("failed to parse sensor manifest TOML")
}

pub fn load_manifest(path: &Path) -> Result<SensorManifest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read sensor manifest {}", path.display()))?;
    parse_manifest(&text).with_context(|| format!("in {}", path.display()))
}

pub fn parse_calibrations(text: &str) -> Result<Vec<CalibrationRecord>> {
    let manifest: CalibrationManifest =
        toml::from_str(text).context("failed to parse calibrations TOML")?;
    Ok(manifest.calibrations)
}

pub fn load_calibrations(path: &Path) -> Result<Vec<CalibrationRecord>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read calibrations {}", path.display()))?;
    parse_calibrations(&text).with_context(|| format!("in {}", path.display()))
}

/// Build every record, keeping the per-record outcome.
pub fn build_calibrations<T>(
    records: Vec<CalibrationRecord>,
    targets: &T,
) -> Vec<(CalibrationRecord, Result<Calibration>)>
where
    T: CalibrationTargets + ?Sized,
{
    records
        .into_iter()
        .map(|record| {
            let built = Calibration::from_record(record.clone(), targets).with_context(|| {
                format!(
                    "calibration {} for instrument {}",
                    record.target.as_deref().unwrap_or("<untargeted>"),
                    record.instrument_id
                )
            });
            (record, built)
        })
        .collect()
}
