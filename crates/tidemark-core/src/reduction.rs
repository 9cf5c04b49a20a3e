use polars::prelude::*;
use thiserror::Error;

use crate::calibration::Calibration;
use crate::error::{FlagError, SensorConfigError};
use crate::flag::Flag;
use crate::hierarchy::{DependencyGraph, SensorHierarchy};
use crate::sensors::SensorTypeId;
use crate::variable::Variable;

#[derive(Debug, Error)]
pub enum ReductionError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("invalid flag in input: {0}")]
    Flag(#[from] FlagError),

    #[error("cascade failed: {0}")]
    Config(#[from] SensorConfigError),
}

/// A flag-code column and the sensor type whose flags it holds.
#[derive(Debug, Clone, Copy)]
pub struct FlagContributor<'a> {
    pub sensor_type: SensorTypeId,
    pub column: &'a str,
}

/// Appends `qc_flag` (worst cascaded flag code, null when no contributor
/// bears on `variable`) and `qc_contributors` (`|`-joined flag columns that
/// produced it).
pub fn cascade_flags<H, G>(
    df: &DataFrame,
    variable: &Variable,
    hierarchy: &H,
    graph: &G,
    contributors: &[FlagContributor<'_>],
) -> Result<DataFrame, ReductionError>
where
    H: SensorHierarchy + ?Sized,
    G: DependencyGraph + ?Sized,
{
    let len = df.height();

    let mut flag_columns = Vec::with_capacity(contributors.len());
    for contributor in contributors {
        flag_columns.push(df.column(contributor.column)?.i32()?);
    }

    let mut qc_flags: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut explanations: Vec<Option<String>> = Vec::with_capacity(len);

    for idx in 0..len {
        let mut worst: Option<Flag> = None;
        let mut sources: Vec<&str> = Vec::new();

        for (contributor, codes) in contributors.iter().zip(&flag_columns) {
            let Some(code) = codes.get(idx) else {
                continue;
            };
            let flag = Flag::from_code(code)?;
            let Some(cascaded) = variable.cascade(hierarchy, contributor.sensor_type, flag, graph)?
            else {
                continue;
            };

            match worst {
                Some(current) if current.more_significant_than(cascaded) => {}
                Some(current) if current.equal_significance(cascaded) => {
                    sources.push(contributor.column)
                }
                _ => {
                    worst = Some(cascaded);
                    sources.clear();
                    sources.push(contributor.column);
                }
            }
        }

        qc_flags.push(worst.map(Flag::code));
        explanations.push(worst.map(|_| sources.join("|")));
    }

    let flag_series = Series::new("qc_flag".into(), qc_flags);
    let explanation_series = Series::new(
        "qc_contributors".into(),
        explanations
            .iter()
            .map(|opt| opt.as_deref())
            .collect::<Vec<Option<&str>>>(),
    );

    let mut output = df.clone();
    let mut columns = [flag_series.into(), explanation_series.into()];
    output.hstack_mut(columns.as_mut_slice())?;

    Ok(output)
}

/// Appends `<column>_calibrated`.
pub fn calibrate_column(
    df: &DataFrame,
    column: &str,
    calibration: &Calibration,
) -> Result<DataFrame, ReductionError> {
    let raw = df.column(column)?.f64()?;

    let calibrated: Vec<Option<f64>> = (0..df.height())
        .map(|idx| raw.get(idx).and_then(|value| calibration.calibrate_value(value)))
        .collect();

    let mut output = df.clone();
    let calibrated = Series::new(format!("{column}_calibrated").into(), calibrated);
    output.hstack_mut(&mut [calibrated.into()])?;

    Ok(output)
}
