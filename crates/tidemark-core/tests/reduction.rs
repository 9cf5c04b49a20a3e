use polars::prelude::*;

use tidemark_core::reduction::{self, FlagContributor, ReductionError};
use tidemark_core::{
    Calibration, CalibrationKind, Flag, SensorAssignments, SensorType, SensorTypeId,
    SensorsConfiguration, VariableDefinition,
};

fn configuration() -> SensorsConfiguration {
    let types = vec![
        SensorType::new(1, "xCO₂"),
        SensorType::new(2, "Equilibrator Temperature"),
        SensorType::new(3, "Equilibrator Pressure"),
        SensorType::new(4, "Wind Speed"),
    ];
    let pco2 = VariableDefinition {
        id: 1,
        name: "pCO2".to_string(),
        attributes: Default::default(),
        core: Some(SensorTypeId(1)),
        required: vec![SensorTypeId(2), SensorTypeId(3)],
        questionable_cascades: vec![3, -2],
        bad_cascades: vec![4, 3],
    };
    SensorsConfiguration::new(types, vec![pco2]).expect("configuration")
}

fn contributors() -> Vec<FlagContributor<'static>> {
    vec![
        FlagContributor {
            sensor_type: SensorTypeId(1),
            column: "co2_flag",
        },
        FlagContributor {
            sensor_type: SensorTypeId(2),
            column: "eq_temp_flag",
        },
        FlagContributor {
            sensor_type: SensorTypeId(3),
            column: "eq_pressure_flag",
        },
        FlagContributor {
            sensor_type: SensorTypeId(4),
            column: "wind_flag",
        },
    ]
}

#[test]
fn cascade_flags_merges_worst_result_per_row() -> Result<(), ReductionError> {
    let config = configuration();
    let assignments = SensorAssignments::new(&config, [1, 2, 3, 4].map(SensorTypeId))?;
    let variable = config.variable(1)?;

    let df = df![
        "co2_flag" => &[Some(2i32), Some(2), Some(4), Some(2), None],
        "eq_temp_flag" => &[Some(2i32), Some(3), Some(2), Some(2), None],
        "eq_pressure_flag" => &[Some(2i32), Some(4), Some(2), Some(3), None],
        "wind_flag" => &[Some(2i32), Some(4), Some(4), Some(4), Some(4)],
    ]?;

    let output = reduction::cascade_flags(&df, variable, &config, &assignments, &contributors())?;

    let flags = output.column("qc_flag")?.i32()?;
    let sources = output.column("qc_contributors")?.str()?;

    // All good: the core keeps GOOD but every other good contributor,
    // related or not, only attests ASSUMED_GOOD.
    assert_eq!(flags.get(0), Some(Flag::AssumedGood.code()));
    assert_eq!(sources.get(0), Some("eq_temp_flag|eq_pressure_flag|wind_flag"));

    // Questionable temperature and bad pressure both cascade to QUESTIONABLE.
    assert_eq!(flags.get(1), Some(Flag::Questionable.code()));
    assert_eq!(sources.get(1), Some("eq_temp_flag|eq_pressure_flag"));

    // Bad core value dominates.
    assert_eq!(flags.get(2), Some(Flag::Bad.code()));
    assert_eq!(sources.get(2), Some("co2_flag"));

    // Questionable pressure only cascades to ASSUMED_GOOD.
    assert_eq!(flags.get(3), Some(Flag::AssumedGood.code()));

    // Only the unrelated wind sensor is flagged.
    assert_eq!(flags.get(4), None);
    assert_eq!(sources.get(4), None);

    Ok(())
}

#[test]
fn cascade_flags_rejects_unknown_codes() {
    let config = configuration();
    let assignments = SensorAssignments::default();
    let variable = config.variable(1).expect("variable");

    let df = df!["co2_flag" => &[7i32]].expect("df");
    let err = reduction::cascade_flags(
        &df,
        variable,
        &config,
        &assignments,
        &contributors()[..1],
    )
    .expect_err("unknown flag");
    assert!(matches!(err, ReductionError::Flag(_)));
}

#[test]
fn calibrate_column_applies_polynomial() -> Result<(), ReductionError> {
    let mut calibration = Calibration::with_coefficient_names(
        CalibrationKind::SensorCalibration,
        1,
        tidemark_core::calibration::sensor_calibration::coefficient_names(),
    );
    calibration
        .set_coefficients(&[0.0, 0.0, 0.0, 0.0, 2.0, 1.0])
        .expect("coefficients");

    let df = df!["intake_temperature" => &[Some(1.0f64), None, Some(10.5)]]?;
    let output = reduction::calibrate_column(&df, "intake_temperature", &calibration)?;

    let calibrated = output.column("intake_temperature_calibrated")?.f64()?;
    assert_eq!(calibrated.get(0), Some(3.0));
    assert_eq!(calibrated.get(1), None);
    assert_eq!(calibrated.get(2), Some(22.0));

    Ok(())
}
