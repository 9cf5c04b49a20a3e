use std::collections::{BTreeMap, BTreeSet};

use tidemark_core::{
    Flag, SensorAssignments, SensorConfigError, SensorType, SensorTypeId, SensorsConfiguration,
    Variable, VariableDefinition, LATITUDE_ID, LONGITUDE_ID,
};

const CO2: SensorTypeId = SensorTypeId(1);
const EQ_TEMP: SensorTypeId = SensorTypeId(2);
const EQ_PRESSURE: SensorTypeId = SensorTypeId(3);
const EQ_PRESSURE_ABS: SensorTypeId = SensorTypeId(4);
const AMBIENT_PRESSURE: SensorTypeId = SensorTypeId(5);
const EQ_PRESSURE_DIFF: SensorTypeId = SensorTypeId(6);
const XH2O: SensorTypeId = SensorTypeId(7);
const WIND_SPEED: SensorTypeId = SensorTypeId(8);

fn sensor_types() -> Vec<SensorType> {
    vec![
        SensorType::new(1, "xCO₂ (with standards)")
            .with_depends_on(7)
            .with_internal_calibration(),
        SensorType::new(2, "Equilibrator Temperature"),
        SensorType::new(3, "Equilibrator Pressure"),
        SensorType::new(4, "Equilibrator Pressure (absolute)").with_parent(3),
        SensorType::new(5, "Ambient Pressure"),
        SensorType::new(6, "Equilibrator Pressure (differential)")
            .with_parent(3)
            .with_depends_on(5),
        SensorType::new(7, "xH₂O (with standards)").with_internal_calibration(),
        SensorType::new(8, "Wind Speed").diagnostic(),
    ]
}

fn pco2_definition() -> VariableDefinition {
    VariableDefinition {
        id: 1,
        name: "pCO2".to_string(),
        attributes: BTreeMap::new(),
        core: Some(CO2),
        required: vec![EQ_TEMP, EQ_PRESSURE],
        questionable_cascades: vec![Flag::Questionable.code(), Flag::AssumedGood.code()],
        bad_cascades: vec![Flag::Bad.code(), Flag::Questionable.code()],
    }
}

fn configuration() -> SensorsConfiguration {
    SensorsConfiguration::new(sensor_types(), vec![pco2_definition()]).expect("configuration")
}

fn assignments(config: &SensorsConfiguration) -> SensorAssignments {
    SensorAssignments::new(
        config,
        [CO2, EQ_TEMP, EQ_PRESSURE_ABS, AMBIENT_PRESSURE, EQ_PRESSURE_DIFF, XH2O, WIND_SPEED],
    )
    .expect("assignments")
}

fn graph(edges: &[(i64, &[i64])]) -> BTreeMap<SensorTypeId, BTreeSet<SensorTypeId>> {
    edges
        .iter()
        .map(|(from, to)| {
            (
                SensorTypeId(*from),
                to.iter().map(|&id| SensorTypeId(id)).collect(),
            )
        })
        .collect()
}

#[test]
fn pco2_scenario() {
    let config = configuration();
    let assignments = assignments(&config);
    let pco2 = config.variable(1).expect("variable");

    assert_eq!(
        pco2.cascade(&config, EQ_PRESSURE, Flag::Bad, &assignments),
        Ok(Some(Flag::Questionable))
    );
    assert_eq!(
        pco2.cascade(&config, EQ_PRESSURE, Flag::Good, &assignments),
        Ok(Some(Flag::AssumedGood))
    );
    assert_eq!(
        pco2.cascade(&config, CO2, Flag::Bad, &assignments),
        Ok(Some(Flag::Bad))
    );
}

#[test]
fn core_and_position_flags_pass_through_unchanged() {
    let config = configuration();
    let assignments = assignments(&config);
    let pco2 = config.variable(1).expect("variable");

    for flag in [
        Flag::Good,
        Flag::AssumedGood,
        Flag::Questionable,
        Flag::Bad,
        Flag::Ignored,
    ] {
        for sensor_type in [CO2, LONGITUDE_ID, LATITUDE_ID] {
            assert_eq!(
                pco2.cascade(&config, sensor_type, flag, &assignments),
                Ok(Some(flag)),
                "{flag} on {sensor_type}"
            );
        }
    }
}

#[test]
fn good_required_sensors_only_attest_assumed_good() {
    let config = configuration();
    let assignments = assignments(&config);
    let pco2 = config.variable(1).expect("variable");

    for sensor_type in [EQ_TEMP, EQ_PRESSURE] {
        for flag in [Flag::Good, Flag::AssumedGood] {
            assert_eq!(
                pco2.cascade(&config, sensor_type, flag, &assignments),
                Ok(Some(Flag::AssumedGood))
            );
        }
    }
}

#[test]
fn required_sensors_use_configured_cascades() {
    let config = configuration();
    let assignments = assignments(&config);
    let pco2 = config.variable(1).expect("variable");

    assert_eq!(
        pco2.cascade(&config, EQ_TEMP, Flag::Bad, &assignments),
        Ok(pco2.bad_cascade(EQ_TEMP))
    );
    assert_eq!(
        pco2.cascade(&config, EQ_TEMP, Flag::Questionable, &assignments),
        Ok(Some(Flag::Questionable))
    );
    assert_eq!(
        pco2.cascade(&config, EQ_PRESSURE, Flag::Questionable, &assignments),
        Ok(Some(Flag::AssumedGood))
    );
}

#[test]
fn child_sensor_types_fall_back_to_parent_cascade() {
    let config = configuration();
    let assignments = assignments(&config);
    let pco2 = config.variable(1).expect("variable");

    assert_eq!(
        pco2.cascade(&config, EQ_PRESSURE_ABS, Flag::Questionable, &assignments),
        Ok(pco2.questionable_cascade(EQ_PRESSURE))
    );
    assert_eq!(
        pco2.cascade(&config, EQ_PRESSURE_ABS, Flag::Bad, &assignments),
        Ok(Some(Flag::Questionable))
    );
}

#[test]
fn upstream_sensors_cascade_through_their_dependents() {
    let config = configuration();
    let assignments = assignments(&config);
    let pco2 = config.variable(1).expect("variable");

    // Ambient pressure feeds the differential equilibrator pressure sensor.
    assert_eq!(
        pco2.cascade(&config, AMBIENT_PRESSURE, Flag::Bad, &assignments),
        Ok(Some(Flag::Questionable))
    );
    // xH2O feeds the core CO2 sensor, so its flag is taken as-is.
    assert_eq!(
        pco2.cascade(&config, XH2O, Flag::Bad, &assignments),
        Ok(Some(Flag::Bad))
    );
    assert_eq!(
        pco2.cascade(&config, XH2O, Flag::Questionable, &assignments),
        Ok(Some(Flag::Questionable))
    );
}

#[test]
fn worst_dependent_cascade_wins() {
    let config = configuration();
    let pco2 = config.variable(1).expect("variable");
    let graph = graph(&[(8, &[2, 3])]);

    assert_eq!(
        pco2.cascade(&config, WIND_SPEED, Flag::Bad, &graph),
        Ok(Some(Flag::Bad))
    );
    assert_eq!(
        pco2.cascade(&config, WIND_SPEED, Flag::Questionable, &graph),
        Ok(Some(Flag::Questionable))
    );
}

#[test]
fn unrelated_sensor_has_no_bearing() {
    let config = configuration();
    let assignments = assignments(&config);
    let pco2 = config.variable(1).expect("variable");

    assert_eq!(
        pco2.cascade(&config, WIND_SPEED, Flag::Bad, &assignments),
        Ok(None)
    );
    assert_eq!(
        pco2.cascade(&config, WIND_SPEED, Flag::Questionable, &assignments),
        Ok(None)
    );
}

#[test]
fn marker_flags_pass_through_for_non_core_sensors() {
    let config = configuration();
    let assignments = assignments(&config);
    let pco2 = config.variable(1).expect("variable");

    assert_eq!(
        pco2.cascade(&config, EQ_TEMP, Flag::Ignored, &assignments),
        Ok(Some(Flag::Ignored))
    );
}

#[test]
fn dependency_cycles_are_reported() {
    let config = configuration();
    let pco2 = config.variable(1).expect("variable");
    let graph = graph(&[(20, &[21]), (21, &[20])]);

    let err = pco2
        .cascade(&config, SensorTypeId(20), Flag::Bad, &graph)
        .expect_err("cycle");
    assert_eq!(
        err,
        SensorConfigError::DependencyCycle {
            path: vec![SensorTypeId(20), SensorTypeId(21), SensorTypeId(20)],
        }
    );
}

#[test]
fn shared_dependents_are_not_mistaken_for_cycles() {
    let config = configuration();
    let pco2 = config.variable(1).expect("variable");
    let graph = graph(&[(20, &[21, 22]), (21, &[2]), (22, &[21])]);

    assert_eq!(
        pco2.cascade(&config, SensorTypeId(20), Flag::Bad, &graph),
        Ok(Some(Flag::Bad))
    );
}

#[test]
fn merged_cascade_keeps_most_significant_result() {
    let config = configuration();
    let assignments = assignments(&config);
    let pco2 = config.variable(1).expect("variable");

    let merged = pco2
        .merged_cascade(
            &config,
            &[
                (EQ_TEMP, Flag::Questionable),
                (EQ_PRESSURE, Flag::Bad),
                (WIND_SPEED, Flag::Bad),
            ],
            &assignments,
        )
        .expect("merge");
    assert_eq!(merged, Some(Flag::Questionable));

    let unrelated = pco2
        .merged_cascade(&config, &[(WIND_SPEED, Flag::Bad)], &assignments)
        .expect("merge");
    assert_eq!(unrelated, None);
}

#[test]
fn cascade_lists_must_match_required_sensors() {
    let mut definition = pco2_definition();
    definition.bad_cascades.pop();

    let err = SensorsConfiguration::new(sensor_types(), vec![definition]).expect_err("mismatch");
    assert!(matches!(
        err,
        SensorConfigError::CascadeLengthMismatch {
            kind: "bad",
            cascades: 1,
            required: 2,
            ..
        }
    ));

    let mut definition = pco2_definition();
    definition.questionable_cascades.push(Flag::Bad.code());
    let err = SensorsConfiguration::new(sensor_types(), vec![definition]).expect_err("mismatch");
    assert!(matches!(
        err,
        SensorConfigError::CascadeLengthMismatch {
            kind: "questionable",
            ..
        }
    ));
}

#[test]
fn required_sensor_types_must_be_unique() {
    let mut definition = pco2_definition();
    definition.required = vec![EQ_TEMP, EQ_TEMP];

    let err = SensorsConfiguration::new(sensor_types(), vec![definition]).expect_err("duplicate");
    assert_eq!(
        err,
        SensorConfigError::DuplicateRequiredSensorType {
            variable: "pCO2".to_string(),
            sensor_type: EQ_TEMP,
        }
    );
}

#[test]
fn child_sensor_types_cannot_be_core_or_required() {
    let mut definition = pco2_definition();
    definition.core = Some(EQ_PRESSURE_ABS);
    let err = SensorsConfiguration::new(sensor_types(), vec![definition]).expect_err("child core");
    assert!(matches!(err, SensorConfigError::ChildCoreSensorType { .. }));

    let mut definition = pco2_definition();
    definition.required = vec![EQ_TEMP, EQ_PRESSURE_DIFF];
    let err =
        SensorsConfiguration::new(sensor_types(), vec![definition]).expect_err("child required");
    assert_eq!(
        err,
        SensorConfigError::ChildRequiredSensorType {
            variable: "pCO2".to_string(),
            sensor_type: EQ_PRESSURE_DIFF,
        }
    );
}

#[test]
fn invalid_cascade_flags_and_unknown_sensors_are_rejected() {
    let mut definition = pco2_definition();
    definition.bad_cascades = vec![4, 99];
    let err = SensorsConfiguration::new(sensor_types(), vec![definition]).expect_err("bad flag");
    assert!(matches!(err, SensorConfigError::InvalidCascadeFlag { .. }));

    let mut definition = pco2_definition();
    definition.required = vec![EQ_TEMP, SensorTypeId(404)];
    let err = SensorsConfiguration::new(sensor_types(), vec![definition]).expect_err("unknown");
    assert_eq!(err, SensorConfigError::SensorTypeNotFound(SensorTypeId(404)));
}

#[test]
fn sensor_types_must_reference_known_parents() {
    let mut types = sensor_types();
    types.push(SensorType::new(30, "Orphan").with_parent(31));
    let err = SensorsConfiguration::new(types, Vec::new()).expect_err("unknown parent");
    assert_eq!(
        err,
        SensorConfigError::UnknownParent {
            child: SensorTypeId(30),
            parent: SensorTypeId(31),
        }
    );
}

#[test]
fn variable_helpers_report_sensor_usage() {
    let config = configuration();
    let pco2 = config.variable(1).expect("variable");

    assert_eq!(pco2.all_sensor_types(false), vec![EQ_TEMP, EQ_PRESSURE, CO2]);
    assert_eq!(
        pco2.all_sensor_types(true),
        vec![EQ_TEMP, EQ_PRESSURE, CO2, LONGITUDE_ID, LATITUDE_ID]
    );
    assert!(pco2.has_internal_calibrations());
    assert_eq!(
        pco2.internal_calibrations().iter().collect::<Vec<_>>(),
        vec!["xCO₂ (with standards)"]
    );
    assert!(!pco2.has_attributes());

    let variables = vec![pco2.clone()];
    assert!(Variable::sensor_type_required(&variables, EQ_TEMP));
    assert!(!Variable::sensor_type_required(&variables, CO2));
    assert_eq!(Variable::ids(&variables), vec![1]);
    assert_eq!(config.children_of(EQ_PRESSURE).len(), 2);
}
