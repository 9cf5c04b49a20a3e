use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use serde::Serialize;
use tidemark_core::{manifest, Flag, LoadedConfiguration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tidemark calibration and QC flag tools", long_about = None)]
struct Cli {
    /// Sensor manifest (falls back to TIDEMARK_MANIFEST)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate the sensor manifest
    Check,
    /// Resolve the flag a variable inherits from one sensor's flag
    Cascade(CascadeArgs),
    /// Validate a file of calibration records
    Calibrations(CalibrationArgs),
}

#[derive(Args, Debug)]
struct CascadeArgs {
    #[arg(long)]
    instrument: i64,
    /// Variable name
    #[arg(long)]
    variable: String,
    /// Sensor type name
    #[arg(long)]
    sensor: String,
    /// Flag code on the sensor value
    #[arg(long, allow_hyphen_values = true)]
    flag: i32,
}

#[derive(Args, Debug)]
struct CalibrationArgs {
    file: PathBuf,
    /// Print a JSON report instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct CalibrationReport {
    instrument_id: i64,
    calibration_type: String,
    target: Option<String>,
    deployment_date: String,
    coefficients: Option<String>,
    error: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_configuration(cli.manifest)?;

    match cli.command {
        Command::Check => check(&config),
        Command::Cascade(args) => cascade(&config, args),
        Command::Calibrations(args) => calibrations(&config, args),
    }
}

fn load_configuration(path: Option<PathBuf>) -> Result<LoadedConfiguration> {
    dotenvy::dotenv().ok();
    let path = match path {
        Some(path) => path,
        None => std::env::var("TIDEMARK_MANIFEST")
            .map(PathBuf::from)
            .context("--manifest or TIDEMARK_MANIFEST must be set")?,
    };
    LoadedConfiguration::load(&path)
}

fn check(config: &LoadedConfiguration) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Variable", "Core", "Required", "Internal calibrations"]);

    for variable in config.sensors.variables() {
        let core = match variable.core_sensor_type() {
            Some(id) => config.sensors.sensor_type(id)?.name.clone(),
            None => "-".to_string(),
        };
        let required = variable
            .required_sensor_types()
            .iter()
            .map(|&id| config.sensors.sensor_type(id).map(|t| t.name.clone()))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let internal = variable
            .internal_calibrations()
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![variable.name().to_string(), core, required, internal]);
    }

    println!("{table}");
    info!(
        instruments = config.instruments.instruments().count(),
        "sensor manifest is valid"
    );
    Ok(())
}

fn cascade(config: &LoadedConfiguration, args: CascadeArgs) -> Result<()> {
    let instrument = config.instruments.instrument(args.instrument)?;
    let variable = config
        .sensors
        .variable_by_name(&args.variable)
        .ok_or_else(|| anyhow!("unknown variable {}", args.variable))?;
    if !instrument.variable_ids().contains(&variable.id()) {
        warn!(
            instrument = instrument.name(),
            variable = variable.name(),
            "variable is not measured by this instrument"
        );
    }
    let sensor_type = config
        .sensors
        .sensor_type_by_name(&args.sensor)
        .ok_or_else(|| anyhow!("unknown sensor type {}", args.sensor))?;
    let flag = Flag::from_code(args.flag)?;

    let result =
        variable.cascade(&config.sensors, sensor_type.id, flag, instrument.assignments())?;

    match result {
        Some(cascaded) => println!(
            "{} {} -> {} {}",
            sensor_type.name,
            flag,
            variable.name(),
            cascaded
        ),
        None => println!("{} has no bearing on {}", sensor_type.name, variable.name()),
    }
    Ok(())
}

fn calibrations(config: &LoadedConfiguration, args: CalibrationArgs) -> Result<()> {
    let records = manifest::load_calibrations(&args.file)?;
    let mut reports = Vec::with_capacity(records.len());

    for (record, built) in manifest::build_calibrations(records, &config.instruments) {
        let (coefficients, error) = match built {
            Ok(calibration) => (Some(calibration.human_readable_coefficients()), None),
            Err(err) => {
                let message = format!("{err:#}");
                warn!(error = %message, "calibration rejected");
                (None, Some(message))
            }
        };
        reports.push(CalibrationReport {
            instrument_id: record.instrument_id,
            calibration_type: record.calibration_type,
            target: record.target,
            deployment_date: record.deployment_date.to_string(),
            coefficients,
            error,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Instrument", "Type", "Target", "Deployed", "Coefficients", "Status"]);
    for report in &reports {
        table.add_row(vec![
            report.instrument_id.to_string(),
            report.calibration_type.clone(),
            report.target.clone().unwrap_or_default(),
            report.deployment_date.clone(),
            report.coefficients.clone().unwrap_or_default(),
            report.error.clone().unwrap_or_else(|| "ok".to_string()),
        ]);
    }
    println!("{table}");

    let rejected = reports.iter().filter(|r| r.error.is_some()).count();
    info!(total = reports.len(), rejected, "calibrations checked");
    Ok(())
}
