//! mflux - Command-line interface for Murine Flux
//!
//! Commands:
//! - normalize: Emit the normalized event stream
//! - heatmap: Hour-by-day activity grid for the filtered events
//! - outliers: Per-sex outlier ranking for a metric
//! - cohort: Rolling cohort bands with an optional subject overlay
//! - summary: Dataset statistics and ingest quality
//! - doctor: Check that the four input tables can be read

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use murine_flux::adapters::CsvTableSource;
use murine_flux::pipeline::AnalysisSession;
use murine_flux::schema::TableKind;
use murine_flux::stats::DatasetSummary;
use murine_flux::types::{IngestQuality, LightPhaseConvention};
use murine_flux::{
    AnalysisConfig, ComputeError, EstrusFilter, LightFilter, Metric, SexFilter, FLUX_VERSION,
    PRODUCER_NAME,
};

/// mflux - Cohort analysis for mouse activity and temperature recordings
#[derive(Parser)]
#[command(name = "mflux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Normalize and aggregate mouse activity/temperature tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit the normalized event stream
    Normalize {
        #[command(flatten)]
        data: DataArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Hour-by-day activity grid for the filtered events
    Heatmap {
        #[command(flatten)]
        data: DataArgs,

        /// Sex filter (all, male, female)
        #[arg(long)]
        sex: Option<SexFilter>,

        /// Estrus filter (all, estrus, non_estrus); applies with --sex female
        #[arg(long)]
        estrus: Option<EstrusFilter>,

        /// Light filter (all, on, off)
        #[arg(long)]
        light: Option<LightFilter>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Per-sex outlier ranking for a metric
    Outliers {
        #[command(flatten)]
        data: DataArgs,

        /// Metric to rank (activity, temperature)
        #[arg(long)]
        metric: Option<Metric>,
    },

    /// Rolling cohort bands over a trailing window
    Cohort {
        #[command(flatten)]
        data: DataArgs,

        /// Metric to aggregate (activity, temperature)
        #[arg(long)]
        metric: Option<Metric>,

        /// Trailing window in hours
        #[arg(long)]
        hours: Option<u32>,

        /// Subject whose raw series is returned alongside the bands
        #[arg(long)]
        subject: Option<String>,
    },

    /// Dataset statistics and ingest quality
    Summary {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Check that the four input tables can be read
    Doctor {
        /// Directory holding the four CSV exports
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Directory holding the four CSV exports
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Analysis configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling stride in minutes
    #[arg(long)]
    stride: Option<u32>,

    /// Light phase convention (half_day, clock_six_to_six)
    #[arg(long)]
    light_convention: Option<LightPhaseConvention>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init();
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    match cli.command {
        Commands::Normalize {
            data,
            output,
            output_format,
        } => {
            let session = open_session(&data, |_| {})?;
            let stream = session.stream()?;
            write_output(&output, &format_records(stream.events(), &output_format)?)
        }

        Commands::Heatmap {
            data,
            sex,
            estrus,
            light,
            output_format,
        } => {
            let session = open_session(&data, |config| {
                if let Some(sex) = sex {
                    config.sex_filter = sex;
                }
                if let Some(estrus) = estrus {
                    config.estrus_filter = estrus;
                }
                if let Some(light) = light {
                    config.light_filter = light;
                }
            })?;
            let grid = session.hourly()?;
            print!("{}", format_records(&grid, &output_format)?);
            Ok(())
        }

        Commands::Outliers { data, metric } => {
            let session = open_session(&data, |config| {
                if let Some(metric) = metric {
                    config.metric = metric;
                }
            })?;
            println!("{}", serde_json::to_string_pretty(&session.outliers()?)?);
            Ok(())
        }

        Commands::Cohort {
            data,
            metric,
            hours,
            subject,
        } => {
            let session = open_session(&data, |config| {
                if let Some(metric) = metric {
                    config.metric = metric;
                }
                if let Some(hours) = hours {
                    config.time_window_hours = hours;
                }
                if subject.is_some() {
                    config.selected_subject_id = subject.clone();
                }
            })?;
            println!("{}", serde_json::to_string_pretty(&session.cohort()?)?);
            Ok(())
        }

        Commands::Summary { data } => {
            let session = open_session(&data, |_| {})?;
            let stream = session.stream()?;
            let report = SummaryReport {
                producer: PRODUCER_NAME.to_string(),
                version: FLUX_VERSION.to_string(),
                load_id: stream.load_id().to_string(),
                stride_minutes: stream.stride_minutes(),
                summary: session.summary()?,
                quality: stream.quality().clone(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Commands::Doctor { data_dir, json } => cmd_doctor(&data_dir, json),
    }
}

/// Build the configuration (file, then flag overrides) and load the tables
fn open_session(
    data: &DataArgs,
    overrides: impl FnOnce(&mut AnalysisConfig),
) -> Result<AnalysisSession, FluxCliError> {
    let mut config = match &data.config {
        Some(path) => AnalysisConfig::from_json(&fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };
    if let Some(stride) = data.stride {
        config.sampling_stride_minutes = stride;
    }
    if let Some(convention) = data.light_convention {
        config.light_convention = convention;
    }
    overrides(&mut config);

    let mut session = AnalysisSession::with_config(config)?;
    session.load(&CsvTableSource::new(&data.data_dir))?;
    Ok(session)
}

fn cmd_doctor(data_dir: &Path, json: bool) -> Result<(), FluxCliError> {
    let source = CsvTableSource::new(data_dir);
    let mut checks: Vec<DoctorCheck> = vec![DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, FLUX_VERSION),
    }];

    for kind in TableKind::ALL {
        let path = source.path(kind);
        let check = if !path.exists() {
            DoctorCheck {
                name: kind.to_string(),
                status: CheckStatus::Error,
                message: format!("{} does not exist", path.display()),
            }
        } else {
            match source.load_table(kind) {
                Ok(table) if table.subject_ids().is_empty() => DoctorCheck {
                    name: kind.to_string(),
                    status: CheckStatus::Warning,
                    message: "table has no subject columns".to_string(),
                },
                Ok(table) if table.is_empty() => DoctorCheck {
                    name: kind.to_string(),
                    status: CheckStatus::Warning,
                    message: "table has no data rows".to_string(),
                },
                Ok(table) => DoctorCheck {
                    name: kind.to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "{} subjects, {} rows",
                        table.subject_ids().len(),
                        table.row_count()
                    ),
                },
                Err(e) => DoctorCheck {
                    name: kind.to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            }
        };
        checks.push(check);
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        data_dir: data_dir.display().to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("mflux Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("Data dir: {}", report.data_dir);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn format_records<T: Serialize>(
    records: &[T],
    format: &OutputFormat,
) -> Result<String, FluxCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for record in records {
                out.push_str(&serde_json::to_string(record)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)? + "\n"),
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), FluxCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum FluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<ComputeError> for FluxCliError {
    fn from(e: ComputeError) -> Self {
        FluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for FluxCliError {
    fn from(e: serde_json::Error) -> Self {
        FluxCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FluxCliError> for CliError {
    fn from(e: FluxCliError) -> Self {
        match e {
            FluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FluxCliError::Compute(e @ ComputeError::LoadError { .. }) => CliError {
                code: "LOAD_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'mflux doctor' to check the input tables".to_string()),
            },
            FluxCliError::Compute(
                e @ (ComputeError::InvalidConfig(_)
                | ComputeError::UnknownMetric(_)
                | ComputeError::UnknownFilter(_)),
            ) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: e.to_string(),
                hint: Some("Check the configuration file and flags".to_string()),
            },
            FluxCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FluxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more input tables could not be read".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct SummaryReport {
    producer: String,
    version: String,
    load_id: String,
    stride_minutes: u32,
    summary: DatasetSummary,
    quality: IngestQuality,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    data_dir: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
