use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgAction;
use clap::{Args, Parser, Subcommand, ValueEnum};
use disk_health_core::{
    collect_doctor_info, evaluate_risk, extract_identity, extract_metrics, load_report,
    render_markdown_summary, run_system_scan, write_csv_report, write_json_report,
    IdentityFallback, Report, ReportMetrics, RiskAssessment, ScanOptions, SmartctlTool,
};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "disk-health",
    version,
    about = "Assess physical disk health from SMART data and OS reliability counters."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Enumerate devices, assess each one and write a JSON report.
    Scan(ScanArgs),
    /// Assess a saved `smartctl -a -j` document without touching any device.
    Inspect(InspectArgs),
    /// Re-export an existing JSON report as CSV and/or Markdown.
    Export(ExportArgs),
    /// Show platform, smartctl and device enumeration status.
    Doctor(DoctorArgs),
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum CliIdentityFallback {
    Auto,
    Always,
    Never,
}

impl From<CliIdentityFallback> for IdentityFallback {
    fn from(value: CliIdentityFallback) -> Self {
        match value {
            CliIdentityFallback::Auto => IdentityFallback::Auto,
            CliIdentityFallback::Always => IdentityFallback::Always,
            CliIdentityFallback::Never => IdentityFallback::Never,
        }
    }
}

#[derive(Debug, Args)]
struct ScanArgs {
    /// Output report path.
    #[arg(long, default_value = "disk-health-report.json", value_name = "FILE")]
    output: PathBuf,

    /// Optional CSV export path.
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Optional markdown summary output file.
    #[arg(long, value_name = "FILE")]
    md: Option<PathBuf>,

    /// Explicit smartctl executable; otherwise PATH and default install locations are searched.
    #[arg(long, value_name = "PATH")]
    smartctl: Option<PathBuf>,

    /// Ignore OS-reported reliability counters.
    #[arg(long)]
    no_os_counters: bool,

    /// When to match a device against `smartctl --scan-open` candidates.
    #[arg(long, default_value = "auto")]
    identity_fallback: CliIdentityFallback,

    /// Only assess these device handles (repeatable).
    #[arg(long = "device", value_name = "HANDLE", num_args = 1.., action = ArgAction::Append)]
    devices: Vec<String>,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Saved smartctl JSON document.
    #[arg(long, value_name = "FILE")]
    smart: PathBuf,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Input report file.
    #[arg(long, value_name = "FILE")]
    report: PathBuf,

    /// CSV output file.
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Markdown summary output file.
    #[arg(long, value_name = "FILE")]
    md: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct DoctorArgs {
    /// Explicit smartctl executable to check.
    #[arg(long, value_name = "PATH")]
    smartctl: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct InspectResult {
    model: Option<String>,
    serial: Option<String>,
    size_bytes: Option<u64>,
    metrics: ReportMetrics,
    risk: RiskAssessment,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => run_scan_command(args),
        Commands::Inspect(args) => run_inspect_command(args),
        Commands::Export(args) => run_export_command(args),
        Commands::Doctor(args) => {
            run_doctor_command(args);
            Ok(())
        }
    }
}

fn run_scan_command(args: ScanArgs) -> Result<()> {
    let ScanArgs {
        output,
        csv,
        md,
        smartctl,
        no_os_counters,
        identity_fallback,
        devices,
    } = args;

    let tool = SmartctlTool::discover(smartctl.as_deref());
    if tool.is_none() {
        match &smartctl {
            Some(path) => warn!("smartctl not found at {}", path.display()),
            None => warn!("smartctl not found; SMART data will be unavailable"),
        }
    }

    let options = ScanOptions {
        smartctl: tool,
        use_os_counters: !no_os_counters,
        identity_fallback: identity_fallback.into(),
        devices,
        ..ScanOptions::default()
    };

    let report = run_system_scan(&options)?;
    write_json_report(&report, &output)?;
    println!("Report written to {}", output.display());
    print_device_table(&report);
    println!(
        "Assessed {} device(s), {} warning(s).",
        report.devices.len(),
        report.warnings.len()
    );
    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }

    write_exports(&report, csv, md)
}

fn run_inspect_command(args: InspectArgs) -> Result<()> {
    let data = fs::read_to_string(&args.smart)
        .with_context(|| format!("failed to read {}", args.smart.display()))?;
    let doc: serde_json::Value = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", args.smart.display()))?;

    let identity = extract_identity(&doc);
    let metrics = extract_metrics(&doc);
    let risk = if metrics.is_empty() {
        RiskAssessment::unknown("No health data available")
    } else {
        evaluate_risk(&metrics)
    };
    let result = InspectResult {
        model: identity.model,
        serial: identity.serial,
        size_bytes: identity.size_bytes,
        metrics: ReportMetrics::from(&metrics),
        risk,
    };

    let payload =
        serde_json::to_string_pretty(&result).context("failed to serialize inspection")?;
    println!("{}", payload);
    Ok(())
}

fn run_export_command(args: ExportArgs) -> Result<()> {
    if args.csv.is_none() && args.md.is_none() {
        anyhow::bail!("nothing to export: pass --csv and/or --md");
    }
    let report = load_report(&args.report)?;
    write_exports(&report, args.csv, args.md)
}

fn write_exports(report: &Report, csv: Option<PathBuf>, md: Option<PathBuf>) -> Result<()> {
    if let Some(csv_path) = csv {
        write_csv_report(report, &csv_path)?;
        println!("CSV export written to {}", csv_path.display());
    }
    if let Some(md_path) = md {
        let markdown = render_markdown_summary(report);
        fs::write(&md_path, markdown).with_context(|| {
            format!("failed to write markdown summary to {}", md_path.display())
        })?;
        println!("Markdown summary written to {}", md_path.display());
    }
    Ok(())
}

fn print_device_table(report: &Report) {
    for device in &report.devices {
        println!(
            "- {} [{}] size={} temp={} poh={} risk={} ({}) {}",
            device.device,
            device.model.as_deref().unwrap_or("unknown model"),
            device
                .size_bytes
                .map(human_bytes)
                .unwrap_or_else(|| "?".to_string()),
            device
                .metrics
                .temperature_c
                .map(|temp| format!("{temp}C"))
                .unwrap_or_else(|| "-".to_string()),
            device
                .metrics
                .power_on_years
                .map(|years| format!("{years:.2}y"))
                .unwrap_or_else(|| "-".to_string()),
            device.risk.level.as_str(),
            device.risk.score,
            device.risk.notes
        );
    }
}

fn run_doctor_command(args: DoctorArgs) {
    let info = collect_doctor_info(args.smartctl.as_deref());
    println!("OS: {} ({})", info.os, info.arch);
    match (&info.smartctl_path, &info.smartctl_version) {
        (Some(path), Some(version)) => println!("smartctl: {} ({})", path, version),
        (Some(path), None) => println!("smartctl: {}", path),
        _ => println!("smartctl: not found"),
    }
    println!("Detected devices: {}", info.devices.len());
    for device in &info.devices {
        println!(
            "- {} [{}] size={} serial={} volumes={}",
            device.device,
            device.model.as_deref().unwrap_or("unknown model"),
            device
                .size_bytes
                .map(human_bytes)
                .unwrap_or_else(|| "?".to_string()),
            device.serial.as_deref().unwrap_or("-"),
            device
                .volumes
                .iter()
                .map(|volume| volume.mountpoint.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    for note in info.notes {
        println!("Note: {}", note);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn human_bytes(value: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if value == 0 {
        return "0 B".to_string();
    }
    let mut size = value as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
