use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::device::{DeviceSource, SystemDeviceSource};
use crate::error::ProbeResult;
use crate::extract::{extract_metrics, has_smart_fields};
use crate::identity::resolve_candidate;
use crate::merge::{merge_metrics, os_metrics};
use crate::model::{
    DeviceDescriptor, DeviceReport, HealthMetrics, Report, ReportMetrics, ReportRisk,
    RiskAssessment, REPORT_VERSION,
};
use crate::risk::evaluate_risk;
use crate::smartctl::{DiagnosticSource, QueryMode, SmartctlSource, SmartctlTool};

const NO_DATA_REASON: &str = "No health data available";
const NO_ISSUES_NOTE: &str = "No issues";
const SMART_UNAVAILABLE: &str = "SMART unavailable: smartctl not found";

/// When to look for an alternative diagnostic handle for a device whose own
/// handle answers without health data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityFallback {
    /// Only for Windows physical-drive handles.
    #[default]
    Auto,
    Always,
    Never,
}

impl IdentityFallback {
    pub fn applies_to(self, handle: &str) -> bool {
        match self {
            IdentityFallback::Auto => cfg!(windows) && is_physical_drive_handle(handle),
            IdentityFallback::Always => true,
            IdentityFallback::Never => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub smartctl: Option<SmartctlTool>,
    pub use_os_counters: bool,
    pub identity_fallback: IdentityFallback,
    /// Device handles to assess; empty means every enumerated device.
    pub devices: Vec<String>,
    pub scan_id: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            smartctl: None,
            use_os_counters: true,
            identity_fallback: IdentityFallback::Auto,
            devices: Vec::new(),
            scan_id: None,
        }
    }
}

/// Scans the local machine with the platform enumerator and, when a smartctl
/// executable was resolved, SMART data.
pub fn run_system_scan(options: &ScanOptions) -> Result<Report> {
    let smartctl = options.smartctl.clone().map(SmartctlSource::new);
    run_scan(
        options,
        &SystemDeviceSource,
        smartctl
            .as_ref()
            .map(|source| source as &dyn DiagnosticSource),
    )
}

pub fn run_scan(
    options: &ScanOptions,
    devices: &dyn DeviceSource,
    diagnostics: Option<&dyn DiagnosticSource>,
) -> Result<Report> {
    let started = Instant::now();
    let scan_id = options
        .scan_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!("scan {} started", scan_id);

    let descriptors = devices
        .enumerate()
        .context("failed to enumerate storage devices")?;

    let mut warnings = Vec::new();
    if diagnostics.is_none() {
        warnings.push(format!("{SMART_UNAVAILABLE}; only OS-reported counters are used."));
    }

    let selected = descriptors
        .iter()
        .filter(|descriptor| {
            options.devices.is_empty()
                || options
                    .devices
                    .iter()
                    .any(|handle| handle.eq_ignore_ascii_case(&descriptor.device))
        })
        .collect::<Vec<_>>();
    for handle in &options.devices {
        if !descriptors
            .iter()
            .any(|descriptor| descriptor.device.eq_ignore_ascii_case(handle))
        {
            warnings.push(format!("requested device {handle} was not found"));
        }
    }

    let reports = selected
        .into_iter()
        .map(|descriptor| assess_device(descriptor, diagnostics, options, &mut warnings))
        .collect::<Vec<_>>();

    info!(
        "scan {} finished: {} device(s), {} warning(s) in {} ms",
        scan_id,
        reports.len(),
        warnings.len(),
        started.elapsed().as_millis()
    );

    Ok(Report {
        report_version: REPORT_VERSION.to_string(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        scan_id,
        smartctl_available: diagnostics.is_some(),
        devices: reports,
        warnings,
    })
}

/// Builds the report for one device. Source failures are recorded in
/// `warnings` and never abort the assessment.
pub fn assess_device(
    descriptor: &DeviceDescriptor,
    diagnostics: Option<&dyn DiagnosticSource>,
    options: &ScanOptions,
    warnings: &mut Vec<String>,
) -> DeviceReport {
    let (smart, smart_error) = match diagnostics {
        Some(source) => match smart_metrics(descriptor, source, options.identity_fallback) {
            Ok(metrics) => (metrics, None),
            Err(err) => {
                warn!("SMART data unavailable for {}: {}", descriptor.device, err);
                warnings.push(format!("{}: {}", descriptor.device, err));
                (None, Some(err.to_string()))
            }
        },
        None => (None, Some(SMART_UNAVAILABLE.to_string())),
    };

    let os = if options.use_os_counters {
        os_metrics(&descriptor.os_counters)
    } else {
        None
    };

    let merged = merge_metrics(smart, os);
    let risk = match &merged {
        Some(metrics) => evaluate_risk(metrics),
        None => RiskAssessment::unknown(match &smart_error {
            Some(err) => format!("{NO_DATA_REASON}: {err}"),
            None => NO_DATA_REASON.to_string(),
        }),
    };
    debug!(
        "{} assessed as {} (score {})",
        descriptor.device,
        risk.level.as_str(),
        risk.score
    );

    let notes = risk_notes(&risk, smart_error.as_deref());
    DeviceReport {
        device: descriptor.device.clone(),
        model: descriptor.model.clone(),
        serial: descriptor.serial.clone(),
        size_bytes: descriptor.size_bytes,
        metrics: merged
            .as_ref()
            .map(ReportMetrics::from)
            .unwrap_or_default(),
        os: descriptor.os_counters.clone(),
        risk: ReportRisk {
            level: risk.level,
            score: risk.score,
            reasons: risk.reasons,
            recommendations: risk.recommendations,
            notes,
        },
        volumes: descriptor.volumes.clone(),
    }
}

/// SMART metrics for a device, or `None` when the document it answered with
/// carries no health field at all.
fn smart_metrics(
    descriptor: &DeviceDescriptor,
    source: &dyn DiagnosticSource,
    fallback: IdentityFallback,
) -> ProbeResult<Option<HealthMetrics>> {
    let mut doc = source.query(&descriptor.device, None, QueryMode::Full)?;

    if !has_smart_fields(&doc) && fallback.applies_to(&descriptor.device) {
        let candidates = source.scan_candidates();
        if !candidates.is_empty() {
            let candidate = resolve_candidate(&descriptor.identity(), &candidates, |candidate| {
                source.query(
                    &candidate.handle,
                    candidate.protocol_hint.as_deref(),
                    QueryMode::IdentityOnly,
                )
            })?;
            info!(
                "resolved {} to diagnostic handle {}",
                descriptor.device, candidate.handle
            );
            doc = source.query(
                &candidate.handle,
                candidate.protocol_hint.as_deref(),
                QueryMode::Full,
            )?;
        }
    }

    let metrics = extract_metrics(&doc);
    Ok((!metrics.is_empty()).then_some(metrics))
}

fn risk_notes(risk: &RiskAssessment, smart_error: Option<&str>) -> String {
    if !risk.reasons.is_empty() {
        return risk.reasons.join("; ");
    }
    smart_error.unwrap_or(NO_ISSUES_NOTE).to_string()
}

fn is_physical_drive_handle(handle: &str) -> bool {
    let lowered = handle.to_ascii_lowercase();
    lowered.starts_with("//./physicaldrive") || lowered.starts_with(r"\\.\physicaldrive")
}
