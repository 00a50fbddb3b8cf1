use serde::{Deserialize, Serialize};

pub const REPORT_VERSION: &str = "1.0.0";

/// Identity reported for a physical device, used only to pair an OS-visible
/// device with the diagnostic handle that answers SMART queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub model: Option<String>,
    pub serial: Option<String>,
    pub size_bytes: Option<u64>,
}

/// Canonical health metric set shared by the SMART extractor, the OS
/// reliability counters and the risk engine. Every field is independently
/// optional: `None` means the source did not report it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthMetrics {
    pub passed: Option<bool>,
    pub temperature_c: Option<i64>,
    pub temperature_max_c: Option<i64>,
    pub power_on_hours: Option<u64>,
    pub load_cycle_count: Option<u64>,
    pub start_stop_count: Option<u64>,
    pub power_cycle_count: Option<u64>,
    pub reallocated_sectors: Option<u64>,
    pub pending_sectors: Option<u64>,
    pub uncorrectable_sectors: Option<u64>,
    pub media_errors: Option<u64>,
    pub error_log_entries: Option<u64>,
    pub critical_warning: Option<u64>,
    pub flush_latency_max_ms: Option<u64>,
    pub write_latency_max_ms: Option<u64>,
    pub read_latency_max_ms: Option<u64>,
}

impl HealthMetrics {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Power-on time in years, rounded to two decimals.
    pub fn power_on_years(&self) -> Option<f64> {
        self.power_on_hours.map(hours_to_years)
    }
}

pub fn hours_to_years(hours: u64) -> f64 {
    let years = hours as f64 / 24.0 / 365.0;
    (years * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Ok,
    Warning,
    Critical,
    #[default]
    Unknown,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Ok => "OK",
            RiskLevel::Warning => "WARNING",
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub reasons: Vec<String>,
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    /// Assessment used when neither SMART nor the OS produced any metric.
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            score: 0,
            level: RiskLevel::Unknown,
            reasons: vec![reason.into()],
            recommendations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeInfo {
    pub mountpoint: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub free_bytes: Option<u64>,
}

/// Reliability counters the operating system reports for a physical disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OsCounters {
    #[serde(default)]
    pub temperature_c: Option<i64>,
    #[serde(default)]
    pub temperature_max_c: Option<i64>,
    #[serde(default)]
    pub power_on_hours: Option<u64>,
    #[serde(default)]
    pub load_cycle_count: Option<u64>,
    #[serde(default)]
    pub start_stop_count: Option<u64>,
    #[serde(default)]
    pub flush_latency_max_ms: Option<u64>,
    #[serde(default)]
    pub write_latency_max_ms: Option<u64>,
    #[serde(default)]
    pub read_latency_max_ms: Option<u64>,
}

/// A physical device as returned by OS enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceDescriptor {
    pub device: String,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub size_bytes: Option<u64>,
    pub volumes: Vec<VolumeInfo>,
    pub os_counters: OsCounters,
}

impl DeviceDescriptor {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            model: None,
            serial: None,
            size_bytes: None,
            volumes: Vec::new(),
            os_counters: OsCounters::default(),
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            model: self.model.clone(),
            serial: self.serial.clone(),
            size_bytes: self.size_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub report_version: String,
    pub generated_at: String,
    #[serde(default = "default_scan_id")]
    pub scan_id: String,
    #[serde(default)]
    pub smartctl_available: bool,
    pub devices: Vec<DeviceReport>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

fn default_scan_id() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceReport {
    pub device: String,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub size_bytes: Option<u64>,
    pub metrics: ReportMetrics,
    #[serde(default)]
    pub os: OsCounters,
    pub risk: ReportRisk,
    #[serde(default)]
    pub volumes: Vec<VolumeInfo>,
}

/// Merged metric values as exported, including the derived power-on years.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportMetrics {
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub temperature_c: Option<i64>,
    #[serde(default)]
    pub temperature_max_c: Option<i64>,
    #[serde(default)]
    pub power_on_hours: Option<u64>,
    #[serde(default)]
    pub power_on_years: Option<f64>,
    #[serde(default)]
    pub load_cycle_count: Option<u64>,
    #[serde(default)]
    pub start_stop_count: Option<u64>,
    #[serde(default)]
    pub power_cycle_count: Option<u64>,
    #[serde(default)]
    pub reallocated_sectors: Option<u64>,
    #[serde(default)]
    pub pending_sectors: Option<u64>,
    #[serde(default)]
    pub uncorrectable_sectors: Option<u64>,
    #[serde(default)]
    pub media_errors: Option<u64>,
    #[serde(default)]
    pub error_log_entries: Option<u64>,
    #[serde(default)]
    pub critical_warning: Option<u64>,
    #[serde(default)]
    pub flush_latency_max_ms: Option<u64>,
    #[serde(default)]
    pub write_latency_max_ms: Option<u64>,
    #[serde(default)]
    pub read_latency_max_ms: Option<u64>,
}

impl From<&HealthMetrics> for ReportMetrics {
    fn from(metrics: &HealthMetrics) -> Self {
        Self {
            passed: metrics.passed,
            temperature_c: metrics.temperature_c,
            temperature_max_c: metrics.temperature_max_c,
            power_on_hours: metrics.power_on_hours,
            power_on_years: metrics.power_on_years(),
            load_cycle_count: metrics.load_cycle_count,
            start_stop_count: metrics.start_stop_count,
            power_cycle_count: metrics.power_cycle_count,
            reallocated_sectors: metrics.reallocated_sectors,
            pending_sectors: metrics.pending_sectors,
            uncorrectable_sectors: metrics.uncorrectable_sectors,
            media_errors: metrics.media_errors,
            error_log_entries: metrics.error_log_entries,
            critical_warning: metrics.critical_warning,
            flush_latency_max_ms: metrics.flush_latency_max_ms,
            write_latency_max_ms: metrics.write_latency_max_ms,
            read_latency_max_ms: metrics.read_latency_max_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRisk {
    pub level: RiskLevel,
    pub score: u32,
    pub reasons: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub notes: String,
}
