pub mod device;
pub mod doctor;
pub mod error;
pub mod export;
pub mod extract;
pub mod identity;
pub mod markdown;
pub mod merge;
pub mod model;
pub mod risk;
pub mod scan;
pub mod smartctl;

pub use device::{DeviceSource, SystemDeviceSource};
pub use doctor::{collect_doctor_info, DoctorInfo};
pub use error::{ProbeError, ProbeResult};
pub use export::{load_report, render_csv, write_csv_report, write_json_report};
pub use extract::{extract_identity, extract_metrics, has_smart_fields};
pub use identity::{identity_score, resolve_candidate, DiagnosticCandidate};
pub use markdown::render_markdown_summary;
pub use merge::{merge_metrics, os_metrics};
pub use model::{
    DeviceDescriptor, DeviceIdentity, DeviceReport, HealthMetrics, OsCounters, Report,
    ReportMetrics, ReportRisk, RiskAssessment, RiskLevel, VolumeInfo, REPORT_VERSION,
};
pub use risk::{evaluate_risk, level_for_score};
pub use scan::{assess_device, run_scan, run_system_scan, IdentityFallback, ScanOptions};
pub use smartctl::{DiagnosticSource, QueryMode, SmartctlSource, SmartctlTool};
