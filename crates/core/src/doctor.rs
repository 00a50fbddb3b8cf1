use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceSource, SystemDeviceSource};
use crate::model::DeviceDescriptor;
use crate::smartctl::SmartctlTool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorInfo {
    pub os: String,
    pub arch: String,
    pub smartctl_path: Option<String>,
    pub smartctl_version: Option<String>,
    pub devices: Vec<DeviceDescriptor>,
    pub notes: Vec<String>,
}

pub fn collect_doctor_info(smartctl: Option<&Path>) -> DoctorInfo {
    collect_doctor_info_with(SmartctlTool::discover(smartctl), &SystemDeviceSource)
}

pub fn collect_doctor_info_with(
    tool: Option<SmartctlTool>,
    devices: &dyn DeviceSource,
) -> DoctorInfo {
    let mut notes = vec!["All probes are read-only; no device is written to.".to_string()];

    let smartctl_version = tool.as_ref().and_then(SmartctlTool::version);
    match &tool {
        None => notes.push(
            "smartctl not found; install smartmontools or pass --smartctl for SMART data."
                .to_string(),
        ),
        Some(_) if smartctl_version.is_none() => {
            notes.push("smartctl was found but did not report a version.".to_string())
        }
        Some(_) => {}
    }

    let devices = match devices.enumerate() {
        Ok(devices) => {
            if devices.is_empty() {
                notes.push("No physical devices were enumerated.".to_string());
            }
            devices
        }
        Err(err) => {
            notes.push(format!("Device enumeration failed: {err}"));
            Vec::new()
        }
    };

    DoctorInfo {
        os: env::consts::OS.to_string(),
        arch: env::consts::ARCH.to_string(),
        smartctl_path: tool.map(|tool| tool.path().to_string_lossy().to_string()),
        smartctl_version,
        devices,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::collect_doctor_info_with;
    use crate::device::DeviceSource;
    use crate::error::{ProbeError, ProbeResult};
    use crate::model::DeviceDescriptor;

    struct Fixed(ProbeResult<Vec<DeviceDescriptor>>);

    impl DeviceSource for Fixed {
        fn enumerate(&self) -> ProbeResult<Vec<DeviceDescriptor>> {
            self.0.clone()
        }
    }

    #[test]
    fn reports_missing_smartctl_and_devices() {
        let info = collect_doctor_info_with(
            None,
            &Fixed(Ok(vec![DeviceDescriptor::new("/dev/sda")])),
        );
        assert_eq!(info.smartctl_path, None);
        assert_eq!(info.devices.len(), 1);
        assert!(info.notes.iter().any(|note| note.contains("smartctl not found")));
    }

    #[test]
    fn enumeration_failure_becomes_a_note() {
        let info = collect_doctor_info_with(
            None,
            &Fixed(Err(ProbeError::UnsupportedPlatform("plan9".to_string()))),
        );
        assert!(info.devices.is_empty());
        assert!(info
            .notes
            .iter()
            .any(|note| note.contains("Device enumeration failed") && note.contains("plan9")));
    }
}
