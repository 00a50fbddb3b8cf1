use std::collections::HashMap;
use std::env;
use std::process::Command;

use serde_json::Value;
use sysinfo::Disks;
use tracing::{debug, warn};

use crate::error::{ProbeError, ProbeResult};
use crate::extract::{lenient_i64, lenient_u64, non_empty_text};
use crate::model::{DeviceDescriptor, OsCounters, VolumeInfo};

const LSBLK_COLUMNS: &str = "NAME,TYPE,SIZE,MOUNTPOINT,MODEL,SERIAL,LABEL";

const PS_DISKS: &str =
    "Get-Disk | Select-Object Number,FriendlyName,SerialNumber,Size | ConvertTo-Json -Depth 3";
const PS_PARTITIONS: &str = "Get-Partition | Where-Object DriveLetter | Select-Object DiskNumber,DriveLetter | ConvertTo-Json -Depth 3";
const PS_VOLUMES: &str = "Get-Volume | Where-Object DriveLetter | Select-Object DriveLetter,FileSystemLabel,Size,SizeRemaining | ConvertTo-Json -Depth 3";
const PS_RELIABILITY: &str = "Get-PhysicalDisk | Get-StorageReliabilityCounter | Select-Object DeviceId,Temperature,TemperatureMax,PowerOnHours,LoadUnloadCycleCount,StartStopCycleCount,FlushLatencyMax,WriteLatencyMax,ReadLatencyMax | ConvertTo-Json -Depth 3";

/// Enumerates physical devices with their volumes and OS reliability counters.
pub trait DeviceSource {
    fn enumerate(&self) -> ProbeResult<Vec<DeviceDescriptor>>;
}

/// Enumeration through the platform's own tooling: `lsblk` on Linux and the
/// storage cmdlets of PowerShell on Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDeviceSource;

impl DeviceSource for SystemDeviceSource {
    fn enumerate(&self) -> ProbeResult<Vec<DeviceDescriptor>> {
        match env::consts::OS {
            "linux" => {
                let doc = run_json_command("lsblk", &["-J", "-b", "-o", LSBLK_COLUMNS])?;
                let mut devices = parse_lsblk(&doc);
                fill_free_space(&mut devices, &mounted_free_space());
                Ok(devices)
            }
            "windows" => {
                let disks = run_powershell_json(PS_DISKS)?;
                let partitions = optional_section(PS_PARTITIONS, "partitions");
                let volumes = optional_section(PS_VOLUMES, "volumes");
                let reliability = optional_section(PS_RELIABILITY, "reliability counters");
                Ok(parse_windows_inventory(
                    &disks,
                    &partitions,
                    &volumes,
                    &reliability,
                ))
            }
            other => Err(ProbeError::UnsupportedPlatform(other.to_string())),
        }
    }
}

pub fn parse_lsblk(doc: &Value) -> Vec<DeviceDescriptor> {
    records(doc.get("blockdevices").unwrap_or(&Value::Null))
        .into_iter()
        .filter(|dev| dev.get("type").and_then(Value::as_str) == Some("disk"))
        .filter_map(|dev| {
            let name = dev.get("name").and_then(non_empty_text)?;
            let volumes = records(dev.get("children").unwrap_or(&Value::Null))
                .into_iter()
                .filter(|child| child.get("type").and_then(Value::as_str) == Some("part"))
                .filter_map(|child| {
                    let mountpoint = child.get("mountpoint").and_then(non_empty_text)?;
                    Some(VolumeInfo {
                        mountpoint,
                        label: child.get("label").and_then(non_empty_text),
                        size_bytes: child.get("size").and_then(lenient_u64),
                        free_bytes: None,
                    })
                })
                .collect::<Vec<_>>();

            Some(DeviceDescriptor {
                device: format!("/dev/{name}"),
                model: dev.get("model").and_then(non_empty_text),
                serial: dev.get("serial").and_then(non_empty_text),
                size_bytes: dev.get("size").and_then(lenient_u64),
                volumes,
                os_counters: OsCounters::default(),
            })
        })
        .collect()
}

/// Joins the JSON output of `Get-Disk`, `Get-Partition`, `Get-Volume` and
/// `Get-StorageReliabilityCounter`. Each input may be a single object or an
/// array of objects.
pub fn parse_windows_inventory(
    disks: &Value,
    partitions: &Value,
    volumes: &Value,
    reliability: &Value,
) -> Vec<DeviceDescriptor> {
    let volumes_by_letter = records(volumes)
        .into_iter()
        .filter_map(|volume| {
            let letter = volume.get("DriveLetter").and_then(drive_letter)?;
            let info = VolumeInfo {
                mountpoint: normalize_windows_mount(&letter),
                label: volume.get("FileSystemLabel").and_then(non_empty_text),
                size_bytes: volume.get("Size").and_then(lenient_u64),
                free_bytes: volume.get("SizeRemaining").and_then(lenient_u64),
            };
            Some((letter, info))
        })
        .collect::<HashMap<_, _>>();

    let mut letters_by_disk: HashMap<u64, Vec<String>> = HashMap::new();
    for partition in records(partitions) {
        let (Some(disk), Some(letter)) = (
            partition.get("DiskNumber").and_then(lenient_u64),
            partition.get("DriveLetter").and_then(drive_letter),
        ) else {
            continue;
        };
        letters_by_disk.entry(disk).or_default().push(letter);
    }

    let counters_by_disk = records(reliability)
        .into_iter()
        .filter_map(|counter| {
            let disk = counter.get("DeviceId").and_then(lenient_u64)?;
            Some((disk, os_counters_from_reliability(counter)))
        })
        .collect::<HashMap<_, _>>();

    records(disks)
        .into_iter()
        .filter_map(|disk| {
            let number = disk.get("Number").and_then(lenient_u64)?;
            let volumes = letters_by_disk
                .get(&number)
                .map(|letters| {
                    letters
                        .iter()
                        .filter_map(|letter| volumes_by_letter.get(letter).cloned())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            Some(DeviceDescriptor {
                device: format!("//./PhysicalDrive{number}"),
                model: disk.get("FriendlyName").and_then(non_empty_text),
                serial: disk.get("SerialNumber").and_then(non_empty_text),
                size_bytes: disk.get("Size").and_then(lenient_u64),
                volumes,
                os_counters: counters_by_disk.get(&number).cloned().unwrap_or_default(),
            })
        })
        .collect()
}

fn os_counters_from_reliability(counter: &Value) -> OsCounters {
    OsCounters {
        temperature_c: counter.get("Temperature").and_then(lenient_i64),
        temperature_max_c: counter.get("TemperatureMax").and_then(lenient_i64),
        power_on_hours: counter.get("PowerOnHours").and_then(lenient_u64),
        load_cycle_count: counter.get("LoadUnloadCycleCount").and_then(lenient_u64),
        start_stop_count: counter.get("StartStopCycleCount").and_then(lenient_u64),
        flush_latency_max_ms: counter.get("FlushLatencyMax").and_then(lenient_u64),
        write_latency_max_ms: counter.get("WriteLatencyMax").and_then(lenient_u64),
        read_latency_max_ms: counter.get("ReadLatencyMax").and_then(lenient_u64),
    }
}

/// Fills volume free space from the mounted file systems sysinfo sees.
pub fn fill_free_space(devices: &mut [DeviceDescriptor], free_by_mount: &HashMap<String, u64>) {
    for volume in devices.iter_mut().flat_map(|device| device.volumes.iter_mut()) {
        if volume.free_bytes.is_none() {
            volume.free_bytes = free_by_mount.get(&volume.mountpoint).copied();
        }
    }
}

fn mounted_free_space() -> HashMap<String, u64> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .map(|disk| {
            (
                disk.mount_point().to_string_lossy().to_string(),
                disk.available_space(),
            )
        })
        .collect()
}

/// Treats a single JSON object as a one-element list, as PowerShell's
/// `ConvertTo-Json` collapses single-item arrays.
fn records(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().filter(|item| item.is_object()).collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

/// Windows PowerShell 5 serialises `[char]` drive letters as their code point.
fn drive_letter(value: &Value) -> Option<String> {
    let letter = match value {
        Value::Number(code) => code
            .as_u64()
            .and_then(|code| u8::try_from(code).ok())
            .map(char::from)?,
        _ => non_empty_text(value)?.chars().next()?,
    };
    letter
        .is_ascii_alphabetic()
        .then(|| letter.to_ascii_uppercase().to_string())
}

fn normalize_windows_mount(value: &str) -> String {
    let mut normalized = value.trim().replace('/', "\\");
    if normalized.len() == 1 {
        normalized.push(':');
    }
    if normalized.len() == 2 && normalized.ends_with(':') {
        normalized.push('\\');
    }
    normalized
}

/// Sections that may legitimately be empty; PowerShell prints nothing for an
/// empty pipeline.
fn optional_section(script: &str, what: &str) -> Value {
    run_powershell_json(script).unwrap_or_else(|err| {
        warn!("storage {} unavailable: {}", what, err);
        Value::Null
    })
}

fn run_powershell_json(script: &str) -> ProbeResult<Value> {
    run_json_command("powershell", &["-NoProfile", "-Command", script])
}

fn run_json_command(program: &str, args: &[&str]) -> ProbeResult<Value> {
    debug!("running {} {:?}", program, args);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| ProbeError::SourceUnavailable(format!("failed to run {program}: {err}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        return Err(ProbeError::SourceUnavailable(if stderr.is_empty() {
            format!("{program} returned no output")
        } else {
            stderr.to_string()
        }));
    }

    serde_json::from_str(&stdout).map_err(|err| {
        ProbeError::MalformedSource(format!("{program} returned invalid JSON: {err}"))
    })
}
