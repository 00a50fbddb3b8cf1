use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{DeviceReport, Report, VolumeInfo};

pub const CSV_HEADER: &[&str] = &[
    "device",
    "model",
    "serial",
    "size_bytes",
    "temperature_c",
    "temperature_max_c",
    "power_on_hours",
    "power_on_years",
    "load_cycle_count",
    "start_stop_count",
    "write_latency_max_ms",
    "flush_latency_max_ms",
    "read_latency_max_ms",
    "risk_level",
    "risk_score",
    "notes",
    "volume_mountpoint",
    "volume_label",
    "volume_size_bytes",
    "volume_free_bytes",
];

pub fn write_json_report(report: &Report, path: &Path) -> Result<()> {
    let payload = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(path, payload)
        .with_context(|| format!("failed to write report to {}", path.display()))
}

pub fn load_report(path: &Path) -> Result<Report> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

/// Flattens the report into CSV: one row per volume, or a single row with
/// empty volume columns for a device without volumes.
pub fn render_csv(report: &Report) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|column| column.to_string()));
    for device in &report.devices {
        if device.volumes.is_empty() {
            push_row(&mut out, device_row(device, None));
        } else {
            for volume in &device.volumes {
                push_row(&mut out, device_row(device, Some(volume)));
            }
        }
    }
    out
}

pub fn write_csv_report(report: &Report, path: &Path) -> Result<()> {
    fs::write(path, render_csv(report))
        .with_context(|| format!("failed to write CSV export to {}", path.display()))
}

fn device_row(device: &DeviceReport, volume: Option<&VolumeInfo>) -> Vec<String> {
    let metrics = &device.metrics;
    vec![
        device.device.clone(),
        text(&device.model),
        text(&device.serial),
        cell(device.size_bytes),
        cell(metrics.temperature_c),
        cell(metrics.temperature_max_c),
        cell(metrics.power_on_hours),
        cell(metrics.power_on_years),
        cell(metrics.load_cycle_count),
        cell(metrics.start_stop_count),
        cell(metrics.write_latency_max_ms),
        cell(metrics.flush_latency_max_ms),
        cell(metrics.read_latency_max_ms),
        device.risk.level.as_str().to_string(),
        device.risk.score.to_string(),
        device.risk.notes.clone(),
        volume
            .map(|volume| volume.mountpoint.clone())
            .unwrap_or_default(),
        volume.map(|volume| text(&volume.label)).unwrap_or_default(),
        cell(volume.and_then(|volume| volume.size_bytes)),
        cell(volume.and_then(|volume| volume.free_bytes)),
    ]
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let line = fields
        .into_iter()
        .map(|field| quote(&field))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
