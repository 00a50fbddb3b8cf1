use crate::model::{DeviceReport, Report, RiskLevel};

pub fn render_markdown_summary(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("# Disk Health Summary\n\n");
    out.push_str(&format!(
        "- Report version: `{}`\n- Generated at: `{}`\n- Scan id: `{}`\n- smartctl available: `{}`\n\n",
        report.report_version, report.generated_at, report.scan_id, report.smartctl_available
    ));

    out.push_str("## Devices\n\n");
    if report.devices.is_empty() {
        out.push_str("No devices detected.\n\n");
    } else {
        out.push_str("| Device | Model | Size | Temp | Power-on | Risk | Score |\n");
        out.push_str("|---|---|---|---|---|---|---|\n");
        for device in &report.devices {
            out.push_str(&format!(
                "| `{}` | {} | {} | {} | {} | {} | {} |\n",
                device.device,
                cell_text(device.model.as_deref().unwrap_or("-")),
                device
                    .size_bytes
                    .map(human_bytes)
                    .unwrap_or_else(|| "-".to_string()),
                device
                    .metrics
                    .temperature_c
                    .map(|temp| format!("{temp} C"))
                    .unwrap_or_else(|| "-".to_string()),
                power_on(device),
                device.risk.level.as_str(),
                device.risk.score
            ));
        }
        out.push('\n');
    }

    let flagged = report
        .devices
        .iter()
        .filter(|device| device.risk.level != RiskLevel::Ok)
        .collect::<Vec<_>>();
    out.push_str("## Findings\n\n");
    if flagged.is_empty() {
        out.push_str("No issues found.\n\n");
    } else {
        for device in flagged {
            out.push_str(&format!(
                "### `{}` ({})\n\n",
                device.device,
                device.risk.level.as_str()
            ));
            for reason in &device.risk.reasons {
                out.push_str(&format!("- {}\n", reason));
            }
            if !device.risk.recommendations.is_empty() {
                out.push_str(&format!(
                    "- Recommended: {}\n",
                    device.risk.recommendations.join("; ")
                ));
            }
            for volume in &device.volumes {
                out.push_str(&format!(
                    "- Volume `{}`{}: {} free of {}\n",
                    volume.mountpoint,
                    volume
                        .label
                        .as_deref()
                        .map(|label| format!(" ({label})"))
                        .unwrap_or_default(),
                    volume
                        .free_bytes
                        .map(human_bytes)
                        .unwrap_or_else(|| "?".to_string()),
                    volume
                        .size_bytes
                        .map(human_bytes)
                        .unwrap_or_else(|| "?".to_string())
                ));
            }
            out.push('\n');
        }
    }

    if !report.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for warning in &report.warnings {
            out.push_str(&format!("- {}\n", warning));
        }
    }

    out
}

fn power_on(device: &DeviceReport) -> String {
    match (device.metrics.power_on_hours, device.metrics.power_on_years) {
        (Some(hours), Some(years)) => format!("{hours} h ({years:.2} y)"),
        (Some(hours), None) => format!("{hours} h"),
        _ => "-".to_string(),
    }
}

fn cell_text(value: &str) -> String {
    value.replace('|', "\\|")
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
