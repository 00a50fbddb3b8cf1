use crate::model::{HealthMetrics, OsCounters};

/// Combines SMART-reported (`primary`) and OS-reported (`secondary`) metrics.
///
/// `primary` wins wherever it has a value and `secondary` fills the gaps,
/// except for the pass/fail flag and the sector/error/warning counters, which
/// only mean something when they come from the diagnostic protocol and are
/// therefore never backfilled.
pub fn merge_metrics(
    primary: Option<HealthMetrics>,
    secondary: Option<HealthMetrics>,
) -> Option<HealthMetrics> {
    let (primary, secondary) = match (primary, secondary) {
        (Some(primary), Some(secondary)) => (primary, secondary),
        (primary, None) => return primary,
        (None, secondary) => return secondary,
    };

    Some(HealthMetrics {
        passed: primary.passed,
        temperature_c: primary.temperature_c.or(secondary.temperature_c),
        temperature_max_c: primary.temperature_max_c.or(secondary.temperature_max_c),
        power_on_hours: primary.power_on_hours.or(secondary.power_on_hours),
        load_cycle_count: primary.load_cycle_count.or(secondary.load_cycle_count),
        start_stop_count: primary.start_stop_count.or(secondary.start_stop_count),
        power_cycle_count: primary.power_cycle_count.or(secondary.power_cycle_count),
        reallocated_sectors: primary.reallocated_sectors,
        pending_sectors: primary.pending_sectors,
        uncorrectable_sectors: primary.uncorrectable_sectors,
        media_errors: primary.media_errors,
        error_log_entries: primary.error_log_entries,
        critical_warning: primary.critical_warning,
        flush_latency_max_ms: primary.flush_latency_max_ms.or(secondary.flush_latency_max_ms),
        write_latency_max_ms: primary.write_latency_max_ms.or(secondary.write_latency_max_ms),
        read_latency_max_ms: primary.read_latency_max_ms.or(secondary.read_latency_max_ms),
    })
}

/// OS reliability counters as a metric set, or `None` when the OS reported
/// nothing for this device.
pub fn os_metrics(counters: &OsCounters) -> Option<HealthMetrics> {
    let metrics = HealthMetrics {
        temperature_c: counters.temperature_c,
        temperature_max_c: counters.temperature_max_c,
        power_on_hours: counters.power_on_hours,
        load_cycle_count: counters.load_cycle_count,
        start_stop_count: counters.start_stop_count,
        flush_latency_max_ms: counters.flush_latency_max_ms,
        write_latency_max_ms: counters.write_latency_max_ms,
        read_latency_max_ms: counters.read_latency_max_ms,
        ..HealthMetrics::default()
    };
    if metrics.is_empty() {
        None
    } else {
        Some(metrics)
    }
}
