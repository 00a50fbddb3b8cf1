//! Extraction of [`HealthMetrics`] and [`DeviceIdentity`] from smartctl JSON
//! documents.
//!
//! Every lookup is absent-safe: a missing section, a wrongly typed value or an
//! unparseable number yields `None` for that field and never an error.

use serde_json::Value;

use crate::model::{DeviceIdentity, HealthMetrics};

const ATA_ATTRIBUTES_KEY: &str = "ata_smart_attributes";
const NVME_LOG_KEY: &str = "nvme_smart_health_information_log";

const ATA_TEMPERATURE_IDS: [u64; 2] = [190, 194];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtaCounter {
    ReallocatedSectors,
    PowerOnHours,
    LoadCycleCount,
    StartStopCount,
    PowerCycleCount,
    PendingSectors,
    UncorrectableSectors,
}

const ATA_COUNTERS: &[(u64, AtaCounter)] = &[
    (5, AtaCounter::ReallocatedSectors),
    (9, AtaCounter::PowerOnHours),
    (193, AtaCounter::LoadCycleCount),
    (4, AtaCounter::StartStopCount),
    (12, AtaCounter::PowerCycleCount),
    (197, AtaCounter::PendingSectors),
    (198, AtaCounter::UncorrectableSectors),
];

impl AtaCounter {
    fn for_id(id: u64) -> Option<Self> {
        ATA_COUNTERS
            .iter()
            .find(|(attr_id, _)| *attr_id == id)
            .map(|(_, counter)| *counter)
    }

    fn slot(self, metrics: &mut HealthMetrics) -> &mut Option<u64> {
        match self {
            AtaCounter::ReallocatedSectors => &mut metrics.reallocated_sectors,
            AtaCounter::PowerOnHours => &mut metrics.power_on_hours,
            AtaCounter::LoadCycleCount => &mut metrics.load_cycle_count,
            AtaCounter::StartStopCount => &mut metrics.start_stop_count,
            AtaCounter::PowerCycleCount => &mut metrics.power_cycle_count,
            AtaCounter::PendingSectors => &mut metrics.pending_sectors,
            AtaCounter::UncorrectableSectors => &mut metrics.uncorrectable_sectors,
        }
    }
}

/// True when the document carries any SMART/NVMe health section, as opposed to
/// a bare identity answer from a handle that cannot be queried for health.
pub fn has_smart_fields(doc: &Value) -> bool {
    [ATA_ATTRIBUTES_KEY, NVME_LOG_KEY, "smart_status", "temperature"]
        .iter()
        .any(|key| doc.get(key).is_some())
}

pub fn extract_metrics(doc: &Value) -> HealthMetrics {
    let mut metrics = HealthMetrics {
        passed: doc
            .get("smart_status")
            .and_then(|status| status.get("passed"))
            .and_then(Value::as_bool),
        temperature_c: doc
            .get("temperature")
            .and_then(|temperature| temperature.get("current"))
            .and_then(lenient_i64),
        ..HealthMetrics::default()
    };

    let table = ata_table(doc);
    if metrics.temperature_c.is_none() {
        metrics.temperature_c = ATA_TEMPERATURE_IDS.iter().find_map(|id| {
            table
                .iter()
                .rev()
                .find(|attr| attribute_id(attr) == Some(*id))
                .and_then(attribute_value)
                .and_then(|value| i64::try_from(value).ok())
        });
    }

    for attr in table {
        let Some(counter) = attribute_id(attr).and_then(AtaCounter::for_id) else {
            continue;
        };
        *counter.slot(&mut metrics) = attribute_value(attr);
    }

    if let Some(nvme) = doc.get(NVME_LOG_KEY).filter(|log| log.is_object()) {
        metrics.media_errors = nvme.get("media_errors").and_then(lenient_u64);
        metrics.error_log_entries = nvme.get("num_err_log_entries").and_then(lenient_u64);
        metrics.critical_warning = nvme.get("critical_warning").and_then(lenient_u64);
        if metrics.temperature_c.is_none() {
            metrics.temperature_c = nvme.get("temperature").and_then(lenient_i64);
        }
        if metrics.power_on_hours.is_none() {
            metrics.power_on_hours = nvme.get("power_on_hours").and_then(|value| {
                match value.get("hours") {
                    Some(hours) => lenient_u64(hours),
                    None => lenient_u64(value),
                }
            });
        }
    }

    metrics
}

pub fn extract_identity(doc: &Value) -> DeviceIdentity {
    let model = doc
        .get("model_name")
        .and_then(non_empty_text)
        .or_else(|| doc.get("model_number").and_then(non_empty_text));
    DeviceIdentity {
        model,
        serial: doc.get("serial_number").and_then(non_empty_text),
        size_bytes: doc
            .get("user_capacity")
            .and_then(|capacity| capacity.get("bytes"))
            .and_then(lenient_u64),
    }
}

fn ata_table(doc: &Value) -> &[Value] {
    doc.get(ATA_ATTRIBUTES_KEY)
        .and_then(|attrs| attrs.get("table"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn attribute_id(attr: &Value) -> Option<u64> {
    attr.get("id").and_then(Value::as_u64)
}

/// Raw counter of an ATA attribute: either `raw` itself or `raw.value`.
fn attribute_value(attr: &Value) -> Option<u64> {
    let raw = attr.get("raw")?;
    if raw.is_object() {
        raw.get("value").and_then(lenient_u64)
    } else {
        lenient_u64(raw)
    }
}

/// Accepts non-negative integers, non-negative floats (truncated) and numeric
/// strings.
pub(crate) fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.is_finite() && *float >= 0.0)
                .map(|float| float.trunc() as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

pub(crate) fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.is_finite() && float.abs() < i64::MAX as f64)
                .map(|float| float.trunc() as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn non_empty_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_identity, extract_metrics, has_smart_fields};
    use crate::model::HealthMetrics;

    #[test]
    fn extracts_ata_attribute_table() {
        let doc = json!({
            "smart_status": { "passed": true },
            "ata_smart_attributes": { "table": [
                { "id": 5, "raw": { "value": 8, "string": "8" } },
                { "id": 9, "raw": { "value": 21_000, "string": "21000" } },
                { "id": 4, "raw": { "value": 1_200 } },
                { "id": 12, "raw": { "value": 1_150 } },
                { "id": 193, "raw": { "value": 40_000 } },
                { "id": 194, "raw": { "value": 38, "string": "38 (Min/Max 20/51)" } },
                { "id": 197, "raw": { "value": 0 } },
                { "id": 198, "raw": { "value": 0 } }
            ]}
        });

        let metrics = extract_metrics(&doc);
        assert_eq!(metrics.passed, Some(true));
        assert_eq!(metrics.reallocated_sectors, Some(8));
        assert_eq!(metrics.power_on_hours, Some(21_000));
        assert_eq!(metrics.start_stop_count, Some(1_200));
        assert_eq!(metrics.power_cycle_count, Some(1_150));
        assert_eq!(metrics.load_cycle_count, Some(40_000));
        assert_eq!(metrics.temperature_c, Some(38));
        assert_eq!(metrics.pending_sectors, Some(0));
        assert_eq!(metrics.uncorrectable_sectors, Some(0));
        assert_eq!(metrics.media_errors, None);
        assert_eq!(metrics.temperature_max_c, None);
        assert_eq!(metrics.write_latency_max_ms, None);
    }

    #[test]
    fn direct_temperature_wins_over_attribute_table() {
        let doc = json!({
            "temperature": { "current": 33 },
            "ata_smart_attributes": { "table": [
                { "id": 194, "raw": { "value": 50 } }
            ]}
        });
        assert_eq!(extract_metrics(&doc).temperature_c, Some(33));
    }

    #[test]
    fn attribute_190_is_preferred_over_194() {
        let doc = json!({
            "ata_smart_attributes": { "table": [
                { "id": 194, "raw": { "value": 45 } },
                { "id": 190, "raw": { "value": 44 } }
            ]}
        });
        assert_eq!(extract_metrics(&doc).temperature_c, Some(44));

        let only_unparseable_190 = json!({
            "ata_smart_attributes": { "table": [
                { "id": 190, "raw": { "value": "n/a" } },
                { "id": 194, "raw": { "value": 47 } }
            ]}
        });
        assert_eq!(extract_metrics(&only_unparseable_190).temperature_c, Some(47));
    }

    #[test]
    fn plain_raw_values_and_numeric_strings_are_accepted() {
        let doc = json!({
            "ata_smart_attributes": { "table": [
                { "id": 5, "raw": 3 },
                { "id": 197, "raw": "12" },
                { "id": 198, "raw": { "value": "garbage" } },
                { "id": 9, "raw": [1, 2] }
            ]}
        });
        let metrics = extract_metrics(&doc);
        assert_eq!(metrics.reallocated_sectors, Some(3));
        assert_eq!(metrics.pending_sectors, Some(12));
        assert_eq!(metrics.uncorrectable_sectors, None);
        assert_eq!(metrics.power_on_hours, None);
    }

    #[test]
    fn negative_counters_are_absent_and_fractions_truncate() {
        let doc = json!({
            "ata_smart_attributes": { "table": [
                { "id": 5, "raw": { "value": -3 } },
                { "id": 197, "raw": { "value": 2.7 } },
                { "id": 198, "raw": "-1" },
                { "id": 9, "raw": { "value": 100 } }
            ]},
            "nvme_smart_health_information_log": {
                "power_on_hours": 999,
                "media_errors": -1,
                "num_err_log_entries": 4.9
            }
        });
        let metrics = extract_metrics(&doc);
        assert_eq!(metrics.reallocated_sectors, None);
        assert_eq!(metrics.pending_sectors, Some(2));
        assert_eq!(metrics.uncorrectable_sectors, None);
        assert_eq!(metrics.media_errors, None);
        assert_eq!(metrics.error_log_entries, Some(4));
        assert_eq!(metrics.power_on_hours, Some(100));
    }

    #[test]
    fn nvme_power_on_hours_fill_only_when_unset() {
        let doc = json!({
            "nvme_smart_health_information_log": { "power_on_hours": 999 }
        });
        assert_eq!(extract_metrics(&doc).power_on_hours, Some(999));

        let with_ata = json!({
            "ata_smart_attributes": { "table": [
                { "id": 9, "raw": { "value": 100 } }
            ]},
            "nvme_smart_health_information_log": { "power_on_hours": 999 }
        });
        assert_eq!(extract_metrics(&with_ata).power_on_hours, Some(100));
    }

    #[test]
    fn temperatures_keep_their_sign() {
        let doc = json!({ "temperature": { "current": -5 } });
        assert_eq!(extract_metrics(&doc).temperature_c, Some(-5));
    }

    #[test]
    fn extracts_nvme_health_log() {
        let doc = json!({
            "smart_status": { "passed": false },
            "nvme_smart_health_information_log": {
                "critical_warning": 4,
                "temperature": 52,
                "power_on_hours": 9_876,
                "media_errors": 2,
                "num_err_log_entries": 17
            }
        });
        let metrics = extract_metrics(&doc);
        assert_eq!(metrics.passed, Some(false));
        assert_eq!(metrics.critical_warning, Some(4));
        assert_eq!(metrics.temperature_c, Some(52));
        assert_eq!(metrics.power_on_hours, Some(9_876));
        assert_eq!(metrics.media_errors, Some(2));
        assert_eq!(metrics.error_log_entries, Some(17));
    }

    #[test]
    fn nvme_power_on_hours_may_be_nested() {
        let doc = json!({
            "temperature": { "current": 30 },
            "nvme_smart_health_information_log": {
                "temperature": 70,
                "power_on_hours": { "hours": 512 }
            }
        });
        let metrics = extract_metrics(&doc);
        assert_eq!(metrics.temperature_c, Some(30));
        assert_eq!(metrics.power_on_hours, Some(512));
    }

    #[test]
    fn malformed_sections_degrade_to_absence() {
        for doc in [
            json!({}),
            json!(null),
            json!([1, 2, 3]),
            json!({ "smart_status": "ok", "temperature": 40 }),
            json!({ "ata_smart_attributes": { "table": "oops" } }),
            json!({ "ata_smart_attributes": [] }),
            json!({ "nvme_smart_health_information_log": 5 }),
        ] {
            assert_eq!(extract_metrics(&doc), HealthMetrics::default(), "{doc}");
        }
    }

    #[test]
    fn extraction_is_repeatable() {
        let doc: serde_json::Value =
            serde_json::from_str(include_str!("../../../fixtures/smartctl-ata.json"))
                .expect("fixture parses");
        assert_eq!(extract_metrics(&doc), extract_metrics(&doc));
        assert_eq!(extract_identity(&doc), extract_identity(&doc));
    }

    #[test]
    fn extracts_identity_with_model_number_fallback() {
        let ata = json!({
            "model_name": "  ST2000DM008-2FR102 ",
            "serial_number": "ZFL1ABCD",
            "user_capacity": { "blocks": 3_907_029_168_u64, "bytes": 2_000_398_934_016_u64 }
        });
        let identity = extract_identity(&ata);
        assert_eq!(identity.model.as_deref(), Some("ST2000DM008-2FR102"));
        assert_eq!(identity.serial.as_deref(), Some("ZFL1ABCD"));
        assert_eq!(identity.size_bytes, Some(2_000_398_934_016));

        let nvme = json!({ "model_number": "Samsung SSD 980 PRO 1TB", "user_capacity": 7 });
        let identity = extract_identity(&nvme);
        assert_eq!(identity.model.as_deref(), Some("Samsung SSD 980 PRO 1TB"));
        assert_eq!(identity.serial, None);
        assert_eq!(identity.size_bytes, None);
    }

    #[test]
    fn detects_smart_sections() {
        assert!(has_smart_fields(&json!({ "smart_status": { "passed": true } })));
        assert!(has_smart_fields(&json!({ "nvme_smart_health_information_log": {} })));
        assert!(!has_smart_fields(&json!({ "model_name": "X", "device": {} })));
        assert!(!has_smart_fields(&json!(null)));
    }
}
