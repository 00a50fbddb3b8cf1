use tracing::debug;

use crate::model::{HealthMetrics, RiskAssessment, RiskLevel};

const MAX_SCORE: u32 = 100;
const CRITICAL_SCORE: u32 = 70;
const WARNING_SCORE: u32 = 40;
const COOLING_TEMPERATURE_C: i64 = 55;

const CRITICAL_RECOMMENDATIONS: &[&str] = &["Back up data immediately", "Plan drive replacement"];
const WARNING_RECOMMENDATIONS: &[&str] = &["Back up important data soon", "Monitor SMART attributes"];
const OK_RECOMMENDATIONS: &[&str] = &["No immediate action needed"];
const COOLING_RECOMMENDATION: &str = "Improve cooling or airflow";

#[derive(Debug, Clone, Copy)]
struct RuleHit {
    points: u32,
    reason: &'static str,
}

struct RiskRule {
    id: &'static str,
    evaluate: fn(&HealthMetrics) -> Option<RuleHit>,
}

/// Evaluated in order; the order fixes the order of reasons in the report.
const RISK_RULES: &[RiskRule] = &[
    RiskRule {
        id: "health_check_failed",
        evaluate: health_check_failed,
    },
    RiskRule {
        id: "reallocated_sectors",
        evaluate: |m| at_least(m.reallocated_sectors, 1, 30, "reallocated sectors detected"),
    },
    RiskRule {
        id: "pending_sectors",
        evaluate: |m| at_least(m.pending_sectors, 1, 40, "pending sectors detected"),
    },
    RiskRule {
        id: "uncorrectable_sectors",
        evaluate: |m| at_least(m.uncorrectable_sectors, 1, 40, "uncorrectable sectors detected"),
    },
    RiskRule {
        id: "media_errors",
        evaluate: |m| at_least(m.media_errors, 1, 40, "media errors detected"),
    },
    RiskRule {
        id: "error_log_entries",
        evaluate: |m| at_least(m.error_log_entries, 1, 10, "error log entries detected"),
    },
    RiskRule {
        id: "critical_warning",
        evaluate: |m| at_least(m.critical_warning, 1, 50, "critical warning flag set"),
    },
    RiskRule {
        id: "temperature",
        evaluate: temperature,
    },
    RiskRule {
        id: "temperature_max",
        evaluate: |m| at_least(m.temperature_max_c, 70, 15, "max temperature high (>= 70C)"),
    },
    RiskRule {
        id: "start_stop_count",
        evaluate: start_stop_count,
    },
    RiskRule {
        id: "load_cycle_count",
        evaluate: |m| {
            at_least(
                m.load_cycle_count,
                300_000,
                20,
                "high load/unload count (>= 300000)",
            )
        },
    },
    RiskRule {
        id: "write_latency",
        evaluate: |m| {
            at_least(
                m.write_latency_max_ms,
                1_000,
                20,
                "high write latency (>= 1000 ms)",
            )
        },
    },
    RiskRule {
        id: "flush_latency",
        evaluate: |m| {
            at_least(
                m.flush_latency_max_ms,
                1_000,
                20,
                "high flush latency (>= 1000 ms)",
            )
        },
    },
    RiskRule {
        id: "read_latency",
        evaluate: |m| {
            at_least(
                m.read_latency_max_ms,
                1_000,
                15,
                "high read latency (>= 1000 ms)",
            )
        },
    },
];

/// Scores a merged metric set. Absent fields never trigger their rule.
pub fn evaluate_risk(metrics: &HealthMetrics) -> RiskAssessment {
    let mut score = 0_u32;
    let mut reasons = Vec::new();

    for rule in RISK_RULES {
        if let Some(hit) = (rule.evaluate)(metrics) {
            debug!("risk rule {} triggered (+{})", rule.id, hit.points);
            score = score.saturating_add(hit.points);
            reasons.push(hit.reason.to_string());
        }
    }

    let score = score.min(MAX_SCORE);
    let level = level_for_score(score);
    let mut recommendations = match level {
        RiskLevel::Critical => CRITICAL_RECOMMENDATIONS,
        RiskLevel::Warning => WARNING_RECOMMENDATIONS,
        _ => OK_RECOMMENDATIONS,
    }
    .iter()
    .map(|text| text.to_string())
    .collect::<Vec<_>>();

    if metrics
        .temperature_c
        .is_some_and(|value| value >= COOLING_TEMPERATURE_C)
    {
        recommendations.push(COOLING_RECOMMENDATION.to_string());
    }

    RiskAssessment {
        score,
        level,
        reasons,
        recommendations,
    }
}

pub fn level_for_score(score: u32) -> RiskLevel {
    if score >= CRITICAL_SCORE {
        RiskLevel::Critical
    } else if score >= WARNING_SCORE {
        RiskLevel::Warning
    } else {
        RiskLevel::Ok
    }
}

fn health_check_failed(metrics: &HealthMetrics) -> Option<RuleHit> {
    (metrics.passed == Some(false)).then_some(RuleHit {
        points: 70,
        reason: "overall health check failed",
    })
}

fn temperature(metrics: &HealthMetrics) -> Option<RuleHit> {
    at_least(metrics.temperature_c, 60, 20, "high temperature (>= 60C)").or_else(|| {
        at_least(
            metrics.temperature_c,
            COOLING_TEMPERATURE_C,
            10,
            "elevated temperature (>= 55C)",
        )
    })
}

fn start_stop_count(metrics: &HealthMetrics) -> Option<RuleHit> {
    at_least(
        metrics.start_stop_count,
        65_000,
        25,
        "start/stop count saturated (>= 65000)",
    )
    .or_else(|| {
        at_least(
            metrics.start_stop_count,
            50_000,
            15,
            "high start/stop count (>= 50000)",
        )
    })
}

fn at_least<T: PartialOrd>(
    value: Option<T>,
    threshold: T,
    points: u32,
    reason: &'static str,
) -> Option<RuleHit> {
    value
        .filter(|value| *value >= threshold)
        .map(|_| RuleHit { points, reason })
}

#[cfg(test)]
mod tests {
    use super::{evaluate_risk, level_for_score};
    use crate::model::{HealthMetrics, RiskLevel};

    #[test]
    fn failed_health_check_alone_is_critical() {
        let risk = evaluate_risk(&HealthMetrics {
            passed: Some(false),
            ..HealthMetrics::default()
        });
        assert_eq!(risk.score, 70);
        assert_eq!(risk.level, RiskLevel::Critical);
        assert_eq!(risk.reasons, vec!["overall health check failed"]);
        assert_eq!(
            risk.recommendations,
            vec!["Back up data immediately", "Plan drive replacement"]
        );
    }

    #[test]
    fn high_temperature_alone_stays_ok_with_cooling_note() {
        let risk = evaluate_risk(&HealthMetrics {
            temperature_c: Some(62),
            ..HealthMetrics::default()
        });
        assert_eq!(risk.score, 20);
        assert_eq!(risk.level, RiskLevel::Ok);
        assert_eq!(risk.reasons, vec!["high temperature (>= 60C)"]);
        assert_eq!(
            risk.recommendations,
            vec!["No immediate action needed", "Improve cooling or airflow"]
        );
    }

    #[test]
    fn temperature_ladder_fires_only_one_band() {
        let elevated = evaluate_risk(&HealthMetrics {
            temperature_c: Some(55),
            ..HealthMetrics::default()
        });
        assert_eq!(elevated.score, 10);
        assert_eq!(elevated.reasons, vec!["elevated temperature (>= 55C)"]);
        assert!(elevated
            .recommendations
            .contains(&"Improve cooling or airflow".to_string()));

        let cool = evaluate_risk(&HealthMetrics {
            temperature_c: Some(54),
            ..HealthMetrics::default()
        });
        assert_eq!(cool.score, 0);
        assert!(cool.reasons.is_empty());
        assert_eq!(cool.recommendations, vec!["No immediate action needed"]);
    }

    #[test]
    fn sector_counters_accumulate() {
        let risk = evaluate_risk(&HealthMetrics {
            reallocated_sectors: Some(3),
            pending_sectors: Some(2),
            ..HealthMetrics::default()
        });
        assert_eq!(risk.score, 70);
        assert_eq!(risk.level, RiskLevel::Critical);
        assert_eq!(
            risk.reasons,
            vec!["reallocated sectors detected", "pending sectors detected"]
        );
    }

    #[test]
    fn zero_counters_do_not_trigger() {
        let risk = evaluate_risk(&HealthMetrics {
            passed: Some(true),
            reallocated_sectors: Some(0),
            pending_sectors: Some(0),
            uncorrectable_sectors: Some(0),
            media_errors: Some(0),
            error_log_entries: Some(0),
            critical_warning: Some(0),
            ..HealthMetrics::default()
        });
        assert_eq!(risk.score, 0);
        assert_eq!(risk.level, RiskLevel::Ok);
        assert!(risk.reasons.is_empty());
    }

    #[test]
    fn start_stop_ladder_and_warning_level() {
        let saturated = evaluate_risk(&HealthMetrics {
            start_stop_count: Some(65_535),
            error_log_entries: Some(4),
            write_latency_max_ms: Some(1_500),
            ..HealthMetrics::default()
        });
        assert_eq!(saturated.score, 55);
        assert_eq!(saturated.level, RiskLevel::Warning);
        assert_eq!(
            saturated.reasons,
            vec![
                "error log entries detected",
                "start/stop count saturated (>= 65000)",
                "high write latency (>= 1000 ms)",
            ]
        );
        assert_eq!(
            saturated.recommendations,
            vec!["Back up important data soon", "Monitor SMART attributes"]
        );

        let high = evaluate_risk(&HealthMetrics {
            start_stop_count: Some(50_000),
            ..HealthMetrics::default()
        });
        assert_eq!(high.score, 15);
        assert_eq!(high.reasons, vec!["high start/stop count (>= 50000)"]);
    }

    #[test]
    fn score_is_capped_at_one_hundred() {
        let metrics = HealthMetrics {
            passed: Some(false),
            temperature_c: Some(75),
            temperature_max_c: Some(80),
            power_on_hours: Some(50_000),
            load_cycle_count: Some(400_000),
            start_stop_count: Some(70_000),
            power_cycle_count: Some(10),
            reallocated_sectors: Some(10),
            pending_sectors: Some(10),
            uncorrectable_sectors: Some(10),
            media_errors: Some(10),
            error_log_entries: Some(10),
            critical_warning: Some(1),
            flush_latency_max_ms: Some(5_000),
            write_latency_max_ms: Some(5_000),
            read_latency_max_ms: Some(5_000),
        };
        let risk = evaluate_risk(&metrics);
        assert_eq!(risk.score, 100);
        assert_eq!(risk.level, RiskLevel::Critical);
        assert_eq!(risk.reasons.len(), 14);
        assert_eq!(risk.reasons.first().map(String::as_str), Some("overall health check failed"));
        assert_eq!(risk.reasons.last().map(String::as_str), Some("high read latency (>= 1000 ms)"));
        assert_eq!(
            risk.recommendations,
            vec![
                "Back up data immediately",
                "Plan drive replacement",
                "Improve cooling or airflow",
            ]
        );
    }

    #[test]
    fn adding_a_condition_never_lowers_the_score() {
        let mut metrics = HealthMetrics::default();
        let mut previous = evaluate_risk(&metrics).score;
        let steps: [fn(&mut HealthMetrics); 6] = [
            |m| m.read_latency_max_ms = Some(1_000),
            |m| m.load_cycle_count = Some(300_000),
            |m| m.temperature_max_c = Some(70),
            |m| m.media_errors = Some(1),
            |m| m.critical_warning = Some(2),
            |m| m.passed = Some(false),
        ];
        for step in steps {
            step(&mut metrics);
            let score = evaluate_risk(&metrics).score;
            assert!(score >= previous);
            assert!(score <= 100);
            previous = score;
        }
        assert_eq!(evaluate_risk(&metrics), evaluate_risk(&metrics));
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(level_for_score(0), RiskLevel::Ok);
        assert_eq!(level_for_score(39), RiskLevel::Ok);
        assert_eq!(level_for_score(40), RiskLevel::Warning);
        assert_eq!(level_for_score(69), RiskLevel::Warning);
        assert_eq!(level_for_score(70), RiskLevel::Critical);
        assert_eq!(level_for_score(100), RiskLevel::Critical);
    }
}
