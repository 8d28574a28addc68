// src/analysis/summary.rs
//
// Session-level aggregation of reconciled anomalies plus the single
// free-text recommendation shown at the top of a coaching report.

use serde::Serialize;
use std::collections::BTreeMap;

use super::reconciler::{AnomalyClass, ReconciledAnomaly};

/// Severity above which an anomaly counts as high severity.
const HIGH_SEVERITY: f64 = 5.0;

#[derive(Debug, Clone, Serialize)]
pub struct AnomalySummary {
    pub total_anomalies: usize,
    pub severity_avg: f64,
    pub severity_max: f64,
    pub high_severity_count: usize,
    pub signals_affected: Vec<String>,
    pub classification_counts: BTreeMap<String, usize>,
    pub recommendation: String,
}

/// Aggregate a driver's anomaly list. An empty list yields zeroed stats and
/// the fixed "all clear" message.
pub fn summarize(anomalies: &[ReconciledAnomaly]) -> AnomalySummary {
    if anomalies.is_empty() {
        return AnomalySummary {
            total_anomalies: 0,
            severity_avg: 0.0,
            severity_max: 0.0,
            high_severity_count: 0,
            signals_affected: Vec::new(),
            classification_counts: BTreeMap::new(),
            recommendation: "No anomalies detected. Performance is consistent.".to_string(),
        };
    }

    let severity_avg =
        anomalies.iter().map(|a| a.severity).sum::<f64>() / anomalies.len() as f64;
    let severity_max = anomalies
        .iter()
        .map(|a| a.severity)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut classification_counts = BTreeMap::new();
    for a in anomalies {
        *classification_counts
            .entry(a.classification.as_str().to_string())
            .or_insert(0) += 1;
    }

    let mut signals_affected: Vec<String> = Vec::new();
    for a in anomalies {
        if !signals_affected.contains(&a.signal) {
            signals_affected.push(a.signal.clone());
        }
    }

    AnomalySummary {
        total_anomalies: anomalies.len(),
        severity_avg,
        severity_max,
        high_severity_count: anomalies.iter().filter(|a| a.severity > HIGH_SEVERITY).count(),
        signals_affected,
        classification_counts,
        recommendation: overall_recommendation(anomalies, severity_avg),
    }
}

/// Rule cascade on the dominant classification and mean severity. Ties on
/// classification counts resolve toward driver mistakes, then degradation.
fn overall_recommendation(anomalies: &[ReconciledAnomaly], severity_avg: f64) -> String {
    // max_by_key keeps the last maximum, so list the preferred class last
    let dominant_class = [
        AnomalyClass::Compound,
        AnomalyClass::Degradation,
        AnomalyClass::DriverMistake,
    ]
    .into_iter()
    .max_by_key(|class| {
        anomalies
            .iter()
            .filter(|a| a.classification == *class)
            .count()
    })
    .expect("candidate classes are non-empty");

    let mut signal_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for a in anomalies {
        *signal_counts.entry(a.signal.as_str()).or_insert(0) += 1;
    }
    let dominant_signal = signal_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(signal, _)| signal.to_string())
        .unwrap_or_default();

    match dominant_class {
        AnomalyClass::DriverMistake => {
            if severity_avg > 7.0 {
                format!(
                    "Critical: Focus immediately on {dominant_signal} technique. Multiple driver errors detected."
                )
            } else if severity_avg > 4.0 {
                format!(
                    "Important: Improve {dominant_signal} consistency. Driver technique issues identified."
                )
            } else {
                format!("Minor technique adjustments needed in {dominant_signal} control.")
            }
        }
        AnomalyClass::Degradation => {
            if severity_avg > 6.0 {
                format!(
                    "Equipment attention required: {dominant_signal} showing significant degradation."
                )
            } else {
                format!(
                    "Monitor {dominant_signal} performance trends. Early degradation detected."
                )
            }
        }
        AnomalyClass::Compound => {
            format!("Address both technique and equipment issues in {dominant_signal}.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::reconciler::recommendation;

    fn anomaly(class: AnomalyClass, severity: f64, signal: &str) -> ReconciledAnomaly {
        ReconciledAnomaly {
            timestamp: 0.0,
            classification: class,
            severity,
            signal: signal.to_string(),
            description: String::new(),
            recommended_action: recommendation(class, signal),
            contributing: Vec::new(),
        }
    }

    #[test]
    fn test_empty_list_yields_fixed_message() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_anomalies, 0);
        assert_eq!(summary.severity_avg, 0.0);
        assert_eq!(
            summary.recommendation,
            "No anomalies detected. Performance is consistent."
        );
    }

    #[test]
    fn test_counts_and_stats() {
        let anomalies = vec![
            anomaly(AnomalyClass::DriverMistake, 8.0, "brake"),
            anomaly(AnomalyClass::DriverMistake, 6.0, "brake"),
            anomaly(AnomalyClass::Degradation, 2.0, "speed"),
        ];
        let summary = summarize(&anomalies);
        assert_eq!(summary.total_anomalies, 3);
        assert!((summary.severity_avg - 16.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.severity_max, 8.0);
        assert_eq!(summary.high_severity_count, 2);
        assert_eq!(summary.signals_affected, vec!["brake", "speed"]);
        assert_eq!(summary.classification_counts["driver_mistake"], 2);
        assert_eq!(summary.classification_counts["degradation"], 1);
    }

    #[test]
    fn test_driver_mistake_tiers() {
        let critical = summarize(&[anomaly(AnomalyClass::DriverMistake, 8.0, "brake")]);
        assert!(critical.recommendation.starts_with("Critical:"));

        let important = summarize(&[anomaly(AnomalyClass::DriverMistake, 5.0, "brake")]);
        assert!(important.recommendation.starts_with("Important:"));

        let minor = summarize(&[anomaly(AnomalyClass::DriverMistake, 2.0, "brake")]);
        assert!(minor.recommendation.starts_with("Minor technique"));
    }

    #[test]
    fn test_degradation_tiers() {
        let urgent = summarize(&[anomaly(AnomalyClass::Degradation, 7.0, "speed")]);
        assert!(urgent.recommendation.starts_with("Equipment attention required"));

        let early = summarize(&[anomaly(AnomalyClass::Degradation, 3.0, "speed")]);
        assert!(early.recommendation.starts_with("Monitor speed"));
    }

    #[test]
    fn test_compound_message() {
        let summary = summarize(&[anomaly(AnomalyClass::Compound, 5.0, "throttle")]);
        assert_eq!(
            summary.recommendation,
            "Address both technique and equipment issues in throttle."
        );
    }

    #[test]
    fn test_tie_resolves_to_driver_mistake() {
        let anomalies = vec![
            anomaly(AnomalyClass::Degradation, 3.0, "speed"),
            anomaly(AnomalyClass::DriverMistake, 3.0, "brake"),
        ];
        let summary = summarize(&anomalies);
        assert!(summary.recommendation.contains("technique"));
    }
}
