// src/analysis/reconciler.rs
//
// Merges slow-path and fast-path candidates for one signal into classified
// anomalies:
//   fast spike + no nearby drift  -> driver mistake
//   drift + no nearby spike       -> equipment degradation
//   both within the window        -> compound issue
//
// The temporal window is measured in samples at the configured sample rate;
// both paths stamp candidates with sample indices, so the comparison is
// always in one unit.

use serde::Serialize;

use super::drift_detector::DriftCandidate;
use super::spike_detector::SpikeCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyClass {
    DriverMistake,
    Degradation,
    Compound,
}

impl AnomalyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DriverMistake => "driver_mistake",
            Self::Degradation => "degradation",
            Self::Compound => "compound",
        }
    }
}

/// Candidate emitted by either detection path.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum PathCandidate {
    Slow(DriftCandidate),
    Fast(SpikeCandidate),
}

impl PathCandidate {
    pub fn timestamp(&self) -> f64 {
        match self {
            Self::Slow(c) => c.timestamp,
            Self::Fast(c) => c.timestamp,
        }
    }

    pub fn severity(&self) -> f64 {
        match self {
            Self::Slow(c) => c.severity,
            Self::Fast(c) => c.severity,
        }
    }
}

/// Fully classified anomaly, carrying the candidates that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledAnomaly {
    pub timestamp: f64,
    pub classification: AnomalyClass,
    pub severity: f64,
    pub signal: String,
    pub description: String,
    pub recommended_action: String,
    pub contributing: Vec<PathCandidate>,
}

impl ReconciledAnomaly {
    /// Fast-path candidate behind this anomaly, if any.
    pub fn spike(&self) -> Option<&SpikeCandidate> {
        self.contributing.iter().find_map(|c| match c {
            PathCandidate::Fast(spike) => Some(spike),
            PathCandidate::Slow(_) => None,
        })
    }

    /// Slow-path candidate behind this anomaly, if any.
    pub fn drift(&self) -> Option<&DriftCandidate> {
        self.contributing.iter().find_map(|c| match c {
            PathCandidate::Slow(drift) => Some(drift),
            PathCandidate::Fast(_) => None,
        })
    }
}

/// Reconcile the two paths for one signal. `window` is in samples.
pub fn reconcile(
    spikes: &[SpikeCandidate],
    drifts: &[DriftCandidate],
    signal: &str,
    window: f64,
) -> Vec<ReconciledAnomaly> {
    let mut reconciled = Vec::with_capacity(spikes.len() + drifts.len());

    for spike in spikes {
        let nearby: Vec<&DriftCandidate> = drifts
            .iter()
            .filter(|d| (d.timestamp - spike.timestamp).abs() <= window)
            .collect();

        let (classification, severity, description) = if nearby.is_empty() {
            (
                AnomalyClass::DriverMistake,
                spike.severity,
                format!("Driver mistake: {}", spike.subtype),
            )
        } else {
            let max_drift = nearby
                .iter()
                .map(|d| d.severity)
                .fold(f64::NEG_INFINITY, f64::max);
            (
                AnomalyClass::Compound,
                spike.severity.max(max_drift),
                format!("Compound issue: {} with degradation", spike.subtype),
            )
        };

        let mut contributing = vec![PathCandidate::Fast(spike.clone())];
        if let Some(first) = nearby.first() {
            contributing.push(PathCandidate::Slow((*first).clone()));
        }

        reconciled.push(ReconciledAnomaly {
            timestamp: spike.timestamp,
            classification,
            severity,
            signal: signal.to_string(),
            description,
            recommended_action: recommendation(classification, signal),
            contributing,
        });
    }

    for drift in drifts {
        let matched = spikes
            .iter()
            .any(|s| (drift.timestamp - s.timestamp).abs() <= window);
        if !matched {
            reconciled.push(ReconciledAnomaly {
                timestamp: drift.timestamp,
                classification: AnomalyClass::Degradation,
                severity: drift.severity,
                signal: signal.to_string(),
                description: format!("Performance degradation in {signal}"),
                recommended_action: recommendation(AnomalyClass::Degradation, signal),
                contributing: vec![PathCandidate::Slow(drift.clone())],
            });
        }
    }

    reconciled
}

/// Coaching action for a (classification, signal) pair, with a generic
/// fallback for signals the table does not cover.
pub fn recommendation(classification: AnomalyClass, signal: &str) -> String {
    let text = match (classification, signal) {
        (AnomalyClass::DriverMistake, "brake") => {
            "Focus on smoother brake application. Avoid sudden brake spikes."
        }
        (AnomalyClass::DriverMistake, "throttle") => {
            "Work on progressive throttle control. Eliminate stabs and hesitation."
        }
        (AnomalyClass::DriverMistake, "speed") => {
            "Address lock-up tendency. Brake earlier and more progressively."
        }
        (AnomalyClass::DriverMistake, "steering_angle") => {
            "Reduce steering corrections. Focus on smooth, deliberate inputs."
        }
        (AnomalyClass::Degradation, "brake") => {
            "Monitor brake temperature and pad wear. Consider pit strategy."
        }
        (AnomalyClass::Degradation, "throttle") => {
            "Check engine performance and throttle response calibration."
        }
        (AnomalyClass::Degradation, "speed") => {
            "Assess tire degradation and grip levels. Adjust driving style."
        }
        (AnomalyClass::Degradation, "steering_angle") => {
            "Evaluate suspension setup and tire pressure."
        }
        (AnomalyClass::Compound, _) => {
            "Multiple issues detected. Address both technique and equipment."
        }
        _ => {
            return format!("Monitor {signal} performance and adjust technique accordingly.")
        }
    };
    text.to_string()
}
