// src/analysis/anomaly_detector.rs
//
// Dual-path temporal anomaly detection over per-signal telemetry.
//
// Each signal is decomposed into a slow view (low-pass, trend/degradation)
// and a fast view (band-pass, spikes/mistakes); per-path candidates are
// reconciled into classified anomalies. The detector holds only immutable
// configuration and pre-designed filters, so a single instance is safe to
// share across threads.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use super::drift_detector::{detect_drift, DriftCandidate};
use super::reconciler::{reconcile, ReconciledAnomaly};
use super::signal_filter::SosFilter;
use super::spike_detector::{detect_spikes, SpikeCandidate};
use super::summary::{summarize, AnomalySummary};
use crate::session::TelemetryTable;

/// Signals analyzed when the caller does not name any.
pub const DEFAULT_SIGNALS: [&str; 4] = ["speed", "throttle", "brake", "steering_angle"];

/// Butterworth order used for both path filters.
const FILTER_ORDER: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Low-pass cutoff for the slow (trend) path, Hz.
    pub slow_cutoff_hz: f64,
    /// Band-pass cutoffs for the fast (spike) path, Hz.
    pub fast_low_hz: f64,
    pub fast_high_hz: f64,
    /// Spike threshold as a multiple of the fast-path deviation.
    pub spike_threshold: f64,
    /// Drift threshold as a fraction of the slow-path deviation.
    pub drift_threshold: f64,
    /// Telemetry sample rate. Supplied by configuration, never inferred.
    pub sample_rate_hz: f64,
    /// Reconciliation window between the two paths, in samples.
    pub reconcile_window_samples: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            slow_cutoff_hz: 0.1,
            fast_low_hz: 0.5,
            fast_high_hz: 5.0,
            spike_threshold: 3.0,
            drift_threshold: 0.15,
            sample_rate_hz: 100.0,
            reconcile_window_samples: 10.0,
        }
    }
}

pub struct AnomalyDetector {
    config: DetectorConfig,
    slow_filter: Option<SosFilter>,
    fast_filter: Option<SosFilter>,
}

impl AnomalyDetector {
    /// Build a detector, designing both path filters up front. A failed
    /// band-pass design falls back to a high-pass at the lower cutoff; a
    /// path whose design cannot be salvaged is skipped for every signal.
    pub fn new(config: DetectorConfig) -> Self {
        let slow_filter =
            match SosFilter::butterworth_lowpass(FILTER_ORDER, config.slow_cutoff_hz, config.sample_rate_hz) {
                Ok(f) => Some(f),
                Err(e) => {
                    warn!("slow-path filter design failed, skipping slow path: {e}");
                    None
                }
            };

        let fast_filter = match SosFilter::butterworth_bandpass(
            FILTER_ORDER,
            config.fast_low_hz,
            config.fast_high_hz,
            config.sample_rate_hz,
        ) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!("band-pass design failed ({e}), falling back to high-pass");
                match SosFilter::butterworth_highpass(
                    FILTER_ORDER,
                    config.fast_low_hz,
                    config.sample_rate_hz,
                ) {
                    Ok(f) => Some(f),
                    Err(e) => {
                        warn!("high-pass fallback also failed, skipping fast path: {e}");
                        None
                    }
                }
            }
        };

        Self {
            config,
            slow_filter,
            fast_filter,
        }
    }

    /// Shared instance with default thresholds, built exactly once even
    /// under concurrent first access.
    pub fn shared() -> &'static AnomalyDetector {
        static INSTANCE: OnceLock<AnomalyDetector> = OnceLock::new();
        INSTANCE.get_or_init(|| AnomalyDetector::new(DetectorConfig::default()))
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Analyze the default signal set. Signals absent from the table are
    /// skipped.
    pub fn detect(&self, telemetry: &TelemetryTable) -> Vec<ReconciledAnomaly> {
        self.detect_signals(telemetry, &DEFAULT_SIGNALS)
    }

    /// Analyze the named signals and return classified anomalies ordered by
    /// severity, highest first.
    pub fn detect_signals(
        &self,
        telemetry: &TelemetryTable,
        signals: &[&str],
    ) -> Vec<ReconciledAnomaly> {
        let mut anomalies = Vec::new();

        for &name in signals {
            let Some(samples) = telemetry.signal(name) else {
                continue;
            };
            if samples.is_empty() {
                continue;
            }

            let drifts = self.slow_path(samples, name);
            let spikes = self.fast_path(samples, name);
            debug!(
                signal = name,
                drifts = drifts.len(),
                spikes = spikes.len(),
                "dual-path candidates"
            );

            anomalies.extend(reconcile(
                &spikes,
                &drifts,
                name,
                self.config.reconcile_window_samples,
            ));
        }

        anomalies.sort_by(|a, b| {
            b.severity
                .partial_cmp(&a.severity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if anomalies.is_empty() {
            info!("no anomalies detected");
        } else {
            info!(count = anomalies.len(), "anomalies detected");
        }
        anomalies
    }

    /// Aggregate an anomaly list into the report-level summary.
    pub fn summarize(&self, anomalies: &[ReconciledAnomaly]) -> AnomalySummary {
        summarize(anomalies)
    }

    /// Slow path: zero-phase low-pass, then rolling-mean drift detection.
    /// Series shorter than the filter padding produce no candidates.
    fn slow_path(&self, samples: &[f64], signal: &str) -> Vec<DriftCandidate> {
        let Some(filter) = &self.slow_filter else {
            return Vec::new();
        };
        match filter.filtfilt(samples) {
            Some(filtered) => detect_drift(&filtered, signal, self.config.drift_threshold),
            None => Vec::new(),
        }
    }

    /// Fast path: zero-phase band-pass (or the high-pass fallback), then
    /// threshold spike extraction.
    fn fast_path(&self, samples: &[f64], signal: &str) -> Vec<SpikeCandidate> {
        let Some(filter) = &self.fast_filter else {
            return Vec::new();
        };
        match filter.filtfilt(samples) {
            Some(filtered) => {
                detect_spikes(&filtered, samples, signal, self.config.spike_threshold)
            }
            None => Vec::new(),
        }
    }
}
