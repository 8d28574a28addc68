// src/analysis/mod.rs
//
// Dual-path anomaly detection modules.
//
// Signal flow:
//   raw signal → signal_filter (low-pass)  → drift_detector ─┐
//   raw signal → signal_filter (band-pass) → spike_detector ─┼→ reconciler → ReconciledAnomaly
//                                                            │
//   reconciled anomalies ───────────────────────→ summary ───┘→ AnomalySummary
//
// Orchestrated by anomaly_detector::AnomalyDetector.

pub mod anomaly_detector;
pub mod drift_detector;
pub mod reconciler;
pub mod signal_filter;
pub mod spike_detector;
pub mod summary;

// Re-exports for ergonomic access from the library root
pub use anomaly_detector::{AnomalyDetector, DetectorConfig, DEFAULT_SIGNALS};
pub use drift_detector::DriftCandidate;
pub use reconciler::{AnomalyClass, PathCandidate, ReconciledAnomaly};
pub use signal_filter::SosFilter;
pub use spike_detector::SpikeCandidate;
pub use summary::AnomalySummary;
