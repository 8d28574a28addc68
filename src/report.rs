// src/report.rs
//
// Merges both engines' outputs into one per-driver report and converts it
// to the transport representation. The merge is plain aggregation; all the
// analysis happened upstream.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::analysis::{AnomalySummary, ReconciledAnomaly};
use crate::ideal_lap::SiwtlResult;

pub const ANOMALY_ALGORITHM: &str = "DPTAD v1.0 - Dual-Path Temporal Anomaly Detection";
pub const IDEAL_LAP_ALGORITHM: &str = "SIWTL v2.0 - Smart Weighted Ideal Lap";

/// Per-driver coaching report: the anomaly list (severity-descending, as
/// produced by the detector), its summary, and the ideal-lap target.
#[derive(Debug, Clone, Serialize)]
pub struct DriverReport {
    pub vehicle_id: String,
    pub anomalies: Vec<ReconciledAnomaly>,
    pub summary: AnomalySummary,
    pub ideal_lap: SiwtlResult,
    pub anomaly_algorithm: &'static str,
    pub ideal_lap_algorithm: &'static str,
}

impl DriverReport {
    pub fn new(
        vehicle_id: impl Into<String>,
        anomalies: Vec<ReconciledAnomaly>,
        summary: AnomalySummary,
        ideal_lap: SiwtlResult,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            anomalies,
            summary,
            ideal_lap,
            anomaly_algorithm: ANOMALY_ALGORITHM,
            ideal_lap_algorithm: IDEAL_LAP_ALGORITHM,
        }
    }

    /// Transport form of the report, with non-finite numbers nulled.
    pub fn to_transport(&self) -> Result<Value> {
        to_transport_value(self)
    }
}

/// The single core-to-transport adapter. JSON cannot carry NaN or infinity,
/// so every non-finite float becomes a null here; all callers hand their
/// outputs through this one function instead of scrubbing ad hoc.
pub fn to_transport_value<T: Serialize>(value: &T) -> Result<Value> {
    // serde_json maps non-finite floats to Value::Null during tree
    // serialization, which is exactly the substitution the boundary needs
    Ok(serde_json::to_value(value)?)
}
