// src/session.rs
//
// Input tables consumed by both engines. A session export file holds one
// driver's lap table, sector table, and (optionally) high-rate telemetry,
// as produced by the timing/acquisition layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One driver's session export: lap timing, sector timing, and optional
/// per-signal telemetry sampled at the configured fixed rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub vehicle_id: String,
    pub laps: Vec<LapRecord>,
    #[serde(default)]
    pub sectors: Vec<SectorRecord>,
    #[serde(default)]
    pub telemetry: TelemetryTable,
}

/// A single timed lap with the optional enrichment columns the
/// achievability scorer knows how to use. Absent columns fall back to
/// documented default sub-scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap_number: u32,
    pub lap_time_ms: f64,
    #[serde(default)]
    pub stint_number: Option<u32>,
    #[serde(default)]
    pub air_temp: Option<f64>,
    #[serde(default)]
    pub track_temp: Option<f64>,
    #[serde(default)]
    pub temp_delta_from_start: Option<f64>,
    #[serde(default)]
    pub is_clear_lap: Option<bool>,
    #[serde(default)]
    pub traffic_indicator: Option<bool>,
    #[serde(default)]
    pub yellow_flag_indicator: Option<bool>,
}

/// Per-lap sector split times in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorRecord {
    pub lap_number: u32,
    pub sector_1_time: f64,
    pub sector_2_time: f64,
    pub sector_3_time: f64,
}

impl SectorRecord {
    /// Split time for sector 1, 2 or 3; `None` for anything else.
    pub fn sector_time(&self, sector: usize) -> Option<f64> {
        match sector {
            1 => Some(self.sector_1_time),
            2 => Some(self.sector_2_time),
            3 => Some(self.sector_3_time),
            _ => None,
        }
    }
}

/// Named telemetry signals, each an ordered sample sequence at a uniform
/// rate supplied by configuration (never inferred from the data).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryTable {
    signals: BTreeMap<String, Vec<f64>>,
}

impl TelemetryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, samples: Vec<f64>) {
        self.signals.insert(name.into(), samples);
    }

    pub fn signal(&self, name: &str) -> Option<&[f64]> {
        self.signals.get(name).map(Vec::as_slice)
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Extract the numeric car number from the ids seen in timing exports.
/// Supports `Car-2` -> 2, `GR86-002-2` -> 2, and bare numbers.
pub fn vehicle_number(vehicle_id: &str) -> u32 {
    if let Some(rest) = vehicle_id.strip_prefix("Car-") {
        rest.parse().unwrap_or(0)
    } else if vehicle_id.starts_with("GR86-") {
        vehicle_id
            .rsplit('-')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    } else {
        vehicle_id.parse().unwrap_or(0)
    }
}

/// Format a car number back into the display id used in reports.
pub fn format_vehicle_id(vehicle_number: u32) -> String {
    format!("Car-{vehicle_number}")
}
