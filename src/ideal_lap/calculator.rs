// src/ideal_lap/calculator.rs
//
// Achievability-weighted ideal lap. Divides each best sector time by its
// achievability weight to produce a target that is fast but reachable,
// rather than the raw theoretical best nobody ever strings together.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{info, warn};

use super::sector_weights::{score_sectors, AchievabilityWeights, SectorWeights};
use super::theoretical_best::{estimate, BestLapMethod, TheoreticalBest};
use crate::session::{LapRecord, SectorRecord, TelemetryTable};
use crate::types::PlausibleRanges;

/// Laps required before any target is computed.
const MIN_VALID_LAPS: usize = 5;

/// Floor applied to any weight used as a divisor.
const WEIGHT_FLOOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::None => "None",
        }
    }
}

/// Per-sector breakdown of the composed target.
#[derive(Debug, Clone, Serialize)]
pub struct SectorAnalysis {
    pub sector: usize,
    pub best_time: f64,
    pub achievability_weight: f64,
    pub realistic_time: f64,
}

/// Ideal-lap result. Numeric fields are `None` only for the explicit
/// insufficient-data outcome; the boundary serializer turns them into
/// JSON nulls.
#[derive(Debug, Clone, Serialize)]
pub struct SiwtlResult {
    pub siwtl_lap: Option<f64>,
    pub theoretical_best_lap: Option<f64>,
    pub current_avg_lap: Option<f64>,
    pub potential_gain_sec: Option<f64>,
    pub achievability_score: Option<f64>,
    pub best_lap_method: Option<BestLapMethod>,
    pub sector_analysis: Vec<SectorAnalysis>,
    pub sector_weights: BTreeMap<usize, SectorWeights>,
    pub confidence_level: Confidence,
    pub laps_analyzed: usize,
    pub error: Option<String>,
}

impl SiwtlResult {
    /// Degraded result for drivers without enough usable laps. A value,
    /// not an error: callers render an empty state from it.
    pub fn insufficient_data(laps_analyzed: usize) -> Self {
        Self {
            siwtl_lap: None,
            theoretical_best_lap: None,
            current_avg_lap: None,
            potential_gain_sec: None,
            achievability_score: None,
            best_lap_method: None,
            sector_analysis: Vec::new(),
            sector_weights: BTreeMap::new(),
            confidence_level: Confidence::None,
            laps_analyzed,
            error: Some("Insufficient valid lap data for ideal lap calculation".to_string()),
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.error.is_some()
    }
}

pub struct IdealLapCalculator {
    weights: AchievabilityWeights,
    ranges: PlausibleRanges,
}

impl IdealLapCalculator {
    /// Build a calculator. Factor weights that do not sum to 1.0 are logged
    /// as a configuration discrepancy but accepted.
    pub fn new(weights: AchievabilityWeights, ranges: PlausibleRanges) -> Self {
        let total = weights.sum();
        if (total - 1.0).abs() > 0.01 {
            warn!("achievability weights sum to {total:.3}, not 1.0");
        }
        Self { weights, ranges }
    }

    /// Shared instance with default weights and ranges, built exactly once
    /// even under concurrent first access.
    pub fn shared() -> &'static IdealLapCalculator {
        static INSTANCE: OnceLock<IdealLapCalculator> = OnceLock::new();
        INSTANCE.get_or_init(|| {
            IdealLapCalculator::new(AchievabilityWeights::default(), PlausibleRanges::default())
        })
    }

    /// Compute the ideal-lap target for one driver's session.
    pub fn calculate(
        &self,
        laps: &[LapRecord],
        sectors: &[SectorRecord],
        telemetry: Option<&TelemetryTable>,
    ) -> SiwtlResult {
        let valid: Vec<&LapRecord> = laps
            .iter()
            .filter(|lap| self.ranges.lap_valid(lap.lap_time_ms))
            .collect();

        if valid.len() < MIN_VALID_LAPS {
            warn!(
                valid = valid.len(),
                "insufficient valid laps for ideal lap calculation"
            );
            return SiwtlResult::insufficient_data(valid.len());
        }
        info!(laps = valid.len(), "calculating ideal lap");

        let valid_ms: Vec<f64> = valid.iter().map(|lap| lap.lap_time_ms).collect();
        let theoretical = estimate(&valid_ms, sectors, &self.ranges);
        let sector_weights =
            score_sectors(&valid, sectors, telemetry, &self.weights, &self.ranges);

        self.compose(&theoretical, sector_weights, &valid_ms)
    }

    /// Compose the final target from the theoretical best and the per-sector
    /// achievability weights.
    pub fn compose(
        &self,
        theoretical: &TheoreticalBest,
        sector_weights: BTreeMap<usize, SectorWeights>,
        valid_ms: &[f64],
    ) -> SiwtlResult {
        let mut sector_analysis = Vec::new();

        let siwtl_lap = if theoretical.method == BestLapMethod::SectorBased
            && !theoretical.sector_bests.is_empty()
        {
            let mut total = 0.0;
            for (&sector, &best_time) in &theoretical.sector_bests {
                let Some(weights) = sector_weights.get(&sector) else {
                    continue;
                };
                let weight = weights.combined_weight;
                let realistic_time = best_time / weight.max(WEIGHT_FLOOR);
                total += realistic_time;
                sector_analysis.push(SectorAnalysis {
                    sector,
                    best_time,
                    achievability_weight: weight,
                    realistic_time,
                });
            }
            total
        } else {
            let avg_weight = if sector_weights.is_empty() {
                0.75
            } else {
                sector_weights
                    .values()
                    .map(|w| w.combined_weight)
                    .sum::<f64>()
                    / sector_weights.len() as f64
            };
            theoretical.lap_sec / avg_weight.max(WEIGHT_FLOOR)
        };

        let current_avg_lap = valid_ms.iter().sum::<f64>() / valid_ms.len() as f64 / 1000.0;
        let achievability_score = if siwtl_lap > 0.0 {
            (theoretical.lap_sec / siwtl_lap).min(1.0)
        } else {
            0.0
        };

        let confidence_level = if valid_ms.len() >= 30 && sector_weights.len() >= 2 {
            Confidence::High
        } else if valid_ms.len() >= 15 {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        SiwtlResult {
            siwtl_lap: Some(siwtl_lap),
            theoretical_best_lap: Some(theoretical.lap_sec),
            current_avg_lap: Some(current_avg_lap),
            potential_gain_sec: Some(current_avg_lap - siwtl_lap),
            achievability_score: Some(achievability_score),
            best_lap_method: Some(theoretical.method),
            sector_analysis,
            sector_weights,
            confidence_level,
            laps_analyzed: valid_ms.len(),
            error: None,
        }
    }
}
