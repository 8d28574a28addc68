// src/ideal_lap/sector_weights.rs
//
// Per-sector achievability scoring. Five sub-scores estimate how repeatable
// a sector's best time is; missing enrichment columns substitute documented
// defaults rather than failing.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::session::{LapRecord, SectorRecord, TelemetryTable};
use crate::types::PlausibleRanges;

/// Factor weights combining the five sub-scores. Expected to sum to 1.0;
/// the calculator logs a discrepancy instead of rejecting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievabilityWeights {
    pub consistency: f64,
    pub smoothness: f64,
    pub conditions: f64,
    pub temperature: f64,
    pub traffic: f64,
}

impl Default for AchievabilityWeights {
    fn default() -> Self {
        Self {
            consistency: 0.3,
            smoothness: 0.25,
            conditions: 0.2,
            temperature: 0.15,
            traffic: 0.1,
        }
    }
}

impl AchievabilityWeights {
    pub fn sum(&self) -> f64 {
        self.consistency + self.smoothness + self.conditions + self.temperature + self.traffic
    }
}

/// Achievability sub-scores for one sector, all in [0, 1].
#[derive(Debug, Clone, Serialize)]
pub struct SectorWeights {
    pub consistency_score: f64,
    pub smoothness_score: f64,
    pub conditions_score: f64,
    pub temperature_score: f64,
    pub traffic_score: f64,
    pub combined_weight: f64,
}

impl SectorWeights {
    /// Defaults used when a sector has too few valid samples to score.
    pub fn fallback() -> Self {
        Self {
            consistency_score: 0.6,
            smoothness_score: 0.6,
            conditions_score: 0.7,
            temperature_score: 0.8,
            traffic_score: 0.8,
            combined_weight: 0.68,
        }
    }
}

/// Signals consulted for input smoothness, when telemetry is supplied.
const SMOOTHNESS_SIGNALS: [&str; 3] = ["throttle", "brake", "steering_angle"];

/// Score every sector that appears in the sector table. Sectors with fewer
/// than 3 valid samples receive the fallback weight set.
pub fn score_sectors(
    valid_laps: &[&LapRecord],
    sectors: &[SectorRecord],
    telemetry: Option<&TelemetryTable>,
    weights: &AchievabilityWeights,
    ranges: &PlausibleRanges,
) -> BTreeMap<usize, SectorWeights> {
    let mut scored = BTreeMap::new();
    if sectors.is_empty() {
        return scored;
    }

    for sector in 1..=3 {
        let times: Vec<(u32, f64)> = sectors
            .iter()
            .filter_map(|rec| rec.sector_time(sector).map(|t| (rec.lap_number, t)))
            .filter(|&(_, t)| ranges.sector_valid(t))
            .collect();

        if times.len() < 3 {
            scored.insert(sector, SectorWeights::fallback());
            continue;
        }

        let consistency_score = consistency_score(&times);
        let smoothness_score = smoothness_score(telemetry);
        let conditions_score = conditions_score(valid_laps, &times);
        let temperature_score = temperature_score(valid_laps);
        let traffic_score = traffic_score(valid_laps);

        let combined_weight = (consistency_score * weights.consistency
            + smoothness_score * weights.smoothness
            + conditions_score * weights.conditions
            + temperature_score * weights.temperature
            + traffic_score * weights.traffic)
            .clamp(0.0, 1.0);

        scored.insert(
            sector,
            SectorWeights {
                consistency_score,
                smoothness_score,
                conditions_score,
                temperature_score,
                traffic_score,
                combined_weight,
            },
        );
    }

    scored
}

/// Lower coefficient of variation means a more repeatable sector.
/// cv = 0.1 maps to 0.0, cv = 0.01 maps to 1.0.
fn consistency_score(times: &[(u32, f64)]) -> f64 {
    if times.len() < 2 {
        return 0.5;
    }
    let values = Array1::from_iter(times.iter().map(|&(_, t)| t));
    let mean = values.mean().unwrap_or(0.0);
    if mean.abs() < f64::EPSILON {
        return 0.5;
    }
    let cv = values.std(1.0) / mean;
    ((0.1 - cv) / 0.09).clamp(0.0, 1.0)
}

/// Mean over available control signals of 1 / (1 + stdev(first difference)).
/// Defaults to 0.7 when telemetry or all signals are absent.
fn smoothness_score(telemetry: Option<&TelemetryTable>) -> f64 {
    let Some(table) = telemetry else {
        return 0.7;
    };

    let mut scores = Vec::new();
    for name in SMOOTHNESS_SIGNALS {
        let Some(samples) = table.signal(name) else {
            continue;
        };
        if samples.len() < 2 {
            continue;
        }
        let diffs =
            Array1::from_iter(samples.windows(2).map(|pair| pair[1] - pair[0]));
        scores.push((1.0 / (1.0 + diffs.std(0.0))).clamp(0.0, 1.0));
    }

    if scores.is_empty() {
        0.7
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Spread of per-stint sector means. Requires at least two stints of more
/// than two laps; otherwise assumes decent conditions.
fn conditions_score(valid_laps: &[&LapRecord], times: &[(u32, f64)]) -> f64 {
    let mut stints: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for lap in valid_laps {
        if let Some(stint) = lap.stint_number {
            stints.entry(stint).or_default().push(lap.lap_number);
        }
    }

    let mut stint_means = Vec::new();
    for lap_numbers in stints.values() {
        if lap_numbers.len() <= 2 {
            continue;
        }
        let stint_times: Vec<f64> = times
            .iter()
            .filter(|(lap, _)| lap_numbers.contains(lap))
            .map(|&(_, t)| t)
            .collect();
        if !stint_times.is_empty() {
            stint_means.push(stint_times.iter().sum::<f64>() / stint_times.len() as f64);
        }
    }

    if stint_means.len() > 1 {
        let spread = Array1::from_vec(stint_means).std(0.0);
        ((2.0 - spread) / 2.0).clamp(0.3, 1.0)
    } else {
        0.75
    }
}

/// Observed range of each available temperature column scored against its
/// acceptable band (air 5°, track 10°, delta-from-start 3°), averaged.
fn temperature_score(valid_laps: &[&LapRecord]) -> f64 {
    let columns: [(&str, fn(&LapRecord) -> Option<f64>); 3] = [
        ("air_temp", |lap| lap.air_temp),
        ("track_temp", |lap| lap.track_temp),
        ("temp_delta_from_start", |lap| lap.temp_delta_from_start),
    ];

    let mut scores = Vec::new();
    for (name, getter) in columns {
        let data: Vec<f64> = valid_laps.iter().filter_map(|&lap| getter(lap)).collect();
        if data.len() < 2 {
            continue;
        }
        let range = data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            - data.iter().copied().fold(f64::INFINITY, f64::min);
        let score = match name {
            "air_temp" => (5.0 - range) / 5.0,
            "track_temp" => (10.0 - range) / 10.0,
            _ => (3.0 - range.abs()) / 3.0,
        };
        scores.push(score.clamp(0.2, 1.0));
    }

    if scores.is_empty() {
        0.8
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Fraction of laps run in clear air, from whichever indicator columns are
/// present. Clear means is_clear_lap set, or traffic/yellow flags unset.
fn traffic_score(valid_laps: &[&LapRecord]) -> f64 {
    let mut clear = 0usize;
    let mut total = 0usize;

    let clear_flags: Vec<bool> = valid_laps.iter().filter_map(|l| l.is_clear_lap).collect();
    if !clear_flags.is_empty() {
        clear += clear_flags.iter().filter(|&&c| c).count();
        total = total.max(clear_flags.len());
    }

    let congestion_columns: [fn(&LapRecord) -> Option<bool>; 2] = [
        |l| l.traffic_indicator,
        |l| l.yellow_flag_indicator,
    ];
    for getter in congestion_columns {
        let flags: Vec<bool> = valid_laps.iter().filter_map(|&l| getter(l)).collect();
        if !flags.is_empty() {
            clear += flags.iter().filter(|&&f| !f).count();
            total = total.max(flags.len());
        }
    }

    if total > 0 {
        (clear as f64 / total as f64).clamp(0.3, 1.0)
    } else {
        0.85
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(n: u32, stint: Option<u32>) -> LapRecord {
        LapRecord {
            lap_number: n,
            lap_time_ms: 140_000.0,
            stint_number: stint,
            air_temp: None,
            track_temp: None,
            temp_delta_from_start: None,
            is_clear_lap: None,
            traffic_indicator: None,
            yellow_flag_indicator: None,
        }
    }

    fn sector(lap: u32, t: f64) -> SectorRecord {
        SectorRecord {
            lap_number: lap,
            sector_1_time: t,
            sector_2_time: 55.0,
            sector_3_time: 40.0,
        }
    }

    #[test]
    fn test_sparse_sector_gets_fallback_weights() {
        let laps = [lap(1, None), lap(2, None)];
        let lap_refs: Vec<&LapRecord> = laps.iter().collect();
        let sectors = vec![sector(1, 42.0), sector(2, 41.8)];
        let scored = score_sectors(
            &lap_refs,
            &sectors,
            None,
            &AchievabilityWeights::default(),
            &PlausibleRanges::default(),
        );
        let weights = &scored[&1];
        assert_eq!(weights.combined_weight, 0.68);
        assert_eq!(weights.consistency_score, 0.6);
    }

    #[test]
    fn test_empty_sector_table_scores_nothing() {
        let scored = score_sectors(
            &[],
            &[],
            None,
            &AchievabilityWeights::default(),
            &PlausibleRanges::default(),
        );
        assert!(scored.is_empty());
    }

    #[test]
    fn test_all_scores_stay_in_unit_interval() {
        let laps: Vec<LapRecord> = (1..=10).map(|n| lap(n, Some(n / 5))).collect();
        let lap_refs: Vec<&LapRecord> = laps.iter().collect();
        let sectors: Vec<SectorRecord> = (1..=10)
            .map(|n| sector(n, 41.0 + (n as f64) * 0.2))
            .collect();
        let mut telemetry = TelemetryTable::new();
        telemetry.insert("throttle", (0..200).map(|i| (i % 7) as f64).collect());

        let scored = score_sectors(
            &lap_refs,
            &sectors,
            Some(&telemetry),
            &AchievabilityWeights::default(),
            &PlausibleRanges::default(),
        );
        for weights in scored.values() {
            for score in [
                weights.consistency_score,
                weights.smoothness_score,
                weights.conditions_score,
                weights.temperature_score,
                weights.traffic_score,
                weights.combined_weight,
            ] {
                assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
            }
        }
    }

    #[test]
    fn test_tight_sector_times_score_high_consistency() {
        let times: Vec<(u32, f64)> = (1..=10).map(|n| (n, 42.0 + 0.01 * n as f64)).collect();
        assert!(consistency_score(&times) > 0.9);

        let loose: Vec<(u32, f64)> = (1..=10).map(|n| (n, 42.0 + 2.0 * n as f64)).collect();
        assert!(consistency_score(&loose) < 0.1);
    }

    #[test]
    fn test_smoothness_defaults_without_telemetry() {
        assert_eq!(smoothness_score(None), 0.7);
        let empty = TelemetryTable::new();
        assert_eq!(smoothness_score(Some(&empty)), 0.7);
    }

    #[test]
    fn test_smooth_signal_beats_jerky_signal() {
        let mut smooth = TelemetryTable::new();
        smooth.insert("throttle", (0..100).map(|i| i as f64 * 0.01).collect());
        let mut jerky = TelemetryTable::new();
        jerky.insert(
            "throttle",
            (0..100).map(|i| if i % 2 == 0 { 0.0 } else { 100.0 }).collect(),
        );
        assert!(smoothness_score(Some(&smooth)) > smoothness_score(Some(&jerky)));
    }

    #[test]
    fn test_conditions_uses_stint_spread() {
        // two stints of 4 laps with very different sector means
        let laps: Vec<LapRecord> = (1..=8)
            .map(|n| lap(n, Some(if n <= 4 { 1 } else { 2 })))
            .collect();
        let lap_refs: Vec<&LapRecord> = laps.iter().collect();
        let times: Vec<(u32, f64)> = (1..=8)
            .map(|n| (n, if n <= 4 { 40.0 } else { 48.0 }))
            .collect();
        let spread_score = conditions_score(&lap_refs, &times);
        // spread of 4.0 seconds floors the score
        assert_eq!(spread_score, 0.3);

        let steady: Vec<(u32, f64)> = (1..=8).map(|n| (n, 42.0)).collect();
        assert_eq!(conditions_score(&lap_refs, &steady), 1.0);
    }

    #[test]
    fn test_conditions_defaults_without_stints() {
        let laps = [lap(1, None), lap(2, None), lap(3, None)];
        let lap_refs: Vec<&LapRecord> = laps.iter().collect();
        let times: Vec<(u32, f64)> = (1..=3).map(|n| (n, 42.0)).collect();
        assert_eq!(conditions_score(&lap_refs, &times), 0.75);
    }

    #[test]
    fn test_temperature_scoring() {
        let mut warm = lap(1, None);
        warm.air_temp = Some(22.0);
        let mut hot = lap(2, None);
        hot.air_temp = Some(31.0);
        let refs: Vec<&LapRecord> = vec![&warm, &hot];
        // 9 degree air swing exceeds the 5 degree band and floors at 0.2
        assert_eq!(temperature_score(&refs), 0.2);

        let mut a = lap(1, None);
        a.air_temp = Some(22.0);
        let mut b = lap(2, None);
        b.air_temp = Some(22.5);
        let refs: Vec<&LapRecord> = vec![&a, &b];
        assert!((temperature_score(&refs) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_defaults_without_columns() {
        let laps = [lap(1, None), lap(2, None)];
        let refs: Vec<&LapRecord> = laps.iter().collect();
        assert_eq!(temperature_score(&refs), 0.8);
    }

    #[test]
    fn test_traffic_from_clear_lap_fraction() {
        let mut laps: Vec<LapRecord> = (1..=4).map(|n| lap(n, None)).collect();
        for (i, l) in laps.iter_mut().enumerate() {
            l.is_clear_lap = Some(i < 3);
        }
        let refs: Vec<&LapRecord> = laps.iter().collect();
        assert!((traffic_score(&refs) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_traffic_defaults_without_indicators() {
        let laps = [lap(1, None)];
        let refs: Vec<&LapRecord> = laps.iter().collect();
        assert_eq!(traffic_score(&refs), 0.85);
    }
}
