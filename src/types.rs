use serde::{Deserialize, Serialize};

use crate::analysis::DetectorConfig;
use crate::coaching::CoachingConfig;
use crate::ideal_lap::AchievabilityWeights;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub anomaly: DetectorConfig,
    pub achievability: AchievabilityWeights,
    pub ranges: PlausibleRanges,
    pub io: IoConfig,
    pub coaching: CoachingConfig,
    pub logging: LoggingConfig,
}

/// Plausible-range bounds for timing data. Circuit-specific; the defaults
/// match a ~2:15 GT lap and should be overridden per track in config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlausibleRanges {
    pub lap_time_ms_min: f64,
    pub lap_time_ms_max: f64,
    pub sector_time_s_min: f64,
    pub sector_time_s_max: f64,
}

impl Default for PlausibleRanges {
    fn default() -> Self {
        Self {
            lap_time_ms_min: 120_000.0,
            lap_time_ms_max: 200_000.0,
            sector_time_s_min: 20.0,
            sector_time_s_max: 80.0,
        }
    }
}

impl PlausibleRanges {
    /// Lap validity is inclusive on both bounds.
    pub fn lap_valid(&self, lap_time_ms: f64) -> bool {
        lap_time_ms >= self.lap_time_ms_min && lap_time_ms <= self.lap_time_ms_max
    }

    /// Sector validity is exclusive: exactly-on-bound times are rejected.
    pub fn sector_valid(&self, sector_time_s: f64) -> bool {
        sector_time_s > self.sector_time_s_min && sector_time_s < self.sector_time_s_max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input_dir: String,
    pub output_dir: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: "sessions".to_string(),
            output_dir: "reports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lap_range_is_inclusive() {
        let ranges = PlausibleRanges::default();
        assert!(ranges.lap_valid(120_000.0));
        assert!(ranges.lap_valid(200_000.0));
        assert!(!ranges.lap_valid(119_999.9));
        assert!(!ranges.lap_valid(200_000.1));
    }

    #[test]
    fn test_sector_range_is_exclusive() {
        let ranges = PlausibleRanges::default();
        assert!(!ranges.sector_valid(20.0));
        assert!(!ranges.sector_valid(80.0));
        assert!(ranges.sector_valid(20.1));
        assert!(ranges.sector_valid(79.9));
    }
}
