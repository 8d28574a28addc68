//! Racing telemetry coaching core.
//!
//! Two independent, stateless engines derive coaching artifacts from
//! per-driver session data:
//!
//! - [`analysis::AnomalyDetector`] decomposes each telemetry signal into a
//!   slow (trend) and fast (spike) view, detects candidate events per path,
//!   and reconciles them into classified anomalies with a summary.
//! - [`ideal_lap::IdealLapCalculator`] estimates a theoretical-best lap,
//!   scores each sector's achievability along five factors, and composes a
//!   realistic target lap with a potential gain and confidence level.
//!
//! Both engines are pure functions of their inputs plus construction-time
//! configuration, safe to share across threads. [`report`] merges their
//! outputs and owns the single core-to-transport boundary; [`coaching`]
//! optionally rephrases a report as prose via an external LLM endpoint.

pub mod analysis;
pub mod coaching;
pub mod config;
pub mod ideal_lap;
pub mod report;
pub mod session;
pub mod types;

pub use analysis::{AnomalyDetector, AnomalySummary, DetectorConfig, ReconciledAnomaly};
pub use coaching::{CoachingClient, CoachingConfig};
pub use ideal_lap::{AchievabilityWeights, IdealLapCalculator, SiwtlResult};
pub use report::DriverReport;
pub use session::{LapRecord, SectorRecord, SessionData, TelemetryTable};
pub use types::{Config, PlausibleRanges};
