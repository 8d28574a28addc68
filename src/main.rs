// src/main.rs

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use apex_coach::analysis::AnomalyDetector;
use apex_coach::coaching::CoachingClient;
use apex_coach::ideal_lap::IdealLapCalculator;
use apex_coach::report::DriverReport;
use apex_coach::session::SessionData;
use apex_coach::types::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apex_coach=info".into()),
        )
        .init();

    info!("🏁 Telemetry Coaching Analysis Starting");

    let config = Config::load_or_default("config.yaml")?;
    info!("✓ Configuration loaded");
    info!(
        "Detection thresholds: spike={:.2}σ, drift={:.2}, band={:.1}-{:.1} Hz @ {:.0} Hz",
        config.anomaly.spike_threshold,
        config.anomaly.drift_threshold,
        config.anomaly.fast_low_hz,
        config.anomaly.fast_high_hz,
        config.anomaly.sample_rate_hz,
    );

    let detector = AnomalyDetector::new(config.anomaly.clone());
    let calculator =
        IdealLapCalculator::new(config.achievability.clone(), config.ranges.clone());
    let coaching = CoachingClient::new(config.coaching.clone())?;

    let session_files = find_session_files(&config.io.input_dir);
    if session_files.is_empty() {
        error!("No session files found in {}", config.io.input_dir);
        return Ok(());
    }
    info!("Found {} session file(s) to process", session_files.len());

    std::fs::create_dir_all(&config.io.output_dir)
        .with_context(|| format!("creating output dir {}", config.io.output_dir))?;

    let mut processed = 0usize;
    let mut failed = 0usize;

    for (idx, path) in session_files.iter().enumerate() {
        info!(
            "Processing session {}/{}: {}",
            idx + 1,
            session_files.len(),
            path.display()
        );

        match process_session(path, &detector, &calculator, &coaching, &config).await {
            Ok(vehicle_id) => {
                processed += 1;
                info!("✓ Report written for {vehicle_id}");
            }
            Err(e) => {
                failed += 1;
                error!("Failed to process {}: {e:#}", path.display());
            }
        }
    }

    info!("========================================");
    info!("Sessions processed: {processed}");
    if failed > 0 {
        warn!("Sessions failed: {failed}");
    }
    Ok(())
}

/// All .json session exports under the input directory, in a stable order.
fn find_session_files(input_dir: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Run both engines on one session export and write the merged report.
async fn process_session(
    path: &Path,
    detector: &AnomalyDetector,
    calculator: &IdealLapCalculator,
    coaching: &CoachingClient,
    config: &Config,
) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let session: SessionData =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let anomalies = detector.detect(&session.telemetry);
    let summary = detector.summarize(&anomalies);

    let telemetry = (!session.telemetry.is_empty()).then_some(&session.telemetry);
    let ideal_lap = calculator.calculate(&session.laps, &session.sectors, telemetry);
    if ideal_lap.is_insufficient() {
        warn!(
            vehicle = %session.vehicle_id,
            "not enough valid laps, emitting empty-state report"
        );
    }

    let report = DriverReport::new(session.vehicle_id.clone(), anomalies, summary, ideal_lap);
    let mut value = report.to_transport()?;

    let coaching_report = coaching.coaching_report(&report).await;
    value["coaching"] = serde_json::to_value(&coaching_report)?;

    let out_path = Path::new(&config.io.output_dir)
        .join(format!("{}_report.json", sanitize_file_stem(&session.vehicle_id)));
    std::fs::write(&out_path, serde_json::to_string_pretty(&value)?)
        .with_context(|| format!("writing {}", out_path.display()))?;

    Ok(session.vehicle_id)
}

/// Keep report filenames shell-friendly regardless of the vehicle id format.
fn sanitize_file_stem(vehicle_id: &str) -> String {
    vehicle_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
