// src/analysis/spike_detector.rs
//
// Fast-path spike detection. Operates on the band-pass filtered view of a
// signal: indices whose magnitude exceeds a deviation-scaled threshold are
// grouped into events and classified by signal-specific subtype.

use ndarray::ArrayView1;
use serde::Serialize;

/// Sudden-input event emitted by the fast path. `timestamp` is the sample
/// index of the group's peak magnitude.
#[derive(Debug, Clone, Serialize)]
pub struct SpikeCandidate {
    pub timestamp: f64,
    pub severity: f64,
    pub magnitude: f64,
    pub subtype: String,
    pub signal: String,
}

/// Flagged indices closer than this merge into a single event.
const MIN_SEPARATION: usize = 5;

/// Detect spike events in a band-pass filtered signal. `raw` is the
/// unfiltered series, consulted only for the sign of the sample at each
/// peak when classifying the subtype.
pub fn detect_spikes(
    filtered: &[f64],
    raw: &[f64],
    signal: &str,
    spike_threshold: f64,
) -> Vec<SpikeCandidate> {
    let threshold = ArrayView1::from(filtered).std(0.0) * spike_threshold;
    if !(threshold > f64::EPSILON) {
        return Vec::new();
    }

    let flagged: Vec<usize> = filtered
        .iter()
        .enumerate()
        .filter(|(_, v)| v.abs() > threshold)
        .map(|(i, _)| i)
        .collect();

    group_indices(&flagged)
        .into_iter()
        .map(|group| {
            let peak = group
                .iter()
                .copied()
                .max_by(|&a, &b| {
                    filtered[a]
                        .abs()
                        .partial_cmp(&filtered[b].abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .expect("groups are never empty");
            let magnitude = filtered[peak].abs();
            let raw_value = raw.get(peak).copied().unwrap_or(0.0);
            SpikeCandidate {
                timestamp: peak as f64,
                severity: (magnitude / threshold).min(10.0),
                magnitude,
                subtype: classify_spike(signal, raw_value),
                signal: signal.to_string(),
            }
        })
        .collect()
}

/// Merge flagged indices into groups: consecutive entries at most
/// `MIN_SEPARATION` apart belong to the same event.
fn group_indices(indices: &[usize]) -> Vec<Vec<usize>> {
    let mut groups = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for &idx in indices {
        match current.last() {
            Some(&prev) if idx - prev <= MIN_SEPARATION => current.push(idx),
            Some(_) => {
                groups.push(std::mem::take(&mut current));
                current.push(idx);
            }
            None => current.push(idx),
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Signal-specific subtype from the sign of the raw sample at the peak.
/// Signals without a specific rule report a generic anomaly.
fn classify_spike(signal: &str, raw_value: f64) -> String {
    let signal = signal.to_lowercase();
    match (signal.as_str(), raw_value < 0.0) {
        ("brake", false) => "brake_spike".to_string(),
        ("brake", true) => "brake_release_error".to_string(),
        ("throttle", false) => "throttle_stab".to_string(),
        ("throttle", true) => "lift_hesitation".to_string(),
        ("speed", true) => "lock_up".to_string(),
        ("speed", false) => "traction_loss".to_string(),
        ("steering_angle", _) => "overcorrection".to_string(),
        _ => format!("{signal}_anomaly"),
    }
}
