// src/analysis/drift_detector.rs
//
// Slow-path trend analysis. Operates on the low-pass filtered view of a
// signal and flags points where the local mean shifts by more than a
// fraction of the signal's overall deviation.

use ndarray::ArrayView1;
use serde::Serialize;

/// Gradual-shift event emitted by the slow path. `timestamp` is the sample
/// index at the configured sample rate, as are all candidate timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct DriftCandidate {
    pub timestamp: f64,
    pub severity: f64,
    pub magnitude: f64,
    pub signal: String,
}

const MIN_WINDOW: usize = 5;
const MAX_WINDOW: usize = 50;

/// Detect drift points in an already low-pass filtered signal.
///
/// Window size is len/10 capped at 50; series too short for a 5-sample
/// window produce no candidates. For each interior index the mean of the
/// preceding window of the centered rolling mean is compared against the
/// mean of the following window; a difference beyond
/// `stdev(signal) * drift_threshold` becomes a candidate with severity
/// `|difference| / threshold`, clipped to 10.
pub fn detect_drift(filtered: &[f64], signal: &str, drift_threshold: f64) -> Vec<DriftCandidate> {
    let n = filtered.len();
    let window = (n / 10).min(MAX_WINDOW);
    if window < MIN_WINDOW {
        return Vec::new();
    }

    let threshold = ArrayView1::from(filtered).std(0.0) * drift_threshold;
    if !(threshold > f64::EPSILON) {
        // flat signal, nothing to compare against
        return Vec::new();
    }

    let rolling = centered_rolling_mean(filtered, window);

    let mut candidates = Vec::new();
    for i in window..n - window {
        let recent = mean_of_defined(&rolling[i - window..i]);
        let current = mean_of_defined(&rolling[i..i + window]);
        let (Some(recent), Some(current)) = (recent, current) else {
            continue;
        };
        let diff = current - recent;
        if diff.abs() > threshold {
            candidates.push(DriftCandidate {
                timestamp: i as f64,
                severity: (diff.abs() / threshold).min(10.0),
                magnitude: diff,
                signal: signal.to_string(),
            });
        }
    }
    candidates
}

/// Centered rolling mean; indices whose window does not fully fit hold NaN
/// and are skipped by the comparison windows.
fn centered_rolling_mean(x: &[f64], window: usize) -> Vec<f64> {
    let n = x.len();
    let half = window / 2;
    let mut prefix = vec![0.0; n + 1];
    for (i, &v) in x.iter().enumerate() {
        prefix[i + 1] = prefix[i] + v;
    }

    let mut rolling = vec![f64::NAN; n];
    for i in half..n {
        let lo = i - half;
        let hi = lo + window;
        if hi > n {
            break;
        }
        rolling[i] = (prefix[hi] - prefix[lo]) / window as f64;
    }
    rolling
}

fn mean_of_defined(values: &[f64]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}
