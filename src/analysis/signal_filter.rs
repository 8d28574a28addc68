// src/analysis/signal_filter.rs
//
// Butterworth IIR filters as cascaded biquad sections, applied zero-phase
// (forward-backward) so detected event timestamps stay aligned with the
// source samples. Bandpass is realized as a lowpass/highpass cascade.

use anyhow::{bail, Result};
use num_complex::Complex64;
use std::f64::consts::PI;

/// A single second-order section.
///
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2),
/// evaluated in Direct Form II Transposed. First-order sections are stored
/// with b2 = a2 = 0.
#[derive(Debug, Clone)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    /// State that makes the section already settled on a constant input `u`,
    /// the same trick scipy's filtfilt uses to suppress edge transients.
    fn settled_state(&self, u: f64) -> (f64, f64) {
        let den = 1.0 + self.a[0] + self.a[1];
        let dc_gain = if den.abs() < 1e-12 {
            0.0
        } else {
            (self.b[0] + self.b[1] + self.b[2]) / den
        };
        let y = dc_gain * u;
        let s1 = self.b[2] * u - self.a[1] * y;
        let s0 = self.b[1] * u - self.a[0] * y + s1;
        (s0, s1)
    }
}

/// Cascade of biquad sections forming one Butterworth filter.
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<Biquad>,
    order: usize,
}

impl SosFilter {
    pub fn butterworth_lowpass(order: usize, cutoff_hz: f64, sample_rate: f64) -> Result<Self> {
        validate_cutoff(cutoff_hz, sample_rate)?;
        Ok(Self {
            sections: design_sections(order, cutoff_hz, sample_rate, Response::Lowpass),
            order,
        })
    }

    pub fn butterworth_highpass(order: usize, cutoff_hz: f64, sample_rate: f64) -> Result<Self> {
        validate_cutoff(cutoff_hz, sample_rate)?;
        Ok(Self {
            sections: design_sections(order, cutoff_hz, sample_rate, Response::Highpass),
            order,
        })
    }

    /// Bandpass as lowpass(high_hz) cascaded with highpass(low_hz). The
    /// effective order doubles, which the padding length accounts for.
    pub fn butterworth_bandpass(
        order: usize,
        low_hz: f64,
        high_hz: f64,
        sample_rate: f64,
    ) -> Result<Self> {
        validate_cutoff(low_hz, sample_rate)?;
        validate_cutoff(high_hz, sample_rate)?;
        if low_hz >= high_hz {
            bail!(
                "bandpass lower cutoff {low_hz} Hz must be below upper cutoff {high_hz} Hz"
            );
        }
        let mut sections = design_sections(order, high_hz, sample_rate, Response::Lowpass);
        sections.extend(design_sections(order, low_hz, sample_rate, Response::Highpass));
        Ok(Self {
            sections,
            order: order * 2,
        })
    }

    /// Samples of odd-reflection padding required on each side for a
    /// reliable zero-phase pass, mirroring scipy's 3 * (order + 1).
    pub fn pad_len(&self) -> usize {
        3 * (self.order + 1)
    }

    /// Zero-phase filtering: odd-extend by `pad_len` on both ends, run the
    /// cascade forward then backward, trim the extensions. Returns `None`
    /// when the series is too short to pad, which callers treat as
    /// "skip this path", never as an error.
    pub fn filtfilt(&self, x: &[f64]) -> Option<Vec<f64>> {
        let pad = self.pad_len();
        let n = x.len();
        if n <= pad {
            return None;
        }

        let first = x[0];
        let last = x[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * pad);
        for i in (1..=pad).rev() {
            ext.push(2.0 * first - x[i]);
        }
        ext.extend_from_slice(x);
        for i in 1..=pad {
            ext.push(2.0 * last - x[n - 1 - i]);
        }

        self.run(&mut ext);
        ext.reverse();
        self.run(&mut ext);
        ext.reverse();

        Some(ext[pad..pad + n].to_vec())
    }

    /// One forward pass of the cascade, in place. Each section starts from
    /// its settled state for the buffer's first sample.
    fn run(&self, x: &mut [f64]) {
        for sec in &self.sections {
            let (mut s0, mut s1) = sec.settled_state(x[0]);
            for v in x.iter_mut() {
                let y = sec.b[0] * *v + s0;
                s0 = sec.b[1] * *v - sec.a[0] * y + s1;
                s1 = sec.b[2] * *v - sec.a[1] * y;
                *v = y;
            }
        }
    }
}

fn validate_cutoff(cutoff_hz: f64, sample_rate: f64) -> Result<()> {
    if !(sample_rate > 0.0) {
        bail!("sample rate must be positive, got {sample_rate}");
    }
    if !(cutoff_hz > 0.0 && cutoff_hz < sample_rate / 2.0) {
        bail!(
            "cutoff {cutoff_hz} Hz outside (0, {}) for sample rate {sample_rate} Hz",
            sample_rate / 2.0
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Response {
    Lowpass,
    Highpass,
}

/// Butterworth analog prototype poles on the left-half s-plane unit circle.
fn butterworth_poles(order: usize) -> Vec<Complex64> {
    (0..order)
        .map(|k| {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            Complex64::new(theta.cos(), theta.sin())
        })
        .collect()
}

/// Design the biquad cascade for one Butterworth response via bilinear
/// transform with frequency pre-warping. Conjugate pole pairs become one
/// second-order section each (built from the upper-half-plane member);
/// real poles become first-order sections.
fn design_sections(
    order: usize,
    cutoff_hz: f64,
    sample_rate: f64,
    response: Response,
) -> Vec<Biquad> {
    let wc = 2.0 * sample_rate * (PI * cutoff_hz / sample_rate).tan();
    let k = 2.0 * sample_rate;

    let mut sections = Vec::new();
    for pole in butterworth_poles(order) {
        if pole.im > 1e-9 {
            sections.push(bilinear_pair(pole * wc, k, response));
        } else if pole.im.abs() <= 1e-9 {
            sections.push(bilinear_real(pole.re * wc, k, response));
        }
        // lower-half-plane poles are the conjugates of sections already built
    }
    sections
}

/// Bilinear transform of a single real analog pole `p` (p < 0).
fn bilinear_real(p: f64, k: f64, response: Response) -> Biquad {
    let alpha = k - p;
    match response {
        Response::Lowpass => Biquad {
            b: [-p / alpha, -p / alpha, 0.0],
            a: [-(k + p) / alpha, 0.0],
        },
        Response::Highpass => Biquad {
            b: [k / alpha, -k / alpha, 0.0],
            a: [-(k + p) / alpha, 0.0],
        },
    }
}

/// Bilinear transform of a conjugate analog pole pair represented by its
/// upper-half-plane member `p`.
fn bilinear_pair(p: Complex64, k: f64, response: Response) -> Biquad {
    let mag_sq = p.norm_sqr();
    let k2 = k * k;
    let d = k2 - 2.0 * k * p.re + mag_sq;
    let a = [2.0 * (mag_sq - k2) / d, (k2 + 2.0 * k * p.re + mag_sq) / d];
    match response {
        Response::Lowpass => Biquad {
            b: [mag_sq / d, 2.0 * mag_sq / d, mag_sq / d],
            a,
        },
        Response::Highpass => Biquad {
            b: [k2 / d, -2.0 * k2 / d, k2 / d],
            a,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_passes_dc_exactly() {
        let filter = SosFilter::butterworth_lowpass(3, 0.1, 100.0).unwrap();
        let x = vec![42.0; 200];
        let y = filter.filtfilt(&x).unwrap();
        assert_eq!(y.len(), x.len());
        for v in &y {
            assert!((v - 42.0).abs() < 1e-9, "DC should pass untouched, got {v}");
        }
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let filter = SosFilter::butterworth_highpass(3, 0.5, 100.0).unwrap();
        let x = vec![17.0; 400];
        let y = filter.filtfilt(&x).unwrap();
        for v in &y {
            assert!(v.abs() < 1e-6, "constant input should be rejected, got {v}");
        }
    }

    #[test]
    fn test_bandpass_attenuates_out_of_band_sine() {
        let filter = SosFilter::butterworth_bandpass(3, 0.5, 5.0, 100.0).unwrap();
        // 20 Hz sine sits well above the passband
        let x: Vec<f64> = (0..1000)
            .map(|i| (2.0 * PI * 20.0 * i as f64 / 100.0).sin())
            .collect();
        let y = filter.filtfilt(&x).unwrap();
        // measured away from the ends, where padding transients live
        let peak = y[100..900].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak < 0.05, "20 Hz should be heavily attenuated, peak {peak}");
    }

    #[test]
    fn test_bandpass_keeps_in_band_sine() {
        let filter = SosFilter::butterworth_bandpass(3, 0.5, 5.0, 100.0).unwrap();
        let x: Vec<f64> = (0..2000)
            .map(|i| (2.0 * PI * 2.0 * i as f64 / 100.0).sin())
            .collect();
        let y = filter.filtfilt(&x).unwrap();
        // Interior peak should stay near unity gain
        let peak = y[200..1800].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak > 0.8, "2 Hz should pass, interior peak {peak}");
    }

    #[test]
    fn test_zero_phase_keeps_step_centered() {
        let filter = SosFilter::butterworth_lowpass(3, 2.0, 100.0).unwrap();
        let mut x = vec![0.0; 400];
        for v in x.iter_mut().skip(200) {
            *v = 1.0;
        }
        let y = filter.filtfilt(&x).unwrap();
        // The half-amplitude crossing of a zero-phase response stays at the
        // step location instead of lagging behind it.
        let crossing = y.iter().position(|&v| v >= 0.5).unwrap();
        assert!(
            (crossing as i64 - 200).abs() <= 2,
            "transition midpoint drifted to {crossing}"
        );
    }

    #[test]
    fn test_short_series_skips_path() {
        let filter = SosFilter::butterworth_lowpass(3, 0.1, 100.0).unwrap();
        assert_eq!(filter.pad_len(), 12);
        assert!(filter.filtfilt(&vec![1.0; 12]).is_none());
        assert!(filter.filtfilt(&vec![1.0; 13]).is_some());
    }

    #[test]
    fn test_bandpass_pad_len_doubles() {
        let filter = SosFilter::butterworth_bandpass(3, 0.5, 5.0, 100.0).unwrap();
        assert_eq!(filter.pad_len(), 21);
    }

    #[test]
    fn test_invalid_designs_are_rejected() {
        assert!(SosFilter::butterworth_lowpass(3, 60.0, 100.0).is_err());
        assert!(SosFilter::butterworth_bandpass(3, 5.0, 0.5, 100.0).is_err());
        assert!(SosFilter::butterworth_bandpass(3, 0.5, 50.0, 100.0).is_err());
        assert!(SosFilter::butterworth_highpass(3, 0.0, 100.0).is_err());
    }
}
