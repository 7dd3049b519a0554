//! Sparse discrete Fourier correlator: nine target frequencies, one per bit.
//!
//! A full FFT would tie the frequency grid to the window length; here the
//! window (symbol period) is adjusted live by the clock-recovery loop while
//! the nine frequencies stay fixed, so each is correlated directly.

use crate::protocol::{BIT_COUNT, CORRELATOR_GAIN};

/// Sine of `f` turns (2π·f radians).
#[inline]
fn nsin(f: f32) -> f32 {
    (f * std::f32::consts::TAU).sin()
}

/// Cosine of `f` turns.
#[inline]
fn ncos(f: f32) -> f32 {
    nsin(f + 0.25)
}

/// Accumulates sine/cosine correlations of one symbol window against
/// frequencies 1..=BIT_COUNT (in cycles per window).
#[derive(Debug, Clone)]
pub struct Fourier {
    /// Samples consumed into the current window.
    i: usize,
    /// Current symbol period estimate in samples. Adjusted between symbols
    /// by clock recovery; read live during accumulation.
    pub sample_count: usize,
    /// (sin, cos) accumulator per frequency, index f-1.
    bins: [(f32, f32); BIT_COUNT],
}

impl Fourier {
    pub fn new(sample_count: usize) -> Self {
        Self {
            i: 0,
            sample_count,
            bins: [(0.0, 0.0); BIT_COUNT],
        }
    }

    /// Correlate one conditioned sample against all nine frequencies.
    /// Returns true once the window holds `sample_count` samples and must be
    /// read out and reset before the next call.
    pub fn add_sample(&mut self, fsample: f32) -> bool {
        let n = self.sample_count as f32;
        for (f, bin) in self.bins.iter_mut().enumerate() {
            let turns = ((f + 1) * self.i) as f32 / n;
            bin.0 += nsin(turns) * fsample * CORRELATOR_GAIN / n;
            bin.1 += ncos(turns) * fsample * CORRELATOR_GAIN / n;
        }
        self.i += 1;
        self.i >= self.sample_count
    }

    /// Squared magnitude per frequency. No square root is taken; the bit
    /// threshold is expressed against the square.
    pub fn powers(&self) -> [f32; BIT_COUNT] {
        let mut out = [0.0; BIT_COUNT];
        for (p, &(s, c)) in out.iter_mut().zip(&self.bins) {
            *p = s * s + c * c;
        }
        out
    }

    /// Phase of the lowest frequency in signed turns (-0.5, 0.5].
    ///
    /// The argument order (cos, sin) ties the sign to the direction of clock
    /// error the synchronizer corrects for; do not swap it.
    pub fn phase(&self) -> f32 {
        let (sin, cos) = self.bins[0];
        cos.atan2(sin) / std::f32::consts::TAU
    }

    /// Samples consumed into the current window.
    pub fn fill(&self) -> usize {
        self.i
    }

    pub fn reset(&mut self) {
        self.bins = [(0.0, 0.0); BIT_COUNT];
        self.i = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::BIT_POWER_THRESHOLD;

    const N: usize = 20;

    /// Run one full window of `signal(t)` through a fresh accumulator.
    fn correlate(signal: impl Fn(usize) -> f32) -> Fourier {
        let mut fourier = Fourier::new(N);
        for t in 0..N {
            let ready = fourier.add_sample(signal(t));
            assert_eq!(ready, t == N - 1);
        }
        fourier
    }

    #[test]
    fn test_single_tone_lands_in_its_bin() {
        for f in 1..=BIT_COUNT {
            let fourier =
                correlate(|t| 0.5 + 0.08 * nsin((f * t) as f32 / N as f32));
            let powers = fourier.powers();
            for (g, &p) in powers.iter().enumerate() {
                if g + 1 == f {
                    assert!(p > BIT_POWER_THRESHOLD, "f={f}: own bin {p}");
                } else {
                    assert!(p < BIT_POWER_THRESHOLD, "f={f}: bin {} leaks {p}", g + 1);
                }
            }
        }
    }

    #[test]
    fn test_dc_produces_no_power() {
        let fourier = correlate(|_| 0.5);
        for (f, &p) in fourier.powers().iter().enumerate() {
            assert!(p < 1e-6, "bin {} sees DC: {p}", f + 1);
        }
    }

    #[test]
    fn test_aligned_tone_has_zero_phase() {
        let fourier = correlate(|t| 0.5 + 0.5 * nsin(t as f32 / N as f32));
        let phase = fourier.phase() * N as f32;
        assert!(phase.abs() < 0.25, "phase {phase}");
    }

    #[test]
    fn test_phase_sign_tracks_window_offset() {
        // Window starting late into the waveform reads a positive phase,
        // starting early reads negative.
        for offset in [-2i32, -1, 1, 2] {
            let fourier = correlate(|t| {
                0.5 + 0.5 * nsin((t as i32 + offset) as f32 / N as f32)
            });
            let phase = (fourier.phase() * N as f32).round() as i32;
            assert_eq!(phase, offset, "offset {offset} read as {phase}");
        }
    }

    #[test]
    fn test_reset_clears_window() {
        let mut fourier = correlate(|t| 0.5 + 0.5 * nsin(t as f32 / N as f32));
        fourier.reset();
        assert_eq!(fourier.fill(), 0);
        assert!(fourier.powers().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_fill_stays_below_sample_count_between_symbols() {
        let mut fourier = Fourier::new(N);
        for t in 0..5 * N {
            if fourier.add_sample(0.5 + 0.5 * nsin(t as f32 / N as f32)) {
                fourier.reset();
            }
            assert!(fourier.fill() < fourier.sample_count);
        }
    }
}
