//! Decoder: raw audio samples → byte stream (streaming, one sample per call).
//!
//! Three cooperating parts: a signal conditioner that learns baseline,
//! polarity and dynamic range; a symbol-clock synchronizer that discovers the
//! symbol period from the first wave and tracks drift; and the sparse Fourier
//! correlator that turns each symbol window into a 9-bit word.

use tracing::{debug, trace};

use crate::fourier::Fourier;
use crate::protocol::*;

/// Synchronizer state. Calibration runs strictly left to right; `Eof` is
/// terminal and a silence word during calibration restarts from `Init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    DetectPolarity,
    DetectWaveFirstHalf,
    DetectWaveSecondHalf,
    DetectCalibrate,
    DecodeData,
    Eof,
}

/// Result of feeding one sample into [`Decoder::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// More samples are required.
    Pending,
    /// A data byte was decoded (sync flag already stripped).
    Byte(u8),
    /// Terminal silence word received in the data phase; no further bytes
    /// will ever be produced.
    Eof,
}

/// Outcome of one sample against the Fourier accumulator.
enum Symbol {
    /// Window not yet full.
    Pending,
    /// Window decoded to the all-zero word.
    Silence,
    /// Window decoded to a nonzero 9-bit word.
    Word(u16),
}

/// Streaming decoder for the nine-tone wire format.
///
/// Feed samples one at a time; the decoder needs no lookahead and allocates
/// nothing after construction. One decoder per stream.
#[derive(Debug)]
pub struct Decoder {
    state: State,
    /// Direction of the first detected half-wave; false inverts the
    /// normalized signal.
    polarity: bool,
    /// Per-symbol phase corrections in sample units, newest first.
    phase: i32,
    phase2: i32,
    phase3: i32,
    /// Running DC estimate, used only before polarity commits.
    baseline: u16,
    signal_min: u16,
    signal_max: u16,
    fourier: Fourier,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            state: State::Init,
            polarity: false,
            phase: 0,
            phase2: 0,
            phase3: 0,
            baseline: 0,
            signal_min: 0,
            signal_max: 0,
            fourier: Fourier::new(0),
        }
    }

    /// Feed one raw sample in conditioner units (nominally 0..=SIGNAL_RANGE).
    pub fn decode(&mut self, sample: u16) -> Output {
        // Conditioned sample, available once calibration fixed the range.
        // The range keeps widening so louder passages stay in [0, 1].
        let fsample = if self.calibrated() {
            self.track_range(sample);
            Some(self.normalize(sample))
        } else {
            None
        };

        match self.state {
            State::Init => {
                self.baseline = sample;
                self.fourier.sample_count = 0;
                self.set_state(State::DetectPolarity);
                Output::Pending
            }
            State::DetectPolarity => {
                let diff = sample as i32 - self.baseline as i32;
                if diff.abs() > POLARITY_THRESHOLD {
                    self.polarity = diff > 0;
                    self.signal_min = self.baseline;
                    self.signal_max = self.baseline;
                    self.set_state(State::DetectWaveFirstHalf);
                    // The committing sample already belongs to the first
                    // half-wave; reprocess it in the new state.
                    self.first_half_wave(sample);
                } else {
                    self.baseline = (self.baseline as i32 + diff / 8) as u16;
                }
                Output::Pending
            }
            State::DetectWaveFirstHalf => {
                self.first_half_wave(sample);
                Output::Pending
            }
            State::DetectWaveSecondHalf => {
                self.second_half_wave(sample);
                Output::Pending
            }
            State::DetectCalibrate => {
                if self.phase < 0 {
                    self.phase += 1;
                    return Output::Pending;
                }
                let fsample = fsample.unwrap_or(0.5);
                match self.decode_word(fsample) {
                    Symbol::Pending => {}
                    Symbol::Silence => {
                        // Wave detection triggered on noise; start over.
                        debug!("silence word during calibration, restarting");
                        self.set_state(State::Init);
                    }
                    Symbol::Word(word) => {
                        self.track_clock();
                        if word == (START_BYTE as u16 | SYNC_FLAG) {
                            self.set_state(State::DecodeData);
                        }
                        if self.phase > 0 {
                            let _ = self.decode_word(fsample);
                        }
                    }
                }
                Output::Pending
            }
            State::DecodeData => {
                if self.phase < 0 {
                    self.phase += 1;
                    return Output::Pending;
                }
                let fsample = fsample.unwrap_or(0.5);
                match self.decode_word(fsample) {
                    Symbol::Pending => Output::Pending,
                    Symbol::Silence => {
                        self.set_state(State::Eof);
                        Output::Eof
                    }
                    Symbol::Word(word) => {
                        self.track_clock();
                        if self.phase > 0 {
                            let _ = self.decode_word(fsample);
                        }
                        Output::Byte((word & 0xFF) as u8)
                    }
                }
            }
            State::Eof => Output::Eof,
        }
    }

    /// Feed one sample as f32 in [-1, 1], applying the reference PCM mapping.
    pub fn decode_f32(&mut self, sample: f32) -> Output {
        let scaled = (sample.clamp(-1.0, 1.0) + 1.0) / 2.0 * SIGNAL_RANGE as f32;
        self.decode(scaled as u16)
    }

    /// True once the decoder has left a terminal state behind it.
    pub fn is_eof(&self) -> bool {
        self.state == State::Eof
    }

    fn calibrated(&self) -> bool {
        matches!(
            self.state,
            State::DetectCalibrate | State::DecodeData | State::Eof
        )
    }

    fn set_state(&mut self, state: State) {
        trace!(from = ?self.state, to = ?state, "state transition");
        self.state = state;
    }

    fn track_range(&mut self, sample: u16) {
        if sample > self.signal_max {
            self.signal_max = sample;
        }
        if sample < self.signal_min {
            self.signal_min = sample;
        }
    }

    /// Normalize into [0, 1] with a positive-going first half-wave.
    fn normalize(&self, sample: u16) -> f32 {
        let range = self.signal_max - self.signal_min;
        if range == 0 {
            // No dynamic range observed; any value in [0, 1] is acceptable
            // here, the synchronizer restarts shortly.
            return 0.5;
        }
        let fsample = (sample - self.signal_min) as f32 / range as f32;
        if self.polarity {
            fsample
        } else {
            1.0 - fsample
        }
    }

    /// First half-wave: grow the range until the excursion from the leading
    /// extremum exceeds the full observed range, which marks the turn.
    fn first_half_wave(&mut self, sample: u16) {
        self.fourier.sample_count += 1;
        let diff = if self.polarity {
            self.signal_max as i32 - sample as i32
        } else {
            sample as i32 - self.signal_min as i32
        };
        if diff > (self.signal_max - self.signal_min) as i32 {
            self.set_state(State::DetectWaveSecondHalf);
        }
        self.track_range(sample);
    }

    /// Second half-wave: calibration completes when the signal crosses the
    /// midpoint back in the polarity direction, one full period after the
    /// trigger. The count of samples seen so far seeds the symbol period.
    fn second_half_wave(&mut self, sample: u16) {
        self.fourier.sample_count += 1;
        self.track_range(sample);
        let midpoint = (self.signal_max as i32 + self.signal_min as i32) / 2;
        if (sample as i32 > midpoint) == self.polarity {
            if self.fourier.sample_count < SAMPLE_COUNT_MIN {
                self.fourier.sample_count = SAMPLE_COUNT_MIN;
            }
            debug!(sample_count = self.fourier.sample_count, "clock seeded");
            self.phase = 0;
            self.phase2 = 0;
            self.phase3 = 0;
            self.set_state(State::DetectCalibrate);
        }
    }

    /// Feed one conditioned sample; on a full window, decide bits, read the
    /// symbol phase off the lowest frequency, and reset the accumulator.
    fn decode_word(&mut self, fsample: f32) -> Symbol {
        if !self.fourier.add_sample(fsample) {
            return Symbol::Pending;
        }
        let mut word = 0u16;
        for (f, &p) in self.fourier.powers().iter().enumerate() {
            if p > BIT_POWER_THRESHOLD {
                word |= 1 << frequency_bit(f + 1);
            }
        }
        if word & SYNC_FLAG != 0 {
            // One full wavelength of the lowest frequency spans the whole
            // window, so its phase converts directly to a sample offset.
            self.phase = (self.fourier.phase() * self.fourier.sample_count as f32)
                .round() as i32;
        } else {
            self.phase = 0;
        }
        self.fourier.reset();
        if word == 0 {
            Symbol::Silence
        } else {
            Symbol::Word(word)
        }
    }

    /// Clock drift rule: three same-signed phase corrections in a row mean
    /// the period estimate itself is off; fold their mean into sample_count
    /// and clear phase2 so the next bulk correction needs fresh evidence.
    fn track_clock(&mut self) {
        if self.phase != 0
            && self.phase2 != 0
            && self.phase3 != 0
            && (self.phase < 0) == (self.phase2 < 0)
            && (self.phase2 < 0) == (self.phase3 < 0)
        {
            let correction =
                ((self.phase + self.phase2 + self.phase3) as f32 / 3.0).round() as i32;
            let adjusted = (self.fourier.sample_count as i32 - correction)
                .max(SAMPLE_COUNT_MIN as i32);
            debug!(
                from = self.fourier.sample_count,
                to = adjusted,
                "bulk clock correction"
            );
            self.fourier.sample_count = adjusted as usize;
            self.phase2 = 0;
        } else {
            self.phase3 = self.phase2;
            self.phase2 = self.phase;
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
