//! Low-Frequency Oscillator
//!
//! Control-rate modulator sharing the audio oscillator's shape table. Output
//! is bipolar; consumers map it to their own modulation ranges.

use crate::osc::{shape_value, Waveform};
use crate::rng::Rng;
use crate::units::{control_rate, DEFAULT_SAMPLE_RATE, LFO_MAX_FREQUENCY, LFO_MIN_FREQUENCY};

pub struct Lfo {
    waveform: Waveform,
    sample_rate: f64,
    frequency: f64,
    phase: f64,
    held: f64,
    last: f64,
    rng: Rng,
}

impl Lfo {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            waveform: Waveform::Sine,
            sample_rate,
            frequency: 1.0,
            phase: 0.0,
            held: 0.0,
            last: 0.0,
            rng: Rng::new(1),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_frequency(&mut self, hz: f64) {
        self.frequency = hz.clamp(LFO_MIN_FREQUENCY, LFO_MAX_FREQUENCY);
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = Rng::new(seed);
    }

    /// Restart the cycle, drawing a fresh sample-and-hold value.
    pub fn sync(&mut self) {
        self.phase = 0.0;
        self.held = self.rng.next_bipolar();
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.held = 0.0;
        self.last = 0.0;
    }

    /// Value computed by the most recent tick.
    pub fn value(&self) -> f64 {
        self.last
    }

    /// Advance one control tick and return the bipolar output.
    pub fn tick(&mut self) -> f64 {
        let out = shape_value(self.waveform, self.phase, 0.5, self.held);

        self.phase += self.frequency / control_rate(self.sample_rate);
        if self.phase >= 1.0 {
            self.phase -= 1.0;
            self.held = self.rng.next_bipolar();
        }

        self.last = out;
        out
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}
