//! Karplus-Strong String Model
//!
//! Plucked-string generator: an excitation burst circulates through a
//! damped-averaging delay line. A running energy estimate lets the voice
//! detect when the string has rung out. The delay buffer is allocated once
//! at full size; note-on only changes the in-use length.

use std::f64::consts::TAU;

use libm::Libm;
use serde::{Deserialize, Serialize};

use crate::noise::{NoiseColor, NoiseGenerator};
use crate::rng::Rng;
use crate::units::{
    DEFAULT_SAMPLE_RATE, KS_MAX_BUFFER_LEN, OSC_MAX_FREQUENCY, OSC_MIN_FREQUENCY,
};

// Sustain-phase decay band; damping 0 maps to the top of the band.
const ON_DECAY_MIN: f64 = 0.9;
const ON_DECAY_MAX: f64 = 0.99999;

// Released-string band, much faster.
const OFF_DECAY_MIN: f64 = 0.5;
const OFF_DECAY_MAX: f64 = 0.999;

// Reference pitch for the frequency-scaled damping mode.
const DAMPING_REF_FREQ: f64 = 55.0;

/// How the string is set in motion at note-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Excitation {
    WhiteNoise,
    PinkNoise,
    BrownNoise,
    Sawtooth,
    Square,
    SineDecayed,
    SineChirp,
}

/// Mapping from the damping setting to the feedback decay coefficient.
/// `FrequencyScaled` raises the coefficient to a pitch-dependent power so
/// high notes ring out faster, like a physical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DampingMode {
    Direct,
    FrequencyScaled,
}

/// Pluck lifecycle. A retrigger passes back through `SteadyOutput` while the
/// fresh excitation is prepared, then arms via `SteadyBeginNext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KsState {
    SteadyOutput,
    SteadyBeginNext,
    Playing,
}

pub struct KarplusStrong {
    sample_rate: f64,
    state: KsState,
    buffer: Vec<f64>,
    len: usize,
    index: usize,
    excitation: Excitation,
    excitation_variation: f64,
    damping: f64,
    off_damping: f64,
    damping_mode: DampingMode,
    on_decay: f64,
    off_decay: f64,
    decay: f64,
    energy: f64,
    energy_alpha: f64,
    noise: NoiseGenerator,
    rng: Rng,
}

impl KarplusStrong {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            state: KsState::SteadyOutput,
            buffer: vec![0.0; KS_MAX_BUFFER_LEN],
            len: 2,
            index: 0,
            excitation: Excitation::WhiteNoise,
            excitation_variation: 0.0,
            damping: 0.5,
            off_damping: 0.5,
            damping_mode: DampingMode::Direct,
            on_decay: ON_DECAY_MAX,
            off_decay: OFF_DECAY_MAX,
            decay: ON_DECAY_MAX,
            energy: 0.0,
            energy_alpha: 0.25,
            noise: NoiseGenerator::new(1),
            rng: Rng::new(2),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    pub fn set_excitation(&mut self, excitation: Excitation) {
        self.excitation = excitation;
    }

    /// Blend of the chosen excitation toward plain white noise.
    pub fn set_excitation_variation(&mut self, variation: f64) {
        self.excitation_variation = variation.clamp(0.0, 1.0);
    }

    pub fn set_string_damping(&mut self, damping: f64) {
        self.damping = damping.clamp(0.0, 1.0);
    }

    pub fn set_string_off_damping(&mut self, damping: f64) {
        self.off_damping = damping.clamp(0.0, 1.0);
    }

    pub fn set_damping_mode(&mut self, mode: DampingMode) {
        self.damping_mode = mode;
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.noise.set_seed(seed);
        self.rng = Rng::new(seed.wrapping_add(1));
    }

    pub fn state(&self) -> KsState {
        self.state
    }

    /// Mean-squared output over roughly two delay-line periods.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Pluck the string. The delay length follows the pitch, capped at the
    /// preallocated buffer size and floored at two taps.
    pub fn note_on(&mut self, frequency: f64, velocity: f64) {
        let frequency = frequency.clamp(OSC_MIN_FREQUENCY, OSC_MAX_FREQUENCY);
        self.state = KsState::SteadyOutput;

        self.len = ((self.sample_rate / frequency) as usize).clamp(2, KS_MAX_BUFFER_LEN);
        self.energy_alpha = 1.0 / (2.0 * self.len as f64);

        let exponent = match self.damping_mode {
            DampingMode::Direct => 1.0,
            DampingMode::FrequencyScaled => {
                Libm::<f64>::sqrt(frequency / DAMPING_REF_FREQ).max(1.0)
            }
        };
        self.on_decay =
            Libm::<f64>::pow(decay_from(self.damping, ON_DECAY_MIN, ON_DECAY_MAX), exponent);
        self.off_decay =
            Libm::<f64>::pow(decay_from(self.off_damping, OFF_DECAY_MIN, OFF_DECAY_MAX), exponent);
        self.decay = self.on_decay;

        self.fill_excitation(velocity.clamp(0.0, 1.0));
        self.index = 0;
        self.state = KsState::SteadyBeginNext;
    }

    /// Switch the feedback loop to the faster released-string decay.
    pub fn note_off(&mut self) {
        self.decay = self.off_decay;
    }

    pub fn reset(&mut self) {
        self.state = KsState::SteadyOutput;
        self.buffer.fill(0.0);
        self.index = 0;
        self.energy = 0.0;
        self.decay = self.on_decay;
    }

    pub fn next_sample(&mut self) -> f64 {
        match self.state {
            KsState::SteadyOutput => 0.0,
            KsState::SteadyBeginNext => {
                self.state = KsState::Playing;
                self.advance()
            }
            KsState::Playing => self.advance(),
        }
    }

    fn advance(&mut self) -> f64 {
        let out = self.buffer[self.index];
        let next = (self.index + 1) % self.len;
        self.buffer[self.index] = self.decay * (out + self.buffer[next]) / 2.0;
        self.index = next;
        self.energy += self.energy_alpha * (out * out - self.energy);
        out
    }

    fn fill_excitation(&mut self, velocity: f64) {
        match self.excitation {
            Excitation::WhiteNoise => self.noise.set_color(NoiseColor::White),
            Excitation::PinkNoise => self.noise.set_color(NoiseColor::Pink),
            Excitation::BrownNoise => self.noise.set_color(NoiseColor::Brown),
            _ => {}
        }

        let variation = self.excitation_variation;
        let mut sum_sq = 0.0;
        for i in 0..self.len {
            let t = i as f64 / self.len as f64;
            let base = match self.excitation {
                Excitation::WhiteNoise | Excitation::PinkNoise | Excitation::BrownNoise => {
                    self.noise.next_sample()
                }
                Excitation::Sawtooth => 2.0 * t - 1.0,
                Excitation::Square => {
                    if t < 0.5 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                Excitation::SineDecayed => (t * TAU).sin() * (1.0 - t),
                Excitation::SineChirp => ((t + 1.5 * t * t) * TAU).sin(),
            };
            let sample = if variation > 0.0 && self.excitation != Excitation::WhiteNoise {
                (1.0 - variation) * base + variation * self.rng.next_bipolar()
            } else {
                base
            };
            let sample = sample * velocity;
            self.buffer[i] = sample;
            sum_sq += sample * sample;
        }
        self.energy = sum_sq / self.len as f64;
    }
}

impl Default for KarplusStrong {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

// damping = 0 picks the slowest decay in the band, 1 the fastest.
fn decay_from(damping: f64, min: f64, max: f64) -> f64 {
    max - damping * (max - min)
}
