//! Colored Noise Generator
//!
//! White, pink and brown noise from the deterministic generator. Pink uses
//! the Voss-McCartney row scheme; brown is a leaky integrator over white.

use crate::rng::Rng;
use serde::{Deserialize, Serialize};

const PINK_ROWS: usize = 16;

// Leaky-integrator coefficients for brown noise, with a make-up gain that
// brings its stationary level near white's.
const BROWN_LEAK: f64 = 0.998;
const BROWN_STEP: f64 = 0.02;
const BROWN_GAIN: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

pub struct NoiseGenerator {
    color: NoiseColor,
    amplitude: f64,
    rng: Rng,
    rows: [f64; PINK_ROWS],
    running_sum: f64,
    counter: u32,
    brown: f64,
}

impl NoiseGenerator {
    /// Create a generator. A zero seed is corrected to 1 by the RNG.
    pub fn new(seed: u64) -> Self {
        Self {
            color: NoiseColor::White,
            amplitude: 1.0,
            rng: Rng::new(seed),
            rows: [0.0; PINK_ROWS],
            running_sum: 0.0,
            counter: 0,
            brown: 0.0,
        }
    }

    pub fn set_color(&mut self, color: NoiseColor) {
        self.color = color;
    }

    pub fn color(&self) -> NoiseColor {
        self.color
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = amplitude.clamp(0.0, 1.0);
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = Rng::new(seed);
    }

    pub fn reset(&mut self) {
        self.rows = [0.0; PINK_ROWS];
        self.running_sum = 0.0;
        self.counter = 0;
        self.brown = 0.0;
    }

    /// Next colored sample in [-1, 1], scaled by the amplitude setting.
    pub fn next_sample(&mut self) -> f64 {
        let v = match self.color {
            NoiseColor::White => self.rng.next_bipolar(),
            NoiseColor::Pink => self.next_pink(),
            NoiseColor::Brown => self.next_brown(),
        };
        v * self.amplitude
    }

    // Voss-McCartney: row i is refreshed every 2^i samples; the running sum
    // of all rows approximates a 1/f spectrum.
    fn next_pink(&mut self) -> f64 {
        self.counter = self.counter.wrapping_add(1);
        let changed = (self.counter ^ self.counter.wrapping_sub(1)).trailing_ones() as usize;

        for i in 0..changed.min(PINK_ROWS) {
            self.running_sum -= self.rows[i];
            self.rows[i] = self.rng.next_bipolar();
            self.running_sum += self.rows[i];
        }

        self.running_sum / PINK_ROWS as f64
    }

    fn next_brown(&mut self) -> f64 {
        self.brown = self.brown * BROWN_LEAK + BROWN_STEP * self.rng.next_bipolar();
        (self.brown * BROWN_GAIN).clamp(-1.0, 1.0)
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}
