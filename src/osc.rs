//! Audio-Rate Oscillator
//!
//! A multi-waveform oscillator producing one sample per call at a target
//! frequency. Supports pulse-width control on the square wave, hard sync
//! (a slaved oscillator resets its phase when the master completes a cycle),
//! and unison stacking of up to nine detuned copies with per-copy level and
//! drive. Detune is owned here; the voice asks for the effective frequency
//! once per control tick and feeds it back per sample.

use crate::rng::Rng;
use crate::units::{detuned_frequency, PWM_MAX_DUTY, PWM_MIN_DUTY};
use libm::Libm;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Waveform selector shared by oscillators and LFOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    SampleHold,
}

/// Maximum number of stacked unison copies.
pub const MAX_HARMONIES: usize = 9;

pub struct Oscillator {
    waveform: Waveform,
    sample_rate: f64,
    phase: f64,
    cycle_restarted: bool,
    duty: f64,
    duty_effective: f64,
    octave: i32,
    semitones: i32,
    cents: f64,
    harmonies: usize,
    harmony_levels: [f64; MAX_HARMONIES],
    harmony_detune_cents: f64,
    harmony_drive: f64,
    harmony_phases: [f64; MAX_HARMONIES],
    held: f64,
    rng: Rng,
}

impl Oscillator {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            waveform: Waveform::Sine,
            sample_rate,
            phase: 0.0,
            cycle_restarted: false,
            duty: 0.5,
            duty_effective: 0.5,
            octave: 0,
            semitones: 0,
            cents: 0.0,
            harmonies: 1,
            harmony_levels: [1.0; MAX_HARMONIES],
            harmony_detune_cents: 0.0,
            harmony_drive: 0.0,
            harmony_phases: [0.0; MAX_HARMONIES],
            held: 0.0,
            rng: Rng::new(1),
        }
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Base square-wave duty cycle, clamped into the safety band.
    pub fn set_duty(&mut self, duty: f64) {
        self.duty = duty.clamp(PWM_MIN_DUTY, PWM_MAX_DUTY);
        self.duty_effective = self.duty;
    }

    pub fn duty(&self) -> f64 {
        self.duty
    }

    /// Control-rate PWM modulation. Only a positive net value widens the
    /// duty from its base toward the upper band edge; negative values leave
    /// the base setting untouched.
    pub fn apply_duty_modulation(&mut self, net: f64) {
        if net > 0.0 {
            let widened = self.duty + net * (PWM_MAX_DUTY - self.duty);
            self.duty_effective = widened.clamp(PWM_MIN_DUTY, PWM_MAX_DUTY);
        } else {
            self.duty_effective = self.duty;
        }
    }

    pub fn set_detune_octave(&mut self, octave: i32) {
        self.octave = octave.clamp(-3, 3);
    }

    pub fn set_detune_semitones(&mut self, semitones: i32) {
        self.semitones = semitones.clamp(-12, 12);
    }

    pub fn set_detune_cents(&mut self, cents: f64) {
        self.cents = cents.clamp(-50.0, 50.0);
    }

    /// Effective frequency for a base pitch and a clamped modulation sum.
    pub fn detuned(&self, base: f64, freq_mod: f64) -> f64 {
        detuned_frequency(base, self.octave, self.semitones, self.cents, freq_mod)
    }

    /// Number of stacked copies, 1 (plain) to [`MAX_HARMONIES`].
    pub fn set_harmonies(&mut self, count: usize) {
        self.harmonies = count.clamp(1, MAX_HARMONIES);
    }

    pub fn set_harmony_level(&mut self, index: usize, level: f64) {
        if index < MAX_HARMONIES {
            self.harmony_levels[index] = level.clamp(0.0, 1.0);
        }
    }

    /// Symmetric unison spread in cents (true cents: 100 per semitone).
    pub fn set_harmony_detune_cents(&mut self, cents: f64) {
        self.harmony_detune_cents = cents.clamp(0.0, 100.0);
    }

    pub fn set_harmony_drive(&mut self, drive: f64) {
        self.harmony_drive = drive.clamp(0.0, 1.0);
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = Rng::new(seed);
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Hard sync: jump back to the start of the cycle.
    pub fn sync(&mut self) {
        self.phase = 0.0;
        self.harmony_phases = [0.0; MAX_HARMONIES];
        self.held = self.rng.next_bipolar();
    }

    /// True for exactly the sample on which the phase wrapped, so a slaved
    /// oscillator can be synced once per master cycle.
    pub fn cycle_restarted(&self) -> bool {
        self.cycle_restarted
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.harmony_phases = [0.0; MAX_HARMONIES];
        self.cycle_restarted = false;
        self.held = 0.0;
        self.duty_effective = self.duty;
    }

    /// Produce one sample at the given frequency and advance the phase.
    pub fn next_sample(&mut self, frequency: f64) -> f64 {
        let out = if self.harmonies <= 1 {
            self.shape(self.phase)
        } else {
            self.unison_sample(frequency)
        };

        self.cycle_restarted = false;
        self.phase += frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
            self.cycle_restarted = true;
            self.held = self.rng.next_bipolar();
        }

        out
    }

    fn unison_sample(&mut self, frequency: f64) -> f64 {
        let n = self.harmonies;
        let mut sum = 0.0;
        for i in 0..n {
            let offset = harmony_offset(i, n) * self.harmony_detune_cents;
            let f = frequency * Libm::<f64>::pow(2.0, offset / 1200.0);
            let s = shape_value(
                self.waveform,
                self.harmony_phases[i],
                self.duty_effective,
                self.held,
            );
            sum += drive_shape(s, self.harmony_drive) * self.harmony_levels[i];

            self.harmony_phases[i] += f / self.sample_rate;
            if self.harmony_phases[i] >= 1.0 {
                self.harmony_phases[i] -= self.harmony_phases[i].floor();
            }
        }
        // Constant perceived level independent of the stack size
        sum / (n as f64).sqrt()
    }

    fn shape(&self, phase: f64) -> f64 {
        shape_value(self.waveform, phase, self.duty_effective, self.held)
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(crate::units::DEFAULT_SAMPLE_RATE)
    }
}

pub(crate) fn shape_value(waveform: Waveform, phase: f64, duty: f64, held: f64) -> f64 {
    match waveform {
        Waveform::Sine => (phase * TAU).sin(),
        Waveform::Square => {
            if phase < duty {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Waveform::SampleHold => held,
    }
}

/// Position of copy `i` in a symmetric spread: -1 .. +1 across the stack.
fn harmony_offset(i: usize, n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else {
        (i as f64 / (n - 1) as f64 - 0.5) * 2.0
    }
}

/// Normalized tanh shaper; unity gain at full scale, identity at zero drive.
fn drive_shape(x: f64, drive: f64) -> f64 {
    if drive <= 0.0 {
        return x;
    }
    let g = 1.0 + 4.0 * drive;
    (g * x).tanh() / g.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sine_starts_at_zero_rising() {
        let mut osc = Oscillator::new(44_100.0);
        let first = osc.next_sample(440.0);
        let second = osc.next_sample(440.0);
        assert_abs_diff_eq!(first, 0.0, epsilon = 1e-12);
        assert!(second > first);
    }

    #[test]
    fn test_sine_periodicity() {
        let mut osc = Oscillator::new(44_100.0);
        let mut samples = Vec::new();
        for _ in 0..=101 {
            samples.push(osc.next_sample(440.0));
        }
        // One period at 440 Hz / 44.1 kHz is ~100.23 samples; the nearest
        // sample must come back to the starting value within the slip error
        assert!((samples[100] - samples[0]).abs() < 0.02);
    }

    #[test]
    fn test_frequency_via_zero_crossings() {
        let mut osc = Oscillator::new(44_100.0);
        let period = 44_100.0 / 261.63;
        let mut samples = Vec::new();
        for _ in 0..(period * 10.0) as usize {
            samples.push(osc.next_sample(261.63));
        }
        let crossings = samples
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count();
        // Ten periods give nine or ten full rising crossings
        assert!((8..=11).contains(&crossings));
    }

    #[test]
    fn test_square_duty_fraction() {
        let mut osc = Oscillator::new(44_100.0);
        osc.set_waveform(Waveform::Square);
        osc.set_duty(0.25);
        let n = 44_100;
        let high = (0..n)
            .filter(|_| osc.next_sample(100.0) > 0.0)
            .count() as f64;
        assert!((high / n as f64 - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_duty_clamped_to_safety_band() {
        let mut osc = Oscillator::new(44_100.0);
        osc.set_duty(0.0);
        assert_abs_diff_eq!(osc.duty(), PWM_MIN_DUTY);
        osc.set_duty(1.0);
        assert_abs_diff_eq!(osc.duty(), PWM_MAX_DUTY);
    }

    #[test]
    fn test_duty_modulation_only_widens_on_positive() {
        let mut osc = Oscillator::new(44_100.0);
        osc.set_duty(0.5);
        osc.apply_duty_modulation(-0.8);
        osc.set_waveform(Waveform::Square);
        // Negative modulation leaves the base duty in effect
        let n = 44_100;
        let high = (0..n)
            .filter(|_| osc.next_sample(100.0) > 0.0)
            .count() as f64;
        assert!((high / n as f64 - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_sync_and_cycle_restarted() {
        let mut osc = Oscillator::new(1000.0);
        // 125 Hz at 1 kHz advances phase by exactly 1/8 per sample
        let mut restarts = Vec::new();
        for i in 0..25 {
            osc.next_sample(125.0);
            if osc.cycle_restarted() {
                restarts.push(i);
            }
        }
        assert_eq!(restarts, vec![7, 15, 23]);

        osc.sync();
        let v = osc.next_sample(125.0);
        // After sync the sine restarts from phase zero
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sample_hold_constant_within_cycle() {
        let mut osc = Oscillator::new(1000.0);
        osc.set_waveform(Waveform::SampleHold);
        osc.set_seed(99);
        // Exact 8-sample cycles; the first cycle holds the initial zero
        let samples: Vec<f64> = (0..24).map(|_| osc.next_sample(125.0)).collect();
        let cycle1 = &samples[8..16];
        let cycle2 = &samples[16..24];
        assert!(cycle1.windows(2).all(|w| w[0] == w[1]));
        assert!(cycle2.windows(2).all(|w| w[0] == w[1]));
        assert_ne!(cycle1[0], cycle2[0]);
    }

    #[test]
    fn test_unison_output_bounded() {
        let mut osc = Oscillator::new(44_100.0);
        osc.set_harmonies(5);
        osc.set_harmony_detune_cents(15.0);
        let bound = (5.0f64).sqrt() + 1e-9;
        for _ in 0..4410 {
            let v = osc.next_sample(220.0);
            assert!(v.abs() <= bound);
        }
    }

    #[test]
    fn test_unison_levels_scale_output() {
        let mut osc = Oscillator::new(44_100.0);
        osc.set_harmonies(3);
        for i in 0..3 {
            osc.set_harmony_level(i, 0.0);
        }
        for _ in 0..100 {
            assert_abs_diff_eq!(osc.next_sample(220.0), 0.0);
        }
    }

    #[test]
    fn test_detune_setters_clamp() {
        let mut osc = Oscillator::new(44_100.0);
        osc.set_detune_octave(10);
        osc.set_detune_semitones(-40);
        osc.set_detune_cents(500.0);
        // 3 octaves up, 12 semitones down, +50 cents offset
        let f = osc.detuned(440.0, 0.0);
        assert_abs_diff_eq!(f, 440.0 * 8.0 / 2.0 * 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_triangle_range() {
        let mut osc = Oscillator::new(44_100.0);
        osc.set_waveform(Waveform::Triangle);
        for _ in 0..1000 {
            let v = osc.next_sample(440.0);
            assert!((-1.0..=1.0).contains(&v));
        }
    }
}
