//! Engine Constants and Boundary Conversions
//!
//! Everything here is a pure function or a constant: the engine itself is
//! float-native, and the 0–100 integer scale used by control surfaces is
//! converted at this boundary, never threaded through component state.

use libm::Libm;

/// Lowest frequency any generator will accept (Hz).
pub const OSC_MIN_FREQUENCY: f64 = 0.1;

/// Highest frequency any generator will accept (Hz, G9 / MIDI note 127).
pub const OSC_MAX_FREQUENCY: f64 = 12_543.853_951_416;

/// Audio samples per control tick. Envelopes, LFOs and modulation
/// coefficients advance once per control tick, not per sample.
pub const CONTROL_SUB_SAMPLING: usize = 16;

/// Hard ceiling on the voice pool size.
pub const MAX_VOICES: usize = 48;

/// Resonance bounds for the state-variable filter. Values outside this
/// window make the two-integrator loop unstable.
pub const FILTER_MIN_Q: f64 = 0.7;
pub const FILTER_MAX_Q: f64 = 5.0;

/// Center-frequency range for the filter's 0–100 control scale (Hz).
pub const FILTER_MIN_FREQUENCY: f64 = 20.0;
pub const FILTER_MAX_FREQUENCY: f64 = 16_000.0;

/// Rate range for the LFO bank's 0–100 control scale (Hz).
pub const LFO_MIN_FREQUENCY: f64 = 0.05;
pub const LFO_MAX_FREQUENCY: f64 = 30.0;

/// Longest reachable envelope segment times (seconds) at control value 100.
pub const ADSR_MAX_ATTACK_SEC: f64 = 5.0;
pub const ADSR_MAX_DECAY_SEC: f64 = 10.0;
pub const ADSR_MAX_RELEASE_SEC: f64 = 10.0;

/// Full-scale drain time of a forced release (legato retrigger), seconds.
pub const FORCE_RELEASE_SEC: f64 = 0.01;

/// Square-wave duty cycle safety band. A duty of exactly 0 or 1 is DC.
pub const PWM_MIN_DUTY: f64 = 0.05;
pub const PWM_MAX_DUTY: f64 = 0.95;

/// Amplitude-factor and send-level floor below which a generator no longer
/// counts as audible for voice recycling.
pub const SILENCE_LEVEL: f64 = 0.05;

/// Energy floor below which a plucked string counts as silent.
pub const KS_SILENCE_ENERGY: f64 = 5e-6;

/// Delay-line capacity of the string model, samples.
pub const KS_MAX_BUFFER_LEN: usize = 4096;

pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

/// Control ticks per second at the given sample rate.
pub fn control_rate(sample_rate: f64) -> f64 {
    sample_rate / CONTROL_SUB_SAMPLING as f64
}

/// MIDI note number to frequency, A440 tuning.
pub fn note_to_frequency(note: u8) -> f64 {
    440.0 * Libm::<f64>::pow(2.0, (note as f64 - 69.0) / 12.0)
}

/// Linear 0–100 control value to `[min, max]`.
pub fn linear_from_control(value: u32, min: f64, max: f64) -> f64 {
    let v = value.min(100) as f64;
    min + (max - min) * v / 100.0
}

/// Inverse of [`linear_from_control`], rounded to the nearest step.
pub fn control_from_linear(value: f64, min: f64, max: f64) -> u32 {
    if max <= min {
        return 0;
    }
    let n = ((value - min) / (max - min) * 100.0).round();
    n.clamp(0.0, 100.0) as u32
}

/// Logarithmic 0–100 control value to `[min + (max-min)/100, max]`.
///
/// This is the response curve shared by every time- and rate-like control
/// (envelope segments, LFO rate, filter frequency): two orders of magnitude
/// across the control's travel.
pub fn log_from_control(value: u32, min: f64, max: f64) -> f64 {
    let v = value.min(100) as f64;
    min + (max - min) * Libm::<f64>::pow(10.0, v / 50.0) / 100.0
}

/// Inverse of [`log_from_control`], rounded to the nearest step.
pub fn control_from_log(value: f64, min: f64, max: f64) -> u32 {
    if max <= min {
        return 0;
    }
    let ratio = ((value - min) / (max - min) * 100.0).max(1e-12);
    let n = (50.0 * Libm::<f64>::log10(ratio)).round();
    n.clamp(0.0, 100.0) as u32
}

/// Detuned, modulated generator frequency, clamped into the valid range.
///
/// `freq_mod` is the control-rate modulation sum, already clamped to [-1, 1]
/// by the routing layer; it lands in the exponent alongside the octave and
/// semitone offsets, while the cents offset scales linearly.
pub fn detuned_frequency(base: f64, octave: i32, semitones: i32, cents: f64, freq_mod: f64) -> f64 {
    let exponent = octave as f64 + semitones as f64 / 12.0 + freq_mod;
    let f = base * Libm::<f64>::pow(2.0, exponent) * (1.0 + cents / 100.0);
    f.clamp(OSC_MIN_FREQUENCY, OSC_MAX_FREQUENCY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_note_to_frequency() {
        assert_abs_diff_eq!(note_to_frequency(69), 440.0, epsilon = 1e-9);
        assert_abs_diff_eq!(note_to_frequency(57), 220.0, epsilon = 1e-9);
        // Top of the MIDI range lands exactly on the oscillator ceiling
        assert_abs_diff_eq!(note_to_frequency(127), OSC_MAX_FREQUENCY, epsilon = 1e-6);
    }

    #[test]
    fn test_linear_control_endpoints() {
        assert_abs_diff_eq!(linear_from_control(0, 0.0, 1.0), 0.0);
        assert_abs_diff_eq!(linear_from_control(50, 0.0, 1.0), 0.5);
        assert_abs_diff_eq!(linear_from_control(100, 0.0, 1.0), 1.0);
        // Out-of-range input saturates
        assert_abs_diff_eq!(linear_from_control(250, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_log_control_curve() {
        // value 100 reaches max exactly: 10^2 / 100 = 1
        assert_abs_diff_eq!(log_from_control(100, 0.0, 10.0), 10.0, epsilon = 1e-9);
        // value 0 sits at 1% of the span above min
        assert_abs_diff_eq!(log_from_control(0, 0.0, 10.0), 0.1, epsilon = 1e-9);
        // value 50 is one decade below max
        assert_abs_diff_eq!(log_from_control(50, 0.0, 10.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_control_round_trips() {
        for v in (0..=100).step_by(5) {
            let f = linear_from_control(v, 20.0, 16_000.0);
            assert_eq!(control_from_linear(f, 20.0, 16_000.0), v);

            let g = log_from_control(v, 0.0, ADSR_MAX_DECAY_SEC);
            assert_eq!(control_from_log(g, 0.0, ADSR_MAX_DECAY_SEC), v);
        }
    }

    #[test]
    fn test_detuned_frequency_formula() {
        // One octave up
        assert_abs_diff_eq!(detuned_frequency(440.0, 1, 0, 0.0, 0.0), 880.0, epsilon = 1e-9);
        // A semitone is 2^(1/12)
        assert_abs_diff_eq!(
            detuned_frequency(440.0, 0, 1, 0.0, 0.0),
            440.0 * 2f64.powf(1.0 / 12.0),
            epsilon = 1e-9
        );
        // Cents offset scales linearly, not exponentially
        assert_abs_diff_eq!(detuned_frequency(440.0, 0, 0, 10.0, 0.0), 484.0, epsilon = 1e-9);
        // Modulation of +1 is one octave
        assert_abs_diff_eq!(detuned_frequency(440.0, 0, 0, 0.0, 1.0), 880.0, epsilon = 1e-9);
    }

    #[test]
    fn test_detuned_frequency_clamps() {
        assert_abs_diff_eq!(detuned_frequency(0.001, 0, 0, 0.0, 0.0), OSC_MIN_FREQUENCY);
        assert_abs_diff_eq!(detuned_frequency(20_000.0, 3, 0, 0.0, 1.0), OSC_MAX_FREQUENCY);
    }

    #[test]
    fn test_control_rate() {
        assert_abs_diff_eq!(control_rate(44_100.0), 2756.25);
    }
}
