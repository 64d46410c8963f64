//! State-Variable Filter
//!
//! Chamberlin two-integrator filter with low, high and band outputs plus an
//! exact bypass band. Coefficients are derived at control rate from the
//! center frequency, octave offset, keyboard tracking and the current
//! frequency modulation; the per-sample path only runs the integrator loop.

use std::f64::consts::PI;

use libm::Libm;
use serde::{Deserialize, Serialize};

use crate::units::{
    DEFAULT_SAMPLE_RATE, FILTER_MAX_FREQUENCY, FILTER_MAX_Q, FILTER_MIN_FREQUENCY, FILTER_MIN_Q,
};

const MAX_OCTAVE_OFFSET: f64 = 6.99;

// The coefficient cap keeps the integrator loop stable when the effective
// cutoff approaches Nyquist.
const MAX_F_COEFF: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterBand {
    LowPass,
    HighPass,
    BandPass,
    /// Bypass: input is returned untouched and the integrators stay frozen.
    PassAll,
}

pub struct Svf {
    sample_rate: f64,
    band: FilterBand,
    center: f64,
    octave: f64,
    q: f64,
    kbd_track: f64,
    note_freq: f64,
    freq_mod: f64,
    f: f64,
    damp: f64,
    lowpass: f64,
    highpass: f64,
    bandpass: f64,
}

impl Svf {
    pub fn new(sample_rate: f64) -> Self {
        let mut svf = Self {
            sample_rate,
            band: FilterBand::LowPass,
            center: 1000.0,
            octave: 0.0,
            q: FILTER_MIN_Q,
            kbd_track: 0.0,
            note_freq: 440.0,
            freq_mod: 0.0,
            f: 0.0,
            damp: 0.0,
            lowpass: 0.0,
            highpass: 0.0,
            bandpass: 0.0,
        };
        svf.update_coefficients();
        svf
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    pub fn set_band(&mut self, band: FilterBand) {
        self.band = band;
    }

    pub fn band(&self) -> FilterBand {
        self.band
    }

    pub fn set_center_frequency(&mut self, hz: f64) {
        self.center = hz.clamp(FILTER_MIN_FREQUENCY, FILTER_MAX_FREQUENCY);
        self.update_coefficients();
    }

    pub fn set_octave_offset(&mut self, octaves: f64) {
        self.octave = octaves.clamp(0.0, MAX_OCTAVE_OFFSET);
        self.update_coefficients();
    }

    pub fn set_q(&mut self, q: f64) {
        self.q = q.clamp(FILTER_MIN_Q, FILTER_MAX_Q);
        self.update_coefficients();
    }

    pub fn set_keyboard_tracking(&mut self, amount: f64) {
        self.kbd_track = amount.clamp(0.0, 1.0);
        self.update_coefficients();
    }

    /// Frequency of the sounding note, used by keyboard tracking.
    pub fn set_note_frequency(&mut self, hz: f64) {
        self.note_freq = hz;
        self.update_coefficients();
    }

    /// Bipolar cutoff modulation in octaves, refreshed each control tick.
    pub fn set_frequency_modulation(&mut self, amount: f64) {
        self.freq_mod = amount.clamp(-1.0, 1.0);
        self.update_coefficients();
    }

    pub fn reset(&mut self) {
        self.lowpass = 0.0;
        self.highpass = 0.0;
        self.bandpass = 0.0;
        self.freq_mod = 0.0;
        self.update_coefficients();
    }

    /// Run one sample through the integrator loop.
    pub fn process(&mut self, input: f64) -> f64 {
        if self.band == FilterBand::PassAll {
            return input;
        }

        self.lowpass += self.f * self.bandpass;
        self.highpass = input - self.lowpass - self.damp * self.bandpass;
        self.bandpass += self.f * self.highpass;

        match self.band {
            FilterBand::LowPass => self.lowpass,
            FilterBand::HighPass => self.highpass,
            FilterBand::BandPass => self.bandpass,
            FilterBand::PassAll => input,
        }
    }

    fn update_coefficients(&mut self) {
        let tracked = self.center + self.kbd_track * (self.note_freq - self.center);
        let fc = tracked * Libm::<f64>::exp2(self.octave) * Libm::<f64>::exp2(self.freq_mod);
        let fc = fc.clamp(FILTER_MIN_FREQUENCY, 0.45 * self.sample_rate);
        self.f = (2.0 * (PI * fc / self.sample_rate).sin()).min(MAX_F_COEFF);
        self.damp = 1.0 / self.q;
    }
}

impl Default for Svf {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}
