//! Wavetables
//!
//! Offline-built lookup tables shared read-only between voices through
//! `Arc`. Two builders: a symmetry-warped sine for the morphing-sine
//! generator, and a PAD-style additive table where each harmonic is spread
//! over a gaussian cluster of integer bins with random phases, so the table
//! loops seamlessly.

use std::f64::consts::TAU;
use std::sync::Arc;

use libm::Libm;

use crate::rng::Rng;

pub const PAD_MAX_HARMONICS: usize = 64;

/// Fundamental periods contained in a PAD table. The detuned cluster bins
/// around each harmonic need this headroom to stay integer.
const PAD_CYCLES: f64 = 16.0;

const DEFAULT_MORPH_LEN: usize = 2048;
const DEFAULT_PAD_LEN: usize = 8192;

// Degenerate warps divide by zero; keep the pivot off the edges.
const MIN_SYMMETRY: f64 = 0.05;
const MAX_SYMMETRY: f64 = 0.95;

/// A looped sample table plus the number of waveform periods it spans.
pub struct WaveTable {
    samples: Vec<f64>,
    cycles: f64,
}

impl WaveTable {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn cycles(&self) -> f64 {
        self.cycles
    }

    /// Linear-interpolated lookup at a phase in [0, 1).
    pub fn lookup(&self, phase: f64) -> f64 {
        let pos = phase * self.samples.len() as f64;
        let i = pos as usize % self.samples.len();
        let j = (i + 1) % self.samples.len();
        let frac = pos - pos.floor();
        self.samples[i] + frac * (self.samples[j] - self.samples[i])
    }
}

/// Sine with a piecewise-linear phase warp. `symmetry` moves the half-cycle
/// pivot: 0.5 is a plain sine, smaller values lean the peak left, larger
/// values lean it right.
pub fn morph_table(symmetry: f64, len: usize) -> WaveTable {
    let pivot = symmetry.clamp(MIN_SYMMETRY, MAX_SYMMETRY);
    let len = len.max(2);
    let mut samples = Vec::with_capacity(len);
    for i in 0..len {
        let t = i as f64 / len as f64;
        let warped = if t < pivot {
            0.5 * t / pivot
        } else {
            0.5 + 0.5 * (t - pivot) / (1.0 - pivot)
        };
        samples.push((warped * TAU).sin());
    }
    WaveTable { samples, cycles: 1.0 }
}

/// PAD-style additive table. Each entry of `harmonics` is the amplitude of
/// one overtone; `bandwidth_cents` widens the gaussian cluster of bins
/// around it (scaled with the harmonic number, like the original PADsynth
/// profile). Phases come from the seeded generator, so equal inputs build
/// equal tables.
pub fn pad_table(harmonics: &[f64], bandwidth_cents: f64, len: usize, seed: u64) -> WaveTable {
    let len = len.max(256);
    let mut rng = Rng::new(seed);
    let relative_width = Libm::<f64>::pow(2.0, bandwidth_cents.max(0.0) / 1200.0) - 1.0;

    // Sparse spectrum: (bin, amplitude, phase)
    let mut partials: Vec<(usize, f64, f64)> = Vec::new();
    for (k, &amplitude) in harmonics.iter().take(PAD_MAX_HARMONICS).enumerate() {
        if amplitude <= 0.0 {
            continue;
        }
        let center = (k + 1) as f64 * PAD_CYCLES;
        let sigma = (relative_width * center).max(0.01);
        let reach = (4.0 * sigma).ceil() as i64;
        let center_bin = center as i64;
        for bin in center_bin - reach..=center_bin + reach {
            if bin < 1 || bin as usize >= len / 2 {
                continue;
            }
            let d = bin as f64 - center;
            let weight = (-d * d / (2.0 * sigma * sigma)).exp();
            if weight < 1e-6 {
                continue;
            }
            partials.push((bin as usize, amplitude * weight, rng.next_f64() * TAU));
        }
    }

    let mut samples = vec![0.0; len];
    for (i, sample) in samples.iter_mut().enumerate() {
        let t = i as f64 / len as f64;
        let mut acc = 0.0;
        for &(bin, amplitude, phase) in &partials {
            acc += amplitude * (bin as f64 * t * TAU + phase).sin();
        }
        *sample = acc;
    }

    let peak = samples.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        for sample in &mut samples {
            *sample /= peak;
        }
    }

    WaveTable {
        samples,
        cycles: PAD_CYCLES,
    }
}

/// Phase-accumulating player over a shared table.
pub struct TableOsc {
    table: Arc<WaveTable>,
    sample_rate: f64,
    phase: f64,
}

impl TableOsc {
    pub fn new(table: Arc<WaveTable>, sample_rate: f64) -> Self {
        Self {
            table,
            sample_rate,
            phase: 0.0,
        }
    }

    pub fn set_table(&mut self, table: Arc<WaveTable>) {
        self.table = table;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    pub fn sync(&mut self) {
        self.phase = 0.0;
    }

    pub fn next_sample(&mut self, frequency: f64) -> f64 {
        let out = self.table.lookup(self.phase);
        self.phase += frequency / (self.table.cycles() * self.sample_rate);
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        out
    }
}

/// The engine's current pair of shared tables.
pub struct WavetableBank {
    morph: Arc<WaveTable>,
    pad: Arc<WaveTable>,
}

impl WavetableBank {
    pub fn new() -> Self {
        Self {
            morph: Arc::new(morph_table(0.5, DEFAULT_MORPH_LEN)),
            pad: Arc::new(pad_table(
                &[1.0, 0.5, 0.33, 0.25, 0.2, 0.17, 0.14, 0.12],
                40.0,
                DEFAULT_PAD_LEN,
                1,
            )),
        }
    }

    pub fn morph(&self) -> Arc<WaveTable> {
        Arc::clone(&self.morph)
    }

    pub fn pad(&self) -> Arc<WaveTable> {
        Arc::clone(&self.pad)
    }

    pub fn set_morph(&mut self, table: Arc<WaveTable>) {
        self.morph = table;
    }

    pub fn set_pad(&mut self, table: Arc<WaveTable>) {
        self.pad = table;
    }

    pub fn rebuild_morph(&mut self, symmetry: f64) {
        self.morph = Arc::new(morph_table(symmetry, DEFAULT_MORPH_LEN));
    }
}

impl Default for WavetableBank {
    fn default() -> Self {
        Self::new()
    }
}
