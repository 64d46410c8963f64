//! # Madrigal: Polyphonic Synthesizer Voice Engine
//!
//! `madrigal` is the per-voice signal core of a polyphonic subtractive
//! synthesizer: six generators per voice (two oscillators, colored noise, a
//! Karplus-Strong string, a morphing sine and a PAD wavetable) feeding two
//! filter buses, modulated by five LFOs and five ADSR envelopes through a
//! fixed routing matrix.
//!
//! ## Architecture
//!
//! Everything runs on the audio thread under a hard deadline:
//!
//! - **Control rate** - every 16 samples each voice advances its modulators,
//!   resolves the routing matrix and caches effective frequencies and levels
//! - **Audio rate** - the per-sample path only pulls generator samples,
//!   mixes the two buses and runs the filters
//! - **Voice pool** - a fixed arena of up to 48 voices with oldest-steal
//!   allocation and a polled finished-voice queue
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use madrigal::prelude::*;
//!
//! // Eight voices at 44.1kHz
//! let mut engine = PolyEngine::new(8, 44100.0);
//! engine.set_patch(&Patch::warm_pad());
//!
//! // Play a chord
//! engine.note_on(60, 0.8);
//! engine.note_on(64, 0.8);
//! engine.note_on(67, 0.8);
//!
//! // Render a block
//! let mut left = [0.0; 256];
//! let mut right = [0.0; 256];
//! engine.render(&mut left, &mut right);
//!
//! engine.note_off(60);
//! ```

pub mod amp;
pub mod distortion;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod karplus;
pub mod lfo;
pub mod modulation;
pub mod noise;
pub mod osc;
pub mod patch;
pub mod rng;
pub mod units;
pub mod voice;
pub mod wavetable;

/// Prelude module for convenient imports
pub mod prelude {
    // Generators
    pub use crate::karplus::{DampingMode, Excitation, KarplusStrong, KsState};
    pub use crate::noise::{NoiseColor, NoiseGenerator};
    pub use crate::osc::{Oscillator, Waveform, MAX_HARMONIES};
    pub use crate::wavetable::{
        morph_table, pad_table, TableOsc, WaveTable, WavetableBank, PAD_MAX_HARMONICS,
    };

    // Processors
    pub use crate::amp::OutputAmp;
    pub use crate::distortion::Distortion;
    pub use crate::filter::{FilterBand, Svf};

    // Modulators
    pub use crate::envelope::{Adsr, EnvStage};
    pub use crate::lfo::Lfo;
    pub use crate::modulation::{
        amp_factor, bipolar_modulation, EnvSource, LfoSource, ModMatrix, ModRouting, ModTarget,
    };

    // Voice and engine
    pub use crate::engine::PolyEngine;
    pub use crate::voice::Voice;

    // Patch model
    pub use crate::patch::{
        AmpPatch, DistortionPatch, EnvPatch, FilterPatch, KarplusPatch, LfoPatch, MsoPatch,
        NoisePatch, OscPatch, PadPatch, Patch,
    };
    #[cfg(feature = "std")]
    pub use crate::patch::PatchError;

    // Utilities
    pub use crate::rng::Rng;
    pub use crate::units::{
        control_rate, detuned_frequency, note_to_frequency, CONTROL_SUB_SAMPLING, MAX_VOICES,
        OSC_MAX_FREQUENCY, OSC_MIN_FREQUENCY,
    };
}

// Re-export key types at crate root for convenience
pub use prelude::*;
