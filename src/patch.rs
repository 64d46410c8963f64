//! Patch Model
//!
//! A complete serde snapshot of every voice parameter, including the
//! modulation matrix. Envelope and LFO timings are stored as 0-100 control
//! values and pass through the logarithmic UI map when applied, so saved
//! patches keep their feel across engines. Everything else is float-native.

use serde::{Deserialize, Serialize};

use crate::filter::FilterBand;
use crate::karplus::{DampingMode, Excitation};
use crate::modulation::{EnvSource, LfoSource, ModMatrix, ModRouting, ModTarget};
use crate::noise::NoiseColor;
use crate::osc::{Waveform, MAX_HARMONIES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscPatch {
    pub enabled: bool,
    pub waveform: Waveform,
    pub duty: f64,
    pub octave: i32,
    pub semitones: i32,
    pub cents: f64,
    pub harmonies: usize,
    pub harmony_levels: [f64; MAX_HARMONIES],
    pub harmony_detune_cents: f64,
    pub harmony_drive: f64,
    pub send_filter1: f64,
    pub send_filter2: f64,
}

impl Default for OscPatch {
    fn default() -> Self {
        Self {
            enabled: false,
            waveform: Waveform::Sine,
            duty: 0.5,
            octave: 0,
            semitones: 0,
            cents: 0.0,
            harmonies: 1,
            harmony_levels: [1.0; MAX_HARMONIES],
            harmony_detune_cents: 0.0,
            harmony_drive: 0.0,
            send_filter1: 1.0,
            send_filter2: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoisePatch {
    pub enabled: bool,
    pub color: NoiseColor,
    pub amplitude: f64,
    pub send_filter1: f64,
    pub send_filter2: f64,
}

impl Default for NoisePatch {
    fn default() -> Self {
        Self {
            enabled: false,
            color: NoiseColor::White,
            amplitude: 1.0,
            send_filter1: 1.0,
            send_filter2: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KarplusPatch {
    pub enabled: bool,
    pub excitation: Excitation,
    pub excitation_variation: f64,
    pub string_damping: f64,
    pub string_off_damping: f64,
    pub damping_mode: DampingMode,
    pub send_filter1: f64,
    pub send_filter2: f64,
}

impl Default for KarplusPatch {
    fn default() -> Self {
        Self {
            enabled: false,
            excitation: Excitation::WhiteNoise,
            excitation_variation: 0.0,
            string_damping: 0.5,
            string_off_damping: 0.5,
            damping_mode: DampingMode::Direct,
            send_filter1: 1.0,
            send_filter2: 0.0,
        }
    }
}

/// Morphing-sine generator settings. `symmetry` in [0, 1] warps the cycle;
/// 0.5 is a pure sine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsoPatch {
    pub enabled: bool,
    pub symmetry: f64,
    pub octave: i32,
    pub semitones: i32,
    pub cents: f64,
    pub send_filter1: f64,
    pub send_filter2: f64,
}

impl Default for MsoPatch {
    fn default() -> Self {
        Self {
            enabled: false,
            symmetry: 0.5,
            octave: 0,
            semitones: 0,
            cents: 0.0,
            send_filter1: 1.0,
            send_filter2: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadPatch {
    pub enabled: bool,
    pub octave: i32,
    pub semitones: i32,
    pub cents: f64,
    pub send_filter1: f64,
    pub send_filter2: f64,
}

impl Default for PadPatch {
    fn default() -> Self {
        Self {
            enabled: false,
            octave: 0,
            semitones: 0,
            cents: 0.0,
            send_filter1: 1.0,
            send_filter2: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPatch {
    pub band: FilterBand,
    pub center: f64,
    pub octave: f64,
    pub q: f64,
    pub kbd_track: f64,
}

impl Default for FilterPatch {
    fn default() -> Self {
        Self {
            band: FilterBand::PassAll,
            center: 1000.0,
            octave: 0.0,
            q: 0.7,
            kbd_track: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistortionPatch {
    pub enabled: bool,
    pub drive: f64,
    pub range: f64,
    pub blend: f64,
    pub auto_gain: bool,
}

impl Default for DistortionPatch {
    fn default() -> Self {
        Self {
            enabled: false,
            drive: 0.5,
            range: 0.5,
            blend: 1.0,
            auto_gain: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmpPatch {
    pub gain1: f64,
    pub gain2: f64,
    pub pan1: f64,
    pub pan2: f64,
}

impl Default for AmpPatch {
    fn default() -> Self {
        Self {
            gain1: 0.7,
            gain2: 0.7,
            pan1: 0.5,
            pan2: 0.5,
        }
    }
}

/// Envelope timings as 0-100 control values (logarithmic time map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvPatch {
    pub attack: u32,
    pub decay: u32,
    pub sustain: u32,
    pub release: u32,
}

impl Default for EnvPatch {
    fn default() -> Self {
        Self {
            attack: 0,
            decay: 50,
            sustain: 80,
            release: 50,
        }
    }
}

/// LFO rate as a 0-100 control value (logarithmic rate map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfoPatch {
    pub waveform: Waveform,
    pub rate: u32,
}

impl Default for LfoPatch {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            rate: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub name: String,
    pub osc1: OscPatch,
    pub osc2: OscPatch,
    pub osc2_sync_on_osc1: bool,
    pub noise: NoisePatch,
    pub karplus: KarplusPatch,
    pub mso: MsoPatch,
    pub pad: PadPatch,
    pub filter1: FilterPatch,
    pub filter2: FilterPatch,
    pub distortion1: DistortionPatch,
    pub distortion2: DistortionPatch,
    pub amp: AmpPatch,
    pub envs: [EnvPatch; 5],
    pub lfos: [LfoPatch; 5],
    pub matrix: ModMatrix,
}

impl Patch {
    /// Bare starting point: a single sine oscillator straight through the
    /// bypassed first filter.
    pub fn init() -> Self {
        Self {
            name: "Init".to_string(),
            osc1: OscPatch {
                enabled: true,
                ..OscPatch::default()
            },
            osc2: OscPatch::default(),
            osc2_sync_on_osc1: false,
            noise: NoisePatch::default(),
            karplus: KarplusPatch::default(),
            mso: MsoPatch::default(),
            pad: PadPatch::default(),
            filter1: FilterPatch::default(),
            filter2: FilterPatch::default(),
            distortion1: DistortionPatch::default(),
            distortion2: DistortionPatch::default(),
            amp: AmpPatch::default(),
            envs: [EnvPatch::default(); 5],
            lfos: [LfoPatch::default(); 5],
            matrix: ModMatrix::new(),
        }
    }

    /// Slow additive pad: PAD and morphing-sine layered through a tracked
    /// lowpass, envelope 1 shaping both levels, delayed vibrato on the PAD.
    pub fn warm_pad() -> Self {
        let mut patch = Self::init();
        patch.name = "Warm Pad".to_string();
        patch.osc1.enabled = false;
        patch.pad = PadPatch {
            enabled: true,
            ..PadPatch::default()
        };
        patch.mso = MsoPatch {
            enabled: true,
            symmetry: 0.65,
            send_filter1: 0.6,
            ..MsoPatch::default()
        };
        patch.filter1 = FilterPatch {
            band: FilterBand::LowPass,
            center: 1200.0,
            octave: 0.0,
            q: 1.2,
            kbd_track: 0.3,
        };
        patch.envs[0] = EnvPatch {
            attack: 80,
            decay: 60,
            sustain: 90,
            release: 80,
        };
        patch.lfos[0] = LfoPatch {
            waveform: Waveform::Triangle,
            rate: 55,
        };
        patch.matrix.set(
            ModTarget::PadAmp,
            ModRouting {
                lfo: LfoSource::None,
                lfo_depth: 0.0,
                env: EnvSource::Env1,
                env_depth: 1.0,
            },
        );
        patch.matrix.set(
            ModTarget::MsoAmp,
            ModRouting {
                lfo: LfoSource::None,
                lfo_depth: 0.0,
                env: EnvSource::Env1,
                env_depth: 1.0,
            },
        );
        patch.matrix.set(
            ModTarget::PadFreq,
            ModRouting {
                lfo: LfoSource::Lfo1Delay1000,
                lfo_depth: 0.04,
                env: EnvSource::None,
                env_depth: 0.0,
            },
        );
        patch
    }

    /// Karplus-Strong pluck with pitch-scaled damping and a gentle lowpass.
    pub fn plucked_string() -> Self {
        let mut patch = Self::init();
        patch.name = "Plucked String".to_string();
        patch.osc1.enabled = false;
        patch.karplus = KarplusPatch {
            enabled: true,
            excitation: Excitation::WhiteNoise,
            excitation_variation: 0.2,
            // The decay coefficient applies per sample, so audible sustain
            // lives very close to damping zero. 0.0005 rings about half a
            // second at middle C; release mutes in a few milliseconds.
            string_damping: 0.0005,
            string_off_damping: 0.01,
            damping_mode: DampingMode::FrequencyScaled,
            send_filter1: 1.0,
            send_filter2: 0.0,
        };
        patch.filter1 = FilterPatch {
            band: FilterBand::LowPass,
            center: 3500.0,
            octave: 0.0,
            q: 0.8,
            kbd_track: 0.5,
        };
        patch
    }
}

impl Default for Patch {
    fn default() -> Self {
        Self::init()
    }
}

#[cfg(feature = "std")]
#[derive(Debug)]
pub enum PatchError {
    Serialization(serde_json::Error),
}

#[cfg(feature = "std")]
impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchError::Serialization(e) => write!(f, "patch serialization failed: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::Serialization(e) => Some(e),
        }
    }
}

#[cfg(feature = "std")]
impl From<serde_json::Error> for PatchError {
    fn from(e: serde_json::Error) -> Self {
        PatchError::Serialization(e)
    }
}

#[cfg(feature = "std")]
impl Patch {
    pub fn to_json(&self) -> Result<String, PatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PatchError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_patch_is_a_clean_sine() {
        let patch = Patch::init();
        assert!(patch.osc1.enabled);
        assert!(!patch.osc2.enabled);
        assert!(!patch.karplus.enabled);
        assert_eq!(patch.filter1.band, FilterBand::PassAll);
        assert_eq!(patch.matrix, ModMatrix::new());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_json_round_trip_preserves_everything() {
        for patch in [Patch::init(), Patch::warm_pad(), Patch::plucked_string()] {
            let json = patch.to_json().unwrap();
            let restored = Patch::from_json(&json).unwrap();
            assert_eq!(restored, patch);
        }
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(Patch::from_json("{not json").is_err());
        assert!(Patch::from_json("{}").is_err());
    }

    #[test]
    fn test_presets_route_their_generators() {
        let pad = Patch::warm_pad();
        assert!(pad.pad.enabled);
        assert!(pad.mso.enabled);
        assert_eq!(
            pad.matrix.get(ModTarget::PadFreq).lfo,
            LfoSource::Lfo1Delay1000
        );

        let pluck = Patch::plucked_string();
        assert!(pluck.karplus.enabled);
        assert_eq!(pluck.karplus.damping_mode, DampingMode::FrequencyScaled);
    }
}
