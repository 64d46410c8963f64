//! Modulation Routing
//!
//! One routing slot per modulatable target, each naming an LFO source (with
//! optional delayed onset) and an envelope source plus their depths. The
//! matrix is a fixed array indexed by target, resolved once per control
//! tick.
//!
//! Frequency-style targets combine additively and stay bipolar; amplitude
//! targets combine multiplicatively and stay unipolar. That asymmetry is
//! deliberate: vibrato swings around the pitch, tremolo only ever ducks the
//! level.

use serde::{Deserialize, Serialize};

/// LFO selector. The `Delay*` variants read the same LFO but hold their
/// contribution at the neutral midpoint until the configured time after
/// note-on has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LfoSource {
    None,
    Lfo1,
    Lfo2,
    Lfo3,
    Lfo4,
    Lfo5,
    Lfo1Delay500,
    Lfo1Delay1000,
    Lfo1Delay1500,
    Lfo1Delay2000,
    Lfo2Delay500,
    Lfo2Delay1000,
    Lfo2Delay1500,
    Lfo2Delay2000,
    Lfo3Delay500,
    Lfo3Delay1000,
    Lfo3Delay1500,
    Lfo3Delay2000,
    Lfo4Delay500,
    Lfo4Delay1000,
    Lfo4Delay1500,
    Lfo4Delay2000,
    Lfo5Delay500,
    Lfo5Delay1000,
    Lfo5Delay1500,
    Lfo5Delay2000,
}

impl LfoSource {
    pub fn lfo_index(&self) -> Option<usize> {
        use LfoSource::*;
        match self {
            None => Option::None,
            Lfo1 | Lfo1Delay500 | Lfo1Delay1000 | Lfo1Delay1500 | Lfo1Delay2000 => Some(0),
            Lfo2 | Lfo2Delay500 | Lfo2Delay1000 | Lfo2Delay1500 | Lfo2Delay2000 => Some(1),
            Lfo3 | Lfo3Delay500 | Lfo3Delay1000 | Lfo3Delay1500 | Lfo3Delay2000 => Some(2),
            Lfo4 | Lfo4Delay500 | Lfo4Delay1000 | Lfo4Delay1500 | Lfo4Delay2000 => Some(3),
            Lfo5 | Lfo5Delay500 | Lfo5Delay1000 | Lfo5Delay1500 | Lfo5Delay2000 => Some(4),
        }
    }

    /// Onset delay in milliseconds; zero for the immediate variants.
    pub fn delay_ms(&self) -> f64 {
        use LfoSource::*;
        match self {
            None | Lfo1 | Lfo2 | Lfo3 | Lfo4 | Lfo5 => 0.0,
            Lfo1Delay500 | Lfo2Delay500 | Lfo3Delay500 | Lfo4Delay500 | Lfo5Delay500 => 500.0,
            Lfo1Delay1000 | Lfo2Delay1000 | Lfo3Delay1000 | Lfo4Delay1000 | Lfo5Delay1000 => {
                1000.0
            }
            Lfo1Delay1500 | Lfo2Delay1500 | Lfo3Delay1500 | Lfo4Delay1500 | Lfo5Delay1500 => {
                1500.0
            }
            Lfo1Delay2000 | Lfo2Delay2000 | Lfo3Delay2000 | Lfo4Delay2000 | Lfo5Delay2000 => {
                2000.0
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvSource {
    None,
    Env1,
    Env2,
    Env3,
    Env4,
    Env5,
}

impl EnvSource {
    pub fn env_index(&self) -> Option<usize> {
        match self {
            EnvSource::None => None,
            EnvSource::Env1 => Some(0),
            EnvSource::Env2 => Some(1),
            EnvSource::Env3 => Some(2),
            EnvSource::Env4 => Some(3),
            EnvSource::Env5 => Some(4),
        }
    }
}

/// Everything a routing slot can drive. The Karplus generator has no slot:
/// its level lives entirely in the string's own energy decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModTarget {
    Osc1Freq,
    Osc1Pwm,
    Osc1Amp,
    Osc2Freq,
    Osc2Pwm,
    Osc2Amp,
    NoiseAmp,
    MsoFreq,
    MsoAmp,
    PadFreq,
    PadAmp,
    Filter1Freq,
    Filter2Freq,
    Amp1Pan,
    Amp2Pan,
}

impl ModTarget {
    pub const COUNT: usize = 15;

    pub const ALL: [ModTarget; Self::COUNT] = [
        ModTarget::Osc1Freq,
        ModTarget::Osc1Pwm,
        ModTarget::Osc1Amp,
        ModTarget::Osc2Freq,
        ModTarget::Osc2Pwm,
        ModTarget::Osc2Amp,
        ModTarget::NoiseAmp,
        ModTarget::MsoFreq,
        ModTarget::MsoAmp,
        ModTarget::PadFreq,
        ModTarget::PadAmp,
        ModTarget::Filter1Freq,
        ModTarget::Filter2Freq,
        ModTarget::Amp1Pan,
        ModTarget::Amp2Pan,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModRouting {
    pub lfo: LfoSource,
    pub lfo_depth: f64,
    pub env: EnvSource,
    pub env_depth: f64,
}

impl ModRouting {
    pub const NONE: ModRouting = ModRouting {
        lfo: LfoSource::None,
        lfo_depth: 0.0,
        env: EnvSource::None,
        env_depth: 0.0,
    };
}

impl Default for ModRouting {
    fn default() -> Self {
        Self::NONE
    }
}

/// A slot's sources sampled at one control tick, delay gating applied.
/// Depths are zero when the slot names no source, so unrouted targets stay
/// neutral in every combiner.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolved {
    pub lfo_depth: f64,
    pub lfo_value: f64,
    pub env_depth: f64,
    pub env_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModMatrix {
    routes: [ModRouting; ModTarget::COUNT],
}

impl ModMatrix {
    pub fn new() -> Self {
        Self {
            routes: [ModRouting::NONE; ModTarget::COUNT],
        }
    }

    pub fn set(&mut self, target: ModTarget, mut routing: ModRouting) {
        routing.lfo_depth = routing.lfo_depth.clamp(0.0, 1.0);
        routing.env_depth = routing.env_depth.clamp(0.0, 1.0);
        self.routes[target.index()] = routing;
    }

    pub fn get(&self, target: ModTarget) -> ModRouting {
        self.routes[target.index()]
    }

    pub fn clear(&mut self) {
        self.routes = [ModRouting::NONE; ModTarget::COUNT];
    }

    /// Sample one slot against the current LFO and envelope values.
    /// `elapsed_ticks` counts control ticks since note-on and gates the
    /// delayed LFO variants.
    pub fn resolve(
        &self,
        target: ModTarget,
        lfo_values: &[f64; 5],
        env_values: &[f64; 5],
        elapsed_ticks: u64,
        control_rate: f64,
    ) -> Resolved {
        let routing = self.routes[target.index()];
        let mut resolved = Resolved::default();

        if let Some(i) = routing.lfo.lfo_index() {
            resolved.lfo_depth = routing.lfo_depth;
            let delay_ticks = routing.lfo.delay_ms() * control_rate / 1000.0;
            if elapsed_ticks as f64 >= delay_ticks {
                resolved.lfo_value = lfo_values[i].clamp(-1.0, 1.0);
            }
        }
        if let Some(i) = routing.env.env_index() {
            resolved.env_depth = routing.env_depth;
            resolved.env_value = env_values[i].clamp(0.0, 1.0);
        }
        resolved
    }
}

impl Default for ModMatrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Additive bipolar combination for frequency, PWM and pan targets.
pub fn bipolar_modulation(resolved: Resolved) -> f64 {
    (resolved.lfo_depth * resolved.lfo_value + resolved.env_depth * resolved.env_value)
        .clamp(-1.0, 1.0)
}

/// Multiplicative unipolar combination for amplitude targets. With no
/// routing both factors are 1; full-depth sources can duck the level to
/// zero but never push it past unity.
pub fn amp_factor(resolved: Resolved) -> f64 {
    (1.0 - resolved.lfo_depth * (0.5 - 0.5 * resolved.lfo_value))
        * (1.0 - resolved.env_depth * (1.0 - resolved.env_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_LFOS: [f64; 5] = [0.0; 5];
    const NO_ENVS: [f64; 5] = [0.0; 5];

    #[test]
    fn test_unrouted_target_is_neutral() {
        let matrix = ModMatrix::new();
        for target in ModTarget::ALL {
            let r = matrix.resolve(target, &[0.9; 5], &[0.9; 5], 1000, 2756.25);
            assert_eq!(bipolar_modulation(r), 0.0);
            assert_eq!(amp_factor(r), 1.0);
        }
    }

    #[test]
    fn test_lfo_contribution_is_depth_times_value() {
        let mut matrix = ModMatrix::new();
        matrix.set(
            ModTarget::Osc1Freq,
            ModRouting {
                lfo: LfoSource::Lfo1,
                lfo_depth: 0.5,
                env: EnvSource::None,
                env_depth: 0.0,
            },
        );
        let lfos = [0.8, 0.0, 0.0, 0.0, 0.0];
        let r = matrix.resolve(ModTarget::Osc1Freq, &lfos, &NO_ENVS, 0, 100.0);
        assert_eq!(bipolar_modulation(r), 0.4);
    }

    #[test]
    fn test_delayed_source_holds_neutral_then_goes_live() {
        let mut matrix = ModMatrix::new();
        matrix.set(
            ModTarget::Osc2Freq,
            ModRouting {
                lfo: LfoSource::Lfo2Delay1000,
                lfo_depth: 1.0,
                env: EnvSource::None,
                env_depth: 0.0,
            },
        );
        let lfos = [0.0, 1.0, 0.0, 0.0, 0.0];
        // 1000 ms at a 100 Hz control rate is 100 ticks
        let before = matrix.resolve(ModTarget::Osc2Freq, &lfos, &NO_ENVS, 99, 100.0);
        assert_eq!(bipolar_modulation(before), 0.0);
        let after = matrix.resolve(ModTarget::Osc2Freq, &lfos, &NO_ENVS, 100, 100.0);
        assert_eq!(bipolar_modulation(after), 1.0);
    }

    #[test]
    fn test_amp_factor_extremes() {
        let mut matrix = ModMatrix::new();
        matrix.set(
            ModTarget::Osc1Amp,
            ModRouting {
                lfo: LfoSource::Lfo1,
                lfo_depth: 1.0,
                env: EnvSource::None,
                env_depth: 0.0,
            },
        );
        let trough = [-1.0, 0.0, 0.0, 0.0, 0.0];
        let bottom = matrix.resolve(ModTarget::Osc1Amp, &trough, &NO_ENVS, 0, 100.0);
        assert_eq!(amp_factor(bottom), 0.0);
        let crest = [1.0, 0.0, 0.0, 0.0, 0.0];
        let top = matrix.resolve(ModTarget::Osc1Amp, &crest, &NO_ENVS, 0, 100.0);
        assert_eq!(amp_factor(top), 1.0);
    }

    #[test]
    fn test_envelope_gates_amplitude() {
        let mut matrix = ModMatrix::new();
        matrix.set(
            ModTarget::NoiseAmp,
            ModRouting {
                lfo: LfoSource::None,
                lfo_depth: 0.0,
                env: EnvSource::Env1,
                env_depth: 1.0,
            },
        );
        let idle = matrix.resolve(ModTarget::NoiseAmp, &NO_LFOS, &[0.0; 5], 0, 100.0);
        assert_eq!(amp_factor(idle), 0.0);
        let open_env = [1.0, 0.0, 0.0, 0.0, 0.0];
        let open = matrix.resolve(ModTarget::NoiseAmp, &NO_LFOS, &open_env, 0, 100.0);
        assert_eq!(amp_factor(open), 1.0);
    }

    #[test]
    fn test_combined_sum_is_clamped() {
        let mut matrix = ModMatrix::new();
        matrix.set(
            ModTarget::Filter1Freq,
            ModRouting {
                lfo: LfoSource::Lfo1,
                lfo_depth: 1.0,
                env: EnvSource::Env1,
                env_depth: 1.0,
            },
        );
        let r = matrix.resolve(
            ModTarget::Filter1Freq,
            &[1.0, 0.0, 0.0, 0.0, 0.0],
            &[1.0, 0.0, 0.0, 0.0, 0.0],
            0,
            100.0,
        );
        assert_eq!(bipolar_modulation(r), 1.0);
    }

    #[test]
    fn test_depths_clamped_on_set() {
        let mut matrix = ModMatrix::new();
        matrix.set(
            ModTarget::Amp1Pan,
            ModRouting {
                lfo: LfoSource::Lfo3,
                lfo_depth: 7.0,
                env: EnvSource::Env2,
                env_depth: -3.0,
            },
        );
        let routing = matrix.get(ModTarget::Amp1Pan);
        assert_eq!(routing.lfo_depth, 1.0);
        assert_eq!(routing.env_depth, 0.0);
    }

    #[test]
    fn test_every_delay_code_maps_to_its_lfo() {
        assert_eq!(LfoSource::Lfo4Delay1500.lfo_index(), Some(3));
        assert_eq!(LfoSource::Lfo4Delay1500.delay_ms(), 1500.0);
        assert_eq!(LfoSource::Lfo5.delay_ms(), 0.0);
        assert_eq!(LfoSource::None.lfo_index(), None);
    }
}
