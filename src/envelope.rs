//! ADSR Envelope Generator
//!
//! Linear-segment envelope advanced once per control tick. Retriggering an
//! active envelope first drains it through a short force-release ramp so the
//! new attack always starts from zero.

use crate::units::{
    control_rate, ADSR_MAX_ATTACK_SEC, ADSR_MAX_DECAY_SEC, ADSR_MAX_RELEASE_SEC,
    DEFAULT_SAMPLE_RATE, FORCE_RELEASE_SEC,
};

/// Envelope stage. `OffRelease` is entered when the gate closes during the
/// decay segment and keeps falling at the decay rate instead of the release
/// rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
    ForceRelease,
    OffRelease,
}

pub struct Adsr {
    sample_rate: f64,
    stage: EnvStage,
    level: f64,
    attack_time: f64,
    decay_time: f64,
    sustain: f64,
    release_time: f64,
    attack_rate: f64,
    decay_rate: f64,
    release_rate: f64,
    force_rate: f64,
    retrigger_pending: bool,
}

impl Adsr {
    pub fn new(sample_rate: f64) -> Self {
        let mut env = Self {
            sample_rate,
            stage: EnvStage::Idle,
            level: 0.0,
            attack_time: 0.01,
            decay_time: 0.3,
            sustain: 0.7,
            release_time: 0.2,
            attack_rate: 0.0,
            decay_rate: 0.0,
            release_rate: 0.0,
            force_rate: 0.0,
            retrigger_pending: false,
        };
        env.recalc_rates();
        env
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.recalc_rates();
    }

    pub fn set_attack_time(&mut self, seconds: f64) {
        self.attack_time = seconds.clamp(0.0, ADSR_MAX_ATTACK_SEC);
        self.recalc_rates();
    }

    pub fn set_decay_time(&mut self, seconds: f64) {
        self.decay_time = seconds.clamp(0.0, ADSR_MAX_DECAY_SEC);
        self.recalc_rates();
    }

    pub fn set_sustain_level(&mut self, level: f64) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    pub fn set_release_time(&mut self, seconds: f64) {
        self.release_time = seconds.clamp(0.0, ADSR_MAX_RELEASE_SEC);
        self.recalc_rates();
    }

    pub fn stage(&self) -> EnvStage {
        self.stage
    }

    /// Current level in [0, 1].
    pub fn value(&self) -> f64 {
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvStage::Idle
    }

    /// Open the gate. An idle envelope starts its attack directly; an active
    /// one drains through `ForceRelease` first and re-attacks from zero.
    pub fn note_on(&mut self) {
        match self.stage {
            EnvStage::Idle => {
                self.level = 0.0;
                self.stage = EnvStage::Attack;
            }
            _ => {
                self.stage = EnvStage::ForceRelease;
                self.retrigger_pending = true;
            }
        }
    }

    /// Close the gate. A closing gate during decay falls at the decay rate;
    /// during force-release it cancels the pending retrigger.
    pub fn note_off(&mut self) {
        match self.stage {
            EnvStage::Attack | EnvStage::Sustain => self.stage = EnvStage::Release,
            EnvStage::Decay => self.stage = EnvStage::OffRelease,
            EnvStage::ForceRelease => self.retrigger_pending = false,
            EnvStage::Idle | EnvStage::Release | EnvStage::OffRelease => {}
        }
    }

    pub fn reset(&mut self) {
        self.stage = EnvStage::Idle;
        self.level = 0.0;
        self.retrigger_pending = false;
    }

    /// Advance one control tick and return the new level.
    pub fn tick(&mut self) -> f64 {
        match self.stage {
            EnvStage::Idle => self.level = 0.0,
            EnvStage::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvStage::Decay;
                }
            }
            EnvStage::Decay => {
                self.level -= self.decay_rate;
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.stage = EnvStage::Sustain;
                }
            }
            EnvStage::Sustain => self.level = self.sustain,
            EnvStage::Release => {
                self.level -= self.release_rate;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvStage::Idle;
                }
            }
            EnvStage::OffRelease => {
                self.level -= self.decay_rate;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvStage::Idle;
                }
            }
            EnvStage::ForceRelease => {
                self.level -= self.force_rate;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    if self.retrigger_pending {
                        self.retrigger_pending = false;
                        self.stage = EnvStage::Attack;
                    } else {
                        self.stage = EnvStage::Idle;
                    }
                }
            }
        }
        self.level
    }

    fn recalc_rates(&mut self) {
        let cr = control_rate(self.sample_rate);
        self.attack_rate = rate_for(self.attack_time, cr);
        self.decay_rate = rate_for(self.decay_time, cr);
        self.release_rate = rate_for(self.release_time, cr);
        self.force_rate = rate_for(FORCE_RELEASE_SEC, cr);
    }
}

impl Default for Adsr {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

// Per-tick level change for a full-scale segment. Segments shorter than one
// control tick complete on their first tick.
fn rate_for(seconds: f64, control_rate: f64) -> f64 {
    let ticks = seconds * control_rate;
    if ticks <= 1.0 {
        1.0
    } else {
        1.0 / ticks
    }
}
