//! Voice
//!
//! One polyphonic voice: six generators feeding two filter buses, five LFOs
//! and five envelopes resolved through the modulation matrix, and a silence
//! gate that tells the pool when the voice has rung out.
//!
//! Work is split across two cadences. The control tick (every
//! `CONTROL_SUB_SAMPLING` samples) advances the modulators, resolves the
//! matrix and caches effective frequencies, amp factors, duty and pan; the
//! audio tick only pulls samples, mixes buses and runs the filters.

use std::sync::Arc;

use crate::amp::OutputAmp;
use crate::distortion::Distortion;
use crate::envelope::Adsr;
use crate::filter::Svf;
use crate::karplus::KarplusStrong;
use crate::lfo::Lfo;
use crate::modulation::{amp_factor, bipolar_modulation, ModMatrix, ModTarget};
use crate::noise::NoiseGenerator;
use crate::osc::Oscillator;
use crate::patch::Patch;
use crate::units::{
    control_rate, detuned_frequency, linear_from_control, log_from_control, note_to_frequency,
    ADSR_MAX_ATTACK_SEC, ADSR_MAX_DECAY_SEC, ADSR_MAX_RELEASE_SEC, KS_SILENCE_ENERGY,
    LFO_MAX_FREQUENCY, LFO_MIN_FREQUENCY, OSC_MAX_FREQUENCY, OSC_MIN_FREQUENCY, SILENCE_LEVEL,
};
use crate::wavetable::{TableOsc, WaveTable};

/// Bus routing for one generator.
#[derive(Debug, Clone, Copy)]
struct Route {
    enabled: bool,
    send1: f64,
    send2: f64,
}

impl Route {
    const OFF: Route = Route {
        enabled: false,
        send1: 1.0,
        send2: 0.0,
    };

    fn routed(&self) -> bool {
        self.send1.max(self.send2) > SILENCE_LEVEL
    }
}

pub struct Voice {
    sample_rate: f64,
    active: bool,
    waits_for_not_active: bool,
    frequency: f64,
    elapsed_ticks: u64,

    osc1: Oscillator,
    osc2: Oscillator,
    osc2_sync_on_osc1: bool,
    noise: NoiseGenerator,
    karplus: KarplusStrong,
    mso: TableOsc,
    pad: TableOsc,

    osc1_route: Route,
    osc2_route: Route,
    noise_route: Route,
    karplus_route: Route,
    mso_route: Route,
    pad_route: Route,

    mso_octave: i32,
    mso_semitones: i32,
    mso_cents: f64,
    pad_octave: i32,
    pad_semitones: i32,
    pad_cents: f64,

    filter1: Svf,
    filter2: Svf,
    distortion1: Distortion,
    distortion2: Distortion,
    amp: OutputAmp,
    lfos: [Lfo; 5],
    envs: [Adsr; 5],
    matrix: ModMatrix,

    // Control-rate caches consumed by the audio tick
    osc1_freq: f64,
    osc2_freq: f64,
    mso_freq: f64,
    pad_freq: f64,
    osc1_amp: f64,
    osc2_amp: f64,
    noise_amp: f64,
    mso_amp: f64,
    pad_amp: f64,
}

impl Voice {
    pub fn new(sample_rate: f64, morph: Arc<WaveTable>, pad: Arc<WaveTable>) -> Self {
        Self {
            sample_rate,
            active: false,
            waits_for_not_active: false,
            frequency: 440.0,
            elapsed_ticks: 0,
            osc1: Oscillator::new(sample_rate),
            osc2: Oscillator::new(sample_rate),
            osc2_sync_on_osc1: false,
            noise: NoiseGenerator::new(1),
            karplus: KarplusStrong::new(sample_rate),
            mso: TableOsc::new(morph, sample_rate),
            pad: TableOsc::new(pad, sample_rate),
            osc1_route: Route::OFF,
            osc2_route: Route::OFF,
            noise_route: Route::OFF,
            karplus_route: Route::OFF,
            mso_route: Route::OFF,
            pad_route: Route::OFF,
            mso_octave: 0,
            mso_semitones: 0,
            mso_cents: 0.0,
            pad_octave: 0,
            pad_semitones: 0,
            pad_cents: 0.0,
            filter1: Svf::new(sample_rate),
            filter2: Svf::new(sample_rate),
            distortion1: Distortion::new(),
            distortion2: Distortion::new(),
            amp: OutputAmp::new(),
            lfos: [
                Lfo::new(sample_rate),
                Lfo::new(sample_rate),
                Lfo::new(sample_rate),
                Lfo::new(sample_rate),
                Lfo::new(sample_rate),
            ],
            envs: [
                Adsr::new(sample_rate),
                Adsr::new(sample_rate),
                Adsr::new(sample_rate),
                Adsr::new(sample_rate),
                Adsr::new(sample_rate),
            ],
            matrix: ModMatrix::new(),
            osc1_freq: 440.0,
            osc2_freq: 440.0,
            mso_freq: 440.0,
            pad_freq: 440.0,
            osc1_amp: 1.0,
            osc2_amp: 1.0,
            noise_amp: 1.0,
            mso_amp: 1.0,
            pad_amp: 1.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn waits_for_not_active(&self) -> bool {
        self.waits_for_not_active
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Base pitch, silently clamped to the playable band.
    pub fn set_frequency(&mut self, hz: f64) {
        self.frequency = hz.clamp(OSC_MIN_FREQUENCY, OSC_MAX_FREQUENCY);
        self.filter1.set_note_frequency(self.frequency);
        self.filter2.set_note_frequency(self.frequency);
    }

    /// Distribute deterministic seeds to every stochastic component.
    pub fn set_seed(&mut self, seed: u64) {
        self.osc1.set_seed(seed);
        self.osc2.set_seed(seed.wrapping_add(1));
        self.noise.set_seed(seed.wrapping_add(2));
        self.karplus.set_seed(seed.wrapping_add(3));
        for (i, lfo) in self.lfos.iter_mut().enumerate() {
            lfo.set_seed(seed.wrapping_add(4 + i as u64));
        }
    }

    pub fn set_morph_table(&mut self, table: Arc<WaveTable>) {
        self.mso.set_table(table);
    }

    pub fn set_pad_table(&mut self, table: Arc<WaveTable>) {
        self.pad.set_table(table);
    }

    pub fn note_on(&mut self, note: u8, velocity: f64) {
        self.set_frequency(note_to_frequency(note));
        self.active = true;
        self.waits_for_not_active = false;
        self.elapsed_ticks = 0;

        self.osc1.sync();
        self.osc2.sync();
        self.mso.sync();
        self.pad.sync();
        for lfo in &mut self.lfos {
            lfo.reset();
            lfo.sync();
        }
        for env in &mut self.envs {
            env.note_on();
        }
        if self.karplus_route.enabled {
            self.karplus.note_on(self.frequency, velocity);
        }
        self.amp.set_velocity(velocity);

        // Prime the control-rate caches so the first block plays in tune
        self.refresh_modulation();
    }

    pub fn note_off(&mut self) {
        if !self.active {
            return;
        }
        self.waits_for_not_active = true;
        for env in &mut self.envs {
            env.note_off();
        }
        self.karplus.note_off();
    }

    /// Advance modulators one control tick, refresh the caches and evaluate
    /// the silence gate. Returns whether the voice is still sounding; the
    /// caller owns slot recycling.
    pub fn control_tick(&mut self) -> bool {
        if !self.active {
            return false;
        }

        for lfo in &mut self.lfos {
            lfo.tick();
        }
        for env in &mut self.envs {
            env.tick();
        }
        self.elapsed_ticks += 1;

        self.refresh_modulation();

        if self.waits_for_not_active && !self.any_generator_contributes() {
            self.active = false;
            self.waits_for_not_active = false;
        }
        self.active
    }

    /// One audio sample: the two filtered bus outputs, pre output-amp.
    pub fn next_sample(&mut self) -> (f64, f64) {
        if !self.active {
            return (0.0, 0.0);
        }

        let mut bus1 = 0.0;
        let mut bus2 = 0.0;

        if self.osc1_route.enabled {
            let s = self.osc1.next_sample(self.osc1_freq) * self.osc1_amp;
            bus1 += s * self.osc1_route.send1;
            bus2 += s * self.osc1_route.send2;
        }
        if self.osc2_route.enabled {
            if self.osc2_sync_on_osc1 && self.osc1.cycle_restarted() {
                self.osc2.sync();
            }
            let s = self.osc2.next_sample(self.osc2_freq) * self.osc2_amp;
            bus1 += s * self.osc2_route.send1;
            bus2 += s * self.osc2_route.send2;
        }
        if self.noise_route.enabled {
            let s = self.noise.next_sample() * self.noise_amp;
            bus1 += s * self.noise_route.send1;
            bus2 += s * self.noise_route.send2;
        }
        if self.karplus_route.enabled {
            let s = self.karplus.next_sample();
            bus1 += s * self.karplus_route.send1;
            bus2 += s * self.karplus_route.send2;
        }
        if self.mso_route.enabled {
            let s = self.mso.next_sample(self.mso_freq) * self.mso_amp;
            bus1 += s * self.mso_route.send1;
            bus2 += s * self.mso_route.send2;
        }
        if self.pad_route.enabled {
            let s = self.pad.next_sample(self.pad_freq) * self.pad_amp;
            bus1 += s * self.pad_route.send1;
            bus2 += s * self.pad_route.send2;
        }

        let bus1 = self.distortion1.process(bus1);
        let bus2 = self.distortion2.process(bus2);
        (self.filter1.process(bus1), self.filter2.process(bus2))
    }

    /// One audio sample through the owned output amp: (left, right).
    pub fn next_stereo(&mut self) -> (f64, f64) {
        let (ch1, ch2) = self.next_sample();
        self.amp.mix(ch1, ch2)
    }

    pub fn apply_patch(&mut self, patch: &Patch) {
        apply_osc(&mut self.osc1, &patch.osc1);
        apply_osc(&mut self.osc2, &patch.osc2);
        self.osc1_route = route_of(
            patch.osc1.enabled,
            patch.osc1.send_filter1,
            patch.osc1.send_filter2,
        );
        self.osc2_route = route_of(
            patch.osc2.enabled,
            patch.osc2.send_filter1,
            patch.osc2.send_filter2,
        );
        self.osc2_sync_on_osc1 = patch.osc2_sync_on_osc1;

        self.noise.set_color(patch.noise.color);
        self.noise.set_amplitude(patch.noise.amplitude);
        self.noise_route = route_of(
            patch.noise.enabled,
            patch.noise.send_filter1,
            patch.noise.send_filter2,
        );

        self.karplus.set_excitation(patch.karplus.excitation);
        self.karplus.set_excitation_variation(patch.karplus.excitation_variation);
        self.karplus.set_string_damping(patch.karplus.string_damping);
        self.karplus.set_string_off_damping(patch.karplus.string_off_damping);
        self.karplus.set_damping_mode(patch.karplus.damping_mode);
        self.karplus_route = route_of(
            patch.karplus.enabled,
            patch.karplus.send_filter1,
            patch.karplus.send_filter2,
        );

        self.mso_route =
            route_of(patch.mso.enabled, patch.mso.send_filter1, patch.mso.send_filter2);
        self.mso_octave = patch.mso.octave;
        self.mso_semitones = patch.mso.semitones;
        self.mso_cents = patch.mso.cents;
        self.pad_route =
            route_of(patch.pad.enabled, patch.pad.send_filter1, patch.pad.send_filter2);
        self.pad_octave = patch.pad.octave;
        self.pad_semitones = patch.pad.semitones;
        self.pad_cents = patch.pad.cents;

        apply_filter(&mut self.filter1, &patch.filter1);
        apply_filter(&mut self.filter2, &patch.filter2);
        apply_distortion(&mut self.distortion1, &patch.distortion1);
        apply_distortion(&mut self.distortion2, &patch.distortion2);

        self.amp.set_gain1(patch.amp.gain1);
        self.amp.set_gain2(patch.amp.gain2);
        self.amp.set_pan1(patch.amp.pan1);
        self.amp.set_pan2(patch.amp.pan2);
        self.amp.set_pan_modulation(0.0, 0.0);

        for (env, ep) in self.envs.iter_mut().zip(patch.envs.iter()) {
            env.set_attack_time(log_from_control(ep.attack, 0.0, ADSR_MAX_ATTACK_SEC));
            env.set_decay_time(log_from_control(ep.decay, 0.0, ADSR_MAX_DECAY_SEC));
            env.set_sustain_level(linear_from_control(ep.sustain, 0.0, 1.0));
            env.set_release_time(log_from_control(ep.release, 0.0, ADSR_MAX_RELEASE_SEC));
        }
        for (lfo, lp) in self.lfos.iter_mut().zip(patch.lfos.iter()) {
            lfo.set_waveform(lp.waveform);
            lfo.set_frequency(log_from_control(lp.rate, LFO_MIN_FREQUENCY, LFO_MAX_FREQUENCY));
        }

        self.matrix = patch.matrix.clone();
        self.refresh_modulation();
    }

    /// Return the voice to its just-constructed runtime state. Patch-derived
    /// configuration survives; only playing state is dropped.
    pub fn reset(&mut self) {
        self.active = false;
        self.waits_for_not_active = false;
        self.elapsed_ticks = 0;
        self.osc1.reset();
        self.osc2.reset();
        self.noise.reset();
        self.karplus.reset();
        self.mso.sync();
        self.pad.sync();
        self.filter1.reset();
        self.filter2.reset();
        self.amp.reset();
        for lfo in &mut self.lfos {
            lfo.reset();
        }
        for env in &mut self.envs {
            env.reset();
        }
        self.osc1_amp = 1.0;
        self.osc2_amp = 1.0;
        self.noise_amp = 1.0;
        self.mso_amp = 1.0;
        self.pad_amp = 1.0;
    }

    fn refresh_modulation(&mut self) {
        let mut lfo_values = [0.0; 5];
        for (slot, lfo) in lfo_values.iter_mut().zip(self.lfos.iter()) {
            *slot = lfo.value();
        }
        let mut env_values = [0.0; 5];
        for (slot, env) in env_values.iter_mut().zip(self.envs.iter()) {
            *slot = env.value();
        }
        let cr = control_rate(self.sample_rate);
        let t = self.elapsed_ticks;

        let net = |target: ModTarget, matrix: &ModMatrix| {
            bipolar_modulation(matrix.resolve(target, &lfo_values, &env_values, t, cr))
        };
        let factor = |target: ModTarget, matrix: &ModMatrix| {
            amp_factor(matrix.resolve(target, &lfo_values, &env_values, t, cr))
        };

        let osc1_freq_mod = net(ModTarget::Osc1Freq, &self.matrix);
        let osc2_freq_mod = net(ModTarget::Osc2Freq, &self.matrix);
        let osc1_pwm = net(ModTarget::Osc1Pwm, &self.matrix);
        let osc2_pwm = net(ModTarget::Osc2Pwm, &self.matrix);
        let mso_freq_mod = net(ModTarget::MsoFreq, &self.matrix);
        let pad_freq_mod = net(ModTarget::PadFreq, &self.matrix);
        let filter1_mod = net(ModTarget::Filter1Freq, &self.matrix);
        let filter2_mod = net(ModTarget::Filter2Freq, &self.matrix);
        let pan1 = net(ModTarget::Amp1Pan, &self.matrix);
        let pan2 = net(ModTarget::Amp2Pan, &self.matrix);

        self.osc1_amp = factor(ModTarget::Osc1Amp, &self.matrix);
        self.osc2_amp = factor(ModTarget::Osc2Amp, &self.matrix);
        self.noise_amp = factor(ModTarget::NoiseAmp, &self.matrix);
        self.mso_amp = factor(ModTarget::MsoAmp, &self.matrix);
        self.pad_amp = factor(ModTarget::PadAmp, &self.matrix);

        self.osc1_freq = self.osc1.detuned(self.frequency, osc1_freq_mod);
        self.osc2_freq = self.osc2.detuned(self.frequency, osc2_freq_mod);
        self.mso_freq = detuned_frequency(
            self.frequency,
            self.mso_octave,
            self.mso_semitones,
            self.mso_cents,
            mso_freq_mod,
        );
        self.pad_freq = detuned_frequency(
            self.frequency,
            self.pad_octave,
            self.pad_semitones,
            self.pad_cents,
            pad_freq_mod,
        );

        self.osc1.apply_duty_modulation(osc1_pwm);
        self.osc2.apply_duty_modulation(osc2_pwm);
        self.filter1.set_frequency_modulation(filter1_mod);
        self.filter2.set_frequency_modulation(filter2_mod);
        self.amp.set_pan_modulation(pan1, pan2);
    }

    fn any_generator_contributes(&self) -> bool {
        let alive = |route: &Route, factor: f64| {
            route.enabled && factor > SILENCE_LEVEL && route.routed()
        };
        alive(&self.osc1_route, self.osc1_amp)
            || alive(&self.osc2_route, self.osc2_amp)
            || alive(&self.noise_route, self.noise_amp)
            || alive(&self.mso_route, self.mso_amp)
            || alive(&self.pad_route, self.pad_amp)
            || (self.karplus_route.enabled
                && self.karplus.energy() > KS_SILENCE_ENERGY
                && self.karplus_route.routed())
    }
}

fn route_of(enabled: bool, send1: f64, send2: f64) -> Route {
    Route {
        enabled,
        send1: send1.clamp(0.0, 1.0),
        send2: send2.clamp(0.0, 1.0),
    }
}

fn apply_osc(osc: &mut Oscillator, patch: &crate::patch::OscPatch) {
    osc.set_waveform(patch.waveform);
    osc.set_duty(patch.duty);
    osc.set_detune_octave(patch.octave);
    osc.set_detune_semitones(patch.semitones);
    osc.set_detune_cents(patch.cents);
    osc.set_harmonies(patch.harmonies);
    for (i, &level) in patch.harmony_levels.iter().enumerate() {
        osc.set_harmony_level(i, level);
    }
    osc.set_harmony_detune_cents(patch.harmony_detune_cents);
    osc.set_harmony_drive(patch.harmony_drive);
}

fn apply_filter(svf: &mut Svf, patch: &crate::patch::FilterPatch) {
    svf.set_band(patch.band);
    svf.set_center_frequency(patch.center);
    svf.set_octave_offset(patch.octave);
    svf.set_q(patch.q);
    svf.set_keyboard_tracking(patch.kbd_track);
}

fn apply_distortion(distortion: &mut Distortion, patch: &crate::patch::DistortionPatch) {
    distortion.set_enabled(patch.enabled);
    distortion.set_drive(patch.drive);
    distortion.set_range(patch.range);
    distortion.set_blend(patch.blend);
    distortion.set_auto_gain(patch.auto_gain);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulation::{EnvSource, LfoSource, ModRouting};
    use crate::osc::Waveform;
    use crate::units::CONTROL_SUB_SAMPLING;
    use crate::wavetable::WavetableBank;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::TAU;

    fn voice_at(sample_rate: f64) -> Voice {
        let bank = WavetableBank::new();
        Voice::new(sample_rate, bank.morph(), bank.pad())
    }

    // Engine cadence: one control tick, then a block of audio samples.
    fn run_block(voice: &mut Voice) -> Vec<(f64, f64)> {
        voice.control_tick();
        (0..CONTROL_SUB_SAMPLING).map(|_| voice.next_sample()).collect()
    }

    #[test]
    fn test_init_patch_passes_raw_sine_through() {
        let mut voice = voice_at(44_100.0);
        voice.apply_patch(&Patch::init());
        voice.note_on(69, 1.0);

        let block = run_block(&mut voice);
        // Bypassed filter, unity send, no modulation: the bus carries the
        // oscillator's own samples. A sine starts at zero.
        assert_eq!(block[0].0, 0.0);
        assert_eq!(block[0].1, 0.0);
        let phase = 440.0 / 44_100.0;
        assert_eq!(block[1].0, (phase * TAU).sin());
    }

    #[test]
    fn test_voice_frequency_is_clamped() {
        let mut voice = voice_at(44_100.0);
        voice.set_frequency(1e9);
        assert_eq!(voice.frequency(), OSC_MAX_FREQUENCY);
        voice.set_frequency(1e-9);
        assert_eq!(voice.frequency(), OSC_MIN_FREQUENCY);
    }

    #[test]
    fn test_silence_gate_and_clean_retrigger() {
        // 1600 Hz keeps the control rate at 100 ticks/sec
        let mut voice = voice_at(1600.0);
        let mut patch = Patch::init();
        patch.envs[0] = crate::patch::EnvPatch {
            attack: 0,
            decay: 50,
            sustain: 80,
            release: 0,
        };
        patch.matrix.set(
            ModTarget::Osc1Amp,
            ModRouting {
                lfo: LfoSource::None,
                lfo_depth: 0.0,
                env: EnvSource::Env1,
                env_depth: 1.0,
            },
        );
        voice.apply_patch(&patch);

        voice.note_on(69, 1.0);
        assert!(voice.is_active());
        for _ in 0..50 {
            voice.control_tick();
        }
        assert!(voice.is_active());

        voice.note_off();
        let mut ticks = 0;
        while voice.control_tick() {
            ticks += 1;
            assert!(ticks < 10_000, "voice never went silent");
        }
        assert!(!voice.is_active());
        assert_eq!(voice.next_sample(), (0.0, 0.0));

        // The gate is idempotent on an already-silent voice
        assert!(!voice.control_tick());

        // And the voice comes back clean
        voice.note_on(69, 1.0);
        assert!(voice.is_active());
        let block = run_block(&mut voice);
        assert_eq!(block[0].0, 0.0);
        assert!(block.iter().any(|(ch1, _)| *ch1 != 0.0));
    }

    #[test]
    fn test_karplus_voice_silences_on_string_decay() {
        let mut voice = voice_at(44_100.0);
        voice.apply_patch(&Patch::plucked_string());
        voice.note_on(69, 1.0);

        let first = run_block(&mut voice);
        assert!(first.iter().any(|(ch1, _)| ch1.abs() > 0.0));

        voice.note_off();
        let mut ticks = 0;
        loop {
            if !voice.control_tick() {
                break;
            }
            for _ in 0..CONTROL_SUB_SAMPLING {
                voice.next_sample();
            }
            ticks += 1;
            assert!(ticks < 5_000, "string never rang out");
        }
        assert!(!voice.is_active());
    }

    #[test]
    fn test_hard_sync_changes_the_slave_output() {
        let mut patch = Patch::init();
        patch.osc2 = crate::patch::OscPatch {
            enabled: true,
            cents: 35.0,
            ..crate::patch::OscPatch::default()
        };

        let run = |sync: bool| {
            let mut patch = patch.clone();
            patch.osc2_sync_on_osc1 = sync;
            let mut voice = voice_at(44_100.0);
            voice.apply_patch(&patch);
            voice.note_on(69, 1.0);
            let mut out = Vec::new();
            for _ in 0..40 {
                out.extend(run_block(&mut voice).into_iter().map(|(a, _)| a));
            }
            out
        };

        assert_ne!(run(true), run(false));
    }

    #[test]
    fn test_pan_modulation_reaches_the_stereo_mix() {
        let mut voice = voice_at(1600.0);
        let mut patch = Patch::init();
        patch.lfos[0].waveform = Waveform::Square;
        patch.matrix.set(
            ModTarget::Amp1Pan,
            ModRouting {
                lfo: LfoSource::Lfo1,
                lfo_depth: 1.0,
                env: EnvSource::None,
                env_depth: 0.0,
            },
        );
        voice.apply_patch(&patch);
        voice.note_on(69, 1.0);

        // First tick reads the square at +1: pan swings hard right
        voice.control_tick();
        let mut left_energy = 0.0;
        let mut right_energy = 0.0;
        for _ in 0..CONTROL_SUB_SAMPLING {
            let (l, r) = voice.next_stereo();
            left_energy += l * l;
            right_energy += r * r;
        }
        assert!(right_energy > 0.0);
        assert_abs_diff_eq!(left_energy, 0.0, epsilon = 1e-20);
    }

    #[test]
    fn test_velocity_scales_the_stereo_output() {
        let mut loud = voice_at(44_100.0);
        loud.apply_patch(&Patch::init());
        loud.note_on(69, 1.0);
        let mut quiet = voice_at(44_100.0);
        quiet.apply_patch(&Patch::init());
        quiet.note_on(69, 0.5);

        loud.control_tick();
        quiet.control_tick();
        for _ in 0..64 {
            let (l_full, _) = loud.next_stereo();
            let (l_half, _) = quiet.next_stereo();
            assert_abs_diff_eq!(l_half, l_full * 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_vibrato_routing_alters_the_signal() {
        let mut patch = Patch::init();
        patch.matrix.set(
            ModTarget::Osc1Freq,
            ModRouting {
                lfo: LfoSource::Lfo1,
                lfo_depth: 0.5,
                env: EnvSource::None,
                env_depth: 0.0,
            },
        );

        let render = |patch: &Patch| {
            let mut voice = voice_at(44_100.0);
            voice.apply_patch(patch);
            voice.note_on(69, 1.0);
            let mut out = Vec::new();
            for _ in 0..20 {
                out.extend(run_block(&mut voice).into_iter().map(|(a, _)| a));
            }
            out
        };

        assert_ne!(render(&patch), render(&Patch::init()));
    }

    #[test]
    fn test_reset_clears_playing_state() {
        let mut voice = voice_at(44_100.0);
        voice.apply_patch(&Patch::init());
        voice.note_on(69, 1.0);
        run_block(&mut voice);

        voice.reset();
        assert!(!voice.is_active());
        assert_eq!(voice.next_sample(), (0.0, 0.0));

        // Configuration survives a reset: the voice plays again immediately
        voice.note_on(69, 1.0);
        let block = run_block(&mut voice);
        assert!(block.iter().any(|(ch1, _)| *ch1 != 0.0));
    }
}
