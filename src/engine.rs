//! Polyphonic Engine
//!
//! Fixed pool of voices behind the MIDI-ish surface: note-on picks a free
//! slot (same-note retrigger reuses its slot, a full pool steals the oldest
//! allocation), note-off releases and lets the voice ring out, and the
//! per-sample tick mixes every sounding voice into one stereo pair. Voices
//! that fall silent are queued as finished events for the caller to drain.
//!
//! All calls belong to the audio thread; nothing here blocks or allocates
//! after construction.

use std::sync::Arc;

use log::{debug, trace};

use crate::patch::Patch;
use crate::units::{CONTROL_SUB_SAMPLING, MAX_VOICES};
use crate::voice::Voice;
use crate::wavetable::{WaveTable, WavetableBank};

struct VoiceSlot {
    voice: Voice,
    note: u8,
    stamp: u64,
    in_use: bool,
}

pub struct PolyEngine {
    sample_rate: f64,
    slots: Vec<VoiceSlot>,
    sample_counter: u64,
    stamp_counter: u64,
    finished: Vec<usize>,
    bank: WavetableBank,
    patch: Patch,
}

impl PolyEngine {
    /// Build a pool of `polyphony` voices (clamped to 1..=48) playing the
    /// init patch.
    pub fn new(polyphony: usize, sample_rate: f64) -> Self {
        let polyphony = polyphony.clamp(1, MAX_VOICES);
        let bank = WavetableBank::new();
        let patch = Patch::init();

        let mut slots = Vec::with_capacity(polyphony);
        for i in 0..polyphony {
            let mut voice = Voice::new(sample_rate, bank.morph(), bank.pad());
            voice.set_seed((i as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            voice.apply_patch(&patch);
            slots.push(VoiceSlot {
                voice,
                note: 0,
                stamp: 0,
                in_use: false,
            });
        }
        debug!("engine up: {polyphony} voices at {sample_rate} Hz");

        Self {
            sample_rate,
            slots,
            sample_counter: 0,
            stamp_counter: 0,
            finished: Vec::with_capacity(polyphony),
            bank,
            patch,
        }
    }

    pub fn polyphony(&self) -> usize {
        self.slots.len()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    pub fn active_voices(&self) -> usize {
        self.slots.iter().filter(|s| s.in_use).count()
    }

    /// Start a note. Reuses the slot already sounding this note, otherwise a
    /// free slot, otherwise steals the oldest allocation.
    pub fn note_on(&mut self, note: u8, velocity: f64) {
        self.stamp_counter += 1;
        let stamp = self.stamp_counter;

        if let Some(slot) = self.slots.iter_mut().find(|s| s.in_use && s.note == note) {
            trace!("retrigger note {note}");
            slot.stamp = stamp;
            slot.voice.note_on(note, velocity);
            return;
        }

        if let Some(slot) = self.slots.iter_mut().find(|s| !s.in_use) {
            trace!("note {note} on");
            slot.note = note;
            slot.stamp = stamp;
            slot.in_use = true;
            slot.voice.note_on(note, velocity);
            return;
        }

        // Pool exhausted: the oldest stamp loses its voice
        if let Some(slot) = self.slots.iter_mut().min_by_key(|s| s.stamp) {
            debug!("steal: note {} evicted for note {note}", slot.note);
            slot.voice.reset();
            slot.note = note;
            slot.stamp = stamp;
            slot.in_use = true;
            slot.voice.note_on(note, velocity);
        }
    }

    /// Release a note; the voice keeps sounding until its own silence gate
    /// closes.
    pub fn note_off(&mut self, note: u8) {
        for slot in self.slots.iter_mut().filter(|s| s.in_use && s.note == note) {
            trace!("note {note} off");
            slot.voice.note_off();
        }
    }

    pub fn all_notes_off(&mut self) {
        for slot in self.slots.iter_mut().filter(|s| s.in_use) {
            slot.voice.note_off();
        }
    }

    /// Apply a patch to every voice and rebuild the morph table for its
    /// symmetry setting.
    pub fn set_patch(&mut self, patch: &Patch) {
        debug!("patch: {}", patch.name);
        self.patch = patch.clone();
        self.bank.rebuild_morph(patch.mso.symmetry);
        let morph = self.bank.morph();
        for slot in &mut self.slots {
            slot.voice.apply_patch(patch);
            slot.voice.set_morph_table(Arc::clone(&morph));
        }
    }

    pub fn set_morph_table(&mut self, table: Arc<WaveTable>) {
        self.bank.set_morph(Arc::clone(&table));
        for slot in &mut self.slots {
            slot.voice.set_morph_table(Arc::clone(&table));
        }
    }

    pub fn set_pad_table(&mut self, table: Arc<WaveTable>) {
        self.bank.set_pad(Arc::clone(&table));
        for slot in &mut self.slots {
            slot.voice.set_pad_table(Arc::clone(&table));
        }
    }

    /// Move the indices of voices that fell silent since the last drain into
    /// `out`.
    pub fn drain_finished(&mut self, out: &mut Vec<usize>) {
        out.append(&mut self.finished);
    }

    /// Produce one mixed stereo sample. Every `CONTROL_SUB_SAMPLING` samples
    /// this first runs the control pass over all sounding voices.
    pub fn tick(&mut self) -> (f64, f64) {
        if self.sample_counter % CONTROL_SUB_SAMPLING as u64 == 0 {
            for (i, slot) in self.slots.iter_mut().enumerate() {
                if slot.in_use && !slot.voice.control_tick() {
                    trace!("voice {i} finished (note {})", slot.note);
                    slot.in_use = false;
                    self.finished.push(i);
                }
            }
        }
        self.sample_counter += 1;

        let mut left = 0.0;
        let mut right = 0.0;
        for slot in self.slots.iter_mut().filter(|s| s.in_use) {
            let (l, r) = slot.voice.next_stereo();
            left += l;
            right += r;
        }
        (left, right)
    }

    /// Fill a pair of output buffers sample by sample.
    pub fn render(&mut self, left: &mut [f64], right: &mut [f64]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (a, b) = self.tick();
            *l = a;
            *r = b;
        }
    }
}
