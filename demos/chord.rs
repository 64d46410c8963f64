//! Chord Demo
//!
//! Plays a Cmaj7 chord on the warm pad preset, holds it, releases it, and
//! watches the voice pool drain as the release tails fall silent. Then
//! strums the same chord on the plucked string preset and lets the strings
//! ring out on their own.
//!
//! Run with: cargo run --example chord

use madrigal::prelude::*;

fn note_name(note: u8) -> String {
    let names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", names[(note % 12) as usize], octave)
}

/// RMS over an interleaved-equivalent stereo block.
fn block_rms(left: &[f64], right: &[f64]) -> f64 {
    let sum: f64 = left
        .iter()
        .zip(right.iter())
        .map(|(l, r)| l * l + r * r)
        .sum();
    (sum / (2.0 * left.len() as f64)).sqrt()
}

fn meter(rms: f64) -> String {
    let width = ((rms * 120.0) as usize).min(50);
    "#".repeat(width)
}

fn main() {
    let sample_rate = 44100.0;
    let block = 4410; // 100 ms per rendered block
    let chord = [60u8, 64, 67, 71]; // Cmaj7

    let mut engine = PolyEngine::new(8, sample_rate);
    let mut left = vec![0.0; block];
    let mut right = vec![0.0; block];

    println!("=== Chord Demo ===\n");

    // ------------------------------------------------------------------
    // Warm pad: slow attack, long release
    // ------------------------------------------------------------------
    engine.set_patch(&Patch::warm_pad());

    print!("Playing Cmaj7 on '{}':", engine.patch().name);
    for &note in &chord {
        engine.note_on(note, 0.8);
        print!(" {}", note_name(note));
    }
    println!(" ({} voices sounding)\n", engine.active_voices());

    println!("Hold:");
    for i in 0..20 {
        engine.render(&mut left, &mut right);
        let rms = block_rms(&left, &right);
        println!("  {:>4} ms  {:.4}  {}", (i + 1) * 100, rms, meter(rms));
    }

    println!("\nReleasing all notes.");
    engine.all_notes_off();

    let mut freed = Vec::new();
    let mut elapsed_ms = 2000;
    println!("Release tail:");
    while engine.active_voices() > 0 && elapsed_ms < 12_000 {
        engine.render(&mut left, &mut right);
        elapsed_ms += 100;
        let rms = block_rms(&left, &right);
        if elapsed_ms % 500 == 0 {
            println!("  {:>4} ms  {:.4}  {}", elapsed_ms, rms, meter(rms));
        }
    }
    engine.drain_finished(&mut freed);
    println!(
        "All voices silent after {:.1} s; freed slots: {:?}\n",
        elapsed_ms as f64 / 1000.0,
        freed
    );

    // ------------------------------------------------------------------
    // Plucked string: the strings lose energy on their own
    // ------------------------------------------------------------------
    engine.set_patch(&Patch::plucked_string());

    print!("Strumming Cmaj7 on '{}':", engine.patch().name);
    for &note in &chord {
        engine.note_on(note, 0.9);
        print!(" {}", note_name(note));
    }
    println!();

    println!("Ring-out (no note_off yet):");
    for i in 0..15 {
        engine.render(&mut left, &mut right);
        let rms = block_rms(&left, &right);
        if (i + 1) % 3 == 0 {
            println!("  {:>4} ms  {:.4}  {}", (i + 1) * 100, rms, meter(rms));
        }
    }

    // Release mutes the leftover energy almost immediately.
    engine.all_notes_off();
    let mut ms = 1500;
    while engine.active_voices() > 0 && ms < 4000 {
        engine.render(&mut left, &mut right);
        ms += 100;
    }
    freed.clear();
    engine.drain_finished(&mut freed);
    println!(
        "\nMuted {} strings {} ms after release.",
        freed.len(),
        ms - 1500
    );
}
