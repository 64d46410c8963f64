//! Waveshaping Distortion
//!
//! Odd-symmetric soft clipper. `range` is pre-gain into the shaper, `drive`
//! sets the curve hardness, `blend` is the dry/wet mix. Auto-gain rescales
//! the wet signal so a full-scale input still peaks at full scale.

// Pre-gain at range = 1 (20 dB).
const RANGE_MAX_GAIN: f64 = 10.0;

// Drive is clamped just short of 1 where the curve degenerates.
const MAX_DRIVE: f64 = 0.99;

pub struct Distortion {
    enabled: bool,
    drive: f64,
    range: f64,
    blend: f64,
    auto_gain: bool,
}

impl Distortion {
    pub fn new() -> Self {
        Self {
            enabled: false,
            drive: 0.5,
            range: 0.5,
            blend: 1.0,
            auto_gain: true,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_drive(&mut self, drive: f64) {
        self.drive = drive.clamp(0.0, 1.0);
    }

    pub fn set_range(&mut self, range: f64) {
        self.range = range.clamp(0.0, 1.0);
    }

    pub fn set_blend(&mut self, blend: f64) {
        self.blend = blend.clamp(0.0, 1.0);
    }

    pub fn set_auto_gain(&mut self, auto_gain: bool) {
        self.auto_gain = auto_gain;
    }

    pub fn process(&self, input: f64) -> f64 {
        if !self.enabled {
            return input;
        }

        let gain = 1.0 + self.range * (RANGE_MAX_GAIN - 1.0);
        let k = curve_amount(self.drive.min(MAX_DRIVE));
        let shaped = waveshape(input * gain, k);
        let wet = if self.auto_gain {
            shaped / waveshape(gain, k)
        } else {
            shaped
        };

        (1.0 - self.blend) * input + self.blend * wet
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new()
    }
}

fn curve_amount(drive: f64) -> f64 {
    2.0 * drive / (1.0 - drive)
}

// (1+k)x / (1+k|x|): identity at k = 0, hard limiter as k grows.
fn waveshape(x: f64, k: f64) -> f64 {
    (1.0 + k) * x / (1.0 + k * x.abs())
}
