//! Output Amp
//!
//! Maps a voice's two filter-bus samples to a stereo pair. Each bus has its
//! own gain and equal-power pan; pan modulation arrives at control rate as a
//! bipolar offset worth half the pan range. Note velocity scales both buses.

use std::f64::consts::FRAC_PI_2;

pub struct OutputAmp {
    gain1: f64,
    gain2: f64,
    pan1: f64,
    pan2: f64,
    velocity: f64,
    left1: f64,
    right1: f64,
    left2: f64,
    right2: f64,
}

impl OutputAmp {
    pub fn new() -> Self {
        let mut amp = Self {
            gain1: 1.0,
            gain2: 1.0,
            pan1: 0.5,
            pan2: 0.5,
            velocity: 1.0,
            left1: 0.0,
            right1: 0.0,
            left2: 0.0,
            right2: 0.0,
        };
        amp.set_pan_modulation(0.0, 0.0);
        amp
    }

    pub fn set_gain1(&mut self, gain: f64) {
        self.gain1 = gain.clamp(0.0, 1.0);
    }

    pub fn set_gain2(&mut self, gain: f64) {
        self.gain2 = gain.clamp(0.0, 1.0);
    }

    /// Base pan per bus: 0 is hard left, 0.5 center, 1 hard right.
    pub fn set_pan1(&mut self, pan: f64) {
        self.pan1 = pan.clamp(0.0, 1.0);
    }

    pub fn set_pan2(&mut self, pan: f64) {
        self.pan2 = pan.clamp(0.0, 1.0);
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.velocity = velocity.clamp(0.0, 1.0);
    }

    /// Apply bipolar pan offsets and refresh the cached pan gains. A full
    /// offset moves the pan by half its range.
    pub fn set_pan_modulation(&mut self, offset1: f64, offset2: f64) {
        let pan1 = (self.pan1 + 0.5 * offset1.clamp(-1.0, 1.0)).clamp(0.0, 1.0);
        let pan2 = (self.pan2 + 0.5 * offset2.clamp(-1.0, 1.0)).clamp(0.0, 1.0);
        (self.left1, self.right1) = pan_gains(pan1);
        (self.left2, self.right2) = pan_gains(pan2);
    }

    pub fn reset(&mut self) {
        self.velocity = 1.0;
        self.set_pan_modulation(0.0, 0.0);
    }

    /// Mix the two bus samples into (left, right).
    pub fn mix(&self, ch1: f64, ch2: f64) -> (f64, f64) {
        let s1 = ch1 * self.gain1 * self.velocity;
        let s2 = ch2 * self.gain2 * self.velocity;
        (
            s1 * self.left1 + s2 * self.left2,
            s1 * self.right1 + s2 * self.right2,
        )
    }
}

impl Default for OutputAmp {
    fn default() -> Self {
        Self::new()
    }
}

// Quarter-circle pan law: constant L^2 + R^2 across the sweep.
fn pan_gains(pan: f64) -> (f64, f64) {
    let angle = pan * FRAC_PI_2;
    (angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_center_pan_is_equal_power() {
        let amp = OutputAmp::new();
        let (l, r) = amp.mix(1.0, 0.0);
        assert_abs_diff_eq!(l, r, epsilon = 1e-12);
        assert_abs_diff_eq!(l, 0.5_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_hard_left_and_right() {
        let mut amp = OutputAmp::new();
        amp.set_pan1(0.0);
        amp.set_pan2(1.0);
        amp.set_pan_modulation(0.0, 0.0);
        let (l, r) = amp.mix(1.0, 0.0);
        assert_abs_diff_eq!(l, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r, 0.0, epsilon = 1e-12);
        let (l, r) = amp.mix(0.0, 1.0);
        assert_abs_diff_eq!(l, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_power_constant_across_pan_sweep() {
        for pan in [0.0, 0.2, 0.5, 0.8, 1.0] {
            let mut amp = OutputAmp::new();
            amp.set_pan1(pan);
            amp.set_pan_modulation(0.0, 0.0);
            let (l, r) = amp.mix(1.0, 0.0);
            assert_abs_diff_eq!(l * l + r * r, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_full_pan_offset_reaches_the_edge() {
        let mut amp = OutputAmp::new();
        amp.set_pan_modulation(1.0, -1.0);
        let (l, r) = amp.mix(1.0, 0.0);
        assert_abs_diff_eq!(l, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-12);
        let (l, r) = amp.mix(0.0, 1.0);
        assert_abs_diff_eq!(l, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_scales_linearly() {
        let mut amp = OutputAmp::new();
        let (full, _) = amp.mix(1.0, 0.0);
        amp.set_velocity(0.5);
        let (half, _) = amp.mix(1.0, 0.0);
        assert_abs_diff_eq!(half, full * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_clamped_to_unit_range() {
        let mut a = OutputAmp::new();
        a.set_pan_modulation(5.0, 0.0);
        let mut b = OutputAmp::new();
        b.set_pan_modulation(1.0, 0.0);
        assert_eq!(a.mix(1.0, 0.0), b.mix(1.0, 0.0));
    }
}
