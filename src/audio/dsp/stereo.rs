use super::{Frame, Processor};
use std::f32::consts::FRAC_PI_2;

/// Mid/side width followed by an equal-power stereo panner
pub struct StereoImage {
    side_gain: f32,
    pan: f32,
    pan_gains: (f32, f32),
}

impl StereoImage {
    /// `width` in [-1, 1]: -1 collapses to mono, 0 is neutral, 1 doubles the
    /// side signal. `pan` in [-1, 1].
    pub fn new(width: f32, pan: f32) -> Self {
        let pan = pan.clamp(-1., 1.);
        let x = if pan <= 0. { pan + 1. } else { pan };
        Self {
            side_gain: 1. + width.clamp(-1., 1.),
            pan,
            pan_gains: ((x * FRAC_PI_2).cos(), (x * FRAC_PI_2).sin()),
        }
    }
}

impl Processor for StereoImage {
    fn process(&mut self, [l, r]: Frame, _time: f64) -> Frame {
        let mid = (l + r) * 0.5;
        let side = (l - r) * 0.5 * self.side_gain;
        let (l, r) = (mid + side, mid - side);

        let (gain_l, gain_r) = self.pan_gains;
        if self.pan <= 0. {
            [l + r * gain_l, r * gain_r]
        } else {
            [l * gain_l, r + l * gain_r]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_width() {
        let mut stereo = StereoImage::new(-1., 0.);
        let [l, r] = stereo.process([1., 0.], 0.);
        assert!((l - 0.5).abs() < 1e-6);
        assert!((r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_neutral_is_transparent() {
        let mut stereo = StereoImage::new(0., 0.);
        let [l, r] = stereo.process([0.3, -0.7], 0.);
        assert!((l - 0.3).abs() < 1e-6);
        assert!((r + 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_hard_pan() {
        let mut left = StereoImage::new(0., -1.);
        let [l, r] = left.process([0.5, 0.5], 0.);
        assert!((l - 1.).abs() < 1e-6);
        assert!(r.abs() < 1e-6);

        let mut right = StereoImage::new(0., 1.);
        let [l, r] = right.process([0.5, 0.5], 0.);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.).abs() < 1e-6);
    }
}
