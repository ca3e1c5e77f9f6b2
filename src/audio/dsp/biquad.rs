//! RBJ cookbook biquads, transposed direct form II.

use super::{Frame, Processor};
use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoeffs {
    /// Shelf slope of 1
    pub fn low_shelf(sample_rate: f32, frequency: f32, gain_db: f32) -> Self {
        let (a, cos, alpha) = shelf_terms(sample_rate, frequency, gain_db);
        let sqrt_a_alpha = 2. * a.sqrt() * alpha;
        Self::normalized(
            a * ((a + 1.) - (a - 1.) * cos + sqrt_a_alpha),
            2. * a * ((a - 1.) - (a + 1.) * cos),
            a * ((a + 1.) - (a - 1.) * cos - sqrt_a_alpha),
            (a + 1.) + (a - 1.) * cos + sqrt_a_alpha,
            -2. * ((a - 1.) + (a + 1.) * cos),
            (a + 1.) + (a - 1.) * cos - sqrt_a_alpha,
        )
    }

    pub fn high_shelf(sample_rate: f32, frequency: f32, gain_db: f32) -> Self {
        let (a, cos, alpha) = shelf_terms(sample_rate, frequency, gain_db);
        let sqrt_a_alpha = 2. * a.sqrt() * alpha;
        Self::normalized(
            a * ((a + 1.) + (a - 1.) * cos + sqrt_a_alpha),
            -2. * a * ((a - 1.) + (a + 1.) * cos),
            a * ((a + 1.) + (a - 1.) * cos - sqrt_a_alpha),
            (a + 1.) - (a - 1.) * cos + sqrt_a_alpha,
            2. * ((a - 1.) - (a + 1.) * cos),
            (a + 1.) - (a - 1.) * cos - sqrt_a_alpha,
        )
    }

    pub fn peaking(sample_rate: f32, frequency: f32, gain_db: f32, q: f32) -> Self {
        let a = 10f32.powf(gain_db / 40.);
        let w0 = 2. * PI * clamp_frequency(frequency, sample_rate) / sample_rate;
        let cos = w0.cos();
        let alpha = w0.sin() / (2. * q.max(0.01));
        Self::normalized(
            1. + alpha * a,
            -2. * cos,
            1. - alpha * a,
            1. + alpha / a,
            -2. * cos,
            1. - alpha / a,
        )
    }

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

fn clamp_frequency(frequency: f32, sample_rate: f32) -> f32 {
    frequency.clamp(10., sample_rate * 0.49)
}

fn shelf_terms(sample_rate: f32, frequency: f32, gain_db: f32) -> (f32, f32, f32) {
    let a = 10f32.powf(gain_db / 40.);
    let w0 = 2. * PI * clamp_frequency(frequency, sample_rate) / sample_rate;
    // alpha = sin(w0)/2 * sqrt((A + 1/A)(1/S - 1) + 2) with S = 1
    let alpha = w0.sin() / 2. * 2f32.sqrt();
    (a, w0.cos(), alpha)
}

/// Stereo biquad filter
pub struct Biquad {
    coeffs: BiquadCoeffs,
    z1: [f32; 2],
    z2: [f32; 2],
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            z1: [0.; 2],
            z2: [0.; 2],
        }
    }

    fn tick(&mut self, channel: usize, x: f32) -> f32 {
        let c = &self.coeffs;
        let y = c.b0 * x + self.z1[channel];
        self.z1[channel] = c.b1 * x - c.a1 * y + self.z2[channel];
        self.z2[channel] = c.b2 * x - c.a2 * y;
        y
    }
}

impl Processor for Biquad {
    fn process(&mut self, [l, r]: Frame, _time: f64) -> Frame {
        [self.tick(0, l), self.tick(1, r)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2. * PI * frequency * i as f32 / sample_rate).sin())
            .collect()
    }

    /// Steady state peak after filtering a sine
    fn response(coeffs: BiquadCoeffs, frequency: f32) -> f32 {
        let mut filter = Biquad::new(coeffs);
        let input = sine(frequency, 44100., 44100);
        input
            .iter()
            .map(|&x| filter.process([x, x], 0.)[0])
            .skip(22050)
            .fold(0., |m: f32, y| m.max(y.abs()))
    }

    #[test]
    fn test_flat_filters_are_identity() {
        for coeffs in [
            BiquadCoeffs::low_shelf(44100., 200., 0.),
            BiquadCoeffs::peaking(44100., 2000., 0., 1.),
            BiquadCoeffs::high_shelf(44100., 8000., 0.),
        ] {
            let mut filter = Biquad::new(coeffs);
            for x in sine(440., 44100., 1000) {
                let [l, r] = filter.process([x, -x], 0.);
                assert!((l - x).abs() < 1e-5);
                assert!((r + x).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_low_shelf_boosts_lows_only() {
        let coeffs = BiquadCoeffs::low_shelf(44100., 200., 12.);
        assert!(response(coeffs, 20.) > 3.5);
        assert!((response(coeffs, 10_000.) - 1.).abs() < 0.05);
    }

    #[test]
    fn test_high_shelf_cuts_highs_only() {
        let coeffs = BiquadCoeffs::high_shelf(44100., 4000., -15.);
        assert!(response(coeffs, 15_000.) < 0.25);
        assert!((response(coeffs, 100.) - 1.).abs() < 0.05);
    }

    #[test]
    fn test_peaking_at_center() {
        let coeffs = BiquadCoeffs::peaking(44100., 2000., 6., 1.);
        assert!((response(coeffs, 2000.) - 2.).abs() < 0.05);
    }
}
