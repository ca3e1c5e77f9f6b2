use super::{Frame, Processor};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::f32::consts::PI;

/// Hiss level at full noise
const NOISE_LEVEL: f32 = 0.02;

/// Tape emulation: soft saturation, a warmth lowpass and seeded hiss.
///
/// The noise generator is seeded per clip so two renders of the same clip
/// produce the same samples.
pub struct Tape {
    drive: f32,
    lowpass_coeff: f32,
    lowpass: [f32; 2],
    noise: f32,
    rng: StdRng,
}

impl Tape {
    pub fn new(sample_rate: f32, saturation: f32, warmth: f32, noise: f32, seed: u64) -> Self {
        let saturation = saturation.clamp(0., 0.99);
        let warmth = warmth.clamp(0., 1.);
        let cutoff = (20_000. - 16_000. * warmth).min(sample_rate * 0.49);
        Self {
            drive: 2. * saturation / (1. - saturation),
            lowpass_coeff: (-2. * PI * cutoff / sample_rate).exp(),
            lowpass: [0.; 2],
            noise: noise.clamp(0., 1.) * NOISE_LEVEL,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn shape(&self, x: f32) -> f32 {
        (1. + self.drive) * x / (1. + self.drive * x.abs())
    }
}

impl Processor for Tape {
    fn process(&mut self, frame: Frame, _time: f64) -> Frame {
        let mut out = [0.; 2];
        for (channel, x) in frame.into_iter().enumerate() {
            let shaped = self.shape(x);
            let filtered =
                (1. - self.lowpass_coeff) * shaped + self.lowpass_coeff * self.lowpass[channel];
            self.lowpass[channel] = filtered;
            out[channel] = filtered;
        }
        if self.noise > 0. {
            for sample in out.iter_mut() {
                *sample += self.rng.random_range(-1.0..1.0) * self.noise;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturation_is_bounded() {
        let tape = Tape::new(44100., 0.9, 0., 0., 1);
        for x in [-1., -0.5, 0., 0.3, 1.] {
            let y = tape.shape(x);
            assert!(y.abs() <= 1. + 1e-6);
            assert!(y.abs() >= x.abs() - 1e-6);
        }
        assert_eq!(Tape::new(44100., 0., 0., 0., 1).shape(0.42), 0.42);
    }

    #[test]
    fn test_noise_is_seeded() {
        let render = |seed| {
            let mut tape = Tape::new(44100., 0.3, 0.5, 0.5, seed);
            (0..256).map(|_| tape.process([0., 0.], 0.)).collect::<Vec<_>>()
        };
        assert_eq!(render(7), render(7));
        assert_ne!(render(7), render(8));
    }
}
