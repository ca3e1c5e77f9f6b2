//! Gain riding processors: compressor, noise gate and the master limiter.

use super::{Frame, Processor, db_to_gain, gain_to_db, time_coeff};

/// Soft knee compressor with a stereo-linked peak detector
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Current gain reduction in dB, zero or negative
    reduction_db: f32,
}

impl Compressor {
    pub fn new(
        sample_rate: f32,
        threshold_db: f32,
        ratio: f32,
        attack: f32,
        release: f32,
        knee_db: f32,
    ) -> Self {
        Self {
            threshold_db,
            ratio: ratio.max(1.),
            knee_db: knee_db.max(0.),
            attack_coeff: time_coeff(attack, sample_rate),
            release_coeff: time_coeff(release, sample_rate),
            reduction_db: 0.,
        }
    }

    /// Static curve: gain change in dB for an input level
    pub fn target_reduction(&self, level_db: f32) -> f32 {
        let over = level_db - self.threshold_db;
        let slope = 1. / self.ratio - 1.;
        if self.knee_db > 0. && 2. * over.abs() <= self.knee_db {
            let x = over + self.knee_db / 2.;
            slope * x * x / (2. * self.knee_db)
        } else if over > 0. {
            slope * over
        } else {
            0.
        }
    }
}

impl Processor for Compressor {
    fn process(&mut self, [l, r]: Frame, _time: f64) -> Frame {
        let level_db = gain_to_db(l.abs().max(r.abs()));
        let target = self.target_reduction(level_db);
        // More reduction attacks, less reduction releases
        let coeff = if target < self.reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.reduction_db = coeff * self.reduction_db + (1. - coeff) * target;
        let gain = db_to_gain(self.reduction_db);
        [l * gain, r * gain]
    }
}

/// Closes when the signal envelope falls below the threshold
pub struct NoiseGate {
    threshold: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
    gain: f32,
}

impl NoiseGate {
    pub fn new(sample_rate: f32, threshold_db: f32, attack: f32, release: f32) -> Self {
        Self {
            threshold: db_to_gain(threshold_db),
            attack_coeff: time_coeff(attack, sample_rate),
            release_coeff: time_coeff(release, sample_rate),
            envelope: 0.,
            gain: 0.,
        }
    }
}

impl Processor for NoiseGate {
    fn process(&mut self, [l, r]: Frame, _time: f64) -> Frame {
        let level = l.abs().max(r.abs());
        let env_coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = env_coeff * self.envelope + (1. - env_coeff) * level;

        let (target, coeff) = if self.envelope >= self.threshold {
            (1., self.attack_coeff)
        } else {
            (0., self.release_coeff)
        };
        self.gain = coeff * self.gain + (1. - coeff) * target;
        [l * self.gain, r * self.gain]
    }
}

/// Peak limiter with instant attack.
///
/// Output never exceeds the threshold; gain recovers with the release
/// time once the peak has passed.
pub struct Limiter {
    threshold: f32,
    release_coeff: f32,
    gain: f32,
}

impl Limiter {
    pub fn new(sample_rate: f32, threshold_db: f32, release: f32) -> Self {
        Self {
            threshold: db_to_gain(threshold_db.min(0.)),
            release_coeff: time_coeff(release, sample_rate),
            gain: 1.,
        }
    }
}

impl Processor for Limiter {
    fn process(&mut self, [l, r]: Frame, _time: f64) -> Frame {
        let peak = l.abs().max(r.abs());
        let target = if peak > self.threshold {
            self.threshold / peak
        } else {
            1.
        };
        if target < self.gain {
            self.gain = target;
        } else {
            self.gain = target + (self.gain - target) * self.release_coeff;
        }
        [l * self.gain, r * self.gain]
    }
}
