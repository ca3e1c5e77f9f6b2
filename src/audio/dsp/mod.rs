//! Per-sample processors instantiated from an effects graph.

pub mod biquad;
pub mod dynamics;
pub mod reverb;
pub mod stereo;
pub mod tape;

/// One stereo frame
pub type Frame = [f32; 2];

/// A stage of a processing chain.
///
/// Processing happens one frame at a time, so the output never depends on
/// the block size used by the caller.
pub trait Processor: Send {
    /// `time` is the clip-local time of the frame in seconds.
    fn process(&mut self, frame: Frame, time: f64) -> Frame;
}

/// Lowest level reported by [`gain_to_db`]
pub const MIN_DB: f32 = -120.;

pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.)
}

pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 0. {
        MIN_DB
    } else {
        (20. * gain.log10()).max(MIN_DB)
    }
}

/// One-pole smoothing coefficient reaching ~63% after `seconds`.
/// Zero or negative times give an instant response.
pub fn time_coeff(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0. || sample_rate <= 0. {
        0.
    } else {
        (-1. / (seconds * sample_rate)).exp()
    }
}

/// Constant gain
pub struct Gain {
    pub gain: f32,
}

impl Processor for Gain {
    fn process(&mut self, [l, r]: Frame, _time: f64) -> Frame {
        [l * self.gain, r * self.gain]
    }
}
