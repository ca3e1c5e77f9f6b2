use crate::audio::{
    dsp::{
        Frame, Gain, Processor,
        biquad::{Biquad, BiquadCoeffs},
        dynamics::{Compressor, Limiter, NoiseGate},
        reverb::Reverb,
        stereo::StereoImage,
        tape::Tape,
    },
    graph::{EffectsGraph, FadeEnvelope, MasterGraph, MasterStage, Stage},
};

/// Applies the fade envelope at the clip-local time of each frame
struct TrackGain {
    envelope: FadeEnvelope,
}

impl Processor for TrackGain {
    fn process(&mut self, [l, r]: Frame, time: f64) -> Frame {
        let gain = self.envelope.gain_at(time);
        [l * gain, r * gain]
    }
}

/// Instantiated processors of one clip, in graph order
pub struct ProcessingChain {
    processors: Vec<Box<dyn Processor>>,
}

impl ProcessingChain {
    /// `seed` feeds the stages that generate noise.
    pub fn new(graph: &EffectsGraph, sample_rate: u32, seed: u64) -> Self {
        let sr = sample_rate as f32;
        let processors = graph
            .stages
            .iter()
            .map(|stage| -> Box<dyn Processor> {
                match stage {
                    Stage::NormalizeGain { gain } => Box::new(Gain { gain: *gain }),
                    Stage::NoiseGate {
                        threshold_db,
                        attack,
                        release,
                    } => Box::new(NoiseGate::new(sr, *threshold_db, *attack, *release)),
                    Stage::LowShelf { frequency, gain_db } => {
                        Box::new(Biquad::new(BiquadCoeffs::low_shelf(sr, *frequency, *gain_db)))
                    }
                    Stage::Peaking {
                        frequency,
                        gain_db,
                        q,
                    } => Box::new(Biquad::new(BiquadCoeffs::peaking(
                        sr, *frequency, *gain_db, *q,
                    ))),
                    Stage::HighShelf { frequency, gain_db } => {
                        Box::new(Biquad::new(BiquadCoeffs::high_shelf(sr, *frequency, *gain_db)))
                    }
                    Stage::Compressor {
                        threshold_db,
                        ratio,
                        attack,
                        release,
                        knee_db,
                    } => Box::new(Compressor::new(
                        sr,
                        *threshold_db,
                        *ratio,
                        *attack,
                        *release,
                        *knee_db,
                    )),
                    Stage::Tape {
                        saturation,
                        warmth,
                        noise,
                    } => Box::new(Tape::new(sr, *saturation, *warmth, *noise, seed)),
                    Stage::Reverb {
                        room_size,
                        decay,
                        wet,
                        dry,
                    } => Box::new(Reverb::new(sr, *room_size, *decay, *wet, *dry)),
                    Stage::Stereo { width, pan } => Box::new(StereoImage::new(*width, *pan)),
                    Stage::TrackGain { envelope } => Box::new(TrackGain {
                        envelope: *envelope,
                    }),
                }
            })
            .collect();
        Self { processors }
    }

    pub fn process(&mut self, frame: Frame, time: f64) -> Frame {
        self.processors
            .iter_mut()
            .fold(frame, |frame, processor| processor.process(frame, time))
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// Processors of the output bus
pub struct MasterChain {
    processors: Vec<Box<dyn Processor>>,
}

impl MasterChain {
    pub fn new(graph: &MasterGraph, sample_rate: u32) -> Self {
        let processors = graph
            .stages
            .iter()
            .map(|stage| -> Box<dyn Processor> {
                match stage {
                    MasterStage::Gain { gain } => Box::new(Gain { gain: *gain }),
                    MasterStage::Limiter {
                        threshold_db,
                        release,
                    } => Box::new(Limiter::new(sample_rate as f32, *threshold_db, *release)),
                }
            })
            .collect();
        Self { processors }
    }

    pub fn process(&mut self, frame: Frame) -> Frame {
        self.processors
            .iter_mut()
            .fold(frame, |frame, processor| processor.process(frame, 0.))
    }
}

/// Stable seed derived from a clip id (FNV-1a)
pub fn seed_for(id: &str) -> u64 {
    id.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
