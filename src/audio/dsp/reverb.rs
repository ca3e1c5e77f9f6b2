//! Feedback delay network reverb.
//!
//! Four delay lines mixed through a Householder matrix. The matrix is
//! orthogonal, so any feedback gain below 1 keeps the network stable.

use super::{Frame, Processor};
use crate::core::fx::RoomSize;

/// Delay line lengths at 44.1kHz for a large room, mutually prime
const BASE_LENGTHS: [usize; 4] = [1116, 1356, 1491, 1617];
const REFERENCE_RATE: f32 = 44100.;
/// Feedback reached at full decay
const MAX_FEEDBACK: f32 = 0.85;
/// Lowpass inside the loop, higher is darker
const DAMPING: f32 = 0.3;

struct DelayLine {
    buffer: Vec<f32>,
    pos: usize,
}

impl DelayLine {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.; len.max(1)],
            pos: 0,
        }
    }

    fn read(&self) -> f32 {
        self.buffer[self.pos]
    }

    fn write(&mut self, value: f32) {
        self.buffer[self.pos] = value;
        self.pos = (self.pos + 1) % self.buffer.len();
    }
}

pub struct Reverb {
    lines: [DelayLine; 4],
    damp_state: [f32; 4],
    feedback: f32,
    wet: f32,
    dry: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32, room_size: RoomSize, decay: f32, wet: f32, dry: f32) -> Self {
        let scale = room_size.scale() * sample_rate / REFERENCE_RATE;
        let lines = BASE_LENGTHS.map(|len| DelayLine::new((len as f32 * scale).round() as usize));
        Self {
            lines,
            damp_state: [0.; 4],
            feedback: decay.clamp(0., 1.) * MAX_FEEDBACK,
            wet: wet.max(0.),
            dry: dry.max(0.),
        }
    }
}

impl Processor for Reverb {
    fn process(&mut self, [l, r]: Frame, _time: f64) -> Frame {
        let outs = [
            self.lines[0].read(),
            self.lines[1].read(),
            self.lines[2].read(),
            self.lines[3].read(),
        ];
        // Householder: H = I - 2/N * ones
        let half_sum = outs.iter().sum::<f32>() * 0.5;
        let input = [l, r, l, r];
        for (i, line) in self.lines.iter_mut().enumerate() {
            let mixed = outs[i] - half_sum;
            self.damp_state[i] = (1. - DAMPING) * mixed + DAMPING * self.damp_state[i];
            line.write(input[i] * 0.5 + self.feedback * self.damp_state[i]);
        }

        let wet_l = (outs[0] + outs[2]) * 0.5;
        let wet_r = (outs[1] + outs[3]) * 0.5;
        [
            self.dry * l + self.wet * wet_l,
            self.dry * r + self.wet * wet_r,
        ]
    }
}
