//! Energy based onset detection, used for snap-to-beat.

use std::collections::VecDeque;

const WINDOW_SIZE: usize = 2048;
const HOP_SIZE: usize = 512;
/// Relative energy rise over the recent average that counts as a beat
const THRESHOLD: f32 = 0.3;
/// About one second of history at 44.1kHz
const HISTORY_SIZE: usize = 43;
/// Quieter windows never count as beats
const MIN_ENERGY: f32 = 0.1;
/// Seconds between two reported beats
const MIN_GAP: f64 = 0.1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BeatFilter {
    #[default]
    All,
    /// Every second beat
    Strong,
    /// Every fourth beat
    Quarter,
}

/// Beat times in seconds found in `samples` (first channel).
pub fn detect_beats(samples: &[f32], sample_rate: u32) -> Vec<f64> {
    let mut beats: Vec<f64> = Vec::new();
    if sample_rate == 0 || samples.len() <= WINDOW_SIZE {
        return beats;
    }
    let mut history: VecDeque<f32> = VecDeque::with_capacity(HISTORY_SIZE + 1);

    let mut i = 0;
    while i < samples.len() - WINDOW_SIZE {
        let window = &samples[i..i + WINDOW_SIZE];
        let energy = (window.iter().map(|s| s * s).sum::<f32>() / WINDOW_SIZE as f32).sqrt();
        let average = if history.is_empty() {
            0.
        } else {
            history.iter().sum::<f32>() / history.len() as f32
        };

        if energy > average * (1. + THRESHOLD) && energy > MIN_ENERGY {
            let time = i as f64 / sample_rate as f64;
            if beats.last().is_none_or(|last| time - last > MIN_GAP) {
                beats.push(time);
            }
        }

        history.push_back(energy);
        if history.len() > HISTORY_SIZE {
            history.pop_front();
        }
        i += HOP_SIZE;
    }
    log::debug!("Detected {} beats", beats.len());
    beats
}

pub fn filter_beats(beats: &[f64], filter: BeatFilter) -> Vec<f64> {
    let step = match filter {
        BeatFilter::All => 1,
        BeatFilter::Strong => 2,
        BeatFilter::Quarter => 4,
    };
    beats.iter().step_by(step).copied().collect()
}

/// Closest beat to `time`
pub fn nearest_beat(time: f64, beats: &[f64]) -> Option<f64> {
    beats.iter().copied().min_by(|a, b| {
        (a - time)
            .abs()
            .total_cmp(&(b - time).abs())
            .then(a.total_cmp(b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Silence with a loud burst every `period` seconds
    fn clicks(period: f64, count: usize, sample_rate: u32) -> Vec<f32> {
        let total = (period * count as f64 * sample_rate as f64) as usize + WINDOW_SIZE * 2;
        let mut samples = vec![0.; total];
        for n in 0..count {
            let start = (n as f64 * period * sample_rate as f64) as usize + WINDOW_SIZE;
            for s in samples.iter_mut().skip(start).take(2000) {
                *s = 0.8;
            }
        }
        samples
    }

    #[test]
    fn test_detects_periodic_bursts() {
        let beats = detect_beats(&clicks(0.5, 4, 44100), 44100);
        assert_eq!(beats.len(), 4);
        for pair in beats.windows(2) {
            assert!((pair[1] - pair[0] - 0.5).abs() < 0.05);
        }
    }

    #[test]
    fn test_silence_has_no_beats() {
        assert!(detect_beats(&vec![0.; 44100], 44100).is_empty());
        assert!(detect_beats(&[0.5; 100], 44100).is_empty());
    }

    #[test]
    fn test_filter_and_nearest() {
        let beats = vec![0., 0.5, 1., 1.5, 2.];
        assert_eq!(filter_beats(&beats, BeatFilter::Strong), vec![0., 1., 2.]);
        assert_eq!(filter_beats(&beats, BeatFilter::Quarter), vec![0., 2.]);
        assert_eq!(nearest_beat(1.2, &beats), Some(1.));
        assert_eq!(nearest_beat(1.25, &beats), Some(1.));
        assert_eq!(nearest_beat(1., &[]), None);
    }
}
