use crate::analysis::DecodedAudio;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// Convert a decoded source to `sample_rate`.
///
/// Whole-buffer conversion run once per source when it is loaded, so
/// playback and export read the exact same samples. The resampler delay is
/// trimmed and the output length is `frames * ratio` rounded.
pub fn resample_to(audio: &DecodedAudio, sample_rate: u32) -> DecodedAudio {
    if audio.sample_rate == sample_rate || audio.frames() == 0 || sample_rate == 0 {
        return audio.clone();
    }
    let channels = audio.channels();
    let ratio = sample_rate as f64 / audio.sample_rate as f64;
    let expected = (audio.frames() as f64 * ratio).round() as usize;

    let mut resampler = match SincFixedIn::<f32>::new(
        ratio,
        1.,
        SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.95,
            oversampling_factor: 128,
            interpolation: SincInterpolationType::Linear,
            window: WindowFunction::BlackmanHarris2,
        },
        RESAMPLER_CHUNK_SIZE,
        channels,
    ) {
        Ok(resampler) => resampler,
        Err(err) => {
            log::warn!("Failed to create resampler: {err}");
            return audio.clone();
        }
    };

    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];
    let mut pos = 0;
    let total = audio.frames();

    while pos < total {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(total);
        let chunk: Vec<&[f32]> = audio.channel_data.iter().map(|c| &c[pos..end]).collect();
        let result = if end - pos == needed {
            resampler.process(&chunk, None)
        } else {
            resampler.process_partial(Some(&chunk), None)
        };
        match result {
            Ok(resampled) => push(resampled, &mut output),
            Err(err) => {
                log::warn!("Resampling failed: {err}");
                return audio.clone();
            }
        }
        pos = end;
    }
    // Flush until the delayed tail is out
    while output[0].len() < expected + delay {
        match resampler.process_partial(None::<&[Vec<f32>]>, None) {
            Ok(resampled) if !resampled[0].is_empty() => push(resampled, &mut output),
            _ => break,
        }
    }

    for channel in output.iter_mut() {
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected, 0.);
    }
    DecodedAudio::new(output, sample_rate)
}

fn push(resampled: Vec<Vec<f32>>, output: &mut [Vec<f32>]) {
    for (out, chunk) in output.iter_mut().zip(resampled) {
        out.extend(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(frequency: f32, sample_rate: u32, frames: usize) -> DecodedAudio {
        let samples: Vec<f32> = (0..frames)
            .map(|i| (2. * PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect();
        DecodedAudio::new(vec![samples.clone(), samples], sample_rate)
    }

    #[test]
    fn test_same_rate_is_untouched() {
        let audio = tone(440., 44100, 1000);
        assert_eq!(resample_to(&audio, 44100), audio);
    }

    #[test]
    fn test_output_length_and_duration() {
        let audio = tone(440., 48000, 48000);
        let resampled = resample_to(&audio, 44100);
        assert_eq!(resampled.sample_rate, 44100);
        assert_eq!(resampled.frames(), 44100);
        assert_eq!(resampled.channels(), 2);
        assert!((resampled.duration - audio.duration).abs() < 1e-9);
    }

    #[test]
    fn test_ragged_input_uses_shortest_channel() {
        let audio = DecodedAudio {
            channel_data: vec![vec![0.25; 4800], vec![0.25; 2400]],
            sample_rate: 48000,
            duration: 0.1,
        };
        let resampled = resample_to(&audio, 44100);
        assert_eq!(resampled.frames(), 2205);
        assert_eq!(resampled.channel_data[0].len(), 2205);
    }

    #[test]
    fn test_signal_is_preserved() {
        let audio = tone(440., 22050, 22050);
        let resampled = resample_to(&audio, 44100);
        assert_eq!(resampled.frames(), 44100);
        // Away from the edges the tone keeps its amplitude
        let peak = resampled.channel_data[0][10_000..30_000]
            .iter()
            .fold(0., |m: f32, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.02);
    }
}
