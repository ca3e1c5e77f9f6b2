use crate::analysis::MediaDecoder;

/// Peak count used when the caller has no preference
pub const DEFAULT_PEAK_COUNT: usize = 800;

/// Downsample `samples` into at most `target` block peaks in [0, 1].
///
/// Each block keeps its largest absolute sample, then every peak is divided
/// by the global maximum. A silent input stays all zeros.
pub fn extract_peaks(samples: &[f32], target: usize) -> Vec<f32> {
    if samples.is_empty() || target == 0 {
        return Vec::new();
    }
    let block_size = (samples.len() / target).max(1);

    let mut peaks: Vec<f32> = samples
        .chunks(block_size)
        .take(target)
        .map(|block| block.iter().fold(0., |peak: f32, s| peak.max(s.abs())))
        .collect();

    let max = peaks.iter().copied().fold(0., f32::max);
    if max > 0. && max.is_finite() {
        for peak in peaks.iter_mut() {
            *peak /= max;
        }
    }
    peaks
}

/// Peaks of the first channel of an encoded source. Decode failures yield
/// an empty waveform.
pub fn peaks_from_bytes(decoder: &dyn MediaDecoder, bytes: &[u8], target: usize) -> Vec<f32> {
    match decoder.decode(bytes) {
        Ok(decoded) => decoded
            .channel_data
            .first()
            .map(|samples| extract_peaks(samples, target))
            .unwrap_or_default(),
        Err(err) => {
            log::warn!("Waveform unavailable: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SymphoniaDecoder;

    #[test]
    fn test_peaks_bounded() {
        let samples: Vec<f32> = (0..10_007).map(|i| ((i as f32) * 0.01).sin() * 0.3).collect();
        for target in [1, 7, 700, 800, 20_000] {
            let peaks = extract_peaks(&samples, target);
            assert!(peaks.len() <= target);
            assert!(!peaks.is_empty());
            assert!(peaks.iter().all(|p| (0. ..=1.).contains(p)));
        }
    }

    #[test]
    fn test_peaks_normalized() {
        let samples = [0.1, -0.2, 0.05, 0.4, -0.1, 0.1];
        let peaks = extract_peaks(&samples, 3);
        assert_eq!(peaks, vec![0.5, 1., 0.25]);
    }

    #[test]
    fn test_silence_stays_zero() {
        let peaks = extract_peaks(&[0.; 100], 10);
        assert_eq!(peaks, vec![0.; 10]);
        assert!(extract_peaks(&[], 10).is_empty());
    }

    #[test]
    fn test_decode_failure_is_empty() {
        assert!(peaks_from_bytes(&SymphoniaDecoder, b"garbage", 800).is_empty());
    }
}
