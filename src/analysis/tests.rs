use crate::analysis::{
    AssetFetcher, DecodedAudio, FileAssetFetcher, MediaDecoder, MemoryAssetFetcher,
    SymphoniaDecoder,
};
use crate::error::FetchError;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

fn wav(frames: &[(i16, i16)], sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for (l, r) in frames {
            writer.write_sample(*l).unwrap();
            writer.write_sample(*r).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn test_decode_wav() {
    let frames: Vec<(i16, i16)> = (0..4410).map(|i| ((i % 100) as i16 * 100, -16384)).collect();
    let decoded = SymphoniaDecoder.decode(&wav(&frames, 44100)).unwrap();

    assert_eq!(decoded.sample_rate, 44100);
    assert_eq!(decoded.channels(), 2);
    assert_eq!(decoded.frames(), 4410);
    assert!((decoded.duration - 0.1).abs() < 1e-9);
    assert_eq!(decoded.channel_data[1][0], -0.5);
    assert!((decoded.channel_data[0][1] - 100. / 32768.).abs() < 1e-6);
}

#[test]
fn test_decode_garbage_fails() {
    let result = SymphoniaDecoder.decode(b"definitely not audio");
    assert!(result.is_err());
}

#[test]
fn test_decode_empty_wav() {
    let result = SymphoniaDecoder.decode(&wav(&[], 8000));
    assert!(result.is_err());
}

#[test]
fn test_peak_over_all_channels() {
    let audio = DecodedAudio::new(vec![vec![0.1, -0.2], vec![0.05, -0.7]], 100);
    assert_eq!(audio.peak(), 0.7);
    assert_eq!(audio.duration, 0.02);

    let silent = DecodedAudio::new(vec![vec![0.; 10]], 100);
    assert_eq!(silent.peak(), 0.);
}

#[test]
fn test_file_fetcher() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("voice.wav"), b"abc").unwrap();
    let fetcher = FileAssetFetcher::new(dir.path());

    assert_eq!(fetcher.fetch("voice.wav").unwrap(), b"abc");
    assert!(matches!(fetcher.fetch("missing.wav"), Err(FetchError::NotFound(_))));
    assert!(matches!(fetcher.fetch("../voice.wav"), Err(FetchError::NotFound(_))));
}

#[test]
fn test_memory_fetcher() {
    let fetcher = MemoryAssetFetcher::new();
    fetcher.insert("a", vec![1, 2, 3]);
    assert_eq!(fetcher.fetch("a").unwrap(), vec![1, 2, 3]);
    assert!(fetcher.fetch("b").is_err());
}

#[test]
fn test_ragged_channels_are_cut_to_shortest() {
    let audio = DecodedAudio::new(vec![vec![0.1; 10], vec![0.2; 6]], 100);
    assert_eq!(audio.frames(), 6);
    assert_eq!(audio.channel_data[0].len(), 6);
    assert_eq!(audio.duration, 0.06);
}
