use crate::{
    analysis::{MemoryAssetFetcher, SymphoniaDecoder},
    audio::export::encode_wav,
    cache::{LoadEvent, SourceCache, SourceLoader},
};
use std::{sync::Arc, time::Duration};

const TIMEOUT: Duration = Duration::from_secs(10);

fn setup_loader(sample_rate: u32) -> (SourceLoader, Arc<MemoryAssetFetcher>) {
    let fetcher = Arc::new(MemoryAssetFetcher::new());
    let interleaved: Vec<f32> = (0..22050).flat_map(|i| [(i % 50) as f32 / 100., 0.25]).collect();
    fetcher.insert("tone.wav", encode_wav(&interleaved, 2, 22050).unwrap());
    fetcher.insert("broken.wav", b"not audio at all".to_vec());
    let loader = SourceLoader::new(
        fetcher.clone(),
        Arc::new(SymphoniaDecoder),
        SourceCache::new(),
        sample_rate,
        100,
    );
    (loader, fetcher)
}

#[test]
fn test_load_resamples_and_analyses() {
    let (mut loader, _) = setup_loader(44100);
    assert!(loader.request("tone.wav"));
    assert!(!loader.request("tone.wav"));
    assert!(loader.is_pending("tone.wav"));

    let events = loader.wait(TIMEOUT, |_| true);
    assert_eq!(events, vec![LoadEvent::Ready("tone.wav".to_string())]);

    let source = loader.cache().get("tone.wav").unwrap();
    assert_eq!(source.audio.sample_rate, 44100);
    assert_eq!(source.audio.frames(), 44100);
    assert!((source.duration() - 1.).abs() < 1e-6);
    assert_eq!(source.waveform.len(), 100);
    assert!((source.peak - 0.49).abs() < 1e-3);

    // Cached sources are not loaded again
    assert!(!loader.request("tone.wav"));
}

#[test]
fn test_failed_load_is_not_retried() {
    let (mut loader, _) = setup_loader(22050);
    loader.request("broken.wav");
    loader.request("missing.wav");
    let mut events = loader.wait(TIMEOUT, |_| true);
    events.sort_by_key(|e| format!("{e:?}"));
    assert_eq!(
        events,
        vec![
            LoadEvent::Failed("broken.wav".to_string()),
            LoadEvent::Failed("missing.wav".to_string()),
        ]
    );
    assert!(loader.cache().is_empty());
    assert!(!loader.request("broken.wav"));
    assert!(loader.retry("broken.wav"));
}

#[test]
fn test_unwanted_result_is_discarded() {
    let (mut loader, _) = setup_loader(22050);
    loader.request("tone.wav");
    let events = loader.wait(TIMEOUT, |id| id != "tone.wav");
    assert_eq!(events, vec![LoadEvent::Discarded("tone.wav".to_string())]);
    assert!(!loader.cache().contains("tone.wav"));
}

#[test]
fn test_cancelled_load_never_lands() {
    let (mut loader, _) = setup_loader(22050);
    loader.request("tone.wav");
    loader.cancel("tone.wav");
    assert_eq!(loader.pending_count(), 0);

    std::thread::sleep(Duration::from_millis(500));
    let events = loader.poll(|_| true);
    assert!(events.iter().all(|e| *e == LoadEvent::Discarded("tone.wav".to_string())));
    assert!(!loader.cache().contains("tone.wav"));
}

#[test]
fn test_cache_retain() {
    let (mut loader, _) = setup_loader(22050);
    loader.request("tone.wav");
    loader.wait(TIMEOUT, |_| true);
    let cache = loader.cache().clone();
    assert_eq!(cache.len(), 1);
    cache.retain(|id| id != "tone.wav");
    assert!(loader.cache().is_empty());
}
