use crate::{
    analysis::{AssetFetcher, DecodedAudio, MediaDecoder, beats::detect_beats},
    audio::resample::resample_to,
    error::LoadError,
    waveform::extract_peaks,
};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use dashmap::DashMap;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

/// A decoded source ready for playback, at the engine sample rate
#[derive(Debug)]
pub struct LoadedSource {
    pub source_id: String,
    pub audio: DecodedAudio,
    /// Largest absolute sample over all channels
    pub peak: f32,
    pub waveform: Vec<f32>,
    /// Detected beat times in seconds
    pub beats: Vec<f64>,
}

impl LoadedSource {
    /// Build from decoded samples: resample, then analyse.
    pub fn prepare(
        source_id: impl Into<String>,
        decoded: &DecodedAudio,
        sample_rate: u32,
        waveform_peaks: usize,
    ) -> Self {
        let first = decoded.channel_data.first().map(Vec::as_slice).unwrap_or(&[]);
        let waveform = extract_peaks(first, waveform_peaks);
        let beats = detect_beats(first, decoded.sample_rate);
        let peak = decoded.peak();
        Self {
            source_id: source_id.into(),
            audio: resample_to(decoded, sample_rate),
            peak,
            waveform,
            beats,
        }
    }

    pub fn duration(&self) -> f64 {
        self.audio.duration
    }
}

/// Decoded sources shared between the controller, loader threads and
/// background exports
#[derive(Clone, Default)]
pub struct SourceCache {
    inner: Arc<DashMap<String, Arc<LoadedSource>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source_id: &str) -> Option<Arc<LoadedSource>> {
        self.inner.get(source_id).map(|s| s.value().clone())
    }

    pub fn insert(&self, source: LoadedSource) -> Arc<LoadedSource> {
        let source = Arc::new(source);
        self.inner.insert(source.source_id.clone(), source.clone());
        source
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.inner.contains_key(source_id)
    }

    pub fn remove(&self, source_id: &str) {
        self.inner.remove(source_id);
    }

    /// Drop every source for which `keep` returns false
    pub fn retain(&self, keep: impl Fn(&str) -> bool) {
        self.inner.retain(|id, _| keep(id));
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Result of a finished load, as reported by [`SourceLoader::poll`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Ready(String),
    Failed(String),
    /// The result arrived after the request was cancelled or superseded
    Discarded(String),
}

struct LoadOutcome {
    source_id: String,
    generation: u64,
    result: Result<LoadedSource, LoadError>,
}

/// Fetches and decodes sources off the caller's thread.
///
/// Results are only applied by [`SourceLoader::poll`], on the caller's
/// thread, and only when the request is still current.
pub struct SourceLoader {
    fetcher: Arc<dyn AssetFetcher>,
    decoder: Arc<dyn MediaDecoder>,
    cache: SourceCache,
    sample_rate: u32,
    waveform_peaks: usize,
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    pending: HashMap<String, u64>,
    failed: HashSet<String>,
    next_generation: u64,
}

impl SourceLoader {
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        decoder: Arc<dyn MediaDecoder>,
        cache: SourceCache,
        sample_rate: u32,
        waveform_peaks: usize,
    ) -> Self {
        let (tx, rx) = unbounded();
        Self {
            fetcher,
            decoder,
            cache,
            sample_rate,
            waveform_peaks,
            tx,
            rx,
            pending: HashMap::new(),
            failed: HashSet::new(),
            next_generation: 0,
        }
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Start loading `source_id` unless it is cached, loading or failed.
    /// Returns whether a load was started.
    pub fn request(&mut self, source_id: &str) -> bool {
        if self.cache.contains(source_id)
            || self.pending.contains_key(source_id)
            || self.failed.contains(source_id)
        {
            return false;
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        self.pending.insert(source_id.to_string(), generation);

        let fetcher = self.fetcher.clone();
        let decoder = self.decoder.clone();
        let tx = self.tx.clone();
        let source_id = source_id.to_string();
        let sample_rate = self.sample_rate;
        let waveform_peaks = self.waveform_peaks;

        std::thread::spawn(move || {
            let start = Instant::now();
            let result = fetcher
                .fetch(&source_id)
                .map_err(LoadError::from)
                .and_then(|bytes| decoder.decode(&bytes).map_err(LoadError::from))
                .map(|decoded| {
                    LoadedSource::prepare(source_id.clone(), &decoded, sample_rate, waveform_peaks)
                });
            log::debug!("Loaded {} in {:?}", source_id, start.elapsed());
            let _ = tx.send(LoadOutcome {
                source_id,
                generation,
                result,
            });
        });
        true
    }

    /// Forget about a running load. Its result will be discarded.
    pub fn cancel(&mut self, source_id: &str) {
        self.pending.remove(source_id);
    }

    /// Allow a failed source to be requested again
    pub fn retry(&mut self, source_id: &str) -> bool {
        self.failed.remove(source_id);
        self.request(source_id)
    }

    pub fn is_pending(&self, source_id: &str) -> bool {
        self.pending.contains_key(source_id)
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.keys().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Apply finished loads without blocking. `wanted` is asked once more
    /// before a result is stored.
    pub fn poll(&mut self, wanted: impl Fn(&str) -> bool) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            events.push(self.apply(outcome, &wanted));
        }
        events
    }

    /// Block until every pending load finished or `timeout` elapsed.
    pub fn wait(&mut self, timeout: Duration, wanted: impl Fn(&str) -> bool) -> Vec<LoadEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => events.push(self.apply(outcome, &wanted)),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        events.extend(self.poll(&wanted));
        events
    }

    fn apply(&mut self, outcome: LoadOutcome, wanted: &impl Fn(&str) -> bool) -> LoadEvent {
        let LoadOutcome {
            source_id,
            generation,
            result,
        } = outcome;

        if self.pending.get(&source_id) != Some(&generation) {
            log::debug!("Discarding stale load of {source_id}");
            return LoadEvent::Discarded(source_id);
        }
        self.pending.remove(&source_id);

        if !wanted(&source_id) {
            log::debug!("Discarding load of {source_id}, no clip references it");
            return LoadEvent::Discarded(source_id);
        }
        match result {
            Ok(source) => {
                self.cache.insert(source);
                LoadEvent::Ready(source_id)
            }
            Err(err) => {
                log::warn!("Failed to load {source_id}: {err}");
                self.failed.insert(source_id.clone());
                LoadEvent::Failed(source_id)
            }
        }
    }
}

#[cfg(test)]
mod tests;
