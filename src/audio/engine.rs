use crate::{
    analysis::DecodedAudio,
    audio::{
        chain::{MasterChain, ProcessingChain, seed_for},
        context::RenderContext,
        dsp::Frame,
        graph::{EffectsGraph, GraphInput, MasterGraph, MixManifest, build_graph, build_master_graph},
        resample::resample_to,
    },
    cache::{LoadedSource, SourceCache},
    core::{clip::AudioClip, fx::MasterConfig, interval::TimelineClip},
};
use std::{collections::HashMap, sync::Arc};

/// One scheduled clip: its samples, where they land and the chain they
/// go through.
///
/// Every bound is an absolute frame taken from the render context. Frame
/// `source_origin` holds source frame 0, so the halves of a split clip read
/// the same source frames and meet without a gap.
pub struct Voice {
    clip: AudioClip,
    source: Arc<LoadedSource>,
    /// Set when the source is cached at another rate than the mixer's
    resampled: Option<DecodedAudio>,
    start_frame: i64,
    end_frame: i64,
    source_origin: i64,
    graph: EffectsGraph,
    chain: ProcessingChain,
}

impl Voice {
    pub fn new(
        clip: &AudioClip,
        source: Arc<LoadedSource>,
        context: &dyn RenderContext,
        sample_rate: u32,
    ) -> Self {
        let graph = build_graph(&GraphInput {
            fx: &clip.fx,
            duration: clip.duration,
            source_peak: source.peak,
        });
        let chain = ProcessingChain::new(&graph, sample_rate, seed_for(&clip.id));
        let resampled = (source.audio.sample_rate != sample_rate)
            .then(|| resample_to(&source.audio, sample_rate));
        Self {
            clip: clip.clone(),
            source,
            resampled,
            start_frame: context.clip_start_frame(clip.start_time),
            end_frame: context.clip_start_frame(clip.end()),
            source_origin: context.clip_start_frame(clip.start_time - clip.offset_in_source),
            graph,
            chain,
        }
    }

    pub fn clip(&self) -> &AudioClip {
        &self.clip
    }

    pub fn graph(&self) -> &EffectsGraph {
        &self.graph
    }

    pub fn start_frame(&self) -> i64 {
        self.start_frame
    }

    fn render(&mut self, frame: i64, sample_rate: u32) -> Frame {
        if frame < self.start_frame || frame >= self.end_frame {
            return [0., 0.];
        }
        let audio = self.resampled.as_ref().unwrap_or(&self.source.audio);
        let channels = &audio.channel_data;
        let sample = |channel: usize| {
            usize::try_from(frame - self.source_origin)
                .ok()
                .and_then(|index| channels.get(channel)?.get(index).copied())
        };
        let left = sample(0).unwrap_or(0.);
        // Mono sources feed both sides
        let right = sample(1).unwrap_or(left);
        // Rounding the bounds can stretch the clip by a frame, the envelope
        // stays within its duration
        let last = (self.clip.duration - 1. / sample_rate as f64).max(0.);
        let time = ((frame - self.start_frame) as f64 / sample_rate as f64).min(last);
        self.chain.process([left, right], time)
    }
}

/// Sums voices into the master bus.
///
/// Used as is by live playback and offline export: both schedule through
/// [`Mixer::sync`] with their own [`RenderContext`] and pull frames with
/// [`Mixer::render`].
pub struct Mixer {
    sample_rate: u32,
    voices: Vec<Voice>,
    master_graph: MasterGraph,
    master: MasterChain,
}

impl Mixer {
    pub fn new(sample_rate: u32, master: &MasterConfig) -> Self {
        let master_graph = build_master_graph(master);
        Self {
            sample_rate,
            master: MasterChain::new(&master_graph, sample_rate),
            master_graph,
            voices: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_master(&mut self, master: &MasterConfig) {
        let graph = build_master_graph(master);
        if graph != self.master_graph {
            self.master = MasterChain::new(&graph, self.sample_rate);
            self.master_graph = graph;
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }

    /// Schedule every clip from scratch. Returns the number of voices.
    pub fn schedule(
        &mut self,
        clips: &[AudioClip],
        sources: &SourceCache,
        context: &dyn RenderContext,
    ) -> usize {
        self.voices.clear();
        self.sync(clips, sources, context).0
    }

    /// Bring the voices in line with `clips`.
    ///
    /// A voice is kept, processor state included, when its clip renders the
    /// same and lands on the same frame. Everything else is rebuilt. Clips
    /// that already ended or whose source is not decoded get no voice.
    /// Returns `(voices, rebuilt)`.
    pub fn sync(
        &mut self,
        clips: &[AudioClip],
        sources: &SourceCache,
        context: &dyn RenderContext,
    ) -> (usize, usize) {
        let now = context.current_time();
        let mut previous: HashMap<String, Voice> = self
            .voices
            .drain(..)
            .map(|voice| (voice.clip.id.clone(), voice))
            .collect();
        let mut rebuilt = 0;

        for clip in clips {
            if clip.end() <= now {
                continue;
            }
            let Some(source) = sources.get(&clip.source_id) else {
                log::debug!("No decoded buffer for {}, skipping", clip.id);
                continue;
            };
            let start_frame = context.clip_start_frame(clip.start_time);
            match previous.remove(&clip.id) {
                Some(voice)
                    if !voice.clip.render_differs(clip)
                        && voice.start_frame == start_frame
                        && Arc::ptr_eq(&voice.source, &source) =>
                {
                    self.voices.push(voice)
                }
                _ => {
                    rebuilt += 1;
                    self.voices
                        .push(Voice::new(clip, source, context, self.sample_rate));
                }
            }
        }
        (self.voices.len(), rebuilt)
    }

    /// Render interleaved stereo frames starting at absolute frame `from`
    pub fn render(&mut self, from: i64, out: &mut [f32]) {
        let sample_rate = self.sample_rate;
        for (i, frame) in out.chunks_exact_mut(2).enumerate() {
            let position = from + i as i64;
            let mut mix = [0f32; 2];
            for voice in self.voices.iter_mut() {
                let [l, r] = voice.render(position, sample_rate);
                mix[0] += l;
                mix[1] += r;
            }
            let [l, r] = self.master.process(mix);
            frame[0] = l;
            frame[1] = r;
        }
    }

    /// Stage lists of the scheduled clips, in scheduling order
    pub fn manifest(&self) -> MixManifest {
        MixManifest {
            clips: self
                .voices
                .iter()
                .map(|voice| (voice.clip.id.clone(), voice.graph.clone()))
                .collect(),
            master: self.master_graph.clone(),
        }
    }
}
