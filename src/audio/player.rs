use crate::{
    audio::{
        context::{LiveContext, RenderContext},
        engine::Mixer,
        graph::MixManifest,
    },
    cache::SourceCache,
    core::{clip::AudioClip, fx::MasterConfig},
};
use crossbeam::channel::Sender;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    /// The playhead moved while playing. Voices are gone until the next
    /// `play`.
    Seeking,
}

/// Sent by the engine to whoever displays the transport
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    Tick(f64),
    Started(f64),
    Stopped(f64),
}

/// Live playback of the audio clips of a timeline.
///
/// Pulled by the output: every [`PlaybackEngine::render`] call produces one
/// block and moves the live context forward, playing or not.
pub struct PlaybackEngine {
    context: LiveContext,
    mixer: Mixer,
    state: TransportState,
    playhead: f64,
    /// Clip ids of the last schedule, in order
    scheduled: Vec<String>,
    events: Option<Sender<PlaybackEvent>>,
}

impl PlaybackEngine {
    pub fn new(sample_rate: u32, master: &MasterConfig) -> Self {
        Self {
            context: LiveContext::new(sample_rate),
            mixer: Mixer::new(sample_rate, master),
            state: TransportState::Stopped,
            playhead: 0.,
            scheduled: Vec::new(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Sender<PlaybackEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.context.sample_rate()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Transport time in seconds
    pub fn current_time(&self) -> f64 {
        match self.state {
            TransportState::Playing => self.context.current_time(),
            _ => self.playhead,
        }
    }

    /// Start playing from the playhead. Ignored while already playing.
    pub fn play(&mut self, clips: &[AudioClip], sources: &SourceCache) {
        if self.state == TransportState::Playing {
            log::debug!("Play requested while playing, ignoring");
            return;
        }
        self.context.anchor(self.playhead);
        self.schedule(clips, sources);
        self.state = TransportState::Playing;
        log::info!(
            "Playback started at {:.3}s with {} voices",
            self.playhead,
            self.mixer.voices().len()
        );
        self.send(PlaybackEvent::Started(self.playhead));
    }

    /// Stop and drop every voice. The playhead stays where playback was.
    pub fn pause(&mut self) {
        match self.state {
            TransportState::Stopped => {
                log::debug!("Pause requested while stopped, ignoring");
                return;
            }
            TransportState::Playing => self.playhead = self.context.current_time(),
            TransportState::Seeking => {}
        }
        self.mixer.clear();
        self.scheduled.clear();
        self.state = TransportState::Stopped;
        log::info!("Playback stopped at {:.3}s", self.playhead);
        self.send(PlaybackEvent::Stopped(self.playhead));
    }

    pub fn seek(&mut self, time: f64) {
        self.playhead = if time.is_finite() { time.max(0.) } else { 0. };
        if self.state == TransportState::Playing {
            self.mixer.clear();
            self.scheduled.clear();
            self.state = TransportState::Seeking;
        }
        log::debug!("Seek to {:.3}s", self.playhead);
    }

    /// Follow timeline edits while playing.
    ///
    /// A different set of clips reschedules everything. Otherwise only the
    /// clips whose timing or effects changed get a new voice. Returns the
    /// number of rebuilt voices.
    pub fn sync(&mut self, clips: &[AudioClip], sources: &SourceCache) -> usize {
        if self.state != TransportState::Playing {
            return 0;
        }
        let same_clips = clips.len() == self.scheduled.len()
            && clips.iter().zip(&self.scheduled).all(|(c, id)| c.id == *id);
        if same_clips {
            self.mixer.sync(clips, sources, &self.context).1
        } else {
            log::debug!("Clip set changed, rescheduling every voice");
            self.schedule(clips, sources)
        }
    }

    pub fn set_master(&mut self, master: &MasterConfig) {
        self.mixer.set_master(master);
    }

    /// Render one interleaved stereo block
    pub fn render(&mut self, out: &mut [f32]) {
        let frames = out.len() / 2;
        if self.state == TransportState::Playing {
            self.mixer.render(self.context.current_frame(), out);
        } else {
            out.fill(0.);
        }
        self.context.advance(frames);
        if self.state == TransportState::Playing {
            self.send(PlaybackEvent::Tick(self.context.current_time()));
        }
    }

    /// Stage lists of the active voices
    pub fn graph_manifest(&self) -> MixManifest {
        self.mixer.manifest()
    }

    fn schedule(&mut self, clips: &[AudioClip], sources: &SourceCache) -> usize {
        self.scheduled = clips.iter().map(|c| c.id.clone()).collect();
        self.mixer.schedule(clips, sources, &self.context)
    }

    fn send(&self, event: PlaybackEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
