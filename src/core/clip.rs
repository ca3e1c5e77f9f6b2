use crate::core::{fx::AudioFxState, interval::TimelineClip};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A clip representing a window of an audio source placed on the timeline
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioClip {
    pub id: String,
    /// Reference handed to the asset fetcher
    pub source_id: String,
    #[serde(default)]
    pub source_name: String,
    /// Position on the timeline in seconds
    pub start_time: f64,
    pub duration: f64,
    /// Seconds skipped at the beginning of the source
    #[serde(default)]
    pub offset_in_source: f64,
    pub source_duration: f64,
    #[serde(default)]
    pub fx: AudioFxState,
}

impl AudioClip {
    /// Clip covering the whole source, starting at `start_time`
    pub fn new(source_id: impl Into<String>, source_duration: f64, start_time: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().into(),
            source_id: source_id.into(),
            source_name: String::new(),
            start_time: start_time.max(0.),
            duration: source_duration,
            offset_in_source: 0.,
            source_duration,
            fx: AudioFxState::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_fx(mut self, fx: AudioFxState) -> Self {
        self.fx = fx;
        self
    }

    /// Whether timing or effects differ, ignoring the id and name.
    pub fn render_differs(&self, other: &AudioClip) -> bool {
        self.source_id != other.source_id
            || self.start_time != other.start_time
            || self.duration != other.duration
            || self.offset_in_source != other.offset_in_source
            || self.fx != other.fx
    }
}

impl TimelineClip for AudioClip {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn start(&self) -> f64 {
        self.start_time
    }
    fn duration(&self) -> f64 {
        self.duration
    }
    fn set_range(&mut self, start: f64, duration: f64) {
        self.start_time = start;
        self.duration = duration;
    }
    fn source_window(&self) -> Option<(f64, f64)> {
        Some((self.offset_in_source, self.source_duration))
    }
    fn set_source_offset(&mut self, offset: f64) {
        self.offset_in_source = offset;
    }
}

impl Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("id", &self.id)
            .field("source", &self.source_id)
            .field("start_time", &self.start_time)
            .field("duration", &self.duration)
            .field("offset_in_source", &self.offset_in_source)
            .finish()
    }
}
