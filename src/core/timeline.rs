use crate::core::{
    clip::AudioClip,
    fx::MasterConfig,
    interval::{self, TimelineClip},
    sticker::{StickerClip, TextClip},
};
use serde::{Deserialize, Serialize};

/// Default horizontal scale of the timeline view
pub const DEFAULT_PIXELS_PER_SECOND: f64 = 100.;
const MIN_PIXELS_PER_SECOND: f64 = 5.;
const MAX_PIXELS_PER_SECOND: f64 = 2000.;

/// Which track kind an operation addresses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Sticker,
    Text,
}

/// Complete timeline value.
///
/// Never mutated once published: the controller builds a new value and
/// swaps the shared pointer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeline {
    pub audio_clips: Vec<AudioClip>,
    pub sticker_clips: Vec<StickerClip>,
    pub text_clips: Vec<TextClip>,
    pub current_time: f64,
    pub is_playing: bool,
    /// View scale only, never affects timing
    pub pixels_per_second: f64,
    /// Length of the visual animation, provided by the canvas
    pub animation_max_duration: f64,
    /// Padding floor for the project duration
    pub min_duration: f64,
    pub master: MasterConfig,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            audio_clips: Vec::new(),
            sticker_clips: Vec::new(),
            text_clips: Vec::new(),
            current_time: 0.,
            is_playing: false,
            pixels_per_second: DEFAULT_PIXELS_PER_SECOND,
            animation_max_duration: 0.,
            min_duration: 3.,
            master: MasterConfig::default(),
        }
    }
}

impl Timeline {
    /// End of the latest clip on any track
    pub fn latest_clip_end(&self) -> f64 {
        let audio = self.audio_clips.iter().map(|c| c.end());
        let stickers = self.sticker_clips.iter().map(|c| c.end());
        let texts = self.text_clips.iter().map(|c| c.end());
        audio.chain(stickers).chain(texts).fold(0., f64::max)
    }

    /// `max(latest clip end, animation duration, minimum duration)`
    pub fn project_duration(&self) -> f64 {
        self.latest_clip_end()
            .max(self.animation_max_duration)
            .max(self.min_duration)
    }

    pub fn audio_clip(&self, id: &str) -> Option<&AudioClip> {
        self.audio_clips.iter().find(|c| c.id == id)
    }

    /// Kind of track holding the clip `id`
    pub fn kind_of(&self, id: &str) -> Option<TrackKind> {
        if self.audio_clips.iter().any(|c| c.id == id) {
            Some(TrackKind::Audio)
        } else if self.sticker_clips.iter().any(|c| c.id == id) {
            Some(TrackKind::Sticker)
        } else if self.text_clips.iter().any(|c| c.id == id) {
            Some(TrackKind::Text)
        } else {
            None
        }
    }

    /// Start and end of every clip on every track, except `exclude_id`.
    pub fn edges(&self, exclude_id: Option<&str>) -> Vec<f64> {
        let mut edges = crate::core::interval::all_edges(&self.audio_clips, exclude_id);
        edges.extend(crate::core::interval::all_edges(&self.sticker_clips, exclude_id));
        edges.extend(crate::core::interval::all_edges(&self.text_clips, exclude_id));
        edges
    }

    /// Convert a time to an x offset in the view
    pub fn time_to_x(&self, time: f64) -> f64 {
        time * self.pixels_per_second
    }

    /// Convert an x offset in the view to a time, never negative
    pub fn x_to_time(&self, x: f64) -> f64 {
        (x / self.pixels_per_second).max(0.)
    }

    /// Copy with a new view scale. Clip timing is untouched.
    pub fn with_zoom(&self, pixels_per_second: f64) -> Self {
        let mut zoomed = self.clone();
        zoomed.pixels_per_second = pixels_per_second.clamp(MIN_PIXELS_PER_SECOND, MAX_PIXELS_PER_SECOND);
        zoomed
    }

    /// Copy with `edit` applied to the clip `id`, whatever its track.
    /// Returns `None` if no clip has this id.
    pub fn with_clip_edit(&self, id: &str, edit: ClipEdit) -> Option<Self> {
        let mut next = self.clone();
        match self.kind_of(id)? {
            TrackKind::Audio => next.audio_clips = edit_in(&self.audio_clips, id, edit)?,
            TrackKind::Sticker => next.sticker_clips = edit_in(&self.sticker_clips, id, edit)?,
            TrackKind::Text => next.text_clips = edit_in(&self.text_clips, id, edit)?,
        }
        Some(next)
    }

    /// Copy with the clip `id` split at `time`. `None` when the split is invalid.
    pub fn with_split(&self, id: &str, time: f64) -> Option<Self> {
        let mut next = self.clone();
        match self.kind_of(id)? {
            TrackKind::Audio => next.audio_clips = split_in(&self.audio_clips, id, time)?,
            TrackKind::Sticker => next.sticker_clips = split_in(&self.sticker_clips, id, time)?,
            TrackKind::Text => next.text_clips = split_in(&self.text_clips, id, time)?,
        }
        Some(next)
    }

    /// Copy with every clip in `ids` shifted by `delta` on all tracks.
    /// The earliest selected clip stops at 0.
    pub fn with_moved(&self, ids: &[String], delta: f64) -> Self {
        let earliest = self
            .audio_clips
            .iter()
            .filter(|c| ids.contains(&c.id))
            .map(|c| c.start())
            .chain(self.sticker_clips.iter().filter(|c| ids.contains(&c.id)).map(|c| c.start()))
            .chain(self.text_clips.iter().filter(|c| ids.contains(&c.id)).map(|c| c.start()))
            .fold(f64::INFINITY, f64::min);
        if !earliest.is_finite() {
            return self.clone();
        }
        let delta = delta.max(-earliest);

        let mut next = self.clone();
        next.audio_clips = interval::move_multiple(&self.audio_clips, ids, delta);
        next.sticker_clips = interval::move_multiple(&self.sticker_clips, ids, delta);
        next.text_clips = interval::move_multiple(&self.text_clips, ids, delta);
        next
    }

    pub fn without(&self, ids: &[String]) -> Self {
        let mut next = self.clone();
        next.audio_clips = interval::delete_multiple(&self.audio_clips, ids);
        next.sticker_clips = interval::delete_multiple(&self.sticker_clips, ids);
        next.text_clips = interval::delete_multiple(&self.text_clips, ids);
        next
    }

    /// Copy with a duplicate of every clip in `ids`. Returns the new ids too.
    pub fn with_duplicates(&self, ids: &[String]) -> (Self, Vec<String>) {
        let mut next = self.clone();
        let mut created = Vec::new();
        for id in ids {
            match self.kind_of(id) {
                Some(TrackKind::Audio) => duplicate_in(&mut next.audio_clips, id, &mut created),
                Some(TrackKind::Sticker) => duplicate_in(&mut next.sticker_clips, id, &mut created),
                Some(TrackKind::Text) => duplicate_in(&mut next.text_clips, id, &mut created),
                None => {}
            }
        }
        (next, created)
    }
}

/// Single clip interval operation
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClipEdit {
    Move(f64),
    TrimStart(f64),
    TrimEnd(f64),
}

fn edit_in<C: TimelineClip>(clips: &[C], id: &str, edit: ClipEdit) -> Option<Vec<C>> {
    let clip = clips.iter().find(|c| c.id() == id)?;
    let edited = match edit {
        ClipEdit::Move(start) => interval::move_clip(clip, start),
        ClipEdit::TrimStart(start) => interval::trim_start(clip, start),
        ClipEdit::TrimEnd(end) => interval::trim_end(clip, end),
    };
    interval::replace_clip(clips, edited)
}

fn split_in<C: TimelineClip>(clips: &[C], id: &str, time: f64) -> Option<Vec<C>> {
    let index = clips.iter().position(|c| c.id() == id)?;
    let (first, second) = interval::split_clip(&clips[index], time)?;
    let mut next = clips.to_vec();
    next.splice(index..=index, [first, second]);
    Some(next)
}

fn duplicate_in<C: TimelineClip>(clips: &mut Vec<C>, id: &str, created: &mut Vec<String>) {
    if let Some(clip) = clips.iter().find(|c| c.id() == id) {
        let copy = interval::duplicate_clip(clip);
        created.push(copy.id().to_string());
        clips.push(copy);
    }
}
