use crate::core::interval::TimelineClip;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length of a freshly created visual clip, in seconds
pub const DEFAULT_VISUAL_CLIP_LENGTH: f64 = 10.;

/// Time range during which a sticker is shown on the canvas
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerClip {
    pub id: String,
    /// Canvas element the clip drives
    pub element_id: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub hidden: bool,
    /// Fade in window in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_duration: Option<f64>,
    /// Fade out window in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_duration: Option<f64>,
}

impl StickerClip {
    pub fn new(element_id: impl Into<String>, start_time: f64) -> Self {
        let start_time = start_time.max(0.);
        Self {
            id: uuid::Uuid::new_v4().into(),
            element_id: element_id.into(),
            start_time,
            end_time: start_time + DEFAULT_VISUAL_CLIP_LENGTH,
            hidden: false,
            in_duration: None,
            out_duration: None,
        }
    }

    /// Whether the clip shows its element at `time`. Both edges are inclusive.
    pub fn covers(&self, time: f64) -> bool {
        !self.hidden && time >= self.start_time && time <= self.end_time
    }

    /// Opacity in [0, 1] with the enter and exit animations applied.
    pub fn opacity_at(&self, time: f64) -> f32 {
        if !self.covers(time) {
            return 0.;
        }
        let relative = time - self.start_time;
        if let Some(enter) = self.in_duration.filter(|d| *d > 0.)
            && relative < enter
        {
            return (relative / enter) as f32;
        }
        if let Some(exit) = self.out_duration.filter(|d| *d > 0.) {
            let before_end = self.end_time - time;
            if before_end < exit {
                return (before_end / exit) as f32;
            }
        }
        1.
    }
}

impl TimelineClip for StickerClip {
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
        self.end_time - self.start_time
    }
    fn set_range(&mut self, start: f64, duration: f64) {
        self.start_time = start;
        self.end_time = start + duration;
    }
}

/// Time range during which a text layer is shown
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextClip {
    pub id: String,
    pub element_id: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl TextClip {
    pub fn new(element_id: impl Into<String>, start_time: f64) -> Self {
        let start_time = start_time.max(0.);
        Self {
            id: uuid::Uuid::new_v4().into(),
            element_id: element_id.into(),
            start_time,
            end_time: start_time + DEFAULT_VISUAL_CLIP_LENGTH,
        }
    }
}

impl TimelineClip for TextClip {
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
        self.end_time - self.start_time
    }
    fn set_range(&mut self, start: f64, duration: f64) {
        self.start_time = start;
        self.end_time = start + duration;
    }
}

/// Per element row state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementTrackState {
    pub collapsed: bool,
    pub locked: bool,
    pub hidden: bool,
}

/// Whether `element_id` is shown at `time` by any of `clips`.
pub fn element_visible_at(
    element_id: &str,
    time: f64,
    clips: &[StickerClip],
    track: Option<&ElementTrackState>,
) -> bool {
    if track.is_some_and(|t| t.hidden) {
        return false;
    }
    clips
        .iter()
        .any(|c| c.element_id == element_id && c.covers(time))
}

/// Opacity of `element_id` at `time`, taken from the first clip covering it.
pub fn element_opacity_at(element_id: &str, time: f64, clips: &[StickerClip]) -> f32 {
    clips
        .iter()
        .find(|c| c.element_id == element_id && c.covers(time))
        .map_or(0., |c| c.opacity_at(time))
}

pub fn group_by_element(clips: &[StickerClip]) -> BTreeMap<String, Vec<StickerClip>> {
    let mut grouped: BTreeMap<String, Vec<StickerClip>> = BTreeMap::new();
    for clip in clips {
        grouped
            .entry(clip.element_id.clone())
            .or_default()
            .push(clip.clone());
    }
    grouped
}
