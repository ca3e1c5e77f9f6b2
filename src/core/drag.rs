use crate::core::{
    interval::{SnapOptions, TimelineClip, snap_time},
    timeline::{ClipEdit, Timeline},
};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragKind {
    Move,
    TrimStart,
    TrimEnd,
}

/// Snapping applied while dragging
#[derive(Clone, Debug, Default)]
pub struct SnapSettings {
    pub enabled: bool,
    pub tolerance: f64,
    pub beats: Vec<f64>,
}

/// A pointer interaction on one clip.
///
/// Only exists between pointer down and pointer up. Every update is
/// computed from the timeline captured when the drag started, so the
/// intermediate previews never accumulate rounding.
#[derive(Clone, Debug)]
pub struct DragSession {
    pub kind: DragKind,
    pub clip_id: String,
    origin: Arc<Timeline>,
    pointer_origin: f64,
    clip_start: f64,
    clip_end: f64,
}

impl DragSession {
    /// Start dragging `clip_id`. `None` if the clip is not on the timeline.
    pub fn begin(
        origin: Arc<Timeline>,
        clip_id: &str,
        kind: DragKind,
        pointer_time: f64,
    ) -> Option<Self> {
        let (clip_start, clip_end) = clip_bounds(&origin, clip_id)?;
        Some(Self {
            kind,
            clip_id: clip_id.to_string(),
            origin,
            pointer_origin: pointer_time,
            clip_start,
            clip_end,
        })
    }

    /// Timeline when the drag started
    pub fn origin(&self) -> &Arc<Timeline> {
        &self.origin
    }

    /// Preview of the timeline with the pointer at `pointer_time`.
    pub fn update(&self, pointer_time: f64, snap: &SnapSettings) -> Timeline {
        let delta = pointer_time - self.pointer_origin;
        let edges = self.origin.edges(Some(&self.clip_id));
        let options = SnapOptions {
            edges: &edges,
            playhead: self.origin.current_time,
            tolerance: snap.tolerance,
            beats: &snap.beats,
        };
        let snapped = |raw: f64| {
            if snap.enabled { snap_time(raw, &options) } else { raw }
        };

        let edit = match self.kind {
            DragKind::Move => {
                let raw_start = self.clip_start + delta;
                let mut start = snapped(raw_start);
                if start == raw_start {
                    // Snap the trailing edge when the leading one found nothing
                    let duration = self.clip_end - self.clip_start;
                    start = snapped(raw_start + duration) - duration;
                }
                ClipEdit::Move(start)
            }
            DragKind::TrimStart => ClipEdit::TrimStart(snapped(self.clip_start + delta)),
            DragKind::TrimEnd => ClipEdit::TrimEnd(snapped(self.clip_end + delta)),
        };

        self.origin
            .with_clip_edit(&self.clip_id, edit)
            .unwrap_or_else(|| self.origin.as_ref().clone())
    }
}

fn clip_bounds(timeline: &Timeline, id: &str) -> Option<(f64, f64)> {
    if let Some(c) = timeline.audio_clips.iter().find(|c| c.id == id) {
        return Some((c.start(), c.end()));
    }
    if let Some(c) = timeline.sticker_clips.iter().find(|c| c.id == id) {
        return Some((c.start(), c.end()));
    }
    timeline
        .text_clips
        .iter()
        .find(|c| c.id == id)
        .map(|c| (c.start(), c.end()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{clip::AudioClip, sticker::StickerClip};

    fn timeline() -> Arc<Timeline> {
        let mut timeline = Timeline::default();
        let mut a = AudioClip::new("a", 4., 3.);
        a.id = "a".into();
        let mut b = AudioClip::new("b", 10., 10.);
        b.id = "b".into();
        b.duration = 2.;
        timeline.audio_clips = vec![a, b];
        let mut s = StickerClip::new("star", 20.);
        s.id = "s".into();
        timeline.sticker_clips = vec![s];
        Arc::new(timeline)
    }

    fn snap() -> SnapSettings {
        SnapSettings {
            enabled: true,
            tolerance: 0.1,
            beats: vec![],
        }
    }

    #[test]
    fn test_drag_start_snaps_to_edge() {
        let session = DragSession::begin(timeline(), "b", DragKind::Move, 10.).unwrap();
        // Pointer moves by -2.95: start lands on 7.05, the end of clip "a"
        let preview = session.update(7.05, &snap());
        assert_eq!(preview.audio_clip("b").unwrap().start_time, 7.);
    }

    #[test]
    fn test_drag_end_snaps_when_start_does_not() {
        let session = DragSession::begin(timeline(), "b", DragKind::Move, 10.).unwrap();
        // End would land on 19.95, next to the sticker start at 20
        let preview = session.update(17.95, &snap());
        let clip = preview.audio_clip("b").unwrap();
        assert!((clip.start_time - 18.).abs() < 1e-9);
    }

    #[test]
    fn test_updates_start_from_origin() {
        let origin = timeline();
        let session = DragSession::begin(origin.clone(), "a", DragKind::TrimEnd, 7.).unwrap();
        let first = session.update(5., &SnapSettings::default());
        assert_eq!(first.audio_clip("a").unwrap().duration, 2.);
        let second = session.update(6., &SnapSettings::default());
        assert_eq!(second.audio_clip("a").unwrap().duration, 3.);
        assert_eq!(session.origin(), &origin);
        assert_eq!(origin.audio_clip("a").unwrap().duration, 4.);
    }

    #[test]
    fn test_trim_start_drag_on_sticker() {
        let session = DragSession::begin(timeline(), "s", DragKind::TrimStart, 20.).unwrap();
        let preview = session.update(25., &SnapSettings::default());
        let sticker = &preview.sticker_clips[0];
        assert_eq!(sticker.start_time, 25.);
        assert_eq!(sticker.end_time, 30.);
    }

    #[test]
    fn test_unknown_clip() {
        assert!(DragSession::begin(timeline(), "zzz", DragKind::Move, 0.).is_none());
    }
}
