//! Move, trim, split and snap operations shared by every clip kind.
//!
//! Every operation takes clips by reference and returns new values, so a
//! published timeline is never modified in place. Invalid requests are
//! clamped, or for splits rejected with `None`.


/// Shortest clip any operation may produce, in seconds
pub const MIN_CLIP_LENGTH: f64 = 0.1;

/// A time interval placed on a track.
pub trait TimelineClip: Clone {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    /// Start on the timeline in seconds
    fn start(&self) -> f64;
    fn duration(&self) -> f64;
    fn end(&self) -> f64 {
        self.start() + self.duration()
    }
    /// Set start and duration together
    fn set_range(&mut self, start: f64, duration: f64);
    /// `(offset_in_source, source_duration)` for clips backed by media.
    fn source_window(&self) -> Option<(f64, f64)> {
        None
    }
    fn set_source_offset(&mut self, _offset: f64) {}

    fn clone_with_new_id(&self) -> Self {
        let mut clone = self.clone();
        clone.set_id(uuid::Uuid::new_v4().into());
        clone
    }
}

/// Snap candidates besides the implicit `0`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SnapOptions<'a> {
    pub edges: &'a [f64],
    pub playhead: f64,
    pub tolerance: f64,
    pub beats: &'a [f64],
}

/// Move clip to `new_start`, never before 0.
pub fn move_clip<C: TimelineClip>(clip: &C, new_start: f64) -> C {
    let mut moved = clip.clone();
    moved.set_range(new_start.max(0.), clip.duration());
    moved
}

/// Move the start edge while the end stays fixed. The source offset follows
/// the edge so the audio stays aligned with the timeline.
pub fn trim_start<C: TimelineClip>(clip: &C, new_start: f64) -> C {
    let end = clip.end();
    let mut lower: f64 = 0.;
    if let Some((offset, _)) = clip.source_window() {
        lower = lower.max(clip.start() - offset);
    }
    let upper = end - MIN_CLIP_LENGTH;
    let start = new_start.max(lower).min(upper);

    let mut trimmed = clip.clone();
    if let Some((offset, _)) = clip.source_window() {
        trimmed.set_source_offset((offset + start - clip.start()).max(0.));
    }
    trimmed.set_range(start, end - start);
    trimmed
}

/// Move the end edge. Clips backed by media cannot extend past the end of
/// their source.
pub fn trim_end<C: TimelineClip>(clip: &C, new_end: f64) -> C {
    let start = clip.start();
    let upper = match clip.source_window() {
        Some((offset, source_duration)) => start + (source_duration - offset),
        None => f64::INFINITY,
    };
    let end = new_end.min(upper).max(start + MIN_CLIP_LENGTH);

    let mut trimmed = clip.clone();
    trimmed.set_range(start, end - start);
    trimmed
}

/// Split clip at `time` into two clips with fresh ids.
///
/// Returns `None` when `time` is not strictly inside the clip or when one of
/// the halves would be shorter than [`MIN_CLIP_LENGTH`].
pub fn split_clip<C: TimelineClip>(clip: &C, time: f64) -> Option<(C, C)> {
    let start = clip.start();
    let end = clip.end();
    if time <= start || time >= end {
        return None;
    }
    if time - start < MIN_CLIP_LENGTH || end - time < MIN_CLIP_LENGTH {
        return None;
    }

    let mut first = clip.clone_with_new_id();
    first.set_range(start, time - start);

    let mut second = clip.clone_with_new_id();
    second.set_range(time, end - time);
    if let Some((offset, _)) = clip.source_window() {
        second.set_source_offset(offset + (time - start));
    }
    Some((first, second))
}

/// Snap `raw` to the closest candidate within tolerance.
///
/// Candidates are `0`, the playhead, the given edges and beats. Equidistant
/// candidates resolve to the smallest time. Returns `raw` when nothing is
/// close enough.
pub fn snap_time(raw: f64, options: &SnapOptions) -> f64 {
    let candidates = [0., options.playhead]
        .into_iter()
        .chain(options.edges.iter().copied())
        .chain(options.beats.iter().copied());

    let mut best: Option<(f64, f64)> = None;
    for candidate in candidates.filter(|c| c.is_finite()) {
        let distance = (candidate - raw).abs();
        if distance > options.tolerance {
            continue;
        }
        best = match best {
            Some((best_distance, best_time))
                if best_distance < distance
                    || (best_distance == distance && best_time <= candidate) =>
            {
                Some((best_distance, best_time))
            }
            _ => Some((distance, candidate)),
        };
    }
    best.map_or(raw, |(_, time)| time)
}

/// Start and end of every clip except `exclude_id`.
pub fn all_edges<C: TimelineClip>(clips: &[C], exclude_id: Option<&str>) -> Vec<f64> {
    clips
        .iter()
        .filter(|c| Some(c.id()) != exclude_id)
        .flat_map(|c| [c.start(), c.end()])
        .collect()
}

/// Move every clip in `ids` by `delta`. The delta is limited so the earliest
/// moved clip stops at 0 and the group keeps its spacing.
pub fn move_multiple<C: TimelineClip>(clips: &[C], ids: &[String], delta: f64) -> Vec<C> {
    let earliest = clips
        .iter()
        .filter(|c| ids.iter().any(|id| id == c.id()))
        .map(|c| c.start())
        .fold(f64::INFINITY, f64::min);
    if !earliest.is_finite() {
        return clips.to_vec();
    }
    let delta = delta.max(-earliest);

    clips
        .iter()
        .map(|c| {
            if ids.iter().any(|id| id == c.id()) {
                move_clip(c, c.start() + delta)
            } else {
                c.clone()
            }
        })
        .collect()
}

pub fn delete_multiple<C: TimelineClip>(clips: &[C], ids: &[String]) -> Vec<C> {
    clips
        .iter()
        .filter(|c| !ids.iter().any(|id| id == c.id()))
        .cloned()
        .collect()
}

/// Copy of `clip` with a fresh id, placed right after the original.
pub fn duplicate_clip<C: TimelineClip>(clip: &C) -> C {
    let mut copy = clip.clone_with_new_id();
    copy.set_range(clip.end(), clip.duration());
    copy
}

/// First clip covering `time`. Starts are inclusive, ends exclusive.
pub fn clip_at<C: TimelineClip>(clips: &[C], time: f64) -> Option<&C> {
    clips.iter().find(|c| time >= c.start() && time < c.end())
}

/// Replace the clip sharing `clip`'s id. Returns `None` if there is none.
pub fn replace_clip<C: TimelineClip>(clips: &[C], clip: C) -> Option<Vec<C>> {
    let index = clips.iter().position(|c| c.id() == clip.id())?;
    let mut replaced = clips.to_vec();
    replaced[index] = clip;
    Some(replaced)
}
