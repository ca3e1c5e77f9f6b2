use crate::core::{
    clip::AudioClip,
    fx::{AudioFxState, MasterConfig},
    state::TimelineController,
    sticker::{StickerClip, TextClip},
    timeline::{ClipEdit, Timeline},
};
use std::sync::Arc;

/// Action that can be undone in the timeline controller.
pub trait TimelineAction {
    fn apply(&mut self, state: &mut TimelineController);
    fn undo(&mut self, state: &mut TimelineController);
    fn name(&self) -> &str;
}

/// Timeline values around one action.
///
/// The first apply computes the new value, an unchanged result counts as
/// nothing applied. Redo publishes the same value again so generated ids
/// stay stable.
#[derive(Default)]
struct Snapshots {
    before: Option<Arc<Timeline>>,
    after: Option<Arc<Timeline>>,
}

impl Snapshots {
    fn apply(
        &mut self,
        state: &mut TimelineController,
        edit: impl FnOnce(&Timeline) -> Option<Timeline>,
    ) {
        let current = state.timeline().clone();
        let next = match &self.after {
            Some(after) => Some(after.clone()),
            None => edit(&current)
                .filter(|next| next != current.as_ref())
                .map(Arc::new),
        };
        if let Some(next) = next {
            self.before = Some(current);
            self.after = Some(next.clone());
            state.restore(&next);
        }
    }

    fn undo(&mut self, state: &mut TimelineController) {
        if let Some(before) = &self.before {
            state.restore(before);
        }
    }
}

/// Group multiple action together so that they can be undone together
pub struct BatchAction {
    actions: Vec<Box<dyn TimelineAction>>,
}

impl BatchAction {
    pub fn new(actions: Vec<Box<dyn TimelineAction>>) -> Self {
        Self { actions }
    }
}

impl TimelineAction for BatchAction {
    fn apply(&mut self, state: &mut TimelineController) {
        for action in self.actions.iter_mut() {
            action.apply(state);
        }
    }
    fn undo(&mut self, state: &mut TimelineController) {
        for action in self.actions.iter_mut().rev() {
            action.undo(state);
        }
    }
    fn name(&self) -> &str {
        "Batch action"
    }
}

/// A clip of any kind to insert
#[derive(Clone, Debug)]
pub enum NewClip {
    Audio(AudioClip),
    Sticker(StickerClip),
    Text(TextClip),
}

pub struct AddClipAction {
    clip: NewClip,
    snapshots: Snapshots,
}

impl AddClipAction {
    pub fn new(clip: NewClip) -> Self {
        Self {
            clip,
            snapshots: Snapshots::default(),
        }
    }
}

impl TimelineAction for AddClipAction {
    fn apply(&mut self, state: &mut TimelineController) {
        let clip = self.clip.clone();
        self.snapshots.apply(state, |timeline| {
            let mut next = timeline.clone();
            match clip {
                NewClip::Audio(clip) => next.audio_clips.push(clip),
                NewClip::Sticker(clip) => next.sticker_clips.push(clip),
                NewClip::Text(clip) => next.text_clips.push(clip),
            }
            Some(next)
        });
    }
    fn undo(&mut self, state: &mut TimelineController) {
        self.snapshots.undo(state);
    }
    fn name(&self) -> &str {
        "Add Clip"
    }
}

pub struct EditClipAction {
    id: String,
    edit: ClipEdit,
    snapshots: Snapshots,
}

impl EditClipAction {
    pub fn new(id: &str, edit: ClipEdit) -> Self {
        Self {
            id: id.to_string(),
            edit,
            snapshots: Snapshots::default(),
        }
    }
}

impl TimelineAction for EditClipAction {
    fn apply(&mut self, state: &mut TimelineController) {
        let (id, edit) = (&self.id, self.edit);
        self.snapshots
            .apply(state, |timeline| timeline.with_clip_edit(id, edit));
    }
    fn undo(&mut self, state: &mut TimelineController) {
        self.snapshots.undo(state);
    }
    fn name(&self) -> &str {
        match self.edit {
            ClipEdit::Move(_) => "Move Clip",
            ClipEdit::TrimStart(_) => "Trim Clip Start",
            ClipEdit::TrimEnd(_) => "Trim Clip End",
        }
    }
}

pub struct SplitClipAction {
    id: String,
    time: f64,
    snapshots: Snapshots,
}

impl SplitClipAction {
    pub fn new(id: &str, time: f64) -> Self {
        Self {
            id: id.to_string(),
            time,
            snapshots: Snapshots::default(),
        }
    }
}

impl TimelineAction for SplitClipAction {
    fn apply(&mut self, state: &mut TimelineController) {
        let (id, time) = (&self.id, self.time);
        self.snapshots
            .apply(state, |timeline| timeline.with_split(id, time));
    }
    fn undo(&mut self, state: &mut TimelineController) {
        self.snapshots.undo(state);
    }
    fn name(&self) -> &str {
        "Split Clip"
    }
}

pub struct MoveClipsAction {
    ids: Vec<String>,
    delta: f64,
    snapshots: Snapshots,
}

impl MoveClipsAction {
    pub fn new(ids: &[String], delta: f64) -> Self {
        Self {
            ids: ids.to_vec(),
            delta,
            snapshots: Snapshots::default(),
        }
    }
}

impl TimelineAction for MoveClipsAction {
    fn apply(&mut self, state: &mut TimelineController) {
        let (ids, delta) = (&self.ids, self.delta);
        self.snapshots
            .apply(state, |timeline| Some(timeline.with_moved(ids, delta)));
    }
    fn undo(&mut self, state: &mut TimelineController) {
        self.snapshots.undo(state);
    }
    fn name(&self) -> &str {
        "Move Clips"
    }
}

pub struct DeleteClipsAction {
    ids: Vec<String>,
    snapshots: Snapshots,
}

impl DeleteClipsAction {
    pub fn new(ids: &[String]) -> Self {
        Self {
            ids: ids.to_vec(),
            snapshots: Snapshots::default(),
        }
    }
}

impl TimelineAction for DeleteClipsAction {
    fn apply(&mut self, state: &mut TimelineController) {
        let ids = &self.ids;
        self.snapshots
            .apply(state, |timeline| Some(timeline.without(ids)));
    }
    fn undo(&mut self, state: &mut TimelineController) {
        self.snapshots.undo(state);
    }
    fn name(&self) -> &str {
        "Delete Clips"
    }
}

pub struct DuplicateClipsAction {
    ids: Vec<String>,
    snapshots: Snapshots,
}

impl DuplicateClipsAction {
    pub fn new(ids: &[String]) -> Self {
        Self {
            ids: ids.to_vec(),
            snapshots: Snapshots::default(),
        }
    }
}

impl TimelineAction for DuplicateClipsAction {
    fn apply(&mut self, state: &mut TimelineController) {
        let ids = &self.ids;
        self.snapshots.apply(state, |timeline| {
            let (next, created) = timeline.with_duplicates(ids);
            (!created.is_empty()).then_some(next)
        });
    }
    fn undo(&mut self, state: &mut TimelineController) {
        self.snapshots.undo(state);
    }
    fn name(&self) -> &str {
        "Duplicate Clips"
    }
}

pub struct SetFxAction {
    id: String,
    fx: AudioFxState,
    snapshots: Snapshots,
}

impl SetFxAction {
    pub fn new(id: &str, fx: AudioFxState) -> Self {
        Self {
            id: id.to_string(),
            fx,
            snapshots: Snapshots::default(),
        }
    }
}

impl TimelineAction for SetFxAction {
    fn apply(&mut self, state: &mut TimelineController) {
        let (id, fx) = (&self.id, &self.fx);
        self.snapshots.apply(state, |timeline| {
            let index = timeline.audio_clips.iter().position(|c| c.id == *id)?;
            let mut next = timeline.clone();
            next.audio_clips[index].fx = fx.clone();
            Some(next)
        });
    }
    fn undo(&mut self, state: &mut TimelineController) {
        self.snapshots.undo(state);
    }
    fn name(&self) -> &str {
        "Set Effects"
    }
}

pub struct SetMasterAction {
    master: MasterConfig,
    snapshots: Snapshots,
}

impl SetMasterAction {
    pub fn new(master: MasterConfig) -> Self {
        Self {
            master,
            snapshots: Snapshots::default(),
        }
    }
}

impl TimelineAction for SetMasterAction {
    fn apply(&mut self, state: &mut TimelineController) {
        let master = &self.master;
        self.snapshots.apply(state, |timeline| {
            Some(Timeline {
                master: master.clone(),
                ..timeline.clone()
            })
        });
    }
    fn undo(&mut self, state: &mut TimelineController) {
        self.snapshots.undo(state);
    }
    fn name(&self) -> &str {
        "Set Master"
    }
}

/// Result of a finished drag. Both values are already known, nothing is
/// recomputed on redo.
pub struct CommitDragAction {
    before: Arc<Timeline>,
    after: Arc<Timeline>,
}

impl CommitDragAction {
    pub fn new(before: Arc<Timeline>, after: Arc<Timeline>) -> Self {
        Self { before, after }
    }
}

impl TimelineAction for CommitDragAction {
    fn apply(&mut self, state: &mut TimelineController) {
        state.restore(&self.after);
    }
    fn undo(&mut self, state: &mut TimelineController) {
        state.restore(&self.before);
    }
    fn name(&self) -> &str {
        "Drag Clip"
    }
}
