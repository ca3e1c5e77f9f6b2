mod action;
#[cfg(test)]
mod tests;
use crate::{
    analysis::{AssetFetcher, MediaDecoder},
    audio::{
        export::{ExportOptions, ExportPlan, ExportRenderer, ExportStatus},
        graph::MixManifest,
        player::{PlaybackEngine, PlaybackEvent},
    },
    cache::{LoadEvent, SourceCache, SourceLoader},
    config::Config,
    core::{
        clip::AudioClip,
        drag::{DragKind, DragSession, SnapSettings},
        fx::{AudioFxState, MasterConfig, preset_by_id},
        interval::{SnapOptions, TimelineClip, snap_time},
        schema::{load_project, save_project},
        selection::ClipSelection,
        state::action::{
            AddClipAction, BatchAction, CommitDragAction, DeleteClipsAction, DuplicateClipsAction,
            EditClipAction, MoveClipsAction, NewClip, SetFxAction, SetMasterAction,
            SplitClipAction, TimelineAction,
        },
        sticker::{StickerClip, TextClip},
        timeline::{ClipEdit, Timeline},
    },
    error::{ProjectError, RenderResult},
};
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::{path::PathBuf, sync::Arc, time::Duration};

/// Published after every change of the controller's state
#[derive(Clone, Debug)]
pub enum TimelineEvent {
    Updated(Arc<Timeline>),
    Transport { time: f64, playing: bool },
    SourceReady(String),
    SourceFailed(String),
}

/// An audio source waiting for its decode before its clip is created
#[derive(Clone, Debug)]
struct PendingSource {
    source_id: String,
    name: String,
    start_time: f64,
}

/// Owns the timeline and everything acting on it: clip edits across every
/// track kind, selection, pointer drags, playback, source loading, export
/// and history.
///
/// The timeline is never mutated in place. Every change builds a new value
/// and swaps the shared pointer.
pub struct TimelineController {
    timeline: Arc<Timeline>,
    engine: PlaybackEngine,
    loader: SourceLoader,
    selection: ClipSelection,
    drag: Option<DragSession>,
    snap: SnapSettings,
    snap_to_beats: bool,
    pending_sources: Vec<PendingSource>,
    events: Option<Sender<TimelineEvent>>,
    // History management
    undo_stack: Vec<Box<dyn TimelineAction>>,
    redo_stack: Vec<Box<dyn TimelineAction>>,
    batching: bool,
    batch_buffer: Vec<Box<dyn TimelineAction>>,
    /// Actions requested while a drag is in progress, applied once it ends
    held_actions: Vec<Box<dyn TimelineAction>>,
}

impl TimelineController {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn AssetFetcher>,
        decoder: Arc<dyn MediaDecoder>,
    ) -> Self {
        let timeline = Timeline {
            min_duration: config.min_project_duration,
            master: config.master.clone(),
            ..Timeline::default()
        };
        Self {
            engine: PlaybackEngine::new(config.sample_rate, &timeline.master),
            loader: SourceLoader::new(
                fetcher,
                decoder,
                SourceCache::new(),
                config.sample_rate,
                config.waveform_peaks,
            ),
            timeline: Arc::new(timeline),
            selection: ClipSelection::new(),
            drag: None,
            snap: SnapSettings {
                enabled: true,
                tolerance: config.snap_tolerance,
                beats: Vec::new(),
            },
            snap_to_beats: config.snap_to_beats,
            pending_sources: Vec::new(),
            events: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            batching: false,
            batch_buffer: Vec::new(),
            held_actions: Vec::new(),
        }
    }

    pub fn with_events(mut self, events: Sender<TimelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Forward engine ticks to `events`
    pub fn with_playback_events(mut self, events: Sender<PlaybackEvent>) -> Self {
        self.engine = self.engine.with_events(events);
        self
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    pub fn sources(&self) -> &SourceCache {
        self.loader.cache()
    }

    /// Waveform peaks of a decoded source
    pub fn waveform(&self, source_id: &str) -> Option<Vec<f32>> {
        self.sources().get(source_id).map(|s| s.waveform.clone())
    }

    // Project
    /// Replace the whole timeline, dropping history
    pub fn load_timeline(&mut self, timeline: Timeline) {
        if self.engine.is_playing() {
            self.engine.pause();
        }
        self.engine.seek(timeline.current_time);
        self.drag = None;
        self.held_actions.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending_sources.clear();
        self.publish(Timeline {
            is_playing: false,
            ..timeline
        });
    }

    pub fn open_project(&mut self, json: &str) -> Result<(), ProjectError> {
        let timeline = load_project(json)?;
        self.load_timeline(timeline);
        Ok(())
    }

    pub fn save_project(&self) -> Result<String, ProjectError> {
        save_project(&self.timeline)
    }

    // Clips
    /// Place a clip for `source_id` once the source is decoded. Its duration
    /// is the decoded length.
    pub fn add_audio_source(&mut self, source_id: &str, name: &str, start_time: f64) {
        if let Some(source) = self.sources().get(source_id) {
            let clip = AudioClip::new(source_id, source.duration(), start_time).with_name(name);
            self.add_audio_clip(clip);
            return;
        }
        self.pending_sources.push(PendingSource {
            source_id: source_id.to_string(),
            name: name.to_string(),
            start_time,
        });
        self.loader.retry(source_id);
    }

    pub fn add_audio_clip(&mut self, clip: AudioClip) -> String {
        let id = clip.id.clone();
        self.apply_action(Box::new(AddClipAction::new(NewClip::Audio(clip))));
        id
    }

    pub fn add_sticker(&mut self, element_id: &str, start_time: f64) -> String {
        let clip = StickerClip::new(element_id, start_time);
        let id = clip.id.clone();
        self.apply_action(Box::new(AddClipAction::new(NewClip::Sticker(clip))));
        id
    }

    pub fn add_text(&mut self, element_id: &str, start_time: f64) -> String {
        let clip = TextClip::new(element_id, start_time);
        let id = clip.id.clone();
        self.apply_action(Box::new(AddClipAction::new(NewClip::Text(clip))));
        id
    }

    /// Move clip to a new start, whatever its track
    pub fn move_clip(&mut self, id: &str, start: f64) {
        self.apply_action(Box::new(EditClipAction::new(id, ClipEdit::Move(start))));
    }

    pub fn trim_start(&mut self, id: &str, start: f64) {
        self.apply_action(Box::new(EditClipAction::new(id, ClipEdit::TrimStart(start))));
    }

    pub fn trim_end(&mut self, id: &str, end: f64) {
        self.apply_action(Box::new(EditClipAction::new(id, ClipEdit::TrimEnd(end))));
    }

    /// Split clip at `time`. Does nothing if the split is invalid.
    pub fn split_clip(&mut self, id: &str, time: f64) {
        self.apply_action(Box::new(SplitClipAction::new(id, time)));
    }

    /// Split every selected clip under the playhead
    pub fn split_selected_at_playhead(&mut self) {
        let time = self.current_time();
        let ids = self.selection.ids().to_vec();
        self.begin_batch();
        for id in ids {
            self.split_clip(&id, time);
        }
        self.commit_batch();
    }

    pub fn move_clips(&mut self, ids: &[String], delta: f64) {
        self.apply_action(Box::new(MoveClipsAction::new(ids, delta)));
    }

    pub fn move_selected(&mut self, delta: f64) {
        let ids = self.selection.ids().to_vec();
        self.move_clips(&ids, delta);
    }

    pub fn delete_clips(&mut self, ids: &[String]) {
        self.apply_action(Box::new(DeleteClipsAction::new(ids)));
    }

    pub fn delete_selected(&mut self) {
        let ids = self.selection.ids().to_vec();
        self.delete_clips(&ids);
    }

    /// Duplicate clips, each copy placed right after its original.
    /// Returns the ids of the copies, none while a drag holds the edit back.
    pub fn duplicate_clips(&mut self, ids: &[String]) -> Vec<String> {
        let before = self.timeline.clone();
        self.apply_action(Box::new(DuplicateClipsAction::new(ids)));
        self.clip_ids()
            .filter(|id| before.kind_of(id).is_none())
            .collect()
    }

    pub fn set_fx(&mut self, id: &str, fx: AudioFxState) {
        self.apply_action(Box::new(SetFxAction::new(id, fx)));
    }

    /// Replace the effects of a clip with a named preset. Unknown ids are
    /// ignored.
    pub fn apply_preset(&mut self, id: &str, preset_id: &str) {
        match preset_by_id(preset_id) {
            Some(preset) => self.set_fx(id, preset.fx),
            None => log::debug!("Unknown preset {preset_id}"),
        }
    }

    pub fn set_master(&mut self, master: MasterConfig) {
        self.apply_action(Box::new(SetMasterAction::new(master)));
    }

    /// Snap `time` to the edges of every clip but `exclude_id`, the
    /// playhead and the detected beats
    pub fn snap(&self, time: f64, exclude_id: Option<&str>) -> f64 {
        if !self.snap.enabled {
            return time;
        }
        let edges = self.timeline.edges(exclude_id);
        snap_time(
            time,
            &SnapOptions {
                edges: &edges,
                playhead: self.current_time(),
                tolerance: self.snap.tolerance,
                beats: &self.snap.beats,
            },
        )
    }

    pub fn set_snapping(&mut self, enabled: bool) {
        self.snap.enabled = enabled;
    }

    pub fn set_snap_to_beats(&mut self, enabled: bool) {
        self.snap_to_beats = enabled;
        self.refresh_beats();
    }

    // View
    /// Set horizontal zoom. Not part of the history.
    pub fn set_zoom(&mut self, pixels_per_second: f64) {
        let zoomed = self.timeline.with_zoom(pixels_per_second);
        self.publish(zoomed);
    }

    /// Length of the visual animation, floor of the project duration
    pub fn set_animation_max_duration(&mut self, duration: f64) {
        let next = Timeline {
            animation_max_duration: duration.max(0.),
            ..self.timeline.as_ref().clone()
        };
        self.publish(next);
    }

    // Selection
    pub fn click(&mut self, id: &str, modifier: bool) {
        self.selection.click(id, modifier);
    }

    pub fn selection(&self) -> &ClipSelection {
        &self.selection
    }

    pub fn select(&mut self, ids: Vec<String>) {
        self.selection.set(ids);
    }

    pub fn deselect(&mut self) {
        self.selection.reset();
    }

    // Pointer drags
    /// Start a drag on `id`. A move needs `id` to be the only selected clip
    /// and no modifier held. Returns whether the drag started.
    pub fn begin_drag(&mut self, id: &str, kind: DragKind, pointer_time: f64, modifier: bool) -> bool {
        if self.drag.is_some() {
            log::debug!("Drag already in progress, ignoring");
            return false;
        }
        if kind == DragKind::Move && !self.selection.can_drag(id, modifier) {
            return false;
        }
        self.drag = DragSession::begin(self.timeline.clone(), id, kind, pointer_time);
        if self.drag.is_none() {
            return false;
        }
        // The dragged clip must not snap to its own beats
        self.refresh_beats();
        true
    }

    /// Preview the drag at `pointer_time`. Not part of the history.
    pub fn update_drag(&mut self, pointer_time: f64) {
        let Some(drag) = &self.drag else {
            return;
        };
        let preview = drag.update(pointer_time, &self.snap);
        self.publish(preview);
    }

    /// End the drag, recording its result as one history entry. Edits held
    /// back during the drag are applied after it.
    pub fn finish_drag(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        let origin = drag.origin().clone();
        if origin.audio_clips != self.timeline.audio_clips
            || origin.sticker_clips != self.timeline.sticker_clips
            || origin.text_clips != self.timeline.text_clips
        {
            let action = CommitDragAction::new(origin, self.timeline.clone());
            self.record(Box::new(action));
        }
        self.refresh_beats();
        self.release_held_actions();
    }

    /// Abort the drag and put the timeline back. Edits held back during the
    /// drag are still applied.
    pub fn cancel_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            self.restore(drag.origin());
            self.release_held_actions();
        }
    }

    fn release_held_actions(&mut self) {
        for action in std::mem::take(&mut self.held_actions) {
            self.apply_action(action);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether a load of `source_id` is running
    pub fn is_loading(&self, source_id: &str) -> bool {
        self.loader.is_pending(source_id)
    }

    // Transport
    pub fn play(&mut self) {
        if self.engine.is_playing() {
            log::debug!("Already playing");
            return;
        }
        if self.current_time() >= self.timeline.project_duration() {
            self.engine.seek(0.);
        }
        self.engine.play(&self.timeline.audio_clips, self.loader.cache());
        self.publish_transport();
    }

    pub fn pause(&mut self) {
        self.engine.pause();
        self.publish_transport();
    }

    pub fn toggle_playback(&mut self) {
        if self.engine.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the playhead. Playback continues from there if it was running.
    pub fn seek(&mut self, time: f64) {
        let was_playing = self.engine.is_playing();
        self.engine.seek(time.min(self.timeline.project_duration()));
        if was_playing {
            self.engine.play(&self.timeline.audio_clips, self.loader.cache());
        }
        self.publish_transport();
    }

    pub fn current_time(&self) -> f64 {
        self.engine.current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    /// Render one interleaved stereo block of live output. Playback stops
    /// at the end of the project.
    pub fn render(&mut self, out: &mut [f32]) {
        self.engine.render(out);
        if self.engine.is_playing() && self.current_time() >= self.timeline.project_duration() {
            log::info!("Reached the end of the project");
            self.engine.pause();
            self.publish_transport();
        }
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    /// Stage lists of the voices currently playing
    pub fn graph_manifest(&self) -> MixManifest {
        self.engine.graph_manifest()
    }

    // Sources
    /// Apply finished loads. Call regularly from the owning thread.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let wanted = self.wanted_sources();
        let events = self.loader.poll(|id| wanted.iter().any(|w| w == id));
        self.handle_load_events(&events);
        events
    }

    /// Block until every requested source is loaded or `timeout` elapsed
    pub fn wait_for_sources(&mut self, timeout: Duration) -> Vec<LoadEvent> {
        let wanted = self.wanted_sources();
        let events = self.loader.wait(timeout, |id| wanted.iter().any(|w| w == id));
        self.handle_load_events(&events);
        events
    }

    fn wanted_sources(&self) -> Vec<String> {
        self.timeline
            .audio_clips
            .iter()
            .map(|c| c.source_id.clone())
            .chain(self.pending_sources.iter().map(|p| p.source_id.clone()))
            .collect()
    }

    fn handle_load_events(&mut self, events: &[LoadEvent]) {
        if events.is_empty() {
            return;
        }
        for event in events {
            match event {
                LoadEvent::Ready(source_id) => {
                    let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_sources)
                        .into_iter()
                        .partition(|p| p.source_id == *source_id);
                    self.pending_sources = waiting;
                    if let Some(source) = self.sources().get(source_id) {
                        for pending in ready {
                            let clip = AudioClip::new(source_id, source.duration(), pending.start_time)
                                .with_name(&pending.name);
                            self.add_audio_clip(clip);
                        }
                    }
                    self.send(TimelineEvent::SourceReady(source_id.clone()));
                }
                LoadEvent::Failed(source_id) => {
                    self.pending_sources.retain(|p| p.source_id != *source_id);
                    self.send(TimelineEvent::SourceFailed(source_id.clone()));
                }
                LoadEvent::Discarded(_) => {}
            }
        }
        self.refresh_beats();
        // Newly decoded sources can now get a voice
        self.engine
            .sync(&self.timeline.audio_clips, self.loader.cache());
    }

    /// Beats of every placed clip but the dragged one, in timeline time
    fn refresh_beats(&mut self) {
        if !self.snap_to_beats {
            self.snap.beats.clear();
            return;
        }
        let dragged = self.drag.as_ref().map(|d| d.clip_id.as_str());
        let mut beats: Vec<f64> = self
            .timeline
            .audio_clips
            .iter()
            .filter(|clip| Some(clip.id.as_str()) != dragged)
            .filter_map(|clip| Some((clip, self.sources().get(&clip.source_id)?)))
            .flat_map(|(clip, source)| {
                let (start, offset, end) = (clip.start_time, clip.offset_in_source, clip.end());
                source
                    .beats
                    .iter()
                    .map(move |beat| start + beat - offset)
                    .filter(move |time| *time >= start && *time < end)
                    .collect::<Vec<_>>()
            })
            .collect();
        beats.sort_by(f64::total_cmp);
        self.snap.beats = beats;
    }

    // Export
    fn halt_for_export(&mut self) {
        if self.engine.is_playing() {
            log::info!("Stopping playback for export");
            self.pause();
        }
    }

    /// What an export with `options` would render
    pub fn export_plan(&self, options: ExportOptions) -> RenderResult<ExportPlan> {
        ExportRenderer::new(&self.timeline, self.loader.cache(), options).plan()
    }

    /// Render the project to WAV bytes. Stops playback first.
    pub fn export(&mut self, options: ExportOptions) -> RenderResult<Vec<u8>> {
        self.halt_for_export();
        ExportRenderer::new(&self.timeline, self.loader.cache(), options).render_wav()
    }

    /// Render to `path` on a background thread. Stops playback first.
    pub fn export_in_background(
        &mut self,
        path: PathBuf,
        options: ExportOptions,
    ) -> Receiver<ExportStatus> {
        self.halt_for_export();
        let (tx, rx) = unbounded();
        let timeline = self.timeline.clone();
        let sources = self.loader.cache().clone();
        std::thread::spawn(move || {
            let renderer = ExportRenderer::new(&timeline, &sources, options);
            let _ = renderer.export_to_file(&path, Some(&tx));
        });
        rx
    }

    // History management
    /// Apply a `TimelineAction` and adds it to the stack
    fn apply_action(&mut self, mut action: Box<dyn TimelineAction>) {
        if self.batching {
            self.batch_buffer.push(action);
            return;
        }
        if self.drag.is_some() {
            log::debug!("Holding {} until the drag ends", action.name());
            self.held_actions.push(action);
            return;
        }
        let before = self.timeline.clone();
        action.apply(self);
        if Arc::ptr_eq(&before, &self.timeline) {
            log::debug!("{} changed nothing", action.name());
            return;
        }
        log::debug!("Applied {}", action.name());
        self.record(action);
    }

    fn record(&mut self, action: Box<dyn TimelineAction>) {
        self.undo_stack.push(action);
        self.redo_stack.clear();
    }

    /// Create a batch of actions. All actions made from this point are not applied but saved to a buffer.
    /// Use `commit_batch` to apply them.
    pub fn begin_batch(&mut self) {
        self.batching = true;
    }

    /// Apply changes saved in the batch buffer as one history entry
    pub fn commit_batch(&mut self) {
        self.batching = false;
        let batch = std::mem::take(&mut self.batch_buffer);
        if !batch.is_empty() {
            self.apply_action(Box::new(BatchAction::new(batch)));
        }
    }

    /// Undo last action. Does nothing if there is no action.
    pub fn undo(&mut self) {
        if self.drag.is_some() {
            log::debug!("Drag in progress, ignoring undo");
            return;
        }
        if let Some(mut action) = self.undo_stack.pop() {
            log::debug!("Undoing {}", action.name());
            action.undo(self);
            self.redo_stack.push(action);
        }
    }

    /// Redo last action. Does nothing if there is no action.
    pub fn redo(&mut self) {
        if self.drag.is_some() {
            log::debug!("Drag in progress, ignoring redo");
            return;
        }
        if let Some(mut action) = self.redo_stack.pop() {
            log::debug!("Redoing {}", action.name());
            action.apply(self);
            self.undo_stack.push(action);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // Publishing
    /// Publish a history snapshot, keeping the current transport and view
    pub(crate) fn restore(&mut self, snapshot: &Arc<Timeline>) {
        let current = self.timeline.clone();
        if snapshot.current_time == current.current_time
            && snapshot.is_playing == current.is_playing
            && snapshot.pixels_per_second == current.pixels_per_second
            && snapshot.animation_max_duration == current.animation_max_duration
        {
            self.swap(snapshot.clone());
        } else {
            self.publish(Timeline {
                current_time: current.current_time,
                is_playing: current.is_playing,
                pixels_per_second: current.pixels_per_second,
                animation_max_duration: current.animation_max_duration,
                ..snapshot.as_ref().clone()
            });
        }
    }

    fn publish(&mut self, timeline: Timeline) {
        self.swap(Arc::new(timeline));
    }

    fn swap(&mut self, timeline: Arc<Timeline>) {
        self.timeline = timeline;
        let timeline = self.timeline.clone();
        self.selection.retain(|id| timeline.kind_of(id).is_some());
        self.engine.set_master(&timeline.master);
        self.engine.sync(&timeline.audio_clips, self.loader.cache());
        let wanted = self.wanted_sources();
        for source_id in self.loader.pending_ids() {
            if !wanted.contains(&source_id) {
                log::debug!("No clip references {source_id} anymore, cancelling its load");
                self.loader.cancel(&source_id);
            }
        }
        for clip in &timeline.audio_clips {
            self.loader.request(&clip.source_id);
        }
        self.refresh_beats();
        self.send(TimelineEvent::Updated(timeline));
    }

    fn publish_transport(&mut self) {
        let (time, playing) = (self.current_time(), self.is_playing());
        if self.timeline.current_time != time || self.timeline.is_playing != playing {
            let next = Timeline {
                current_time: time,
                is_playing: playing,
                ..self.timeline.as_ref().clone()
            };
            self.publish(next);
        }
        self.send(TimelineEvent::Transport { time, playing });
    }

    fn send(&self, event: TimelineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn clip_ids(&self) -> impl Iterator<Item = String> + '_ {
        let timeline = &self.timeline;
        timeline
            .audio_clips
            .iter()
            .map(|c| c.id().to_string())
            .chain(timeline.sticker_clips.iter().map(|c| c.id().to_string()))
            .chain(timeline.text_clips.iter().map(|c| c.id().to_string()))
    }
}
