use crate::{
    analysis::{MemoryAssetFetcher, SymphoniaDecoder},
    audio::export::{ExportOptions, ExportStatus, encode_wav},
    cache::LoadEvent,
    config::Config,
    core::{
        clip::AudioClip,
        drag::DragKind,
        fx::{AudioFxState, MasterConfig, preset_by_id},
        state::{TimelineController, TimelineEvent},
        timeline::TrackKind,
    },
};
use crossbeam::channel::unbounded;
use std::{sync::Arc, time::Duration};

const SR: u32 = 8000;
const TIMEOUT: Duration = Duration::from_secs(10);

fn setup_controller() -> TimelineController {
    let fetcher = MemoryAssetFetcher::new();
    // 4 seconds of stereo at 0.5 / -0.5
    let samples: Vec<f32> = (0..SR * 4).flat_map(|_| [0.5, -0.5]).collect();
    fetcher.insert("loop.wav", encode_wav(&samples, 2, SR).unwrap());
    fetcher.insert("noise.wav", b"garbage".to_vec());
    // 4 seconds of silence with a click at 1 second
    let click: Vec<f32> = (0..SR * 4)
        .map(|i| if (SR..SR + 256).contains(&i) { 0.8 } else { 0. })
        .collect();
    fetcher.insert("click.wav", encode_wav(&click, 1, SR).unwrap());
    let config = Config {
        sample_rate: SR,
        ..Default::default()
    };
    TimelineController::new(&config, Arc::new(fetcher), Arc::new(SymphoniaDecoder))
}

fn clip(start: f64, duration: f64) -> AudioClip {
    let mut clip = AudioClip::new("loop.wav", 4., start);
    clip.duration = duration;
    clip
}

#[test]
fn test_add_audio_source_waits_for_decode() {
    let mut state = setup_controller();
    state.add_audio_source("loop.wav", "Loop", 1.5);
    assert!(state.timeline().audio_clips.is_empty());

    let events = state.wait_for_sources(TIMEOUT);
    assert_eq!(events, vec![LoadEvent::Ready("loop.wav".to_string())]);
    let clips = &state.timeline().audio_clips;
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0].start_time, 1.5);
    assert!((clips[0].duration - 4.).abs() < 1e-3);
    assert_eq!(clips[0].source_name, "Loop");
    assert!(state.waveform("loop.wav").is_some_and(|w| !w.is_empty()));
}

#[test]
fn test_failed_source_adds_nothing() {
    let (tx, rx) = unbounded();
    let mut state = setup_controller().with_events(tx);
    state.add_audio_source("noise.wav", "Noise", 0.);
    state.wait_for_sources(TIMEOUT);
    assert!(state.timeline().audio_clips.is_empty());
    assert!(
        rx.try_iter()
            .any(|e| matches!(e, TimelineEvent::SourceFailed(id) if id == "noise.wav"))
    );
}

#[test]
fn test_clip_edits_and_history() {
    let mut state = setup_controller();
    let id = state.add_audio_clip(clip(0., 4.));

    state.move_clip(&id, 2.);
    assert_eq!(state.timeline().audio_clips[0].start_time, 2.);

    state.trim_end(&id, 10.);
    // Bounded by the source
    assert_eq!(state.timeline().audio_clips[0].duration, 4.);

    state.trim_start(&id, 3.);
    let trimmed = &state.timeline().audio_clips[0];
    assert_eq!(trimmed.start_time, 3.);
    assert_eq!(trimmed.offset_in_source, 1.);
    assert_eq!(trimmed.duration, 3.);

    // The clamped trim end changed nothing and was not recorded
    state.undo();
    assert_eq!(state.timeline().audio_clips[0].start_time, 2.);
    state.undo();
    assert_eq!(state.timeline().audio_clips[0].start_time, 0.);
    state.redo();
    assert_eq!(state.timeline().audio_clips[0].start_time, 2.);
    assert!(state.can_undo() && state.can_redo());
}

#[test]
fn test_noop_edits_are_not_recorded() {
    let mut state = setup_controller();
    let id = state.add_audio_clip(clip(0., 4.));
    state.move_clip("missing", 3.);
    state.split_clip(&id, 0.05);
    state.move_clip(&id, -5.);
    state.undo();
    assert!(state.timeline().audio_clips.is_empty());
    assert!(!state.can_undo());
}

#[test]
fn test_split_and_duplicate() {
    let mut state = setup_controller();
    let id = state.add_audio_clip(clip(1., 4.));
    state.split_clip(&id, 2.);
    let clips = state.timeline().audio_clips.clone();
    assert_eq!(clips.len(), 2);
    assert_eq!(clips[1].offset_in_source, 1.);
    assert_eq!(clips[1].start_time, 2.);

    let copies = state.duplicate_clips(&[clips[0].id.clone()]);
    assert_eq!(copies.len(), 1);
    let copy = state.timeline().audio_clip(&copies[0]).unwrap();
    assert_eq!(copy.start_time, 2.);

    state.undo();
    assert!(state.timeline().audio_clip(&copies[0]).is_none());
    state.redo();
    assert!(state.timeline().audio_clip(&copies[0]).is_some());
}

#[test]
fn test_operations_span_track_kinds() {
    let mut state = setup_controller();
    let audio = state.add_audio_clip(clip(1., 2.));
    let sticker = state.add_sticker("star", 4.);
    let text = state.add_text("title", 0.5);
    assert_eq!(state.timeline().kind_of(&sticker), Some(TrackKind::Sticker));

    state.click(&audio, false);
    state.click(&sticker, true);
    state.click(&text, true);
    assert_eq!(state.selection().len(), 3);

    // Earliest selected clip stops at zero
    state.move_selected(-2.);
    let timeline = state.timeline().clone();
    assert_eq!(timeline.text_clips[0].start_time, 0.);
    assert_eq!(timeline.audio_clips[0].start_time, 0.5);
    assert_eq!(timeline.sticker_clips[0].start_time, 3.5);

    state.click(&text, true);
    state.delete_selected();
    assert!(state.timeline().audio_clips.is_empty());
    assert!(state.timeline().sticker_clips.is_empty());
    assert_eq!(state.timeline().text_clips.len(), 1);
    assert!(state.selection().is_empty());
}

#[test]
fn test_drag_snaps_and_commits_once() {
    let mut state = setup_controller();
    let a = state.add_audio_clip(clip(3., 4.));
    let b = state.add_sticker("star", 10.);

    // Modifier click never starts a move
    state.click(&b, false);
    assert!(!state.begin_drag(&b, DragKind::Move, 10., true));
    assert!(state.begin_drag(&b, DragKind::TrimStart, 10., false));
    state.update_drag(9.);
    state.update_drag(7.05);
    assert_eq!(state.timeline().sticker_clips[0].start_time, 7.);
    state.finish_drag();

    state.undo();
    assert_eq!(state.timeline().sticker_clips[0].start_time, 10.);
    state.undo();
    assert!(state.timeline().sticker_clips.is_empty());
    assert_eq!(state.timeline().audio_clips[0].id, a);
}

#[test]
fn test_cancel_drag_restores() {
    let mut state = setup_controller();
    let id = state.add_audio_clip(clip(1., 2.));
    state.click(&id, false);
    assert!(state.begin_drag(&id, DragKind::Move, 1.5, false));
    state.update_drag(5.);
    assert_eq!(state.timeline().audio_clips[0].start_time, 4.5);
    state.cancel_drag();
    assert_eq!(state.timeline().audio_clips[0].start_time, 1.);
    assert!(!state.is_dragging());
    state.undo();
    assert!(state.timeline().audio_clips.is_empty());
}

#[test]
fn test_playback_follows_edits() {
    let mut state = setup_controller();
    let id = state.add_audio_clip(clip(0., 2.));
    state.wait_for_sources(TIMEOUT);

    state.play();
    assert!(state.is_playing());
    assert!(state.timeline().is_playing);
    assert_eq!(state.graph_manifest().clips.len(), 1);

    state.apply_preset(&id, "vocal_cleaner");
    let stages = state.graph_manifest().clips[0].1.stage_names();
    assert!(stages.contains(&"compressor"));

    state.delete_clips(&[id]);
    assert!(state.graph_manifest().clips.is_empty());

    state.pause();
    assert!(!state.timeline().is_playing);
}

#[test]
fn test_playback_stops_at_project_end() {
    let mut state = setup_controller();
    state.add_audio_clip(clip(0., 1.));
    state.wait_for_sources(TIMEOUT);
    state.seek(2.5);
    state.play();

    let mut block = vec![0.; 2 * 1024];
    for _ in 0..8 {
        state.render(&mut block);
    }
    assert!(!state.is_playing());
    assert!(state.current_time() >= 3.);

    // Playing again restarts from the beginning
    state.play();
    assert!(state.current_time() < 0.1);
}

#[test]
fn test_undo_keeps_transport() {
    let mut state = setup_controller();
    let id = state.add_audio_clip(clip(0., 2.));
    state.move_clip(&id, 1.);
    state.seek(1.5);
    state.undo();
    assert_eq!(state.timeline().current_time, 1.5);
    assert_eq!(state.timeline().audio_clips[0].start_time, 0.);
}

#[test]
fn test_master_and_fx_are_undoable() {
    let mut state = setup_controller();
    let id = state.add_audio_clip(clip(0., 2.));
    let fx = preset_by_id("radio").unwrap().fx;
    state.set_fx(&id, fx.clone());
    state.set_fx(&id, fx.clone());
    state.set_master(MasterConfig {
        volume: 0.5,
        ..Default::default()
    });
    assert_eq!(state.timeline().master.volume, 0.5);
    state.undo();
    assert_eq!(state.timeline().master.volume, 1.);
    state.undo();
    assert_eq!(state.timeline().audio_clips[0].fx, AudioFxState::default());
}

#[test]
fn test_export_stops_playback() {
    let mut state = setup_controller();
    state.add_audio_clip(clip(0., 1.));
    state.wait_for_sources(TIMEOUT);
    state.play();
    let wav = state
        .export(ExportOptions {
            sample_rate: SR,
            ..Default::default()
        })
        .unwrap();
    assert!(!state.is_playing());
    let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
    assert_eq!(reader.duration(), 3 * SR);
}

#[test]
fn test_background_export() {
    let mut state = setup_controller();
    state.add_audio_clip(clip(0., 1.));
    state.wait_for_sources(TIMEOUT);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.wav");
    let rx = state.export_in_background(
        path.clone(),
        ExportOptions {
            sample_rate: SR,
            ..Default::default()
        },
    );
    let last = rx.iter().last();
    assert_eq!(last, Some(ExportStatus::Done));
    assert!(path.exists());
}

#[test]
fn test_project_round_trip_resets_history() {
    let mut state = setup_controller();
    state.add_audio_clip(clip(0.5, 2.));
    state.add_text("title", 1.);
    let json = state.save_project().unwrap();

    let mut other = setup_controller();
    other.open_project(&json).unwrap();
    assert_eq!(other.timeline().audio_clips, state.timeline().audio_clips);
    assert_eq!(other.timeline().text_clips, state.timeline().text_clips);
    assert!(!other.can_undo());
}

#[test]
fn test_zoom_is_not_history() {
    let mut state = setup_controller();
    state.add_audio_clip(clip(0., 2.));
    state.set_zoom(400.);
    assert_eq!(state.timeline().pixels_per_second, 400.);
    assert_eq!(state.timeline().audio_clips[0].start_time, 0.);
    state.undo();
    assert_eq!(state.timeline().pixels_per_second, 400.);
    assert!(state.timeline().audio_clips.is_empty());
}

#[test]
fn test_beats_follow_moved_clips() {
    let mut state = setup_controller();
    state.set_snap_to_beats(true);
    let id = state.add_audio_clip(AudioClip::new("click.wav", 4., 0.));
    state.wait_for_sources(TIMEOUT);
    let beat = state.sources().get("click.wav").unwrap().beats[0];
    assert_eq!(state.snap(beat - 0.03, None), beat);

    state.move_clip(&id, 10.);
    assert_eq!(state.snap(beat - 0.03, None), beat - 0.03);
    assert_eq!(state.snap(10. + beat - 0.03, None), 10. + beat);

    state.delete_clips(&[id]);
    assert_eq!(state.snap(10. + beat - 0.03, None), 10. + beat - 0.03);
}

#[test]
fn test_snap_disabled() {
    let mut state = setup_controller();
    state.add_audio_clip(clip(0., 2.));
    assert_eq!(state.snap(2.05, None), 2.);
    state.set_snapping(false);
    assert_eq!(state.snap(2.05, None), 2.05);
}

#[test]
fn test_decode_during_drag_waits_for_cancel() {
    let mut state = setup_controller();
    let sticker = state.add_sticker("star", 10.);
    state.click(&sticker, false);
    assert!(state.begin_drag(&sticker, DragKind::Move, 10., false));
    state.update_drag(5.);

    state.add_audio_source("loop.wav", "Loop", 1.);
    state.wait_for_sources(TIMEOUT);
    assert!(state.timeline().audio_clips.is_empty());

    state.cancel_drag();
    assert_eq!(state.timeline().sticker_clips[0].start_time, 10.);
    assert_eq!(state.timeline().audio_clips.len(), 1);

    state.undo();
    assert!(state.timeline().audio_clips.is_empty());
    assert_eq!(state.timeline().sticker_clips[0].start_time, 10.);
}

#[test]
fn test_decode_during_drag_lands_after_commit() {
    let mut state = setup_controller();
    let sticker = state.add_sticker("star", 10.);
    state.click(&sticker, false);
    assert!(state.begin_drag(&sticker, DragKind::Move, 10., false));
    state.update_drag(5.);
    state.add_audio_source("loop.wav", "Loop", 1.);
    state.wait_for_sources(TIMEOUT);
    // History is locked while the pointer is down
    state.undo();
    assert_eq!(state.timeline().sticker_clips[0].start_time, 5.);

    state.finish_drag();
    assert_eq!(state.timeline().audio_clips.len(), 1);
    assert_eq!(state.timeline().sticker_clips[0].start_time, 5.);

    state.undo();
    assert!(state.timeline().audio_clips.is_empty());
    assert_eq!(state.timeline().sticker_clips[0].start_time, 5.);
    state.undo();
    assert_eq!(state.timeline().sticker_clips[0].start_time, 10.);
}

#[test]
fn test_removed_clip_cancels_its_load() {
    let mut state = setup_controller();
    let id = state.add_audio_clip(clip(0., 2.));
    assert!(state.is_loading("loop.wav"));
    state.delete_clips(&[id]);
    assert!(!state.is_loading("loop.wav"));

    state.undo();
    assert!(state.is_loading("loop.wav"));
    let events = state.wait_for_sources(TIMEOUT);
    assert!(events.contains(&LoadEvent::Ready("loop.wav".to_string())));
    assert!(state.sources().contains("loop.wav"));
}
