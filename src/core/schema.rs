//! Versioned project documents.
//!
//! Version 1 documents carry the legacy audio clip shape: loose volume and
//! mute fields, fades in seconds and effects picked by preset name. They are
//! upgraded once, here, so the rest of the crate only ever sees
//! [`AudioFxState`].

use crate::{
    core::{
        clip::AudioClip,
        fx::{AudioFxState, MasterConfig, preset_by_id},
        sticker::{StickerClip, TextClip},
        timeline::Timeline,
    },
    error::ProjectError,
};
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u64 = 2;

#[derive(Serialize, Deserialize)]
struct ProjectDocument {
    version: u64,
    timeline: Timeline,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyProject {
    #[serde(default)]
    audio_clips: Vec<LegacyAudioClip>,
    #[serde(default)]
    sticker_clips: Vec<StickerClip>,
    #[serde(default)]
    text_clips: Vec<TextClip>,
    #[serde(default)]
    animation_max_duration: f64,
    #[serde(default)]
    master: Option<MasterConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAudioClip {
    id: String,
    audio_source_id: String,
    #[serde(default)]
    name: Option<String>,
    start_time: f64,
    duration: f64,
    #[serde(default)]
    offset_in_source: Option<f64>,
    #[serde(default)]
    source_duration: Option<f64>,
    #[serde(default)]
    volume: Option<f32>,
    /// Seconds
    #[serde(default)]
    fade_in: Option<f64>,
    /// Seconds
    #[serde(default)]
    fade_out: Option<f64>,
    #[serde(default)]
    normalize: Option<bool>,
    #[serde(default)]
    eq_preset: Option<String>,
    #[serde(default)]
    reverb_preset: Option<String>,
    #[serde(default)]
    pitch: Option<f32>,
    #[serde(default)]
    speed: Option<f32>,
    #[serde(default)]
    muted: Option<bool>,
}

/// Parse a project document of any supported version.
pub fn load_project(json: &str) -> Result<Timeline, ProjectError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .unwrap_or(1);

    match version {
        1 => {
            let legacy: LegacyProject = serde_json::from_value(value)?;
            log::info!(
                "Upgrading project from version 1 ({} audio clips)",
                legacy.audio_clips.len()
            );
            Ok(upgrade_v1(legacy))
        }
        CURRENT_VERSION => {
            let document: ProjectDocument = serde_json::from_value(value)?;
            Ok(document.timeline)
        }
        other => Err(ProjectError::UnsupportedVersion(other)),
    }
}

/// Serialize a timeline as a current version document.
pub fn save_project(timeline: &Timeline) -> Result<String, ProjectError> {
    let document = ProjectDocument {
        version: CURRENT_VERSION,
        timeline: Timeline {
            is_playing: false,
            ..timeline.clone()
        },
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

fn upgrade_v1(legacy: LegacyProject) -> Timeline {
    Timeline {
        audio_clips: legacy.audio_clips.into_iter().map(upgrade_clip).collect(),
        sticker_clips: legacy.sticker_clips,
        text_clips: legacy.text_clips,
        animation_max_duration: legacy.animation_max_duration,
        master: legacy.master.unwrap_or_default(),
        ..Default::default()
    }
}

fn upgrade_clip(clip: LegacyAudioClip) -> AudioClip {
    let fraction_of = |seconds: Option<f64>| match seconds {
        Some(s) if clip.duration > 0. => (s / clip.duration) as f32,
        _ => 0.,
    };

    let mut fx = AudioFxState {
        volume: if clip.muted.unwrap_or(false) {
            0.
        } else {
            clip.volume.filter(|v| *v > 0.).unwrap_or(1.)
        },
        fade_in: fraction_of(clip.fade_in),
        fade_out: fraction_of(clip.fade_out),
        normalize: clip.normalize.unwrap_or(false),
        ..Default::default()
    };

    if let Some(name) = clip.eq_preset.as_deref().and_then(legacy_preset_id) {
        fx.premium_effects.eq = preset_by_id(name).and_then(|p| p.fx.premium_effects.eq);
    }
    if let Some(name) = clip.reverb_preset.as_deref().and_then(legacy_preset_id) {
        fx.premium_effects.reverb = preset_by_id(name).and_then(|p| p.fx.premium_effects.reverb);
    }
    if clip.pitch.is_some_and(|p| p != 1.) || clip.speed.is_some_and(|s| s != 1.) {
        log::warn!("Clip {}: pitch and speed are no longer supported", clip.id);
    }

    let offset = clip.offset_in_source.unwrap_or(0.).max(0.);
    let source_duration = clip
        .source_duration
        .unwrap_or(offset + clip.duration)
        .max(offset + clip.duration);

    AudioClip {
        id: clip.id,
        source_id: clip.audio_source_id,
        source_name: clip.name.unwrap_or_default(),
        start_time: clip.start_time.max(0.),
        duration: clip.duration,
        offset_in_source: offset,
        source_duration,
        fx: fx.sanitized(),
    }
}

/// Map a legacy preset name to a built-in preset id.
fn legacy_preset_id(name: &str) -> Option<&'static str> {
    let id = match name {
        "none" | "" => return None,
        "bass" | "bass_boost" => "bass_boost",
        "noise_cut" | "vocal" | "vocal_cleaner" => "vocal_cleaner",
        "phone" => "phone",
        "radio" => "radio",
        "tape" => "tape",
        "small" | "room" | "small_room" => "small_room",
        "hall" | "space" | "hall_reverb" => "hall_reverb",
        other => {
            log::warn!("Unknown legacy preset '{other}', ignoring");
            return None;
        }
    };
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fx::RoomSize;

    const LEGACY: &str = r#"{
        "audioClips": [{
            "id": "c1",
            "audioSourceId": "voice.wav",
            "startTime": 1.5,
            "duration": 4,
            "offsetInSource": 0.5,
            "volume": 0.8,
            "fadeIn": 1,
            "fadeOut": 2,
            "eqPreset": "bass",
            "reverbPreset": "hall"
        }, {
            "id": "c2",
            "audioSourceId": "music.wav",
            "startTime": 0,
            "duration": 2,
            "muted": true,
            "eqPreset": "mystery"
        }],
        "animationMaxDuration": 12
    }"#;

    #[test]
    fn test_upgrade_legacy_clip() {
        let timeline = load_project(LEGACY).unwrap();
        assert_eq!(timeline.animation_max_duration, 12.);
        let clip = &timeline.audio_clips[0];
        assert_eq!(clip.source_id, "voice.wav");
        assert_eq!(clip.source_duration, 4.5);
        assert_eq!(clip.fx.volume, 0.8);
        assert_eq!(clip.fx.fade_in, 0.25);
        assert_eq!(clip.fx.fade_out, 0.5);

        let effects = &clip.fx.premium_effects;
        assert_eq!(effects.eq.as_ref().unwrap().low_gain, 12.);
        assert_eq!(effects.reverb.as_ref().unwrap().room_size, RoomSize::Hall);
        // Only the named parts of the presets are carried over
        assert!(effects.compressor.is_none());
    }

    #[test]
    fn test_upgrade_muted_and_unknown_preset() {
        let timeline = load_project(LEGACY).unwrap();
        let clip = &timeline.audio_clips[1];
        assert_eq!(clip.fx.volume, 0.);
        assert!(clip.fx.premium_effects.eq.is_none());
    }

    #[test]
    fn test_current_version_round_trip() {
        let mut timeline = load_project(LEGACY).unwrap();
        timeline.is_playing = true;
        let json = save_project(&timeline).unwrap();
        let loaded = load_project(&json).unwrap();
        assert!(!loaded.is_playing);
        assert_eq!(loaded.audio_clips, timeline.audio_clips);
    }

    #[test]
    fn test_unsupported_version() {
        let result = load_project(r#"{"version": 7, "timeline": {}}"#);
        assert!(matches!(result, Err(ProjectError::UnsupportedVersion(7))));
        assert!(matches!(load_project("not json"), Err(ProjectError::Json(_))));
    }
}
