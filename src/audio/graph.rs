//! Effect state to processing stage manifest.
//!
//! [`build_graph`] is the only place where an [`AudioFxState`] is turned
//! into stages. Live playback and offline export both call it and then
//! instantiate the result with [`crate::audio::chain::ProcessingChain`], so
//! the two paths cannot drift apart. The manifest holds no absolute times:
//! the fade envelope is expressed in clip-local seconds.

use crate::core::fx::{AudioFxState, MasterConfig, RoomSize};
use serde::Serialize;

/// Q of the mid band
pub const PEAKING_Q: f32 = 1.;

/// Gain envelope of a clip in clip-local seconds
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FadeEnvelope {
    pub volume: f32,
    pub duration: f64,
    /// End of the fade in
    pub fade_in_end: f64,
    /// Start of the fade out
    pub fade_out_start: f64,
}

impl FadeEnvelope {
    pub fn new(volume: f32, duration: f64, fade_in: f32, fade_out: f32) -> Self {
        let duration = duration.max(0.);
        Self {
            volume,
            duration,
            fade_in_end: duration * fade_in as f64,
            fade_out_start: duration * (1. - fade_out as f64),
        }
    }

    /// Gain at clip-local `time`. Zero outside the clip.
    pub fn gain_at(&self, time: f64) -> f32 {
        if time < 0. || time >= self.duration {
            return 0.;
        }
        let volume = self.volume as f64;
        let gain = if time < self.fade_in_end {
            volume * time / self.fade_in_end
        } else if time > self.fade_out_start && self.fade_out_start < self.duration {
            volume * (self.duration - time) / (self.duration - self.fade_out_start)
        } else {
            volume
        };
        gain as f32
    }
}

/// One processing stage with its resolved parameters
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    NormalizeGain {
        gain: f32,
    },
    NoiseGate {
        threshold_db: f32,
        attack: f32,
        release: f32,
    },
    LowShelf {
        frequency: f32,
        gain_db: f32,
    },
    Peaking {
        frequency: f32,
        gain_db: f32,
        q: f32,
    },
    HighShelf {
        frequency: f32,
        gain_db: f32,
    },
    Compressor {
        threshold_db: f32,
        ratio: f32,
        attack: f32,
        release: f32,
        knee_db: f32,
    },
    Tape {
        saturation: f32,
        warmth: f32,
        noise: f32,
    },
    Reverb {
        room_size: RoomSize,
        decay: f32,
        wet: f32,
        dry: f32,
    },
    Stereo {
        width: f32,
        pan: f32,
    },
    TrackGain {
        envelope: FadeEnvelope,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::NormalizeGain { .. } => "normalize_gain",
            Stage::NoiseGate { .. } => "noise_gate",
            Stage::LowShelf { .. } => "low_shelf",
            Stage::Peaking { .. } => "peaking",
            Stage::HighShelf { .. } => "high_shelf",
            Stage::Compressor { .. } => "compressor",
            Stage::Tape { .. } => "tape",
            Stage::Reverb { .. } => "reverb",
            Stage::Stereo { .. } => "stereo",
            Stage::TrackGain { .. } => "track_gain",
        }
    }
}

/// Ordered stages of one clip
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EffectsGraph {
    pub stages: Vec<Stage>,
}

impl EffectsGraph {
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }
}

/// Everything [`build_graph`] needs about a clip
#[derive(Clone, Copy, Debug)]
pub struct GraphInput<'a> {
    pub fx: &'a AudioFxState,
    /// Clip duration in seconds
    pub duration: f64,
    /// Largest absolute sample of the decoded source
    pub source_peak: f32,
}

/// Gain bringing `peak` to full scale. A silent or invalid peak keeps unity.
pub fn normalize_gain(peak: f32) -> f32 {
    if peak > 0. && peak.is_finite() {
        1. / peak
    } else {
        1.
    }
}

/// Build the stage list of a clip.
///
/// Fixed order: normalize, noise gate, equalizer (low shelf, peaking, high
/// shelf), compressor, tape, reverb, stereo, track gain. Disabled effects
/// are left out instead of being bypassed.
pub fn build_graph(input: &GraphInput) -> EffectsGraph {
    let fx = input.fx.sanitized();
    let effects = &fx.premium_effects;
    let mut stages = Vec::new();

    if fx.normalize {
        stages.push(Stage::NormalizeGain {
            gain: normalize_gain(input.source_peak),
        });
    }
    if let Some(gate) = effects.noise_gate.as_ref().filter(|g| g.enabled) {
        stages.push(Stage::NoiseGate {
            threshold_db: gate.threshold,
            attack: gate.attack.max(0.),
            release: gate.release.max(0.),
        });
    }
    if let Some(eq) = effects.eq.as_ref().filter(|e| e.enabled) {
        stages.push(Stage::LowShelf {
            frequency: eq.low_freq,
            gain_db: eq.low_gain,
        });
        stages.push(Stage::Peaking {
            frequency: eq.mid_freq,
            gain_db: eq.mid_gain,
            q: PEAKING_Q,
        });
        stages.push(Stage::HighShelf {
            frequency: eq.high_freq,
            gain_db: eq.high_gain,
        });
    }
    if let Some(comp) = effects.compressor.as_ref().filter(|c| c.enabled) {
        stages.push(Stage::Compressor {
            threshold_db: comp.threshold,
            ratio: comp.ratio.max(1.),
            attack: comp.attack.max(0.),
            release: comp.release.max(0.),
            knee_db: comp.knee.max(0.),
        });
    }
    if let Some(tape) = effects.tape.as_ref().filter(|t| t.enabled) {
        stages.push(Stage::Tape {
            saturation: tape.saturation.clamp(0., 1.),
            warmth: tape.warmth.clamp(0., 1.),
            noise: tape.noise.clamp(0., 1.),
        });
    }
    if let Some(reverb) = effects.reverb.as_ref().filter(|r| r.enabled) {
        stages.push(Stage::Reverb {
            room_size: reverb.room_size,
            decay: reverb.decay.clamp(0., 1.),
            wet: reverb.wet_level.clamp(0., 1.),
            dry: reverb.dry_level.clamp(0., 1.),
        });
    }
    if let Some(stereo) = effects.stereo.as_ref().filter(|s| s.enabled) {
        stages.push(Stage::Stereo {
            width: stereo.width.clamp(-1., 1.),
            pan: stereo.pan.clamp(-1., 1.),
        });
    }
    stages.push(Stage::TrackGain {
        envelope: FadeEnvelope::new(fx.volume, input.duration, fx.fade_in, fx.fade_out),
    });

    EffectsGraph { stages }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum MasterStage {
    Gain { gain: f32 },
    Limiter { threshold_db: f32, release: f32 },
}

/// Stages of the shared output bus
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MasterGraph {
    pub stages: Vec<MasterStage>,
}

pub fn build_master_graph(master: &MasterConfig) -> MasterGraph {
    let mut stages = vec![MasterStage::Gain {
        gain: if master.volume.is_finite() {
            master.volume.max(0.)
        } else {
            1.
        },
    }];
    if master.limiter.enabled {
        stages.push(MasterStage::Limiter {
            threshold_db: master.limiter.threshold.min(0.),
            release: master.limiter.release.max(0.),
        });
    }
    MasterGraph { stages }
}

/// Stage manifest of a whole mix, comparable between playback and export
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MixManifest {
    /// `(clip id, graph)` in timeline order
    pub clips: Vec<(String, EffectsGraph)>,
    pub master: MasterGraph,
}

#[cfg(test)]
mod tests;
