use serde::{Deserialize, Serialize};

/// Per-clip effect state. Fades are fractions of the clip duration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioFxState {
    pub volume: f32,
    pub fade_in: f32,
    pub fade_out: f32,
    pub normalize: bool,
    pub premium_effects: PremiumEffects,
}

impl Default for AudioFxState {
    fn default() -> Self {
        Self {
            volume: 1.,
            fade_in: 0.,
            fade_out: 0.,
            normalize: false,
            premium_effects: PremiumEffects::default(),
        }
    }
}

impl AudioFxState {
    /// Clamp every field to its valid range.
    ///
    /// Overlapping fades (`fade_in + fade_out > 1`) are scaled down
    /// proportionally so the fade-in keeps ending where the fade-out begins.
    pub fn sanitized(&self) -> Self {
        let mut fx = self.clone();
        fx.volume = finite_or(fx.volume, 1.).max(0.);
        fx.fade_in = finite_or(fx.fade_in, 0.).clamp(0., 1.);
        fx.fade_out = finite_or(fx.fade_out, 0.).clamp(0., 1.);
        let total = fx.fade_in + fx.fade_out;
        if total > 1. {
            fx.fade_in /= total;
            fx.fade_out /= total;
        }
        fx
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Optional effects. A missing or disabled effect is left out of the chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PremiumEffects {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq: Option<EqSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressor: Option<CompressorSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverb: Option<ReverbSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stereo: Option<StereoSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tape: Option<TapeSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_gate: Option<NoiseGateSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limiter: Option<LimiterSettings>,
}

/// Three band equalizer. Gains in dB, frequencies in Hz.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqSettings {
    pub enabled: bool,
    pub low_gain: f32,
    pub mid_gain: f32,
    pub high_gain: f32,
    #[serde(default = "default_low_freq")]
    pub low_freq: f32,
    #[serde(default = "default_mid_freq")]
    pub mid_freq: f32,
    #[serde(default = "default_high_freq")]
    pub high_freq: f32,
}

fn default_low_freq() -> f32 {
    200.
}
fn default_mid_freq() -> f32 {
    2000.
}
fn default_high_freq() -> f32 {
    8000.
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressorSettings {
    pub enabled: bool,
    /// dB
    pub threshold: f32,
    pub ratio: f32,
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub release: f32,
    /// dB
    pub knee: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomSize {
    Small,
    Medium,
    Large,
    Hall,
}

impl RoomSize {
    /// Scale applied to the reverb delay lines
    pub fn scale(&self) -> f32 {
        match self {
            RoomSize::Small => 0.4,
            RoomSize::Medium => 0.7,
            RoomSize::Large => 1.,
            RoomSize::Hall => 1.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverbSettings {
    pub enabled: bool,
    pub room_size: RoomSize,
    pub wet_level: f32,
    pub dry_level: f32,
    pub decay: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StereoSettings {
    pub enabled: bool,
    /// -1 is mono, 0 leaves the image untouched, 1 doubles the side signal
    pub width: f32,
    /// -1 left, 1 right
    pub pan: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapeSettings {
    pub enabled: bool,
    pub saturation: f32,
    pub warmth: f32,
    pub noise: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseGateSettings {
    pub enabled: bool,
    /// dB
    pub threshold: f32,
    pub attack: f32,
    pub release: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimiterSettings {
    pub enabled: bool,
    /// dB
    pub threshold: f32,
    /// Seconds
    pub release: f32,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: -1.,
            release: 0.01,
        }
    }
}

/// Settings of the bus every clip is mixed into
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterConfig {
    pub volume: f32,
    pub limiter: LimiterSettings,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: 1.,
            limiter: LimiterSettings::default(),
        }
    }
}

/// Named effect configuration
#[derive(Clone, Debug, PartialEq)]
pub struct FxPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub fx: AudioFxState,
}

fn eq(low: f32, mid: f32, high: f32, freqs: (f32, f32, f32)) -> Option<EqSettings> {
    Some(EqSettings {
        enabled: true,
        low_gain: low,
        mid_gain: mid,
        high_gain: high,
        low_freq: freqs.0,
        mid_freq: freqs.1,
        high_freq: freqs.2,
    })
}

fn compressor(threshold: f32, ratio: f32, attack: f32, release: f32, knee: f32) -> Option<CompressorSettings> {
    Some(CompressorSettings {
        enabled: true,
        threshold,
        ratio,
        attack,
        release,
        knee,
    })
}

fn tape(saturation: f32, warmth: f32, noise: f32) -> Option<TapeSettings> {
    Some(TapeSettings {
        enabled: true,
        saturation,
        warmth,
        noise,
    })
}

fn reverb(room_size: RoomSize, wet_level: f32, dry_level: f32, decay: f32) -> Option<ReverbSettings> {
    Some(ReverbSettings {
        enabled: true,
        room_size,
        wet_level,
        dry_level,
        decay,
    })
}

fn stereo(width: f32) -> Option<StereoSettings> {
    Some(StereoSettings {
        enabled: true,
        width,
        pan: 0.,
    })
}

fn preset(id: &'static str, label: &'static str, premium_effects: PremiumEffects) -> FxPreset {
    FxPreset {
        id,
        label,
        fx: AudioFxState {
            premium_effects,
            ..Default::default()
        },
    }
}

/// Every built-in preset, in display order
pub fn presets() -> Vec<FxPreset> {
    let mut vocal_cleaner = preset(
        "vocal_cleaner",
        "Vocal Cleaner",
        PremiumEffects {
            eq: eq(-3., 3., 2., (200., 2000., 8000.)),
            compressor: compressor(-12., 4., 0.003, 0.1, 2.),
            noise_gate: Some(NoiseGateSettings {
                enabled: true,
                threshold: -40.,
                attack: 0.001,
                release: 0.05,
            }),
            ..Default::default()
        },
    );
    vocal_cleaner.fx.fade_in = 0.05;
    vocal_cleaner.fx.fade_out = 0.05;
    vocal_cleaner.fx.normalize = true;

    vec![
        vocal_cleaner,
        preset(
            "phone",
            "Phone",
            PremiumEffects {
                eq: eq(-20., 8., -15., (300., 2000., 4000.)),
                tape: tape(0.3, 0.2, 0.1),
                ..Default::default()
            },
        ),
        preset(
            "radio",
            "Radio",
            PremiumEffects {
                eq: eq(-10., 5., -8., (400., 2500., 5000.)),
                tape: tape(0.4, 0.3, 0.15),
                compressor: compressor(-8., 6., 0.002, 0.08, 3.),
                ..Default::default()
            },
        ),
        preset(
            "tape",
            "Tape",
            PremiumEffects {
                tape: tape(0.6, 0.5, 0.2),
                eq: eq(2., -1., -3., (200., 2000., 8000.)),
                ..Default::default()
            },
        ),
        preset(
            "bass_boost",
            "Bass Boost",
            PremiumEffects {
                eq: eq(12., 0., 0., (100., 2000., 8000.)),
                compressor: compressor(-6., 3., 0.01, 0.1, 2.),
                ..Default::default()
            },
        ),
        preset(
            "hall_reverb",
            "Hall Reverb",
            PremiumEffects {
                reverb: reverb(RoomSize::Hall, 0.4, 0.6, 0.8),
                ..Default::default()
            },
        ),
        preset(
            "small_room",
            "Small Room",
            PremiumEffects {
                reverb: reverb(RoomSize::Small, 0.2, 0.8, 0.3),
                ..Default::default()
            },
        ),
        preset(
            "wide_stereo",
            "Wide Stereo",
            PremiumEffects {
                stereo: stereo(1.),
                ..Default::default()
            },
        ),
        preset(
            "mono",
            "Mono",
            PremiumEffects {
                stereo: stereo(-1.),
                ..Default::default()
            },
        ),
    ]
}

pub fn preset_by_id(id: &str) -> Option<FxPreset> {
    presets().into_iter().find(|p| p.id == id)
}
