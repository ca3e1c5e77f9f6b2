use crate::audio::graph::{
    FadeEnvelope, GraphInput, MasterStage, Stage, build_graph, build_master_graph,
    normalize_gain,
};
use crate::core::fx::{
    AudioFxState, CompressorSettings, MasterConfig, ReverbSettings, RoomSize, preset_by_id,
};

fn graph_of(fx: &AudioFxState) -> Vec<&'static str> {
    build_graph(&GraphInput {
        fx,
        duration: 10.,
        source_peak: 0.5,
    })
    .stage_names()
}

#[test]
fn test_plain_clip_has_only_track_gain() {
    assert_eq!(graph_of(&AudioFxState::default()), vec!["track_gain"]);
}

#[test]
fn test_stage_order() {
    let mut fx = preset_by_id("vocal_cleaner").unwrap().fx;
    let effects = &mut fx.premium_effects;
    effects.tape = preset_by_id("tape").unwrap().fx.premium_effects.tape;
    effects.reverb = preset_by_id("small_room").unwrap().fx.premium_effects.reverb;
    effects.stereo = preset_by_id("wide_stereo").unwrap().fx.premium_effects.stereo;

    assert_eq!(
        graph_of(&fx),
        vec![
            "normalize_gain",
            "noise_gate",
            "low_shelf",
            "peaking",
            "high_shelf",
            "compressor",
            "tape",
            "reverb",
            "stereo",
            "track_gain"
        ]
    );
}

#[test]
fn test_disabled_stages_are_omitted() {
    let mut fx = AudioFxState::default();
    fx.premium_effects.compressor = Some(CompressorSettings {
        enabled: false,
        threshold: -10.,
        ratio: 4.,
        attack: 0.01,
        release: 0.1,
        knee: 2.,
    });
    fx.premium_effects.reverb = Some(ReverbSettings {
        enabled: true,
        room_size: RoomSize::Large,
        wet_level: 0.3,
        dry_level: 0.7,
        decay: 0.5,
    });
    assert_eq!(graph_of(&fx), vec!["reverb", "track_gain"]);
}

#[test]
fn test_normalize_gain() {
    assert_eq!(normalize_gain(0.5), 2.);
    assert_eq!(normalize_gain(0.), 1.);
    assert_eq!(normalize_gain(f32::NAN), 1.);

    let fx = AudioFxState {
        normalize: true,
        ..Default::default()
    };
    let graph = build_graph(&GraphInput {
        fx: &fx,
        duration: 1.,
        source_peak: 0.,
    });
    assert_eq!(graph.stages[0], Stage::NormalizeGain { gain: 1. });
}

#[test]
fn test_identical_state_gives_identical_graph() {
    let fx = preset_by_id("radio").unwrap().fx;
    let input = GraphInput {
        fx: &fx,
        duration: 4.,
        source_peak: 0.8,
    };
    assert_eq!(build_graph(&input), build_graph(&input));
}

#[test]
fn test_fade_envelope_shape() {
    let envelope = FadeEnvelope::new(0.8, 10., 0.2, 0.3);
    assert_eq!(envelope.gain_at(-0.1), 0.);
    assert_eq!(envelope.gain_at(0.), 0.);
    assert!((envelope.gain_at(1.) - 0.4).abs() < 1e-6);
    assert!((envelope.gain_at(2.) - 0.8).abs() < 1e-6);
    assert!((envelope.gain_at(5.) - 0.8).abs() < 1e-6);
    assert!((envelope.gain_at(8.5) - 0.4).abs() < 1e-6);
    assert_eq!(envelope.gain_at(10.), 0.);
}

#[test]
fn test_fade_envelope_without_fades() {
    let envelope = FadeEnvelope::new(0.5, 2., 0., 0.);
    assert_eq!(envelope.gain_at(0.), 0.5);
    assert_eq!(envelope.gain_at(1.999), 0.5);
}

#[test]
fn test_overlapping_fades_meet() {
    let fx = AudioFxState {
        fade_in: 0.75,
        fade_out: 0.75,
        ..Default::default()
    };
    let graph = build_graph(&GraphInput {
        fx: &fx,
        duration: 4.,
        source_peak: 1.,
    });
    let Some(Stage::TrackGain { envelope }) = graph.stages.last() else {
        panic!("missing track gain");
    };
    assert_eq!(envelope.fade_in_end, 2.);
    assert_eq!(envelope.fade_out_start, 2.);
    assert!((envelope.gain_at(2.) - 1.).abs() < 1e-6);
}

#[test]
fn test_master_graph() {
    let graph = build_master_graph(&MasterConfig::default());
    assert_eq!(
        graph.stages,
        vec![
            MasterStage::Gain { gain: 1. },
            MasterStage::Limiter {
                threshold_db: -1.,
                release: 0.01
            }
        ]
    );

    let mut master = MasterConfig::default();
    master.limiter.enabled = false;
    assert_eq!(build_master_graph(&master).stages.len(), 1);
}
