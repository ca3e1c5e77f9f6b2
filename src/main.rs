use clipmix::{
    analysis::{FileAssetFetcher, SymphoniaDecoder},
    audio::export::{ExportOptions, ExportStatus},
    cache::LoadEvent,
    config::Config,
    core::state::TimelineController,
    waveform::{DEFAULT_PEAK_COUNT, peaks_from_bytes},
};
use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

const USAGE: &str = "Usage:
  clipmix export <project.json> <assets dir> <out.wav> [sample rate]
  clipmix peaks <audio file> [count]
  clipmix play <project.json> <assets dir>";

const LOAD_TIMEOUT: Duration = Duration::from_secs(120);

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("export") if args.len() >= 4 => export(&args[1], &args[2], &args[3], args.get(4)),
        Some("peaks") if args.len() >= 2 => peaks(&args[1], args.get(2)),
        Some("play") if args.len() >= 3 => play(&args[1], &args[2]),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };
    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

/// Controller with the project loaded and its sources decoded
fn open(project: &str, assets: &str, config: &Config) -> Result<TimelineController, Box<dyn Error>> {
    let mut controller = TimelineController::new(
        config,
        Arc::new(FileAssetFetcher::new(assets)),
        Arc::new(SymphoniaDecoder),
    );
    controller.open_project(&std::fs::read_to_string(project)?)?;
    for event in controller.wait_for_sources(LOAD_TIMEOUT) {
        if let LoadEvent::Failed(source) = event {
            log::warn!("{source} could not be loaded and stays silent");
        }
    }
    Ok(controller)
}

fn export(
    project: &str,
    assets: &str,
    out: &str,
    sample_rate: Option<&String>,
) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load();
    if let Some(rate) = sample_rate {
        config.sample_rate = rate.parse()?;
    }
    let mut controller = open(project, assets, &config)?;
    let status = controller.export_in_background(
        PathBuf::from(out),
        ExportOptions {
            sample_rate: config.sample_rate,
            ..Default::default()
        },
    );
    let mut last_percent = 0;
    for update in status {
        match update {
            ExportStatus::Processing(progress) => {
                let percent = (progress * 100.) as u32;
                if percent >= last_percent + 10 {
                    last_percent = percent;
                    log::info!("{percent}%");
                }
            }
            ExportStatus::Done => println!("Wrote {out}"),
            ExportStatus::Failed(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn peaks(path: &str, count: Option<&String>) -> Result<(), Box<dyn Error>> {
    let count = match count {
        Some(count) => count.parse()?,
        None => DEFAULT_PEAK_COUNT,
    };
    let bytes = std::fs::read(Path::new(path))?;
    let peaks = peaks_from_bytes(&SymphoniaDecoder, &bytes, count);
    println!("{}", serde_json::to_string(&peaks)?);
    Ok(())
}

#[cfg(feature = "device")]
fn play(project: &str, assets: &str) -> Result<(), Box<dyn Error>> {
    use clipmix::audio::output::DeviceOutput;

    let mut output = DeviceOutput::open_default(4096)?;
    let config = Config {
        sample_rate: output.sample_rate(),
        ..Config::load()
    };
    let mut controller = open(project, assets, &config)?;
    controller.play();
    while controller.is_playing() {
        output.pump(controller.engine_mut());
        controller.poll();
        if controller.current_time() >= controller.timeline().project_duration() {
            controller.pause();
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}

#[cfg(not(feature = "device"))]
fn play(_project: &str, _assets: &str) -> Result<(), Box<dyn Error>> {
    Err("playback needs the `device` feature".into())
}
