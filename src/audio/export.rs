use crate::{
    audio::{
        context::{OfflineContext, RenderContext},
        engine::Mixer,
        graph::MixManifest,
    },
    cache::SourceCache,
    core::timeline::Timeline,
    error::{RenderError, RenderResult},
};
use crossbeam::channel::Sender;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::{io::Cursor, path::Path};

const EXPORT_CHUNK: usize = 1024;
const CHANNELS: u16 = 2;
/// Longest window an export may cover, in frames per channel
pub const MAX_EXPORT_FRAMES: usize = 48_000 * 60 * 60 * 4;

#[derive(Clone, Debug, PartialEq)]
pub enum ExportStatus {
    Processing(f32),
    Done,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportOptions {
    pub sample_rate: u32,
    /// Window start on the timeline, in seconds
    pub start: f64,
    /// Window length. Defaults to the rest of the project.
    pub duration: Option<f64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            start: 0.,
            duration: None,
        }
    }
}

/// What an export would render, without rendering it
#[derive(Clone, Debug, PartialEq)]
pub struct ExportPlan {
    pub frames: usize,
    pub manifest: MixManifest,
}

/// Renders a window of a timeline offline through the same mixer as
/// playback.
pub struct ExportRenderer<'a> {
    timeline: &'a Timeline,
    sources: &'a SourceCache,
    options: ExportOptions,
}

impl<'a> ExportRenderer<'a> {
    pub fn new(timeline: &'a Timeline, sources: &'a SourceCache, options: ExportOptions) -> Self {
        Self {
            timeline,
            sources,
            options,
        }
    }

    fn context(&self) -> RenderResult<OfflineContext> {
        let ExportOptions {
            sample_rate,
            start,
            duration,
        } = self.options;
        if sample_rate == 0 {
            return Err(RenderError::InvalidSampleRate(sample_rate));
        }
        let duration = duration.unwrap_or(self.timeline.project_duration() - start);
        if !start.is_finite() || start < 0. || !duration.is_finite() || duration <= 0. {
            return Err(RenderError::InvalidWindow { start, duration });
        }
        let frames = (duration * sample_rate as f64).round();
        if frames > MAX_EXPORT_FRAMES as f64 {
            return Err(RenderError::TooLarge {
                frames: frames as usize,
            });
        }
        Ok(OfflineContext::new(sample_rate, start, duration))
    }

    fn mixer(&self, context: &OfflineContext) -> Mixer {
        let mut mixer = Mixer::new(context.sample_rate(), &self.timeline.master);
        let voices = mixer.schedule(&self.timeline.audio_clips, self.sources, context);
        log::debug!("Export scheduled {voices} voices");
        mixer
    }

    pub fn plan(&self) -> RenderResult<ExportPlan> {
        let context = self.context()?;
        Ok(ExportPlan {
            frames: context.total_frames(),
            manifest: self.mixer(&context).manifest(),
        })
    }

    /// Render the window into interleaved stereo samples
    pub fn render(&self, progress: Option<&Sender<ExportStatus>>) -> RenderResult<Vec<f32>> {
        let mut context = self.context()?;
        let mut mixer = self.mixer(&context);
        let total = context.total_frames();
        let mut output = vec![0.; total * CHANNELS as usize];

        log::info!(
            "Rendering {:.3}s from {:.3}s at {}Hz",
            total as f64 / context.sample_rate() as f64,
            context.current_time(),
            context.sample_rate()
        );
        let mut pos = 0;
        while pos < total {
            let frames = EXPORT_CHUNK.min(context.remaining_frames());
            let block = &mut output[pos * 2..(pos + frames) * 2];
            mixer.render(context.current_frame(), block);
            context.advance(frames);
            pos += frames;
            if let Some(progress) = progress {
                let _ = progress.send(ExportStatus::Processing(pos as f32 / total as f32));
            }
        }
        Ok(output)
    }

    /// Render the window and encode it as 16-bit PCM WAV
    pub fn render_wav(&self) -> RenderResult<Vec<u8>> {
        let samples = self.render(None)?;
        encode_wav(&samples, CHANNELS, self.options.sample_rate)
    }

    /// Render straight to a file, reporting progress and the outcome
    pub fn export_to_file(
        &self,
        path: &Path,
        progress: Option<&Sender<ExportStatus>>,
    ) -> RenderResult<()> {
        let result = self
            .render(progress)
            .and_then(|samples| encode_wav(&samples, CHANNELS, self.options.sample_rate))
            .and_then(|bytes| std::fs::write(path, bytes).map_err(RenderError::from));
        if let Some(progress) = progress {
            let _ = progress.send(match &result {
                Ok(()) => ExportStatus::Done,
                Err(err) => ExportStatus::Failed(err.to_string()),
            });
        }
        match &result {
            Ok(()) => log::info!("Exported {}", path.display()),
            Err(err) => log::error!("Export to {} failed: {err}", path.display()),
        }
        result
    }
}

fn to_i16(sample: f32) -> i16 {
    let sample = sample.clamp(-1., 1.);
    if sample < 0. {
        (sample * 32768.) as i16
    } else {
        (sample * 32767.) as i16
    }
}

/// Encode interleaved samples as a 16-bit PCM WAV file
pub fn encode_wav(samples: &[f32], channels: u16, sample_rate: u32) -> RenderResult<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    {
        let mut samples_writer = writer.get_i16_writer(samples.len() as u32);
        for sample in samples {
            samples_writer.write_sample(to_i16(*sample));
        }
        samples_writer.flush()?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}
