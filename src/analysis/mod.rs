pub mod beats;

use crate::error::{DecodeError, DecodeResult, FetchError};
use dashmap::DashMap;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Samples of a decoded source, one vector per channel
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAudio {
    pub channel_data: Vec<Vec<f32>>,
    pub sample_rate: u32,
    /// Seconds
    pub duration: f64,
}

impl DecodedAudio {
    /// Channels longer than the shortest one are cut to its length
    pub fn new(mut channel_data: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frames = channel_data.iter().map(Vec::len).min().unwrap_or(0);
        for channel in channel_data.iter_mut() {
            channel.truncate(frames);
        }
        let duration = if sample_rate > 0 {
            frames as f64 / sample_rate as f64
        } else {
            0.
        };
        Self {
            channel_data,
            sample_rate,
            duration,
        }
    }

    pub fn channels(&self) -> usize {
        self.channel_data.len()
    }

    /// Frames readable on every channel
    pub fn frames(&self) -> usize {
        self.channel_data.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// Largest absolute sample over every channel
    pub fn peak(&self) -> f32 {
        self.channel_data
            .iter()
            .flat_map(|c| c.iter())
            .fold(0., |peak: f32, s| peak.max(s.abs()))
    }
}

/// Turns encoded media bytes into samples.
pub trait MediaDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> DecodeResult<DecodedAudio>;
}

/// Fetches the raw bytes of a source by reference.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reads sources from files under a root directory
pub struct FileAssetFetcher {
    root: PathBuf,
}

impl FileAssetFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetFetcher for FileAssetFetcher {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, FetchError> {
        let relative = Path::new(source_id);
        // Only plain relative paths below the root
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FetchError::NotFound(source_id.to_string()));
        }
        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(FetchError::NotFound(source_id.to_string()));
        }
        Ok(std::fs::read(path)?)
    }
}

/// Sources kept in memory, keyed by id
#[derive(Default)]
pub struct MemoryAssetFetcher {
    assets: DashMap<String, Vec<u8>>,
}

impl MemoryAssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, source_id: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(source_id.into(), bytes);
    }
}

impl AssetFetcher for MemoryAssetFetcher {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, FetchError> {
        self.assets
            .get(source_id)
            .map(|bytes| bytes.value().clone())
            .ok_or_else(|| FetchError::NotFound(source_id.to_string()))
    }
}

/// Decoder backed by symphonia's default codecs and formats
#[derive(Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl MediaDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8]) -> DecodeResult<DecodedAudio> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
        let probed = symphonia::default::get_probe().format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoTrack)?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or(DecodeError::MissingSampleRate)?;
        let mut decoder =
            symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

        let mut channels: Vec<Vec<f32>> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(_)) => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(err) => return Err(err.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(audio_buf) => {
                    let count = audio_buf.spec().channels.count();
                    if channels.len() < count {
                        channels.resize(count, Vec::new());
                    }
                    for (channel, samples) in channels.iter_mut().enumerate().take(count) {
                        normalize_buffer(&audio_buf, samples, channel);
                    }
                }
                // Corrupt packet, skip it
                Err(SymphoniaError::DecodeError(err)) => {
                    log::debug!("Skipping undecodable packet: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let decoded = DecodedAudio::new(channels, sample_rate);
        if decoded.frames() == 0 {
            return Err(DecodeError::Empty);
        }
        Ok(decoded)
    }
}

/// Append `channel` of `audio_buf` to `sample_buffer` as f32 in [-1, 1].
fn normalize_buffer(audio_buf: &AudioBufferRef, sample_buffer: &mut Vec<f32>, channel: usize) {
    match audio_buf {
        AudioBufferRef::U8(buf) => sample_buffer.extend(
            buf.chan(channel)
                .iter()
                .map(|&sample| (sample as f32 - 128.0) / 128.0),
        ),
        AudioBufferRef::U16(buf) => sample_buffer.extend(
            buf.chan(channel)
                .iter()
                .map(|&sample| (sample as f32 - 32768.0) / 32768.0),
        ),
        AudioBufferRef::U24(buf) => sample_buffer.extend(
            buf.chan(channel)
                .iter()
                .map(|&sample| (sample.inner() as f32 - 8_388_608.0) / 8_388_608.0),
        ),
        AudioBufferRef::U32(buf) => sample_buffer.extend(
            buf.chan(channel)
                .iter()
                .map(|&sample| (sample as f32 - 2_147_483_648.0) / 2_147_483_648.0),
        ),
        AudioBufferRef::S8(buf) => sample_buffer.extend(
            buf.chan(channel)
                .iter()
                .map(|&sample| sample as f32 / -(i8::MIN as f32)),
        ),
        AudioBufferRef::S16(buf) => sample_buffer.extend(
            buf.chan(channel)
                .iter()
                .map(|&sample| sample as f32 / -(i16::MIN as f32)),
        ),
        AudioBufferRef::S24(buf) => sample_buffer.extend(
            buf.chan(channel)
                .iter()
                .map(|&sample| sample.inner() as f32 / (1 << 23) as f32),
        ),
        AudioBufferRef::S32(buf) => sample_buffer.extend(
            buf.chan(channel)
                .iter()
                .map(|&sample| sample as f32 / -(i32::MIN as f32)),
        ),
        AudioBufferRef::F32(buf) => sample_buffer.extend_from_slice(buf.chan(channel)),
        AudioBufferRef::F64(buf) => {
            sample_buffer.extend(buf.chan(channel).iter().map(|&sample| sample as f32))
        }
    }
}

#[cfg(test)]
mod tests;
