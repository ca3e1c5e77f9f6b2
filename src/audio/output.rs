use crate::{audio::player::PlaybackEngine, error::OutputError};
use cpal::{
    BufferSize, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use rtrb::{Consumer, Producer, RingBuffer};

const BLOCK_FRAMES: usize = 256;

/// Default output device fed from a ring buffer.
///
/// The device callback only pops samples. Rendering happens on the thread
/// that owns the [`PlaybackEngine`], through [`DeviceOutput::pump`].
pub struct DeviceOutput {
    _stream: Stream,
    samples: Producer<f32>,
    sample_rate: u32,
    block: Vec<f32>,
}

impl DeviceOutput {
    /// Open the default device with room for `buffer_frames` stereo frames
    pub fn open_default(buffer_frames: usize) -> Result<Self, OutputError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
        let sample_rate = device.default_output_config()?.sample_rate();
        let config = StreamConfig {
            channels: 2,
            sample_rate,
            buffer_size: BufferSize::Default,
        };

        let (producer, mut consumer): (Producer<f32>, Consumer<f32>) =
            RingBuffer::new(buffer_frames.max(BLOCK_FRAMES) * 2);
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for sample in data.iter_mut() {
                    *sample = consumer.pop().unwrap_or(0.);
                }
            },
            |err| log::error!("Output stream error: {err}"),
            None,
        )?;
        stream.play()?;
        log::info!("Opened output device at {}Hz", sample_rate.0);

        Ok(Self {
            _stream: stream,
            samples: producer,
            sample_rate: sample_rate.0,
            block: vec![0.; BLOCK_FRAMES * 2],
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render blocks until the ring buffer is full. Returns rendered frames.
    pub fn pump(&mut self, engine: &mut PlaybackEngine) -> usize {
        let mut rendered = 0;
        while self.samples.slots() >= self.block.len() {
            engine.render(&mut self.block);
            for sample in &self.block {
                let _ = self.samples.push(*sample);
            }
            rendered += BLOCK_FRAMES;
        }
        rendered
    }
}
