//! Where rendered frames sit on the timeline.
//!
//! Both contexts map a clip start time to an absolute frame the same way:
//! the difference to the context's reference time, rounded to a frame.
//! Equal inputs therefore put clips on equal frames whether the mix is
//! heard live or written to a file.

pub trait RenderContext {
    fn sample_rate(&self) -> u32;
    /// Frame at which the next block is rendered
    fn current_frame(&self) -> i64;
    /// Timeline time, in seconds, of `current_frame`
    fn current_time(&self) -> f64;
    /// Frame at which a clip starting at `clip_start` seconds begins
    fn clip_start_frame(&self, clip_start: f64) -> i64;
}

fn seconds_to_frames(seconds: f64, sample_rate: u32) -> i64 {
    (seconds * sample_rate as f64).round() as i64
}

/// Device driven context. Frames keep counting while stopped; playback
/// anchors a playhead time to the frame it started at.
#[derive(Clone, Debug)]
pub struct LiveContext {
    sample_rate: u32,
    frame: i64,
    anchor_frame: i64,
    anchor_time: f64,
}

impl LiveContext {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frame: 0,
            anchor_frame: 0,
            anchor_time: 0.,
        }
    }

    /// Tie the timeline time `playhead` to the current frame
    pub fn anchor(&mut self, playhead: f64) {
        self.anchor_frame = self.frame;
        self.anchor_time = playhead;
    }

    pub fn advance(&mut self, frames: usize) {
        self.frame += frames as i64;
    }
}

impl RenderContext for LiveContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
    fn current_frame(&self) -> i64 {
        self.frame
    }
    fn current_time(&self) -> f64 {
        self.anchor_time + (self.frame - self.anchor_frame) as f64 / self.sample_rate as f64
    }
    fn clip_start_frame(&self, clip_start: f64) -> i64 {
        self.anchor_frame + seconds_to_frames(clip_start - self.anchor_time, self.sample_rate)
    }
}

/// Fixed window rendered as fast as possible. Frame 0 is `window_start`.
#[derive(Clone, Debug)]
pub struct OfflineContext {
    sample_rate: u32,
    window_start: f64,
    total_frames: usize,
    frame: i64,
}

impl OfflineContext {
    pub fn new(sample_rate: u32, window_start: f64, duration: f64) -> Self {
        Self {
            sample_rate,
            window_start,
            total_frames: seconds_to_frames(duration, sample_rate).max(0) as usize,
            frame: 0,
        }
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn remaining_frames(&self) -> usize {
        self.total_frames.saturating_sub(self.frame.max(0) as usize)
    }

    pub fn advance(&mut self, frames: usize) {
        self.frame += frames as i64;
    }
}

impl RenderContext for OfflineContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
    fn current_frame(&self) -> i64 {
        self.frame
    }
    fn current_time(&self) -> f64 {
        self.window_start + self.frame as f64 / self.sample_rate as f64
    }
    fn clip_start_frame(&self, clip_start: f64) -> i64 {
        seconds_to_frames(clip_start - self.window_start, self.sample_rate)
    }
}
