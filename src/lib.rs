//! Timeline audio core: clip intervals across audio, sticker and text
//! tracks, per clip effect graphs shared by live playback and offline
//! export, waveform peaks and WAV rendering.

pub mod analysis;
pub mod audio;
pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod waveform;
