pub mod chain;
pub mod context;
pub mod dsp;
pub mod engine;
pub mod export;
pub mod graph;
#[cfg(feature = "device")]
pub mod output;
pub mod player;
pub mod resample;
