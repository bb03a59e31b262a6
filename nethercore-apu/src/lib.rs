//! Nethercore APU - audio processor frame executor
//!
//! Emulates the console's audio mixing hardware. Once per frame (5 ms) an
//! ordered [`CommandList`] runs against a shared [`BufferPool`]: data source
//! commands decode and resample voices, mix and effect commands combine them
//! on the mix buses, and the device sink hands the result to an
//! [`OutputSink`].
//!
//! Long-lived state (each voice's [`VoiceUpdateState`], each effect's
//! [`LimiterState`]) belongs to the caller and is borrowed by the frame's
//! commands; commands themselves live for one frame.

pub mod command;
pub mod command_list;
pub mod config;
pub mod effect;
pub mod memory;
pub mod render_thread;
pub mod sink;
pub mod voice;

pub use command::{Command, CommandHeader, CommandType, NodeId};
pub use command_list::{BufferPool, CommandList, CommandTiming, FrameContext, FrameReport};
pub use config::{ApuConfig, ConfigError};
pub use effect::{LimiterParameter, LimiterState, LimiterStatistics, UsageState};
pub use memory::{GuestMemory, GuestRam};
pub use render_thread::{
    FrameRenderer, RenderThread, RenderThreadError, RenderThreadHandle, SendOutcome,
};
pub use sink::{NullSink, OutputSink, RingBufferSink};
pub use voice::{
    SampleFormat, SrcQuality, VoiceParameters, VoiceUpdateState, WaveBuffer,
    WaveBufferInformation,
};

/// Maximum channels per voice (and per effect)
pub const VOICE_CHANNEL_COUNT_MAX: usize = 6;

pub use voice::{PITCH_MAX_LENGTH, SCRATCH_BUFFER_SIZE, VOICE_WAVE_BUFFER_COUNT};
