//! Frame commands
//!
//! Every command is a flat unit of per-frame parameters plus one behaviour,
//! [`Command::process`]. The [`CommandType`] discriminator only feeds logs
//! and metrics; nothing branches on it.
//!
//! Commands never outlive a frame. Anything that must survive to the next
//! frame (a voice's decode cursor, an effect's envelopes) is borrowed from
//! its long-lived owner for the lifetime of the command list.

use std::time::Duration;

use crate::command_list::FrameContext;

mod data_source;
mod device_sink;
mod limiter;
mod mix;

pub use data_source::{DataSourceCommand, DataSourceVersion};
pub use device_sink::DeviceSinkCommand;
pub use limiter::{LimiterCommand, LimiterVersion};
pub use mix::{
    ClearMixBufferCommand, CopyMixBufferCommand, MixCommand, MixRampCommand, VolumeCommand,
    VolumeRampCommand,
};

/// Identifier of the renderer node that emitted a command
pub type NodeId = u32;

/// Command kind, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Invalid,
    PcmInt16DataSourceVersion1,
    PcmInt16DataSourceVersion2,
    PcmFloatDataSourceVersion1,
    PcmFloatDataSourceVersion2,
    AdpcmDataSourceVersion1,
    AdpcmDataSourceVersion2,
    Volume,
    VolumeRamp,
    Mix,
    MixRamp,
    ClearMixBuffer,
    CopyMixBuffer,
    LimiterVersion1,
    LimiterVersion2,
    DeviceSink,
}

/// Fields every command carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandHeader {
    /// Disabled commands are skipped by the executor
    pub enabled: bool,
    pub node_id: NodeId,
    /// Budget assigned by the builder; zero means unbudgeted
    pub estimated_processing_time: Duration,
}

impl CommandHeader {
    /// Enabled header with no budget
    pub fn new(node_id: NodeId) -> Self {
        Self {
            enabled: true,
            node_id,
            estimated_processing_time: Duration::ZERO,
        }
    }

    pub fn with_estimate(mut self, estimate: Duration) -> Self {
        self.estimated_processing_time = estimate;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// One operation of a command list
pub trait Command {
    fn header(&self) -> &CommandHeader;

    fn command_type(&self) -> CommandType;

    /// Do the command's work against the frame's buffer pool
    fn process(&mut self, context: &mut FrameContext<'_>);

    fn enabled(&self) -> bool {
        self.header().enabled
    }

    fn node_id(&self) -> NodeId {
        self.header().node_id
    }

    fn estimated_processing_time(&self) -> Duration {
        self.header().estimated_processing_time
    }
}
