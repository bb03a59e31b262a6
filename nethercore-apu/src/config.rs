//! Audio processor configuration (`apu.toml`)
//!
//! Frame geometry and diagnostics settings, stored as TOML and organized into
//! sections. Missing keys fall back to the hardware defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::voice::SrcQuality;

/// Sample rates the processor can run at
pub const SUPPORTED_SAMPLE_RATES: [u32; 2] = [32000, 48000];

/// Frames per second (5 ms frames)
pub const FRAMES_PER_SECOND: u32 = 200;

/// Errors produced while loading or validating a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unsupported sample rate {0} (expected 32000 or 48000)")]
    UnsupportedSampleRate(u32),

    #[error("sample count {sample_count} does not match {sample_rate} Hz / 200")]
    SampleCountMismatch { sample_rate: u32, sample_count: u32 },

    #[error("mix buffer count must be non-zero")]
    NoMixBuffers,
}

/// Audio processor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ApuConfig {
    /// Frame geometry and voice settings
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Timing instrumentation settings
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Frame geometry and buffer pool layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Output sample rate (default: 48000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Samples per frame per channel (default: 240)
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,
    /// Mix buses at the start of the buffer pool (default: 24)
    #[serde(default = "default_mix_buffer_count")]
    pub mix_buffer_count: u32,
    /// Voice scratch channels after the mix buses (default: 6)
    #[serde(default = "default_voice_channel_count_max")]
    pub voice_channel_count_max: u32,
    /// Resampler quality for version 2 data sources (default: Default)
    #[serde(default)]
    pub src_quality: SrcQuality,
}

/// Timing instrumentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Time each command against its estimate (default: true)
    #[serde(default = "default_true")]
    pub metering: bool,
    /// Render thread metrics log interval (default: 1000ms)
    #[serde(default = "default_metrics_log_interval_ms")]
    pub metrics_log_interval_ms: u64,
}

fn default_sample_rate() -> u32 {
    48000
}
fn default_sample_count() -> u32 {
    240
}
fn default_mix_buffer_count() -> u32 {
    24
}
fn default_voice_channel_count_max() -> u32 {
    6
}
fn default_true() -> bool {
    true
}
fn default_metrics_log_interval_ms() -> u64 {
    1000
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            sample_count: default_sample_count(),
            mix_buffer_count: default_mix_buffer_count(),
            voice_channel_count_max: default_voice_channel_count_max(),
            src_quality: SrcQuality::default(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            metering: default_true(),
            metrics_log_interval_ms: default_metrics_log_interval_ms(),
        }
    }
}

impl ApuConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ApuConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check frame geometry against what the hardware supports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let renderer = &self.renderer;
        if !SUPPORTED_SAMPLE_RATES.contains(&renderer.sample_rate) {
            return Err(ConfigError::UnsupportedSampleRate(renderer.sample_rate));
        }
        if renderer.sample_count != renderer.sample_rate / FRAMES_PER_SECOND {
            return Err(ConfigError::SampleCountMismatch {
                sample_rate: renderer.sample_rate,
                sample_count: renderer.sample_count,
            });
        }
        if renderer.mix_buffer_count == 0 {
            return Err(ConfigError::NoMixBuffers);
        }
        Ok(())
    }

    /// Total pool buffers: mix buses followed by voice channels
    pub fn buffer_count(&self) -> u32 {
        self.renderer.mix_buffer_count + self.renderer.voice_channel_count_max
    }

    /// Wall-clock length of one frame
    pub fn frame_period(&self) -> Duration {
        Duration::from_nanos(
            self.renderer.sample_count as u64 * 1_000_000_000 / self.renderer.sample_rate as u64,
        )
    }

    /// Render thread metrics log interval
    pub fn metrics_log_interval(&self) -> Duration {
        Duration::from_millis(self.diagnostics.metrics_log_interval_ms)
    }
}
