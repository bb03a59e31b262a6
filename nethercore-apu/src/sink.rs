//! Frame output sinks
//!
//! The device sink command hands the finished channels of a frame to
//! whatever [`OutputSink`] the command list was processed with. The sink
//! owns formatting and transport from there.

use ringbuf::traits::{Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::trace;

/// Destination of finished frames
pub trait OutputSink {
    /// Channels the device expects per frame
    fn channel_count(&self) -> usize;

    /// Accept one frame: one slice per channel, 16-bit scale floats
    fn append_frame(&mut self, channels: &[&[f32]]);
}

/// Sink that discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink {
    pub channel_count: usize,
}

impl OutputSink for NullSink {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn append_frame(&mut self, _channels: &[&[f32]]) {}
}

/// Saturate a 16-bit scale float to `i16`
#[inline]
pub fn saturate_to_i16(sample: f32) -> i16 {
    sample.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Interleaving sink feeding a lock-free ring read by the host audio callback
///
/// Never blocks: samples that do not fit are dropped and counted.
pub struct RingBufferSink {
    producer: HeapProd<i16>,
    channel_count: usize,
    /// Interleave scratch, reused every frame
    interleaved: Vec<i16>,
    dropped_samples: u64,
}

impl RingBufferSink {
    pub fn new(producer: HeapProd<i16>, channel_count: usize) -> Self {
        Self {
            producer,
            channel_count,
            interleaved: Vec::new(),
            dropped_samples: 0,
        }
    }

    /// Sink plus the consumer end of a fresh ring of `capacity` samples
    pub fn with_capacity(capacity: usize, channel_count: usize) -> (Self, HeapCons<i16>) {
        let ring = HeapRb::<i16>::new(capacity);
        let (producer, consumer) = ring.split();
        (Self::new(producer, channel_count), consumer)
    }

    /// Samples dropped because the ring was full
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Samples currently queued for the device
    pub fn queued_samples(&self) -> usize {
        self.producer.occupied_len()
    }
}

impl OutputSink for RingBufferSink {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn append_frame(&mut self, channels: &[&[f32]]) {
        // Missing, empty or short channels play silence
        let frames = channels.iter().map(|c| c.len()).max().unwrap_or(0);

        self.interleaved.clear();
        self.interleaved.reserve(frames * self.channel_count);
        for frame in 0..frames {
            for channel in 0..self.channel_count {
                let sample = channels
                    .get(channel)
                    .and_then(|c| c.get(frame))
                    .copied()
                    .unwrap_or(0.0);
                self.interleaved.push(saturate_to_i16(sample));
            }
        }

        let pushed = self.producer.push_slice(&self.interleaved);
        let dropped = self.interleaved.len() - pushed;
        if dropped > 0 {
            self.dropped_samples += dropped as u64;
            trace!(dropped, "Output ring full, dropping samples");
        }
    }
}
