//! Shared sample buffer pool
//!
//! One contiguous arena of `buffer_count` channels of `sample_count` floats.
//! Indices `[0, mix_buffer_count)` are mix buses, the rest are voice channel
//! scratch slots; the command list builder and the commands agree on that
//! numbering.
//!
//! Two access tiers:
//! - [`BufferPool::buffer`] / [`BufferPool::buffer_mut`] return an empty
//!   slice for an out-of-range index, so optional channel wiring is skipped
//!   silently.
//! - [`BufferPool::channel_offset`] plus [`BufferPool::arena_mut`] serve the
//!   per-sample hot loops. An out-of-range index there means the command
//!   list is malformed and panics.

/// Frame-sized float channels addressed by index
#[derive(Debug, Clone)]
pub struct BufferPool {
    arena: Vec<f32>,
    buffer_count: usize,
    sample_count: usize,
}

impl BufferPool {
    /// Allocate `buffer_count` zeroed channels of `sample_count` samples
    pub fn new(buffer_count: usize, sample_count: usize) -> Self {
        Self {
            arena: vec![0.0; buffer_count * sample_count],
            buffer_count,
            sample_count,
        }
    }

    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[inline]
    fn range(&self, index: usize) -> Option<std::ops::Range<usize>> {
        (index < self.buffer_count).then(|| {
            let start = index * self.sample_count;
            start..start + self.sample_count
        })
    }

    /// Channel `index`, or an empty slice if out of range
    #[inline]
    pub fn buffer(&self, index: usize) -> &[f32] {
        match self.range(index) {
            Some(range) => &self.arena[range],
            None => &[],
        }
    }

    /// Mutable channel `index`, or an empty slice if out of range
    #[inline]
    pub fn buffer_mut(&mut self, index: usize) -> &mut [f32] {
        match self.range(index) {
            Some(range) => &mut self.arena[range],
            None => &mut [],
        }
    }

    /// Zero channel `index` (no-op if out of range)
    pub fn clear(&mut self, index: usize) {
        self.buffer_mut(index).fill(0.0);
    }

    /// Zero every channel
    pub fn clear_all(&mut self) {
        self.arena.fill(0.0);
    }

    /// Copy channel `input` over channel `output` (no-op if equal or out of range)
    pub fn copy(&mut self, output: usize, input: usize) {
        if input == output {
            return;
        }
        if let (Some(source), Some(destination)) = (self.range(input), self.range(output)) {
            self.arena.copy_within(source, destination.start);
        }
    }

    /// Arena offset of channel `index`
    ///
    /// # Panics
    /// If `index >= buffer_count`: the command list references a buffer
    /// that does not exist.
    #[inline]
    pub fn channel_offset(&self, index: usize) -> usize {
        assert!(
            index < self.buffer_count,
            "buffer index {index} out of range ({} buffers)",
            self.buffer_count
        );
        index * self.sample_count
    }

    /// The whole arena, for use with [`BufferPool::channel_offset`]
    #[inline]
    pub fn arena(&self) -> &[f32] {
        &self.arena
    }

    /// The whole arena, mutable, for use with [`BufferPool::channel_offset`]
    #[inline]
    pub fn arena_mut(&mut self) -> &mut [f32] {
        &mut self.arena
    }
}
