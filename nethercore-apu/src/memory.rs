//! Guest memory access
//!
//! Decoders read source samples, ADPCM coefficient tables and loop contexts
//! straight out of guest memory. The processor never writes guest memory and
//! assumes every address it is handed resolves for the duration of a frame;
//! an unresolvable range reads as empty (or zeroed for POD reads).

use bytemuck::{Pod, Zeroable};

/// Read-only view of guest memory
pub trait GuestMemory: Send + Sync {
    /// Borrow `size` bytes at `address`
    ///
    /// Returns an empty slice if the range does not resolve.
    fn get_bytes(&self, address: u64, size: usize) -> &[u8];
}

impl dyn GuestMemory + '_ {
    /// Read a POD value at `address` (unaligned)
    ///
    /// Returns `T::zeroed()` if the range does not resolve.
    pub fn read<T: Pod>(&self, address: u64) -> T {
        let bytes = self.get_bytes(address, std::mem::size_of::<T>());
        if bytes.len() == std::mem::size_of::<T>() {
            bytemuck::pod_read_unaligned(bytes)
        } else {
            T::zeroed()
        }
    }
}

/// Flat guest RAM mapped at a base address
///
/// Stands in for the MMU-backed accessor when the host hands the processor
/// one contiguous region (and in tests).
#[derive(Debug, Clone)]
pub struct GuestRam {
    base: u64,
    data: Vec<u8>,
}

impl GuestRam {
    /// Map `size` zeroed bytes at `base`
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
        }
    }

    /// First mapped address
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Mapped size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing is mapped
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy `bytes` into RAM at `address` (host-side setup, not used by the
    /// processor). Bytes falling outside the mapping are dropped.
    pub fn write_bytes(&mut self, address: u64, bytes: &[u8]) {
        let Some(start) = address
            .checked_sub(self.base)
            .and_then(|offset| usize::try_from(offset).ok())
        else {
            return;
        };
        if start >= self.data.len() {
            return;
        }
        let len = bytes.len().min(self.data.len() - start);
        self.data[start..start + len].copy_from_slice(&bytes[..len]);
    }

    /// Write a POD value at `address`
    pub fn write<T: Pod>(&mut self, address: u64, value: &T) {
        self.write_bytes(address, bytemuck::bytes_of(value));
    }
}

impl GuestMemory for GuestRam {
    fn get_bytes(&self, address: u64, size: usize) -> &[u8] {
        let Some(start) = address
            .checked_sub(self.base)
            .and_then(|offset| usize::try_from(offset).ok())
        else {
            return &[];
        };
        match start.checked_add(size) {
            Some(end) if end <= self.data.len() => &self.data[start..end],
            _ => &[],
        }
    }
}
