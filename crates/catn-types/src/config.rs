//! Configuration types for catn
//!
//! This module provides type-safe transfer configuration with validation.
//! Out-of-range values are rejected here, before any descriptor is touched.

use std::time::Duration;

use crate::{Error, Result};

/// Splice chunk ceiling: the most bytes requested from the source in one pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub struct ChunkSize(usize);

impl ChunkSize {
    /// Minimum chunk size (4KB)
    pub const MIN: usize = 4 * 1024;
    /// Maximum chunk size (16MB)
    pub const MAX: usize = 16 * 1024 * 1024;
    /// Default chunk size (256KB)
    pub const DEFAULT: usize = 256 * 1024;

    /// Create a new chunk size with validation
    pub fn new(size: usize) -> Result<Self> {
        if size < Self::MIN {
            Err(Error::config(format!(
                "Chunk size {} is below minimum {}",
                size,
                Self::MIN
            )))
        } else if size > Self::MAX {
            Err(Error::config(format!(
                "Chunk size {} exceeds maximum {}",
                size,
                Self::MAX
            )))
        } else {
            Ok(Self(size))
        }
    }

    /// Get the chunk size value
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = Error;

    fn try_from(size: usize) -> Result<Self> {
        Self::new(size)
    }
}

impl From<ChunkSize> for usize {
    fn from(size: ChunkSize) -> Self {
        size.0
    }
}

/// User-space buffer size for the read/write fallback loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub struct BufferSize(usize);

impl BufferSize {
    /// Minimum buffer size (4KB)
    pub const MIN: usize = 4 * 1024;
    /// Maximum buffer size (64MB)
    pub const MAX: usize = 64 * 1024 * 1024;
    /// Default buffer size (128KB)
    pub const DEFAULT: usize = 128 * 1024;

    /// Create a new buffer size with validation
    pub fn new(size: usize) -> Result<Self> {
        if size < Self::MIN {
            Err(Error::config(format!(
                "Buffer size {} is below minimum {}",
                size,
                Self::MIN
            )))
        } else if size > Self::MAX {
            Err(Error::config(format!(
                "Buffer size {} exceeds maximum {}",
                size,
                Self::MAX
            )))
        } else {
            Ok(Self(size))
        }
    }

    /// Get the buffer size value
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for BufferSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<usize> for BufferSize {
    type Error = Error;

    fn try_from(size: usize) -> Result<Self> {
        Self::new(size)
    }
}

impl From<BufferSize> for usize {
    fn from(size: BufferSize) -> Self {
        size.0
    }
}

/// Idle timeout in whole seconds, 0 disables it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u64", into = "u64"))]
pub struct IdleTimeout(u32);

impl IdleTimeout {
    /// Disabled timeout
    pub const DISABLED: Self = Self(0);

    /// Create a new idle timeout; the value must fit in 32 bits
    pub fn from_secs(seconds: u64) -> Result<Self> {
        u32::try_from(seconds).map(Self).map_err(|_| {
            Error::config(format!(
                "Idle timeout {} too large - max allowed is {}",
                seconds,
                u32::MAX
            ))
        })
    }

    /// Timeout in seconds
    pub fn as_secs(self) -> u64 {
        u64::from(self.0)
    }

    /// Timeout as a duration, `None` when disabled
    pub fn duration(self) -> Option<Duration> {
        (self.0 > 0).then(|| Duration::from_secs(u64::from(self.0)))
    }

    /// Whether the timeout is enabled
    pub fn is_enabled(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<u64> for IdleTimeout {
    type Error = Error;

    fn try_from(seconds: u64) -> Result<Self> {
        Self::from_secs(seconds)
    }
}

impl From<IdleTimeout> for u64 {
    fn from(timeout: IdleTimeout) -> Self {
        timeout.as_secs()
    }
}

/// Options for one descriptor-to-descriptor transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransferOptions {
    /// Stop after this many bytes, 0 = unbounded
    pub max_bytes: u64,
    /// Report early end of input as a distinct outcome
    pub strict: bool,
    /// Abort if a blocking pull/read sees no data for this long
    pub idle_timeout: IdleTimeout,
    /// Largest single pull into the kernel buffer
    pub chunk_size: ChunkSize,
    /// User-space buffer size for the fallback loop
    pub buffer_size: BufferSize,
    /// Try the zero-copy path before falling back to read/write
    pub zero_copy: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            max_bytes: 0,
            strict: false,
            idle_timeout: IdleTimeout::DISABLED,
            chunk_size: ChunkSize::default(),
            buffer_size: BufferSize::default(),
            zero_copy: true,
        }
    }
}

impl TransferOptions {
    /// Create options with defaults: unbounded, lenient, no timeout, zero-copy on
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of bytes to transfer (0 = unbounded)
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Enable or disable strict completion
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the idle timeout
    pub fn with_idle_timeout(mut self, timeout: IdleTimeout) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the splice chunk ceiling
    pub fn with_chunk_size(mut self, size: ChunkSize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the fallback buffer size
    pub fn with_buffer_size(mut self, size: BufferSize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Enable or disable the zero-copy path
    pub fn zero_copy(mut self, enabled: bool) -> Self {
        self.zero_copy = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(4 * 1024, true)]
    #[case(256 * 1024, true)]
    #[case(16 * 1024 * 1024, true)]
    #[case(1024, false)]
    #[case(32 * 1024 * 1024, false)]
    fn test_chunk_size_bounds(#[case] size: usize, #[case] ok: bool) {
        assert_eq!(ChunkSize::new(size).is_ok(), ok);
    }

    #[test]
    fn test_buffer_size_accepts_non_power_of_two() {
        assert_eq!(BufferSize::new(5000).unwrap().get(), 5000);
        assert!(BufferSize::new(100).is_err());
    }

    #[test]
    fn test_idle_timeout() {
        assert!(!IdleTimeout::DISABLED.is_enabled());
        assert_eq!(IdleTimeout::DISABLED.duration(), None);

        let timeout = IdleTimeout::from_secs(5).unwrap();
        assert_eq!(timeout.duration(), Some(Duration::from_secs(5)));

        let err = IdleTimeout::from_secs(u64::from(u32::MAX) + 1).unwrap_err();
        assert_eq!(err.exit_code(), crate::EXIT_CONFIG);
    }

    #[test]
    fn test_transfer_options_builder() {
        let options = TransferOptions::new()
            .with_max_bytes(100)
            .strict(true)
            .zero_copy(false);

        assert_eq!(options.max_bytes, 100);
        assert!(options.strict);
        assert!(!options.zero_copy);
        assert_eq!(options.chunk_size.get(), ChunkSize::DEFAULT);
        assert_eq!(TransferOptions::default().max_bytes, 0);
    }
}
