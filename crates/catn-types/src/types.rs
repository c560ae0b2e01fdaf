//! Core data types for catn
//!
//! This module provides the transfer outcome, the per-call report and the byte
//! accountant shared by the zero-copy and buffered loops.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EXIT_EXHAUSTED_EARLY, EXIT_SUCCESS};

/// How a transfer that did not fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Completion {
    /// Source exhausted, or the maximum was reached
    Complete,
    /// Strict mode: end of input arrived before the maximum
    ExhaustedEarly,
}

impl Completion {
    /// Process exit status for this outcome
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Complete => EXIT_SUCCESS,
            Self::ExhaustedEarly => EXIT_EXHAUSTED_EARLY,
        }
    }

    /// Whether the transfer delivered everything that was asked for
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

/// Which loop moved the bytes of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransferPath {
    /// Every byte went through the kernel buffer
    ZeroCopy,
    /// Every byte went through the user-space buffer
    Buffered,
    /// Started zero-copy, downgraded mid-stream
    Mixed,
}

/// Result of one descriptor-to-descriptor transfer
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferReport {
    /// Total bytes confirmed written to the destination
    pub bytes_transferred: u64,
    /// Completion status
    pub completion: Completion,
    /// Bytes pushed from the kernel buffer by splice
    pub zerocopy_bytes: u64,
    /// Bytes written from user space (fallback loop and drained kernel buffer)
    pub buffered_bytes: u64,
    /// Which loop moved the bytes
    pub path: TransferPath,
    /// Wall-clock duration of the transfer
    pub duration: Duration,
}

impl TransferReport {
    /// Whether the transfer downgraded from zero-copy after it started
    pub fn fell_back(&self) -> bool {
        self.path == TransferPath::Mixed
    }

    /// Transfer rate in bytes per second
    pub fn transfer_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_transferred as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of bytes moved by splice
    pub fn zerocopy_efficiency(&self) -> f64 {
        if self.bytes_transferred > 0 {
            self.zerocopy_bytes as f64 / self.bytes_transferred as f64
        } else {
            0.0
        }
    }
}

/// Running total of bytes delivered to the destination
///
/// Only confirmed writes are recorded, so the total never overstates what the
/// destination actually received. Requests are sized against the remaining
/// budget so a nonzero maximum bounds what is ever asked of the source.
#[derive(Debug, Clone, Default)]
pub struct ByteAccountant {
    limit: Option<u64>,
    zerocopy: u64,
    buffered: u64,
}

impl ByteAccountant {
    /// Create an accountant; a limit of 0 means unbounded
    pub fn new(max_bytes: u64) -> Self {
        Self {
            limit: (max_bytes > 0).then_some(max_bytes),
            ..Self::default()
        }
    }

    /// Total bytes delivered so far
    pub fn delivered(&self) -> u64 {
        self.zerocopy + self.buffered
    }

    /// Bytes delivered by splice
    pub fn zerocopy(&self) -> u64 {
        self.zerocopy
    }

    /// Bytes delivered by user-space writes
    pub fn buffered(&self) -> u64 {
        self.buffered
    }

    /// Bytes still allowed, `None` when unbounded
    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|limit| limit.saturating_sub(self.delivered()))
    }

    /// Whether the maximum has been reached
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Size of the next request to the source, capped by `ceiling`
    pub fn next_request(&self, ceiling: usize) -> usize {
        match self.remaining() {
            Some(remaining) => usize::try_from(remaining).map_or(ceiling, |r| r.min(ceiling)),
            None => ceiling,
        }
    }

    /// Record bytes confirmed pushed by splice
    pub fn record_zerocopy(&mut self, bytes: usize) {
        self.zerocopy += bytes as u64;
    }

    /// Record bytes confirmed written from user space
    pub fn record_buffered(&mut self, bytes: usize) {
        self.buffered += bytes as u64;
    }

    /// Final outcome once the source is exhausted or the maximum is reached
    pub fn completion(&self, strict: bool) -> Completion {
        match self.limit {
            Some(limit) if strict && self.delivered() < limit => Completion::ExhaustedEarly,
            _ => Completion::Complete,
        }
    }
}
