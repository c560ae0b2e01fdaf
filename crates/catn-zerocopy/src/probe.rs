//! Capability probing
//!
//! A zero-length transfer is issued in each direction. If the kernel answers
//! "not supported for this descriptor" the path is ruled out up front. The answer
//! is advisory only: many kernels return before looking at the descriptors when
//! `len` is zero, and some backends only refuse once real bytes move. The engine
//! therefore handles capability loss at any point of the transfer as well.

use catn_types::ZeroCopyChannel;
use std::io;
use tracing::warn;

/// Whether `error` means "zero-copy is not supported here" rather than a real fault
pub fn is_capability_loss(error: &io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(libc::EINVAL | libc::ENOSYS | libc::EOPNOTSUPP)
    ) || error.kind() == io::ErrorKind::Unsupported
}

/// Outcome of probing both halves of the zero-copy path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Source -> kernel buffer looked possible
    pub pull: bool,
    /// Kernel buffer -> destination looked possible
    pub push: bool,
}

impl Capability {
    /// Whether the whole zero-copy path looked possible
    pub fn zero_copy(self) -> bool {
        self.pull && self.push
    }
}

/// Probe both halves of the zero-copy path with zero-length transfers
pub fn probe<C>(channel: &mut C) -> Capability
where
    C: ZeroCopyChannel + ?Sized,
{
    let pull = match channel.pull(0) {
        Err(e) if is_capability_loss(&e) => {
            warn!(
                "can't splice from fd {}; fallback to read/write",
                channel.source_fd()
            );
            false
        }
        _ => true,
    };

    let push = match channel.push(0) {
        Err(e) if is_capability_loss(&e) => {
            warn!(
                "can't splice to fd {}; fallback to read/write",
                channel.destination_fd()
            );
            false
        }
        _ => true,
    };

    Capability { pull, push }
}
