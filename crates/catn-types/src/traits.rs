//! Core traits for catn transfers
//!
//! The transfer loops only ever talk to these traits. The Linux splice channel is
//! one implementation; scripted in-memory channels are another, which is how the
//! capability-loss and partial-write paths get exercised without a kernel that
//! misbehaves on cue.
//!
//! Every method maps to one blocking system call and reports the raw
//! `io::Error`. Interpreting it (capability loss, fatal, end of stream) is the
//! loop's job, not the channel's.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// A readable source and a writable destination, moved between through user space
pub trait StreamEndpoints {
    /// Source descriptor, for diagnostics
    fn source_fd(&self) -> RawFd;

    /// Destination descriptor, for diagnostics
    fn destination_fd(&self) -> RawFd;

    /// Block until the source has data (or end of input) or `timeout` elapses
    ///
    /// Returns `Ok(false)` when the timeout elapsed with nothing to read.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read from the source; `Ok(0)` is end of input
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write to the destination; may accept fewer bytes than offered
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// Endpoints that can additionally be joined through a kernel staging buffer
pub trait ZeroCopyChannel: StreamEndpoints {
    /// Move up to `len` bytes from the source into the kernel buffer
    ///
    /// `Ok(0)` with a nonzero `len` is end of input. A zero `len` is a probe.
    fn pull(&mut self, len: usize) -> io::Result<usize>;

    /// Move up to `len` staged bytes from the kernel buffer to the destination
    ///
    /// A zero `len` is a probe.
    fn push(&mut self, len: usize) -> io::Result<usize>;

    /// Read staged bytes out of the kernel buffer into user space
    fn drain_staged(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}
