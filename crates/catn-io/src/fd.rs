//! Single-syscall helpers over borrowed descriptors
//!
//! Each helper issues exactly one system call and reports `EINTR` like any other
//! failure. Interrupted calls are never retried: a signal that is not fatal to the
//! process is still fatal to the transfer.

use catn_types::StreamEndpoints;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::time::Duration;

/// One `read(2)` from `fd`
pub fn read_fd(fd: BorrowedFd<'_>, buf: &mut [u8]) -> io::Result<usize> {
    // SAFETY: `fd` is borrowed for the duration of the call and `buf` is a valid,
    // exclusively borrowed region of `buf.len()` bytes.
    let n = unsafe { libc::read(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// One `write(2)` to `fd`
pub fn write_fd(fd: BorrowedFd<'_>, buf: &[u8]) -> io::Result<usize> {
    // SAFETY: `fd` is borrowed for the duration of the call and `buf` is a valid
    // region of `buf.len()` bytes.
    let n = unsafe { libc::write(fd.as_raw_fd(), buf.as_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// Wait up to `timeout` for `fd` to become readable
///
/// Hang-up and error conditions count as readable: the following read reports
/// them (as end of input or as a failure).
pub fn poll_readable(fd: BorrowedFd<'_>, timeout: Duration) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd: fd.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

    // SAFETY: `pollfd` is a single valid entry and the count passed is 1.
    let ready = unsafe { libc::poll(&mut pollfd, 1, millis) };
    match ready {
        n if n < 0 => Err(io::Error::last_os_error()),
        0 => Ok(false),
        _ => Ok(true),
    }
}

/// Plain source/destination descriptor pair, no kernel buffer
#[derive(Debug, Clone, Copy)]
pub struct FdEndpoints<'fd> {
    source: BorrowedFd<'fd>,
    destination: BorrowedFd<'fd>,
}

impl<'fd> FdEndpoints<'fd> {
    /// Pair a readable source with a writable destination
    pub fn new(source: BorrowedFd<'fd>, destination: BorrowedFd<'fd>) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Borrowed source descriptor
    pub fn source(&self) -> BorrowedFd<'fd> {
        self.source
    }

    /// Borrowed destination descriptor
    pub fn destination(&self) -> BorrowedFd<'fd> {
        self.destination
    }
}

impl StreamEndpoints for FdEndpoints<'_> {
    fn source_fd(&self) -> RawFd {
        self.source.as_raw_fd()
    }

    fn destination_fd(&self) -> RawFd {
        self.destination.as_raw_fd()
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        poll_readable(self.source, timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_fd(self.source, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_fd(self.destination, buf)
    }
}
