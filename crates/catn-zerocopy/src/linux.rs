//! Linux splice(2) channel
//!
//! Bytes move source -> pipe -> destination without entering user space. The
//! pipe is the kernel staging buffer: created once per transfer, owned by that
//! transfer alone and closed when it is dropped.
//!
//! Splice from TCP sockets needs Linux 2.6.25+. Before 2.6.31 many file systems
//! reject splice with `EINVAL`; NFS and `O_APPEND` destinations still can. Those
//! show up as capability loss and are handled by the engine's fallback.

use catn_io::{poll_readable, read_fd, write_fd, FdEndpoints};
use catn_types::{ChunkSize, Error, Result, StreamEndpoints, ZeroCopyChannel};
use nix::fcntl::{splice, OFlag, SpliceFFlags};
use nix::unistd::pipe2;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::time::Duration;
use tracing::debug;

fn splice_flags() -> SpliceFFlags {
    SpliceFFlags::SPLICE_F_MOVE | SpliceFFlags::SPLICE_F_MORE
}

/// Pipe pair used as the intermediate kernel buffer
#[derive(Debug)]
pub struct KernelBuffer {
    read_end: OwnedFd,
    write_end: OwnedFd,
    capacity: Option<usize>,
}

impl KernelBuffer {
    /// Create the pipe and try to raise its capacity to one chunk
    pub fn new(chunk_size: ChunkSize) -> Result<Self> {
        let (read_end, write_end) =
            pipe2(OFlag::O_CLOEXEC).map_err(|e| Error::kernel_buffer(&io::Error::from(e)))?;
        let capacity = Self::resize(&write_end, chunk_size.get());
        debug!(
            "kernel buffer pipe {}->{} capacity {:?}",
            write_end.as_raw_fd(),
            read_end.as_raw_fd(),
            capacity
        );

        Ok(Self {
            read_end,
            write_end,
            capacity,
        })
    }

    /// Best effort F_SETPIPE_SZ; reports the capacity actually in effect
    fn resize(fd: &OwnedFd, size: usize) -> Option<usize> {
        let requested = libc::c_int::try_from(size).unwrap_or(libc::c_int::MAX);

        // SAFETY: `fd` is an open pipe descriptor owned by the caller.
        let set = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETPIPE_SZ, requested) };
        if set > 0 {
            return Some(set as usize);
        }
        debug!(
            "could not raise pipe capacity to {}: {}",
            size,
            io::Error::last_os_error()
        );

        // SAFETY: as above; F_GETPIPE_SZ takes no argument.
        let current = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETPIPE_SZ) };
        (current > 0).then_some(current as usize)
    }

    /// Capacity in bytes, if the kernel reported it
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// End that staged bytes are read from
    pub fn read_end(&self) -> BorrowedFd<'_> {
        self.read_end.as_fd()
    }

    /// End that pulled bytes are written to
    pub fn write_end(&self) -> BorrowedFd<'_> {
        self.write_end.as_fd()
    }
}

/// Source and destination joined through a [`KernelBuffer`]
#[derive(Debug)]
pub struct SpliceChannel<'fd> {
    endpoints: FdEndpoints<'fd>,
    buffer: KernelBuffer,
}

impl<'fd> SpliceChannel<'fd> {
    /// Join `endpoints` through `buffer`
    pub fn new(endpoints: FdEndpoints<'fd>, buffer: KernelBuffer) -> Self {
        Self { endpoints, buffer }
    }
}

impl StreamEndpoints for SpliceChannel<'_> {
    fn source_fd(&self) -> RawFd {
        self.endpoints.source_fd()
    }

    fn destination_fd(&self) -> RawFd {
        self.endpoints.destination_fd()
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        poll_readable(self.endpoints.source(), timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_fd(self.endpoints.source(), buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_fd(self.endpoints.destination(), buf)
    }
}

impl ZeroCopyChannel for SpliceChannel<'_> {
    fn pull(&mut self, len: usize) -> io::Result<usize> {
        splice(
            self.endpoints.source(),
            None,
            self.buffer.write_end(),
            None,
            len,
            splice_flags(),
        )
        .map_err(io::Error::from)
    }

    fn push(&mut self, len: usize) -> io::Result<usize> {
        splice(
            self.buffer.read_end(),
            None,
            self.endpoints.destination(),
            None,
            len,
            splice_flags(),
        )
        .map_err(io::Error::from)
    }

    fn drain_staged(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_fd(self.buffer.read_end(), buf)
    }
}
