//! Buffered read/write copy loop
//!
//! This is the terminal path of a transfer: used from the start when zero-copy is
//! unavailable, or for everything after a mid-stream downgrade. It never probes
//! and never switches back.

use catn_types::{BufferSize, ByteAccountant, Error, Result, StreamEndpoints};
use std::io;
use tracing::debug;

use crate::guard::IdleGuard;

/// Write all of `data` to the destination, recording each confirmed write
///
/// A short write is not end of stream; the remainder is offered again. A write
/// that accepts zero bytes is an unrecoverable destination condition.
pub fn write_all<E>(endpoints: &mut E, mut data: &[u8], acct: &mut ByteAccountant) -> io::Result<()>
where
    E: StreamEndpoints + ?Sized,
{
    while !data.is_empty() {
        let written = endpoints.write(data)?;
        if written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "destination accepted 0 bytes",
            ));
        }
        acct.record_buffered(written);
        data = &data[written..];
    }
    Ok(())
}

/// Read/write loop through a fixed user-space buffer
#[derive(Debug)]
pub struct BufferedCopy {
    buffer: Vec<u8>,
}

impl BufferedCopy {
    /// Allocate the user-space buffer
    pub fn new(size: BufferSize) -> Self {
        Self {
            buffer: vec![0u8; size.get()],
        }
    }

    /// Buffer capacity in bytes
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Copy until end of input or until the accountant's budget is spent
    pub fn run<E>(
        &mut self,
        endpoints: &mut E,
        acct: &mut ByteAccountant,
        guard: &mut IdleGuard,
    ) -> Result<()>
    where
        E: StreamEndpoints + ?Sized,
    {
        loop {
            // never read more than the maximum, if set
            let want = acct.next_request(self.buffer.len());
            if want == 0 {
                debug!("byte limit reached after {} bytes", acct.delivered());
                return Ok(());
            }

            guard.arm();
            guard.wait_for_input(endpoints, acct.delivered())?;
            let read = endpoints.read(&mut self.buffer[..want]);
            guard.disarm();

            let n = read.map_err(|e| Error::read(endpoints.source_fd(), &e))?;
            if n == 0 {
                debug!("end of input after {} bytes", acct.delivered());
                return Ok(());
            }

            write_all(endpoints, &self.buffer[..n], acct)
                .map_err(|e| Error::write(endpoints.destination_fd(), &e))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catn_types::{ErrorKind, IdleTimeout};
    use proptest::prelude::*;
    use rstest::rstest;
    use std::os::fd::RawFd;
    use std::time::Duration;

    /// In-memory endpoints with a cap on bytes accepted per write
    struct MemoryEndpoints {
        input: Vec<u8>,
        pos: usize,
        output: Vec<u8>,
        write_cap: usize,
        fail_read_at: Option<usize>,
        zero_write: bool,
    }

    impl MemoryEndpoints {
        fn new(input: Vec<u8>) -> Self {
            Self {
                input,
                pos: 0,
                output: Vec::new(),
                write_cap: usize::MAX,
                fail_read_at: None,
                zero_write: false,
            }
        }
    }

    impl StreamEndpoints for MemoryEndpoints {
        fn source_fd(&self) -> RawFd {
            3
        }

        fn destination_fd(&self) -> RawFd {
            4
        }

        fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
            Ok(true)
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail_read_at.is_some_and(|at| self.pos >= at) {
                return Err(io::Error::from_raw_os_error(libc::EINTR));
            }
            let n = buf.len().min(self.input.len() - self.pos);
            buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.zero_write {
                return Ok(0);
            }
            let n = buf.len().min(self.write_cap);
            self.output.extend_from_slice(&buf[..n]);
            Ok(n)
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    fn run(endpoints: &mut MemoryEndpoints, max_bytes: u64) -> Result<ByteAccountant> {
        let mut acct = ByteAccountant::new(max_bytes);
        let mut guard = IdleGuard::new(IdleTimeout::DISABLED);
        let mut copy = BufferedCopy::new(BufferSize::new(4096).unwrap());
        copy.run(endpoints, &mut acct, &mut guard)?;
        Ok(acct)
    }

    #[rstest]
    #[case(0, 0)]
    #[case(10_000, 0)]
    #[case(10_000, 4096)]
    #[case(10_000, 9_999)]
    #[case(10_000, 20_000)]
    fn test_copies_prefix(#[case] len: usize, #[case] max_bytes: u64) {
        let input = pattern(len);
        let mut endpoints = MemoryEndpoints::new(input.clone());
        let acct = run(&mut endpoints, max_bytes).unwrap();

        let expected = if max_bytes == 0 {
            len
        } else {
            len.min(max_bytes as usize)
        };
        assert_eq!(endpoints.output, &input[..expected]);
        assert_eq!(acct.delivered(), expected as u64);
        assert_eq!(acct.buffered(), expected as u64);
    }

    #[test]
    fn test_never_reads_past_limit() {
        let mut endpoints = MemoryEndpoints::new(pattern(10_000));
        run(&mut endpoints, 5_000).unwrap();
        assert_eq!(endpoints.pos, 5_000);
    }

    #[test]
    fn test_partial_writes_are_not_end_of_stream() {
        let input = pattern(9_000);
        let mut endpoints = MemoryEndpoints::new(input.clone());
        endpoints.write_cap = 3;
        let acct = run(&mut endpoints, 0).unwrap();
        assert_eq!(endpoints.output, input);
        assert_eq!(acct.delivered(), 9_000);
    }

    #[test]
    fn test_zero_write_is_fatal() {
        let mut endpoints = MemoryEndpoints::new(pattern(100));
        endpoints.zero_write = true;
        let err = run(&mut endpoints, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Write);
        assert!(err.to_string().contains("fd 4"));
    }

    #[test]
    fn test_interrupted_read_is_fatal() {
        let mut endpoints = MemoryEndpoints::new(pattern(10_000));
        endpoints.fail_read_at = Some(4096);
        let err = run(&mut endpoints, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
        assert_eq!(endpoints.output.len(), 4096);
    }

    proptest! {
        #[test]
        fn test_fidelity(len in 0usize..50_000, max in 0u64..60_000, cap in 1usize..5_000) {
            let input = pattern(len);
            let mut endpoints = MemoryEndpoints::new(input.clone());
            endpoints.write_cap = cap;
            let acct = run(&mut endpoints, max).unwrap();
            let expected = if max == 0 { len } else { len.min(max as usize) };
            prop_assert_eq!(&endpoints.output[..], &input[..expected]);
            prop_assert_eq!(acct.delivered(), expected as u64);
        }
    }
}
